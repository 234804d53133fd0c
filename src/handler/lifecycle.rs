use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::{
    dao::SubscriptionStore,
    error::Error,
    model::Subscription,
    types::{DeliveryOutcome, DeliveryResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Touched,
    Deleted,
    Unchanged,
}

/// Applies the persistent side effects of one delivery result.
#[derive(Clone)]
pub struct SubscriptionLifecycleManager {
    store: Arc<dyn SubscriptionStore>,
}

impl SubscriptionLifecycleManager {
    pub fn new(store: Arc<dyn SubscriptionStore>) -> Self {
        Self { store }
    }

    pub async fn on_result(
        &self,
        subscription: &Subscription,
        result: &DeliveryResult,
        now: DateTime<Utc>,
    ) -> Result<LifecycleAction, Error> {
        match result.outcome {
            DeliveryOutcome::Delivered => {
                self.store.touch_last_used(subscription.id, now).await?;
                Ok(LifecycleAction::Touched)
            },
            DeliveryOutcome::SubscriptionGone => {
                let removed = self.store.delete(subscription.id).await?;
                info!(
                    subscription_id = subscription.id,
                    status = ?result.status,
                    removed,
                    "Subscription gone, removed"
                );
                Ok(LifecycleAction::Deleted)
            },
            DeliveryOutcome::PayloadTooLarge | DeliveryOutcome::RateLimited => {
                warn!(
                    subscription_id = subscription.id,
                    outcome = %result.outcome,
                    message = ?result.message,
                    "Push service refused notification"
                );
                Ok(LifecycleAction::Unchanged)
            },
            DeliveryOutcome::TransientFailure => {
                debug!(
                    subscription_id = subscription.id,
                    status = ?result.status,
                    message = ?result.message,
                    "Push delivery failed"
                );
                Ok(LifecycleAction::Unchanged)
            },
        }
    }
}
