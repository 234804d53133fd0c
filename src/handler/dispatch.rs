//! Fan-out of one notification to every matching subscription
//!
//! Candidates are resolved once, the payload is encoded once, and each
//! subscription then gets its own task: sign, seal, POST, and apply the
//! lifecycle rule. Tasks are bounded by a shared semaphore. A cancelled token
//! stops new tasks from being spawned; tasks already running finish. Tasks
//! are detached, so dropping the `dispatch` future does not abort deliveries
//! in flight or their lifecycle updates.

use std::{collections::HashSet, fmt, sync::Arc, time::Duration};

use chrono::Utc;
use serde::Serialize;
use tokio::{sync::Semaphore, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use url::Url;

use super::SubscriptionLifecycleManager;
use crate::{
    dao::SubscriptionStore,
    error::Error,
    model::Subscription,
    provider::DeliveryClient,
    push::{authorize, EncodedPayload, PayloadEncoder, VapidKeyPair},
    types::{DeliveryOutcome, DeliveryResult, NotificationPayload},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    User(i64),
    All,
    Topic(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Target::User(id) => write!(f, "user {}", id),
            Target::All => write!(f, "all"),
            Target::Topic(topic) => write!(f, "topic {}", topic),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub attempted: usize,
    pub delivered: usize,
    pub gone: usize,
    pub payload_too_large: usize,
    pub rate_limited: usize,
    pub failed: usize,
    /// Candidates never attempted because the batch was cancelled.
    pub skipped: usize,
    /// Subscriptions that failed transiently and may be re-dispatched.
    pub retryable: Vec<i64>,
}

impl DispatchReport {
    fn record(&mut self, subscription_id: i64, outcome: DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Delivered => self.delivered += 1,
            DeliveryOutcome::SubscriptionGone => self.gone += 1,
            DeliveryOutcome::PayloadTooLarge => self.payload_too_large += 1,
            DeliveryOutcome::RateLimited => self.rate_limited += 1,
            DeliveryOutcome::TransientFailure => {
                self.failed += 1;
                self.retryable.push(subscription_id);
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VapidPublicKey {
    pub public_key: String,
    pub subject: String,
}

#[derive(Clone)]
pub struct DispatchCoordinator {
    store: Arc<dyn SubscriptionStore>,
    keys: Arc<VapidKeyPair>,
    client: DeliveryClient,
    encoder: Arc<PayloadEncoder>,
    lifecycle: SubscriptionLifecycleManager,
    timeout: Duration,
    permits: Arc<Semaphore>,
}

impl DispatchCoordinator {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        keys: Arc<VapidKeyPair>,
        client: DeliveryClient,
        encoder: PayloadEncoder,
        timeout: Duration,
        max_concurrency: usize,
    ) -> Self {
        Self {
            lifecycle: SubscriptionLifecycleManager::new(store.clone()),
            store,
            keys,
            client,
            encoder: Arc::new(encoder),
            timeout,
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    pub async fn send_to_user(
        &self,
        user_id: i64,
        payload: &NotificationPayload,
    ) -> Result<usize, Error> {
        self.send(Target::User(user_id), payload).await
    }

    pub async fn send_to_all(
        &self,
        payload: &NotificationPayload,
    ) -> Result<usize, Error> {
        self.send(Target::All, payload).await
    }

    pub async fn send_to_topic(
        &self,
        topic: &str,
        payload: &NotificationPayload,
    ) -> Result<usize, Error> {
        self.send(Target::Topic(topic.to_owned()), payload).await
    }

    async fn send(
        &self,
        target: Target,
        payload: &NotificationPayload,
    ) -> Result<usize, Error> {
        let report = self
            .dispatch(&target, payload, &CancellationToken::new())
            .await?;
        Ok(report.delivered)
    }

    pub async fn dispatch(
        &self,
        target: &Target,
        payload: &NotificationPayload,
        cancel: &CancellationToken,
    ) -> Result<DispatchReport, Error> {
        let candidates = self.candidates(target).await?;
        let mut report = DispatchReport::default();

        if candidates.is_empty() {
            return Ok(report);
        }

        let encoded = Arc::new(self.encoder.encode(payload)?);
        let mut tasks: Vec<(i64, JoinHandle<DeliveryOutcome>)> = Vec::new();

        for subscription in candidates {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    report.skipped += 1;
                    continue;
                },
                permit = self.permits.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        error!("Push notification semaphore closed");
                        report.skipped += 1;
                        continue;
                    },
                },
            };

            report.attempted += 1;
            let subscription_id = subscription.id;
            let coordinator = self.clone();
            let encoded = encoded.clone();
            let handle = tokio::spawn(async move {
                let _permit = permit;
                coordinator.deliver_one(&subscription, &encoded).await
            });
            tasks.push((subscription_id, handle));
        }

        for (subscription_id, handle) in tasks {
            match handle.await {
                Ok(outcome) => report.record(subscription_id, outcome),
                Err(e) => {
                    error!(
                        subscription_id,
                        "Push notification task failed: {}", e
                    );
                    report.record(
                        subscription_id,
                        DeliveryOutcome::TransientFailure,
                    );
                },
            }
        }

        info!(
            dispatch_target = %target,
            attempted = report.attempted,
            delivered = report.delivered,
            gone = report.gone,
            failed = report.failed,
            skipped = report.skipped,
            "Push dispatch finished"
        );

        Ok(report)
    }

    pub fn public_key(&self) -> VapidPublicKey {
        VapidPublicKey {
            public_key: self.keys.public_key().to_owned(),
            subject: self.keys.subject().to_owned(),
        }
    }

    pub fn validate_endpoint(&self, endpoint: &str) -> bool {
        validate_endpoint(endpoint)
    }

    async fn candidates(
        &self,
        target: &Target,
    ) -> Result<Vec<Subscription>, Error> {
        let mut items = match target {
            Target::User(user_id) => {
                self.store.find_active_by_user(*user_id).await?
            },
            Target::All => self.store.find_active().await?,
            Target::Topic(topic) => {
                self.store.find_active_by_topic(topic).await?
            },
        };

        let mut seen = HashSet::new();
        items.retain(|item| seen.insert(item.id));

        Ok(items)
    }

    async fn deliver_one(
        &self,
        subscription: &Subscription,
        encoded: &EncodedPayload,
    ) -> DeliveryOutcome {
        let result = self.attempt(subscription, encoded).await;

        if let Err(e) = self
            .lifecycle
            .on_result(subscription, &result, Utc::now())
            .await
        {
            error!(
                subscription_id = subscription.id,
                "Subscription update after {} failed: {}", result.outcome, e
            );
        }

        result.outcome
    }

    async fn attempt(
        &self,
        subscription: &Subscription,
        encoded: &EncodedPayload,
    ) -> DeliveryResult {
        if !subscription.has_keys() {
            return DeliveryResult::transient("subscription has no keys");
        }

        let authorization =
            match authorize(&subscription.endpoint, &self.keys, Utc::now()) {
                Ok(value) => value,
                Err(e) => {
                    return DeliveryResult::transient(format!(
                        "VAPID signing failed: {}",
                        e
                    ));
                },
            };

        let body = match self.encoder.seal(encoded, subscription) {
            Ok(body) => body,
            Err(e) => {
                return DeliveryResult::transient(format!(
                    "payload encryption failed: {}",
                    e
                ));
            },
        };

        self.client
            .deliver(
                subscription,
                &authorization,
                body,
                &encoded.headers,
                self.timeout,
            )
            .await
    }
}

/// Syntactic check only: absolute http(s) URL with a host.
pub fn validate_endpoint(endpoint: &str) -> bool {
    match Url::parse(endpoint) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some_and(|host| !host.is_empty())
        },
        Err(_) => false,
    }
}
