use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::Error,
    model::{NewSubscription, Subscription},
};

/// Narrow persistence contract the delivery engine depends on.
///
/// `find_active*` never return subscriptions whose `expires_at` has passed.
/// `delete` reports whether a row was removed; deleting a missing id is not
/// an error.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn find_active_by_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<Subscription>, Error>;

    async fn find_active(&self) -> Result<Vec<Subscription>, Error>;

    /// Every subscription of a user, expired ones included, newest first.
    async fn find_by_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<Subscription>, Error>;

    async fn find_active_by_topic(
        &self,
        topic: &str,
    ) -> Result<Vec<Subscription>, Error>;

    async fn delete(&self, id: i64) -> Result<bool, Error>;

    async fn touch_last_used(
        &self,
        id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), Error>;

    async fn upsert(
        &self,
        subscription: NewSubscription,
    ) -> Result<Subscription, Error>;

    async fn delete_by_endpoint(&self, endpoint: &str) -> Result<bool, Error>;

    /// Removes rows expired before `expired_before` and rows whose last use
    /// (or creation, if never used) precedes `unused_before`.
    async fn delete_stale(
        &self,
        expired_before: DateTime<Utc>,
        unused_before: DateTime<Utc>,
    ) -> Result<u64, Error>;
}
