//! In-memory subscription store
//!
//! Same semantics as the PostgreSQL table, for embedding without a database
//! and for tests.

use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicI64, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::SubscriptionStore;
use crate::{
    error::Error,
    model::{NewSubscription, Subscription},
};

#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<BTreeMap<i64, Subscription>>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: i64) -> Option<Subscription> {
        self.rows.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    async fn select<F>(&self, filter: F) -> Vec<Subscription>
    where
        F: Fn(&Subscription) -> bool,
    {
        let now = Utc::now();
        self.rows
            .read()
            .await
            .values()
            .filter(|item| item.is_active(now) && filter(item))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn find_active_by_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<Subscription>, Error> {
        Ok(self.select(|item| item.user_id == Some(user_id)).await)
    }

    async fn find_active(&self) -> Result<Vec<Subscription>, Error> {
        Ok(self.select(|_| true).await)
    }

    async fn find_by_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<Subscription>, Error> {
        let mut items: Vec<Subscription> = self
            .rows
            .read()
            .await
            .values()
            .filter(|item| item.user_id == Some(user_id))
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id))
        });
        Ok(items)
    }

    async fn find_active_by_topic(
        &self,
        topic: &str,
    ) -> Result<Vec<Subscription>, Error> {
        Ok(self.select(|item| item.topic == topic).await)
    }

    async fn delete(&self, id: i64) -> Result<bool, Error> {
        Ok(self.rows.write().await.remove(&id).is_some())
    }

    async fn touch_last_used(
        &self,
        id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), Error> {
        if let Some(item) = self.rows.write().await.get_mut(&id) {
            item.last_used_at = Some(at);
        }
        Ok(())
    }

    async fn upsert(
        &self,
        subscription: NewSubscription,
    ) -> Result<Subscription, Error> {
        let now = Utc::now();
        let mut rows = self.rows.write().await;

        let existing = rows
            .values_mut()
            .find(|item| item.endpoint == subscription.endpoint);

        if let Some(item) = existing {
            item.user_id = subscription.user_id;
            item.p256dh = subscription.p256dh;
            item.auth = subscription.auth;
            item.topic = subscription.topic;
            item.device_info = subscription.device_info;
            item.expires_at = subscription.expires_at;
            item.updated_at = now;
            return Ok(item.clone());
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let item = Subscription {
            id,
            user_id: subscription.user_id,
            endpoint: subscription.endpoint,
            p256dh: subscription.p256dh,
            auth: subscription.auth,
            topic: subscription.topic,
            device_info: subscription.device_info,
            expires_at: subscription.expires_at,
            last_used_at: None,
            created_at: now,
            updated_at: now,
        };
        rows.insert(id, item.clone());

        Ok(item)
    }

    async fn delete_by_endpoint(&self, endpoint: &str) -> Result<bool, Error> {
        let mut rows = self.rows.write().await;
        let id = rows
            .values()
            .find(|item| item.endpoint == endpoint)
            .map(|item| item.id);

        Ok(match id {
            Some(id) => rows.remove(&id).is_some(),
            None => false,
        })
    }

    async fn delete_stale(
        &self,
        expired_before: DateTime<Utc>,
        unused_before: DateTime<Utc>,
    ) -> Result<u64, Error> {
        let mut rows = self.rows.write().await;
        let before = rows.len();

        rows.retain(|_, item| {
            let expired = item.expires_at.is_some_and(|at| at < expired_before);
            let unused =
                item.last_used_at.unwrap_or(item.created_at) < unused_before;
            !(expired || unused)
        });

        Ok((before - rows.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DEFAULT_TOPIC;
    use chrono::Duration;

    fn registration(endpoint: &str) -> NewSubscription {
        NewSubscription {
            user_id: Some(1),
            endpoint: endpoint.to_owned(),
            p256dh: String::from("p256dh"),
            auth: String::from("auth"),
            topic: String::from(DEFAULT_TOPIC),
            device_info: None,
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn upsert_updates_same_endpoint() {
        let store = MemoryStore::new();
        let first = store.upsert(registration("https://a.example/1")).await.unwrap();

        let mut again = registration("https://a.example/1");
        again.topic = String::from("news");
        let second = store.upsert(again).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.topic, "news");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn expired_rows_are_not_selected() {
        let store = MemoryStore::new();
        let mut expired = registration("https://a.example/expired");
        expired.expires_at = Some(Utc::now() - Duration::minutes(1));
        store.upsert(expired).await.unwrap();
        store.upsert(registration("https://a.example/live")).await.unwrap();

        let active = store.find_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].endpoint, "https://a.example/live");
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn filters_by_user_and_topic() {
        let store = MemoryStore::new();
        let mut other = registration("https://a.example/other");
        other.user_id = Some(2);
        other.topic = String::from("news");
        store.upsert(other).await.unwrap();
        store.upsert(registration("https://a.example/mine")).await.unwrap();

        assert_eq!(store.find_active_by_user(1).await.unwrap().len(), 1);
        assert_eq!(store.find_active_by_user(3).await.unwrap().len(), 0);
        let news = store.find_active_by_topic("news").await.unwrap();
        assert_eq!(news.len(), 1);
        assert_eq!(news[0].user_id, Some(2));
    }

    #[tokio::test]
    async fn lists_user_rows_newest_first() {
        let store = MemoryStore::new();
        let mut expired = registration("https://a.example/old");
        expired.expires_at = Some(Utc::now() - Duration::minutes(1));
        let old = store.upsert(expired).await.unwrap();
        let new = store.upsert(registration("https://a.example/new")).await.unwrap();
        let mut other = registration("https://a.example/other");
        other.user_id = Some(2);
        store.upsert(other).await.unwrap();

        let items = store.find_by_user(1).await.unwrap();
        let ids: Vec<i64> = items.iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![new.id, old.id]);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::new();
        let item = store.upsert(registration("https://a.example/1")).await.unwrap();

        assert!(store.delete(item.id).await.unwrap());
        assert!(!store.delete(item.id).await.unwrap());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn delete_stale_removes_expired_and_unused() {
        let store = MemoryStore::new();
        let now = Utc::now();

        let mut expired = registration("https://a.example/expired");
        expired.expires_at = Some(now - Duration::days(40));
        store.upsert(expired).await.unwrap();

        let unused = store.upsert(registration("https://a.example/unused")).await.unwrap();
        store
            .touch_last_used(unused.id, now - Duration::days(100))
            .await
            .unwrap();

        let fresh = store.upsert(registration("https://a.example/fresh")).await.unwrap();
        store.touch_last_used(fresh.id, now).await.unwrap();

        let removed = store
            .delete_stale(now - Duration::days(30), now - Duration::days(90))
            .await
            .unwrap();

        assert_eq!(removed, 2);
        assert!(store.get(fresh.id).await.is_some());
    }
}
