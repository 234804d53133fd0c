use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time;
use tracing::{error, info};

use crate::{
    configuration::{AppState, State},
    dao::SubscriptionStore,
    error::Error,
};

pub async fn retention_task(app_state: AppState<State>) -> Result<(), Error> {
    if !app_state.config.auto_cleanup {
        return Ok(());
    }

    let minutes = app_state.config.cleanup_interval.max(1);
    let mut interval = time::interval(Duration::from_secs(minutes * 60));

    tokio::spawn(async move {
        loop {
            interval.tick().await;
            let config = &app_state.config;
            if let Err(e) = cleanup(
                app_state.store.as_ref(),
                Utc::now(),
                config.expired_after_days,
                config.unused_after_days,
            )
            .await
            {
                error!("Subscription cleanup failed: {}", e);
            }
        }
    })
    .await?
}

/// Removes subscriptions expired for more than `expired_after_days`, or not
/// used for more than `unused_after_days`.
pub async fn cleanup(
    store: &dyn SubscriptionStore,
    now: DateTime<Utc>,
    expired_after_days: i64,
    unused_after_days: i64,
) -> Result<u64, Error> {
    let expired_before = cutoff(now, "expired", expired_after_days)?;
    let unused_before = cutoff(now, "unused", unused_after_days)?;

    let removed = store.delete_stale(expired_before, unused_before).await?;
    if removed > 0 {
        info!("Removed {} stale push subscriptions", removed);
    }

    Ok(removed)
}

fn cutoff(
    now: DateTime<Utc>,
    name: &str,
    days: i64,
) -> Result<DateTime<Utc>, Error> {
    if days < 1 {
        return Err(Error::ConfigurationError(format!(
            "{} retention must be at least one day, got {}",
            name, days
        )));
    }

    chrono::Duration::try_days(days)
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| {
            Error::ConfigurationError(format!(
                "{} retention of {} days is out of range",
                name, days
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dao::MemoryStore, model::NewSubscription};

    fn new_subscription(
        endpoint: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> NewSubscription {
        NewSubscription {
            user_id: None,
            endpoint: endpoint.to_owned(),
            p256dh: String::from("key"),
            auth: String::from("auth"),
            topic: String::from("general"),
            device_info: None,
            expires_at,
        }
    }

    #[tokio::test]
    async fn removes_long_expired_and_unused() {
        let store = MemoryStore::new();
        let now = Utc::now();

        let fresh = store
            .upsert(new_subscription("https://push.example.com/fresh", None))
            .await
            .unwrap();
        let expired = store
            .upsert(new_subscription(
                "https://push.example.com/expired",
                Some(now - chrono::Duration::days(45)),
            ))
            .await
            .unwrap();
        let recently_expired = store
            .upsert(new_subscription(
                "https://push.example.com/recent",
                Some(now - chrono::Duration::days(2)),
            ))
            .await
            .unwrap();
        let idle = store
            .upsert(new_subscription("https://push.example.com/idle", None))
            .await
            .unwrap();
        store
            .touch_last_used(idle.id, now - chrono::Duration::days(120))
            .await
            .unwrap();

        let removed = cleanup(&store, now, 30, 90).await.unwrap();

        assert_eq!(removed, 2);
        assert!(store.get(fresh.id).await.is_some());
        assert!(store.get(recently_expired.id).await.is_some());
        assert!(store.get(expired.id).await.is_none());
        assert!(store.get(idle.id).await.is_none());
    }

    #[tokio::test]
    async fn rejects_unusable_windows_without_deleting() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let item = store
            .upsert(new_subscription("https://push.example.com/a", None))
            .await
            .unwrap();

        let windows = [(0, 90), (30, -1), (30, i64::MAX), (i64::MAX / 2, 90)];
        for (expired, unused) in windows {
            let result = cleanup(&store, now, expired, unused).await;
            assert!(matches!(result, Err(Error::ConfigurationError(_))));
        }
        assert!(store.get(item.id).await.is_some());
    }
}
