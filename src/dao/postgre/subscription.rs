use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    dao::SubscriptionStore,
    error::Error,
    model::{NewSubscription, Subscription, Table},
};

#[async_trait]
impl SubscriptionStore for Table<Subscription> {
    async fn find_active_by_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<Subscription>, Error> {
        let data = sqlx::query_as(
            r#"
            SELECT * FROM push_subscription
            WHERE user_id = $1
            AND (expires_at IS NULL OR expires_at > NOW())
            "#,
        )
        .bind(user_id)
        .persistent(true)
        .fetch_all(&self.pool)
        .await?;
        Ok(data)
    }

    async fn find_active(&self) -> Result<Vec<Subscription>, Error> {
        let data = sqlx::query_as(
            r#"
            SELECT * FROM push_subscription
            WHERE expires_at IS NULL OR expires_at > NOW()
            "#,
        )
        .persistent(true)
        .fetch_all(&self.pool)
        .await?;
        Ok(data)
    }

    async fn find_by_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<Subscription>, Error> {
        let data = sqlx::query_as(
            r#"
            SELECT * FROM push_subscription
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .persistent(true)
        .fetch_all(&self.pool)
        .await?;
        Ok(data)
    }

    async fn find_active_by_topic(
        &self,
        topic: &str,
    ) -> Result<Vec<Subscription>, Error> {
        let data = sqlx::query_as(
            r#"
            SELECT * FROM push_subscription
            WHERE topic = $1
            AND (expires_at IS NULL OR expires_at > NOW())
            "#,
        )
        .bind(topic)
        .persistent(true)
        .fetch_all(&self.pool)
        .await?;
        Ok(data)
    }

    async fn delete(&self, id: i64) -> Result<bool, Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM push_subscription WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn touch_last_used(
        &self,
        id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE push_subscription SET last_used_at = $2 WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert(
        &self,
        subscription: NewSubscription,
    ) -> Result<Subscription, Error> {
        let data = sqlx::query_as(
            r#"
            INSERT INTO push_subscription (user_id, endpoint, p256dh, auth, topic, device_info, expires_at)
            VALUES($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (endpoint) DO UPDATE SET
                user_id = EXCLUDED.user_id,
                p256dh = EXCLUDED.p256dh,
                auth = EXCLUDED.auth,
                topic = EXCLUDED.topic,
                device_info = EXCLUDED.device_info,
                expires_at = EXCLUDED.expires_at,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(subscription.user_id)
        .bind(&subscription.endpoint)
        .bind(&subscription.p256dh)
        .bind(&subscription.auth)
        .bind(&subscription.topic)
        .bind(&subscription.device_info)
        .bind(subscription.expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(data)
    }

    async fn delete_by_endpoint(&self, endpoint: &str) -> Result<bool, Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM push_subscription WHERE endpoint = $1
            "#,
        )
        .bind(endpoint)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_stale(
        &self,
        expired_before: DateTime<Utc>,
        unused_before: DateTime<Utc>,
    ) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM push_subscription
            WHERE
                (expires_at IS NOT NULL AND expires_at < $1)
            OR
                COALESCE(last_used_at, created_at) < $2
            "#,
        )
        .bind(expired_before)
        .bind(unused_before)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
