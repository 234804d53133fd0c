use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;

pub const DEFAULT_TOPIC: &str = "general";

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Subscription {
    pub id: i64,
    pub user_id: Option<i64>,
    pub endpoint: String,
    #[serde(skip_serializing)]
    pub p256dh: String,
    #[serde(skip_serializing)]
    pub auth: String,
    pub topic: String,
    pub device_info: Option<Value>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// A subscription without expiry, or expiring in the future, may be
    /// selected for delivery.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(at) => at > now,
            None => true,
        }
    }

    pub fn has_keys(&self) -> bool {
        !self.p256dh.trim().is_empty() && !self.auth.trim().is_empty()
    }
}

/// Registration data; an existing row with the same endpoint is updated
/// in place.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubscription {
    pub user_id: Option<i64>,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub topic: String,
    pub device_info: Option<Value>,
    pub expires_at: Option<DateTime<Utc>>,
}
