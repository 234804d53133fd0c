use serde::Deserialize;
use serde_json::Value;

/// Registration body as produced by the browser `PushSubscription.toJSON()`
/// plus the owning user and targeting fields.
#[derive(Debug, Deserialize)]
pub struct Subscription {
    #[serde(alias = "userId")]
    pub user_id: Option<i64>,
    pub endpoint: String,
    #[serde(alias = "expirationTime")]
    pub expiration_time: Option<i64>,
    pub keys: Keys,
    pub topic: Option<String>,
    #[serde(alias = "deviceInfo")]
    pub device_info: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct Keys {
    pub p256dh: String,
    pub auth: String,
}

#[derive(Debug, Deserialize)]
pub struct Unsubscribe {
    pub endpoint: String,
}
