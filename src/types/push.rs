//! Push notification types
//!
//! Notification payloads, delivery hints and per-subscription delivery results.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, str::FromStr};

use crate::error::Error;

pub const MAX_TITLE_LENGTH: usize = 255;
pub const MAX_MESSAGE_LENGTH: usize = 1000;
pub const MAX_TOPIC_LENGTH: usize = 32;

// =============================================================================
// Urgency Enum
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Urgency {
    VeryLow,
    Low,
    Normal,
    High,
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Urgency::VeryLow => write!(f, "very-low"),
            Urgency::Low => write!(f, "low"),
            Urgency::Normal => write!(f, "normal"),
            Urgency::High => write!(f, "high"),
        }
    }
}

impl FromStr for Urgency {
    type Err = Error;

    fn from_str(value: &str) -> Result<Urgency, Self::Err> {
        match value {
            "very-low" => Ok(Urgency::VeryLow),
            "low" => Ok(Urgency::Low),
            "normal" => Ok(Urgency::Normal),
            "high" => Ok(Urgency::High),
            _ => Err(Error::InvalidOption {
                option: format!("urgency {}", value),
            }),
        }
    }
}

// =============================================================================
// Push Headers
// =============================================================================

/// Delivery headers shared by every request of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushHeader {
    pub ttl: u32,
    pub urgency: Urgency,
    pub topic: Option<String>,
    pub content_type: &'static str,
    pub content_encoding: Option<&'static str>,
}

// =============================================================================
// Notification Payload
// =============================================================================

/// Application notification. Validated on construction and immutable
/// afterwards; the same instance is encoded once per dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationPayload {
    title: String,
    message: String,
    icon: Option<String>,
    badge: Option<String>,
    image: Option<String>,
    tag: Option<String>,
    data: Value,
    ttl: Option<u32>,
    urgency: Option<Urgency>,
    topic: Option<String>,
}

impl NotificationPayload {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<Self, Error> {
        let title = title.into();
        let message = message.into();

        if title.trim().is_empty() {
            return Err(Error::InvalidPayload(String::from(
                "title is required",
            )));
        }

        if message.trim().is_empty() {
            return Err(Error::InvalidPayload(String::from(
                "message is required",
            )));
        }

        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(Error::InvalidPayload(format!(
                "title exceeds {} characters",
                MAX_TITLE_LENGTH
            )));
        }

        if message.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(Error::InvalidPayload(format!(
                "message exceeds {} characters",
                MAX_MESSAGE_LENGTH
            )));
        }

        Ok(Self {
            title,
            message,
            icon: None,
            badge: None,
            image: None,
            tag: None,
            data: Value::Object(Default::default()),
            ttl: None,
            urgency: None,
            topic: None,
        })
    }

    pub fn with_data(mut self, data: Value) -> Result<Self, Error> {
        match data {
            Value::Object(_) => self.data = data,
            Value::Null => {},
            _ => {
                return Err(Error::InvalidPayload(String::from(
                    "data must be a JSON object",
                )));
            },
        }
        Ok(self)
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_badge(mut self, badge: impl Into<String>) -> Self {
        self.badge = Some(badge.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = Some(urgency);
        self
    }

    /// Collapse key sent as the `Topic` header. Push services accept at most
    /// 32 characters from the URL-safe base64 alphabet.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Result<Self, Error> {
        let topic = topic.into();
        let valid_chars = topic
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if topic.is_empty() || topic.len() > MAX_TOPIC_LENGTH || !valid_chars
        {
            return Err(Error::InvalidPayload(format!(
                "topic must be 1-{} URL-safe base64 characters",
                MAX_TOPIC_LENGTH
            )));
        }

        self.topic = Some(topic);
        Ok(self)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn badge(&self) -> Option<&str> {
        self.badge.as_deref()
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn ttl(&self) -> Option<u32> {
        self.ttl
    }

    pub fn urgency(&self) -> Option<Urgency> {
        self.urgency
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }
}

// =============================================================================
// Delivery Result
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Delivered,
    SubscriptionGone,
    PayloadTooLarge,
    RateLimited,
    TransientFailure,
}

impl DeliveryOutcome {
    pub fn from_status(status: u16) -> Self {
        match status {
            200..=299 => DeliveryOutcome::Delivered,
            404 | 410 => DeliveryOutcome::SubscriptionGone,
            413 => DeliveryOutcome::PayloadTooLarge,
            429 => DeliveryOutcome::RateLimited,
            _ => DeliveryOutcome::TransientFailure,
        }
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DeliveryOutcome::Delivered => write!(f, "delivered"),
            DeliveryOutcome::SubscriptionGone => write!(f, "subscription_gone"),
            DeliveryOutcome::PayloadTooLarge => write!(f, "payload_too_large"),
            DeliveryOutcome::RateLimited => write!(f, "rate_limited"),
            DeliveryOutcome::TransientFailure => write!(f, "transient_failure"),
        }
    }
}

/// Outcome of one delivery attempt. `status` is absent when no HTTP
/// response was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResult {
    pub outcome: DeliveryOutcome,
    pub status: Option<u16>,
    pub message: Option<String>,
}

impl DeliveryResult {
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        Self {
            outcome: DeliveryOutcome::from_status(status),
            status: Some(status),
            message,
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            outcome: DeliveryOutcome::TransientFailure,
            status: None,
            message: Some(message.into()),
        }
    }

    pub fn is_delivered(&self) -> bool {
        self.outcome == DeliveryOutcome::Delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_codes_classify() {
        assert_eq!(DeliveryOutcome::from_status(201), DeliveryOutcome::Delivered);
        assert_eq!(DeliveryOutcome::from_status(200), DeliveryOutcome::Delivered);
        assert_eq!(
            DeliveryOutcome::from_status(404),
            DeliveryOutcome::SubscriptionGone
        );
        assert_eq!(
            DeliveryOutcome::from_status(410),
            DeliveryOutcome::SubscriptionGone
        );
        assert_eq!(
            DeliveryOutcome::from_status(413),
            DeliveryOutcome::PayloadTooLarge
        );
        assert_eq!(DeliveryOutcome::from_status(429), DeliveryOutcome::RateLimited);
        assert_eq!(
            DeliveryOutcome::from_status(400),
            DeliveryOutcome::TransientFailure
        );
        assert_eq!(
            DeliveryOutcome::from_status(503),
            DeliveryOutcome::TransientFailure
        );
        assert_eq!(
            DeliveryOutcome::from_status(301),
            DeliveryOutcome::TransientFailure
        );
    }

    #[test]
    fn urgency_parses_wire_names() {
        assert_eq!(Urgency::from_str("very-low").unwrap(), Urgency::VeryLow);
        assert_eq!(Urgency::from_str("high").unwrap(), Urgency::High);
        assert_eq!(Urgency::Normal.to_string(), "normal");
        assert!(Urgency::from_str("urgent").is_err());
    }

    #[test]
    fn payload_rejects_blank_title_and_message() {
        assert!(matches!(
            NotificationPayload::new("  ", "body"),
            Err(Error::InvalidPayload(_))
        ));
        assert!(matches!(
            NotificationPayload::new("title", ""),
            Err(Error::InvalidPayload(_))
        ));
    }

    #[test]
    fn payload_rejects_oversized_fields() {
        let long_title = "t".repeat(MAX_TITLE_LENGTH + 1);
        assert!(NotificationPayload::new(long_title, "body").is_err());

        let long_message = "m".repeat(MAX_MESSAGE_LENGTH + 1);
        assert!(NotificationPayload::new("title", long_message).is_err());
    }

    #[test]
    fn payload_data_must_be_object() {
        let payload = NotificationPayload::new("title", "body").unwrap();
        assert!(payload.clone().with_data(json!([1, 2])).is_err());

        let payload = payload.with_data(json!({ "url": "/inbox" })).unwrap();
        assert_eq!(payload.data()["url"], "/inbox");
    }

    #[test]
    fn topic_must_be_url_safe_and_short() {
        let payload = NotificationPayload::new("title", "body").unwrap();
        assert!(payload.clone().with_topic("order_42-update").is_ok());
        assert!(payload.clone().with_topic("has space").is_err());
        assert!(payload.clone().with_topic("x".repeat(33)).is_err());
        assert!(payload.with_topic("").is_err());
    }
}
