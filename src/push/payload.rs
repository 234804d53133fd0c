//! Notification body and content headers
//!
//! The JSON body is produced once per dispatch. With `Aes128Gcm` it is then
//! sealed separately for each subscription under its `p256dh`/`auth` keys
//! (RFC 8291).

use std::str::FromStr;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64_URL, Engine};
use serde::Serialize;
use serde_json::Value;

use crate::{
    error::Error,
    model::Subscription,
    types::{NotificationPayload, PushHeader, Urgency},
};

/// Largest plaintext that fits one aes128gcm record inside the 4096-byte
/// message limit push services enforce.
pub const MAX_PAYLOAD_SIZE: usize = 3993;

pub const CONTENT_TYPE: &str = "application/json";
pub const CONTENT_ENCODING: &str = "aes128gcm";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadEncryption {
    Aes128Gcm,
    /// Body sent as plain JSON. Only for endpoints that accept it.
    Plain,
}

impl FromStr for PayloadEncryption {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "aes128gcm" => Ok(PayloadEncryption::Aes128Gcm),
            "plain" => Ok(PayloadEncryption::Plain),
            _ => Err(Error::InvalidOption {
                option: format!("encryption {}", value),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotificationDefaults {
    pub icon: String,
    pub badge: String,
    pub ttl: u32,
    pub urgency: Urgency,
}

#[derive(Debug, Clone)]
pub struct EncodedPayload {
    pub body: Vec<u8>,
    pub headers: PushHeader,
}

#[derive(Serialize)]
struct Body<'a> {
    title: &'a str,
    message: &'a str,
    icon: &'a str,
    badge: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<&'a str>,
    data: &'a Value,
}

#[derive(Debug, Clone)]
pub struct PayloadEncoder {
    defaults: NotificationDefaults,
    encryption: PayloadEncryption,
}

impl PayloadEncoder {
    pub fn new(
        defaults: NotificationDefaults,
        encryption: PayloadEncryption,
    ) -> Self {
        Self {
            defaults,
            encryption,
        }
    }

    pub fn encryption(&self) -> PayloadEncryption {
        self.encryption
    }

    pub fn encode(
        &self,
        payload: &NotificationPayload,
    ) -> Result<EncodedPayload, Error> {
        let body = serde_json::to_vec(&Body {
            title: payload.title(),
            message: payload.message(),
            icon: payload.icon().unwrap_or(self.defaults.icon.as_str()),
            badge: payload.badge().unwrap_or(self.defaults.badge.as_str()),
            image: payload.image(),
            tag: payload.tag(),
            data: payload.data(),
        })?;

        if body.len() > MAX_PAYLOAD_SIZE {
            return Err(Error::PayloadTooLarge {
                size: body.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let content_encoding = match self.encryption {
            PayloadEncryption::Aes128Gcm => Some(CONTENT_ENCODING),
            PayloadEncryption::Plain => None,
        };

        let headers = PushHeader {
            ttl: payload.ttl().unwrap_or(self.defaults.ttl),
            urgency: payload.urgency().unwrap_or(self.defaults.urgency),
            topic: payload.topic().map(str::to_owned),
            content_type: CONTENT_TYPE,
            content_encoding,
        };

        Ok(EncodedPayload { body, headers })
    }

    /// Request body for one subscription.
    pub fn seal(
        &self,
        encoded: &EncodedPayload,
        subscription: &Subscription,
    ) -> Result<Vec<u8>, Error> {
        match self.encryption {
            PayloadEncryption::Plain => Ok(encoded.body.clone()),
            PayloadEncryption::Aes128Gcm => {
                let p256dh = BASE64_URL.decode(subscription.p256dh.trim())?;
                let auth = BASE64_URL.decode(subscription.auth.trim())?;
                let data = ece::encrypt(&p256dh, &auth, &encoded.body)?;
                Ok(data)
            },
        }
    }
}
