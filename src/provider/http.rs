use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::{
    error::Error,
    model::Subscription,
    types::{DeliveryResult, PushHeader},
};

/// Network adapter for one push request per subscription. Never retries
/// and never touches subscription state.
#[derive(Debug, Clone)]
pub struct DeliveryClient {
    http: Client,
}

impl DeliveryClient {
    pub fn new(
        connect_timeout: Duration,
        user_agent: &str,
    ) -> Result<DeliveryClient, Error> {
        let http = Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(DeliveryClient { http })
    }

    pub async fn deliver(
        &self,
        subscription: &Subscription,
        authorization: &str,
        body: Vec<u8>,
        push_header: &PushHeader,
        timeout: Duration,
    ) -> DeliveryResult {
        let header_map = match Self::header_map(authorization, push_header) {
            Ok(headers) => headers,
            Err(e) => return DeliveryResult::transient(e.to_string()),
        };

        let response = self
            .http
            .post(subscription.endpoint.as_str())
            .headers(header_map)
            .timeout(timeout)
            .body(body)
            .send()
            .await;

        match response {
            Ok(response) => {
                let status = response.status();
                let message = if status.is_success() {
                    None
                } else {
                    response.text().await.ok().filter(|text| !text.is_empty())
                };
                debug!(
                    subscription_id = subscription.id,
                    status = status.as_u16(),
                    "Push service responded"
                );
                DeliveryResult::from_status(status.as_u16(), message)
            },
            Err(e) if e.is_timeout() => DeliveryResult::transient(format!(
                "request timed out after {:?}",
                timeout
            )),
            Err(e) => DeliveryResult::transient(e.to_string()),
        }
    }

    fn header_map(
        authorization: &str,
        push_header: &PushHeader,
    ) -> Result<HeaderMap, Error> {
        let mut header_map = HeaderMap::new();

        header_map.insert(
            HeaderName::from_str("authorization")?,
            HeaderValue::from_str(authorization)?,
        );
        header_map.insert(
            HeaderName::from_str("content-type")?,
            HeaderValue::from_static(push_header.content_type),
        );
        if let Some(encoding) = push_header.content_encoding {
            header_map.insert(
                HeaderName::from_str("content-encoding")?,
                HeaderValue::from_static(encoding),
            );
        }
        header_map.insert(
            HeaderName::from_str("ttl")?,
            HeaderValue::from_str(&push_header.ttl.to_string())?,
        );
        header_map.insert(
            HeaderName::from_str("urgency")?,
            HeaderValue::from_str(&push_header.urgency.to_string())?,
        );
        if let Some(topic) = &push_header.topic {
            header_map.insert(
                HeaderName::from_str("topic")?,
                HeaderValue::from_str(topic)?,
            );
        }

        Ok(header_map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DeliveryOutcome, Urgency};
    use chrono::Utc;
    use wiremock::{
        matchers::{body_bytes, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn subscription(endpoint: String) -> Subscription {
        let now = Utc::now();
        Subscription {
            id: 9,
            user_id: Some(1),
            endpoint,
            p256dh: String::from("key"),
            auth: String::from("secret"),
            topic: String::from("general"),
            device_info: None,
            expires_at: None,
            last_used_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn push_header() -> PushHeader {
        PushHeader {
            ttl: 3600,
            urgency: Urgency::High,
            topic: Some(String::from("orders")),
            content_type: "application/json",
            content_encoding: Some("aes128gcm"),
        }
    }

    fn client() -> DeliveryClient {
        DeliveryClient::new(Duration::from_secs(2), "webpush-dispatch/test")
            .unwrap()
    }

    async fn respond_with(status: u16) -> DeliveryResult {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;

        client()
            .deliver(
                &subscription(format!("{}/push", server.uri())),
                "vapid t=a.b.c, k=key",
                b"{}".to_vec(),
                &push_header(),
                Duration::from_secs(2),
            )
            .await
    }

    #[tokio::test]
    async fn sends_wire_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/push/abc"))
            .and(header("authorization", "vapid t=a.b.c, k=key"))
            .and(header("ttl", "3600"))
            .and(header("urgency", "high"))
            .and(header("topic", "orders"))
            .and(header("content-type", "application/json"))
            .and(header("content-encoding", "aes128gcm"))
            .and(header("user-agent", "webpush-dispatch/test"))
            .and(body_bytes(b"payload".to_vec()))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let result = client()
            .deliver(
                &subscription(format!("{}/push/abc", server.uri())),
                "vapid t=a.b.c, k=key",
                b"payload".to_vec(),
                &push_header(),
                Duration::from_secs(2),
            )
            .await;

        assert_eq!(result.outcome, DeliveryOutcome::Delivered);
        assert_eq!(result.status, Some(201));
    }

    #[tokio::test]
    async fn maps_status_codes_to_outcomes() {
        assert_eq!(respond_with(200).await.outcome, DeliveryOutcome::Delivered);
        assert_eq!(
            respond_with(404).await.outcome,
            DeliveryOutcome::SubscriptionGone
        );
        assert_eq!(
            respond_with(410).await.outcome,
            DeliveryOutcome::SubscriptionGone
        );
        assert_eq!(
            respond_with(413).await.outcome,
            DeliveryOutcome::PayloadTooLarge
        );
        assert_eq!(respond_with(429).await.outcome, DeliveryOutcome::RateLimited);

        let failed = respond_with(500).await;
        assert_eq!(failed.outcome, DeliveryOutcome::TransientFailure);
        assert_eq!(failed.status, Some(500));
    }

    #[tokio::test]
    async fn keeps_push_service_diagnostics() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string("invalid JWT"),
            )
            .mount(&server)
            .await;

        let result = client()
            .deliver(
                &subscription(server.uri()),
                "vapid t=a.b.c, k=key",
                Vec::new(),
                &push_header(),
                Duration::from_secs(2),
            )
            .await;

        assert_eq!(result.outcome, DeliveryOutcome::TransientFailure);
        assert_eq!(result.message.as_deref(), Some("invalid JWT"));
    }

    #[tokio::test]
    async fn timeout_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(201).set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let result = client()
            .deliver(
                &subscription(server.uri()),
                "vapid t=a.b.c, k=key",
                Vec::new(),
                &push_header(),
                Duration::from_millis(200),
            )
            .await;

        assert_eq!(result.outcome, DeliveryOutcome::TransientFailure);
        assert_eq!(result.status, None);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transient() {
        let result = client()
            .deliver(
                &subscription(String::from("http://127.0.0.1:9/push")),
                "vapid t=a.b.c, k=key",
                Vec::new(),
                &push_header(),
                Duration::from_secs(1),
            )
            .await;

        assert_eq!(result.outcome, DeliveryOutcome::TransientFailure);
        assert!(result.message.is_some());
    }
}
