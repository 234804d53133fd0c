use actix_web::{post, web, HttpRequest, HttpResponse, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::authorize;
use crate::{
    configuration::{AppState, State},
    error::Error,
    handler::{DispatchReport, Target},
    types::{NotificationPayload, Urgency},
};

#[post("/send")]
pub async fn index(
    state: web::Data<AppState<State>>,
    data: web::Json<SendRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, Error> {
    authorize(&state, &req)?;
    let data = data.into_inner();

    let target = match data.r#type.as_str() {
        "user" => Target::User(user_target(data.target.as_ref())?),
        "all" => Target::All,
        "topic" => match data.target {
            Some(Value::String(topic)) if !topic.is_empty() => {
                Target::Topic(topic)
            },
            _ => {
                return Err(Error::InvalidPayload(String::from(
                    "target topic is required",
                )));
            },
        },
        other => {
            return Err(Error::InvalidOption {
                option: format!("type {}", other),
            });
        },
    };

    dispatch(&state, target, data.notification).await
}

#[post("/send-to-user")]
pub async fn user_index(
    state: web::Data<AppState<State>>,
    data: web::Json<UserRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, Error> {
    authorize(&state, &req)?;
    let data = data.into_inner();
    dispatch(&state, Target::User(data.user_id), data.notification).await
}

#[post("/send-to-all")]
pub async fn all_index(
    state: web::Data<AppState<State>>,
    data: web::Json<AllRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, Error> {
    authorize(&state, &req)?;
    dispatch(&state, Target::All, data.into_inner().notification).await
}

#[post("/send-to-topic")]
pub async fn topic_index(
    state: web::Data<AppState<State>>,
    data: web::Json<TopicRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, Error> {
    authorize(&state, &req)?;
    let data = data.into_inner();

    if data.topic.trim().is_empty() {
        return Err(Error::InvalidPayload(String::from("topic is required")));
    }

    dispatch(&state, Target::Topic(data.topic), data.notification).await
}

async fn dispatch(
    state: &AppState<State>,
    target: Target,
    notification: Notification,
) -> Result<HttpResponse, Error> {
    let payload = notification.into_payload()?;
    let report = state
        .dispatcher
        .dispatch(&target, &payload, &CancellationToken::new())
        .await?;

    Ok(HttpResponse::Ok().json(Response {
        success: true,
        sent: report.delivered,
        report,
    }))
}

fn user_target(target: Option<&Value>) -> Result<i64, Error> {
    let user_id = match target {
        Some(Value::Number(number)) => number.as_i64(),
        Some(Value::String(value)) => value.parse().ok(),
        _ => None,
    };

    user_id.ok_or_else(|| {
        Error::InvalidPayload(String::from("target user id is required"))
    })
}

#[derive(Debug, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub icon: Option<String>,
    pub badge: Option<String>,
    pub image: Option<String>,
    pub tag: Option<String>,
    pub data: Option<Value>,
    pub ttl: Option<u32>,
    pub urgency: Option<Urgency>,
    pub topic: Option<String>,
}

impl Notification {
    pub fn into_payload(self) -> Result<NotificationPayload, Error> {
        let mut payload = NotificationPayload::new(self.title, self.message)?;

        if let Some(data) = self.data {
            payload = payload.with_data(data)?;
        }
        if let Some(icon) = self.icon {
            payload = payload.with_icon(icon);
        }
        if let Some(badge) = self.badge {
            payload = payload.with_badge(badge);
        }
        if let Some(image) = self.image {
            payload = payload.with_image(image);
        }
        if let Some(tag) = self.tag {
            payload = payload.with_tag(tag);
        }
        if let Some(ttl) = self.ttl {
            payload = payload.with_ttl(ttl);
        }
        if let Some(urgency) = self.urgency {
            payload = payload.with_urgency(urgency);
        }
        if let Some(topic) = self.topic {
            payload = payload.with_topic(topic)?;
        }

        Ok(payload)
    }
}

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub r#type: String,
    pub target: Option<Value>,
    pub notification: Notification,
}

#[derive(Debug, Deserialize)]
pub struct UserRequest {
    #[serde(alias = "userId")]
    pub user_id: i64,
    pub notification: Notification,
}

#[derive(Debug, Deserialize)]
pub struct AllRequest {
    pub notification: Notification,
}

#[derive(Debug, Deserialize)]
pub struct TopicRequest {
    pub topic: String,
    pub notification: Notification,
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub success: bool,
    pub sent: usize,
    pub report: DispatchReport,
}
