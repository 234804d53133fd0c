use actix_web::{delete, get, post, web, HttpRequest, HttpResponse, Result};
use chrono::DateTime;
use serde::{Deserialize, Serialize};

use super::authorize;
use crate::{
    configuration::{AppState, State},
    error::Error,
    handler::validate_endpoint,
    model::{self, NewSubscription, DEFAULT_TOPIC},
    types,
};

#[get("/subscriptions")]
pub async fn get_index(
    state: web::Data<AppState<State>>,
    data: web::Query<Query>,
    req: HttpRequest,
) -> Result<HttpResponse, Error> {
    authorize(&state, &req)?;

    let subscriptions = state.store.find_by_user(data.user_id).await?;

    Ok(HttpResponse::Ok().json(List {
        success: true,
        count: subscriptions.len(),
        subscriptions,
    }))
}

#[post("/subscriptions")]
pub async fn post_index(
    state: web::Data<AppState<State>>,
    subscription: web::Json<types::Subscription>,
) -> Result<HttpResponse, Error> {
    let subscription = subscription.into_inner();

    if !validate_endpoint(&subscription.endpoint) {
        return Err(Error::InvalidEndpoint(subscription.endpoint));
    }

    if subscription.keys.p256dh.trim().is_empty()
        || subscription.keys.auth.trim().is_empty()
    {
        return Err(Error::InvalidPayload(String::from(
            "subscription keys p256dh and auth are required",
        )));
    }

    let expires_at = match subscription.expiration_time {
        Some(ms) => Some(DateTime::from_timestamp_millis(ms).ok_or_else(
            || {
                Error::InvalidPayload(format!(
                    "expirationTime {} is out of range",
                    ms
                ))
            },
        )?),
        None => None,
    };

    let topic = match subscription.topic {
        Some(topic) if !topic.trim().is_empty() => topic.trim().to_owned(),
        _ => String::from(DEFAULT_TOPIC),
    };

    let item = state
        .store
        .upsert(NewSubscription {
            user_id: subscription.user_id,
            endpoint: subscription.endpoint,
            p256dh: subscription.keys.p256dh,
            auth: subscription.keys.auth,
            topic,
            device_info: subscription.device_info,
            expires_at,
        })
        .await?;

    Ok(HttpResponse::Created().json(Response {
        success: true,
        subscription: item,
    }))
}

#[delete("/subscriptions")]
pub async fn delete_index(
    state: web::Data<AppState<State>>,
    data: web::Json<types::Unsubscribe>,
) -> Result<HttpResponse, Error> {
    let removed = state.store.delete_by_endpoint(&data.endpoint).await?;

    if !removed {
        return Err(Error::NotFound(String::from("subscription")));
    }

    Ok(HttpResponse::Ok().json(Removed { success: true }))
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub success: bool,
    pub subscription: model::Subscription,
}

#[derive(Debug, Serialize)]
pub struct Removed {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct Query {
    #[serde(alias = "userId")]
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct List {
    pub success: bool,
    pub subscriptions: Vec<model::Subscription>,
    pub count: usize,
}
