pub use self::{
    push::{
        DeliveryOutcome, DeliveryResult, NotificationPayload, PushHeader,
        Urgency, MAX_MESSAGE_LENGTH, MAX_TITLE_LENGTH, MAX_TOPIC_LENGTH,
    },
    subscription::{Keys, Subscription, Unsubscribe},
};

mod push;
mod subscription;
