//! Web Push protocol pieces: VAPID authorization and payload encoding.

pub mod payload;
pub mod vapid;

pub use self::{
    payload::{
        EncodedPayload, NotificationDefaults, PayloadEncoder,
        PayloadEncryption, MAX_PAYLOAD_SIZE,
    },
    vapid::{authorize, VapidKeyPair},
};
