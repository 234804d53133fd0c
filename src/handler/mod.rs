pub mod dispatch;
pub mod lifecycle;
pub mod retention;

pub use self::{
    dispatch::{
        validate_endpoint, DispatchCoordinator, DispatchReport, Target,
        VapidPublicKey,
    },
    lifecycle::{LifecycleAction, SubscriptionLifecycleManager},
};
