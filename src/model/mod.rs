//! Database models module

mod subscription;
mod table;

pub use subscription::{NewSubscription, Subscription, DEFAULT_TOPIC};
pub use table::Table;
