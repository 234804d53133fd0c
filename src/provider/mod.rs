pub use self::{database::DatabasePool, http::DeliveryClient};

mod database;
mod http;
