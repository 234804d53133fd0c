mod memory;
mod postgre;
mod store;

pub use self::{
    memory::MemoryStore,
    postgre::{get_path, PoolOption, PoolType},
    store::SubscriptionStore,
};
