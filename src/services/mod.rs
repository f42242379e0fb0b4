//! Smaily Connect Services

pub mod cart;
pub mod catalog;
pub mod client;
pub mod cron;
pub mod cypher;
pub mod options;
pub mod sync;
pub mod users;

pub use cart::CartService;
pub use catalog::CatalogService;
pub use client::{SmailyApi, SmailyClient};
pub use cron::CronService;
pub use cypher::{Cypher, CypherKeys};
pub use options::OptionsService;
pub use sync::SubscriberSyncService;
pub use users::UserService;
