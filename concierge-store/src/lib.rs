pub mod app_config;
pub mod audit_repo;
pub mod booking_repo;
pub mod database;
pub mod events;
pub mod frontdesk_repo;
pub mod housekeeping_repo;
pub mod invoice_repo;
pub mod payment_repo;
pub mod redis_repo;
pub mod room_repo;
pub mod staff_repo;

pub use database::{seed_admin, DbClient};
pub use events::{EventProducer, KafkaNotifier};
pub use redis_repo::RedisClient;
