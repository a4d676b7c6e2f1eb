pub mod config;
pub mod database;
pub mod repository;

pub use config::LedgerConfig;
pub use database::Database;
pub use repository::LedgerRepository;
