// File: pointcast-core/src/repositories/postgres/mod.rs

pub mod accounts;
pub mod credentials;
pub mod triggers;
pub mod usage;

pub use accounts::PostgresAccountRepository;
pub use credentials::PostgresCredentialsRepository;
pub use triggers::PostgresTriggerRepository;
pub use usage::PostgresUsageRepository;
