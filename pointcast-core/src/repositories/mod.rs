// File: pointcast-core/src/repositories/mod.rs

pub mod postgres;

pub use postgres::{
    PostgresAccountRepository, PostgresCredentialsRepository, PostgresTriggerRepository,
    PostgresUsageRepository,
};
