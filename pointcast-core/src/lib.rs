// File: pointcast-core/src/lib.rs

pub mod crypto;
pub mod db;
pub mod overlay;
pub mod platforms;
pub mod repositories;
pub mod services;
pub mod test_utils;

pub use db::Database;
pub use pointcast_common::error::Error;
