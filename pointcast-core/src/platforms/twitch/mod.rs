// File: pointcast-core/src/platforms/twitch/mod.rs

pub mod auth;

pub use auth::{OAuthClient, TokenGrant, TwitchOAuthClient, ValidatedToken};
