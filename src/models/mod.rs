//! Core data models for the pastebin service.
//!
//! These entities represent the persisted shape of pastes and users. They map
//! cleanly to database rows via `sqlx::FromRow` and serialize naturally as
//! JSON via `serde`.

pub mod paste;
pub mod user;
