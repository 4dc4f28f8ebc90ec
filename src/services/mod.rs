//! Service layer: the store capability and the paste lifecycle engine.

pub mod paste_service;
pub mod store;
