//! Stoat platform integration: REST client, gateway connection, data
//! shapes, and outbound text resolution.

pub mod client;
pub mod gateway;
pub mod models;
pub mod resolver;

pub use client::StoatClient;
pub use resolver::{EmojiCache, StoatResolver};
