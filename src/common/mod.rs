//! Common types shared across the bridge.

pub mod error;
pub mod messages;
pub mod text;

pub use messages::{AuthorProfile, InboundAttachment, InboundMessage, PlatformRef};
