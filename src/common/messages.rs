//! Canonical message types for bridge communication.
//!
//! Each platform listener translates its native event payload into the
//! direction-agnostic types here before anything else touches it, so the
//! dispatcher never sees serenity or Stoat wire shapes directly.

use std::fmt;

/// Identifier of a channel or message on one of the two platforms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformRef {
    /// Discord snowflake.
    Discord(u64),
    /// Stoat ULID.
    Stoat(String),
}

impl PlatformRef {
    /// The Discord snowflake, if this reference points at Discord.
    pub fn discord(&self) -> Option<u64> {
        match self {
            PlatformRef::Discord(id) => Some(*id),
            PlatformRef::Stoat(_) => None,
        }
    }

    /// The Stoat ULID, if this reference points at Stoat.
    pub fn stoat(&self) -> Option<&str> {
        match self {
            PlatformRef::Discord(_) => None,
            PlatformRef::Stoat(id) => Some(id.as_str()),
        }
    }
}

impl fmt::Display for PlatformRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformRef::Discord(id) => write!(f, "discord:{}", id),
            PlatformRef::Stoat(id) => write!(f, "stoat:{}", id),
        }
    }
}

/// Author presentation carried across the bridge.
#[derive(Debug, Clone)]
pub struct AuthorProfile {
    /// Display name as it should appear on the destination.
    pub name: String,
    /// Avatar URL, if the author has one.
    pub avatar_url: Option<String>,
}

/// An attachment on an inbound message.
#[derive(Debug, Clone)]
pub struct InboundAttachment {
    /// Public URL of the file on the source platform's CDN.
    pub url: String,
    /// Original filename.
    pub filename: String,
    /// Declared size in bytes, when the source platform reports one.
    pub size: Option<u64>,
}

/// Inbound chat message, built at the platform boundary.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Channel the message arrived in.
    pub channel: PlatformRef,
    /// The message's own id.
    pub id: PlatformRef,
    /// Author presentation.
    pub author: AuthorProfile,
    /// Raw message text, still carrying platform mention syntax.
    pub content: String,
    /// Id of the message this one replies to, if any.
    pub reply_to: Option<PlatformRef>,
    /// Attached files.
    pub attachments: Vec<InboundAttachment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_ref_accessors() {
        let d = PlatformRef::Discord(42);
        assert_eq!(d.discord(), Some(42));
        assert_eq!(d.stoat(), None);

        let s = PlatformRef::Stoat("01ABC".to_string());
        assert_eq!(s.discord(), None);
        assert_eq!(s.stoat(), Some("01ABC"));
    }

    #[test]
    fn test_platform_ref_display() {
        assert_eq!(PlatformRef::Discord(7).to_string(), "discord:7");
        assert_eq!(
            PlatformRef::Stoat("X".to_string()).to_string(),
            "stoat:X"
        );
    }
}
