//! Stoat API data shapes.
//!
//! Only the fields the bridge actually reads are modelled; everything
//! else in the wire payloads is ignored by serde.

use serde::{Deserialize, Serialize};

/// A file stored on the Stoat media server.
#[derive(Debug, Clone, Deserialize)]
pub struct StoatFile {
    #[serde(rename = "_id")]
    pub id: String,
    /// Media server bucket, e.g. "attachments" or "avatars".
    pub tag: String,
    pub filename: String,
    #[serde(default)]
    pub size: Option<u64>,
}

/// A Stoat user profile.
#[derive(Debug, Clone, Deserialize)]
pub struct StoatUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<StoatFile>,
}

impl StoatUser {
    /// Preferred human-readable name.
    pub fn display(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

/// A custom emoji definition.
#[derive(Debug, Clone, Deserialize)]
pub struct StoatEmoji {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

/// Per-message identity override, Stoat's native impersonation primitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Masquerade {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// A message as delivered by the gateway or REST API.
#[derive(Debug, Clone, Deserialize)]
pub struct StoatMessage {
    #[serde(rename = "_id")]
    pub id: String,
    pub channel: String,
    /// Author user id.
    pub author: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub attachments: Option<Vec<StoatFile>>,
    /// Ids of messages this one replies to.
    #[serde(default)]
    pub replies: Option<Vec<String>>,
    #[serde(default)]
    pub masquerade: Option<Masquerade>,
}

impl StoatMessage {
    /// First reply target, if the message is a reply.
    pub fn reply_id(&self) -> Option<&str> {
        self.replies
            .as_ref()
            .and_then(|r| r.first())
            .map(String::as_str)
    }
}

/// Reply pointer on an outbound message.
#[derive(Debug, Clone, Serialize)]
pub struct ReplyIntent {
    pub id: String,
    pub mention: bool,
}

/// Payload for `POST /channels/{id}/messages`.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundStoatMessage {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub masquerade: Option<Masquerade>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<ReplyIntent>>,
}

/// Root API metadata, fetched once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiInfo {
    /// WebSocket gateway URL.
    pub ws: String,
    #[serde(default)]
    pub features: Option<ApiFeatures>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiFeatures {
    #[serde(default)]
    pub autumn: Option<MediaInfo>,
}

/// Media server location.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaInfo {
    pub url: String,
}

/// Events arriving over the gateway WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum GatewayEvent {
    /// Authentication accepted.
    Authenticated,
    /// Initial state dump after authentication. Contents unused.
    Ready,
    /// A new message was posted.
    Message(StoatMessage),
    /// A message was deleted.
    MessageDelete { id: String, channel: String },
    /// Heartbeat response. Payload ignored.
    Pong,
    /// Server-side error report.
    Error { error: String },
    /// Anything the bridge does not care about.
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_event_parses() {
        let raw = r#"{
            "type": "Message",
            "_id": "01MSG",
            "channel": "01CHAN",
            "author": "01USER",
            "content": "hello",
            "replies": ["01OLD"],
            "attachments": [
                {"_id": "01FILE", "tag": "attachments", "filename": "cat.png", "size": 123}
            ]
        }"#;

        let event: GatewayEvent = serde_json::from_str(raw).unwrap();
        match event {
            GatewayEvent::Message(msg) => {
                assert_eq!(msg.id, "01MSG");
                assert_eq!(msg.channel, "01CHAN");
                assert_eq!(msg.content.as_deref(), Some("hello"));
                assert_eq!(msg.reply_id(), Some("01OLD"));
                let files = msg.attachments.unwrap();
                assert_eq!(files[0].filename, "cat.png");
                assert_eq!(files[0].size, Some(123));
            }
            other => panic!("expected Message, got {:?}", other),
        }
    }

    #[test]
    fn test_delete_event_parses() {
        let raw = r#"{"type": "MessageDelete", "id": "01MSG", "channel": "01CHAN"}"#;
        let event: GatewayEvent = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            event,
            GatewayEvent::MessageDelete { ref id, ref channel }
                if id == "01MSG" && channel == "01CHAN"
        ));
    }

    #[test]
    fn test_unknown_event_is_tolerated() {
        let raw = r#"{"type": "ChannelStartTyping", "id": "01CHAN"}"#;
        let event: GatewayEvent = serde_json::from_str(raw).unwrap();
        assert!(matches!(event, GatewayEvent::Other));
    }

    #[test]
    fn test_outbound_message_skips_empty_fields() {
        let payload = OutboundStoatMessage {
            content: "hi".to_string(),
            masquerade: None,
            replies: None,
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"content":"hi"}"#);
    }

    #[test]
    fn test_user_display_prefers_display_name() {
        let user = StoatUser {
            id: "01U".to_string(),
            username: "kay_01".to_string(),
            display_name: Some("Kay".to_string()),
            avatar: None,
        };
        assert_eq!(user.display(), "Kay");

        let bare = StoatUser {
            id: "01U".to_string(),
            username: "kay_01".to_string(),
            display_name: None,
            avatar: None,
        };
        assert_eq!(bare.display(), "kay_01");
    }
}
