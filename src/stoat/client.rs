//! Stoat REST client.
//!
//! Thin wrapper over reqwest for the handful of endpoints the bridge
//! needs. Authentication is a bot token header on every request; the
//! shared client carries bounded connect/request timeouts so no relay
//! step can hang indefinitely.

use reqwest::RequestBuilder;
use tracing::debug;

use crate::common::error::{StoatError, StoatResult};
use crate::common::{AuthorProfile, InboundAttachment, InboundMessage, PlatformRef};
use crate::stoat::models::{
    ApiInfo, OutboundStoatMessage, StoatEmoji, StoatFile, StoatMessage, StoatUser,
};

/// Fallback endpoints when the root API metadata cannot be fetched.
pub const DEFAULT_API_URL: &str = "https://api.revolt.chat";
const FALLBACK_WS_URL: &str = "wss://ws.revolt.chat";
const FALLBACK_MEDIA_URL: &str = "https://autumn.revolt.chat";

/// REST client for the Stoat API.
#[derive(Debug, Clone)]
pub struct StoatClient {
    http: reqwest::Client,
    api_url: String,
    media_url: String,
    token: String,
}

impl StoatClient {
    pub fn new(http: reqwest::Client, api_url: String, token: String) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            media_url: FALLBACK_MEDIA_URL.to_string(),
            token,
        }
    }

    fn auth(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("x-bot-token", &self.token)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> StoatResult<T> {
        let response = self
            .auth(self.http.get(format!("{}{}", self.api_url, path)))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoatError::Api {
                status: status.as_u16(),
                body: crate::common::text::truncate_chars(&body, 200),
            });
        }
        Ok(response.json().await?)
    }

    /// Fetch the root API metadata and remember the advertised media
    /// server. Returns the gateway WebSocket URL.
    pub async fn discover_gateway(&mut self) -> String {
        match self.get_json::<ApiInfo>("/").await {
            Ok(info) => {
                if let Some(media) = info.features.and_then(|f| f.autumn) {
                    self.media_url = media.url.trim_end_matches('/').to_string();
                }
                info.ws
            }
            Err(e) => {
                debug!("Could not fetch API metadata ({}), using defaults", e);
                FALLBACK_WS_URL.to_string()
            }
        }
    }

    /// Fetch the bot's own profile.
    pub async fn fetch_self(&self) -> StoatResult<StoatUser> {
        self.get_json("/users/@me").await
    }

    pub async fn fetch_user(&self, user_id: &str) -> StoatResult<StoatUser> {
        self.get_json(&format!("/users/{}", user_id)).await
    }

    pub async fn fetch_message(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> StoatResult<StoatMessage> {
        self.get_json(&format!("/channels/{}/messages/{}", channel_id, message_id))
            .await
    }

    pub async fn fetch_emoji(&self, emoji_id: &str) -> StoatResult<StoatEmoji> {
        self.get_json(&format!("/custom/emoji/{}", emoji_id)).await
    }

    /// Post a message, returning the created message (and its id).
    pub async fn send_message(
        &self,
        channel_id: &str,
        payload: &OutboundStoatMessage,
    ) -> StoatResult<StoatMessage> {
        let response = self
            .auth(
                self.http
                    .post(format!("{}/channels/{}/messages", self.api_url, channel_id)),
            )
            .json(payload)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoatError::Api {
                status: status.as_u16(),
                body: crate::common::text::truncate_chars(&body, 200),
            });
        }
        Ok(response.json().await?)
    }

    pub async fn delete_message(&self, channel_id: &str, message_id: &str) -> StoatResult<()> {
        let response = self
            .auth(self.http.delete(format!(
                "{}/channels/{}/messages/{}",
                self.api_url, channel_id, message_id
            )))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoatError::Api {
                status: status.as_u16(),
                body: crate::common::text::truncate_chars(&body, 200),
            });
        }
        Ok(())
    }

    /// Public URL of a file on the media server.
    pub fn file_url(&self, file: &StoatFile) -> String {
        format!(
            "{}/{}/{}/{}",
            self.media_url, file.tag, file.id, file.filename
        )
    }

    /// Translate a gateway message into the bridge's canonical shape.
    ///
    /// The author profile is passed in separately because the gateway
    /// only delivers the author id; a masquerade on the message still
    /// wins over the profile, matching how Stoat renders it.
    pub fn inbound_message(&self, msg: &StoatMessage, author: &StoatUser) -> InboundMessage {
        let masquerade = msg.masquerade.as_ref();
        let name = masquerade
            .and_then(|m| m.name.clone())
            .unwrap_or_else(|| author.display().to_string());
        let avatar_url = masquerade
            .and_then(|m| m.avatar.clone())
            .or_else(|| author.avatar.as_ref().map(|f| self.file_url(f)));

        InboundMessage {
            channel: PlatformRef::Stoat(msg.channel.clone()),
            id: PlatformRef::Stoat(msg.id.clone()),
            author: AuthorProfile { name, avatar_url },
            content: msg.content.clone().unwrap_or_default(),
            reply_to: msg
                .reply_id()
                .map(|id| PlatformRef::Stoat(id.to_string())),
            attachments: msg
                .attachments
                .iter()
                .flatten()
                .map(|file| InboundAttachment {
                    url: self.file_url(file),
                    filename: file.filename.clone(),
                    size: file.size,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stoat::models::Masquerade;

    fn client() -> StoatClient {
        StoatClient::new(
            reqwest::Client::new(),
            "https://api.example/".to_string(),
            "token".to_string(),
        )
    }

    fn message() -> StoatMessage {
        StoatMessage {
            id: "01MSG".to_string(),
            channel: "01CHAN".to_string(),
            author: "01USER".to_string(),
            content: Some("hello".to_string()),
            attachments: Some(vec![StoatFile {
                id: "01FILE".to_string(),
                tag: "attachments".to_string(),
                filename: "cat.png".to_string(),
                size: Some(42),
            }]),
            replies: None,
            masquerade: None,
        }
    }

    fn author() -> StoatUser {
        StoatUser {
            id: "01USER".to_string(),
            username: "kay_01".to_string(),
            display_name: Some("Kay".to_string()),
            avatar: None,
        }
    }

    #[test]
    fn test_file_url_layout() {
        let file = StoatFile {
            id: "01FILE".to_string(),
            tag: "attachments".to_string(),
            filename: "cat.png".to_string(),
            size: None,
        };
        assert_eq!(
            client().file_url(&file),
            "https://autumn.revolt.chat/attachments/01FILE/cat.png"
        );
    }

    #[test]
    fn test_inbound_message_uses_author_profile() {
        let inbound = client().inbound_message(&message(), &author());

        assert_eq!(inbound.channel, PlatformRef::Stoat("01CHAN".to_string()));
        assert_eq!(inbound.id, PlatformRef::Stoat("01MSG".to_string()));
        assert_eq!(inbound.author.name, "Kay");
        assert_eq!(inbound.content, "hello");
        assert_eq!(inbound.attachments.len(), 1);
        assert_eq!(inbound.attachments[0].filename, "cat.png");
        assert_eq!(inbound.attachments[0].size, Some(42));
    }

    #[test]
    fn test_inbound_message_masquerade_wins() {
        let mut msg = message();
        msg.masquerade = Some(Masquerade {
            name: Some("Someone Else".to_string()),
            avatar: Some("https://cdn.example/a.png".to_string()),
        });

        let inbound = client().inbound_message(&msg, &author());
        assert_eq!(inbound.author.name, "Someone Else");
        assert_eq!(
            inbound.author.avatar_url.as_deref(),
            Some("https://cdn.example/a.png")
        );
    }
}
