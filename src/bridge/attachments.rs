//! Attachment relay planning.
//!
//! Discord accepts remote URLs in message text, so files leaving Discord
//! are never transferred - their CDN link is appended instead. Files
//! leaving Stoat are downloaded into memory and re-uploaded as native
//! Discord attachments, unless they exceed the upload ceiling or the
//! transfer fails, in which case the plan degrades to a link as well.

use bytes::Bytes;
use tracing::warn;

use crate::common::error::TransferError;
use crate::common::InboundAttachment;

/// How one attachment travels to the destination platform.
#[derive(Debug, Clone)]
pub enum AttachmentPlan {
    /// Append the source URL to the outbound text.
    AppendLink(String),
    /// Upload the downloaded bytes as a native attachment.
    Upload { filename: String, data: Bytes },
}

/// Whether a declared size is over the ceiling. The ceiling is inclusive:
/// a file of exactly the limit still transfers.
pub fn exceeds_ceiling(declared: Option<u64>, ceiling: u64) -> bool {
    declared.is_some_and(|size| size > ceiling)
}

/// Plan for an attachment leaving Discord: always a link.
pub fn link_plan(attachment: &InboundAttachment) -> AttachmentPlan {
    AttachmentPlan::AppendLink(attachment.url.clone())
}

/// Plan for an attachment leaving Stoat: download and re-upload when it
/// fits, fall back to the link otherwise.
pub async fn upload_plan(
    client: &reqwest::Client,
    attachment: &InboundAttachment,
    ceiling: u64,
) -> AttachmentPlan {
    if exceeds_ceiling(attachment.size, ceiling) {
        warn!(
            url = %attachment.url,
            size = attachment.size,
            "Skipping oversized file, falling back to link"
        );
        return AttachmentPlan::AppendLink(attachment.url.clone());
    }

    match fetch_bytes(client, &attachment.url, ceiling).await {
        Ok(data) => AttachmentPlan::Upload {
            filename: attachment.filename.clone(),
            data,
        },
        Err(e) => {
            warn!(url = %attachment.url, "File fetch failed ({}), falling back to link", e);
            AttachmentPlan::AppendLink(attachment.url.clone())
        }
    }
}

/// Download a file into memory, re-checking size before and after the
/// body arrives. The declared Content-Length can lie.
async fn fetch_bytes(
    client: &reqwest::Client,
    url: &str,
    ceiling: u64,
) -> Result<Bytes, TransferError> {
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(TransferError::Status {
            status: status.as_u16(),
        });
    }

    if let Some(length) = response.content_length() {
        if length > ceiling {
            return Err(TransferError::Oversized {
                size: length,
                limit: ceiling,
            });
        }
    }

    let data = response.bytes().await?;
    if data.len() as u64 > ceiling {
        return Err(TransferError::Oversized {
            size: data.len() as u64,
            limit: ceiling,
        });
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    fn attachment(size: Option<u64>) -> InboundAttachment {
        InboundAttachment {
            url: "https://cdn.example/file.png".to_string(),
            filename: "file.png".to_string(),
            size,
        }
    }

    #[test]
    fn test_ceiling_is_inclusive() {
        let ceiling = 25 * MIB;
        assert!(!exceeds_ceiling(Some(25 * MIB), ceiling));
        assert!(exceeds_ceiling(Some(25 * MIB + 1), ceiling));
        assert!(exceeds_ceiling(Some(30 * MIB), ceiling));
        assert!(!exceeds_ceiling(Some(0), ceiling));
        assert!(!exceeds_ceiling(None, ceiling));
    }

    #[test]
    fn test_discord_attachments_become_links() {
        let plan = link_plan(&attachment(Some(MIB)));
        match plan {
            AttachmentPlan::AppendLink(url) => {
                assert_eq!(url, "https://cdn.example/file.png");
            }
            AttachmentPlan::Upload { .. } => panic!("expected link plan"),
        }
    }

    #[tokio::test]
    async fn test_oversized_stoat_attachment_skips_download() {
        // 30 MiB declared against a 25 MiB ceiling: no request is made,
        // so a default client with no reachable server is fine.
        let client = reqwest::Client::new();
        let plan = upload_plan(&client, &attachment(Some(30 * MIB)), 25 * MIB).await;

        match plan {
            AttachmentPlan::AppendLink(url) => {
                assert_eq!(url, "https://cdn.example/file.png");
            }
            AttachmentPlan::Upload { .. } => panic!("expected link fallback"),
        }
    }

    #[tokio::test]
    async fn test_failed_download_degrades_to_link() {
        let client = reqwest::Client::new();
        let unreachable = InboundAttachment {
            url: "http://127.0.0.1:1/file.png".to_string(),
            filename: "file.png".to_string(),
            size: Some(MIB),
        };
        let plan = upload_plan(&client, &unreachable, 25 * MIB).await;

        assert!(matches!(plan, AttachmentPlan::AppendLink(_)));
    }
}
