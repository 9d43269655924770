//! Discord platform integration: serenity client wiring, webhook
//! provisioning, and outbound text resolution.

pub mod bot;
pub mod resolver;
pub mod webhooks;

pub use bot::{build_client, DiscordEvent};
pub use resolver::DiscordResolver;
pub use webhooks::WebhookRegistry;
