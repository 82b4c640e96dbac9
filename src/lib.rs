pub mod codec;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod render;
pub mod request;
pub mod resource;
pub mod router;
pub mod server;
pub mod store;

pub use codec::{html_escape, url_decode};
pub use config::ServerConfig;
pub use error::{ConfigError, ServerError};
pub use rate_limit::RateLimiter;
pub use render::{render_template, Rendered, CHAT_MARKER};
pub use request::{parse_request, Request, Submission};
pub use resource::{MemorySource, ResourceSource, StaticDir};
pub use router::{route, Route};
pub use server::Server;
pub use store::{ChatMessage, MessageStore};
