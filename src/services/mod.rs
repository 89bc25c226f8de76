pub mod drive_client;
pub mod oauth_client;
pub mod rate_limit;
#[cfg(feature = "redis")]
pub mod redis_store;
pub mod session_store;

pub use drive_client::DriveClient;
pub use oauth_client::OAuthClient;
pub use rate_limit::RateLimiter;
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;
pub use session_store::{MemoryStore, SessionStore};
