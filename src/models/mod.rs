mod file_info;
mod requests;
mod session;

pub use file_info::FileInfoResponse;
pub use requests::{
    CallbackParams, HealthResponse, PollParams, PollResponse, ProxyParams, RefreshRequest,
    StartParams, StartResponse,
};
pub use session::{AuthSession, CompositeState, OAuthResult, Provider};
