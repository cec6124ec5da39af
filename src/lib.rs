pub mod api;
pub mod client;
pub mod error;
pub mod guard;
pub mod http;
pub mod models;
pub mod paths;
pub mod selector;
pub mod session;
pub mod storage;

mod serde_utils;
mod util;

pub mod prelude {
    pub use crate::api::{feed::FeedController, login::SessionManager};
    pub use crate::client::Khabar;
    pub use crate::error::{AuthError, ClientError};
    pub use crate::guard::{Navigation, Route, RouteGuard};
    pub use crate::models::{Credentials, FeedSnapshot, NewsItem, Source};
    pub use crate::selector::SourceSelector;
    pub use crate::session::{AuthState, Session};
    pub use crate::storage::{FileTokenStore, MemoryTokenStore, TokenStore};
    pub use tokio_util::sync::CancellationToken;
}
