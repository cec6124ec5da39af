mod account;
mod auth;
mod news;
mod source;

pub use account::{Gender, Registration, UserProfile, MIN_PASSWORD_LEN};
pub use auth::{Credentials, SessionIdentity, TokenPair};
pub(crate) use auth::TokenResponse;
pub use news::{Comment, CommentDraft, FeedSnapshot, NewsItem, Partition};
pub use source::{ScraperKey, Source};
