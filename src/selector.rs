use tracing::warn;

use crate::{error::ClientError, guard::Route, models::Source};

/// Turns a user's publisher pick into feed navigation.
///
/// Keys outside the fixed set are rejected here. The scrape-route table keeps
/// its own fallback, but nothing unrecognized reaches it through this entry point.
pub struct SourceSelector;

impl SourceSelector {
    /// `(key, label)` pairs in display order.
    pub fn options() -> Vec<(&'static str, &'static str)> {
        Source::all().map(|s| (s.key(), s.display_name())).collect()
    }

    pub fn select(key: &str) -> Result<Route, ClientError> {
        let source = Source::parse(key).inspect_err(|_| warn!(key, "Rejected unknown source"))?;
        Ok(Route::Feed { source })
    }
}
