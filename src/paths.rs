pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api/";

pub const NEWS_LIST_PATH: &str = "news/newslist/";
pub const COMMENTS_LIST_PATH: &str = "news/comments/list";
pub const COMMENT_CREATE_PATH: &str = "news/comments/create/";
pub const COMMENT_UPDATE_PATH: &str = "news/comments/update/";
pub const SCRAPER_PATH: &str = "news/";

pub const TOKEN_PATH: &str = "account/token/";
pub const ACCOUNT_CREATE_PATH: &str = "account/create/";
pub const ACCOUNT_PATH: &str = "account/";

/// Key of the durable storage slot holding the serialized token pair.
pub const AUTH_TOKENS_KEY: &str = "authTokens";

pub fn news_detail_path(id: i64) -> String {
    format!("{NEWS_LIST_PATH}{id}/")
}

pub fn scraper_path(scraper_key: &str) -> String {
    format!("{SCRAPER_PATH}{scraper_key}/")
}

pub fn comment_create_path(news_id: i64) -> String {
    format!("{COMMENT_CREATE_PATH}{news_id}")
}

pub fn comment_update_path(comment_id: i64) -> String {
    format!("{COMMENT_UPDATE_PATH}{comment_id}")
}

pub fn account_path(id: i64) -> String {
    format!("{ACCOUNT_PATH}{id}/")
}
