use tracing::{debug, instrument};

use crate::{
    client::Khabar,
    error::ClientError,
    http::{HttpClient, HttpRequest},
    models::{Comment, CommentDraft, NewsItem},
    paths::{comment_create_path, comment_update_path, news_detail_path, COMMENTS_LIST_PATH},
};

impl Khabar {
    /// One article with its comments.
    #[instrument(skip(self))]
    pub async fn article(&self, id: i64) -> Result<NewsItem, ClientError> {
        self.request(HttpRequest::get(news_detail_path(id))).await
    }

    pub async fn comments(&self) -> Result<Vec<Comment>, ClientError> {
        let value = self.request_json(HttpRequest::get(COMMENTS_LIST_PATH)).await?;
        if value.is_null() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Comment on an article as the signed-in user.
    #[instrument(skip(self, text))]
    pub async fn post_comment(
        &self,
        news_id: i64,
        text: impl Into<String>,
    ) -> Result<Comment, ClientError> {
        let draft = self.comment_draft(news_id, text)?;
        let req = HttpRequest::post(comment_create_path(news_id))
            .authenticated()
            .json(&draft)?;
        self.request(req).await
    }

    /// Only the comment's author may update it; the backend answers 403 otherwise.
    #[instrument(skip(self, text))]
    pub async fn update_comment(
        &self,
        comment_id: i64,
        news_id: i64,
        text: impl Into<String>,
    ) -> Result<Comment, ClientError> {
        let draft = self.comment_draft(news_id, text)?;
        let req = HttpRequest::put(comment_update_path(comment_id))
            .authenticated()
            .json(&draft)?;
        self.request(req).await
    }

    fn comment_draft(&self, news_id: i64, text: impl Into<String>) -> Result<CommentDraft, ClientError> {
        let identity = self.session.identity().ok_or(ClientError::Unauthorized)?;
        let comment = text.into();
        if comment.trim().is_empty() {
            return Err(ClientError::InvalidRequest("Comment must not be empty".to_string()));
        }
        debug!(user_id = identity.user_id, "Drafting comment");
        Ok(CommentDraft {
            user: identity.user_id,
            news: news_id,
            comment,
        })
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        extract::Path,
        http::StatusCode,
        routing::{get, post, put},
        Json, Router,
    };
    use chrono::Local;
    use serde_json::{json, Value};

    use super::*;
    use crate::http::mock::serve;
    use crate::models::{
        fixtures::{news_json, token_pair},
        SessionIdentity, Source,
    };

    fn comment_json(id: i64, user: i64, news: i64, text: &str) -> Value {
        json!({
            "id": id,
            "user": user,
            "news": news,
            "comment": text,
            "created_at": "2024-03-01T10:00:00.123456Z",
            "updated_at": "2024-03-01T10:05:00.123456Z",
        })
    }

    fn backend() -> Router {
        Router::new()
            .route(
                "/api/news/newslist/:pk/",
                get(|Path(pk): Path<i64>| async move {
                    if pk == 404 {
                        return Err((StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found." }))));
                    }
                    Ok(Json(news_json(pk, "Ekantipur", Local::now().fixed_offset())))
                }),
            )
            .route(
                "/api/news/comments/list",
                get(|| async { Json(json!([comment_json(1, 2, 3, "first")])) }),
            )
            .route(
                "/api/news/comments/create/:pk",
                post(|Path(pk): Path<i64>, Json(body): Json<Value>| async move {
                    let user = body["user"].as_i64().unwrap_or_default();
                    Json(comment_json(9, user, pk, body["comment"].as_str().unwrap_or_default()))
                }),
            )
            .route(
                "/api/news/comments/update/:pk",
                put(|Path(pk): Path<i64>, Json(body): Json<Value>| async move {
                    if body["user"] != json!(5) {
                        return Err((
                            StatusCode::FORBIDDEN,
                            Json(json!({ "detail": "You do not have permission to perform this action." })),
                        ));
                    }
                    Ok(Json(comment_json(pk, 5, body["news"].as_i64().unwrap_or_default(), "edited")))
                }),
            )
    }

    fn sign_in(client: &Khabar, user_id: i64) {
        let tokens = token_pair(user_id);
        let identity = SessionIdentity::decode(tokens.access()).unwrap();
        client.session.authenticate(tokens, identity);
    }

    #[tokio::test]
    async fn fetches_article_and_comments() {
        let client = Khabar::builder().base_url(serve(backend()).await).build();

        let article = client.article(12).await.unwrap();
        assert_eq!(article.id, 12);
        assert_eq!(article.source, Source::Ekantipur);

        let comments = client.comments().await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].comment, "first");

        let err = client.article(404).await.unwrap_err();
        assert!(matches!(err, ClientError::ApiError(ref e) if e.detail.as_deref() == Some("Not found.")));
    }

    #[tokio::test]
    async fn commenting_requires_a_session() {
        let client = Khabar::builder().base_url(serve(backend()).await).build();

        let err = client.post_comment(3, "hello").await.unwrap_err();
        assert!(matches!(err, ClientError::Unauthorized));
        assert_eq!(client.health_status().total_requests, 0);

        sign_in(&client, 5);
        let comment = client.post_comment(3, "hello").await.unwrap();
        assert_eq!((comment.user, comment.news, comment.comment.as_str()), (5, 3, "hello"));

        let err = client.post_comment(3, "   ").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn only_the_author_updates_a_comment() {
        let client = Khabar::builder().base_url(serve(backend()).await).build();

        sign_in(&client, 5);
        let comment = client.update_comment(9, 3, "edited").await.unwrap();
        assert_eq!(comment.id, 9);
        assert_eq!(comment.comment, "edited");

        sign_in(&client, 6);
        let err = client.update_comment(9, 3, "hijack").await.unwrap_err();
        assert!(matches!(err, ClientError::ApiError(_)));
    }
}
