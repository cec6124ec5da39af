use tracing::{info, instrument};

use crate::{
    client::Khabar,
    error::ClientError,
    http::{HttpClient, HttpRequest},
    models::{Registration, UserProfile},
    paths::{account_path, ACCOUNT_CREATE_PATH},
};

impl Khabar {
    /// Create an account. The form is checked locally before anything is sent.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: &Registration) -> Result<UserProfile, ClientError> {
        registration.validate()?;
        let req = HttpRequest::post(ACCOUNT_CREATE_PATH).json(registration)?;
        let profile: UserProfile = self.request(req).await?;
        info!("Account created");
        Ok(profile)
    }

    pub async fn profile(&self, id: i64) -> Result<UserProfile, ClientError> {
        self.request(HttpRequest::get(account_path(id))).await
    }
}
