use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    error::AuthError,
    http::{HttpClient, HttpRequest},
    models::{Credentials, SessionIdentity, TokenPair, TokenResponse},
    paths::TOKEN_PATH,
    session::{AuthState, Session},
    storage::TokenStore,
    util::cancellable,
};

/// Owns the credential exchange and the persisted token pair.
///
/// `Anonymous -> Authenticated` on login or restore, back to `Anonymous` on logout.
pub struct SessionManager<H, S> {
    http: H,
    store: S,
    session: Session,
}

impl<H: HttpClient, S: TokenStore> SessionManager<H, S> {
    pub fn new(http: H, store: S, session: Session) -> Self {
        Self {
            http,
            store,
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn status(&self) -> AuthState {
        self.session.auth_state()
    }

    pub fn identity(&self) -> Option<SessionIdentity> {
        self.session.identity()
    }

    /// Restore the session from durable storage at startup.
    ///
    /// Entries that cannot be read, decoded, or whose access token has expired
    /// are removed and the session stays anonymous.
    pub fn init(&self) -> AuthState {
        let tokens = match self.store.load() {
            Ok(Some(tokens)) if tokens.is_complete() => tokens,
            Ok(Some(_)) => {
                warn!("Stored token pair is incomplete, discarding");
                self.discard_stored();
                return self.status();
            }
            Ok(None) => {
                debug!("No stored session");
                return self.status();
            }
            Err(e) => {
                warn!(error = %e, "Failed to read stored session, discarding");
                self.discard_stored();
                return self.status();
            }
        };

        match SessionIdentity::decode(tokens.access()) {
            Ok(identity) if identity.is_expired() => {
                info!("Stored access token has expired, discarding");
                self.discard_stored();
            }
            Ok(identity) => {
                info!(user_id = identity.user_id, "Session restored from storage");
                self.session.authenticate(tokens, identity);
            }
            Err(e) => {
                warn!(error = %e, "Stored access token cannot be decoded, discarding");
                self.discard_stored();
            }
        }
        self.status()
    }

    /// Exchange credentials for a token pair and commit it.
    ///
    /// Nothing is written unless the pair is complete, its access token decodes,
    /// and `cancel` has not fired.
    #[instrument(skip(self, credentials, cancel), fields(email = %credentials.email))]
    pub async fn login(
        &self,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> Result<(), AuthError> {
        let req = HttpRequest::post(TOKEN_PATH).json(credentials)?;
        let response: TokenResponse = cancellable(cancel, self.http.request(req)).await?;

        let Some(tokens) = response.into_pair() else {
            warn!("Token endpoint succeeded without both tokens");
            return Err(AuthError::MalformedTokenResponse);
        };

        if cancel.is_cancelled() {
            return Err(AuthError::Cancelled);
        }
        self.commit(tokens)?;
        info!("Login succeeded");
        Ok(())
    }

    /// Commit a token pair obtained elsewhere, e.g. by a refresh flow.
    pub fn update_tokens(&self, tokens: TokenPair) -> Result<(), AuthError> {
        if !tokens.is_complete() {
            return Err(AuthError::MalformedTokenResponse);
        }
        self.commit(tokens)
    }

    /// Clear the persisted token pair, then the in-memory session.
    ///
    /// If storage cannot be cleared the session is left as it was, so it never
    /// reads `Anonymous` while a restorable pair is still on disk.
    pub fn logout(&self) -> Result<(), AuthError> {
        if let Err(e) = self.store.clear() {
            error!(error = %e, "Failed to clear stored session, still signed in");
            return Err(e.into());
        }
        self.session.clear();
        info!("Logged out successfully");
        Ok(())
    }

    fn commit(&self, tokens: TokenPair) -> Result<(), AuthError> {
        let identity = SessionIdentity::decode(tokens.access())?;
        self.store.save(&tokens)?;
        self.session.authenticate(tokens, identity);
        Ok(())
    }

    fn discard_stored(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear stored session");
        }
    }
}
