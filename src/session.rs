use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::models::{SessionIdentity, TokenPair};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Anonymous,
    Authenticated,
}

/// Tokens and identity are either both present (`Authenticated`) or both absent.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    auth_state: AuthState,
    tokens: Option<TokenPair>,
    identity: Option<SessionIdentity>,
}

impl SessionState {
    pub fn auth_state(&self) -> AuthState {
        self.auth_state
    }

    pub fn identity(&self) -> Option<&SessionIdentity> {
        self.identity.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.auth_state, AuthState::Authenticated)
    }

    pub fn is_valid(&self) -> bool {
        match self.auth_state {
            AuthState::Anonymous => self.tokens.is_none() && self.identity.is_none(),
            AuthState::Authenticated => {
                self.tokens.as_ref().is_some_and(TokenPair::is_complete) && self.identity.is_some()
            }
        }
    }
}

/// Explicit session context shared by the gateway, the session manager and the route guard.
///
/// Only the session manager mutates it; everyone else reads derived status.
#[derive(Debug, Clone, Default)]
pub struct Session {
    state: Arc<RwLock<SessionState>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_state(&self) -> SessionState {
        self.state.read().clone()
    }

    pub fn auth_state(&self) -> AuthState {
        self.state.read().auth_state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().is_authenticated()
    }

    pub fn identity(&self) -> Option<SessionIdentity> {
        self.state.read().identity.clone()
    }

    pub(crate) fn access_token(&self) -> Option<String> {
        self.state
            .read()
            .tokens
            .as_ref()
            .map(|tokens| tokens.access().to_string())
    }

    pub(crate) fn authenticate(&self, tokens: TokenPair, identity: SessionIdentity) {
        let mut state = self.state.write();
        // Re-authenticating replaces the token pair in place
        info!("Auth state changed: {:?} -> {:?}", state.auth_state, AuthState::Authenticated);
        *state = SessionState {
            auth_state: AuthState::Authenticated,
            tokens: Some(tokens),
            identity: Some(identity),
        };
    }

    pub(crate) fn clear(&self) {
        let mut state = self.state.write();
        if state.is_authenticated() {
            info!("Auth state changed: {:?} -> {:?}", state.auth_state, AuthState::Anonymous);
        }
        *state = SessionState::default();
    }
}
