//! Explicitly initialized sign-in state.
//!
//! The bearer token lives in the `auth` namespace of the local store and is
//! pushed into the REST client whenever it changes.

use desk_logging::{desk_info, desk_warn};
use docdesk_core::model::User;
use thiserror::Error;

use crate::{ApiError, LocalStore, Namespace, ReqwestApiClient, StoreError};

const TOKEN_KEY: &str = "token";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug)]
pub struct AuthSession {
    store: LocalStore,
    token: Option<String>,
    user: Option<User>,
}

impl AuthSession {
    /// Loads a previously stored token and hands it to `client`.
    pub fn init(store: LocalStore, client: &ReqwestApiClient) -> Self {
        let token = match store.load::<String>(Namespace::Auth, TOKEN_KEY) {
            Ok(token) => token,
            Err(err) => {
                desk_warn!("Ignoring unreadable auth token: {}", err);
                None
            }
        };
        client.set_token(token.clone());
        Self {
            store,
            token,
            user: None,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.token.is_some()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub async fn login(
        &mut self,
        client: &ReqwestApiClient,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let response = client.login(email, password).await?;
        self.store.save(Namespace::Auth, TOKEN_KEY, &response.token)?;
        client.set_token(Some(response.token.clone()));
        desk_info!("Signed in as {}", response.user.email);
        self.token = Some(response.token);
        self.user = Some(response.user.clone());
        Ok(response.user)
    }

    /// Fetches the user behind a restored token. A rejected token is dropped.
    pub async fn refresh_user(&mut self, client: &ReqwestApiClient) -> Result<User, AuthError> {
        match client.current_user().await {
            Ok(user) => {
                self.user = Some(user.clone());
                Ok(user)
            }
            Err(ApiError::Status { status: 401, message }) => {
                self.logout(client)?;
                Err(ApiError::Status {
                    status: 401,
                    message,
                }
                .into())
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn logout(&mut self, client: &ReqwestApiClient) -> Result<(), AuthError> {
        client.set_token(None);
        self.token = None;
        self.user = None;
        self.store.clear(Namespace::Auth, TOKEN_KEY)?;
        Ok(())
    }
}
