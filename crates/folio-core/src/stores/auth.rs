use std::sync::{Arc, Mutex};

use tracing::info;

use super::errors::ErrorStore;
use super::state::{ActionResult, StoreState};
use crate::api::{ApiClient, RequestOptions, LOGIN_ENDPOINT};
use crate::models::{LoginRequest, LoginResponse, User};

const CURRENT_USER_ENDPOINT: &str = "/auth/me";

/// Login/logout and the signed-in user.
///
/// The token itself lives only in the client's `TokenManager`; this store
/// never keeps a copy of it.
#[derive(Debug)]
pub struct AuthStore {
    api: ApiClient,
    state: StoreState,
    user: Mutex<Option<User>>,
}

impl AuthStore {
    pub fn new(api: ApiClient, errors: Arc<ErrorStore>) -> Self {
        Self {
            api,
            state: StoreState::new("auth", errors),
            user: Mutex::new(None),
        }
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn current_user(&self) -> Option<User> {
        self.user.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set_user(&self, user: Option<User>) {
        *self.user.lock().unwrap_or_else(|e| e.into_inner()) = user;
    }

    pub fn is_authenticated(&self) -> bool {
        self.api.tokens().has_valid_token()
    }

    pub fn is_admin(&self) -> bool {
        self.is_authenticated() && self.current_user().is_some_and(|u| u.is_admin)
    }

    /// Exchange credentials for a token, then load the user behind it.
    ///
    /// A 401 here is reported with the server's own message (wrong password)
    /// and leaves any existing session alone.
    pub async fn login(&self, username: &str, password: &str, remember_me: bool) -> ActionResult<User> {
        self.state
            .run("login", async {
                let request = LoginRequest {
                    username: username.to_string(),
                    password: password.to_string(),
                    remember_me,
                };
                let body = serde_json::to_value(&request)?;
                let response: LoginResponse = self
                    .api
                    .request(LOGIN_ENDPOINT, RequestOptions::post(body).skip_auth_check())
                    .await?
                    .json()?;

                self.api.tokens().set_token(
                    &response.access_token,
                    response.token_type.as_deref(),
                    response.expires_in,
                    remember_me,
                )?;
                // Anything cached belongs to the previous identity
                self.api.reset_session();
                info!(username = username, remember_me, "Logged in");

                self.load_user().await
            })
            .await
    }

    pub async fn fetch_current_user(&self) -> ActionResult<User> {
        self.state.run("fetch_current_user", self.load_user()).await
    }

    async fn load_user(&self) -> ActionResult<User> {
        let user: User = self.api.get_fresh(CURRENT_USER_ENDPOINT).await?;
        self.set_user(Some(user.clone()));
        Ok(user)
    }

    /// Local logout: forget the token, the user and every cached response.
    pub async fn logout(&self) -> ActionResult<()> {
        self.state
            .run("logout", async {
                self.set_user(None);
                self.api.reset_session();
                self.api.tokens().clear_token()?;
                info!("Logged out");
                Ok(())
            })
            .await
    }
}
