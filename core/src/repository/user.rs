use std::sync::Arc;

use anyhow::Result;
use futures::stream::BoxStream;

use super::{OutcomeStream, one_shot};
use crate::api::{GeneralResponse, LoginResponse, RemoteClient};
use crate::models::User;
use crate::preferences::UserPreferences;

/// Account calls against the remote API plus the locally stored session.
///
/// `login` does not persist anything; callers decide what to keep and pass
/// it to `save_user`.
pub struct UserRepository {
    remote: Arc<dyn RemoteClient>,
    prefs: Arc<UserPreferences>,
}

impl UserRepository {
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteClient>, prefs: Arc<UserPreferences>) -> Self {
        Self { remote, prefs }
    }

    pub fn register(&self, name: &str, email: &str, password: &str) -> OutcomeStream<GeneralResponse> {
        let remote = Arc::clone(&self.remote);
        let (name, email, password) = (name.to_string(), email.to_string(), password.to_string());
        one_shot("Registration", async move {
            remote.register(&name, &email, &password).await
        })
    }

    pub fn login(&self, email: &str, password: &str) -> OutcomeStream<LoginResponse> {
        let remote = Arc::clone(&self.remote);
        let (email, password) = (email.to_string(), password.to_string());
        one_shot("Login", async move { remote.login(&email, &password).await })
    }

    pub fn logout(&self) -> Result<()> {
        self.prefs.logout()
    }

    pub fn save_user(&self, user: &User) -> Result<()> {
        self.prefs.save_user(user)
    }

    pub fn get_user(&self) -> BoxStream<'static, User> {
        self.prefs.user_stream()
    }

    #[must_use]
    pub fn current_user(&self) -> User {
        self.prefs.user()
    }

    pub fn get_first_time_status(&self) -> BoxStream<'static, bool> {
        self.prefs.first_time_stream()
    }

    pub fn set_first_time_status(&self, first_time: bool) -> Result<()> {
        self.prefs.set_first_time_status(first_time)
    }
}
