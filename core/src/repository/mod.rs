mod ingredient;
mod recipe;
mod user;

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use async_stream::stream;
use futures::StreamExt;
use futures::stream::BoxStream;
use tracing::{debug, warn};

use crate::api::RemoteClient;
use crate::db::Database;
use crate::live::LiveQuery;
use crate::outcome::Outcome;
use crate::preferences::UserPreferences;

pub use ingredient::IngredientRepository;
pub use recipe::RecipeRepository;
pub use user::UserRepository;

pub type OutcomeStream<T> = BoxStream<'static, Outcome<T>>;

/// The three repositories, wired to one set of collaborators.
///
/// Build this once at startup and hand out references; every repository
/// shares the same database, preference store and remote client.
pub struct Repositories {
    pub ingredients: IngredientRepository,
    pub recipes: RecipeRepository,
    pub users: UserRepository,
}

impl Repositories {
    #[must_use]
    pub fn new(
        remote: Arc<dyn RemoteClient>,
        db: Arc<Database>,
        prefs: Arc<UserPreferences>,
    ) -> Self {
        Self {
            ingredients: IngredientRepository::new(Arc::clone(&remote), Arc::clone(&db)),
            recipes: RecipeRepository::new(Arc::clone(&remote), db),
            users: UserRepository::new(remote, prefs),
        }
    }
}

/// `Loading`, then run `refresh`, then follow `local` for as long as the
/// caller keeps polling. A failed refresh is reported as `Error` and the
/// cached rows are still streamed afterwards.
fn read_through<T, R, L>(what: &'static str, refresh: R, local: L) -> OutcomeStream<T>
where
    T: Send + 'static,
    R: Future<Output = Result<()>> + Send + 'static,
    L: FnOnce() -> LiveQuery<T> + Send + 'static,
{
    stream! {
        yield Outcome::Loading;
        match refresh.await {
            Ok(()) => debug!("{what} refreshed"),
            Err(err) => {
                warn!("Failed to refresh {what}: {err:#}");
                yield Outcome::error(&err);
            }
        }
        let mut rows = local();
        while let Some(result) = rows.next().await {
            yield Outcome::from(result);
        }
    }
    .boxed()
}

/// `Loading`, then the result of `call`. The stream ends there.
fn one_shot<T, F>(what: &'static str, call: F) -> OutcomeStream<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    stream! {
        yield Outcome::Loading;
        let result = call.await;
        if let Err(err) = &result {
            warn!("{what} failed: {err:#}");
        }
        yield Outcome::from(result);
    }
    .boxed()
}

#[cfg(test)]
pub(crate) mod testing {
    use anyhow::{Result, bail};
    use async_trait::async_trait;
    use futures::StreamExt;

    use super::OutcomeStream;
    use crate::api::{
        DetailRecipeResponse, FavoriteRecipeListResponse, GeneralResponse,
        IngredientListResponse, LoginResponse, RecipeListResponse, RemoteClient,
    };
    use crate::outcome::Outcome;

    /// Every call fails with the same message.
    pub(crate) struct FailingClient(pub &'static str);

    #[async_trait]
    impl RemoteClient for FailingClient {
        async fn get_all_ingredients(&self) -> Result<IngredientListResponse> {
            bail!(self.0)
        }
        async fn get_pantry_ingredients(&self, _: i64) -> Result<IngredientListResponse> {
            bail!(self.0)
        }
        async fn add_pantry_ingredient(&self, _: i64, _: i64) -> Result<GeneralResponse> {
            bail!(self.0)
        }
        async fn delete_pantry_ingredient(&self, _: i64, _: i64) -> Result<GeneralResponse> {
            bail!(self.0)
        }
        async fn get_detail_recipe_by_id(&self, _: i64) -> Result<DetailRecipeResponse> {
            bail!(self.0)
        }
        async fn get_recommended_recipes(&self, _: i64) -> Result<RecipeListResponse> {
            bail!(self.0)
        }
        async fn get_favorite_recipes(&self, _: i64) -> Result<FavoriteRecipeListResponse> {
            bail!(self.0)
        }
        async fn add_favorite_recipe(&self, _: i64, _: i64) -> Result<GeneralResponse> {
            bail!(self.0)
        }
        async fn delete_favorite_recipe(&self, _: i64, _: i64) -> Result<GeneralResponse> {
            bail!(self.0)
        }
        async fn register(&self, _: &str, _: &str, _: &str) -> Result<GeneralResponse> {
            bail!(self.0)
        }
        async fn login(&self, _: &str, _: &str) -> Result<LoginResponse> {
            bail!(self.0)
        }
    }

    /// Poll until the first `Success`, returning every state seen on the way.
    pub(crate) async fn until_success<T>(stream: &mut OutcomeStream<T>) -> Vec<Outcome<T>> {
        let mut seen = Vec::new();
        while let Some(state) = stream.next().await {
            let done = matches!(state, Outcome::Success(_));
            seen.push(state);
            if done {
                break;
            }
        }
        seen
    }

    pub(crate) fn success<T>(state: Outcome<T>) -> T {
        match state {
            Outcome::Success(value) => value,
            Outcome::Loading => panic!("expected success, got loading"),
            Outcome::Error(message) => panic!("expected success, got error: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FailingClient;
    use super::*;
    use crate::fixtures::{FixtureClient, FixtureData};

    #[tokio::test]
    async fn test_repositories_share_one_database() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let prefs = Arc::new(UserPreferences::open_in_memory().unwrap());
        let remote: Arc<dyn RemoteClient> = Arc::new(FixtureClient::new(FixtureData::sample()));
        let repos = Repositories::new(remote, Arc::clone(&db), prefs);

        let states: Vec<_> = repos.ingredients.add_pantry_ingredient(1, 3).collect().await;
        // Nothing cached yet, so the local flip fails after the remote call
        assert!(matches!(
            states.last(),
            Some(Outcome::Error(message)) if message.starts_with("Ingredient 3 not found")
        ));

        let mut all = repos.ingredients.get_all_ingredients();
        let _ = testing::until_success(&mut all).await;
        assert_eq!(db.get_all_ingredients().unwrap().len(), 12);
    }

    #[tokio::test]
    async fn test_one_shot_ends_after_result() {
        let states: Vec<Outcome<i32>> = one_shot("answer", async { Ok(42) }).collect().await;
        assert_eq!(states, vec![Outcome::Loading, Outcome::Success(42)]);
    }

    #[tokio::test]
    async fn test_read_through_reports_error_then_follows_local() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let remote = FailingClient("network down");
        let live_db = Arc::clone(&db);
        let mut stream = read_through(
            "ingredients",
            async move { remote.get_all_ingredients().await.map(|_| ()) },
            move || live_db.watch_all_ingredients(),
        );

        assert_eq!(stream.next().await, Some(Outcome::Loading));
        assert_eq!(
            stream.next().await,
            Some(Outcome::Error("network down".to_string()))
        );
        assert_eq!(stream.next().await, Some(Outcome::Success(Vec::new())));
    }
}
