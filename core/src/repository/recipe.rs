use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use super::{OutcomeStream, one_shot, read_through};
use crate::api::{DetailRecipeResponse, GeneralResponse, RemoteClient, item_to_recipe};
use crate::db::Database;
use crate::live::LiveQuery;
use crate::models::Recipe;

pub struct RecipeRepository {
    remote: Arc<dyn RemoteClient>,
    db: Arc<Database>,
}

impl RecipeRepository {
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteClient>, db: Arc<Database>) -> Self {
        Self { remote, db }
    }

    /// Full recipe with ingredients and steps. Not cached.
    pub fn get_detail_recipe_by_id(&self, recipe_id: i64) -> OutcomeStream<DetailRecipeResponse> {
        let remote = Arc::clone(&self.remote);
        one_shot("Loading recipe detail", async move {
            remote.get_detail_recipe_by_id(recipe_id).await
        })
    }

    pub fn get_recommended_recipes(&self, user_id: i64) -> OutcomeStream<Vec<Recipe>> {
        let remote = Arc::clone(&self.remote);
        let db = Arc::clone(&self.db);
        let live = Arc::clone(&self.db);
        read_through(
            "recommended recipes",
            async move { refresh_recommended(remote.as_ref(), &db, user_id).await },
            move || live.watch_recommended_recipes(),
        )
    }

    pub fn get_favorite_recipes(&self, user_id: i64) -> OutcomeStream<Vec<Recipe>> {
        let remote = Arc::clone(&self.remote);
        let db = Arc::clone(&self.db);
        let live = Arc::clone(&self.db);
        read_through(
            "favorite recipes",
            async move { refresh_favorites(remote.as_ref(), &db, user_id).await },
            move || live.watch_favorite_recipes(),
        )
    }

    pub fn add_favorite_recipe(&self, user_id: i64, recipe_id: i64) -> OutcomeStream<GeneralResponse> {
        let remote = Arc::clone(&self.remote);
        let db = Arc::clone(&self.db);
        one_shot("Adding favorite", async move {
            let response = remote.add_favorite_recipe(user_id, recipe_id).await?;
            set_favorite(&db, recipe_id, true)?;
            Ok(response)
        })
    }

    pub fn delete_favorite_recipe(
        &self,
        user_id: i64,
        recipe_id: i64,
    ) -> OutcomeStream<GeneralResponse> {
        let remote = Arc::clone(&self.remote);
        let db = Arc::clone(&self.db);
        one_shot("Removing favorite", async move {
            let response = remote.delete_favorite_recipe(user_id, recipe_id).await?;
            set_favorite(&db, recipe_id, false)?;
            Ok(response)
        })
    }

    pub fn is_recipe_favorite_local(&self, recipe_id: i64) -> LiveQuery<bool> {
        self.db.watch_recipe_favorite(recipe_id)
    }

    pub fn favorite_recipes_local(&self) -> LiveQuery<Vec<Recipe>> {
        self.db.watch_favorite_recipes()
    }

    pub fn recommended_recipes_local(&self) -> LiveQuery<Vec<Recipe>> {
        self.db.watch_recommended_recipes()
    }

    /// Drop every local favorite flag, e.g. when the user logs out.
    pub fn clear_favorite(&self) -> Result<()> {
        self.db.reset_favorite()
    }
}

async fn refresh_recommended(remote: &dyn RemoteClient, db: &Database, user_id: i64) -> Result<()> {
    let response = remote.get_recommended_recipes(user_id).await?;
    // The favorite flag is carried over by the database
    let recipes: Vec<Recipe> = response
        .list_recipe
        .iter()
        .map(|item| item_to_recipe(item, false, true))
        .collect();
    db.replace_recommended_recipes(&recipes)?;
    debug!(count = recipes.len(), user_id, "Recommended recipes loaded");
    Ok(())
}

async fn refresh_favorites(remote: &dyn RemoteClient, db: &Database, user_id: i64) -> Result<()> {
    let response = remote.get_favorite_recipes(user_id).await?;
    let recipes: Vec<Recipe> = response
        .list_favorite_recipe
        .iter()
        .map(|item| item_to_recipe(item, true, false))
        .collect();
    db.replace_favorite_recipes(&recipes)?;
    debug!(count = recipes.len(), user_id, "Favorite recipes loaded");
    Ok(())
}

fn set_favorite(db: &Database, recipe_id: i64, is_favorite: bool) -> Result<()> {
    let mut recipe = db.get_recipe_by_id(recipe_id)?;
    recipe.is_favorite = is_favorite;
    db.update_recipe(&recipe)
}
