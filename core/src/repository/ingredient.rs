use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use super::{OutcomeStream, one_shot, read_through};
use crate::api::{GeneralResponse, RemoteClient, item_to_ingredient};
use crate::db::Database;
use crate::live::LiveQuery;
use crate::models::{Ingredient, ShoppingItem, validate_quantity};

pub struct IngredientRepository {
    remote: Arc<dyn RemoteClient>,
    db: Arc<Database>,
}

impl IngredientRepository {
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteClient>, db: Arc<Database>) -> Self {
        Self { remote, db }
    }

    /// Refresh the full catalog (and the shopping list derived from it),
    /// then follow the local ingredient table.
    pub fn get_all_ingredients(&self) -> OutcomeStream<Vec<Ingredient>> {
        let remote = Arc::clone(&self.remote);
        let db = Arc::clone(&self.db);
        let live = Arc::clone(&self.db);
        read_through(
            "ingredients",
            async move { refresh_catalog(remote.as_ref(), &db).await },
            move || live.watch_all_ingredients(),
        )
    }

    /// Refresh the user's pantry, then follow the local pantry rows.
    pub fn get_pantry_ingredients(&self, user_id: i64) -> OutcomeStream<Vec<Ingredient>> {
        let remote = Arc::clone(&self.remote);
        let db = Arc::clone(&self.db);
        let live = Arc::clone(&self.db);
        read_through(
            "pantry",
            async move { refresh_pantry(remote.as_ref(), &db, user_id).await },
            move || live.watch_pantry_ingredients(),
        )
    }

    pub fn add_pantry_ingredient(
        &self,
        user_id: i64,
        ingredient_id: i64,
    ) -> OutcomeStream<GeneralResponse> {
        let remote = Arc::clone(&self.remote);
        let db = Arc::clone(&self.db);
        one_shot("Adding pantry ingredient", async move {
            let response = remote.add_pantry_ingredient(user_id, ingredient_id).await?;
            set_have(&db, ingredient_id, true)?;
            Ok(response)
        })
    }

    pub fn delete_pantry_ingredient(
        &self,
        user_id: i64,
        ingredient_id: i64,
    ) -> OutcomeStream<GeneralResponse> {
        let remote = Arc::clone(&self.remote);
        let db = Arc::clone(&self.db);
        one_shot("Removing pantry ingredient", async move {
            let response = remote
                .delete_pantry_ingredient(user_id, ingredient_id)
                .await?;
            set_have(&db, ingredient_id, false)?;
            Ok(response)
        })
    }

    // --- Local reads ---

    pub fn is_pantry_not_empty(&self) -> LiveQuery<bool> {
        self.db.watch_pantry_not_empty()
    }

    pub fn is_have_ingredient(&self, ingredient_id: i64) -> Result<bool> {
        self.db.is_have_ingredient(ingredient_id)
    }

    pub fn all_ingredients_local(&self) -> LiveQuery<Vec<Ingredient>> {
        self.db.watch_all_ingredients()
    }

    pub fn pantry_ingredients_local(&self) -> LiveQuery<Vec<Ingredient>> {
        self.db.watch_pantry_ingredients()
    }

    pub fn ingredients_by_category_local(&self, category_name: &str) -> LiveQuery<Vec<Ingredient>> {
        self.db.watch_ingredients_by_category(category_name)
    }

    pub fn search_ingredient_by_name(&self, name: &str) -> LiveQuery<Vec<Ingredient>> {
        self.db.watch_ingredient_search(name)
    }

    pub fn ingredients_by_ids(&self, ids: &[i64]) -> LiveQuery<Vec<Ingredient>> {
        self.db.watch_ingredients_by_ids(ids)
    }

    // --- Shopping list ---

    pub fn shopping_list_local(&self) -> LiveQuery<Vec<ShoppingItem>> {
        self.db.watch_shopping_list()
    }

    pub fn set_shopping_quantity(&self, id: i64, qty: f64, unit: &str) -> Result<ShoppingItem> {
        let qty = validate_quantity(qty)?;
        self.db.set_shopping_quantity(id, qty, unit.trim())
    }

    pub fn set_shopping_have(&self, id: i64, is_have: bool) -> Result<bool> {
        self.db.set_shopping_have(id, is_have)
    }
}

async fn refresh_catalog(remote: &dyn RemoteClient, db: &Database) -> Result<()> {
    let response = remote.get_all_ingredients().await?;
    // Pantry flags and shopping entries are carried over by the database
    let catalog: Vec<Ingredient> = response
        .list_ingredient
        .iter()
        .map(|item| item_to_ingredient(item, false))
        .collect();
    db.reconcile_catalog(&catalog)?;
    debug!(count = catalog.len(), "Ingredients and shopping list loaded");
    Ok(())
}

async fn refresh_pantry(remote: &dyn RemoteClient, db: &Database, user_id: i64) -> Result<()> {
    let response = remote.get_pantry_ingredients(user_id).await?;
    let pantry: Vec<Ingredient> = response
        .list_ingredient
        .iter()
        .map(|item| item_to_ingredient(item, true))
        .collect();
    db.replace_ingredients(&pantry)?;
    debug!(count = pantry.len(), user_id, "Pantry loaded");
    Ok(())
}

// A local failure here leaves the remote change in place.
fn set_have(db: &Database, ingredient_id: i64, is_have: bool) -> Result<()> {
    let mut ingredient = db.get_ingredient_by_id(ingredient_id)?;
    ingredient.is_have = is_have;
    db.update_ingredient(&ingredient)
}
