use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use crate::live::{ChangeTracker, LiveQuery, Table, live_query};
use crate::models::{Ingredient, Recipe, ShoppingItem};

const INGREDIENT_COLUMNS: &str = "id, category_name, name, is_have";
const SHOPPING_COLUMNS: &str = "id, name, qty, unit, is_have";
const RECIPE_COLUMNS: &str =
    "id, title, description, total_time, serving, img_url, is_favorite, is_recommended";

/// Local cache of the remote catalog.
///
/// Every write bumps the version of the table it touched so that live
/// queries (`watch_*`) re-run. Reconciliation writes run in one transaction
/// and notify once.
pub struct Database {
    conn: Mutex<Connection>,
    changes: ChangeTracker,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let db = Database {
            conn: Mutex::new(conn),
            changes: ChangeTracker::new(),
        };
        db.migrate()?;
        Ok(db)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Database connection lock poisoned"))
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn()?;
        let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS ingredients (
                    id INTEGER PRIMARY KEY,
                    category_name TEXT NOT NULL,
                    name TEXT NOT NULL,
                    is_have INTEGER NOT NULL DEFAULT 0
                );

                CREATE TABLE IF NOT EXISTS shopping_list (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    qty REAL NOT NULL DEFAULT 0,
                    unit TEXT NOT NULL DEFAULT '',
                    is_have INTEGER NOT NULL DEFAULT 0
                );

                CREATE TABLE IF NOT EXISTS recipes (
                    id INTEGER PRIMARY KEY,
                    title TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    total_time INTEGER NOT NULL DEFAULT 0,
                    serving INTEGER NOT NULL DEFAULT 0,
                    img_url TEXT NOT NULL DEFAULT '',
                    is_favorite INTEGER NOT NULL DEFAULT 0,
                    is_recommended INTEGER NOT NULL DEFAULT 0
                );

                CREATE INDEX IF NOT EXISTS idx_ingredients_category ON ingredients(category_name);
                CREATE INDEX IF NOT EXISTS idx_ingredients_name ON ingredients(name);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    fn ingredient_from_row(row: &rusqlite::Row) -> rusqlite::Result<Ingredient> {
        Ok(Ingredient {
            id: row.get(0)?,
            category_name: row.get(1)?,
            name: row.get(2)?,
            is_have: row.get(3)?,
        })
    }

    fn shopping_item_from_row(row: &rusqlite::Row) -> rusqlite::Result<ShoppingItem> {
        Ok(ShoppingItem {
            id: row.get(0)?,
            name: row.get(1)?,
            qty: row.get(2)?,
            unit: row.get(3)?,
            is_have: row.get(4)?,
        })
    }

    fn recipe_from_row(row: &rusqlite::Row) -> rusqlite::Result<Recipe> {
        Ok(Recipe {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            total_time: row.get(3)?,
            serving: row.get(4)?,
            img_url: row.get(5)?,
            is_favorite: row.get(6)?,
            is_recommended: row.get(7)?,
        })
    }

    fn query_ingredients<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<Ingredient>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, Self::ingredient_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn query_recipes<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<Recipe>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, Self::recipe_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn query_flag<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<bool> {
        let conn = self.conn()?;
        Ok(conn.query_row(sql, params, |row| row.get(0))?)
    }

    fn live<T, F>(self: &Arc<Self>, table: Table, query: F) -> LiveQuery<T>
    where
        T: Send + 'static,
        F: Fn(&Database) -> Result<T> + Send + 'static,
    {
        let db = Arc::clone(self);
        live_query(self.changes.subscribe(table), move || query(&db))
    }

    // --- Ingredients ---

    pub fn get_all_ingredients(&self) -> Result<Vec<Ingredient>> {
        self.query_ingredients(
            &format!("SELECT {INGREDIENT_COLUMNS} FROM ingredients ORDER BY id"),
            [],
        )
    }

    pub fn get_pantry_ingredients(&self) -> Result<Vec<Ingredient>> {
        self.query_ingredients(
            &format!("SELECT {INGREDIENT_COLUMNS} FROM ingredients WHERE is_have = 1 ORDER BY id"),
            [],
        )
    }

    pub fn get_ingredients_by_category(&self, category_name: &str) -> Result<Vec<Ingredient>> {
        self.query_ingredients(
            &format!(
                "SELECT {INGREDIENT_COLUMNS} FROM ingredients WHERE category_name = ?1 ORDER BY id"
            ),
            params![category_name],
        )
    }

    pub fn search_ingredients_by_name(&self, query: &str) -> Result<Vec<Ingredient>> {
        let escaped = query
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{escaped}%");
        self.query_ingredients(
            &format!(
                "SELECT {INGREDIENT_COLUMNS} FROM ingredients WHERE name LIKE ?1 ESCAPE '\\' ORDER BY name"
            ),
            params![pattern],
        )
    }

    pub fn get_ingredients_by_ids(&self, ids: &[i64]) -> Result<Vec<Ingredient>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        self.query_ingredients(
            &format!(
                "SELECT {INGREDIENT_COLUMNS} FROM ingredients WHERE id IN ({placeholders}) ORDER BY id"
            ),
            params_from_iter(ids.iter()),
        )
    }

    pub fn get_ingredient_by_id(&self, id: i64) -> Result<Ingredient> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {INGREDIENT_COLUMNS} FROM ingredients WHERE id = ?1"),
            params![id],
            Self::ingredient_from_row,
        )
        .with_context(|| format!("Ingredient {id} not found"))
    }

    pub fn is_have_ingredient(&self, id: i64) -> Result<bool> {
        self.query_flag(
            "SELECT EXISTS(SELECT 1 FROM ingredients WHERE id = ?1 AND is_have = 1)",
            params![id],
        )
    }

    pub fn is_pantry_not_empty(&self) -> Result<bool> {
        self.query_flag(
            "SELECT EXISTS(SELECT 1 FROM ingredients WHERE is_have = 1)",
            [],
        )
    }

    /// Clear every pantry flag, then insert-or-replace `ingredients`.
    pub fn replace_ingredients(&self, ingredients: &[Ingredient]) -> Result<()> {
        {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;
            Self::write_ingredients(&tx, ingredients)?;
            tx.commit()?;
        }
        self.changes.notify(Table::Ingredients);
        Ok(())
    }

    /// Store a fresh catalog and the shopping list derived from it, all in
    /// one transaction.
    ///
    /// The incoming `is_have` values are ignored: each row keeps the pantry
    /// flag and shopping entry it already has locally. Rows missing from
    /// `catalog` lose both checked flags.
    pub fn reconcile_catalog(&self, catalog: &[Ingredient]) -> Result<()> {
        {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;
            let mut ingredients = Vec::with_capacity(catalog.len());
            let mut shopping = Vec::with_capacity(catalog.len());
            for ing in catalog {
                let is_have: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM ingredients WHERE id = ?1 AND is_have = 1)",
                    params![ing.id],
                    |row| row.get(0),
                )?;
                let existing = tx
                    .query_row(
                        &format!("SELECT {SHOPPING_COLUMNS} FROM shopping_list WHERE id = ?1"),
                        params![ing.id],
                        Self::shopping_item_from_row,
                    )
                    .optional()?;
                shopping.push(ShoppingItem::carried_over(ing.id, &ing.name, existing.as_ref()));
                ingredients.push(Ingredient {
                    is_have,
                    ..ing.clone()
                });
            }
            Self::write_ingredients(&tx, &ingredients)?;
            Self::write_shopping_list(&tx, &shopping)?;
            tx.commit()?;
        }
        self.changes.notify(Table::Ingredients);
        self.changes.notify(Table::ShoppingList);
        Ok(())
    }

    fn write_ingredients(conn: &Connection, ingredients: &[Ingredient]) -> Result<()> {
        conn.execute("UPDATE ingredients SET is_have = 0", [])?;
        let mut stmt = conn.prepare(
            "INSERT OR REPLACE INTO ingredients (id, category_name, name, is_have)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for ing in ingredients {
            stmt.execute(params![ing.id, ing.category_name, ing.name, ing.is_have])?;
        }
        Ok(())
    }

    pub fn update_ingredient(&self, ingredient: &Ingredient) -> Result<()> {
        let rows = self.conn()?.execute(
            "UPDATE ingredients SET category_name = ?1, name = ?2, is_have = ?3 WHERE id = ?4",
            params![
                ingredient.category_name,
                ingredient.name,
                ingredient.is_have,
                ingredient.id
            ],
        )?;
        if rows == 0 {
            anyhow::bail!("Ingredient {} not found", ingredient.id);
        }
        self.changes.notify(Table::Ingredients);
        Ok(())
    }

    pub fn watch_all_ingredients(self: &Arc<Self>) -> LiveQuery<Vec<Ingredient>> {
        self.live(Table::Ingredients, Self::get_all_ingredients)
    }

    pub fn watch_pantry_ingredients(self: &Arc<Self>) -> LiveQuery<Vec<Ingredient>> {
        self.live(Table::Ingredients, Self::get_pantry_ingredients)
    }

    pub fn watch_ingredients_by_category(
        self: &Arc<Self>,
        category_name: &str,
    ) -> LiveQuery<Vec<Ingredient>> {
        let category_name = category_name.to_string();
        self.live(Table::Ingredients, move |db: &Database| {
            db.get_ingredients_by_category(&category_name)
        })
    }

    pub fn watch_ingredient_search(self: &Arc<Self>, query: &str) -> LiveQuery<Vec<Ingredient>> {
        let query = query.to_string();
        self.live(Table::Ingredients, move |db: &Database| {
            db.search_ingredients_by_name(&query)
        })
    }

    pub fn watch_ingredients_by_ids(self: &Arc<Self>, ids: &[i64]) -> LiveQuery<Vec<Ingredient>> {
        let ids = ids.to_vec();
        self.live(Table::Ingredients, move |db: &Database| {
            db.get_ingredients_by_ids(&ids)
        })
    }

    pub fn watch_pantry_not_empty(self: &Arc<Self>) -> LiveQuery<bool> {
        self.live(Table::Ingredients, Self::is_pantry_not_empty)
    }

    // --- Shopping list ---

    pub fn get_shopping_list(&self) -> Result<Vec<ShoppingItem>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SHOPPING_COLUMNS} FROM shopping_list ORDER BY id"
        ))?;
        let items = stmt
            .query_map([], Self::shopping_item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn get_shopping_item_by_id(&self, id: i64) -> Result<Option<ShoppingItem>> {
        let conn = self.conn()?;
        let item = conn
            .query_row(
                &format!("SELECT {SHOPPING_COLUMNS} FROM shopping_list WHERE id = ?1"),
                params![id],
                Self::shopping_item_from_row,
            )
            .optional()?;
        Ok(item)
    }

    fn write_shopping_list(conn: &Connection, items: &[ShoppingItem]) -> Result<()> {
        conn.execute("UPDATE shopping_list SET is_have = 0", [])?;
        let mut stmt = conn.prepare(
            "INSERT OR REPLACE INTO shopping_list (id, name, qty, unit, is_have)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for item in items {
            stmt.execute(params![item.id, item.name, item.qty, item.unit, item.is_have])?;
        }
        Ok(())
    }

    pub fn set_shopping_quantity(&self, id: i64, qty: f64, unit: &str) -> Result<ShoppingItem> {
        let rows = self.conn()?.execute(
            "UPDATE shopping_list SET qty = ?1, unit = ?2 WHERE id = ?3",
            params![qty, unit, id],
        )?;
        if rows == 0 {
            anyhow::bail!("Shopping list item {id} not found");
        }
        self.changes.notify(Table::ShoppingList);
        self.get_shopping_item_by_id(id)?
            .with_context(|| format!("Shopping list item {id} not found"))
    }

    pub fn set_shopping_have(&self, id: i64, is_have: bool) -> Result<bool> {
        let rows = self.conn()?.execute(
            "UPDATE shopping_list SET is_have = ?1 WHERE id = ?2",
            params![is_have, id],
        )?;
        if rows > 0 {
            self.changes.notify(Table::ShoppingList);
        }
        Ok(rows > 0)
    }

    pub fn watch_shopping_list(self: &Arc<Self>) -> LiveQuery<Vec<ShoppingItem>> {
        self.live(Table::ShoppingList, Self::get_shopping_list)
    }

    // --- Recipes ---

    pub fn get_all_recipes(&self) -> Result<Vec<Recipe>> {
        self.query_recipes(&format!("SELECT {RECIPE_COLUMNS} FROM recipes ORDER BY id"), [])
    }

    pub fn get_favorite_recipes(&self) -> Result<Vec<Recipe>> {
        self.query_recipes(
            &format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE is_favorite = 1 ORDER BY id"),
            [],
        )
    }

    pub fn get_recommended_recipes(&self) -> Result<Vec<Recipe>> {
        self.query_recipes(
            &format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE is_recommended = 1 ORDER BY id"),
            [],
        )
    }

    pub fn get_recipe_by_id(&self, id: i64) -> Result<Recipe> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = ?1"),
            params![id],
            Self::recipe_from_row,
        )
        .with_context(|| format!("Recipe {id} not found"))
    }

    pub fn is_recipe_favorite(&self, id: i64) -> Result<bool> {
        self.query_flag(
            "SELECT EXISTS(SELECT 1 FROM recipes WHERE id = ?1 AND is_favorite = 1)",
            params![id],
        )
    }

    pub fn is_recipe_recommended(&self, id: i64) -> Result<bool> {
        self.query_flag(
            "SELECT EXISTS(SELECT 1 FROM recipes WHERE id = ?1 AND is_recommended = 1)",
            params![id],
        )
    }

    /// Clear every recommended flag, drop the rows about to be re-sent, then
    /// insert `recipes` as recommended, leaving any row that still collides
    /// untouched. Each row keeps the favorite flag it had locally.
    pub fn replace_recommended_recipes(&self, recipes: &[Recipe]) -> Result<()> {
        {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;
            let recipes = recipes
                .iter()
                .map(|r| {
                    Ok(Recipe {
                        is_favorite: Self::recipe_flag(&tx, "is_favorite", r.id)?,
                        is_recommended: true,
                        ..r.clone()
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            tx.execute("UPDATE recipes SET is_recommended = 0", [])?;
            if !recipes.is_empty() {
                let placeholders = vec!["?"; recipes.len()].join(", ");
                tx.execute(
                    &format!("DELETE FROM recipes WHERE id IN ({placeholders})"),
                    params_from_iter(recipes.iter().map(|r| r.id)),
                )?;
            }
            Self::insert_recipes(&tx, "INSERT OR IGNORE", &recipes)?;
            tx.commit()?;
        }
        self.changes.notify(Table::Recipes);
        Ok(())
    }

    /// Clear every favorite flag, then insert-or-replace `recipes` as
    /// favorites. Each row keeps the recommended flag it had locally.
    pub fn replace_favorite_recipes(&self, recipes: &[Recipe]) -> Result<()> {
        {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;
            let recipes = recipes
                .iter()
                .map(|r| {
                    Ok(Recipe {
                        is_favorite: true,
                        is_recommended: Self::recipe_flag(&tx, "is_recommended", r.id)?,
                        ..r.clone()
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            tx.execute("UPDATE recipes SET is_favorite = 0", [])?;
            Self::insert_recipes(&tx, "INSERT OR REPLACE", &recipes)?;
            tx.commit()?;
        }
        self.changes.notify(Table::Recipes);
        Ok(())
    }

    fn recipe_flag(conn: &Connection, column: &str, id: i64) -> Result<bool> {
        Ok(conn.query_row(
            &format!("SELECT EXISTS(SELECT 1 FROM recipes WHERE id = ?1 AND {column} = 1)"),
            params![id],
            |row| row.get(0),
        )?)
    }

    fn insert_recipes(conn: &Connection, verb: &str, recipes: &[Recipe]) -> Result<()> {
        let mut stmt = conn.prepare(&format!(
            "{verb} INTO recipes ({RECIPE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
        ))?;
        for r in recipes {
            stmt.execute(params![
                r.id,
                r.title,
                r.description,
                r.total_time,
                r.serving,
                r.img_url,
                r.is_favorite,
                r.is_recommended,
            ])?;
        }
        Ok(())
    }

    pub fn update_recipe(&self, recipe: &Recipe) -> Result<()> {
        let rows = self.conn()?.execute(
            "UPDATE recipes SET title = ?1, description = ?2, total_time = ?3, serving = ?4,
                    img_url = ?5, is_favorite = ?6, is_recommended = ?7
             WHERE id = ?8",
            params![
                recipe.title,
                recipe.description,
                recipe.total_time,
                recipe.serving,
                recipe.img_url,
                recipe.is_favorite,
                recipe.is_recommended,
                recipe.id,
            ],
        )?;
        if rows == 0 {
            anyhow::bail!("Recipe {} not found", recipe.id);
        }
        self.changes.notify(Table::Recipes);
        Ok(())
    }

    pub fn reset_favorite(&self) -> Result<()> {
        self.conn()?
            .execute("UPDATE recipes SET is_favorite = 0", [])?;
        self.changes.notify(Table::Recipes);
        Ok(())
    }

    pub fn watch_favorite_recipes(self: &Arc<Self>) -> LiveQuery<Vec<Recipe>> {
        self.live(Table::Recipes, Self::get_favorite_recipes)
    }

    pub fn watch_recommended_recipes(self: &Arc<Self>) -> LiveQuery<Vec<Recipe>> {
        self.live(Table::Recipes, Self::get_recommended_recipes)
    }

    pub fn watch_recipe_favorite(self: &Arc<Self>, id: i64) -> LiveQuery<bool> {
        self.live(Table::Recipes, move |db: &Database| db.is_recipe_favorite(id))
    }
}
