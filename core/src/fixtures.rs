use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::api::{
    DetailRecipeResponse, FavoriteRecipeListResponse, GeneralResponse, IngredientItem,
    IngredientListResponse, LoginResponse, LoginResult, RecipeDetail, RecipeIngredientLine,
    RecipeItem, RecipeListResponse, RemoteClient,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Everything the stand-in API knows, including per-user pantry and
/// favorites. Round-trips through JSON so offline state can be kept on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixtureData {
    #[serde(default)]
    pub ingredients: Vec<IngredientItem>,
    #[serde(default)]
    pub recipes: Vec<RecipeDetail>,
    #[serde(default)]
    pub recommended: Vec<i64>,
    #[serde(default)]
    pub users: Vec<FixtureUser>,
    #[serde(default)]
    pub pantry: BTreeMap<i64, BTreeSet<i64>>,
    #[serde(default)]
    pub favorites: BTreeMap<i64, BTreeSet<i64>>,
}

impl FixtureData {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("Failed to parse fixture data")
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// A small catalog with one demo account (`demo@easymeal.app` / `password`).
    #[must_use]
    pub fn sample() -> Self {
        let ingredient = |ing_id: i64, category: &str, name: &str| IngredientItem {
            ing_id,
            category_name: category.to_string(),
            ing_name: name.to_string(),
        };
        let line = |ing_id: i64, name: &str, qty: f64, unit: &str| RecipeIngredientLine {
            ing_id,
            ing_name: name.to_string(),
            qty,
            unit: unit.to_string(),
        };

        let ingredients = vec![
            ingredient(1, "Vegetables", "Carrot"),
            ingredient(2, "Vegetables", "Onion"),
            ingredient(3, "Vegetables", "Garlic"),
            ingredient(4, "Vegetables", "Tomato"),
            ingredient(5, "Protein", "Egg"),
            ingredient(6, "Protein", "Chicken breast"),
            ingredient(7, "Protein", "Tofu"),
            ingredient(8, "Dairy", "Butter"),
            ingredient(9, "Dairy", "Milk"),
            ingredient(10, "Grains", "Rice"),
            ingredient(11, "Spices", "Cumin"),
            ingredient(12, "Spices", "Black pepper"),
        ];

        let recipes = vec![
            RecipeDetail {
                id: 1,
                title: "Tomato egg stir-fry".to_string(),
                description: "Soft scrambled eggs folded into a quick tomato sauce.".to_string(),
                total_time: 15,
                serving: 2,
                img_url: "https://img.easymeal.app/recipes/1.jpg".to_string(),
                ingredients: vec![
                    line(4, "Tomato", 2.0, "pcs"),
                    line(5, "Egg", 3.0, "pcs"),
                    line(2, "Onion", 0.5, "pcs"),
                ],
                steps: vec![
                    "Beat the eggs with a pinch of salt.".to_string(),
                    "Scramble the eggs until just set, then set aside.".to_string(),
                    "Cook the tomato and onion until saucy, fold the eggs back in.".to_string(),
                ],
            },
            RecipeDetail {
                id: 2,
                title: "Garlic butter rice".to_string(),
                description: "Rice fried in browned garlic butter.".to_string(),
                total_time: 20,
                serving: 2,
                img_url: "https://img.easymeal.app/recipes/2.jpg".to_string(),
                ingredients: vec![
                    line(10, "Rice", 300.0, "g"),
                    line(3, "Garlic", 4.0, "cloves"),
                    line(8, "Butter", 30.0, "g"),
                ],
                steps: vec![
                    "Brown the garlic in butter.".to_string(),
                    "Add cooked rice and toss until hot.".to_string(),
                ],
            },
            RecipeDetail {
                id: 3,
                title: "Cumin chicken".to_string(),
                description: "Pan-seared chicken with toasted cumin.".to_string(),
                total_time: 25,
                serving: 2,
                img_url: "https://img.easymeal.app/recipes/3.jpg".to_string(),
                ingredients: vec![
                    line(6, "Chicken breast", 400.0, "g"),
                    line(11, "Cumin", 2.0, "tsp"),
                    line(12, "Black pepper", 1.0, "tsp"),
                ],
                steps: vec![
                    "Season the chicken with cumin and pepper.".to_string(),
                    "Sear for six minutes per side.".to_string(),
                ],
            },
            RecipeDetail {
                id: 4,
                title: "Braised tofu".to_string(),
                description: "Tofu simmered with onion and carrot.".to_string(),
                total_time: 30,
                serving: 3,
                img_url: "https://img.easymeal.app/recipes/4.jpg".to_string(),
                ingredients: vec![
                    line(7, "Tofu", 400.0, "g"),
                    line(2, "Onion", 1.0, "pcs"),
                    line(1, "Carrot", 1.0, "pcs"),
                ],
                steps: vec![
                    "Fry the tofu until golden.".to_string(),
                    "Add vegetables and a splash of water, simmer 15 minutes.".to_string(),
                ],
            },
        ];

        Self {
            ingredients,
            recipes,
            recommended: vec![1, 2, 3],
            users: vec![FixtureUser {
                id: 1,
                name: "Demo".to_string(),
                email: "demo@easymeal.app".to_string(),
                password: "password".to_string(),
            }],
            pantry: BTreeMap::new(),
            favorites: BTreeMap::new(),
        }
    }

    fn recipe_item(&self, id: i64) -> Option<RecipeItem> {
        self.recipes.iter().find(|r| r.id == id).map(|r| RecipeItem {
            id: r.id,
            title: r.title.clone(),
            description: r.description.clone(),
            total_time: r.total_time,
            serving: r.serving,
            img_url: r.img_url.clone(),
        })
    }
}

/// In-process stand-in for the remote API.
pub struct FixtureClient {
    data: Mutex<FixtureData>,
}

impl FixtureClient {
    #[must_use]
    pub fn new(data: FixtureData) -> Self {
        Self {
            data: Mutex::new(data),
        }
    }

    fn data(&self) -> Result<MutexGuard<'_, FixtureData>> {
        self.data
            .lock()
            .map_err(|_| anyhow!("Fixture data lock poisoned"))
    }

    /// Current state, including pantry and favorite changes made so far.
    pub fn snapshot(&self) -> Result<FixtureData> {
        Ok(self.data()?.clone())
    }
}

#[async_trait]
impl RemoteClient for FixtureClient {
    async fn get_all_ingredients(&self) -> Result<IngredientListResponse> {
        let data = self.data()?;
        Ok(IngredientListResponse {
            error: false,
            message: "Ingredients fetched successfully".to_string(),
            list_ingredient: data.ingredients.clone(),
        })
    }

    async fn get_pantry_ingredients(&self, user_id: i64) -> Result<IngredientListResponse> {
        let data = self.data()?;
        let pantry = data.pantry.get(&user_id);
        let list_ingredient = data
            .ingredients
            .iter()
            .filter(|ing| pantry.is_some_and(|ids| ids.contains(&ing.ing_id)))
            .cloned()
            .collect();
        Ok(IngredientListResponse {
            error: false,
            message: "Pantry fetched successfully".to_string(),
            list_ingredient,
        })
    }

    async fn add_pantry_ingredient(
        &self,
        user_id: i64,
        ingredient_id: i64,
    ) -> Result<GeneralResponse> {
        let mut data = self.data()?;
        if !data.ingredients.iter().any(|ing| ing.ing_id == ingredient_id) {
            bail!("Ingredient {ingredient_id} not found");
        }
        data.pantry.entry(user_id).or_default().insert(ingredient_id);
        Ok(GeneralResponse::ok("Ingredient added to pantry"))
    }

    async fn delete_pantry_ingredient(
        &self,
        user_id: i64,
        ingredient_id: i64,
    ) -> Result<GeneralResponse> {
        let mut data = self.data()?;
        let removed = data
            .pantry
            .get_mut(&user_id)
            .is_some_and(|ids| ids.remove(&ingredient_id));
        if !removed {
            bail!("Ingredient {ingredient_id} is not in the pantry");
        }
        Ok(GeneralResponse::ok("Ingredient removed from pantry"))
    }

    async fn get_detail_recipe_by_id(&self, recipe_id: i64) -> Result<DetailRecipeResponse> {
        let data = self.data()?;
        let recipe = data
            .recipes
            .iter()
            .find(|r| r.id == recipe_id)
            .cloned()
            .with_context(|| format!("Recipe {recipe_id} not found"))?;
        Ok(DetailRecipeResponse {
            error: false,
            message: "Recipe fetched successfully".to_string(),
            recipe,
        })
    }

    async fn get_recommended_recipes(&self, _user_id: i64) -> Result<RecipeListResponse> {
        let data = self.data()?;
        let list_recipe = data
            .recommended
            .iter()
            .filter_map(|id| data.recipe_item(*id))
            .collect();
        Ok(RecipeListResponse {
            error: false,
            message: "Recommendations fetched successfully".to_string(),
            list_recipe,
        })
    }

    async fn get_favorite_recipes(&self, user_id: i64) -> Result<FavoriteRecipeListResponse> {
        let data = self.data()?;
        let list_favorite_recipe = data
            .favorites
            .get(&user_id)
            .map(|ids| ids.iter().filter_map(|id| data.recipe_item(*id)).collect())
            .unwrap_or_default();
        Ok(FavoriteRecipeListResponse {
            error: false,
            message: "Favorites fetched successfully".to_string(),
            list_favorite_recipe,
        })
    }

    async fn add_favorite_recipe(&self, user_id: i64, recipe_id: i64) -> Result<GeneralResponse> {
        let mut data = self.data()?;
        if data.recipe_item(recipe_id).is_none() {
            bail!("Recipe {recipe_id} not found");
        }
        data.favorites.entry(user_id).or_default().insert(recipe_id);
        Ok(GeneralResponse::ok("Recipe added to favorites"))
    }

    async fn delete_favorite_recipe(
        &self,
        user_id: i64,
        recipe_id: i64,
    ) -> Result<GeneralResponse> {
        let mut data = self.data()?;
        let removed = data
            .favorites
            .get_mut(&user_id)
            .is_some_and(|ids| ids.remove(&recipe_id));
        if !removed {
            bail!("Recipe {recipe_id} is not a favorite");
        }
        Ok(GeneralResponse::ok("Recipe removed from favorites"))
    }

    async fn register(&self, name: &str, email: &str, password: &str) -> Result<GeneralResponse> {
        if name.trim().is_empty() || email.trim().is_empty() {
            bail!("Name and email are required");
        }
        if password.len() < 8 {
            bail!("Password must be at least 8 characters");
        }
        let mut data = self.data()?;
        if data.users.iter().any(|u| u.email.eq_ignore_ascii_case(email)) {
            bail!("Email is already registered");
        }
        let id = data.users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        data.users.push(FixtureUser {
            id,
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        });
        Ok(GeneralResponse::ok("User created"))
    }

    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let data = self.data()?;
        let user = data
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email) && u.password == password)
            .context("Invalid email or password")?;
        Ok(LoginResponse {
            error: false,
            message: "Login successful".to_string(),
            login_result: Some(LoginResult {
                user_id: user.id,
                name: user.name.clone(),
                email: user.email.clone(),
                token: format!("fixture-token-{}", user.id),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> FixtureClient {
        FixtureClient::new(FixtureData::sample())
    }

    #[test]
    fn test_sample_is_consistent() {
        let data = FixtureData::sample();
        for id in &data.recommended {
            assert!(data.recipe_item(*id).is_some(), "recommended recipe {id} missing");
        }
        for recipe in &data.recipes {
            for line in &recipe.ingredients {
                assert!(
                    data.ingredients.iter().any(|i| i.ing_id == line.ing_id),
                    "recipe {} uses unknown ingredient {}",
                    recipe.id,
                    line.ing_id
                );
            }
        }
    }

    #[test]
    fn test_json_keeps_pantry_and_favorites() {
        let mut data = FixtureData::sample();
        data.pantry.entry(1).or_default().insert(5);
        data.favorites.entry(1).or_default().insert(2);
        let parsed = FixtureData::from_json(&data.to_json().unwrap()).unwrap();
        assert_eq!(parsed, data);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let err = FixtureData::from_json("{").unwrap_err();
        assert_eq!(err.to_string(), "Failed to parse fixture data");
    }

    #[tokio::test]
    async fn test_pantry_add_list_delete() {
        let client = client();
        client.add_pantry_ingredient(1, 5).await.unwrap();
        client.add_pantry_ingredient(1, 10).await.unwrap();

        let pantry = client.get_pantry_ingredients(1).await.unwrap();
        let ids: Vec<i64> = pantry.list_ingredient.iter().map(|i| i.ing_id).collect();
        assert_eq!(ids, vec![5, 10]);

        // Other users have their own pantry
        assert!(client.get_pantry_ingredients(2).await.unwrap().list_ingredient.is_empty());

        client.delete_pantry_ingredient(1, 5).await.unwrap();
        let err = client.delete_pantry_ingredient(1, 5).await.unwrap_err();
        assert_eq!(err.to_string(), "Ingredient 5 is not in the pantry");
    }

    #[tokio::test]
    async fn test_add_unknown_ingredient_fails() {
        let err = client().add_pantry_ingredient(1, 999).await.unwrap_err();
        assert_eq!(err.to_string(), "Ingredient 999 not found");
    }

    #[tokio::test]
    async fn test_favorites() {
        let client = client();
        client.add_favorite_recipe(1, 4).await.unwrap();
        let favorites = client.get_favorite_recipes(1).await.unwrap();
        assert_eq!(favorites.list_favorite_recipe.len(), 1);
        assert_eq!(favorites.list_favorite_recipe[0].title, "Braised tofu");

        client.delete_favorite_recipe(1, 4).await.unwrap();
        assert!(client.get_favorite_recipes(1).await.unwrap().list_favorite_recipe.is_empty());
        assert!(client.add_favorite_recipe(1, 99).await.is_err());
    }

    #[tokio::test]
    async fn test_recommended_and_detail() {
        let client = client();
        let recommended = client.get_recommended_recipes(1).await.unwrap();
        assert_eq!(recommended.list_recipe.len(), 3);

        let detail = client.get_detail_recipe_by_id(2).await.unwrap();
        assert_eq!(detail.recipe.ingredients.len(), 3);
        assert!(client.get_detail_recipe_by_id(42).await.is_err());
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let client = client();
        client
            .register("Rina", "rina@example.com", "hunter222")
            .await
            .unwrap();
        let err = client
            .register("Rina again", "RINA@example.com", "hunter222")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Email is already registered");

        let login = client.login("rina@example.com", "hunter222").await.unwrap();
        let result = login.login_result.unwrap();
        assert_eq!(result.user_id, 2);
        assert_eq!(result.name, "Rina");
        assert_eq!(result.token, "fixture-token-2");
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let err = client().login("demo@easymeal.app", "nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid email or password");
    }

    #[tokio::test]
    async fn test_register_validates_input() {
        let client = client();
        assert!(client.register("", "a@b.c", "longenough").await.is_err());
        assert!(client.register("A", "a@b.c", "short").await.is_err());
    }

    #[tokio::test]
    async fn test_snapshot_reflects_changes() {
        let client = client();
        client.add_pantry_ingredient(1, 3).await.unwrap();
        let snapshot = client.snapshot().unwrap();
        assert!(snapshot.pantry[&1].contains(&3));
    }
}
