use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{Ingredient, Recipe};

/// Remote EasyMeal API.
///
/// The CLI implements this over HTTP with reqwest; [`crate::fixtures::FixtureClient`]
/// serves a canned catalog in-process. Errors are surfaced to callers by their
/// message only, so implementations should attach readable context.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn get_all_ingredients(&self) -> Result<IngredientListResponse>;
    async fn get_pantry_ingredients(&self, user_id: i64) -> Result<IngredientListResponse>;
    async fn add_pantry_ingredient(&self, user_id: i64, ingredient_id: i64)
    -> Result<GeneralResponse>;
    async fn delete_pantry_ingredient(
        &self,
        user_id: i64,
        ingredient_id: i64,
    ) -> Result<GeneralResponse>;

    async fn get_detail_recipe_by_id(&self, recipe_id: i64) -> Result<DetailRecipeResponse>;
    async fn get_recommended_recipes(&self, user_id: i64) -> Result<RecipeListResponse>;
    async fn get_favorite_recipes(&self, user_id: i64) -> Result<FavoriteRecipeListResponse>;
    async fn add_favorite_recipe(&self, user_id: i64, recipe_id: i64) -> Result<GeneralResponse>;
    async fn delete_favorite_recipe(&self, user_id: i64, recipe_id: i64)
    -> Result<GeneralResponse>;

    async fn register(&self, name: &str, email: &str, password: &str) -> Result<GeneralResponse>;
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralResponse {
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub message: String,
}

impl GeneralResponse {
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            error: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientItem {
    pub ing_id: i64,
    pub category_name: String,
    pub ing_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientListResponse {
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub list_ingredient: Vec<IngredientItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeItem {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub total_time: i64,
    #[serde(default)]
    pub serving: i64,
    #[serde(default)]
    pub img_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeListResponse {
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub list_recipe: Vec<RecipeItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRecipeListResponse {
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub list_favorite_recipe: Vec<RecipeItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeIngredientLine {
    pub ing_id: i64,
    pub ing_name: String,
    #[serde(default)]
    pub qty: f64,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDetail {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub total_time: i64,
    #[serde(default)]
    pub serving: i64,
    #[serde(default)]
    pub img_url: String,
    #[serde(default)]
    pub ingredients: Vec<RecipeIngredientLine>,
    #[serde(default)]
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailRecipeResponse {
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub message: String,
    pub recipe: RecipeDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub message: String,
    pub login_result: Option<LoginResult>,
}

#[must_use]
pub fn item_to_ingredient(item: &IngredientItem, is_have: bool) -> Ingredient {
    Ingredient {
        id: item.ing_id,
        category_name: item.category_name.clone(),
        name: item.ing_name.clone(),
        is_have,
    }
}

#[must_use]
pub fn item_to_recipe(item: &RecipeItem, is_favorite: bool, is_recommended: bool) -> Recipe {
    Recipe {
        id: item.id,
        title: item.title.clone(),
        description: item.description.clone(),
        total_time: item.total_time,
        serving: item.serving,
        img_url: item.img_url.clone(),
        is_favorite,
        is_recommended,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingredient_list_from_json() {
        let json = r#"{
            "error": false,
            "message": "success",
            "listIngredient": [
                {"ingId": 1, "categoryName": "Vegetables", "ingName": "Carrot"},
                {"ingId": 2, "categoryName": "Spices", "ingName": "Cumin"}
            ]
        }"#;
        let resp: IngredientListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.list_ingredient.len(), 2);
        assert_eq!(resp.list_ingredient[1].ing_name, "Cumin");
        assert_eq!(resp.list_ingredient[1].category_name, "Spices");
    }

    #[test]
    fn test_missing_list_defaults_to_empty() {
        let resp: RecipeListResponse =
            serde_json::from_str(r#"{"error": false, "message": "none"}"#).unwrap();
        assert!(resp.list_recipe.is_empty());
    }

    #[test]
    fn test_recipe_item_optional_fields() {
        let item: RecipeItem = serde_json::from_str(r#"{"id": 4, "title": "Soup"}"#).unwrap();
        assert_eq!(item.total_time, 0);
        assert_eq!(item.img_url, "");
    }

    #[test]
    fn test_login_response_without_result() {
        let resp: LoginResponse =
            serde_json::from_str(r#"{"error": true, "message": "wrong password"}"#).unwrap();
        assert!(resp.error);
        assert!(resp.login_result.is_none());
    }

    #[test]
    fn test_item_to_ingredient() {
        let item = IngredientItem {
            ing_id: 9,
            category_name: "Dairy".to_string(),
            ing_name: "Butter".to_string(),
        };
        let ing = item_to_ingredient(&item, true);
        assert_eq!(ing.id, 9);
        assert_eq!(ing.name, "Butter");
        assert!(ing.is_have);
    }

    #[test]
    fn test_item_to_recipe_sets_both_flags() {
        let item = RecipeItem {
            id: 3,
            title: "Omelette".to_string(),
            description: "Eggs, folded".to_string(),
            total_time: 10,
            serving: 1,
            img_url: "omelette.jpg".to_string(),
        };
        let recipe = item_to_recipe(&item, false, true);
        assert_eq!(recipe.title, "Omelette");
        assert!(!recipe.is_favorite);
        assert!(recipe.is_recommended);
    }
}
