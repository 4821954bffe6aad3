use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use easymeal_core::api::{
    DetailRecipeResponse, FavoriteRecipeListResponse, GeneralResponse, IngredientListResponse,
    LoginResponse, RecipeListResponse, RemoteClient,
};

/// `RemoteClient` over the EasyMeal REST API.
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PantryRequest {
    user_id: i64,
    ing_id: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FavoriteRequest {
    user_id: i64,
    recipe_id: i64,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// The common envelope, read before the typed payload.
#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    error: bool,
    message: Option<String>,
}

impl HttpClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "easymeal-cli/{} (pantry and recipes)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(std::time::Duration::from_secs(10))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let resp = request
            .send()
            .await
            .context("Failed to reach EasyMeal API")?;
        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .context("Failed to read EasyMeal API response")?;

        let envelope: Option<Envelope> = serde_json::from_slice(&body).ok();
        if !status.is_success() {
            match envelope.and_then(|e| e.message).filter(|m| !m.is_empty()) {
                Some(message) => bail!(message),
                None => bail!("EasyMeal API returned {status}"),
            }
        }
        if let Some(Envelope {
            error: true,
            message,
        }) = envelope
        {
            bail!(message.unwrap_or_else(|| "EasyMeal API reported an error".to_string()));
        }

        serde_json::from_slice(&body).context("Failed to parse EasyMeal API response")
    }
}

#[async_trait]
impl RemoteClient for HttpClient {
    async fn get_all_ingredients(&self) -> Result<IngredientListResponse> {
        self.send(self.client.get(self.url("/ingredients"))).await
    }

    async fn get_pantry_ingredients(&self, user_id: i64) -> Result<IngredientListResponse> {
        let req = self
            .client
            .get(self.url("/pantry"))
            .query(&[("userId", user_id)]);
        self.send(req).await
    }

    async fn add_pantry_ingredient(
        &self,
        user_id: i64,
        ingredient_id: i64,
    ) -> Result<GeneralResponse> {
        let body = PantryRequest {
            user_id,
            ing_id: ingredient_id,
        };
        self.send(self.client.post(self.url("/pantry")).json(&body))
            .await
    }

    async fn delete_pantry_ingredient(
        &self,
        user_id: i64,
        ingredient_id: i64,
    ) -> Result<GeneralResponse> {
        let body = PantryRequest {
            user_id,
            ing_id: ingredient_id,
        };
        self.send(self.client.delete(self.url("/pantry")).json(&body))
            .await
    }

    async fn get_detail_recipe_by_id(&self, recipe_id: i64) -> Result<DetailRecipeResponse> {
        self.send(self.client.get(self.url(&format!("/recipes/{recipe_id}"))))
            .await
    }

    async fn get_recommended_recipes(&self, user_id: i64) -> Result<RecipeListResponse> {
        let req = self
            .client
            .get(self.url("/recipes/recommended"))
            .query(&[("userId", user_id)]);
        self.send(req).await
    }

    async fn get_favorite_recipes(&self, user_id: i64) -> Result<FavoriteRecipeListResponse> {
        let req = self
            .client
            .get(self.url("/favorites"))
            .query(&[("userId", user_id)]);
        self.send(req).await
    }

    async fn add_favorite_recipe(&self, user_id: i64, recipe_id: i64) -> Result<GeneralResponse> {
        let body = FavoriteRequest { user_id, recipe_id };
        self.send(self.client.post(self.url("/favorites")).json(&body))
            .await
    }

    async fn delete_favorite_recipe(
        &self,
        user_id: i64,
        recipe_id: i64,
    ) -> Result<GeneralResponse> {
        let body = FavoriteRequest { user_id, recipe_id };
        self.send(self.client.delete(self.url("/favorites")).json(&body))
            .await
    }

    async fn register(&self, name: &str, email: &str, password: &str) -> Result<GeneralResponse> {
        let body = RegisterRequest {
            name,
            email,
            password,
        };
        self.send(self.client.post(self.url("/register")).json(&body))
            .await
    }

    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let body = LoginRequest { email, password };
        self.send(self.client.post(self.url("/login")).json(&body))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use std::collections::HashMap;

    async fn list_ingredients() -> Json<Value> {
        Json(json!({
            "error": false,
            "message": "ok",
            "listIngredient": [
                {"ingId": 1, "categoryName": "Vegetables", "ingName": "Carrot"},
                {"ingId": 2, "categoryName": "Spices", "ingName": "Cumin"}
            ]
        }))
    }

    async fn pantry(Query(params): Query<HashMap<String, i64>>) -> Json<Value> {
        let user_id = params.get("userId").copied().unwrap_or_default();
        let list = if user_id == 7 {
            json!([{"ingId": 2, "categoryName": "Spices", "ingName": "Cumin"}])
        } else {
            json!([])
        };
        Json(json!({"error": false, "message": "ok", "listIngredient": list}))
    }

    async fn add_pantry(Json(body): Json<Value>) -> Json<Value> {
        let message = format!("added {} for {}", body["ingId"], body["userId"]);
        Json(json!({"error": false, "message": message}))
    }

    async fn remove_pantry() -> (StatusCode, Json<Value>) {
        (
            StatusCode::NOT_FOUND,
            Json(json!({"error": true, "message": "Ingredient is not in the pantry"})),
        )
    }

    async fn recipe_detail(Path(id): Path<i64>) -> Json<Value> {
        Json(json!({
            "error": false,
            "message": "ok",
            "recipe": {
                "id": id,
                "title": "Cumin chicken",
                "totalTime": 25,
                "serving": 2,
                "ingredients": [{"ingId": 2, "ingName": "Cumin", "qty": 1.5, "unit": "tsp"}],
                "steps": ["Season", "Sear"]
            }
        }))
    }

    async fn favorites(headers: HeaderMap) -> (StatusCode, Json<Value>) {
        if headers.get("authorization").and_then(|v| v.to_str().ok()) == Some("Bearer tok-1") {
            (
                StatusCode::OK,
                Json(json!({"error": false, "message": "ok", "listFavoriteRecipe": []})),
            )
        } else {
            (StatusCode::UNAUTHORIZED, Json(json!({})))
        }
    }

    async fn login(Json(body): Json<Value>) -> Json<Value> {
        if body["password"] == "password" {
            Json(json!({
                "error": false,
                "message": "ok",
                "loginResult": {"userId": 7, "name": "Demo", "email": body["email"], "token": "tok-1"}
            }))
        } else {
            Json(json!({"error": true, "message": "Invalid email or password"}))
        }
    }

    async fn broken() -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    async fn stub_server() -> String {
        let app = Router::new()
            .route("/ingredients", get(list_ingredients))
            .route("/pantry", get(pantry).post(add_pantry).delete(remove_pantry))
            .route("/recipes/recommended", get(broken))
            .route("/recipes/{id}", get(recipe_detail))
            .route("/favorites", get(favorites))
            .route("/login", post(login));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_get_all_ingredients() {
        let client = HttpClient::new(&stub_server().await, None).unwrap();
        let resp = client.get_all_ingredients().await.unwrap();
        assert_eq!(resp.list_ingredient.len(), 2);
        assert_eq!(resp.list_ingredient[1].ing_name, "Cumin");
    }

    #[tokio::test]
    async fn test_pantry_passes_user_id() {
        let client = HttpClient::new(&stub_server().await, None).unwrap();
        assert_eq!(client.get_pantry_ingredients(7).await.unwrap().list_ingredient.len(), 1);
        assert!(client.get_pantry_ingredients(8).await.unwrap().list_ingredient.is_empty());
    }

    #[tokio::test]
    async fn test_pantry_mutations() {
        let client = HttpClient::new(&stub_server().await, None).unwrap();
        let added = client.add_pantry_ingredient(7, 3).await.unwrap();
        assert_eq!(added.message, "added 3 for 7");

        let err = client.delete_pantry_ingredient(7, 3).await.unwrap_err();
        assert_eq!(err.to_string(), "Ingredient is not in the pantry");
    }

    #[tokio::test]
    async fn test_recipe_detail() {
        let client = HttpClient::new(&stub_server().await, None).unwrap();
        let detail = client.get_detail_recipe_by_id(3).await.unwrap().recipe;
        assert_eq!(detail.id, 3);
        assert_eq!(detail.ingredients[0].unit, "tsp");
        assert_eq!(detail.steps.len(), 2);
        assert_eq!(detail.img_url, "");
    }

    #[tokio::test]
    async fn test_status_without_message() {
        let client = HttpClient::new(&stub_server().await, None).unwrap();
        let err = client.get_recommended_recipes(7).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "EasyMeal API returned 500 Internal Server Error"
        );
    }

    #[tokio::test]
    async fn test_bearer_token_is_sent() {
        let url = stub_server().await;
        let anonymous = HttpClient::new(&url, None).unwrap();
        assert!(anonymous.get_favorite_recipes(7).await.is_err());

        let signed_in = HttpClient::new(&url, Some("tok-1".to_string())).unwrap();
        assert!(signed_in.get_favorite_recipes(7).await.unwrap().list_favorite_recipe.is_empty());
    }

    #[tokio::test]
    async fn test_login_error_flag_in_ok_response() {
        let client = HttpClient::new(&stub_server().await, None).unwrap();
        let ok = client.login("demo@easymeal.app", "password").await.unwrap();
        assert_eq!(ok.login_result.unwrap().user_id, 7);

        let err = client.login("demo@easymeal.app", "nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid email or password");
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let client = HttpClient::new("http://127.0.0.1:9", None).unwrap();
        let err = client.get_all_ingredients().await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to reach EasyMeal API");
    }
}
