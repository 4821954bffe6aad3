use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: i64,
    pub category_name: String,
    pub name: String,
    /// Whether the ingredient is currently in the user's pantry.
    pub is_have: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingItem {
    /// Same id as the ingredient this entry is for.
    pub id: i64,
    pub name: String,
    pub qty: f64,
    pub unit: String,
    pub is_have: bool,
}

impl ShoppingItem {
    /// Shopping entry for `ingredient`, keeping quantity, unit and checked
    /// state from `existing` when there is one.
    #[must_use]
    pub fn carried_over(ingredient_id: i64, name: &str, existing: Option<&ShoppingItem>) -> Self {
        Self {
            id: ingredient_id,
            name: name.to_string(),
            qty: existing.map_or(0.0, |item| item.qty),
            unit: existing.map(|item| item.unit.clone()).unwrap_or_default(),
            is_have: existing.is_some_and(|item| item.is_have),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: i64,
    pub title: String,
    pub description: String,
    /// Minutes.
    pub total_time: i64,
    pub serving: i64,
    pub img_url: String,
    pub is_favorite: bool,
    pub is_recommended: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub token: String,
    pub is_logged_in: bool,
}

pub fn validate_quantity(qty: f64) -> anyhow::Result<f64> {
    if !qty.is_finite() || qty < 0.0 {
        anyhow::bail!("Quantity must be a non-negative number (got {qty})");
    }
    Ok(qty)
}
