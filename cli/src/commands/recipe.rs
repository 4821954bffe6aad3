use anyhow::Result;

use easymeal_core::api::RecipeDetail;
use easymeal_core::repository::Repositories;

use super::helpers::{
    Output, finish, first, follow, format_qty, print_json, print_recipe_table, refresh,
    require_user,
};

pub(crate) async fn cmd_recipe_recommended(repos: &Repositories, out: Output) -> Result<()> {
    let user = require_user(repos)?;
    follow(repos.recipes.get_recommended_recipes(user.id), out, |rows| {
        if out.json {
            print_json(rows)
        } else if rows.is_empty() {
            println!("No recommendations yet. Add a few ingredients to your pantry.");
            Ok(())
        } else {
            print_recipe_table(rows);
            Ok(())
        }
    })
    .await
}

pub(crate) async fn cmd_recipe_favorites(repos: &Repositories, out: Output) -> Result<()> {
    let user = require_user(repos)?;
    follow(repos.recipes.get_favorite_recipes(user.id), out, |rows| {
        if out.json {
            print_json(rows)
        } else if rows.is_empty() {
            println!("No favorite recipes. Mark one with: easymeal recipe favorite <id>");
            Ok(())
        } else {
            print_recipe_table(rows);
            Ok(())
        }
    })
    .await
}

pub(crate) async fn cmd_recipe_show(repos: &Repositories, id: i64, json: bool) -> Result<()> {
    let detail = finish(repos.recipes.get_detail_recipe_by_id(id)).await?.recipe;
    let is_favorite = first(repos.recipes.is_recipe_favorite_local(id)).await?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "recipe": detail, "is_favorite": is_favorite })
        );
        return Ok(());
    }
    print_detail(&detail, is_favorite);
    Ok(())
}

fn print_detail(detail: &RecipeDetail, is_favorite: bool) {
    let star = if is_favorite { " *" } else { "" };
    println!("{}{star}", detail.title);
    if !detail.description.is_empty() {
        println!("{}", detail.description);
    }
    println!(
        "{} min, serves {}",
        detail.total_time, detail.serving
    );

    if !detail.ingredients.is_empty() {
        println!("\nIngredients:");
        for line in &detail.ingredients {
            let qty = format_qty(line.qty);
            let unit = &line.unit;
            let name = &line.ing_name;
            println!("  - {qty} {unit} {name}");
        }
    }
    if !detail.steps.is_empty() {
        println!("\nSteps:");
        for (i, step) in detail.steps.iter().enumerate() {
            println!("  {}. {step}", i + 1);
        }
    }
}

/// Pull the recipe lists when `id` isn't cached yet so the favorite flag
/// has a row to land on.
async fn ensure_cached(repos: &Repositories, user_id: i64, id: i64, json: bool) -> Result<()> {
    let recommended = first(repos.recipes.recommended_recipes_local()).await?;
    let favorites = first(repos.recipes.favorite_recipes_local()).await?;
    if !recommended.iter().chain(&favorites).any(|r| r.id == id) {
        refresh(repos.recipes.get_recommended_recipes(user_id), json).await;
        refresh(repos.recipes.get_favorite_recipes(user_id), json).await;
    }
    Ok(())
}

pub(crate) async fn cmd_recipe_favorite(repos: &Repositories, id: i64, json: bool) -> Result<()> {
    let user = require_user(repos)?;
    ensure_cached(repos, user.id, id, json).await?;
    let response = finish(repos.recipes.add_favorite_recipe(user.id, id)).await?;
    if json {
        print_json(&response)?;
    } else {
        println!("{}", response.message);
    }
    Ok(())
}

pub(crate) async fn cmd_recipe_unfavorite(
    repos: &Repositories,
    id: i64,
    json: bool,
) -> Result<()> {
    let user = require_user(repos)?;
    ensure_cached(repos, user.id, id, json).await?;
    let response = finish(repos.recipes.delete_favorite_recipe(user.id, id)).await?;
    if json {
        print_json(&response)?;
    } else {
        println!("{}", response.message);
    }
    Ok(())
}
