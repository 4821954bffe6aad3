use anyhow::Result;
use std::process;

use easymeal_core::models::Ingredient;
use easymeal_core::repository::Repositories;

use super::helpers::{Output, first, follow, json_error, local, print_ingredient_table, print_json, refresh};

fn render(ingredients: &[Ingredient], out: Output) -> Result<()> {
    if out.json {
        print_json(ingredients)
    } else if ingredients.is_empty() {
        println!("No ingredients found.");
        Ok(())
    } else {
        print_ingredient_table(ingredients);
        Ok(())
    }
}

/// Refresh the catalog, then list it, optionally narrowed to one category
/// or a name search.
pub(crate) async fn cmd_ingredient_list(
    repos: &Repositories,
    category: Option<&str>,
    search: Option<&str>,
    out: Output,
) -> Result<()> {
    let ingredients = &repos.ingredients;
    let stream = match (category, search) {
        (None, None) => ingredients.get_all_ingredients(),
        (Some(category), _) => {
            refresh(ingredients.get_all_ingredients(), out.json).await;
            local(ingredients.ingredients_by_category_local(category))
        }
        (None, Some(query)) => {
            refresh(ingredients.get_all_ingredients(), out.json).await;
            local(ingredients.search_ingredient_by_name(query))
        }
    };
    follow(stream, out, |rows| render(rows, out)).await
}

/// Show cached ingredients by id. Exits with status 2 when none are cached.
pub(crate) async fn cmd_ingredient_show(
    repos: &Repositories,
    ids: &[i64],
    out: Output,
) -> Result<()> {
    let found = first(repos.ingredients.ingredients_by_ids(ids)).await?;
    if found.is_empty() && !out.watch {
        if out.json {
            println!("{}", json_error("No matching ingredients in the local cache"));
        } else {
            eprintln!("No matching ingredients cached. Run `easymeal ingredient list` first.");
        }
        process::exit(2);
    }
    follow(local(repos.ingredients.ingredients_by_ids(ids)), out, |rows| {
        render(rows, out)
    })
    .await
}
