use anyhow::Result;

use easymeal_core::repository::Repositories;

use super::helpers::{
    Output, finish, first, follow, print_ingredient_table, print_json, refresh, require_user,
};

pub(crate) async fn cmd_pantry_list(repos: &Repositories, out: Output) -> Result<()> {
    let user = require_user(repos)?;
    follow(repos.ingredients.get_pantry_ingredients(user.id), out, |rows| {
        if out.json {
            print_json(rows)
        } else if rows.is_empty() {
            println!("Your pantry is empty. Add something with: easymeal pantry add <id>");
            Ok(())
        } else {
            print_ingredient_table(rows);
            Ok(())
        }
    })
    .await
}

/// Make sure `id` is in the local catalog before flipping its pantry flag.
async fn ensure_cached(repos: &Repositories, id: i64, json: bool) -> Result<()> {
    if first(repos.ingredients.ingredients_by_ids(&[id])).await?.is_empty() {
        refresh(repos.ingredients.get_all_ingredients(), json).await;
    }
    Ok(())
}

pub(crate) async fn cmd_pantry_add(repos: &Repositories, id: i64, json: bool) -> Result<()> {
    let user = require_user(repos)?;
    ensure_cached(repos, id, json).await?;
    let response = finish(repos.ingredients.add_pantry_ingredient(user.id, id)).await?;
    if json {
        print_json(&response)?;
    } else {
        println!("{}", response.message);
    }
    Ok(())
}

pub(crate) async fn cmd_pantry_remove(repos: &Repositories, id: i64, json: bool) -> Result<()> {
    let user = require_user(repos)?;
    ensure_cached(repos, id, json).await?;
    let response = finish(repos.ingredients.delete_pantry_ingredient(user.id, id)).await?;
    if json {
        print_json(&response)?;
    } else {
        println!("{}", response.message);
        if !first(repos.ingredients.is_pantry_not_empty()).await? {
            println!("Your pantry is now empty.");
        }
    }
    Ok(())
}
