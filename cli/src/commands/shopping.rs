use anyhow::{Result, bail};

use easymeal_core::repository::Repositories;

use super::helpers::{
    Output, first, follow, format_qty, local, print_json, print_shopping_table, refresh,
};

/// The shopping list is derived from the catalog, so an empty one triggers
/// a catalog refresh first.
pub(crate) async fn cmd_shopping_list(
    repos: &Repositories,
    pending_only: bool,
    out: Output,
) -> Result<()> {
    if first(repos.ingredients.shopping_list_local()).await?.is_empty() {
        refresh(repos.ingredients.get_all_ingredients(), out.json).await;
    }
    follow(local(repos.ingredients.shopping_list_local()), out, |items| {
        let items: Vec<_> = items
            .iter()
            .filter(|item| !pending_only || (item.qty > 0.0 && !item.is_have))
            .cloned()
            .collect();
        if out.json {
            print_json(&items)
        } else if items.is_empty() {
            println!("Nothing on the shopping list.");
            Ok(())
        } else {
            print_shopping_table(&items);
            Ok(())
        }
    })
    .await
}

pub(crate) fn cmd_shopping_set(
    repos: &Repositories,
    id: i64,
    qty: f64,
    unit: &str,
    json: bool,
) -> Result<()> {
    let item = repos.ingredients.set_shopping_quantity(id, qty, unit)?;
    if json {
        print_json(&item)?;
    } else {
        let qty = format_qty(item.qty);
        let unit = &item.unit;
        let name = &item.name;
        println!("Shopping list: {qty} {unit} {name}");
    }
    Ok(())
}

pub(crate) fn cmd_shopping_check(
    repos: &Repositories,
    id: i64,
    undo: bool,
    json: bool,
) -> Result<()> {
    if !repos.ingredients.set_shopping_have(id, !undo)? {
        bail!("Shopping list item {id} not found");
    }
    if json {
        println!("{}", serde_json::json!({ "id": id, "is_have": !undo }));
    } else if undo {
        println!("Unchecked item {id}");
    } else {
        println!("Checked off item {id}");
    }
    Ok(())
}
