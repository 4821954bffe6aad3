use anyhow::{Context, Result, bail};
use futures::StreamExt;
use serde::Serialize;
use std::io::{self, BufRead, Write};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};
use tracing::debug;

use easymeal_core::live::LiveQuery;
use easymeal_core::models::{Ingredient, Recipe, ShoppingItem, User};
use easymeal_core::outcome::Outcome;
use easymeal_core::repository::{OutcomeStream, Repositories};

/// Global output flags shared by every command.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Output {
    pub json: bool,
    pub watch: bool,
}

/// Turn a local live query into the same shape the read-through streams have.
pub(crate) fn local<T: Send + 'static>(query: LiveQuery<T>) -> OutcomeStream<T> {
    query.map(Outcome::from).boxed()
}

/// Drive `stream` and hand every `Success` to `render`.
///
/// An `Error` is printed as a warning and the cached rows that follow are
/// still shown. Without `--watch` this returns after the first `Success`.
pub(crate) async fn follow<T>(
    mut stream: OutcomeStream<T>,
    out: Output,
    mut render: impl FnMut(&T) -> Result<()>,
) -> Result<()> {
    let mut last_error = None;
    while let Some(state) = stream.next().await {
        match state {
            Outcome::Loading => debug!("Loading"),
            Outcome::Error(message) => {
                warn_user(&message, out.json);
                last_error = Some(message);
            }
            Outcome::Success(value) => {
                render(&value)?;
                if !out.watch {
                    return Ok(());
                }
            }
        }
    }
    match last_error {
        Some(message) if !out.watch => bail!(message),
        _ => Ok(()),
    }
}

/// Drive a one-shot stream to its result.
pub(crate) async fn finish<T>(mut stream: OutcomeStream<T>) -> Result<T> {
    while let Some(state) = stream.next().await {
        if let Some(result) = state.into_result() {
            return result;
        }
        debug!("Loading");
    }
    bail!("No result received")
}

/// Run a read-through use case only for its refresh, warning on failure.
pub(crate) async fn refresh<T>(mut stream: OutcomeStream<T>, json: bool) {
    while let Some(state) = stream.next().await {
        match state {
            Outcome::Loading => {}
            Outcome::Error(message) => warn_user(&message, json),
            Outcome::Success(_) => return,
        }
    }
}

pub(crate) async fn first<T>(query: LiveQuery<T>) -> Result<T> {
    let mut query = query;
    query.next().await.context("Local query ended unexpectedly")?
}

fn warn_user(message: &str, json: bool) {
    if json {
        eprintln!("{}", json_error(message));
    } else {
        eprintln!("Warning: {message} (showing cached data)");
    }
}

/// The logged-in user, or an error telling how to log in.
pub(crate) fn require_user(repos: &Repositories) -> Result<User> {
    let user = repos.users.current_user();
    if !user.is_logged_in {
        bail!("Not logged in. Run `easymeal login <email>` first");
    }
    Ok(user)
}

pub(crate) fn prompt_line(label: &str) -> Result<String> {
    eprint!("{label}: ");
    io::stderr().flush()?;
    let stdin = io::stdin();
    let line = stdin.lock().lines().next().context("No input")??;
    Ok(line.trim().to_string())
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn print_ingredient_table(ingredients: &[Ingredient]) {
    #[derive(Tabled)]
    struct IngredientRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "In pantry")]
        have: &'static str,
    }

    let rows: Vec<IngredientRow> = ingredients
        .iter()
        .map(|i| IngredientRow {
            id: i.id,
            name: truncate(&i.name, 35),
            category: truncate(&i.category_name, 20),
            have: if i.is_have { "yes" } else { "" },
        })
        .collect();

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
}

pub(crate) fn print_shopping_table(items: &[ShoppingItem]) {
    #[derive(Tabled)]
    struct ShoppingRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Qty")]
        qty: String,
        #[tabled(rename = "Unit")]
        unit: String,
        #[tabled(rename = "Got it")]
        have: &'static str,
    }

    let rows: Vec<ShoppingRow> = items
        .iter()
        .map(|item| ShoppingRow {
            id: item.id,
            name: truncate(&item.name, 35),
            qty: format_qty(item.qty),
            unit: item.unit.clone(),
            have: if item.is_have { "x" } else { "" },
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(2)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_recipe_table(recipes: &[Recipe]) {
    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Title")]
        title: String,
        #[tabled(rename = "Time")]
        time: String,
        #[tabled(rename = "Serves")]
        serving: i64,
        #[tabled(rename = "Fav")]
        favorite: &'static str,
    }

    let rows: Vec<RecipeRow> = recipes
        .iter()
        .map(|r| RecipeRow {
            id: r.id,
            title: truncate(&r.title, 40),
            time: format!("{} min", r.total_time),
            serving: r.serving,
            favorite: if r.is_favorite { "*" } else { "" },
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

/// Whole quantities print without a decimal point.
pub(crate) fn format_qty(qty: f64) -> String {
    if qty.fract() == 0.0 {
        format!("{qty:.0}")
    } else {
        format!("{qty}")
    }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn quiet() -> Output {
        Output {
            json: true,
            watch: false,
        }
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world this is long", 10), "hello w...");
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate("Crème fraîche", 10), "Crème f...");
        assert_eq!(truncate("Bawang putih", 20), "Bawang putih");
    }

    #[test]
    fn test_format_qty() {
        assert_eq!(format_qty(2.0), "2");
        assert_eq!(format_qty(0.0), "0");
        assert_eq!(format_qty(1.5), "1.5");
    }

    #[test]
    fn test_json_error() {
        assert_eq!(json_error("boom"), r#"{"error":"boom"}"#);
    }

    #[tokio::test]
    async fn test_follow_renders_cached_rows_after_error() {
        let states = stream::iter(vec![
            Outcome::Loading,
            Outcome::Error("network down".to_string()),
            Outcome::Success(3),
            Outcome::Success(4),
        ])
        .boxed();
        let mut seen = Vec::new();
        follow(states, quiet(), |v| {
            seen.push(*v);
            Ok(())
        })
        .await
        .unwrap();
        assert_eq!(seen, vec![3]);
    }

    #[tokio::test]
    async fn test_follow_fails_without_rows() {
        let states = stream::iter(vec![
            Outcome::<i32>::Loading,
            Outcome::Error("network down".to_string()),
        ])
        .boxed();
        let err = follow(states, quiet(), |_| Ok(())).await.unwrap_err();
        assert_eq!(err.to_string(), "network down");
    }

    #[tokio::test]
    async fn test_finish() {
        let ok = stream::iter(vec![Outcome::Loading, Outcome::Success("done")]).boxed();
        assert_eq!(finish(ok).await.unwrap(), "done");

        let failed =
            stream::iter(vec![Outcome::<()>::Loading, Outcome::Error("nope".into())]).boxed();
        assert_eq!(finish(failed).await.unwrap_err().to_string(), "nope");
    }
}
