mod api_client;
mod commands;
mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use std::process;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::api_client::HttpClient;
use crate::commands::{
    Output, cmd_ingredient_list, cmd_ingredient_show, cmd_login, cmd_logout, cmd_pantry_add,
    cmd_pantry_list, cmd_pantry_remove, cmd_recipe_favorite, cmd_recipe_favorites,
    cmd_recipe_recommended, cmd_recipe_show, cmd_recipe_unfavorite, cmd_register,
    cmd_shopping_check, cmd_shopping_list, cmd_shopping_set, cmd_whoami,
};
use crate::config::Config;
use easymeal_core::api::RemoteClient;
use easymeal_core::db::Database;
use easymeal_core::fixtures::{FixtureClient, FixtureData};
use easymeal_core::preferences::UserPreferences;
use easymeal_core::repository::Repositories;

#[derive(Parser)]
#[command(
    name = "easymeal",
    version,
    about = "Pantry, shopping list and recipe ideas from the EasyMeal service"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Base URL of the EasyMeal API
    #[arg(
        long,
        global = true,
        env = "EASYMEAL_API_URL",
        default_value = "http://localhost:3000"
    )]
    api_url: String,
    /// Use the built-in demo catalog instead of the API (log in as demo@easymeal.app / password)
    #[arg(long, global = true)]
    offline: bool,
    /// Keep running and reprint whenever the local data changes
    #[arg(long, global = true)]
    watch: bool,
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
    /// Print debug logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Register {
        /// Display name
        name: String,
        /// Email address
        email: String,
        /// Password (prompted when omitted)
        #[arg(long, env = "EASYMEAL_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Log in and remember the session
    Login {
        /// Email address
        email: String,
        /// Password (prompted when omitted)
        #[arg(long, env = "EASYMEAL_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the stored session and local favorites
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Browse the ingredient catalog
    Ingredient {
        #[command(subcommand)]
        command: IngredientCommands,
    },
    /// Manage the ingredients you have at home
    Pantry {
        #[command(subcommand)]
        command: PantryCommands,
    },
    /// Manage the shopping list
    Shopping {
        #[command(subcommand)]
        command: ShoppingCommands,
    },
    /// Recommended and favorite recipes
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
}

#[derive(Subcommand)]
enum IngredientCommands {
    /// Refresh and list the catalog
    List {
        /// Only show one category (e.g. "Vegetables")
        #[arg(short, long, conflicts_with = "search")]
        category: Option<String>,
        /// Only show ingredients whose name contains this text
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show cached ingredients by ID
    Show {
        /// Ingredient IDs
        #[arg(required = true)]
        ids: Vec<i64>,
    },
}

#[derive(Subcommand)]
enum PantryCommands {
    /// Refresh and list your pantry
    List,
    /// Add an ingredient to your pantry
    Add {
        /// Ingredient ID
        id: i64,
    },
    /// Remove an ingredient from your pantry
    Remove {
        /// Ingredient ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum ShoppingCommands {
    /// Show the shopping list
    List {
        /// Only items with a quantity that are not checked off yet
        #[arg(long)]
        pending: bool,
    },
    /// Set how much of an ingredient to buy
    Set {
        /// Ingredient ID
        id: i64,
        /// Quantity (e.g. 2, 0.5)
        qty: f64,
        /// Unit (e.g. "g", "pcs")
        #[arg(default_value = "")]
        unit: String,
    },
    /// Check an item off (or back on with --undo)
    Check {
        /// Ingredient ID
        id: i64,
        /// Mark as not bought yet
        #[arg(long)]
        undo: bool,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// Refresh and list recipes recommended for you
    Recommended,
    /// Refresh and list your favorite recipes
    Favorites,
    /// Show a recipe with ingredients and steps
    Show {
        /// Recipe ID
        id: i64,
    },
    /// Mark a recipe as favorite
    Favorite {
        /// Recipe ID
        id: i64,
    },
    /// Remove a recipe from your favorites
    Unfavorite {
        /// Recipe ID
        id: i64,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "easymeal=debug,easymeal_core=debug"
    } else {
        "easymeal=warn,easymeal_core=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// The canned server used by `--offline`, resumed from its last saved state.
fn load_fixtures(config: &Config) -> Result<FixtureClient> {
    let path = config.offline_state_path();
    let data = if path.exists() {
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        FixtureData::from_json(&raw)?
    } else {
        FixtureData::sample()
    };
    Ok(FixtureClient::new(data))
}

fn save_fixtures(config: &Config, fixtures: &FixtureClient) -> Result<()> {
    let path = config.offline_state_path();
    std::fs::write(&path, fixtures.snapshot()?.to_json()?)
        .with_context(|| format!("Failed to write {}", path.display()))
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(&cli.api_url)?;
    let db = Arc::new(Database::open(&config.db_path)?);
    let prefs = Arc::new(UserPreferences::open(&config.prefs_path)?);

    let fixtures = if cli.offline {
        Some(Arc::new(load_fixtures(&config)?))
    } else {
        None
    };
    let remote: Arc<dyn RemoteClient> = match &fixtures {
        Some(fixtures) => Arc::clone(fixtures) as Arc<dyn RemoteClient>,
        None => {
            let user = prefs.user();
            let token = user.is_logged_in.then_some(user.token);
            Arc::new(HttpClient::new(&config.api_url, token)?)
        }
    };
    debug!(api_url = %config.api_url, offline = cli.offline, "Starting");

    let repos = Repositories::new(remote, db, prefs);

    if take_first_run(&repos, !cli.json).await? {
        eprintln!("Welcome to EasyMeal! Create an account with `easymeal register <name> <email>`");
        eprintln!("or try the demo catalog with `easymeal --offline login demo@easymeal.app`.");
    }

    let out = Output {
        json: cli.json,
        watch: cli.watch,
    };
    let json = cli.json;
    let result = match cli.command {
        Commands::Register {
            name,
            email,
            password,
        } => cmd_register(&repos, &name, &email, password, json).await,
        Commands::Login { email, password } => cmd_login(&repos, &email, password, json).await,
        Commands::Logout => cmd_logout(&repos, json),
        Commands::Whoami => cmd_whoami(&repos, out).await,
        Commands::Ingredient { command } => match command {
            IngredientCommands::List { category, search } => {
                cmd_ingredient_list(&repos, category.as_deref(), search.as_deref(), out).await
            }
            IngredientCommands::Show { ids } => cmd_ingredient_show(&repos, &ids, out).await,
        },
        Commands::Pantry { command } => match command {
            PantryCommands::List => cmd_pantry_list(&repos, out).await,
            PantryCommands::Add { id } => cmd_pantry_add(&repos, id, json).await,
            PantryCommands::Remove { id } => cmd_pantry_remove(&repos, id, json).await,
        },
        Commands::Shopping { command } => match command {
            ShoppingCommands::List { pending } => cmd_shopping_list(&repos, pending, out).await,
            ShoppingCommands::Set { id, qty, unit } => {
                cmd_shopping_set(&repos, id, qty, &unit, json)
            }
            ShoppingCommands::Check { id, undo } => cmd_shopping_check(&repos, id, undo, json),
        },
        Commands::Recipe { command } => match command {
            RecipeCommands::Recommended => cmd_recipe_recommended(&repos, out).await,
            RecipeCommands::Favorites => cmd_recipe_favorites(&repos, out).await,
            RecipeCommands::Show { id } => cmd_recipe_show(&repos, id, json).await,
            RecipeCommands::Favorite { id } => cmd_recipe_favorite(&repos, id, json).await,
            RecipeCommands::Unfavorite { id } => cmd_recipe_unfavorite(&repos, id, json).await,
        },
    };

    if let Some(fixtures) = &fixtures {
        save_fixtures(&config, fixtures)?;
    }
    result
}

/// True when the welcome note should be shown now. The flag is only cleared
/// once the note can actually be seen, so `--json` runs leave it set.
async fn take_first_run(repos: &Repositories, can_show: bool) -> Result<bool> {
    if !can_show {
        return Ok(false);
    }
    let first_time = repos
        .users
        .get_first_time_status()
        .next()
        .await
        .unwrap_or(false);
    if first_time {
        repos.users.set_first_time_status(false)?;
    }
    Ok(first_time)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_repos() -> Repositories {
        Repositories::new(
            Arc::new(FixtureClient::new(FixtureData::sample())),
            Arc::new(Database::open_in_memory().unwrap()),
            Arc::new(UserPreferences::open_in_memory().unwrap()),
        )
    }

    #[tokio::test]
    async fn test_first_run_note_survives_json_runs() {
        let repos = offline_repos();

        assert!(!take_first_run(&repos, false).await.unwrap());
        assert_eq!(repos.users.get_first_time_status().next().await, Some(true));

        assert!(take_first_run(&repos, true).await.unwrap());
        assert!(!take_first_run(&repos, true).await.unwrap());
    }
}
