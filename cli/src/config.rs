use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub struct Config {
    pub data_dir: PathBuf,
    /// Catalog cache: ingredients, shopping list and recipes.
    pub db_path: PathBuf,
    /// Session state, kept in its own file so clearing the cache keeps the login.
    pub prefs_path: PathBuf,
    pub api_url: String,
}

impl Config {
    pub fn load(api_url: &str) -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "easymeal").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        Ok(Config {
            db_path: data_dir.join("easymeal.db"),
            prefs_path: data_dir.join("preferences.db"),
            api_url: api_url.trim_end_matches('/').to_string(),
            data_dir,
        })
    }

    /// Where `--offline` keeps the fixture server's state between runs.
    pub fn offline_state_path(&self) -> PathBuf {
        self.data_dir.join("offline.json")
    }
}
