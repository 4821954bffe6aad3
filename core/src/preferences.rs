use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow};
use chrono::Local;
use futures::stream::BoxStream;
use rusqlite::{Connection, OptionalExtension, params};
use tokio::sync::watch;

use crate::live::watch_values;
use crate::models::User;

const USER_KEY: &str = "user";
const FIRST_TIME_KEY: &str = "first_time";

/// Key-value store for session state, kept apart from the catalog cache.
///
/// The current user and the first-run flag are mirrored into watch channels
/// so `user_stream` and `first_time_stream` observe every change.
pub struct UserPreferences {
    conn: Mutex<Connection>,
    user: watch::Sender<User>,
    first_time: watch::Sender<bool>,
}

impl UserPreferences {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open preferences: {}", path.display()))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS user_settings (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )?;

        let user = match read_setting(&conn, USER_KEY)? {
            Some(raw) => serde_json::from_str(&raw).context("Stored user record is corrupt")?,
            None => User::default(),
        };
        let first_time = match read_setting(&conn, FIRST_TIME_KEY)? {
            Some(raw) => raw.parse::<bool>().context("Stored first-run flag is corrupt")?,
            None => true,
        };

        Ok(Self {
            conn: Mutex::new(conn),
            user: watch::channel(user).0,
            first_time: watch::channel(first_time).0,
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Preferences connection lock poisoned"))
    }

    fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn()?.execute(
            "INSERT INTO user_settings (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }

    fn delete_setting(&self, key: &str) -> Result<bool> {
        let rows = self
            .conn()?
            .execute("DELETE FROM user_settings WHERE key = ?1", params![key])?;
        Ok(rows > 0)
    }

    // --- User ---

    #[must_use]
    pub fn user(&self) -> User {
        self.user.borrow().clone()
    }

    pub fn user_stream(&self) -> BoxStream<'static, User> {
        watch_values(self.user.subscribe())
    }

    pub fn save_user(&self, user: &User) -> Result<()> {
        let raw = serde_json::to_string(user)?;
        self.set_setting(USER_KEY, &raw)?;
        self.user.send_replace(user.clone());
        Ok(())
    }

    /// Forget the stored user. The first-run flag is left as is.
    pub fn logout(&self) -> Result<()> {
        self.delete_setting(USER_KEY)?;
        self.user.send_replace(User::default());
        Ok(())
    }

    // --- First run ---

    #[must_use]
    pub fn first_time_status(&self) -> bool {
        *self.first_time.borrow()
    }

    pub fn first_time_stream(&self) -> BoxStream<'static, bool> {
        watch_values(self.first_time.subscribe())
    }

    pub fn set_first_time_status(&self, first_time: bool) -> Result<()> {
        self.set_setting(FIRST_TIME_KEY, &first_time.to_string())?;
        self.first_time.send_replace(first_time);
        Ok(())
    }
}

fn read_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM user_settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn sample_user() -> User {
        User {
            id: 12,
            name: "Dita".to_string(),
            email: "dita@example.com".to_string(),
            token: "tok-123".to_string(),
            is_logged_in: true,
        }
    }

    #[test]
    fn test_defaults() {
        let prefs = UserPreferences::open_in_memory().unwrap();
        assert_eq!(prefs.user(), User::default());
        assert!(prefs.first_time_status());
    }

    #[test]
    fn test_save_user_and_logout() {
        let prefs = UserPreferences::open_in_memory().unwrap();
        prefs.save_user(&sample_user()).unwrap();
        assert_eq!(prefs.user(), sample_user());

        prefs.logout().unwrap();
        assert_eq!(prefs.user(), User::default());
        // Logging out twice is harmless
        prefs.logout().unwrap();
    }

    #[test]
    fn test_logout_keeps_first_time_flag() {
        let prefs = UserPreferences::open_in_memory().unwrap();
        prefs.set_first_time_status(false).unwrap();
        prefs.save_user(&sample_user()).unwrap();
        prefs.logout().unwrap();
        assert!(!prefs.first_time_status());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("preferences.db");
        {
            let prefs = UserPreferences::open(&path).unwrap();
            prefs.save_user(&sample_user()).unwrap();
            prefs.set_first_time_status(false).unwrap();
        }
        let prefs = UserPreferences::open(&path).unwrap();
        assert_eq!(prefs.user(), sample_user());
        assert!(!prefs.first_time_status());
    }

    #[test]
    fn test_corrupt_user_record_is_reported() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE user_settings (key TEXT PRIMARY KEY NOT NULL, value TEXT NOT NULL, updated_at TEXT NOT NULL);
             INSERT INTO user_settings VALUES ('user', 'not json', '2024-01-01');",
        )
        .unwrap();
        let err = UserPreferences::from_connection(conn).err().unwrap();
        assert_eq!(err.to_string(), "Stored user record is corrupt");
    }

    #[tokio::test]
    async fn test_streams_observe_changes() {
        let prefs = UserPreferences::open_in_memory().unwrap();
        let mut users = prefs.user_stream();
        let mut first_time = prefs.first_time_stream();

        assert!(!users.next().await.unwrap().is_logged_in);
        assert!(first_time.next().await.unwrap());

        prefs.save_user(&sample_user()).unwrap();
        prefs.set_first_time_status(false).unwrap();
        assert_eq!(users.next().await.unwrap().id, 12);
        assert!(!first_time.next().await.unwrap());
    }
}
