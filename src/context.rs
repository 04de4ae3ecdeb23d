//! Application context: signed-in user and UI preferences.
//!
//! Both are hydrated from JSON files in the data directory when the context
//! is created and written back on every change.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::FlowmapConfig;

const SESSION_FILE: &str = "session.json";
const PREFERENCES_FILE: &str = "preferences.json";

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Context I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Context serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Superadmin,
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuthState {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<UserInfo>,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UiPreferences {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_sidebar_open")]
    pub sidebar_open: bool,
}

fn default_sidebar_open() -> bool {
    true
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            sidebar_open: default_sidebar_open(),
        }
    }
}

/// Read a JSON file, falling back to the default when it is missing or bad.
fn hydrate<T: DeserializeOwned + Default>(path: &Path) -> T {
    if !path.exists() {
        return T::default();
    }
    let parsed = fs::read_to_string(path)
        .map_err(ContextError::from)
        .and_then(|json| serde_json::from_str(&json).map_err(ContextError::from));
    match parsed {
        Ok(value) => value,
        Err(e) => {
            log::warn!("Ignoring unreadable state file {:?}: {}", path, e);
            T::default()
        }
    }
}

/// State shared by the editor screens, passed explicitly instead of living in
/// globals.
pub struct AppContext {
    data_dir: PathBuf,
    auth: AuthState,
    preferences: UiPreferences,
}

impl AppContext {
    /// Build the context from the files under `config.data_dir`.
    pub fn init(config: &FlowmapConfig) -> Self {
        let data_dir = config.data_dir.clone();
        let auth: AuthState = hydrate(&data_dir.join(SESSION_FILE));
        let preferences: UiPreferences = hydrate(&data_dir.join(PREFERENCES_FILE));
        log::debug!(
            "Context hydrated from {:?} (signed in: {})",
            data_dir,
            auth.is_authenticated()
        );
        Self {
            data_dir,
            auth,
            preferences,
        }
    }

    pub fn auth(&self) -> &AuthState {
        &self.auth
    }

    pub fn preferences(&self) -> &UiPreferences {
        &self.preferences
    }

    fn persist<T: Serialize>(&self, file: &str, value: &T) -> Result<(), ContextError> {
        fs::create_dir_all(&self.data_dir)?;
        let json = serde_json::to_string_pretty(value)?;
        fs::write(self.data_dir.join(file), json)?;
        Ok(())
    }

    pub fn login(&mut self, token: impl Into<String>, user: UserInfo) -> Result<(), ContextError> {
        log::info!("Signed in as '{}'", user.username);
        self.auth = AuthState {
            token: Some(token.into()),
            user: Some(user),
        };
        self.persist(SESSION_FILE, &self.auth)
    }

    pub fn update_user(&mut self, user: UserInfo) -> Result<(), ContextError> {
        self.auth.user = Some(user);
        self.persist(SESSION_FILE, &self.auth)
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<(), ContextError> {
        self.preferences.theme = theme;
        self.persist(PREFERENCES_FILE, &self.preferences)
    }

    pub fn set_sidebar_open(&mut self, open: bool) -> Result<(), ContextError> {
        self.preferences.sidebar_open = open;
        self.persist(PREFERENCES_FILE, &self.preferences)
    }

    pub fn toggle_sidebar(&mut self) -> Result<(), ContextError> {
        self.set_sidebar_open(!self.preferences.sidebar_open)
    }

    /// Sign out: clear auth state and remove the session file. Preferences
    /// are kept.
    pub fn teardown(&mut self) -> Result<(), ContextError> {
        self.auth = AuthState::default();
        let path = self.data_dir.join(SESSION_FILE);
        if path.exists() {
            fs::remove_file(path)?;
        }
        log::info!("Signed out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config_in(dir: &Path) -> FlowmapConfig {
        FlowmapConfig {
            data_dir: dir.join("state"),
            ..Default::default()
        }
    }

    fn admin() -> UserInfo {
        UserInfo {
            id: "u1".into(),
            username: "ada".into(),
            role: UserRole::Superadmin,
            email: None,
        }
    }

    #[test]
    fn test_fresh_context_defaults() {
        let dir = tempdir().unwrap();
        let ctx = AppContext::init(&config_in(dir.path()));
        assert!(!ctx.auth().is_authenticated());
        assert_eq!(ctx.preferences().theme, Theme::Dark);
        assert!(ctx.preferences().sidebar_open);
    }

    #[test]
    fn test_login_survives_reinit() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());

        let mut ctx = AppContext::init(&config);
        ctx.login("tok", admin()).unwrap();
        ctx.set_theme(Theme::Light).unwrap();
        ctx.toggle_sidebar().unwrap();

        let again = AppContext::init(&config);
        assert!(again.auth().is_authenticated());
        assert_eq!(again.auth().user.as_ref().unwrap().username, "ada");
        assert_eq!(again.preferences().theme, Theme::Light);
        assert!(!again.preferences().sidebar_open);
    }

    #[test]
    fn test_teardown_keeps_preferences() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());

        let mut ctx = AppContext::init(&config);
        ctx.login("tok", admin()).unwrap();
        ctx.set_theme(Theme::System).unwrap();
        ctx.teardown().unwrap();
        assert!(!ctx.auth().is_authenticated());

        let again = AppContext::init(&config);
        assert_eq!(again.auth(), &AuthState::default());
        assert_eq!(again.preferences().theme, Theme::System);
    }

    #[test]
    fn test_malformed_file_hydrates_default() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        fs::create_dir_all(&config.data_dir).unwrap();
        fs::write(config.data_dir.join(PREFERENCES_FILE), "{\"theme\": 3}").unwrap();

        let ctx = AppContext::init(&config);
        assert_eq!(ctx.preferences(), &UiPreferences::default());
    }

    #[test]
    fn test_update_user() {
        let dir = tempdir().unwrap();
        let mut ctx = AppContext::init(&config_in(dir.path()));
        ctx.login("tok", admin()).unwrap();
        ctx.update_user(UserInfo {
            email: Some("ada@example.com".into()),
            ..admin()
        })
        .unwrap();
        assert_eq!(
            ctx.auth().user.as_ref().unwrap().email.as_deref(),
            Some("ada@example.com")
        );
    }
}
