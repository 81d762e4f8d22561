use serde::{Deserialize, Deserializer, Serialize};
use web_time::Duration;

use crate::error::ConfigError;
use crate::host::KeyValueStore;
use crate::redirect::RedirectTarget;
use crate::tabs::TabId;

pub const VERSION: &str = "2.0.0";
pub const USERNAME_STORAGE_KEY: &str = "x41_username";
pub const PREFERENCES_STORAGE_KEY: &str = "x41_preferences";

pub const NAVIGATION_DEBOUNCE: Duration = Duration::from_millis(100);
pub const IDENTITY_RETRY_LIMIT: u32 = 15;
pub const IDENTITY_RETRY_DELAY: Duration = Duration::from_millis(200);
pub const BADGE_REFRESH_INTERVAL: Duration = Duration::from_millis(5_000);
pub const PATH_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const COMPANION_HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(1_500);
pub const TAB_BAR_HEIGHT_PX: u32 = 49;

/// How route changes made by the host's router reach the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationSource {
    /// A page-context companion wraps the history API and relays changes.
    /// Falls back to polling when the companion never answers the handshake.
    #[default]
    Companion,
    /// Poll `location.pathname`; coarser and later, but needs no injection.
    Polling,
}

/// User preferences persisted under [`PREFERENCES_STORAGE_KEY`]. Every field
/// is optional on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub redirect_home: bool,
    pub show_header: bool,
    #[serde(deserialize_with = "deserialize_tabs")]
    pub tabs: Vec<TabId>,
    pub redirect_targets: Vec<RedirectTarget>,
    pub navigation_source: NavigationSource,
    pub debug: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            redirect_home: true,
            show_header: false,
            tabs: TabId::ALL.to_vec(),
            redirect_targets: RedirectTarget::defaults(),
            navigation_source: NavigationSource::Companion,
            debug: false,
        }
    }
}

impl Preferences {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|error| ConfigError::InvalidPreferences(error.to_string()))
    }

    /// Render order of the tab bar. Duplicates are dropped and an empty list
    /// falls back to every declared tab.
    #[must_use]
    pub fn enabled_tabs(&self) -> Vec<TabId> {
        let mut tabs = Vec::with_capacity(self.tabs.len());
        for tab in &self.tabs {
            if !tabs.contains(tab) {
                tabs.push(*tab);
            }
        }
        if tabs.is_empty() {
            TabId::ALL.to_vec()
        } else {
            tabs
        }
    }
}

// Unknown tab names from older or newer builds are skipped instead of
// failing the whole preference blob.
fn deserialize_tabs<'de, D>(deserializer: D) -> Result<Vec<TabId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    Ok(raw.iter().filter_map(|name| name.parse().ok()).collect())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub navigation_debounce: Duration,
    pub identity_retry_limit: u32,
    pub identity_retry_delay: Duration,
    pub badge_refresh_interval: Duration,
    pub path_poll_interval: Duration,
    pub companion_handshake_timeout: Duration,
    pub tab_bar_height_px: u32,
    pub username_storage_key: String,
    pub preferences: Preferences,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            navigation_debounce: NAVIGATION_DEBOUNCE,
            identity_retry_limit: IDENTITY_RETRY_LIMIT,
            identity_retry_delay: IDENTITY_RETRY_DELAY,
            badge_refresh_interval: BADGE_REFRESH_INTERVAL,
            path_poll_interval: PATH_POLL_INTERVAL,
            companion_handshake_timeout: COMPANION_HANDSHAKE_TIMEOUT,
            tab_bar_height_px: TAB_BAR_HEIGHT_PX,
            username_storage_key: USERNAME_STORAGE_KEY.to_string(),
            preferences: Preferences::default(),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn with_preferences(preferences: Preferences) -> Self {
        Self {
            preferences,
            ..Self::default()
        }
    }
}

/// Reads stored preferences. Missing, unreadable or malformed values all
/// fall back to defaults.
pub async fn load_preferences<S>(store: &S) -> Preferences
where
    S: KeyValueStore + ?Sized,
{
    let raw = match store.get(PREFERENCES_STORAGE_KEY).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return Preferences::default(),
        Err(error) => {
            tracing::warn!(reason = %error, "failed to read stored preferences");
            return Preferences::default();
        }
    };
    Preferences::from_json(&raw).unwrap_or_else(|error| {
        tracing::warn!(reason = %error, "ignoring stored preferences");
        Preferences::default()
    })
}
