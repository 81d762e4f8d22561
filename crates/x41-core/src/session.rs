use serde::{Deserialize, Serialize};

use crate::route::{RouteClass, normalize_path};
use crate::tabs::TabId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageMode {
    #[default]
    Normal,
    Modal,
}

/// Page-lifetime state owned by the lifecycle controller.
///
/// Only two writers exist: the navigation handler ([`SessionState::record_navigation`])
/// and the identity success path ([`SessionState::adopt_username`]). Everything
/// else reads through the accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    username: Option<String>,
    current_path: String,
    active_tab: Option<TabId>,
    last_root_path: Option<String>,
    page_mode: PageMode,
    initialized: bool,
    destroyed: bool,
    awaiting_profile_rewrite: bool,
}

impl SessionState {
    #[must_use]
    pub fn new(initial_path: &str) -> Self {
        Self {
            username: None,
            current_path: normalize_path(initial_path),
            active_tab: None,
            last_root_path: None,
            page_mode: PageMode::Normal,
            initialized: false,
            destroyed: false,
            awaiting_profile_rewrite: false,
        }
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    #[must_use]
    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    #[must_use]
    pub fn active_tab(&self) -> Option<TabId> {
        self.active_tab
    }

    #[must_use]
    pub fn last_root_path(&self) -> Option<&str> {
        self.last_root_path.as_deref()
    }

    #[must_use]
    pub fn page_mode(&self) -> PageMode {
        self.page_mode
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// True after the engine sent the user to the profile placeholder and is
    /// waiting for the host to rewrite the path to `/<handle>`.
    #[must_use]
    pub fn awaiting_profile_rewrite(&self) -> bool {
        self.awaiting_profile_rewrite
    }

    pub(crate) fn record_navigation(&mut self, path: &str, class: &RouteClass) {
        self.current_path = path.to_string();
        self.page_mode = class.mode;
        self.active_tab = class.tab;
        if let Some(tab) = class.tab {
            let definition = tab.definition();
            if definition.is_root(path, self.username.as_deref()) {
                self.last_root_path = Some(path.to_string());
            }
        }
    }

    /// Handles never change within a page load, so the first accepted value wins.
    pub(crate) fn adopt_username(&mut self, username: &str) -> bool {
        if self.username.is_some() {
            return false;
        }
        self.username = Some(username.to_string());
        self.awaiting_profile_rewrite = false;
        true
    }

    pub(crate) fn expect_profile_rewrite(&mut self) {
        if self.username.is_none() {
            self.awaiting_profile_rewrite = true;
        }
    }

    pub(crate) fn mark_initialized(&mut self) {
        self.initialized = true;
    }

    pub(crate) fn mark_destroyed(&mut self) {
        self.destroyed = true;
    }

    #[cfg(test)]
    pub(crate) fn with_last_root(mut self, path: &str) -> Self {
        self.last_root_path = Some(path.to_string());
        self
    }

    #[cfg(test)]
    pub(crate) fn with_username(mut self, username: &str) -> Self {
        self.username = Some(username.to_string());
        self
    }
}
