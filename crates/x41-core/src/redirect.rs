use serde::{Deserialize, Serialize};

use crate::bridge::validate_path;
use crate::route::{classify, is_disallowed_default, normalize_path};
use crate::session::SessionState;
use crate::tabs::TabId;

/// Always distinct from every disallowed default and always a valid path,
/// so it terminates the candidate list.
pub const FINAL_FALLBACK_PATH: &str = "/explore";

/// One entry in the ordered list of redirect destinations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RedirectTarget {
    /// The last tab root visited during this page load.
    LastRoot,
    /// A tab's root path, resolved against the known username.
    Tab(TabId),
    Path(String),
}

impl RedirectTarget {
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::LastRoot,
            Self::Tab(TabId::Profile),
            Self::Tab(TabId::Notifications),
        ]
    }

    fn resolve(&self, session: &SessionState) -> Option<String> {
        match self {
            Self::LastRoot => session.last_root_path().map(ToString::to_string),
            Self::Tab(tab) => Some((tab.definition().root_path)(session.username())),
            Self::Path(path) => Some(path.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectGuard {
    enabled: bool,
    targets: Vec<RedirectTarget>,
}

impl RedirectGuard {
    #[must_use]
    pub fn new(enabled: bool, targets: Vec<RedirectTarget>) -> Self {
        Self { enabled, targets }
    }

    /// Returns where to send the user when `path` is a disallowed default.
    ///
    /// The result is never case-insensitively equal to `path` and is never
    /// itself a disallowed default, so following it cannot loop.
    #[must_use]
    pub fn decide(&self, path: &str, session: &SessionState) -> Option<String> {
        if !self.enabled || !classify(path, session.username()).is_disallowed_default {
            return None;
        }
        let trigger = normalize_path(path);
        let target = self
            .targets
            .iter()
            .filter_map(|target| target.resolve(session))
            .find(|candidate| is_acceptable(candidate, &trigger))
            .unwrap_or_else(|| FINAL_FALLBACK_PATH.to_string());
        tracing::debug!(from = %trigger, to = %target, "redirecting away from default route");
        Some(target)
    }
}

impl Default for RedirectGuard {
    fn default() -> Self {
        Self::new(true, RedirectTarget::defaults())
    }
}

fn is_acceptable(candidate: &str, trigger: &str) -> bool {
    validate_path(candidate).is_ok()
        && !is_disallowed_default(candidate)
        && !candidate.eq_ignore_ascii_case(trigger)
}
