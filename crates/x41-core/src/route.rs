//! Pure path classification. Called on every navigation tick, so nothing in
//! here touches the page or any state.

use serde::Serialize;

use crate::session::PageMode;
use crate::tabs::{TAB_DEFINITIONS, TabId};

pub const ROOT_PATH: &str = "/";
pub const HOME_PATH: &str = "/home";

/// First path segments that are host routes, never user handles.
pub const RESERVED_SEGMENTS: &[&str] = &[
    "account",
    "compose",
    "explore",
    "hashtag",
    "home",
    "i",
    "intent",
    "jobs",
    "login",
    "logout",
    "messages",
    "notifications",
    "privacy",
    "search",
    "settings",
    "share",
    "signup",
    "tos",
];

const MAX_HANDLE_LEN: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RouteClass {
    pub tab: Option<TabId>,
    pub mode: PageMode,
    pub is_disallowed_default: bool,
}

#[must_use]
pub fn classify(path: &str, known_username: Option<&str>) -> RouteClass {
    let path = normalize_path(path);
    RouteClass {
        tab: tab_for_path(&path, known_username),
        mode: if is_modal_path(&path) {
            PageMode::Modal
        } else {
            PageMode::Normal
        },
        is_disallowed_default: is_disallowed_default(&path),
    }
}

/// Exact roots win over sub-page matches, so a root on one tab can never be
/// claimed by another tab's namespace.
fn tab_for_path(path: &str, username: Option<&str>) -> Option<TabId> {
    TAB_DEFINITIONS
        .iter()
        .find(|definition| definition.is_root(path, username))
        .or_else(|| {
            TAB_DEFINITIONS
                .iter()
                .find(|definition| definition.owns(path, username))
        })
        .map(|definition| definition.id)
}

#[must_use]
pub fn is_disallowed_default(path: &str) -> bool {
    let path = normalize_path(path);
    path == ROOT_PATH || path.eq_ignore_ascii_case(HOME_PATH)
}

/// Compose surfaces, tweet intents and direct-message composition.
#[must_use]
pub fn is_modal_path(path: &str) -> bool {
    let segments: Vec<&str> = segments(path).collect();
    if segments.iter().any(|segment| *segment == "compose") {
        return true;
    }
    matches!(segments.as_slice(), ["intent", "tweet" | "post", ..])
}

pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// Strips query and fragment, guarantees a leading slash and drops trailing
/// slashes. An empty input becomes `/`.
#[must_use]
pub fn normalize_path(raw: &str) -> String {
    let before_query = raw.split(['?', '#']).next().unwrap_or_default();
    let trimmed = before_query
        .trim_start()
        .trim_end_matches(|ch: char| ch == '/' || ch.is_whitespace());
    if trimmed.is_empty() {
        return ROOT_PATH.to_string();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

#[must_use]
pub fn is_valid_handle(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate.len() <= MAX_HANDLE_LEN
        && candidate
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// Reads a handle from a single-segment path such as `/jack`.
#[must_use]
pub fn handle_from_path(path: &str) -> Option<String> {
    let normalized = normalize_path(path);
    let mut parts = segments(&normalized);
    let first = parts.next()?;
    if parts.next().is_some() || !is_valid_handle(first) {
        return None;
    }
    let lowered = first.to_ascii_lowercase();
    if RESERVED_SEGMENTS.contains(&lowered.as_str()) {
        return None;
    }
    Some(first.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tabs::{ANALYTICS_ROOT_PATH, PROFILE_PLACEHOLDER_PATH};
    use quickcheck::quickcheck;

    #[test]
    fn root_and_home_are_disallowed_defaults() {
        assert!(classify("/", None).is_disallowed_default);
        assert!(classify("/home", None).is_disallowed_default);
        assert!(classify("/home/", Some("jack")).is_disallowed_default);
        assert!(classify("/Home?ref=logo", None).is_disallowed_default);
        assert!(!classify("/homepage", None).is_disallowed_default);
        assert!(!classify("/explore", None).is_disallowed_default);
    }

    #[test]
    fn compose_intent_and_message_composition_are_modal() {
        assert_eq!(classify("/compose/post", None).mode, PageMode::Modal);
        assert_eq!(classify("/intent/tweet", None).mode, PageMode::Modal);
        assert_eq!(classify("/intent/post?text=hi", None).mode, PageMode::Modal);
        assert_eq!(classify("/messages/compose", None).mode, PageMode::Modal);
        assert_eq!(classify("/messages", None).mode, PageMode::Normal);
        assert_eq!(classify("/intent/follow", None).mode, PageMode::Normal);
    }

    #[test]
    fn tab_resolution_prefers_exact_roots_then_allow_list() {
        assert_eq!(classify("/jack", Some("jack")).tab, Some(TabId::Profile));
        assert_eq!(classify("/jack/likes", Some("jack")).tab, Some(TabId::Profile));
        assert_eq!(classify("/jack/status/1", Some("jack")).tab, None);
        assert_eq!(
            classify("/notifications/verified", Some("jack")).tab,
            Some(TabId::Notifications)
        );
        assert_eq!(
            classify(&format!("{ANALYTICS_ROOT_PATH}/overview"), None).tab,
            Some(TabId::Analytics)
        );
        assert_eq!(classify("/explore", Some("jack")).tab, None);
    }

    #[test]
    fn unknown_username_maps_profile_to_placeholder() {
        assert_eq!(classify(PROFILE_PLACEHOLDER_PATH, None).tab, Some(TabId::Profile));
        assert_eq!(classify("/jack", None).tab, None);
    }

    #[test]
    fn handle_from_path_skips_reserved_and_nested_paths() {
        assert_eq!(handle_from_path("/jack_01"), Some("jack_01".to_string()));
        assert_eq!(handle_from_path("/jack/"), Some("jack".to_string()));
        assert_eq!(handle_from_path("/home"), None);
        assert_eq!(handle_from_path("/Explore"), None);
        assert_eq!(handle_from_path("/jack/media"), None);
        assert_eq!(handle_from_path("/not-a-handle"), None);
        assert_eq!(handle_from_path("/"), None);
    }

    #[test]
    fn normalize_path_handles_edge_inputs() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("///"), "/");
        assert_eq!(normalize_path("notifications"), "/notifications");
        assert_eq!(normalize_path("/a/b/?x=1#frag"), "/a/b");
    }

    quickcheck! {
        fn classify_is_pure(path: String, username: Option<String>) -> bool {
            let first = classify(&path, username.as_deref());
            let second = classify(&path, username.as_deref());
            first == second
        }

        fn normalized_paths_are_fixed_points(path: String) -> bool {
            let once = normalize_path(&path);
            normalize_path(&once) == once
        }
    }
}
