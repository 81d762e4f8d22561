use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::icons::IconKey;

/// Host endpoint that redirects to the signed-in user's profile. Used as the
/// profile tab's root until the handle is known.
pub const PROFILE_PLACEHOLDER_PATH: &str = "/i/profile";
pub const NOTIFICATIONS_ROOT_PATH: &str = "/notifications";
pub const ANALYTICS_ROOT_PATH: &str = "/i/account_analytics";

/// Profile sub-pages that still count as "on the profile tab".
pub const PROFILE_SUB_PAGES: &[&str] = &["with_replies", "highlights", "articles", "media", "likes"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabId {
    Profile,
    Notifications,
    Analytics,
}

impl TabId {
    pub const ALL: [Self; 3] = [Self::Profile, Self::Notifications, Self::Analytics];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Notifications => "notifications",
            Self::Analytics => "analytics",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Profile => "Profile",
            Self::Notifications => "Notifications",
            Self::Analytics => "Analytics",
        }
    }

    #[must_use]
    pub fn definition(self) -> &'static TabDefinition {
        match self {
            Self::Profile => &TAB_DEFINITIONS[0],
            Self::Notifications => &TAB_DEFINITIONS[1],
            Self::Analytics => &TAB_DEFINITIONS[2],
        }
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TabId {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "profile" => Ok(Self::Profile),
            "notifications" => Ok(Self::Notifications),
            "analytics" => Ok(Self::Analytics),
            other => Err(format!("unknown tab `{other}`")),
        }
    }
}

/// Which paths below a tab's root still belong to the tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubPages {
    /// Only `root/<segment>` for the listed segments.
    AllowList(&'static [&'static str]),
    /// Anything under `root/`; the tab owns the namespace.
    SubTree,
}

#[derive(Debug, Clone, Copy)]
pub struct TabDefinition {
    pub id: TabId,
    pub icon: IconKey,
    pub root_path: fn(Option<&str>) -> String,
    pub sub_pages: SubPages,
}

impl TabDefinition {
    /// True when `path` is this tab's root or one of its accepted sub-pages.
    /// `path` must already be normalized.
    #[must_use]
    pub fn owns(&self, path: &str, username: Option<&str>) -> bool {
        let root = (self.root_path)(username);
        if paths_match(self.id, path, &root) {
            return true;
        }
        let Some(rest) = strip_root(self.id, path, &root) else {
            return false;
        };
        match self.sub_pages {
            SubPages::SubTree => !rest.is_empty(),
            SubPages::AllowList(allowed) => allowed.contains(&rest),
        }
    }

    #[must_use]
    pub fn is_root(&self, path: &str, username: Option<&str>) -> bool {
        paths_match(self.id, path, &(self.root_path)(username))
    }
}

pub static TAB_DEFINITIONS: [TabDefinition; 3] = [
    TabDefinition {
        id: TabId::Profile,
        icon: IconKey::Profile,
        root_path: profile_root,
        sub_pages: SubPages::AllowList(PROFILE_SUB_PAGES),
    },
    TabDefinition {
        id: TabId::Notifications,
        icon: IconKey::Notifications,
        root_path: notifications_root,
        sub_pages: SubPages::SubTree,
    },
    TabDefinition {
        id: TabId::Analytics,
        icon: IconKey::Analytics,
        root_path: analytics_root,
        sub_pages: SubPages::SubTree,
    },
];

fn profile_root(username: Option<&str>) -> String {
    match username {
        Some(handle) if !handle.is_empty() => format!("/{handle}"),
        _ => PROFILE_PLACEHOLDER_PATH.to_string(),
    }
}

fn notifications_root(_: Option<&str>) -> String {
    NOTIFICATIONS_ROOT_PATH.to_string()
}

fn analytics_root(_: Option<&str>) -> String {
    ANALYTICS_ROOT_PATH.to_string()
}

// Handles are case-insensitive on the host, the fixed roots are not.
fn paths_match(id: TabId, path: &str, root: &str) -> bool {
    if id == TabId::Profile {
        path.eq_ignore_ascii_case(root)
    } else {
        path == root
    }
}

fn strip_root<'a>(id: TabId, path: &'a str, root: &str) -> Option<&'a str> {
    let head = path.get(..root.len())?;
    if !paths_match(id, head, root) {
        return None;
    }
    path.get(root.len()..)?.strip_prefix('/')
}
