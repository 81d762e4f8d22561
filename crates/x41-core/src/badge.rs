use serde::Serialize;

use crate::host::PageProbe;

/// Counts above this render as `99+`.
pub const BADGE_DISPLAY_CAP: u32 = 99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(tag = "kind", content = "count", rename_all = "snake_case")]
pub enum BadgeState {
    #[default]
    None,
    /// Unread items exist but the host did not say how many.
    Dot,
    Count(u32),
}

impl BadgeState {
    /// `None` means "unread, magnitude unknown"; zero means nothing unread.
    #[must_use]
    pub fn from_count(count: Option<u32>) -> Self {
        match count {
            None => Self::Dot,
            Some(0) => Self::None,
            Some(count) => Self::Count(count),
        }
    }

    /// Text for the badge element, or `None` when no badge should exist.
    #[must_use]
    pub fn label(self) -> Option<String> {
        match self {
            Self::None => None,
            Self::Dot => Some(String::new()),
            Self::Count(count) if count > BADGE_DISPLAY_CAP => Some(format!("{BADGE_DISPLAY_CAP}+")),
            Self::Count(count) => Some(count.to_string()),
        }
    }

    #[must_use]
    pub fn is_visible(self) -> bool {
        self != Self::None
    }
}

/// One way of reading the host's unread indicator. `None` means this probe
/// found nothing and the next one should be tried.
pub trait BadgeProbe {
    fn read(&self, page: &dyn PageProbe) -> Option<BadgeState>;
}

#[derive(Debug, Clone, Copy)]
pub struct SelectorBadgeProbe {
    pub selector: &'static str,
    /// A matching element without digits still means "unread".
    pub presence_implies_unread: bool,
}

impl BadgeProbe for SelectorBadgeProbe {
    fn read(&self, page: &dyn PageProbe) -> Option<BadgeState> {
        let text = page.text_or_label(self.selector)?;
        match parse_count(&text) {
            Some(count) => Some(BadgeState::from_count(Some(count))),
            None if self.presence_implies_unread => Some(BadgeState::Dot),
            None => None,
        }
    }
}

pub const DEFAULT_BADGE_PROBES: [SelectorBadgeProbe; 3] = [
    SelectorBadgeProbe {
        selector: r#"[data-testid="app-bar-notification-badge"]"#,
        presence_implies_unread: true,
    },
    SelectorBadgeProbe {
        selector: r#"a[href="/notifications"] [aria-label]"#,
        presence_implies_unread: false,
    },
    SelectorBadgeProbe {
        selector: r#"nav a[href="/notifications"] span"#,
        presence_implies_unread: false,
    },
];

pub struct BadgeReader {
    probes: Vec<Box<dyn BadgeProbe>>,
}

impl Default for BadgeReader {
    fn default() -> Self {
        Self {
            probes: DEFAULT_BADGE_PROBES
                .iter()
                .map(|probe| Box::new(*probe) as Box<dyn BadgeProbe>)
                .collect(),
        }
    }
}

impl BadgeReader {
    #[must_use]
    pub fn with_probes(probes: Vec<Box<dyn BadgeProbe>>) -> Self {
        Self { probes }
    }

    /// Reads the current state fresh from the page. Nothing is cached here.
    #[must_use]
    pub fn read(&self, page: &dyn PageProbe) -> BadgeState {
        self.probes
            .iter()
            .find_map(|probe| probe.read(page))
            .unwrap_or_default()
    }
}

/// First run of ASCII digits in `text`. Overlong runs saturate.
#[must_use]
pub fn parse_count(text: &str) -> Option<u32> {
    let start = text.find(|ch: char| ch.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    Some(digits.parse().unwrap_or(u32::MAX))
}
