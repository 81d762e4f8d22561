//! Host theme detection and the colours the tab bar paints with.

use serde::Serialize;

use crate::host::PageProbe;

pub const BODY_SELECTOR: &str = "body";
pub const PRIMARY_COLUMN_SELECTOR: &str = r#"[data-testid="primaryColumn"]"#;
pub const CELL_SELECTOR: &str = r#"[data-testid="cellInnerDiv"]"#;
pub const SELECTED_LINK_SELECTOR: &str = r#"a[aria-selected="true"], a[aria-current="page"]"#;

const TRANSPARENT: &str = "rgba(0, 0, 0, 0)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    /// Dark blue.
    Dim,
    /// "Lights out" pure black.
    Dark,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub active: String,
    pub inactive: String,
    pub background: String,
    pub border: String,
    pub hover: String,
}

impl Palette {
    fn from_literals(active: &str, inactive: &str, background: &str, border: &str, hover: &str) -> Self {
        Self {
            active: active.to_string(),
            inactive: inactive.to_string(),
            background: background.to_string(),
            border: border.to_string(),
            hover: hover.to_string(),
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Theme::Light.palette()
    }
}

impl Theme {
    /// Classifies the body background. Falls back to the platform dark-mode
    /// signal when the colour is missing, transparent or unparsable.
    #[must_use]
    pub fn detect(background: Option<&str>, prefers_dark: bool) -> Self {
        let fallback = if prefers_dark { Self::Dark } else { Self::Light };
        let Some(background) = background.filter(|value| !is_transparent(value)) else {
            return fallback;
        };
        let Some((r, g, b)) = parse_rgb(background) else {
            return fallback;
        };
        if r > 250 && g > 250 && b > 250 {
            return Self::Light;
        }
        if r < 30 && (26..40).contains(&g) && (36..50).contains(&b) {
            return Self::Dim;
        }
        if r < 10 && g < 10 && b < 10 {
            return Self::Dark;
        }
        let brightness = (u16::from(r) + u16::from(g) + u16::from(b)) / 3;
        if brightness < 128 { Self::Dark } else { Self::Light }
    }

    #[must_use]
    pub fn palette(self) -> Palette {
        match self {
            Self::Light => Palette::from_literals(
                "rgb(15, 20, 25)",
                "rgb(83, 100, 113)",
                "rgb(255, 255, 255)",
                "rgb(239, 243, 244)",
                "rgba(15, 20, 25, 0.1)",
            ),
            Self::Dim => Palette::from_literals(
                "rgb(247, 249, 249)",
                "rgb(139, 152, 165)",
                "rgb(21, 32, 43)",
                "rgb(56, 68, 77)",
                "rgba(247, 249, 249, 0.1)",
            ),
            Self::Dark => Palette::from_literals(
                "rgb(231, 233, 234)",
                "rgb(113, 118, 123)",
                "rgb(0, 0, 0)",
                "rgb(47, 51, 54)",
                "rgba(231, 233, 234, 0.1)",
            ),
        }
    }
}

/// Reads the first three integer channels of an `rgb()`/`rgba()` value.
#[must_use]
pub fn parse_rgb(value: &str) -> Option<(u8, u8, u8)> {
    let mut channels = value
        .split(|ch: char| !ch.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<u16>().map(|channel| channel.min(255)));
    let r = u8::try_from(channels.next()?.ok()?).ok()?;
    let g = u8::try_from(channels.next()?.ok()?).ok()?;
    let b = u8::try_from(channels.next()?.ok()?).ok()?;
    Some((r, g, b))
}

fn is_transparent(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value == TRANSPARENT || value.eq_ignore_ascii_case("transparent")
}

/// Detects the theme and overlays live colours read from the host's own
/// chrome onto the theme's defaults.
#[must_use]
pub fn extract_palette(page: &dyn PageProbe) -> (Theme, Palette) {
    let background = page.computed_style(BODY_SELECTOR, "background-color");
    let theme = Theme::detect(background.as_deref(), page.prefers_dark());
    let mut palette = theme.palette();

    let live = |selector: &str, property: &str| {
        page.computed_style(selector, property)
            .filter(|value| !is_transparent(value))
    };
    if let Some(value) = live(PRIMARY_COLUMN_SELECTOR, "background-color") {
        palette.background = value;
    }
    if let Some(value) = live(CELL_SELECTOR, "border-bottom-color") {
        palette.border = value;
    }
    if let Some(value) = live(SELECTED_LINK_SELECTOR, "color") {
        palette.active = value;
    }
    (theme, palette)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryPage;

    #[test]
    fn detects_the_three_host_themes() {
        assert_eq!(Theme::detect(Some("rgb(255, 255, 255)"), true), Theme::Light);
        assert_eq!(Theme::detect(Some("rgb(21, 32, 43)"), false), Theme::Dim);
        assert_eq!(Theme::detect(Some("rgb(0, 0, 0)"), false), Theme::Dark);
        assert_eq!(Theme::detect(Some("rgb(60, 60, 70)"), false), Theme::Dark);
        assert_eq!(Theme::detect(Some("rgb(200, 200, 200)"), true), Theme::Light);
    }

    #[test]
    fn missing_background_uses_platform_signal() {
        assert_eq!(Theme::detect(None, true), Theme::Dark);
        assert_eq!(Theme::detect(None, false), Theme::Light);
        assert_eq!(Theme::detect(Some(TRANSPARENT), true), Theme::Dark);
        assert_eq!(Theme::detect(Some("inherit"), false), Theme::Light);
    }

    #[test]
    fn parse_rgb_accepts_rgba_and_clamps() {
        assert_eq!(parse_rgb("rgba(1, 2, 3, 0.5)"), Some((1, 2, 3)));
        assert_eq!(parse_rgb("rgb(300, 0, 0)"), Some((255, 0, 0)));
        assert_eq!(parse_rgb("rgb(1, 2)"), None);
    }

    #[test]
    fn live_colours_override_defaults_unless_transparent() {
        let page = MemoryPage::new("/");
        page.set_computed(BODY_SELECTOR, "background-color", "rgb(21, 32, 43)");
        page.set_computed(PRIMARY_COLUMN_SELECTOR, "background-color", TRANSPARENT);
        page.set_computed(CELL_SELECTOR, "border-bottom-color", "rgb(1, 2, 3)");

        let (theme, palette) = extract_palette(&page);
        assert_eq!(theme, Theme::Dim);
        assert_eq!(palette.background, Theme::Dim.palette().background);
        assert_eq!(palette.border, "rgb(1, 2, 3)");
    }
}
