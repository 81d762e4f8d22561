use crate::error::HostError;
use crate::host::Dom;
use crate::presenter::{ICON_CLASS, TAB_BAR_ID, TAB_CLASS};
use crate::session::PageMode;

pub const STYLE_ELEMENT_ID: &str = "x41-styles";
/// Mirrors modal mode on `<body>`.
pub const MODAL_BODY_CLASS: &str = "x41-modal";

const ICON_SIZE_PX: u32 = 24;
const NATIVE_TAB_BAR_SELECTOR: &str = r#"[data-testid="BottomBar"], nav[aria-label="Bottom navigation"]"#;
const PRIMARY_COLUMN_SELECTOR: &str = r#"[data-testid="primaryColumn"], main[role="main"] > div"#;
const HEADER_SELECTOR: &str = r#"[data-testid="TopNavBar"], header[role="banner"] > div > div, header[role="banner"]"#;
const COMPOSE_BUTTON_SELECTOR: &str = r#"a[href="/compose/post"], a[data-testid="SideNav_NewTweet_Button"], button[data-testid="SideNav_NewTweet_Button"]"#;

#[must_use]
pub fn render_css(mode: PageMode, show_header: bool, tab_bar_height_px: u32) -> String {
    let padding = tab_bar_height_px + 10;
    let lift = tab_bar_height_px + 16;
    let mut css = format!(
        "{NATIVE_TAB_BAR_SELECTOR} {{ display: none !important; }}\n\
         {PRIMARY_COLUMN_SELECTOR} {{ padding-bottom: calc({padding}px + env(safe-area-inset-bottom, 0px)) !important; }}\n\
         {COMPOSE_BUTTON_SELECTOR} {{ bottom: calc({lift}px + env(safe-area-inset-bottom, 0px)) !important; }}\n\
         #{TAB_BAR_ID} {{ opacity: 1; transition: opacity 0.2s ease; }}\n\
         .{ICON_CLASS} svg {{ width: {ICON_SIZE_PX}px; height: {ICON_SIZE_PX}px; fill: currentColor; }}\n\
         .{TAB_CLASS}:active {{ opacity: 0.7; }}\n\
         @media (hover: hover) {{ .{TAB_CLASS}:hover .{ICON_CLASS} {{ background-color: var(--x41-hover-color, rgba(0, 0, 0, 0.1)); border-radius: 50%; }} }}\n"
    );
    let header = match mode {
        PageMode::Modal => Some(
            "visibility: visible !important; height: auto !important; min-height: auto !important; \
             max-height: none !important; overflow: visible !important; pointer-events: auto !important;",
        ),
        PageMode::Normal if !show_header => Some(
            "visibility: hidden !important; height: 0 !important; min-height: 0 !important; \
             max-height: 0 !important; overflow: hidden !important; pointer-events: none !important;",
        ),
        PageMode::Normal => None,
    };
    if let Some(rules) = header {
        css.push_str(&format!("{HEADER_SELECTOR} {{ {rules} }}\n"));
    }
    css
}

/// Owns the singleton style element. Reinstalls only when the page mode
/// changed or the host dropped the element. The modal body class is tracked
/// apart from the element since `<body>` may not exist yet at script entry.
#[derive(Debug, Clone)]
pub struct StyleInjector {
    show_header: bool,
    tab_bar_height_px: u32,
    installed_mode: Option<PageMode>,
    body_modal: Option<bool>,
}

impl StyleInjector {
    #[must_use]
    pub fn new(show_header: bool, tab_bar_height_px: u32) -> Self {
        Self {
            show_header,
            tab_bar_height_px,
            installed_mode: None,
            body_modal: None,
        }
    }

    /// Writes only the style element. Safe before `<body>` exists.
    pub fn preload<D: Dom>(&mut self, dom: &D, mode: PageMode) -> Result<bool, HostError> {
        if self.installed_mode == Some(mode) && dom.has_element(STYLE_ELEMENT_ID) {
            return Ok(false);
        }
        dom.install_style(
            STYLE_ELEMENT_ID,
            &render_css(mode, self.show_header, self.tab_bar_height_px),
        )?;
        self.installed_mode = Some(mode);
        Ok(true)
    }

    /// Element plus body class. Returns whether the element was (re)written.
    pub fn apply<D: Dom>(&mut self, dom: &D, mode: PageMode) -> Result<bool, HostError> {
        let written = self.preload(dom, mode)?;
        let modal = mode == PageMode::Modal;
        if written || self.body_modal != Some(modal) {
            dom.set_body_class(MODAL_BODY_CLASS, modal)?;
            self.body_modal = Some(modal);
        }
        Ok(written)
    }

    pub fn remove<D: Dom>(&mut self, dom: &D) {
        dom.remove_by_id(STYLE_ELEMENT_ID);
        if let Err(error) = dom.set_body_class(MODAL_BODY_CLASS, false) {
            tracing::debug!(reason = %error, "failed to clear modal body class");
        }
        self.installed_mode = None;
        self.body_modal = None;
    }
}
