//! The injected tab bar.
//!
//! The presenter keeps handles to every node it created and remembers what it
//! last wrote, so [`TabBarPresenter::update`] touches the page only for values
//! that actually changed. Before any write it checks that the container is
//! still attached; the host may have thrown the whole subtree away.

use crate::badge::BadgeState;
use crate::error::HostError;
use crate::host::Dom;
use crate::icons;
use crate::session::SessionState;
use crate::tabs::TabId;
use crate::theme::Palette;

pub const TAB_BAR_ID: &str = "x41-tab-bar";
pub const TAB_CLASS: &str = "x41-tab";
pub const ICON_CLASS: &str = "x41-icon";
pub const BADGE_CLASS: &str = "x41-badge";
pub const TAB_ID_ATTRIBUTE: &str = "data-tab-id";

const HOVER_PROPERTY: &str = "--x41-hover-color";
const BADGE_TAB: TabId = TabId::Notifications;
const FONT_STACK: &str =
    r#"-apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Helvetica, Arial, sans-serif"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
    /// Identity is not known yet; nothing was built.
    Deferred,
    Built,
    /// The previous fragment was detached by the host and has been replaced.
    Rebuilt,
    /// Already attached; only changed values were written.
    Refreshed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TabView {
    active: bool,
    href: String,
    colour: String,
}

#[derive(Debug)]
struct MountedTab<N> {
    id: TabId,
    anchor: N,
    icon: N,
    view: TabView,
}

#[derive(Debug)]
struct Fragment<N> {
    container: N,
    tabs: Vec<MountedTab<N>>,
    badge: Option<N>,
    badge_state: BadgeState,
    palette: Palette,
}

pub struct TabBarPresenter<D: Dom> {
    dom: D,
    tabs: Vec<TabId>,
    height_px: u32,
    fragment: Option<Fragment<D::Node>>,
    builds: u32,
}

impl<D: Dom> TabBarPresenter<D> {
    #[must_use]
    pub fn new(dom: D, tabs: Vec<TabId>, height_px: u32) -> Self {
        Self {
            dom,
            tabs,
            height_px,
            fragment: None,
            builds: 0,
        }
    }

    pub fn dom(&self) -> &D {
        &self.dom
    }

    #[must_use]
    pub fn tabs(&self) -> &[TabId] {
        &self.tabs
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.fragment
            .as_ref()
            .is_some_and(|fragment| self.dom.is_connected(&fragment.container))
    }

    /// Number of times the fragment has been constructed.
    #[must_use]
    pub fn build_count(&self) -> u32 {
        self.builds
    }

    pub fn ensure_mounted(
        &mut self,
        session: &SessionState,
        badge: BadgeState,
        palette: &Palette,
    ) -> Result<MountOutcome, HostError> {
        if session.username().is_none() {
            return Ok(MountOutcome::Deferred);
        }
        if self.is_mounted() {
            self.update(session, badge, palette)?;
            return Ok(MountOutcome::Refreshed);
        }

        let outcome = match self.fragment.take() {
            Some(stale) => {
                self.dom.remove(&stale.container);
                tracing::debug!("tab bar was detached by the host, rebuilding");
                MountOutcome::Rebuilt
            }
            None => MountOutcome::Built,
        };
        // Only one fragment may ever be attached.
        self.dom.remove_by_id(TAB_BAR_ID);
        let fragment = self.build(session, badge, palette)?;
        self.fragment = Some(fragment);
        self.builds += 1;
        Ok(outcome)
    }

    /// The single write path for visual state. A detached or missing
    /// fragment is left alone; the next [`Self::ensure_mounted`] rebuilds it.
    pub fn update(
        &mut self,
        session: &SessionState,
        badge: BadgeState,
        palette: &Palette,
    ) -> Result<(), HostError> {
        let Some(fragment) = self.fragment.as_mut() else {
            return Ok(());
        };
        if !self.dom.is_connected(&fragment.container) {
            return Ok(());
        }
        let dom = &self.dom;

        if fragment.palette.background != palette.background {
            dom.set_style(&fragment.container, "background-color", &palette.background)?;
        }
        if fragment.palette.border != palette.border {
            dom.set_style(&fragment.container, "border-top-color", &palette.border)?;
        }

        for tab in &mut fragment.tabs {
            let view = tab_view(tab.id, session, palette);
            if view.active != tab.view.active {
                dom.set_attribute(&tab.anchor, "aria-current", aria_current(view.active))?;
                dom.set_markup(&tab.icon, icons::markup(tab.id.definition().icon, view.active))?;
            }
            if view.href != tab.view.href {
                dom.set_attribute(&tab.anchor, "href", &view.href)?;
            }
            if view.colour != tab.view.colour {
                dom.set_style(&tab.icon, "color", &view.colour)?;
            }
            if fragment.palette.hover != palette.hover {
                dom.set_style(&tab.anchor, HOVER_PROPERTY, &palette.hover)?;
            }
            tab.view = view;
        }
        fragment.palette = palette.clone();

        if fragment.badge_state != badge {
            let anchor = fragment
                .tabs
                .iter()
                .find(|tab| tab.id == BADGE_TAB)
                .map(|tab| tab.anchor.clone());
            if let Some(anchor) = anchor {
                fragment.badge = render_badge(dom, &anchor, fragment.badge.take(), badge)?;
            }
            fragment.badge_state = badge;
        }
        Ok(())
    }

    pub fn unmount(&mut self) {
        if let Some(fragment) = self.fragment.take() {
            self.dom.remove(&fragment.container);
        }
        self.dom.remove_by_id(TAB_BAR_ID);
    }

    fn build(
        &self,
        session: &SessionState,
        badge: BadgeState,
        palette: &Palette,
    ) -> Result<Fragment<D::Node>, HostError> {
        let dom = &self.dom;
        let container = dom.create_element("div")?;
        dom.set_attribute(&container, "id", TAB_BAR_ID)?;
        dom.set_attribute(&container, "role", "navigation")?;
        dom.set_attribute(&container, "aria-label", "X41 navigation")?;
        let height = format!("calc({}px + env(safe-area-inset-bottom, 0px))", self.height_px);
        let border = format!("0.5px solid {}", palette.border);
        for (property, value) in [
            ("position", "fixed"),
            ("bottom", "0"),
            ("left", "0"),
            ("right", "0"),
            ("width", "100%"),
            ("height", height.as_str()),
            ("padding-bottom", "env(safe-area-inset-bottom, 0px)"),
            ("background-color", palette.background.as_str()),
            ("border-top", border.as_str()),
            ("display", "flex"),
            ("justify-content", "space-around"),
            ("align-items", "flex-start"),
            ("z-index", "10000"),
            ("font-family", FONT_STACK),
            ("backdrop-filter", "blur(20px)"),
            ("-webkit-backdrop-filter", "blur(20px)"),
            ("box-sizing", "border-box"),
        ] {
            dom.set_style(&container, property, value)?;
        }

        let tab_height = format!("{}px", self.height_px);
        let mut tabs = Vec::with_capacity(self.tabs.len());
        let mut badge_node = None;
        for id in &self.tabs {
            let view = tab_view(*id, session, palette);
            let anchor = dom.create_element("a")?;
            dom.set_attribute(&anchor, "href", &view.href)?;
            dom.set_attribute(&anchor, "class", TAB_CLASS)?;
            dom.set_attribute(&anchor, "aria-label", id.label())?;
            dom.set_attribute(&anchor, "aria-current", aria_current(view.active))?;
            dom.set_attribute(&anchor, TAB_ID_ATTRIBUTE, id.as_str())?;
            for (property, value) in [
                ("display", "flex"),
                ("flex-direction", "column"),
                ("align-items", "center"),
                ("justify-content", "center"),
                ("flex", "1"),
                ("text-decoration", "none"),
                ("padding-top", "8px"),
                ("position", "relative"),
                ("cursor", "pointer"),
                ("-webkit-tap-highlight-color", "transparent"),
                ("height", tab_height.as_str()),
                (HOVER_PROPERTY, palette.hover.as_str()),
            ] {
                dom.set_style(&anchor, property, value)?;
            }

            let icon = dom.create_element("div")?;
            dom.set_attribute(&icon, "class", ICON_CLASS)?;
            for (property, value) in [
                ("display", "flex"),
                ("align-items", "center"),
                ("justify-content", "center"),
                ("width", "42px"),
                ("height", "42px"),
                ("color", view.colour.as_str()),
                ("transition", "background-color 0.15s ease"),
            ] {
                dom.set_style(&icon, property, value)?;
            }
            dom.set_markup(&icon, icons::markup(id.definition().icon, view.active))?;
            dom.append_child(&anchor, &icon)?;

            if *id == BADGE_TAB {
                badge_node = render_badge(dom, &anchor, None, badge)?;
            }
            dom.append_child(&container, &anchor)?;
            tabs.push(MountedTab {
                id: *id,
                anchor,
                icon,
                view,
            });
        }

        // Attach last so the host never observes a half-built fragment.
        dom.append_to_body(&container)?;
        tracing::debug!(tabs = tabs.len(), "tab bar mounted");
        Ok(Fragment {
            container,
            tabs,
            badge: badge_node,
            badge_state: badge,
            palette: palette.clone(),
        })
    }
}

fn tab_view(id: TabId, session: &SessionState, palette: &Palette) -> TabView {
    let active = session.username().is_some() && session.active_tab() == Some(id);
    TabView {
        active,
        href: href_for(id, session),
        colour: if active {
            palette.active.clone()
        } else {
            palette.inactive.clone()
        },
    }
}

/// Where a tab points: its root resolved against the known username.
#[must_use]
pub fn href_for(tab: TabId, session: &SessionState) -> String {
    (tab.definition().root_path)(session.username())
}

fn aria_current(active: bool) -> &'static str {
    if active { "page" } else { "false" }
}

fn render_badge<D: Dom>(
    dom: &D,
    anchor: &D::Node,
    existing: Option<D::Node>,
    state: BadgeState,
) -> Result<Option<D::Node>, HostError> {
    let Some(label) = state.label() else {
        if let Some(node) = existing {
            dom.remove(&node);
        }
        return Ok(None);
    };
    let node = match existing {
        Some(node) => node,
        None => {
            let node = dom.create_element("div")?;
            dom.set_attribute(&node, "class", BADGE_CLASS)?;
            for (property, value) in [
                ("position", "absolute"),
                ("top", "6px"),
                ("right", "calc(50% - 20px)"),
                ("border-radius", "9px"),
                ("background-color", "rgb(29, 155, 240)"),
                ("color", "white"),
                ("font-size", "11px"),
                ("font-weight", "700"),
                ("display", "flex"),
                ("align-items", "center"),
                ("justify-content", "center"),
                ("box-sizing", "border-box"),
            ] {
                dom.set_style(&node, property, value)?;
            }
            dom.append_child(anchor, &node)?;
            node
        }
    };
    let (size, padding, kind) = if state == BadgeState::Dot {
        ("10px", "0", "dot")
    } else {
        ("18px", "0 5px", "count")
    };
    dom.set_attribute(&node, "data-kind", kind)?;
    dom.set_style(&node, "min-width", size)?;
    dom.set_style(&node, "height", size)?;
    dom.set_style(&node, "padding", padding)?;
    dom.set_text(&node, &label)?;
    Ok(Some(node))
}
