use std::str::FromStr;

use x41_core::TabId;

/// The parts of a pointer event that decide whether a tab click is ours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ClickGesture {
    pub(crate) button: i16,
    pub(crate) meta: bool,
    pub(crate) ctrl: bool,
    pub(crate) shift: bool,
    pub(crate) alt: bool,
    pub(crate) default_prevented: bool,
}

impl ClickGesture {
    /// Modified or non-primary clicks keep the browser's own behavior
    /// (new tab, new window, context menu).
    pub(crate) fn is_plain_primary(self) -> bool {
        !self.default_prevented
            && self.button == 0
            && !self.meta
            && !self.ctrl
            && !self.shift
            && !self.alt
    }
}

/// Tab to route to for a click on an element carrying `tab_attribute`.
pub(crate) fn tab_for_click(gesture: ClickGesture, tab_attribute: Option<&str>) -> Option<TabId> {
    if !gesture.is_plain_primary() {
        return None;
    }
    TabId::from_str(tab_attribute?.trim()).ok()
}
