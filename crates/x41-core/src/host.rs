//! Seams between the engine and the page it runs in.
//!
//! The host page may mutate, remove or replace anything the engine does not
//! own at any time, so every read here is best-effort and every write is
//! allowed to fail.

use async_trait::async_trait;
use web_time::Duration;

use crate::config::NavigationSource;
use crate::error::{HostError, StorageError};

/// Read-only view of the host page.
pub trait PageProbe {
    fn current_path(&self) -> String;

    /// Text of every inline (non-`src`) script element.
    fn inline_scripts(&self) -> Vec<String>;

    /// `href` attributes of every element matching `selector`, in document order.
    fn hrefs(&self, selector: &str) -> Vec<String>;

    /// Text content of the first match, or its `aria-label` when the text is empty.
    fn text_or_label(&self, selector: &str) -> Option<String>;

    /// Computed CSS `property` of the first element matching `selector`.
    fn computed_style(&self, selector: &str, property: &str) -> Option<String>;

    /// The platform "prefers dark colour scheme" signal.
    fn prefers_dark(&self) -> bool;
}

/// The narrow write surface the engine is allowed to use.
pub trait Dom {
    type Node: Clone;

    fn create_element(&self, tag: &str) -> Result<Self::Node, HostError>;
    fn set_attribute(&self, node: &Self::Node, name: &str, value: &str) -> Result<(), HostError>;
    fn set_style(&self, node: &Self::Node, property: &str, value: &str) -> Result<(), HostError>;
    fn set_text(&self, node: &Self::Node, text: &str) -> Result<(), HostError>;
    /// Replaces the node's children with trusted, engine-owned markup.
    fn set_markup(&self, node: &Self::Node, markup: &str) -> Result<(), HostError>;
    fn append_child(&self, parent: &Self::Node, child: &Self::Node) -> Result<(), HostError>;
    fn append_to_body(&self, node: &Self::Node) -> Result<(), HostError>;
    fn remove(&self, node: &Self::Node);
    fn is_connected(&self, node: &Self::Node) -> bool;

    /// Installs a singleton style element, replacing any element with the same id.
    fn install_style(&self, id: &str, css: &str) -> Result<(), HostError>;
    fn has_element(&self, id: &str) -> bool;
    fn remove_by_id(&self, id: &str);
    fn set_body_class(&self, class: &str, enabled: bool) -> Result<(), HostError>;
}

/// External key-value storage. Callers treat any error as "not cached".
#[async_trait(?Send)]
pub trait KeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

#[async_trait(?Send)]
pub trait Sleeper {
    async fn sleep(&self, duration: Duration);
}

/// Listener and timer installation, owned by the embedding layer. The
/// lifecycle controller only decides when each group goes in or comes out.
pub trait PageHooks {
    /// For [`NavigationSource::Companion`] this also starts the handshake
    /// and its deadline; the embedding layer reports the outcome back to the
    /// controller.
    fn install_navigation_hooks(&mut self, source: NavigationSource) -> Result<(), HostError>;
    /// Starts `location.pathname` polling. Used directly for
    /// [`NavigationSource::Polling`] and as the companion fallback.
    fn start_path_polling(&mut self) -> Result<(), HostError>;
    fn install_theme_hooks(&mut self) -> Result<(), HostError>;
    fn start_badge_watch(&mut self, interval: Duration) -> Result<(), HostError>;
    /// Reverses every install above. Must be safe to call repeatedly.
    fn uninstall_all(&mut self);
}
