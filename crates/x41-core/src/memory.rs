//! An in-memory page that implements every host trait.
//!
//! Used by the engine's tests and, behind the `testing` feature, by anything
//! that wants to drive the engine without a browser. Clones share one document, so a test can keep a handle
//! while the controller owns another.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;

use async_trait::async_trait;
use web_time::Duration;

use crate::config::NavigationSource;
use crate::error::{HostError, StorageError};
use crate::host::{Dom, KeyValueStore, PageHooks, PageProbe, Sleeper};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemoryNode(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Parent {
    Head,
    Body,
    Node(MemoryNode),
}

#[derive(Debug, Default)]
struct Element {
    attributes: BTreeMap<String, String>,
    styles: BTreeMap<String, String>,
    text: String,
    markup: Option<String>,
    children: Vec<MemoryNode>,
    parent: Option<Parent>,
}

type Mutation = Box<dyn FnOnce(&MemoryPage)>;

#[derive(Default)]
struct MemoryDocument {
    path: String,
    scripts: Vec<String>,
    links: Vec<(String, String)>,
    texts: HashMap<String, String>,
    computed: HashMap<(String, String), String>,
    prefers_dark: bool,

    elements: Vec<Element>,
    head: Vec<MemoryNode>,
    body: Vec<MemoryNode>,
    body_classes: BTreeSet<String>,

    stored: HashMap<String, String>,
    storage_writes: Vec<(String, String)>,
    storage_failing: bool,

    hook_log: Vec<String>,
    hooks_failing: bool,
    sleeps: u32,
    scheduled: Vec<(u32, Mutation)>,
}

impl MemoryDocument {
    fn element(&self, node: MemoryNode) -> Option<&Element> {
        self.elements.get(node.0)
    }

    fn element_mut(&mut self, node: MemoryNode, operation: &'static str) -> Result<&mut Element, HostError> {
        self.elements.get_mut(node.0).ok_or(HostError::dom(operation))
    }

    fn detach(&mut self, node: MemoryNode) {
        let Some(parent) = self.elements.get_mut(node.0).and_then(|element| element.parent.take()) else {
            return;
        };
        let siblings = match parent {
            Parent::Head => &mut self.head,
            Parent::Body => &mut self.body,
            Parent::Node(parent) => match self.elements.get_mut(parent.0) {
                Some(element) => &mut element.children,
                None => return,
            },
        };
        siblings.retain(|child| *child != node);
    }

    fn attach(&mut self, parent: Parent, child: MemoryNode, operation: &'static str) -> Result<(), HostError> {
        if self.element(child).is_none() {
            return Err(HostError::dom(operation));
        }
        self.detach(child);
        match parent {
            Parent::Head => self.head.push(child),
            Parent::Body => self.body.push(child),
            Parent::Node(parent) => self.element_mut(parent, operation)?.children.push(child),
        }
        self.element_mut(child, operation)?.parent = Some(parent);
        Ok(())
    }

    fn is_connected(&self, node: MemoryNode) -> bool {
        let mut current = node;
        // Parent chains are acyclic; the bound only guards against a corrupt tree.
        for _ in 0..=self.elements.len() {
            match self.element(current).and_then(|element| element.parent) {
                Some(Parent::Head | Parent::Body) => return true,
                Some(Parent::Node(parent)) => current = parent,
                None => return false,
            }
        }
        false
    }

    fn connected_by_id(&self, id: &str) -> Vec<MemoryNode> {
        (0..self.elements.len())
            .map(MemoryNode)
            .filter(|node| {
                self.element(*node)
                    .and_then(|element| element.attributes.get("id"))
                    .is_some_and(|value| value == id)
                    && self.is_connected(*node)
            })
            .collect()
    }
}

#[derive(Clone, Default)]
pub struct MemoryPage {
    document: Rc<RefCell<MemoryDocument>>,
}

impl std::fmt::Debug for MemoryPage {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let document = self.document.borrow();
        formatter
            .debug_struct("MemoryPage")
            .field("path", &document.path)
            .field("elements", &document.elements.len())
            .field("body_children", &document.body.len())
            .finish_non_exhaustive()
    }
}

impl MemoryPage {
    #[must_use]
    pub fn new(path: &str) -> Self {
        let page = Self::default();
        page.set_path(path);
        page
    }

    pub fn set_path(&self, path: &str) {
        self.document.borrow_mut().path = path.to_string();
    }

    pub fn add_script(&self, text: &str) {
        self.document.borrow_mut().scripts.push(text.to_string());
    }

    /// Registers an element with `href` that `selector` will find.
    pub fn add_link(&self, selector: &str, href: &str) {
        self.document
            .borrow_mut()
            .links
            .push((selector.to_string(), href.to_string()));
    }

    pub fn set_text(&self, selector: &str, text: &str) {
        self.document
            .borrow_mut()
            .texts
            .insert(selector.to_string(), text.to_string());
    }

    pub fn clear_text(&self, selector: &str) {
        self.document.borrow_mut().texts.remove(selector);
    }

    pub fn set_computed(&self, selector: &str, property: &str, value: &str) {
        self.document
            .borrow_mut()
            .computed
            .insert((selector.to_string(), property.to_string()), value.to_string());
    }

    pub fn set_prefers_dark(&self, prefers_dark: bool) {
        self.document.borrow_mut().prefers_dark = prefers_dark;
    }

    pub fn set_stored(&self, key: &str, value: &str) {
        self.document
            .borrow_mut()
            .stored
            .insert(key.to_string(), value.to_string());
    }

    #[must_use]
    pub fn stored(&self, key: &str) -> Option<String> {
        self.document.borrow().stored.get(key).cloned()
    }

    /// Every successful write, in order.
    #[must_use]
    pub fn storage_writes(&self) -> Vec<(String, String)> {
        self.document.borrow().storage_writes.clone()
    }

    pub fn fail_storage(&self, failing: bool) {
        self.document.borrow_mut().storage_failing = failing;
    }

    pub fn fail_hooks(&self, failing: bool) {
        self.document.borrow_mut().hooks_failing = failing;
    }

    /// Detaches every body child, the way a host re-render would.
    pub fn purge_body(&self) {
        let mut document = self.document.borrow_mut();
        let body = std::mem::take(&mut document.body);
        for node in body {
            if let Some(element) = document.elements.get_mut(node.0) {
                element.parent = None;
            }
        }
    }

    #[must_use]
    pub fn body_child_count(&self) -> usize {
        self.document.borrow().body.len()
    }

    #[must_use]
    pub fn element_by_id(&self, id: &str) -> Option<MemoryNode> {
        self.document.borrow().connected_by_id(id).into_iter().next()
    }

    #[must_use]
    pub fn count_by_id(&self, id: &str) -> usize {
        self.document.borrow().connected_by_id(id).len()
    }

    #[must_use]
    pub fn attribute(&self, node: MemoryNode, name: &str) -> Option<String> {
        self.document
            .borrow()
            .element(node)
            .and_then(|element| element.attributes.get(name).cloned())
    }

    #[must_use]
    pub fn style(&self, node: MemoryNode, property: &str) -> Option<String> {
        self.document
            .borrow()
            .element(node)
            .and_then(|element| element.styles.get(property).cloned())
    }

    #[must_use]
    pub fn text(&self, node: MemoryNode) -> String {
        self.document
            .borrow()
            .element(node)
            .map(|element| element.text.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn markup(&self, node: MemoryNode) -> Option<String> {
        self.document
            .borrow()
            .element(node)
            .and_then(|element| element.markup.clone())
    }

    #[must_use]
    pub fn children(&self, node: MemoryNode) -> Vec<MemoryNode> {
        self.document
            .borrow()
            .element(node)
            .map(|element| element.children.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn has_body_class(&self, class: &str) -> bool {
        self.document.borrow().body_classes.contains(class)
    }

    /// Text of the connected style element with `id`.
    #[must_use]
    pub fn style_text(&self, id: &str) -> Option<String> {
        let node = self.element_by_id(id)?;
        Some(self.text(node))
    }

    #[must_use]
    pub fn hook_log(&self) -> Vec<String> {
        self.document.borrow().hook_log.clone()
    }

    #[must_use]
    pub fn sleep_count(&self) -> u32 {
        self.document.borrow().sleeps
    }

    /// Runs `mutation` once `sleeps` calls to [`Sleeper::sleep`] have completed.
    pub fn schedule_after_sleeps(&self, sleeps: u32, mutation: impl FnOnce(&MemoryPage) + 'static) {
        self.document
            .borrow_mut()
            .scheduled
            .push((sleeps, Box::new(mutation)));
    }

    fn log_hook(&self, entry: String) -> Result<(), HostError> {
        let mut document = self.document.borrow_mut();
        if document.hooks_failing {
            return Err(HostError::Hook { hook: "memory" });
        }
        document.hook_log.push(entry);
        Ok(())
    }
}

impl PageProbe for MemoryPage {
    fn current_path(&self) -> String {
        self.document.borrow().path.clone()
    }

    fn inline_scripts(&self) -> Vec<String> {
        self.document.borrow().scripts.clone()
    }

    fn hrefs(&self, selector: &str) -> Vec<String> {
        self.document
            .borrow()
            .links
            .iter()
            .filter(|(registered, _)| registered == selector)
            .map(|(_, href)| href.clone())
            .collect()
    }

    fn text_or_label(&self, selector: &str) -> Option<String> {
        self.document.borrow().texts.get(selector).cloned()
    }

    fn computed_style(&self, selector: &str, property: &str) -> Option<String> {
        self.document
            .borrow()
            .computed
            .get(&(selector.to_string(), property.to_string()))
            .cloned()
    }

    fn prefers_dark(&self) -> bool {
        self.document.borrow().prefers_dark
    }
}

impl Dom for MemoryPage {
    type Node = MemoryNode;

    fn create_element(&self, _tag: &str) -> Result<MemoryNode, HostError> {
        let mut document = self.document.borrow_mut();
        document.elements.push(Element::default());
        Ok(MemoryNode(document.elements.len() - 1))
    }

    fn set_attribute(&self, node: &MemoryNode, name: &str, value: &str) -> Result<(), HostError> {
        self.document
            .borrow_mut()
            .element_mut(*node, "set_attribute")?
            .attributes
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn set_style(&self, node: &MemoryNode, property: &str, value: &str) -> Result<(), HostError> {
        self.document
            .borrow_mut()
            .element_mut(*node, "set_style")?
            .styles
            .insert(property.to_string(), value.to_string());
        Ok(())
    }

    fn set_text(&self, node: &MemoryNode, text: &str) -> Result<(), HostError> {
        let mut document = self.document.borrow_mut();
        let element = document.element_mut(*node, "set_text")?;
        element.text = text.to_string();
        element.markup = None;
        Ok(())
    }

    fn set_markup(&self, node: &MemoryNode, markup: &str) -> Result<(), HostError> {
        let mut document = self.document.borrow_mut();
        let element = document.element_mut(*node, "set_markup")?;
        element.markup = Some(markup.to_string());
        element.text.clear();
        Ok(())
    }

    fn append_child(&self, parent: &MemoryNode, child: &MemoryNode) -> Result<(), HostError> {
        self.document
            .borrow_mut()
            .attach(Parent::Node(*parent), *child, "append_child")
    }

    fn append_to_body(&self, node: &MemoryNode) -> Result<(), HostError> {
        self.document
            .borrow_mut()
            .attach(Parent::Body, *node, "append_to_body")
    }

    fn remove(&self, node: &MemoryNode) {
        self.document.borrow_mut().detach(*node);
    }

    fn is_connected(&self, node: &MemoryNode) -> bool {
        self.document.borrow().is_connected(*node)
    }

    fn install_style(&self, id: &str, css: &str) -> Result<(), HostError> {
        self.remove_by_id(id);
        let node = self.create_element("style")?;
        self.set_attribute(&node, "id", id)?;
        Dom::set_text(self, &node, css)?;
        self.document
            .borrow_mut()
            .attach(Parent::Head, node, "install_style")
    }

    fn has_element(&self, id: &str) -> bool {
        !self.document.borrow().connected_by_id(id).is_empty()
    }

    fn remove_by_id(&self, id: &str) {
        let mut document = self.document.borrow_mut();
        for node in document.connected_by_id(id) {
            document.detach(node);
        }
    }

    fn set_body_class(&self, class: &str, enabled: bool) -> Result<(), HostError> {
        let mut document = self.document.borrow_mut();
        if enabled {
            document.body_classes.insert(class.to_string());
        } else {
            document.body_classes.remove(class);
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl KeyValueStore for MemoryPage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let document = self.document.borrow();
        if document.storage_failing {
            return Err(StorageError::Read {
                key: key.to_string(),
                reason: "storage disabled".to_string(),
            });
        }
        Ok(document.stored.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut document = self.document.borrow_mut();
        if document.storage_failing {
            return Err(StorageError::Write {
                key: key.to_string(),
                reason: "storage disabled".to_string(),
            });
        }
        document.stored.insert(key.to_string(), value.to_string());
        document
            .storage_writes
            .push((key.to_string(), value.to_string()));
        Ok(())
    }
}

#[async_trait(?Send)]
impl Sleeper for MemoryPage {
    async fn sleep(&self, _duration: Duration) {
        let due = {
            let mut document = self.document.borrow_mut();
            document.sleeps += 1;
            let sleeps = document.sleeps;
            let (due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut document.scheduled)
                .into_iter()
                .partition(|(after, _)| *after <= sleeps);
            document.scheduled = pending;
            due
        };
        for (_, mutation) in due {
            mutation(self);
        }
    }
}

impl PageHooks for MemoryPage {
    fn install_navigation_hooks(&mut self, source: NavigationSource) -> Result<(), HostError> {
        let source = match source {
            NavigationSource::Companion => "companion",
            NavigationSource::Polling => "polling",
        };
        self.log_hook(format!("navigation:{source}"))
    }

    fn start_path_polling(&mut self) -> Result<(), HostError> {
        self.log_hook("path_polling".to_string())
    }

    fn install_theme_hooks(&mut self) -> Result<(), HostError> {
        self.log_hook("theme".to_string())
    }

    fn start_badge_watch(&mut self, interval: Duration) -> Result<(), HostError> {
        self.log_hook(format!("badge:{}ms", interval.as_millis()))
    }

    fn uninstall_all(&mut self) {
        self.document
            .borrow_mut()
            .hook_log
            .push("uninstall".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn removed_subtrees_are_disconnected() {
        let page = MemoryPage::new("/");
        let outer = page.create_element("div").expect("create");
        let inner = page.create_element("span").expect("create");
        page.append_child(&outer, &inner).expect("append");
        assert!(!page.is_connected(&inner));

        page.append_to_body(&outer).expect("append");
        assert!(page.is_connected(&inner));

        page.purge_body();
        assert!(!page.is_connected(&outer));
        assert!(!page.is_connected(&inner));
    }

    #[test]
    fn install_style_replaces_existing_element() {
        let page = MemoryPage::new("/");
        page.install_style("x", "a{}").expect("install");
        page.install_style("x", "b{}").expect("install");
        assert_eq!(page.count_by_id("x"), 1);
        assert_eq!(page.style_text("x").as_deref(), Some("b{}"));
    }

    #[test]
    fn scheduled_mutations_run_after_the_requested_sleep() {
        let page = MemoryPage::new("/");
        page.schedule_after_sleeps(2, |page| page.set_path("/later"));
        block_on(page.sleep(Duration::from_millis(1)));
        assert_eq!(page.current_path(), "/");
        block_on(page.sleep(Duration::from_millis(1)));
        assert_eq!(page.current_path(), "/later");
        assert_eq!(page.sleep_count(), 2);
    }
}
