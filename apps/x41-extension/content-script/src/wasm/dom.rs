use super::*;

    /// Write surface over the live document. Every node handle is a plain
    /// `Element`, so a host-side removal simply leaves it disconnected.
    #[derive(Clone)]
    pub(crate) struct WebDom {
        document: web_sys::Document,
    }

    impl WebDom {
        pub(crate) fn new(document: web_sys::Document) -> Self {
            Self { document }
        }

        fn body(&self) -> Result<web_sys::HtmlElement, HostError> {
            self.document.body().ok_or(HostError::BodyUnavailable)
        }
    }

    impl Dom for WebDom {
        type Node = web_sys::Element;

        fn create_element(&self, tag: &str) -> Result<Self::Node, HostError> {
            self.document
                .create_element(tag)
                .map_err(|_| HostError::dom("create_element"))
        }

        fn set_attribute(&self, node: &Self::Node, name: &str, value: &str) -> Result<(), HostError> {
            node.set_attribute(name, value)
                .map_err(|_| HostError::dom("set_attribute"))
        }

        fn set_style(&self, node: &Self::Node, property: &str, value: &str) -> Result<(), HostError> {
            let Some(element) = node.dyn_ref::<web_sys::HtmlElement>() else {
                return Err(HostError::dom("set_style"));
            };
            element
                .style()
                .set_property(property, value)
                .map_err(|_| HostError::dom("set_style"))
        }

        fn set_text(&self, node: &Self::Node, text: &str) -> Result<(), HostError> {
            node.set_text_content(Some(text));
            Ok(())
        }

        fn set_markup(&self, node: &Self::Node, markup: &str) -> Result<(), HostError> {
            node.set_inner_html(markup);
            Ok(())
        }

        fn append_child(&self, parent: &Self::Node, child: &Self::Node) -> Result<(), HostError> {
            parent
                .append_child(child)
                .map(|_| ())
                .map_err(|_| HostError::dom("append_child"))
        }

        fn append_to_body(&self, node: &Self::Node) -> Result<(), HostError> {
            self.body()?
                .append_child(node)
                .map(|_| ())
                .map_err(|_| HostError::dom("append_to_body"))
        }

        fn remove(&self, node: &Self::Node) {
            node.remove();
        }

        fn is_connected(&self, node: &Self::Node) -> bool {
            node.is_connected()
        }

        fn install_style(&self, id: &str, css: &str) -> Result<(), HostError> {
            self.remove_by_id(id);
            let style = self.create_element("style")?;
            style.set_id(id);
            style.set_text_content(Some(css));
            let parent: web_sys::Element = match self.document.head() {
                Some(head) => head.into(),
                None => self
                    .document
                    .document_element()
                    .ok_or(HostError::DocumentUnavailable)?,
            };
            parent
                .append_child(&style)
                .map(|_| ())
                .map_err(|_| HostError::dom("install_style"))
        }

        fn has_element(&self, id: &str) -> bool {
            self.document.get_element_by_id(id).is_some()
        }

        fn remove_by_id(&self, id: &str) {
            while let Some(element) = self.document.get_element_by_id(id) {
                element.remove();
            }
        }

        fn set_body_class(&self, class: &str, enabled: bool) -> Result<(), HostError> {
            self.body()?
                .class_list()
                .toggle_with_force(class, enabled)
                .map(|_| ())
                .map_err(|_| HostError::dom("set_body_class"))
        }
    }

    /// Read-only view of the live page.
    #[derive(Clone)]
    pub(crate) struct WebProbe {
        window: web_sys::Window,
        document: web_sys::Document,
    }

    impl WebProbe {
        pub(crate) fn new(window: web_sys::Window, document: web_sys::Document) -> Self {
            Self { window, document }
        }

        pub(super) fn window(&self) -> &web_sys::Window {
            &self.window
        }

        fn query_all(&self, selector: &str) -> Vec<web_sys::Element> {
            let Ok(nodes) = self.document.query_selector_all(selector) else {
                return Vec::new();
            };
            (0..nodes.length())
                .filter_map(|index| nodes.item(index))
                .filter_map(|node| node.dyn_into::<web_sys::Element>().ok())
                .collect()
        }

        fn first(&self, selector: &str) -> Option<web_sys::Element> {
            if selector == x41_core::theme::BODY_SELECTOR {
                return self.document.body().map(Into::into);
            }
            self.document.query_selector(selector).ok().flatten()
        }
    }

    impl PageProbe for WebProbe {
        fn current_path(&self) -> String {
            self.window
                .location()
                .pathname()
                .unwrap_or_else(|_| "/".to_string())
        }

        fn inline_scripts(&self) -> Vec<String> {
            self.query_all(INLINE_SCRIPT_SELECTOR)
                .into_iter()
                .filter_map(|script| script.text_content())
                .collect()
        }

        fn hrefs(&self, selector: &str) -> Vec<String> {
            self.query_all(selector)
                .into_iter()
                .filter_map(|element| element.get_attribute("href"))
                .collect()
        }

        fn text_or_label(&self, selector: &str) -> Option<String> {
            let element = self.first(selector)?;
            let text = element.text_content().unwrap_or_default();
            if !text.trim().is_empty() {
                return Some(text);
            }
            Some(element.get_attribute("aria-label").unwrap_or_default())
        }

        fn computed_style(&self, selector: &str, property: &str) -> Option<String> {
            let element = self.first(selector)?;
            let declaration = self.window.get_computed_style(&element).ok().flatten()?;
            declaration
                .get_property_value(property)
                .ok()
                .filter(|value| !value.trim().is_empty())
        }

        fn prefers_dark(&self) -> bool {
            self.window
                .match_media(PREFERS_DARK_QUERY)
                .ok()
                .flatten()
                .is_some_and(|query| query.matches())
        }
    }
