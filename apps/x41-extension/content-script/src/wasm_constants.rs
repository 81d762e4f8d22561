pub(crate) const PREFERS_DARK_QUERY: &str = "(prefers-color-scheme: dark)";
pub(crate) const INLINE_SCRIPT_SELECTOR: &str = "script:not([src])";
pub(crate) const HOST_NAVIGATION_SELECTOR: &str = r#"nav[role="navigation"]"#;
pub(crate) const THEME_ATTRIBUTES: [&str; 2] = ["style", "class"];
pub(crate) const EXTENSION_NAMESPACES: [&str; 2] = ["browser", "chrome"];
pub(crate) const UNBOOTED_PHASE: &str = "unbooted";
