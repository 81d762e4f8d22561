use std::cell::RefCell;

use serde::Serialize;
use x41_core::{IdentityResolver, LifecycleController};

use crate::wasm::{BrowserHooks, BrowserStore, WebDom, WebProbe};

pub(crate) type Engine = LifecycleController<WebDom>;

/// Everything one booted content script owns. Shared through an `Rc` so
/// event callbacks never hold a thread-local borrow while they run.
pub(crate) struct Runtime {
    pub(super) engine: RefCell<Engine>,
    pub(super) hooks: RefCell<BrowserHooks>,
    pub(super) probe: WebProbe,
    pub(super) store: BrowserStore,
    pub(super) resolver: IdentityResolver,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct UnbootedDiagnostics {
    pub(super) phase: &'static str,
    pub(super) last_error: Option<String>,
}
