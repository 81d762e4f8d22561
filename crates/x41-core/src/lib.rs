//! Navigation and UI reconciliation engine for the X41 content script.
//!
//! The engine replaces the host application's landing experience with a
//! three-tab navigation bar and keeps that bar, the injected styles and the
//! cached identity consistent with the host's client-side routing. It never
//! talks to a browser directly: every read and write goes through the traits
//! in [`host`], so the same engine runs over `web-sys` in the extension and
//! over an in-memory page in tests (the `testing` feature exports it).

pub mod badge;
pub mod bridge;
pub mod config;
pub mod error;
pub mod host;
pub mod icons;
pub mod identity;
pub mod lifecycle;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod navigation;
pub mod presenter;
pub mod redirect;
pub mod route;
pub mod session;
pub mod styles;
pub mod tabs;
pub mod theme;

pub use badge::{BadgeReader, BadgeState};
pub use bridge::{BridgeMessage, CompanionHandshake, CompanionStatus, PathRejection, validate_path};
pub use config::{EngineConfig, NavigationSource, Preferences};
pub use error::{ConfigError, HostError, IdentityError, LifecycleError, StorageError};
pub use host::{Dom, KeyValueStore, PageHooks, PageProbe, Sleeper};
pub use identity::IdentityResolver;
pub use lifecycle::{Diagnostics, Effect, InitOutcome, LifecycleController, Phase, initialize};
pub use navigation::{NavigationEvent, NavigationMonitor, NavigationSignal, PathPoller, Settle};
pub use presenter::TabBarPresenter;
pub use redirect::{RedirectGuard, RedirectTarget};
pub use route::{RouteClass, classify};
pub use session::{PageMode, SessionState};
pub use tabs::TabId;
pub use theme::{Palette, Theme};
