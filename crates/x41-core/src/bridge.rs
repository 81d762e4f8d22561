//! Message protocol between the isolated content script and the page
//! companion running in the host's own execution context.
//!
//! `X41_NAVIGATE` asks the companion to route the host application to a path;
//! `X41_NAVIGATED` reports that the host router changed the path. Every path
//! crossing the boundary is validated on receipt, whichever side sent it.
//!
//! The companion is injected separately and may never start, so the content
//! script asks with `X41_HELLO` and the companion answers (or announces
//! itself on install) with `X41_READY`. Until that arrives nothing is routed
//! through the bridge. See [`CompanionHandshake`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const MAX_BRIDGE_PATH_LEN: usize = 2048;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BridgeMessage {
    #[serde(rename = "X41_NAVIGATE")]
    Navigate { path: String },
    #[serde(rename = "X41_NAVIGATED")]
    Navigated { path: String },
    #[serde(rename = "X41_HELLO")]
    Hello,
    #[serde(rename = "X41_READY")]
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathRejection {
    #[error("path is empty")]
    Empty,
    #[error("path must begin with `/`")]
    MissingLeadingSlash,
    #[error("path must not contain a scheme separator")]
    SchemeSeparator,
    #[error("path must not contain `//`")]
    DoubleSlash,
    #[error("path must not contain a backslash")]
    Backslash,
    #[error("path must not contain control characters")]
    ControlCharacter,
    #[error("path is {len} bytes, limit is {limit}", limit = MAX_BRIDGE_PATH_LEN)]
    TooLong { len: usize },
}

/// Accepts only same-origin relative paths: leading `/`, no scheme, no `//`
/// (protocol-relative), bounded length.
pub fn validate_path(path: &str) -> Result<&str, PathRejection> {
    if path.is_empty() {
        return Err(PathRejection::Empty);
    }
    if path.len() >= MAX_BRIDGE_PATH_LEN {
        return Err(PathRejection::TooLong { len: path.len() });
    }
    if !path.starts_with('/') {
        return Err(PathRejection::MissingLeadingSlash);
    }
    if path.contains("://") {
        return Err(PathRejection::SchemeSeparator);
    }
    if path.contains("//") {
        return Err(PathRejection::DoubleSlash);
    }
    if path.contains('\\') {
        return Err(PathRejection::Backslash);
    }
    if path.chars().any(char::is_control) {
        return Err(PathRejection::ControlCharacter);
    }
    Ok(path)
}

impl BridgeMessage {
    pub fn navigate(path: &str) -> Result<Self, PathRejection> {
        validate_path(path).map(|path| Self::Navigate {
            path: path.to_string(),
        })
    }

    pub fn navigated(path: &str) -> Result<Self, PathRejection> {
        validate_path(path).map(|path| Self::Navigated {
            path: path.to_string(),
        })
    }

    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Navigate { path } | Self::Navigated { path } => Some(path),
            Self::Hello | Self::Ready => None,
        }
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Where a message event came from, as observed by the receiver.
#[derive(Debug, Clone, Copy)]
pub struct MessageOrigin<'a> {
    /// The event's `source` is the receiving window itself.
    pub same_window: bool,
    pub origin: &'a str,
    pub expected_origin: &'a str,
}

impl MessageOrigin<'_> {
    #[must_use]
    pub fn is_trusted(&self) -> bool {
        self.same_window && !self.origin.is_empty() && self.origin == self.expected_origin
    }
}

/// Decodes a received message. Untrusted sources, unknown shapes and paths
/// that fail validation are all dropped.
#[must_use]
pub fn accept_message(origin: MessageOrigin<'_>, data: &Value) -> Option<BridgeMessage> {
    if !origin.is_trusted() {
        return None;
    }
    let message: BridgeMessage = serde_json::from_value(data.clone()).ok()?;
    let Some(path) = message.path() else {
        return Some(message);
    };
    match validate_path(path) {
        Ok(_) => Some(message),
        Err(rejection) => {
            tracing::debug!(reason = %rejection, "dropping bridge message with invalid path");
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanionStatus {
    /// `X41_HELLO` sent, no answer yet.
    #[default]
    Awaiting,
    Ready,
    /// The handshake timed out; route changes come from path polling.
    Unavailable,
}

/// Tracks whether the page companion is actually running.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompanionHandshake {
    status: CompanionStatus,
}

impl CompanionHandshake {
    #[must_use]
    pub fn status(&self) -> CompanionStatus {
        self.status
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status == CompanionStatus::Ready
    }

    /// `X41_READY` received. A late answer still upgrades tab navigation to
    /// in-page routing. Returns whether the status changed.
    pub fn confirm(&mut self) -> bool {
        let changed = self.status != CompanionStatus::Ready;
        self.status = CompanionStatus::Ready;
        changed
    }

    /// The handshake deadline passed. Returns `true` exactly once, when the
    /// caller should fall back to path polling.
    pub fn expire(&mut self) -> bool {
        if self.status != CompanionStatus::Awaiting {
            return false;
        }
        self.status = CompanionStatus::Unavailable;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;
    use serde_json::json;

    const ORIGIN: &str = "https://x.com";

    fn trusted() -> MessageOrigin<'static> {
        MessageOrigin {
            same_window: true,
            origin: ORIGIN,
            expected_origin: ORIGIN,
        }
    }

    #[test]
    fn rejects_absolute_and_protocol_relative_urls() {
        assert_eq!(
            validate_path("https://evil.example/x"),
            Err(PathRejection::MissingLeadingSlash)
        );
        assert_eq!(validate_path("//evil.example/x"), Err(PathRejection::DoubleSlash));
        assert_eq!(
            validate_path("/redirect?to=https://evil.example"),
            Err(PathRejection::SchemeSeparator)
        );
        assert_eq!(validate_path("/\\evil.example"), Err(PathRejection::Backslash));
        assert_eq!(validate_path("javascript:alert(1)"), Err(PathRejection::MissingLeadingSlash));
        assert_eq!(validate_path(""), Err(PathRejection::Empty));
    }

    #[test]
    fn enforces_length_bound() {
        let long = format!("/{}", "a".repeat(MAX_BRIDGE_PATH_LEN));
        assert!(matches!(validate_path(&long), Err(PathRejection::TooLong { .. })));
        let fits = format!("/{}", "a".repeat(MAX_BRIDGE_PATH_LEN - 2));
        assert!(validate_path(&fits).is_ok());
    }

    #[test]
    fn accepts_plain_relative_paths() {
        assert_eq!(validate_path("/notifications"), Ok("/notifications"));
        assert_eq!(validate_path("/jack/media?x=1"), Ok("/jack/media?x=1"));
    }

    #[test]
    fn message_wire_shape_uses_type_discriminant() {
        let message = BridgeMessage::navigate("/notifications").expect("valid path");
        assert_eq!(
            message.to_value(),
            json!({ "type": "X41_NAVIGATE", "path": "/notifications" })
        );
    }

    #[test]
    fn accept_message_drops_foreign_sources_and_bad_paths() {
        let data = json!({ "type": "X41_NAVIGATED", "path": "/home" });
        assert_eq!(
            accept_message(trusted(), &data),
            Some(BridgeMessage::Navigated {
                path: "/home".to_string()
            })
        );

        let other_window = MessageOrigin {
            same_window: false,
            ..trusted()
        };
        assert_eq!(accept_message(other_window, &data), None);

        let other_origin = MessageOrigin {
            origin: "https://evil.example",
            ..trusted()
        };
        assert_eq!(accept_message(other_origin, &data), None);

        let evil = json!({ "type": "X41_NAVIGATE", "path": "https://evil.example/x" });
        assert_eq!(accept_message(trusted(), &evil), None);

        let unknown = json!({ "type": "SOMETHING_ELSE", "path": "/home" });
        assert_eq!(accept_message(trusted(), &unknown), None);
    }

    #[test]
    fn handshake_messages_carry_no_path() {
        assert_eq!(BridgeMessage::Hello.to_value(), json!({ "type": "X41_HELLO" }));
        assert_eq!(
            accept_message(trusted(), &json!({ "type": "X41_READY" })),
            Some(BridgeMessage::Ready)
        );
        let foreign = MessageOrigin {
            same_window: false,
            ..trusted()
        };
        assert_eq!(accept_message(foreign, &json!({ "type": "X41_READY" })), None);
    }

    #[test]
    fn handshake_expires_once_and_late_ready_still_confirms() {
        let mut handshake = CompanionHandshake::default();
        assert!(!handshake.is_ready());
        assert!(handshake.expire());
        assert!(!handshake.expire());
        assert_eq!(handshake.status(), CompanionStatus::Unavailable);

        assert!(handshake.confirm());
        assert!(!handshake.confirm());
        assert!(handshake.is_ready());
        assert!(!handshake.expire());
    }

    quickcheck! {
        fn validated_paths_never_leave_the_origin(path: String) -> bool {
            match validate_path(&path) {
                Ok(accepted) => {
                    accepted.starts_with('/')
                        && !accepted.contains("//")
                        && !accepted.contains("://")
                        && accepted.len() < MAX_BRIDGE_PATH_LEN
                }
                Err(_) => true,
            }
        }
    }
}
