//! Input timing guard.
//!
//! Opening a new browsing context while the primary button is held leaves
//! some browsers without the matching button-up event, and the application
//! then sees a stuck button. Navigation requested mid-click is therefore
//! deferred to the next primary release.
//!
//! At most one navigation is pending. A request arriving while another is
//! pending replaces it, so one release opens exactly one context.

use tracing::debug;

use crate::{action::BridgeAction, event::PointerButton};

/// Primary button state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonState {
    /// Released.
    #[default]
    Up,
    /// Held.
    Down,
}

/// Input timing guard state machine.
#[derive(Debug, Clone, Default)]
pub struct InputGuard {
    primary: ButtonState,
    pending: Option<String>,
}

impl InputGuard {
    /// Create a guard with the button released.
    pub fn new() -> Self {
        Self::default()
    }

    /// Primary button state.
    pub fn primary(&self) -> ButtonState {
        self.primary
    }

    /// Navigation waiting for release, if any.
    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    /// Pointer pressed. Only the primary button is tracked.
    pub fn pointer_down(&mut self, button: PointerButton) {
        if button == PointerButton::Primary {
            self.primary = ButtonState::Down;
        }
    }

    /// Pointer released. Flushes the pending navigation on primary release.
    pub fn pointer_up(&mut self, button: PointerButton) -> Vec<BridgeAction> {
        if button != PointerButton::Primary {
            return vec![];
        }
        self.primary = ButtonState::Up;

        self.pending.take().map(|url| BridgeAction::Navigate { url }).into_iter().collect()
    }

    /// Navigate now if the button is up, otherwise on the next release.
    pub fn request_navigation(&mut self, url: String) -> Vec<BridgeAction> {
        match self.primary {
            ButtonState::Up => vec![BridgeAction::Navigate { url }],
            ButtonState::Down => {
                if let Some(previous) = self.pending.replace(url) {
                    debug!(%previous, "pending navigation replaced");
                }
                vec![]
            },
        }
    }
}

/// Decode a URL handed over as a byte buffer and explicit length.
///
/// The length is clamped to the buffer. Invalid UTF-8 is replaced rather
/// than rejected.
pub fn decode_url(bytes: &[u8], len: usize) -> String {
    let end = len.min(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn navigate(url: &str) -> BridgeAction {
        BridgeAction::Navigate { url: url.to_string() }
    }

    #[test]
    fn navigates_immediately_when_released() {
        let mut guard = InputGuard::new();
        assert_eq!(guard.request_navigation("https://a".into()), vec![navigate("https://a")]);
        assert_eq!(guard.pending(), None);
    }

    #[test]
    fn defers_until_primary_release() {
        let mut guard = InputGuard::new();
        guard.pointer_down(PointerButton::Primary);

        assert!(guard.request_navigation("https://a".into()).is_empty());
        assert_eq!(guard.pending(), Some("https://a"));

        assert_eq!(guard.pointer_up(PointerButton::Primary), vec![navigate("https://a")]);
        assert_eq!(guard.primary(), ButtonState::Up);
        assert!(guard.pointer_up(PointerButton::Primary).is_empty());
    }

    #[test]
    fn other_buttons_do_not_hold_or_release() {
        let mut guard = InputGuard::new();
        guard.pointer_down(PointerButton::Secondary);
        assert_eq!(guard.primary(), ButtonState::Up);

        guard.pointer_down(PointerButton::Primary);
        guard.request_navigation("https://a".into());
        assert!(guard.pointer_up(PointerButton::Auxiliary).is_empty());
        assert_eq!(guard.pending(), Some("https://a"));
    }

    #[test]
    fn concurrent_requests_coalesce() {
        let mut guard = InputGuard::new();
        guard.pointer_down(PointerButton::Primary);
        guard.request_navigation("https://a".into());
        guard.request_navigation("https://b".into());

        assert_eq!(guard.pointer_up(PointerButton::Primary), vec![navigate("https://b")]);
    }

    #[test]
    fn decode_respects_length() {
        let buffer = b"https://www.openttd.org/\0garbage";
        assert_eq!(decode_url(buffer, 24), "https://www.openttd.org/");
        assert_eq!(decode_url(b"short", 99), "short");
        assert_eq!(decode_url(&[0x68, 0xff, 0x69], 3), "h\u{fffd}i");
    }
}
