//! Page adapter port
//!
//! The engine never drives a browser itself. A page adapter turns a
//! (type, selector) pair into an element handle that can be waited on and
//! introspected, and serializes the current DOM for the heuristic stage.

use anyhow::Result;

use crate::dom::ElementKind;
use crate::error::RealizationError;
use crate::store::SelectorType;
use crate::utils::poll::{wait_until, PollConfig};

/// Result of waiting for an element to become visible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Visible,
    TimedOut,
}

/// A live, possibly not yet attached, element on the page
pub trait ElementHandle {
    fn is_visible(&self) -> bool;

    /// Block until the element is visible or `timeout_ms` elapses
    fn wait_visible(&self, timeout_ms: u64) -> WaitOutcome {
        if wait_until(|| self.is_visible(), PollConfig::with_timeout(timeout_ms)) {
            WaitOutcome::Visible
        } else {
            WaitOutcome::TimedOut
        }
    }

    /// Lowercase tag name or ARIA role. Adapters should report `checkbox` for
    /// `<input type="checkbox">` and `button` for submit inputs.
    fn tag_or_role(&self) -> String;

    fn kind(&self) -> ElementKind {
        ElementKind::from_tag_or_role(&self.tag_or_role())
    }
}

pub trait PageAdapter {
    type Handle: ElementHandle;

    /// Build a handle for a selector. `selector_type` is always a base type;
    /// the engine strips any `predicted_` label first.
    fn realize(&self, selector_type: &SelectorType, selector: &str)
        -> Result<Self::Handle, RealizationError>;

    /// Serialized markup of the current page
    fn snapshot(&self) -> Result<String>;
}

fn quoted(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Render a strategy as a Playwright selector string, for adapters backed by
/// Playwright. Unknown types have no rendering.
pub fn playwright_selector(selector_type: &SelectorType, selector: &str) -> Option<String> {
    let rendered = match selector_type.base() {
        SelectorType::Css => selector.to_string(),
        SelectorType::XPath => format!("xpath={}", selector),
        SelectorType::Text => format!("text=\"{}\"", quoted(selector)),
        SelectorType::Role => format!("[role=\"{}\"]", quoted(selector)),
        SelectorType::Alt => format!("[alt=\"{}\"]", quoted(selector)),
        SelectorType::Label => format!("[aria-label=\"{}\"]", quoted(selector)),
        SelectorType::Placeholder => format!("[placeholder=\"{}\"]", quoted(selector)),
        SelectorType::TestId => format!("[data-testid=\"{}\"]", quoted(selector)),
        SelectorType::Predicted(_) | SelectorType::Unknown(_) => return None,
    };
    Some(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Appearing {
        checks: Cell<u32>,
        visible_after: u32,
    }

    impl ElementHandle for Appearing {
        fn is_visible(&self) -> bool {
            self.checks.set(self.checks.get() + 1);
            self.checks.get() > self.visible_after
        }

        fn tag_or_role(&self) -> String {
            "input".to_string()
        }
    }

    #[test]
    fn test_default_wait_polls_until_visible() {
        let handle = Appearing {
            checks: Cell::new(0),
            visible_after: 2,
        };
        assert_eq!(handle.wait_visible(2000), WaitOutcome::Visible);
        assert_eq!(handle.checks.get(), 3);
        assert_eq!(handle.kind(), ElementKind::Input);
    }

    #[test]
    fn test_default_wait_times_out() {
        let handle = Appearing {
            checks: Cell::new(0),
            visible_after: u32::MAX,
        };
        assert_eq!(handle.wait_visible(0), WaitOutcome::TimedOut);
    }

    #[test]
    fn test_playwright_rendering() {
        assert_eq!(
            playwright_selector(&SelectorType::Css, "#q").as_deref(),
            Some("#q")
        );
        assert_eq!(
            playwright_selector(&SelectorType::XPath.predicted(), "//button").as_deref(),
            Some("xpath=//button")
        );
        assert_eq!(
            playwright_selector(&SelectorType::Text, "Say \"hi\"").as_deref(),
            Some("text=\"Say \\\"hi\\\"\"")
        );
        assert_eq!(
            playwright_selector(&SelectorType::TestId, "cart").as_deref(),
            Some("[data-testid=\"cart\"]")
        );
        assert_eq!(playwright_selector(&SelectorType::parse("shadow"), "x"), None);
    }
}
