//! In-crate page adapter double for engine tests

use anyhow::{anyhow, Result};
use std::cell::Cell;
use std::collections::{HashMap, HashSet};

use super::page::{ElementHandle, PageAdapter, WaitOutcome};
use crate::error::RealizationError;
use crate::store::SelectorType;

/// Page whose elements are declared up front. Selectors that were not declared
/// realize to a handle that never becomes visible.
pub struct FakePage {
    markup: String,
    elements: HashMap<(SelectorType, String), String>,
    invalid: HashSet<(SelectorType, String)>,
    snapshot_fails: bool,
    pub realize_calls: Cell<usize>,
    pub snapshot_calls: Cell<usize>,
}

impl FakePage {
    pub fn new(markup: &str) -> Self {
        Self {
            markup: markup.to_string(),
            elements: HashMap::new(),
            invalid: HashSet::new(),
            snapshot_fails: false,
            realize_calls: Cell::new(0),
            snapshot_calls: Cell::new(0),
        }
    }

    /// Declare a visible element reporting `tag_or_role`
    pub fn with_element(mut self, selector_type: SelectorType, selector: &str, tag_or_role: &str) -> Self {
        self.elements
            .insert((selector_type, selector.to_string()), tag_or_role.to_string());
        self
    }

    /// Declare a selector the adapter refuses to realize
    pub fn with_invalid(mut self, selector_type: SelectorType, selector: &str) -> Self {
        self.invalid.insert((selector_type, selector.to_string()));
        self
    }

    pub fn failing_snapshot(mut self) -> Self {
        self.snapshot_fails = true;
        self
    }
}

#[derive(Debug)]
pub struct FakeHandle {
    visible: bool,
    tag: String,
}

impl ElementHandle for FakeHandle {
    fn is_visible(&self) -> bool {
        self.visible
    }

    // No polling: a fake element never changes state
    fn wait_visible(&self, _timeout_ms: u64) -> WaitOutcome {
        if self.visible {
            WaitOutcome::Visible
        } else {
            WaitOutcome::TimedOut
        }
    }

    fn tag_or_role(&self) -> String {
        self.tag.clone()
    }
}

impl PageAdapter for FakePage {
    type Handle = FakeHandle;

    fn realize(&self, selector_type: &SelectorType, selector: &str) -> Result<FakeHandle, RealizationError> {
        self.realize_calls.set(self.realize_calls.get() + 1);

        let key = (selector_type.clone(), selector.to_string());
        if self.invalid.contains(&key) {
            return Err(RealizationError::new(format!("malformed selector '{}'", selector)));
        }

        Ok(match self.elements.get(&key) {
            Some(tag) => FakeHandle {
                visible: true,
                tag: tag.clone(),
            },
            None => FakeHandle {
                visible: false,
                tag: String::new(),
            },
        })
    }

    fn snapshot(&self) -> Result<String> {
        self.snapshot_calls.set(self.snapshot_calls.get() + 1);
        if self.snapshot_fails {
            return Err(anyhow!("page closed"));
        }
        Ok(self.markup.clone())
    }
}
