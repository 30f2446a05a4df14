use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::clock::now_secs;

const PREDICTED_PREFIX: &str = "predicted_";

/// Resolution mechanism family for a selector.
///
/// Serialized as the plain strings used in the store file (`css`, `xpath`,
/// `predicted_css`, ...). Strings that are not recognised survive a
/// load/save round trip as [`SelectorType::Unknown`] so files edited by other
/// tools are never silently rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SelectorType {
    Css,
    XPath,
    Text,
    Role,
    Alt,
    Label,
    Placeholder,
    TestId,
    /// A strategy first found by the prediction stage
    Predicted(Box<SelectorType>),
    Unknown(String),
}

impl SelectorType {
    pub fn parse(s: &str) -> Self {
        if let Some(rest) = s.strip_prefix(PREDICTED_PREFIX) {
            return SelectorType::Predicted(Box::new(SelectorType::parse(rest)));
        }
        match s {
            "css" => SelectorType::Css,
            "xpath" => SelectorType::XPath,
            "text" => SelectorType::Text,
            "role" => SelectorType::Role,
            "alt" => SelectorType::Alt,
            "label" => SelectorType::Label,
            "placeholder" => SelectorType::Placeholder,
            "testid" => SelectorType::TestId,
            other => SelectorType::Unknown(other.to_string()),
        }
    }

    /// The mechanism a page adapter must use, with any `predicted_` label removed.
    pub fn base(&self) -> &SelectorType {
        match self {
            SelectorType::Predicted(inner) => inner.base(),
            other => other,
        }
    }

    /// Label this type as coming from the prediction stage.
    pub fn predicted(&self) -> SelectorType {
        SelectorType::Predicted(Box::new(self.base().clone()))
    }

    pub fn is_predicted(&self) -> bool {
        matches!(self, SelectorType::Predicted(_))
    }
}

impl fmt::Display for SelectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectorType::Css => f.write_str("css"),
            SelectorType::XPath => f.write_str("xpath"),
            SelectorType::Text => f.write_str("text"),
            SelectorType::Role => f.write_str("role"),
            SelectorType::Alt => f.write_str("alt"),
            SelectorType::Label => f.write_str("label"),
            SelectorType::Placeholder => f.write_str("placeholder"),
            SelectorType::TestId => f.write_str("testid"),
            SelectorType::Predicted(inner) => write!(f, "{}{}", PREDICTED_PREFIX, inner),
            SelectorType::Unknown(raw) => f.write_str(raw),
        }
    }
}

impl From<String> for SelectorType {
    fn from(s: String) -> Self {
        SelectorType::parse(&s)
    }
}

impl From<SelectorType> for String {
    fn from(t: SelectorType) -> Self {
        t.to_string()
    }
}

/// A (type, selector) pair previously proven to resolve a locator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    #[serde(rename = "type")]
    pub selector_type: SelectorType,
    pub selector: String,
    /// Epoch seconds of the last successful use
    #[serde(default)]
    pub last_used: f64,
}

impl Strategy {
    pub fn new(selector_type: SelectorType, selector: impl Into<String>) -> Self {
        Self::used_at(selector_type, selector, now_secs())
    }

    pub fn used_at(selector_type: SelectorType, selector: impl Into<String>, last_used: f64) -> Self {
        Self {
            selector_type,
            selector: selector.into(),
            last_used,
        }
    }

    /// Identity within a locator's list ignores `last_used`.
    pub fn same_as(&self, selector_type: &SelectorType, selector: &str) -> bool {
        self.selector_type == *selector_type && self.selector == selector
    }
}

/// Ordered strategies for one locator; index 0 is tried first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocatorRecord {
    #[serde(default)]
    pub strategies: Vec<Strategy>,
}

impl LocatorRecord {
    pub fn position(&self, selector_type: &SelectorType, selector: &str) -> Option<usize> {
        self.strategies
            .iter()
            .position(|s| s.same_as(selector_type, selector))
    }
}
