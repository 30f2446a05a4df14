//! DOM snapshot model
//!
//! The heuristic stage never talks to a browser directly: it receives the
//! serialized markup from the page adapter and works on a flat list of
//! [`DomElement`]s produced by a [`DomParser`].

pub mod html;

pub use html::HtmlParser;

use std::fmt;

/// Interaction family of an element, used to check that a heuristic match is
/// the kind of control the locator name asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElementKind {
    Input,
    Button,
    Link,
    Select,
    Checkbox,
    Generic,
}

impl ElementKind {
    /// Classify the string a page adapter reports for a live element: either
    /// a lowercase tag name or an ARIA role.
    pub fn from_tag_or_role(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "input" | "textarea" | "textbox" | "searchbox" => ElementKind::Input,
            "button" | "submit" => ElementKind::Button,
            "a" | "link" => ElementKind::Link,
            "select" | "combobox" | "listbox" => ElementKind::Select,
            "checkbox" => ElementKind::Checkbox,
            _ => ElementKind::Generic,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementKind::Input => "input",
            ElementKind::Button => "button",
            ElementKind::Link => "link",
            ElementKind::Select => "select",
            ElementKind::Checkbox => "checkbox",
            ElementKind::Generic => "element",
        };
        f.write_str(name)
    }
}

/// Tags the form-element generator considers
pub const FORM_TAGS: &[&str] = &["input", "textarea", "select", "button", "a"];

/// Tags whose text content is not what the user sees as a label
pub const VALUE_TAGS: &[&str] = &["input", "textarea", "select"];

const INTERACTIVE_TAGS: &[&str] = &[
    "a", "button", "input", "textarea", "select", "option", "label", "summary", "details",
];

/// One element of a parsed DOM snapshot, in document order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomElement {
    /// Lowercase tag name
    pub tag: String,
    /// Attributes in source order, names lowercased
    pub attributes: Vec<(String, String)>,
    /// Direct text content, whitespace-normalised
    pub text: String,
}

impl DomElement {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_lowercase(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.push((name.to_lowercase(), value.to_string()));
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Non-empty attribute value
    pub fn attr_value(&self, name: &str) -> Option<&str> {
        self.attr(name).filter(|v| !v.trim().is_empty())
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attr("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// `.a.b` selector for all classes, if the element has any
    pub fn class_selector(&self) -> Option<String> {
        let classes = self.classes();
        if classes.is_empty() {
            None
        } else {
            Some(format!(".{}", classes.join(".")))
        }
    }

    pub fn is_interactive(&self) -> bool {
        INTERACTIVE_TAGS.contains(&self.tag.as_str())
            || matches!(self.attr("role"), Some("button" | "link"))
            || self.attr("onclick").is_some()
    }

    /// Actual kind from tag, `type` and `role`
    pub fn kind(&self) -> ElementKind {
        let input_type = self.attr("type").map(|t| t.to_lowercase());
        match self.tag.as_str() {
            "input" => match input_type.as_deref() {
                Some("checkbox") => ElementKind::Checkbox,
                Some("submit" | "button" | "reset" | "image") => ElementKind::Button,
                _ => ElementKind::Input,
            },
            "textarea" => ElementKind::Input,
            "button" => ElementKind::Button,
            "a" => ElementKind::Link,
            "select" => ElementKind::Select,
            _ => self
                .attr("role")
                .map(ElementKind::from_tag_or_role)
                .unwrap_or(ElementKind::Generic),
        }
    }
}

/// Port for turning serialized markup into elements
pub trait DomParser {
    /// Parse as much of the markup as possible. Malformed input yields the
    /// elements read before the error rather than failing the stage.
    fn parse(&self, markup: &str) -> Vec<DomElement>;
}
