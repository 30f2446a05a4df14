//! Hint tokens and implied element kinds derived from a locator id.

use std::collections::BTreeSet;

use crate::dom::ElementKind;

/// Tokens of this many characters or fewer carry too little signal
const MIN_HINT_CHARS: usize = 3;

const KIND_KEYWORDS: &[(ElementKind, &[&str])] = &[
    (
        ElementKind::Input,
        &["input", "text", "field", "area", "search", "query", "email", "password"],
    ),
    (ElementKind::Button, &["button", "btn", "submit", "click"]),
    (ElementKind::Link, &["link", "url", "href", "anchor"]),
    (ElementKind::Select, &["select", "dropdown", "option", "combo"]),
    (ElementKind::Checkbox, &["check", "tick", "checkbox"]),
];

/// Lowercase the id, split on `_`, keep tokens longer than three characters
pub fn hint_tokens(locator_id: &str) -> Vec<String> {
    locator_id
        .to_lowercase()
        .split('_')
        .filter(|t| t.chars().count() > MIN_HINT_CHARS)
        .map(str::to_string)
        .collect()
}

/// Implied kinds of a locator, with the compatibility rules applied to
/// heuristic and predicted matches.
///
/// Falls back to `Generic` when no keyword matches, which disables
/// type-compatibility checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindFilter {
    kinds: BTreeSet<ElementKind>,
}

impl KindFilter {
    pub fn for_locator(locator_id: &str) -> Self {
        let lower = locator_id.to_lowercase();
        let mut kinds: BTreeSet<ElementKind> = KIND_KEYWORDS
            .iter()
            .filter(|(_, words)| words.iter().any(|w| lower.contains(w)))
            .map(|(kind, _)| *kind)
            .collect();

        if kinds.is_empty() {
            kinds.insert(ElementKind::Generic);
        }
        Self { kinds }
    }

    pub fn is_generic(&self) -> bool {
        self.kinds.contains(&ElementKind::Generic)
    }

    /// True if `actual` is one of the implied kinds
    pub fn matches(&self, actual: ElementKind) -> bool {
        self.kinds.contains(&actual)
    }

    /// True if an element of `actual` kind is acceptable for this locator.
    /// A select also takes typed input, so it passes for input locators.
    pub fn accepts(&self, actual: ElementKind) -> bool {
        self.is_generic()
            || self.matches(actual)
            || (actual == ElementKind::Select && self.matches(ElementKind::Input))
    }

    pub fn kinds(&self) -> impl Iterator<Item = ElementKind> + '_ {
        self.kinds.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_tokens_drop_short_parts() {
        assert_eq!(hint_tokens("Search_Box"), vec!["search"]);
        assert_eq!(hint_tokens("login_submit_btn"), vec!["login", "submit"]);
        assert!(hint_tokens("a_b_cde").is_empty());
    }

    #[test]
    fn test_implied_kinds() {
        let kinds: Vec<ElementKind> = KindFilter::for_locator("search_box").kinds().collect();
        assert_eq!(kinds, vec![ElementKind::Input]);

        let kinds: Vec<ElementKind> = KindFilter::for_locator("email_submit_btn").kinds().collect();
        assert_eq!(kinds, vec![ElementKind::Input, ElementKind::Button]);

        assert!(KindFilter::for_locator("cart_icon").is_generic());
    }

    #[test]
    fn test_filter_accepts() {
        let filter = KindFilter::for_locator("search_box");
        assert!(filter.accepts(ElementKind::Input));
        assert!(!filter.accepts(ElementKind::Link));

        let generic = KindFilter::for_locator("logo");
        assert!(generic.accepts(ElementKind::Link));
    }

    #[test]
    fn test_select_passes_for_input_locators() {
        let filter = KindFilter::for_locator("country_field");
        assert!(filter.accepts(ElementKind::Select));
        assert!(!filter.matches(ElementKind::Select));

        let buttons = KindFilter::for_locator("submit_btn");
        assert!(!buttons.accepts(ElementKind::Select));
    }
}
