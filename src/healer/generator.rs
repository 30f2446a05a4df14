//! Heuristic candidate generation
//!
//! Turns a parsed DOM snapshot into scored selectors for a locator, using
//! hint tokens taken from the locator id. Three generators run in a fixed
//! order (text, attribute, form element); their output is rescaled by type
//! compatibility, stably sorted and deduplicated.
//!
//! # Scores
//! - **id equals a hint or the locator id**: 0.95
//! - **id contains a hint**: 0.90
//! - **name / placeholder contains a hint**: 0.85
//! - **class contains a hint**: 0.80
//! - **interactive text**: 0.80, **static text**: 0.70
//! - **form element**: 0.80 + attribute offset + exact bonus
//! - **type compatibility**: +0.20 on match, x0.5 on mismatch, capped at 0.99.
//!   A select found for an input locator keeps its score.

use log::debug;

use super::candidate::{sort_and_dedupe, Candidate, MAX_SCORE};
use super::hints::{hint_tokens, KindFilter};
use crate::dom::{DomElement, FORM_TAGS, VALUE_TAGS};
use crate::store::SelectorType;

pub const ID_EXACT: f64 = 0.95;
pub const ID_SUBSTRING: f64 = 0.90;
pub const NAME_OR_PLACEHOLDER: f64 = 0.85;
pub const CLASS_MATCH: f64 = 0.80;
pub const INTERACTIVE_TEXT: f64 = 0.80;
pub const STATIC_TEXT: f64 = 0.70;
pub const FORM_BASE: f64 = 0.80;
pub const FORM_EXACT_BONUS: f64 = 0.05;
pub const KIND_MATCH_BONUS: f64 = 0.20;
pub const KIND_MISMATCH_FACTOR: f64 = 0.5;

/// Attributes the form generator scans, with their offset over `FORM_BASE`
const FORM_ATTRIBUTES: &[(&str, f64)] = &[
    ("id", 0.10),
    ("name", 0.05),
    ("placeholder", 0.05),
    ("aria-label", 0.02),
    ("type", 0.02),
    ("class", 0.0),
    ("alt", 0.0),
];

/// Quote a value for use inside a single-quoted attribute selector
pub fn quote_attr(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// `#id` when the id is a plain CSS identifier, `[id='...']` otherwise
pub fn id_selector(id: &str) -> String {
    let plain = id
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if plain {
        format!("#{}", id)
    } else {
        format!("[id='{}']", quote_attr(id))
    }
}

pub struct CandidateGenerator {
    locator_id: String,
    hints: Vec<String>,
    filter: KindFilter,
}

impl CandidateGenerator {
    pub fn new(locator_id: &str) -> Self {
        Self {
            locator_id: locator_id.to_lowercase(),
            hints: hint_tokens(locator_id),
            filter: KindFilter::for_locator(locator_id),
        }
    }

    pub fn hints(&self) -> &[String] {
        &self.hints
    }

    pub fn kind_filter(&self) -> &KindFilter {
        &self.filter
    }

    /// First hint contained in `value` (case-insensitive)
    fn matching_hint(&self, value: &str) -> Option<&str> {
        let lower = value.to_lowercase();
        self.hints
            .iter()
            .find(|h| lower.contains(h.as_str()))
            .map(String::as_str)
    }

    /// The value is a hint token or the whole locator id
    fn is_exact(&self, value: &str) -> bool {
        let lower = value.to_lowercase();
        lower == self.locator_id || self.hints.iter().any(|h| *h == lower)
    }

    /// Elements whose own text mentions a hint. Value-bearing controls are
    /// skipped since their text is not a visible label.
    pub fn text_candidates(&self, elements: &[DomElement]) -> Vec<Candidate> {
        let mut out = Vec::new();
        for el in elements {
            if VALUE_TAGS.contains(&el.tag.as_str()) {
                continue;
            }
            let text = el.text.trim();
            if text.is_empty() || self.matching_hint(text).is_none() {
                continue;
            }
            let score = if el.is_interactive() {
                INTERACTIVE_TEXT
            } else {
                STATIC_TEXT
            };
            out.push(Candidate::new(SelectorType::Text, text, score).with_kind(el.kind()));
        }
        out
    }

    pub fn attribute_candidates(&self, elements: &[DomElement]) -> Vec<Candidate> {
        let mut out = Vec::new();
        for el in elements {
            let kind = el.kind();

            if let Some(id) = el.attr_value("id") {
                if self.is_exact(id) {
                    out.push(Candidate::css(id_selector(id), ID_EXACT).with_kind(kind));
                } else if self.matching_hint(id).is_some() {
                    out.push(Candidate::css(id_selector(id), ID_SUBSTRING).with_kind(kind));
                }
            }

            if let Some(name) = el.attr_value("name") {
                if self.matching_hint(name).is_some() {
                    let selector = format!("[name='{}']", quote_attr(name));
                    out.push(Candidate::css(selector, NAME_OR_PLACEHOLDER).with_kind(kind));
                }
            }

            if let Some(hint) = el.attr_value("placeholder").and_then(|p| self.matching_hint(p)) {
                let selector = format!("[placeholder*='{}']", quote_attr(hint));
                out.push(Candidate::css(selector, NAME_OR_PLACEHOLDER).with_kind(kind));
            }

            if let Some(class) = el.attr_value("class") {
                if let (Some(_), Some(selector)) = (self.matching_hint(class), el.class_selector()) {
                    out.push(Candidate::css(selector, CLASS_MATCH).with_kind(kind));
                }
            }
        }
        out
    }

    /// Form controls and links, scanned attribute by attribute
    pub fn form_candidates(&self, elements: &[DomElement]) -> Vec<Candidate> {
        let mut out = Vec::new();
        for el in elements.iter().filter(|e| FORM_TAGS.contains(&e.tag.as_str())) {
            let kind = el.kind();
            let tag = el.tag.as_str();

            for (attr, offset) in FORM_ATTRIBUTES {
                let Some(value) = el.attr_value(attr) else {
                    continue;
                };
                let Some(hint) = self.matching_hint(value) else {
                    continue;
                };

                let selector = match *attr {
                    "id" => id_selector(value),
                    "name" => format!("{}[name='{}']", tag, quote_attr(value)),
                    "placeholder" => format!("{}[placeholder*='{}']", tag, quote_attr(hint)),
                    "type" => format!("{}[type='{}']", tag, quote_attr(value)),
                    "class" => match el.class_selector() {
                        Some(s) => s,
                        None => continue,
                    },
                    other => format!("{}[{}*='{}']", tag, other, quote_attr(hint)),
                };

                let bonus = if self.is_exact(value) { FORM_EXACT_BONUS } else { 0.0 };
                out.push(Candidate::css(selector, FORM_BASE + offset + bonus).with_kind(kind));
            }
        }
        out
    }

    /// Adjust a score by whether the element's kind matches the locator name
    pub fn rescale(&self, candidate: &mut Candidate) {
        let Some(kind) = candidate.element_kind else {
            return;
        };
        if self.filter.is_generic() {
            return;
        }
        let score = if self.filter.matches(kind) {
            candidate.score + KIND_MATCH_BONUS
        } else if self.filter.accepts(kind) {
            candidate.score
        } else {
            candidate.score * KIND_MISMATCH_FACTOR
        };
        candidate.score = score.min(MAX_SCORE);
    }

    /// Full heuristic ranking: generate, rescale, stable sort, dedupe
    pub fn rank(&self, elements: &[DomElement]) -> Vec<Candidate> {
        let mut all = self.text_candidates(elements);
        all.extend(self.attribute_candidates(elements));
        all.extend(self.form_candidates(elements));

        for candidate in &mut all {
            self.rescale(candidate);
        }

        let ranked = sort_and_dedupe(all);
        debug!(
            "Ranked {} heuristic candidates for '{}' from {} elements (hints: {:?})",
            ranked.len(),
            self.locator_id,
            elements.len(),
            self.hints
        );
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{DomParser, ElementKind, HtmlParser};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn parse(html: &str) -> Vec<DomElement> {
        HtmlParser::new().parse(html)
    }

    #[test]
    fn test_exact_id_ranks_first() {
        let elements = parse(r#"<div><input id="search_box"><a href="/s">Search tips</a></div>"#);
        let ranked = CandidateGenerator::new("search_box").rank(&elements);

        assert_eq!(ranked[0].selector_type, SelectorType::Css);
        assert_eq!(ranked[0].selector, "#search_box");
        assert!(approx(ranked[0].score, MAX_SCORE));
        assert_eq!(
            ranked.iter().filter(|c| c.selector == "#search_box").count(),
            1,
            "attribute and form generators agree on the same selector"
        );
    }

    #[test]
    fn test_attribute_scores() {
        let elements = vec![
            DomElement::new("div").with_attr("id", "main-search-panel"),
            DomElement::new("div")
                .with_attr("name", "searchTerm")
                .with_attr("placeholder", "Search here")
                .with_attr("class", "big search-area"),
        ];
        let gen = CandidateGenerator::new("search_icon");
        let found = gen.attribute_candidates(&elements);
        let pairs: Vec<(&str, f64)> = found.iter().map(|c| (c.selector.as_str(), c.score)).collect();
        assert_eq!(
            pairs,
            vec![
                ("#main-search-panel", ID_SUBSTRING),
                ("[name='searchTerm']", NAME_OR_PLACEHOLDER),
                ("[placeholder*='search']", NAME_OR_PLACEHOLDER),
                (".big.search-area", CLASS_MATCH),
            ]
        );
    }

    #[test]
    fn test_text_candidates_skip_value_tags() {
        let elements = parse(
            r#"<textarea>search terms</textarea><button>Search now</button><p>Search results</p>"#,
        );
        let found = CandidateGenerator::new("search_results").text_candidates(&elements);
        let pairs: Vec<(&str, f64)> = found.iter().map(|c| (c.selector.as_str(), c.score)).collect();
        assert_eq!(pairs, vec![("Search now", INTERACTIVE_TEXT), ("Search results", STATIC_TEXT)]);
    }

    #[test]
    fn test_form_candidates_offsets_and_exact_bonus() {
        let elements = vec![
            DomElement::new("input")
                .with_attr("name", "email")
                .with_attr("type", "email")
                .with_attr("aria-label", "Your email address"),
            DomElement::new("span").with_attr("id", "email"),
        ];
        let found = CandidateGenerator::new("email_field").form_candidates(&elements);
        let pairs: Vec<(&str, f64)> = found.iter().map(|c| (c.selector.as_str(), c.score)).collect();

        assert_eq!(pairs.len(), 3, "span is not a form element");
        assert_eq!(pairs[0].0, "input[name='email']");
        assert!(approx(pairs[0].1, FORM_BASE + 0.05 + FORM_EXACT_BONUS));
        assert_eq!(pairs[1].0, "input[aria-label*='email']");
        assert!(approx(pairs[1].1, FORM_BASE + 0.02));
        assert_eq!(pairs[2].0, "input[type='email']");
        assert!(approx(pairs[2].1, FORM_BASE + 0.02 + FORM_EXACT_BONUS));
    }

    #[test]
    fn test_kind_mismatch_is_penalised() {
        let elements = vec![
            DomElement::new("a").with_attr("id", "search-link-x"),
            DomElement::new("input").with_attr("id", "search-input-x"),
        ];
        let ranked = CandidateGenerator::new("search_box").rank(&elements);
        assert_eq!(ranked[0].selector, "#search-input-x");
        assert_eq!(ranked[0].element_kind, Some(ElementKind::Input));

        let link = ranked
            .iter()
            .find(|c| c.selector == "#search-link-x")
            .unwrap();
        assert!(approx(link.score, (FORM_BASE + 0.10) * KIND_MISMATCH_FACTOR));
    }

    #[test]
    fn test_select_for_input_locator_is_not_penalised() {
        let elements = vec![
            DomElement::new("a").with_attr("id", "country-link"),
            DomElement::new("select").with_attr("id", "country-list"),
        ];
        let ranked = CandidateGenerator::new("country_field").rank(&elements);
        assert_eq!(ranked[0].selector, "#country-list");
        assert!(approx(ranked[0].score, ID_SUBSTRING));
    }

    #[test]
    fn test_generic_locator_keeps_scores() {
        let elements = vec![DomElement::new("a").with_attr("id", "brand-logo")];
        let ranked = CandidateGenerator::new("brand_logo").rank(&elements);
        assert!(approx(ranked[0].score, FORM_BASE + 0.10));
    }

    #[test]
    fn test_ranking_is_deterministic() {
        let html = r#"
<form>
  <input id="user_email" name="email" placeholder="Email address" class="form-control email">
  <label class="email-label">Email</label>
  <button type="submit" class="btn email-submit">Send email</button>
</form>"#;
        let elements = parse(html);
        let gen = CandidateGenerator::new("user_email_input");
        let first = gen.rank(&elements);
        for _ in 0..5 {
            assert_eq!(gen.rank(&elements), first);
        }
        assert!(first.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_quoting() {
        assert_eq!(id_selector("search_box"), "#search_box");
        assert_eq!(id_selector("1st"), "[id='1st']");
        assert_eq!(id_selector("a:b"), "[id='a:b']");
        assert_eq!(quote_attr("it's"), "it\\'s");
    }
}
