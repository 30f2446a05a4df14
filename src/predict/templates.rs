use log::debug;

use super::model::DEFAULT_MAX_PREDICTIONS;
use super::Predictor;
use crate::dom::{DomParser, HtmlParser};
use crate::healer::generator::{id_selector, quote_attr};
use crate::healer::{sort_and_dedupe, Candidate};
use crate::store::SelectorType;

pub const ATTRIBUTE_SCORE: f64 = 0.70;
pub const BUTTON_TEXT_XPATH_SCORE: f64 = 0.60;
pub const ANY_TEXT_XPATH_SCORE: f64 = 0.50;
pub const TEXT_TEMPLATE_SCORE: f64 = 0.50;
pub const ROLE_SCORE: f64 = 0.50;
pub const TAG_TEMPLATE_SCORE: f64 = 0.40;

const TEMPLATE_TAGS: &[&str] = &["button", "a", "input", "select", "textarea", "div", "span"];

const ROLE_WORDS: &[(&str, &[&str])] = &[("button", &["button", "btn"]), ("link", &["link", "lnk"])];

/// Stateless fallback that guesses selectors from attribute values and fixed
/// templates. Nothing is learned, so `train` always succeeds.
pub struct TemplatePredictor {
    parser: HtmlParser,
    max_predictions: usize,
}

impl Default for TemplatePredictor {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplatePredictor {
    pub fn new() -> Self {
        Self {
            parser: HtmlParser::new(),
            max_predictions: DEFAULT_MAX_PREDICTIONS,
        }
    }

    pub fn with_max_predictions(mut self, max: usize) -> Self {
        self.max_predictions = max;
        self
    }

    fn attribute_predictions(&self, html: &str, hints: &[&str]) -> Vec<Candidate> {
        let mut out = Vec::new();
        for el in self.parser.parse(html) {
            for (name, value) in &el.attributes {
                let lower = value.to_lowercase();
                if !hints.iter().any(|h| lower.contains(h)) {
                    continue;
                }
                let selector = match name.as_str() {
                    "id" => id_selector(value),
                    "class" => match el.class_selector() {
                        Some(s) => s,
                        None => continue,
                    },
                    other => format!("[{}='{}']", other, quote_attr(value)),
                };
                out.push(Candidate::css(selector, ATTRIBUTE_SCORE));
            }
        }
        out
    }

    fn xpath_predictions(hints: &[&str]) -> Vec<Candidate> {
        hints
            .iter()
            .flat_map(|hint| {
                [
                    Candidate::new(
                        SelectorType::XPath,
                        format!("//button[contains(text(), '{}')]", hint),
                        BUTTON_TEXT_XPATH_SCORE,
                    ),
                    Candidate::new(
                        SelectorType::XPath,
                        format!("//*[contains(text(), '{}')]", hint),
                        ANY_TEXT_XPATH_SCORE,
                    ),
                ]
            })
            .collect()
    }

    fn element_type_predictions(hints: &[&str]) -> Vec<Candidate> {
        let mut out = Vec::new();
        for tag in TEMPLATE_TAGS {
            for hint in hints {
                out.push(Candidate::css(format!("{}[id*='{}']", tag, hint), TAG_TEMPLATE_SCORE));
                out.push(Candidate::css(format!("{}[class*='{}']", tag, hint), TAG_TEMPLATE_SCORE));
            }
        }
        for hint in hints {
            out.push(Candidate::new(SelectorType::Text, *hint, TEXT_TEMPLATE_SCORE));
        }
        out
    }

    /// Role names are matched against every part of the locator id, so short
    /// words like `btn` count even though they are too short to be hints
    fn role_predictions(locator_id: &str) -> Vec<Candidate> {
        let lower = locator_id.to_lowercase();
        let parts: Vec<&str> = lower.split('_').collect();
        ROLE_WORDS
            .iter()
            .filter(|(_, words)| parts.iter().any(|p| words.contains(p)))
            .map(|(role, _)| Candidate::new(SelectorType::Role, *role, ROLE_SCORE))
            .collect()
    }
}

impl Predictor for TemplatePredictor {
    fn predict(&self, locator_id: &str, html: &str, hints: &[String]) -> Vec<Candidate> {
        let lowered: Vec<String> = hints
            .iter()
            .filter(|h| h.chars().count() > 3)
            .map(|h| h.to_lowercase())
            .collect();
        let hints: Vec<&str> = lowered.iter().map(String::as_str).collect();

        let mut all = self.attribute_predictions(html, &hints);
        all.extend(Self::xpath_predictions(&hints));
        all.extend(Self::element_type_predictions(&hints));
        all.extend(Self::role_predictions(locator_id));

        let mut ranked = sort_and_dedupe(all);
        debug!("{} template predictions for '{}'", ranked.len(), locator_id);
        ranked.truncate(self.max_predictions);
        ranked
    }

    fn train(&mut self, _: &str, _: &str, _: &str, _: &SelectorType) -> bool {
        true
    }
}
