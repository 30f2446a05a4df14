use crate::dom::ElementKind;
use crate::store::SelectorType;

/// Highest score any candidate can carry after rescaling
pub const MAX_SCORE: f64 = 0.99;

/// A scored selector produced for one resolution call. Never persisted
/// directly; only its (type, selector) survives as a new strategy on success.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub selector_type: SelectorType,
    pub selector: String,
    pub score: f64,
    /// Actual kind of the element the candidate was derived from, when known
    pub element_kind: Option<ElementKind>,
}

impl Candidate {
    pub fn new(selector_type: SelectorType, selector: impl Into<String>, score: f64) -> Self {
        Self {
            selector_type,
            selector: selector.into(),
            score: score.clamp(0.0, MAX_SCORE),
            element_kind: None,
        }
    }

    pub fn css(selector: impl Into<String>, score: f64) -> Self {
        Self::new(SelectorType::Css, selector, score)
    }

    pub fn with_kind(mut self, kind: ElementKind) -> Self {
        self.element_kind = Some(kind);
        self
    }

    pub fn same_target(&self, other: &Candidate) -> bool {
        self.selector_type == other.selector_type && self.selector == other.selector
    }
}

/// Stable sort by score descending, then drop repeated (type, selector) pairs
/// keeping the first (highest ranked) occurrence.
pub fn sort_and_dedupe(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut unique: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !unique.iter().any(|kept| kept.same_target(&candidate)) {
            unique.push(candidate);
        }
    }
    unique
}
