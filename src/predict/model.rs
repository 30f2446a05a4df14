use log::{debug, error, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use super::Predictor;
use crate::dom::ElementKind;
use crate::error::HealError;
use crate::healer::Candidate;
use crate::store::SelectorType;
use crate::utils::clock::now_secs;

pub const LOCATOR_ID_SCORE: f64 = 0.80;
pub const TRAINED_CASE_SCORE: f64 = 0.75;
pub const HINT_TEXT_SCORE: f64 = 0.70;
pub const HINT_XPATH_SCORE: f64 = 0.60;
pub const DEFAULT_MAX_PREDICTIONS: usize = 10;

const MODEL_VERSION: &str = "1.0";

/// Locator-name patterns per element kind. Diagnostic only; they never
/// affect scores.
static KIND_PATTERNS: LazyLock<Vec<(ElementKind, Regex)>> = LazyLock::new(|| {
    vec![
        (ElementKind::Button, Regex::new(r"btn|button|submit|onclick|clickable").unwrap()),
        (ElementKind::Link, Regex::new(r"link|href|url|goto|navigate").unwrap()),
        (ElementKind::Input, Regex::new(r"input|text|password|email|form|field|entry").unwrap()),
        (ElementKind::Checkbox, Regex::new(r"checkbox|check|tick").unwrap()),
        (ElementKind::Select, Regex::new(r"dropdown|select|combobox|option|menu").unwrap()),
    ]
});

fn likely_kinds(locator_id: &str) -> Vec<ElementKind> {
    let lower = locator_id.to_lowercase();
    KIND_PATTERNS
        .iter()
        .filter(|(_, re)| re.is_match(&lower))
        .map(|(kind, _)| *kind)
        .collect()
}

fn default_selector_type() -> SelectorType {
    SelectorType::Css
}

fn default_version() -> String {
    MODEL_VERSION.to_string()
}

/// One selector that resolved a locator, as recorded in the model file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedCase {
    pub locator_id: String,
    pub selector: String,
    #[serde(default = "default_selector_type")]
    pub selector_type: SelectorType,
    #[serde(default)]
    pub timestamp: f64,
}

/// Model file contents. Keys this crate does not use are carried through
/// rewrites untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelData {
    #[serde(default)]
    pub trained_cases: Vec<TrainedCase>,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "now_secs")]
    pub created_at: f64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for ModelData {
    fn default() -> Self {
        let mut extra = BTreeMap::new();
        extra.insert("locator_patterns".to_string(), serde_json::json!({}));
        Self {
            trained_cases: Vec::new(),
            version: default_version(),
            created_at: now_secs(),
            extra,
        }
    }
}

/// Predictor backed by an append-only log of trained cases
pub struct CasePredictor {
    path: Option<PathBuf>,
    data: ModelData,
    max_predictions: usize,
}

impl CasePredictor {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: ModelData::default(),
            max_predictions: DEFAULT_MAX_PREDICTIONS,
        }
    }

    /// Open the model file. A missing or unreadable file starts a fresh model
    /// that replaces it on the first `train`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<ModelData>(&content) {
                Ok(data) => {
                    info!(
                        "Loaded {} trained cases from {}",
                        data.trained_cases.len(),
                        path.display()
                    );
                    data
                }
                Err(e) => {
                    error!("Model file {} is corrupt: {}; starting fresh", path.display(), e);
                    ModelData::default()
                }
            },
            Err(_) => {
                info!("No model file at {}, starting fresh", path.display());
                ModelData::default()
            }
        };

        Self {
            path: Some(path),
            data,
            max_predictions: DEFAULT_MAX_PREDICTIONS,
        }
    }

    pub fn with_max_predictions(mut self, max: usize) -> Self {
        self.max_predictions = max;
        self
    }

    pub fn data(&self) -> &ModelData {
        &self.data
    }

    pub fn trained_cases(&self) -> &[TrainedCase] {
        &self.data.trained_cases
    }

    /// Rewrite the whole model file
    pub fn save(&self) -> Result<(), HealError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        write_model(path, &self.data)
    }
}

fn write_model(path: &Path, data: &ModelData) -> Result<(), HealError> {
    let persistence = |reason: String| HealError::Persistence {
        path: path.to_path_buf(),
        reason,
    };

    let json = serde_json::to_string_pretty(data).map_err(|e| persistence(e.to_string()))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| persistence(e.to_string()))?;
    }
    std::fs::write(path, json).map_err(|e| persistence(e.to_string()))
}

impl Predictor for CasePredictor {
    fn predict(&self, locator_id: &str, _html: &str, hints: &[String]) -> Vec<Candidate> {
        debug!(
            "Predicting '{}' (likely kinds: {:?})",
            locator_id,
            likely_kinds(locator_id)
        );

        let mut predictions = vec![Candidate::css(format!("#{}", locator_id), LOCATOR_ID_SCORE)];

        for hint in hints.iter().filter(|h| h.chars().count() > 3) {
            predictions.push(Candidate::new(SelectorType::Text, hint.clone(), HINT_TEXT_SCORE));
            predictions.push(Candidate::new(
                SelectorType::XPath,
                format!("//*[contains(text(), '{}')]", hint),
                HINT_XPATH_SCORE,
            ));
        }

        // Every case, whatever locator it was trained for and whether or not
        // it appears on the current page
        for case in &self.data.trained_cases {
            predictions.push(Candidate::new(
                case.selector_type.clone(),
                case.selector.clone(),
                TRAINED_CASE_SCORE,
            ));
        }

        predictions.sort_by(|a, b| b.score.total_cmp(&a.score));
        predictions.truncate(self.max_predictions);
        predictions
    }

    fn train(
        &mut self,
        locator_id: &str,
        _html: &str,
        selector: &str,
        selector_type: &SelectorType,
    ) -> bool {
        self.data.trained_cases.push(TrainedCase {
            locator_id: locator_id.to_string(),
            selector: selector.to_string(),
            selector_type: selector_type.base().clone(),
            timestamp: now_secs(),
        });

        match self.save() {
            Ok(()) => {
                info!("Trained '{}' with {} '{}'", locator_id, selector_type, selector);
                true
            }
            Err(e) => {
                warn!("{}; case kept in memory", e);
                false
            }
        }
    }
}
