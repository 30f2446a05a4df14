//! Prediction fallback
//!
//! Last stage of the cascade. A [`Predictor`] proposes ranked candidates for a
//! locator the heuristics could not place, and is told about every selector
//! that eventually resolved so it can propose it again later.
//!
//! "Prediction" here is a deterministic ranking, not a learned model.

pub mod model;
pub mod templates;

pub use model::{CasePredictor, ModelData, TrainedCase};
pub use templates::TemplatePredictor;

use log::info;

use crate::healer::Candidate;
use crate::store::SelectorType;
use crate::utils::config::{Config, PredictorKind};

pub trait Predictor {
    /// Ranked candidates for `locator_id`, best first. `html` may be empty
    /// when no snapshot could be taken.
    fn predict(&self, locator_id: &str, html: &str, hints: &[String]) -> Vec<Candidate>;

    /// Record a selector that resolved `locator_id`. `selector_type` is a base
    /// type. Returns `false` if the outcome could not be persisted.
    fn train(
        &mut self,
        locator_id: &str,
        html: &str,
        selector: &str,
        selector_type: &SelectorType,
    ) -> bool;
}

/// Build the predictor selected in the configuration
pub fn build_predictor(config: &Config) -> Option<Box<dyn Predictor>> {
    match config.predictor {
        PredictorKind::Cases => {
            let predictor =
                CasePredictor::open(&config.model_path).with_max_predictions(config.max_predictions);
            Some(Box::new(predictor))
        }
        PredictorKind::Templates => Some(Box::new(
            TemplatePredictor::new().with_max_predictions(config.max_predictions),
        )),
        PredictorKind::None => {
            info!("Prediction fallback disabled");
            None
        }
    }
}
