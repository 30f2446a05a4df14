pub mod dom;
pub mod error;
pub mod healer;
pub mod maintenance;
pub mod predict;
pub mod store;
pub mod utils;

// Re-export common items
pub use error::{ElementNotFound, HealError, RealizationError};
pub use healer::{ElementHandle, EngineContext, PageAdapter, ResolutionEngine, ResolveOptions};
pub use predict::{build_predictor, CasePredictor, Predictor, TemplatePredictor};
pub use store::{SelectorType, Strategy, StrategyStore};
pub use utils::config::{Config, ConfigLoader};
