//! Locator resolution and self-healing

pub mod candidate;
pub mod engine;
pub mod generator;
pub mod hints;
pub mod page;
pub mod trace;

#[cfg(test)]
pub(crate) mod testing;

pub use candidate::{sort_and_dedupe, Candidate, MAX_SCORE};
pub use engine::{EngineContext, ResolutionEngine, ResolveOptions};
pub use generator::CandidateGenerator;
pub use hints::{hint_tokens, KindFilter};
pub use page::{playwright_selector, ElementHandle, PageAdapter, WaitOutcome};
pub use trace::{AttemptRecord, AttemptResult, ResolveTrace, Stage, StageRecord, StageResult};
