//! Resolution engine
//!
//! Resolves a locator id to a live element through a fixed cascade:
//!
//! 1. **TRY_STORE**: strategies that worked before, in priority order
//! 2. **TRY_ORIGINAL**: the caller's own CSS selector, if any
//! 3. **TRY_HEURISTIC**: candidates ranked from the current DOM snapshot
//! 4. **TRY_PREDICTED**: candidates proposed by the configured predictor
//!
//! The first visible (and, for steps 3 and 4, type-compatible) element wins.
//! Whatever resolved it is written back to the strategy store so the next
//! call succeeds at step 1.

use log::{debug, error, info, warn};

use super::candidate::{sort_and_dedupe, Candidate};
use super::generator::CandidateGenerator;
use super::hints::KindFilter;
use super::page::{ElementHandle, PageAdapter, WaitOutcome};
use super::trace::{AttemptResult, ResolveTrace, Stage, StageRecorder, StageResult};
use crate::dom::{DomParser, HtmlParser};
use crate::error::{ElementNotFound, HealError};
use crate::predict::{build_predictor, Predictor};
use crate::store::{SelectorType, Strategy, StrategyStore};
use crate::utils::config::Config;

pub const DEFAULT_LOG_TARGET: &str = "lumi_healer::engine";

/// Explicit context handed to the engine at construction
#[derive(Debug, Clone)]
pub struct EngineContext {
    /// Target used for every log record the engine emits
    pub log_target: String,
    pub config: Config,
}

impl EngineContext {
    pub fn new(config: Config) -> Self {
        Self {
            log_target: DEFAULT_LOG_TARGET.to_string(),
            config,
        }
    }

    pub fn with_log_target(mut self, target: impl Into<String>) -> Self {
        self.log_target = target.into();
        self
    }

    pub fn target(&self) -> &str {
        &self.log_target
    }
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

/// Per-call options for [`ResolutionEngine::resolve`]
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Overrides the store/original wait
    pub timeout_ms: Option<u64>,
    /// CSS selector the caller used before healing existed
    pub fallback_selector: Option<String>,
}

impl ResolveOptions {
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_fallback(mut self, selector: impl Into<String>) -> Self {
        self.fallback_selector = Some(selector.into());
        self
    }
}

enum StageOutcome<H> {
    Resolved(H),
    Skipped(String),
    Failed,
}

pub struct ResolutionEngine<P: PageAdapter> {
    page: P,
    store: StrategyStore,
    predictor: Option<Box<dyn Predictor>>,
    parser: Box<dyn DomParser>,
    ctx: EngineContext,
    last_trace: Option<ResolveTrace>,
}

impl<P: PageAdapter> ResolutionEngine<P> {
    /// Engine without a prediction stage, parsing snapshots with [`HtmlParser`]
    pub fn new(page: P, store: StrategyStore, ctx: EngineContext) -> Self {
        Self {
            page,
            store,
            predictor: None,
            parser: Box::new(HtmlParser::new()),
            ctx,
            last_trace: None,
        }
    }

    /// File-backed store and predictor as named in the configuration
    pub fn from_config(page: P, config: Config) -> Self {
        let store = StrategyStore::open(&config.store_path);
        let predictor = build_predictor(&config);
        let mut engine = Self::new(page, store, EngineContext::new(config));
        engine.predictor = predictor;
        engine
    }

    pub fn with_predictor(mut self, predictor: Box<dyn Predictor>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn with_parser(mut self, parser: Box<dyn DomParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn store(&self) -> &StrategyStore {
        &self.store
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    /// Trace of the most recent `resolve` call
    pub fn last_trace(&self) -> Option<&ResolveTrace> {
        self.last_trace.as_ref()
    }

    /// Pre-seed a strategy for a locator. Returns `false` if already known.
    pub fn register(&mut self, locator_id: &str, strategy: Strategy) -> bool {
        let added = self.store.register(locator_id, strategy);
        if added {
            info!(target: self.ctx.target(), "Registered strategy for '{}'", locator_id);
        }
        added
    }

    /// Resolve `locator_id` to a visible element, healing if needed
    pub fn resolve(
        &mut self,
        locator_id: &str,
        options: ResolveOptions,
    ) -> Result<P::Handle, ElementNotFound> {
        info!(target: self.ctx.target(), "Resolving '{}'", locator_id);

        let mut trace = ResolveTrace::new(locator_id);
        let wait_ms = options.timeout_ms.unwrap_or(self.ctx.config.store_timeout_ms);
        let mut snapshot: Option<String> = None;

        let found = self
            .run_stage(&mut trace, Stage::TryStore, |e, rec| {
                e.try_store(locator_id, wait_ms, rec)
            })
            .or_else(|| {
                self.run_stage(&mut trace, Stage::TryOriginal, |e, rec| {
                    e.try_original(locator_id, options.fallback_selector.as_deref(), wait_ms, rec)
                })
            })
            .or_else(|| {
                self.run_stage(&mut trace, Stage::TryHeuristic, |e, rec| {
                    e.try_heuristic(locator_id, &mut snapshot, rec)
                })
            })
            .or_else(|| {
                self.run_stage(&mut trace, Stage::TryPredicted, |e, rec| {
                    e.try_predicted(locator_id, snapshot.as_deref().unwrap_or(""), rec)
                })
            });

        let result = match found {
            Some(handle) => {
                trace.finish(Stage::Resolved);
                Ok(handle)
            }
            None => {
                trace.finish(Stage::Failed);
                let err = ElementNotFound {
                    locator_id: locator_id.to_string(),
                    attempts: trace.attempt_count(),
                };
                error!(target: self.ctx.target(), "{}", err);
                Err(err)
            }
        };

        self.last_trace = Some(trace);
        result
    }

    fn run_stage<F>(&mut self, trace: &mut ResolveTrace, stage: Stage, run: F) -> Option<P::Handle>
    where
        F: FnOnce(&mut Self, &mut StageRecorder) -> StageOutcome<P::Handle>,
    {
        let mut rec = StageRecorder::start(stage);
        let outcome = run(self, &mut rec);

        let (result, handle) = match outcome {
            StageOutcome::Resolved(handle) => (StageResult::Resolved, Some(handle)),
            StageOutcome::Skipped(reason) => {
                debug!(target: self.ctx.target(), "{:?} skipped: {}", stage, reason);
                (StageResult::Skipped { reason }, None)
            }
            StageOutcome::Failed => (StageResult::Failed, None),
        };
        trace.push(rec.finish(result));
        handle
    }

    /// Build a handle, rejecting types no adapter can realize
    fn realize(&self, selector_type: &SelectorType, selector: &str) -> Result<P::Handle, HealError> {
        let base = selector_type.base();
        let rejected = |reason: String| HealError::CandidateRealization {
            selector_type: selector_type.to_string(),
            selector: selector.to_string(),
            reason,
        };

        if let SelectorType::Unknown(raw) = base {
            return Err(rejected(format!("unsupported selector type '{}'", raw)));
        }
        self.page
            .realize(base, selector)
            .map_err(|e| rejected(e.reason))
    }

    /// Realize and wait. Records the attempt and returns the visible handle.
    fn attempt_visible(
        &self,
        selector_type: &SelectorType,
        selector: &str,
        score: Option<f64>,
        timeout_ms: u64,
        rec: &mut StageRecorder,
    ) -> Option<P::Handle> {
        let handle = match self.realize(selector_type, selector) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(target: self.ctx.target(), "{}", e);
                rec.attempt(
                    selector_type,
                    selector,
                    score,
                    AttemptResult::Rejected {
                        reason: e.to_string(),
                    },
                );
                return None;
            }
        };

        if handle.wait_visible(timeout_ms) == WaitOutcome::TimedOut {
            let e = HealError::TimeoutExceeded {
                selector: selector.to_string(),
                timeout_ms,
            };
            debug!(target: self.ctx.target(), "{}", e);
            rec.attempt(selector_type, selector, score, AttemptResult::Timeout { timeout_ms });
            return None;
        }

        Some(handle)
    }

    /// Try ranked candidates in order, stopping at the first visible element
    /// of a kind the locator name allows
    fn attempt_candidates(
        &self,
        candidates: &[Candidate],
        filter: &KindFilter,
        rec: &mut StageRecorder,
    ) -> Option<(P::Handle, Candidate)> {
        let config = &self.ctx.config;

        for (i, candidate) in candidates.iter().take(config.max_candidate_attempts).enumerate() {
            info!(
                target: self.ctx.target(),
                "Trying candidate {}/{}: {} '{}' (score {:.2})",
                i + 1,
                candidates.len().min(config.max_candidate_attempts),
                candidate.selector_type,
                candidate.selector,
                candidate.score
            );

            let Some(handle) = self.attempt_visible(
                &candidate.selector_type,
                &candidate.selector,
                Some(candidate.score),
                config.candidate_timeout_ms,
                rec,
            ) else {
                continue;
            };

            let actual = handle.kind();
            if !filter.accepts(actual) {
                let tag = handle.tag_or_role();
                debug!(
                    target: self.ctx.target(),
                    "'{}' is a {} ({}), not what the locator asks for",
                    candidate.selector, actual, tag
                );
                rec.attempt(
                    &candidate.selector_type,
                    &candidate.selector,
                    Some(candidate.score),
                    AttemptResult::WrongKind { actual: tag },
                );
                continue;
            }

            rec.attempt(
                &candidate.selector_type,
                &candidate.selector,
                Some(candidate.score),
                AttemptResult::Visible,
            );
            return Some((handle, candidate.clone()));
        }
        None
    }

    fn try_store(
        &mut self,
        locator_id: &str,
        wait_ms: u64,
        rec: &mut StageRecorder,
    ) -> StageOutcome<P::Handle> {
        let strategies = self.store.strategies(locator_id).to_vec();
        if strategies.is_empty() {
            return StageOutcome::Skipped("no stored strategies".to_string());
        }

        for strategy in &strategies {
            if let Some(handle) =
                self.attempt_visible(&strategy.selector_type, &strategy.selector, None, wait_ms, rec)
            {
                rec.attempt(
                    &strategy.selector_type,
                    &strategy.selector,
                    None,
                    AttemptResult::Visible,
                );
                self.store.promote(locator_id, strategy);
                info!(
                    target: self.ctx.target(),
                    "Resolved '{}' from store: {} '{}'",
                    locator_id, strategy.selector_type, strategy.selector
                );
                return StageOutcome::Resolved(handle);
            }
        }
        StageOutcome::Failed
    }

    fn try_original(
        &mut self,
        locator_id: &str,
        selector: Option<&str>,
        wait_ms: u64,
        rec: &mut StageRecorder,
    ) -> StageOutcome<P::Handle> {
        let Some(selector) = selector.filter(|s| !s.trim().is_empty()) else {
            return StageOutcome::Skipped("no fallback selector".to_string());
        };

        match self.attempt_visible(&SelectorType::Css, selector, None, wait_ms, rec) {
            Some(handle) => {
                rec.attempt(&SelectorType::Css, selector, None, AttemptResult::Visible);
                self.store.record_success(locator_id, SelectorType::Css, selector);
                info!(
                    target: self.ctx.target(),
                    "Resolved '{}' with its original selector '{}'", locator_id, selector
                );
                StageOutcome::Resolved(handle)
            }
            None => StageOutcome::Failed,
        }
    }

    fn try_heuristic(
        &mut self,
        locator_id: &str,
        snapshot: &mut Option<String>,
        rec: &mut StageRecorder,
    ) -> StageOutcome<P::Handle> {
        let html = match self.page.snapshot() {
            Ok(html) => html,
            Err(e) => {
                warn!(target: self.ctx.target(), "DOM snapshot failed: {:#}", e);
                *snapshot = Some(String::new());
                return StageOutcome::Skipped(format!("snapshot failed: {}", e));
            }
        };

        let generator = CandidateGenerator::new(locator_id);
        let elements = self.parser.parse(&html);
        let candidates = generator.rank(&elements);
        *snapshot = Some(html);

        if candidates.is_empty() {
            return StageOutcome::Skipped("no heuristic candidates".to_string());
        }

        let Some((handle, winner)) = self.attempt_candidates(&candidates, generator.kind_filter(), rec)
        else {
            return StageOutcome::Failed;
        };

        let base = winner.selector_type.base().clone();
        self.store.record_success(locator_id, base.clone(), &winner.selector);
        if let Some(predictor) = self.predictor.as_mut() {
            let html = snapshot.as_deref().unwrap_or("");
            if !predictor.train(locator_id, html, &winner.selector, &base) {
                warn!(target: self.ctx.target(), "Could not persist training for '{}'", locator_id);
            }
        }

        info!(
            target: self.ctx.target(),
            "Healed '{}' with {} '{}'", locator_id, base, winner.selector
        );
        StageOutcome::Resolved(handle)
    }

    fn try_predicted(
        &mut self,
        locator_id: &str,
        html: &str,
        rec: &mut StageRecorder,
    ) -> StageOutcome<P::Handle> {
        let Some(predictor) = self.predictor.as_ref() else {
            return StageOutcome::Skipped("no predictor configured".to_string());
        };

        let generator = CandidateGenerator::new(locator_id);
        let candidates = sort_and_dedupe(predictor.predict(locator_id, html, generator.hints()));
        if candidates.is_empty() {
            return StageOutcome::Skipped("no predictions".to_string());
        }

        let Some((handle, winner)) = self.attempt_candidates(&candidates, generator.kind_filter(), rec)
        else {
            return StageOutcome::Failed;
        };

        let base = winner.selector_type.base().clone();
        self.store
            .record_success(locator_id, base.predicted(), &winner.selector);
        if let Some(predictor) = self.predictor.as_mut() {
            if !predictor.train(locator_id, html, &winner.selector, &base) {
                warn!(target: self.ctx.target(), "Could not persist training for '{}'", locator_id);
            }
        }

        info!(
            target: self.ctx.target(),
            "Predicted '{}' with {} '{}'", locator_id, base, winner.selector
        );
        StageOutcome::Resolved(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::healer::testing::FakePage;
    use crate::predict::{CasePredictor, TemplatePredictor};

    fn engine(page: FakePage) -> ResolutionEngine<FakePage> {
        ResolutionEngine::new(page, StrategyStore::in_memory(), EngineContext::default())
    }

    fn stored(engine: &ResolutionEngine<FakePage>, id: &str) -> Vec<(String, String)> {
        engine
            .store()
            .strategies(id)
            .iter()
            .map(|s| (s.selector_type.to_string(), s.selector.clone()))
            .collect()
    }

    fn pair(ty: &str, sel: &str) -> (String, String) {
        (ty.to_string(), sel.to_string())
    }

    #[test]
    fn test_heals_from_exact_id_on_empty_store() {
        let page = FakePage::new(r#"<html><body><input id="search_box"></body></html>"#)
            .with_element(SelectorType::Css, "#search_box", "input");
        let mut engine = engine(page);

        assert!(engine.resolve("search_box", ResolveOptions::default()).is_ok());
        assert_eq!(stored(&engine, "search_box"), vec![pair("css", "#search_box")]);

        let trace = engine.last_trace().unwrap();
        assert!(trace.is_resolved());
        assert!(matches!(
            trace.stage(Stage::TryStore).unwrap().result,
            StageResult::Skipped { .. }
        ));
        assert!(matches!(
            trace.stage(Stage::TryOriginal).unwrap().result,
            StageResult::Skipped { .. }
        ));
        assert_eq!(
            trace.stage(Stage::TryHeuristic).unwrap().result,
            StageResult::Resolved
        );
        assert!(trace.stage(Stage::TryPredicted).is_none());
    }

    #[test]
    fn test_working_lower_strategy_is_promoted() {
        let page = FakePage::new("<div></div>").with_element(SelectorType::Css, "#works", "button");
        let mut engine = engine(page);
        engine.register("pay", Strategy::new(SelectorType::Css, "#broken"));
        engine.register("pay", Strategy::new(SelectorType::Css, "#works"));

        assert!(engine.resolve("pay", ResolveOptions::default()).is_ok());
        assert_eq!(
            stored(&engine, "pay"),
            vec![pair("css", "#works"), pair("css", "#broken")]
        );
        assert_eq!(engine.page().snapshot_calls.get(), 0);
    }

    #[test]
    fn test_not_found_without_match_or_predictor() {
        let page = FakePage::new("<div><p>Welcome</p></div>");
        let mut engine = engine(page);

        let err = engine
            .resolve("checkout_button", ResolveOptions::default())
            .unwrap_err();
        assert_eq!(err.locator_id, "checkout_button");
        assert!(engine.store().strategies("checkout_button").is_empty());

        let trace = engine.last_trace().unwrap();
        assert_eq!(trace.final_stage, Some(Stage::Failed));
        assert!(matches!(
            trace.stage(Stage::TryPredicted).unwrap().result,
            StageResult::Skipped { .. }
        ));
    }

    #[test]
    fn test_first_stored_strategy_short_circuits() {
        let page = FakePage::new(r#"<input id="search_box">"#)
            .with_element(SelectorType::Css, "#q", "input")
            .with_element(SelectorType::Css, "#search_box", "input");
        let mut engine = engine(page);
        engine.register("search_box", Strategy::new(SelectorType::Css, "#q"));

        assert!(engine
            .resolve("search_box", ResolveOptions::default().with_fallback("#search_box"))
            .is_ok());
        assert_eq!(engine.page().realize_calls.get(), 1);
        assert_eq!(engine.page().snapshot_calls.get(), 0);
        assert_eq!(engine.last_trace().unwrap().stages.len(), 1);
    }

    #[test]
    fn test_repeated_resolution_is_idempotent() {
        let page = FakePage::new(r#"<input id="search_box">"#)
            .with_element(SelectorType::Css, "#search_box", "input");
        let mut engine = engine(page);

        engine.resolve("search_box", ResolveOptions::default()).unwrap();
        let after_first = stored(&engine, "search_box");
        engine.resolve("search_box", ResolveOptions::default()).unwrap();
        engine.resolve("search_box", ResolveOptions::default()).unwrap();

        assert_eq!(stored(&engine, "search_box"), after_first);
        assert_eq!(engine.page().snapshot_calls.get(), 1);
    }

    #[test]
    fn test_original_selector_is_recorded() {
        let page = FakePage::new("").with_element(SelectorType::Css, "#legacy-login", "button");
        let mut engine = engine(page);

        let options = ResolveOptions::default()
            .with_fallback("#legacy-login")
            .with_timeout(10);
        assert!(engine.resolve("login_button", options).is_ok());
        assert_eq!(stored(&engine, "login_button"), vec![pair("css", "#legacy-login")]);
        assert_eq!(engine.page().snapshot_calls.get(), 0);
    }

    #[test]
    fn test_wrong_kind_is_rejected_at_verification() {
        // The page changed between the snapshot and realization
        let page = FakePage::new(r#"<input id="search_box">"#)
            .with_element(SelectorType::Css, "#search_box", "a");
        let mut engine = engine(page);

        assert!(engine.resolve("search_box", ResolveOptions::default()).is_err());
        let heuristic = engine
            .last_trace()
            .unwrap()
            .stage(Stage::TryHeuristic)
            .unwrap()
            .clone();
        assert_eq!(heuristic.result, StageResult::Failed);
        assert_eq!(
            heuristic.attempts[0].result,
            AttemptResult::WrongKind {
                actual: "a".to_string()
            }
        );
    }

    #[test]
    fn test_candidate_attempts_are_bounded() {
        let html = (0..8)
            .map(|i| format!(r#"<div class="promo-{}">promo {}</div>"#, i, i))
            .collect::<String>();
        let mut engine = engine(FakePage::new(&html));

        assert!(engine.resolve("promo_banner", ResolveOptions::default()).is_err());
        let heuristic = engine
            .last_trace()
            .unwrap()
            .stage(Stage::TryHeuristic)
            .unwrap()
            .clone();
        assert_eq!(heuristic.attempts.len(), 5);
    }

    #[test]
    fn test_heuristic_success_trains_predictor() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model_data.json");
        let page = FakePage::new(r#"<input id="search_box">"#)
            .with_element(SelectorType::Css, "#search_box", "input");
        let mut engine = engine(page).with_predictor(Box::new(CasePredictor::open(&model)));

        engine.resolve("search_box", ResolveOptions::default()).unwrap();

        let reopened = CasePredictor::open(&model);
        assert_eq!(reopened.trained_cases().len(), 1);
        assert_eq!(reopened.trained_cases()[0].selector, "#search_box");
        assert_eq!(reopened.trained_cases()[0].selector_type, SelectorType::Css);
    }

    #[test]
    fn test_prediction_winner_is_stored_as_predicted() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model_data.json");
        let mut predictor = CasePredictor::open(&model);
        predictor.train("older_banner", "", ".promo-x", &SelectorType::Css);

        let page = FakePage::new("<div>Hello</div>").with_element(SelectorType::Css, ".promo-x", "div");
        let mut engine = engine(page).with_predictor(Box::new(predictor));

        assert!(engine.resolve("promo_banner", ResolveOptions::default()).is_ok());
        assert_eq!(
            stored(&engine, "promo_banner"),
            vec![pair("predicted_css", ".promo-x")]
        );

        let reopened = CasePredictor::open(&model);
        assert_eq!(reopened.trained_cases().len(), 2);
        assert_eq!(reopened.trained_cases()[1].locator_id, "promo_banner");
        assert_eq!(reopened.trained_cases()[1].selector_type, SelectorType::Css);

        // Next time the stored predicted strategy resolves directly
        engine.resolve("promo_banner", ResolveOptions::default()).unwrap();
        assert_eq!(
            engine.last_trace().unwrap().stages.last().unwrap().stage,
            Stage::TryStore
        );
    }

    #[test]
    fn test_from_config_writes_configured_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            store_path: dir.path().join("db.json"),
            model_path: dir.path().join("model.json"),
            ..Config::default()
        };
        let page = FakePage::new(r#"<input id="search_box">"#)
            .with_element(SelectorType::Css, "#search_box", "input");
        let mut engine = ResolutionEngine::from_config(page, config.clone());

        engine.resolve("search_box", ResolveOptions::default()).unwrap();

        let store = StrategyStore::load_strict(&config.store_path).unwrap();
        assert_eq!(store.strategies("search_box").len(), 1);
        assert_eq!(CasePredictor::open(&config.model_path).trained_cases().len(), 1);
    }

    #[test]
    fn test_snapshot_failure_falls_through_to_prediction() {
        let page = FakePage::new("")
            .failing_snapshot()
            .with_element(SelectorType::Role, "button", "button");
        let mut engine = engine(page).with_predictor(Box::new(TemplatePredictor::new()));

        assert!(engine.resolve("login_btn", ResolveOptions::default()).is_ok());
        let trace = engine.last_trace().unwrap();
        assert!(matches!(
            trace.stage(Stage::TryHeuristic).unwrap().result,
            StageResult::Skipped { .. }
        ));
        assert_eq!(stored(&engine, "login_btn"), vec![pair("predicted_role", "button")]);
    }

    #[test]
    fn test_unknown_stored_type_is_rejected_without_adapter_call() {
        let page = FakePage::new("").with_element(SelectorType::Css, "#ok", "div");
        let mut engine = engine(page);
        engine.register("logo", Strategy::new(SelectorType::parse("shadow"), "x-logo"));
        engine.register("logo", Strategy::new(SelectorType::Css, "#ok"));

        assert!(engine.resolve("logo", ResolveOptions::default()).is_ok());
        assert_eq!(engine.page().realize_calls.get(), 1);
        assert_eq!(
            stored(&engine, "logo"),
            vec![pair("css", "#ok"), pair("shadow", "x-logo")]
        );

        let store_stage = engine.last_trace().unwrap().stage(Stage::TryStore).unwrap().clone();
        assert!(matches!(
            store_stage.attempts[0].result,
            AttemptResult::Rejected { .. }
        ));
    }

    fn timeouts(trace: &ResolveTrace, stage: Stage) -> Vec<u64> {
        trace
            .stage(stage)
            .unwrap()
            .attempts
            .iter()
            .filter_map(|a| match a.result {
                AttemptResult::Timeout { timeout_ms } => Some(timeout_ms),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_stage_wait_windows() {
        let run = |options: ResolveOptions| {
            let page = FakePage::new(r#"<input id="search_box">"#);
            let mut engine = engine(page);
            engine.register("search_box", Strategy::new(SelectorType::Css, "#gone"));
            assert!(engine
                .resolve("search_box", options.with_fallback("#old"))
                .is_err());
            engine.last_trace().unwrap().clone()
        };

        let trace = run(ResolveOptions::default());
        assert_eq!(timeouts(&trace, Stage::TryStore), vec![5000]);
        assert_eq!(timeouts(&trace, Stage::TryOriginal), vec![5000]);
        let heuristic = timeouts(&trace, Stage::TryHeuristic);
        assert!(!heuristic.is_empty());
        assert!(heuristic.iter().all(|&ms| ms == 2000));

        // The per-call timeout only covers stored and original selectors
        let trace = run(ResolveOptions::default().with_timeout(750));
        assert_eq!(timeouts(&trace, Stage::TryStore), vec![750]);
        assert_eq!(timeouts(&trace, Stage::TryOriginal), vec![750]);
        assert!(timeouts(&trace, Stage::TryHeuristic).iter().all(|&ms| ms == 2000));
    }

    #[test]
    fn test_failed_original_falls_through_to_heuristic() {
        let page = FakePage::new(r#"<input id="search_box">"#)
            .with_element(SelectorType::Css, "#search_box", "input");
        let mut engine = engine(page);
        engine.register("search_box", Strategy::new(SelectorType::Css, "#gone"));

        assert!(engine
            .resolve("search_box", ResolveOptions::default().with_fallback("#old"))
            .is_ok());
        let trace = engine.last_trace().unwrap();
        assert_eq!(trace.stage(Stage::TryStore).unwrap().result, StageResult::Failed);
        assert_eq!(trace.stage(Stage::TryOriginal).unwrap().result, StageResult::Failed);
        assert_eq!(
            trace.stage(Stage::TryHeuristic).unwrap().result,
            StageResult::Resolved
        );
        assert_eq!(
            stored(&engine, "search_box"),
            vec![pair("css", "#search_box"), pair("css", "#gone")]
        );
    }

    #[test]
    fn test_select_is_accepted_for_input_locator() {
        let page = FakePage::new(r#"<select id="country-list"><option>NL</option></select>"#)
            .with_element(SelectorType::Css, "#country-list", "select");
        let mut engine = engine(page);

        assert!(engine.resolve("country_field", ResolveOptions::default()).is_ok());
        assert_eq!(stored(&engine, "country_field"), vec![pair("css", "#country-list")]);
    }

    #[test]
    fn test_adapter_rejection_is_recorded_and_skipped() {
        let page = FakePage::new("")
            .with_invalid(SelectorType::XPath, "//bad[")
            .with_element(SelectorType::Css, "#ok", "div");
        let mut engine = engine(page);
        engine.register("logo", Strategy::new(SelectorType::XPath, "//bad["));
        engine.register("logo", Strategy::new(SelectorType::Css, "#ok"));

        assert!(engine.resolve("logo", ResolveOptions::default()).is_ok());
        assert_eq!(engine.page().realize_calls.get(), 2);
    }
}
