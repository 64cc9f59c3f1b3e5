//! # ensemble-core
//!
//! A multi-agent reasoning ensemble orchestration library. Drives a fleet
//! of terminal-pane agents, each running a distinct reasoning mode,
//! captures and validates their structured outputs, merges and
//! deduplicates findings across modes, and synthesizes one combined answer
//! under enforced token and wall-clock budgets.
//!
//! ## Core Components
//!
//! - **Catalog**: the reasoning mode taxonomy and validated mode catalog
//! - **Preset**: named ensembles layered from embedded, user, and project
//!   config
//! - **Plan**: deterministic mode-to-pane assignment strategies
//! - **Capture**: scrollback scraping, block extraction, schema validation
//! - **Merge**: similarity clustering and the multi-axis mechanical merger
//! - **Synthesis**: strategy-driven combination with streaming progress
//! - **Engine**: the per-session orchestration loop
//!
//! ## Example
//!
//! ```rust,ignore
//! use ensemble_core::{builtin_catalog, plan_round_robin};
//!
//! let catalog = builtin_catalog();
//! let modes: Vec<String> = catalog
//!     .by_tier(ensemble_core::Tier::Core)
//!     .iter()
//!     .map(|m| m.id.clone())
//!     .collect();
//! let plan = plan_round_robin(&modes, &panes)?;
//! ```

pub mod audit;
pub mod budget;
pub mod capture;
pub mod catalog;
pub mod collect;
pub mod context;
pub mod engine;
pub mod error;
pub mod merge;
pub mod plan;
pub mod preamble;
pub mod preset;
pub mod schema;
pub mod session;
pub mod store;
pub mod synthesis;

#[cfg(test)]
mod invariants;

// Re-exports for convenience
pub use audit::{build_audit, AuditReport, ConflictReport};
pub use budget::{BudgetConfig, BudgetState, BudgetTracker, SpendDecision};
pub use capture::{
    capture_assignment, estimate_tokens, extract_structured, parse_capture, strip_ansi,
    CapturedOutput, ContentHint, PaneProvider, DEFAULT_SCROLLBACK_LINES,
};
pub use catalog::{
    builtin_catalog, validate_mode_id, Category, ModeCatalog, ModeCode, ReasoningMode, Tier,
    UiHints,
};
pub use collect::{CollectionResult, CollectorConfig, OutputCollector};
pub use context::{ContextPack, ProjectBrief, UserContext};
pub use engine::{AgentDispatcher, AgentWaiter, EngineConfig, EnsembleEngine, RunOutcome};
pub use error::{Error, Result};
pub use merge::{
    classify_action, ActionType, Conflict, ConflictKind, DedupeEngine, DedupeResult,
    FindingCluster, MergeEngine, MergedOutputs, SimilarityWeights,
};
pub use plan::{
    category_affinities, plan_category_affinity, plan_explicit, plan_round_robin,
    validate_assignments, AgentType, Pane, PaneRef,
};
pub use preamble::{
    load_preamble, validate_preamble, verify_coverage, PreambleFile, MAX_PREAMBLE_TOKENS,
    REQUIRED_SECTIONS,
};
pub use preset::{
    CacheConfig, EnsemblePreset, ModeRef, PresetRegistry, PresetSource, SynthesisConfig,
};
pub use schema::{
    impact_weight, normalize_output, parse_mode_output, validate_output, FieldError, Finding,
    Impact, ModeOutput, Recommendation, Risk, SCHEMA_VERSION,
};
pub use session::{AssignmentStatus, EnsembleSession, ModeAssignment, SessionStatus};
pub use store::SessionStore;
pub use synthesis::{
    build_synthesis_prompt, parse_synthesis_output, resolve_strategy, ChunkKind, ModeContribution,
    RankedFinding, RankedRecommendation, RankedRisk, ResolvedStrategy, StrategyInfo,
    SynthesisChunk, SynthesisEngine, SynthesisInput, SynthesisOutcome, SynthesisPrompt,
    SynthesisResult, SynthesisStream, STRATEGIES,
};
