//! Merge and dedup engines.
//!
//! Two deliberately separate code paths: the greedy similarity clusterer
//! ([`DedupeEngine`]) used for dedup statistics and canonical findings, and
//! the multi-axis mechanical merger ([`MergeEngine`]) that groups findings,
//! risks, and recommendations and detects cross-mode conflicts. They use
//! independent thresholds; tests pin both behaviors.

mod dedupe;
mod merger;
mod similarity;

pub use dedupe::{ClusterMember, DedupeEngine, DedupeResult, DedupeStats, FindingCluster};
pub use merger::{
    classify_action, ActionGroup, ActionType, AttributedRecommendation, AttributedRisk,
    Conflict, ConflictKind, EvidenceGroup, MergeEngine, MergedFinding, MergedOutputs,
    SeverityGroup,
};
pub use similarity::{
    evidence_proximity, jaccard, normalize_tokens, text_similarity, EvidencePointer,
    SimilarityWeights, STOP_WORDS,
};
