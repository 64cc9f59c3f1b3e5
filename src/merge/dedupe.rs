//! Greedy similarity clustering over findings.

use super::similarity::{evidence_proximity, text_similarity, SimilarityWeights};
use crate::schema::{Finding, ModeOutput};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// Clustering configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DedupeEngine {
    /// Minimum combined similarity for a finding to join a cluster
    pub similarity_threshold: f64,
    pub weights: SimilarityWeights,
    /// Pick the highest-confidence member as canonical instead of the
    /// first seen
    pub prefer_high_confidence: bool,
}

impl Default for DedupeEngine {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.7,
            weights: SimilarityWeights::default(),
            prefer_high_confidence: true,
        }
    }
}

/// A finding together with the mode that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterMember {
    pub mode_id: String,
    pub finding: Finding,
}

/// A group of similar findings with one canonical representative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindingCluster {
    /// Content-hash id, stable across runs for the same member texts
    pub id: String,
    pub canonical: Finding,
    pub members: Vec<ClusterMember>,
    /// Contributing mode ids, sorted and deduplicated
    pub modes: Vec<String>,
    pub avg_confidence: f64,
    pub max_confidence: f64,
}

/// Aggregate clustering statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupeStats {
    pub total_findings: usize,
    /// Distinct finding texts after lowercasing
    pub unique_texts: usize,
    pub cluster_count: usize,
    /// Clusters per input finding; 1.0 means nothing merged
    pub dedup_ratio: f64,
}

/// Clustering output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupeResult {
    pub clusters: Vec<FindingCluster>,
    pub stats: DedupeStats,
}

impl DedupeEngine {
    /// Cluster all findings across the given outputs.
    ///
    /// The walk order is deterministic: findings sorted by lowercased text,
    /// then mode id. Each unclustered finding seeds a cluster; later
    /// findings join the first seed they clear the threshold against.
    pub fn cluster(&self, outputs: &[ModeOutput]) -> DedupeResult {
        let mut items: Vec<ClusterMember> = outputs
            .iter()
            .flat_map(|o| {
                o.top_findings.iter().map(|f| ClusterMember {
                    mode_id: o.mode_id.clone(),
                    finding: f.clone(),
                })
            })
            .collect();
        items.sort_by(|a, b| {
            (a.finding.text.to_lowercase(), &a.mode_id)
                .cmp(&(b.finding.text.to_lowercase(), &b.mode_id))
        });

        let total_findings = items.len();
        let unique_texts = items
            .iter()
            .map(|m| m.finding.text.to_lowercase())
            .collect::<BTreeSet<_>>()
            .len();

        let mut assigned = vec![false; items.len()];
        let mut clusters: Vec<Vec<usize>> = Vec::new();

        for seed in 0..items.len() {
            if assigned[seed] {
                continue;
            }
            assigned[seed] = true;
            let mut members = vec![seed];

            for candidate in (seed + 1)..items.len() {
                if assigned[candidate] {
                    continue;
                }
                if self.similarity(&items[seed].finding, &items[candidate].finding)
                    >= self.similarity_threshold
                {
                    assigned[candidate] = true;
                    members.push(candidate);
                }
            }
            clusters.push(members);
        }

        let mut clusters: Vec<FindingCluster> = clusters
            .into_iter()
            .map(|member_idxs| self.build_cluster(&items, &member_idxs))
            .collect();
        clusters.sort_by(|a, b| a.id.cmp(&b.id));

        let cluster_count = clusters.len();
        DedupeResult {
            clusters,
            stats: DedupeStats {
                total_findings,
                unique_texts,
                cluster_count,
                dedup_ratio: if total_findings == 0 {
                    1.0
                } else {
                    cluster_count as f64 / total_findings as f64
                },
            },
        }
    }

    /// Combined similarity between two findings.
    pub fn similarity(&self, a: &Finding, b: &Finding) -> f64 {
        let text = text_similarity(&a.text, &b.text);
        let evidence = evidence_proximity(a.evidence.as_deref(), b.evidence.as_deref());
        self.weights.combine(text, evidence)
    }

    fn build_cluster(&self, items: &[ClusterMember], member_idxs: &[usize]) -> FindingCluster {
        let members: Vec<ClusterMember> = member_idxs.iter().map(|&i| items[i].clone()).collect();

        let canonical = if self.prefer_high_confidence {
            members
                .iter()
                .max_by(|a, b| {
                    a.finding
                        .confidence
                        .partial_cmp(&b.finding.confidence)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|m| m.finding.clone())
                .unwrap_or_else(|| members[0].finding.clone())
        } else {
            members[0].finding.clone()
        };

        let mut modes: Vec<String> = members.iter().map(|m| m.mode_id.clone()).collect();
        modes.sort();
        modes.dedup();

        let confidences: Vec<f64> = members.iter().map(|m| m.finding.confidence).collect();
        let avg_confidence = confidences.iter().sum::<f64>() / confidences.len() as f64;
        let max_confidence = confidences.iter().cloned().fold(0.0, f64::max);

        FindingCluster {
            id: cluster_id(&members),
            canonical,
            members,
            modes,
            avg_confidence,
            max_confidence,
        }
    }
}

/// `"clu-"` plus the first 8 hex chars of sha256 over the sorted member
/// texts.
fn cluster_id(members: &[ClusterMember]) -> String {
    let mut texts: Vec<&str> = members.iter().map(|m| m.finding.text.as_str()).collect();
    texts.sort();

    let mut hasher = Sha256::new();
    for text in texts {
        hasher.update(text.as_bytes());
        hasher.update([0u8]);
    }
    let digest = hasher.finalize();
    let hex: String = digest.iter().take(4).map(|b| format!("{:02x}", b)).collect();
    format!("clu-{}", hex)
}
