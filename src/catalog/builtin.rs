//! Embedded reasoning mode table.
//!
//! The builtin catalog is process-wide immutable after first use. Config
//! files can layer presets on top of it but never mutate it.

use super::types::{Category, ModeCode, ReasoningMode, Tier, UiHints};
use super::ModeCatalog;
use std::sync::OnceLock;

static BUILTIN: OnceLock<ModeCatalog> = OnceLock::new();

/// The embedded mode catalog. Covers every category; core-tier modes all
/// carry a preamble file.
pub fn builtin_catalog() -> &'static ModeCatalog {
    BUILTIN.get_or_init(|| {
        // The table below is validated at construction; a bad entry is a
        // programming error, not a runtime condition.
        ModeCatalog::new(builtin_modes()).unwrap_or_else(|e| {
            panic!("builtin mode table failed validation: {}", e);
        })
    })
}

struct ModeSpec {
    id: &'static str,
    code: (char, u32),
    name: &'static str,
    category: Category,
    tier: Tier,
    short_desc: &'static str,
    description: &'static str,
    best_for: &'static [&'static str],
    failure_modes: &'static [&'static str],
    differentiator: &'static str,
}

impl ModeSpec {
    fn build(&self) -> ReasoningMode {
        let (letter, number) = self.code;
        ReasoningMode {
            id: self.id.to_string(),
            code: ModeCode::new(letter, number).ok(),
            name: self.name.to_string(),
            category: self.category,
            tier: self.tier,
            short_desc: self.short_desc.to_string(),
            description: self.description.to_string(),
            best_for: self.best_for.iter().map(|s| s.to_string()).collect(),
            failure_modes: self.failure_modes.iter().map(|s| s.to_string()).collect(),
            differentiator: self.differentiator.to_string(),
            preamble_key: self.id.to_string(),
            ui: UiHints::default(),
        }
    }
}

fn builtin_modes() -> Vec<ReasoningMode> {
    MODE_TABLE.iter().map(ModeSpec::build).collect()
}

const MODE_TABLE: &[ModeSpec] = &[
    ModeSpec {
        id: "deductive",
        code: ('A', 1),
        name: "Deductive",
        category: Category::Formal,
        tier: Tier::Core,
        short_desc: "Derive conclusions that must follow from stated premises",
        description: "Works from explicit premises and rules toward conclusions that are guaranteed when the premises hold. Surfaces hidden assumptions by forcing every step to be justified.",
        best_for: &[
            "verifying invariants and contracts",
            "checking whether a claimed property actually follows from the design",
        ],
        failure_modes: &[
            "garbage-in garbage-out when premises are wrong",
            "false confidence from an incomplete premise set",
        ],
        differentiator: "Only mode whose conclusions are certain given its inputs",
    },
    ModeSpec {
        id: "mathematical",
        code: ('A', 2),
        name: "Mathematical",
        category: Category::Formal,
        tier: Tier::Advanced,
        short_desc: "Model the problem with explicit quantities and structures",
        description: "Reduces the question to quantities, bounds, and structures that can be computed or estimated, then reasons about the model instead of the prose.",
        best_for: &[
            "capacity planning and complexity estimates",
            "bounding worst-case behavior",
        ],
        failure_modes: &[
            "model divorced from the real system",
            "precision theater over rough inputs",
        ],
        differentiator: "Replaces argument with calculation wherever possible",
    },
    ModeSpec {
        id: "inductive",
        code: ('B', 1),
        name: "Inductive",
        category: Category::Ampliative,
        tier: Tier::Core,
        short_desc: "Generalize patterns from observed instances",
        description: "Collects concrete observations and lifts them into tentative general rules, tracking how many instances support each generalization.",
        best_for: &[
            "spotting patterns across incidents or bug reports",
            "inferring conventions from an existing codebase",
        ],
        failure_modes: &[
            "overgeneralizing from few samples",
            "survivorship bias in the observed set",
        ],
        differentiator: "Builds rules up from instances rather than down from principles",
    },
    ModeSpec {
        id: "abductive",
        code: ('B', 2),
        name: "Abductive",
        category: Category::Ampliative,
        tier: Tier::Core,
        short_desc: "Infer the best explanation for the evidence at hand",
        description: "Generates candidate explanations for the observed facts and ranks them by how well each accounts for all the evidence with the fewest extra assumptions.",
        best_for: &[
            "root-cause analysis of failures",
            "diagnosing surprising behavior from partial logs",
        ],
        failure_modes: &[
            "anchoring on the first plausible story",
            "ignoring evidence that fits no candidate",
        ],
        differentiator: "Optimizes for explanatory power, not certainty",
    },
    ModeSpec {
        id: "analogical",
        code: ('B', 3),
        name: "Analogical",
        category: Category::Ampliative,
        tier: Tier::Advanced,
        short_desc: "Transfer structure from a well-understood case",
        description: "Finds a known system with matching structure and maps its lessons onto the problem, making the mapping explicit so it can be audited.",
        best_for: &[
            "importing designs from adjacent domains",
            "explaining unfamiliar systems via familiar ones",
        ],
        failure_modes: &[
            "surface similarity mistaken for structural similarity",
            "stretching the analogy past where it holds",
        ],
        differentiator: "Reasons through an explicit source-to-target mapping",
    },
    ModeSpec {
        id: "bayesian",
        code: ('C', 1),
        name: "Bayesian",
        category: Category::Uncertainty,
        tier: Tier::Core,
        short_desc: "Update explicit probabilities as evidence arrives",
        description: "States priors, weighs each piece of evidence by its likelihood ratio, and reports posteriors instead of verdicts. Keeps uncertainty quantified end to end.",
        best_for: &[
            "weighing competing hypotheses under noisy evidence",
            "deciding when enough evidence has accumulated",
        ],
        failure_modes: &[
            "spurious precision in made-up priors",
            "ignoring correlation between evidence items",
        ],
        differentiator: "Every claim carries a number that moves with the evidence",
    },
    ModeSpec {
        id: "evidential",
        code: ('C', 2),
        name: "Evidential",
        category: Category::Uncertainty,
        tier: Tier::Advanced,
        short_desc: "Grade each claim by the strength of its support",
        description: "Separates what is directly observed from what is inferred, and attaches an evidence grade to every claim so weak links are visible.",
        best_for: &[
            "auditing arguments for unsupported leaps",
            "triaging which claims need verification first",
        ],
        failure_modes: &[
            "treating absence of evidence as evidence of absence",
            "grading rigor unevenly across claims",
        ],
        differentiator: "Output is a support graph, not a single conclusion",
    },
    ModeSpec {
        id: "fuzzy-boundary",
        code: ('D', 1),
        name: "Fuzzy Boundary",
        category: Category::Vagueness,
        tier: Tier::Advanced,
        short_desc: "Reason about matters of degree and unclear category edges",
        description: "Treats vague predicates as graded rather than binary, locating where on the spectrum the case sits and which threshold choices actually matter.",
        best_for: &[
            "policy thresholds and severity boundaries",
            "requirements written in vague language",
        ],
        failure_modes: &[
            "manufacturing false precision for inherently vague terms",
            "endless boundary litigation with no decision",
        ],
        differentiator: "Makes the vagueness itself the object of analysis",
    },
    ModeSpec {
        id: "temporal",
        code: ('E', 1),
        name: "Temporal",
        category: Category::Change,
        tier: Tier::Advanced,
        short_desc: "Reason about ordering, change, and evolution over time",
        description: "Lays events and states on an explicit timeline, checking ordering constraints, rates of change, and what earlier states imply about later ones.",
        best_for: &[
            "race conditions and lifecycle bugs",
            "migration and rollout sequencing",
        ],
        failure_modes: &[
            "assuming a global clock where none exists",
            "extrapolating trends past regime changes",
        ],
        differentiator: "Time and ordering are first-class, not background",
    },
    ModeSpec {
        id: "causal-inference",
        code: ('F', 1),
        name: "Causal Inference",
        category: Category::Causal,
        tier: Tier::Core,
        short_desc: "Separate causation from correlation in the evidence",
        description: "Builds an explicit cause-effect graph, hunts for confounders and selection effects, and asks what interventions would distinguish rival causal stories.",
        best_for: &[
            "incident post-mortems",
            "judging whether a proposed fix addresses the cause or a symptom",
        ],
        failure_modes: &[
            "post hoc ergo propter hoc",
            "stopping at the first cause instead of the root",
        ],
        differentiator: "Distinguishes intervening from observing",
    },
    ModeSpec {
        id: "means-end",
        code: ('G', 1),
        name: "Means-End",
        category: Category::Practical,
        tier: Tier::Core,
        short_desc: "Work backward from the goal to concrete next actions",
        description: "States the goal, measures the gap from the current state, and decomposes the gap into sub-goals until each maps to an available action.",
        best_for: &[
            "turning vague objectives into plans",
            "finding the blocking sub-problem in a stalled effort",
        ],
        failure_modes: &[
            "locally greedy steps that dead-end globally",
            "goals taken as given when they should be questioned",
        ],
        differentiator: "Every statement is oriented toward closing a goal gap",
    },
    ModeSpec {
        id: "decision-theoretic",
        code: ('G', 2),
        name: "Decision-Theoretic",
        category: Category::Practical,
        tier: Tier::Advanced,
        short_desc: "Choose among options by expected value under uncertainty",
        description: "Enumerates options, outcomes, probabilities, and utilities, then compares expected values and sensitivity to the shakiest estimates.",
        best_for: &[
            "build-vs-buy and architecture choices",
            "risk-weighted prioritization",
        ],
        failure_modes: &[
            "utilities invented to justify a preferred option",
            "ignoring options outside the initial list",
        ],
        differentiator: "Forces explicit trade-off arithmetic",
    },
    ModeSpec {
        id: "game-theoretic",
        code: ('H', 1),
        name: "Game-Theoretic",
        category: Category::Strategic,
        tier: Tier::Advanced,
        short_desc: "Model other agents' incentives and likely responses",
        description: "Treats the situation as a game: who the players are, what each can observe and do, and which equilibria survive everyone acting on their own incentives.",
        best_for: &[
            "API and protocol design against misuse",
            "anticipating how users or attackers adapt",
        ],
        failure_modes: &[
            "assuming more rationality than players have",
            "wrong payoff model invalidating the equilibrium",
        ],
        differentiator: "Other agents are modeled as optimizers, not noise",
    },
    ModeSpec {
        id: "adversarial",
        code: ('H', 2),
        name: "Adversarial",
        category: Category::Strategic,
        tier: Tier::Core,
        short_desc: "Attack the proposal to find where it breaks",
        description: "Takes the strongest available position against the current answer: hunts edge cases, hostile inputs, and failure cascades, and reports the most damaging ones found.",
        best_for: &[
            "security and robustness review",
            "stress-testing a design before commitment",
        ],
        failure_modes: &[
            "nitpicking trivia while missing structural flaws",
            "destructive framing with no constructive residue",
        ],
        differentiator: "Success is measured by what it breaks, not what it builds",
    },
    ModeSpec {
        id: "dialectical",
        code: ('I', 1),
        name: "Dialectical",
        category: Category::Dialectical,
        tier: Tier::Core,
        short_desc: "Develop thesis and antithesis, then synthesize",
        description: "States the strongest case for a position and the strongest case against it, then builds a synthesis that preserves what survives from each side.",
        best_for: &[
            "contested design decisions",
            "surfacing the real disagreement behind a debate",
        ],
        failure_modes: &[
            "strawmanning one side",
            "synthesis that papers over a genuine contradiction",
        ],
        differentiator: "Disagreement is the engine, not an obstacle",
    },
    ModeSpec {
        id: "socratic",
        code: ('I', 2),
        name: "Socratic",
        category: Category::Dialectical,
        tier: Tier::Advanced,
        short_desc: "Interrogate definitions and assumptions with questions",
        description: "Advances by asking what each key term means and what would falsify each assumption, exposing circularity and hidden premises.",
        best_for: &[
            "clarifying fuzzy requirements",
            "unsticking discussions that talk past each other",
        ],
        failure_modes: &[
            "questions without end and no synthesis",
            "pedantry over genuinely shared understanding",
        ],
        differentiator: "Produces sharper questions, not just answers",
    },
    ModeSpec {
        id: "counterfactual",
        code: ('J', 1),
        name: "Counterfactual",
        category: Category::Modal,
        tier: Tier::Core,
        short_desc: "Explore nearby worlds where key facts differ",
        description: "Varies one assumption at a time and traces what else would change, mapping which conclusions are robust and which hang on a single contingency.",
        best_for: &[
            "what-if analysis on designs and incidents",
            "identifying single points of reasoning failure",
        ],
        failure_modes: &[
            "varying too much at once",
            "counterfactuals drifting into pure fiction",
        ],
        differentiator: "Tests robustness by perturbation rather than argument",
    },
    ModeSpec {
        id: "possibility-mapping",
        code: ('J', 2),
        name: "Possibility Mapping",
        category: Category::Modal,
        tier: Tier::Experimental,
        short_desc: "Chart what is necessary, possible, and impossible",
        description: "Classifies outcomes into necessary, contingent, and impossible given the constraints, making the boundary of the feasible region explicit.",
        best_for: &[
            "feasibility studies",
            "separating hard constraints from habits",
        ],
        failure_modes: &[
            "mistaking unfamiliar for impossible",
            "constraint lists that are actually preferences",
        ],
        differentiator: "Maps the whole option space before evaluating any point",
    },
    ModeSpec {
        id: "diagnostic",
        code: ('K', 1),
        name: "Diagnostic",
        category: Category::Domain,
        tier: Tier::Core,
        short_desc: "Apply domain playbooks to localize the fault",
        description: "Runs the domain's differential-diagnosis discipline: enumerate known failure classes, test the cheap discriminators first, and narrow until one class remains.",
        best_for: &[
            "debugging with established tooling",
            "triage under time pressure",
        ],
        failure_modes: &[
            "playbook blindness to novel failure classes",
            "expensive tests before cheap discriminators",
        ],
        differentiator: "Leans on accumulated domain priors instead of first principles",
    },
    ModeSpec {
        id: "design-rationale",
        code: ('K', 2),
        name: "Design Rationale",
        category: Category::Domain,
        tier: Tier::Advanced,
        short_desc: "Reconstruct why the system is the way it is",
        description: "Recovers the constraints and forces that shaped existing decisions before proposing changes, distinguishing load-bearing quirks from accidents.",
        best_for: &[
            "working in legacy systems",
            "evaluating whether an old constraint still binds",
        ],
        failure_modes: &[
            "inventing rationales that never existed",
            "excessive deference to obsolete decisions",
        ],
        differentiator: "Treats the existing design as evidence about hidden constraints",
    },
    ModeSpec {
        id: "meta-cognitive",
        code: ('L', 1),
        name: "Meta-Cognitive",
        category: Category::Meta,
        tier: Tier::Core,
        short_desc: "Audit the reasoning process itself for blind spots",
        description: "Steps above the object-level debate: which modes have been applied, which biases are likely active, what evidence would change the answer, and where confidence is miscalibrated.",
        best_for: &[
            "sanity-checking an ensemble's combined answer",
            "detecting groupthink across analyses",
        ],
        failure_modes: &[
            "infinite regress of reflection without output",
            "vague bias accusations with no specific fix",
        ],
        differentiator: "Its object of study is the other modes' reasoning",
    },
    ModeSpec {
        id: "assumption-audit",
        code: ('L', 2),
        name: "Assumption Audit",
        category: Category::Meta,
        tier: Tier::Advanced,
        short_desc: "Enumerate and stress every load-bearing assumption",
        description: "Lists each assumption the argument rests on, grades how load-bearing and how verified it is, and flags the unverified ones that would collapse the conclusion.",
        best_for: &[
            "pre-mortems on plans",
            "reviewing analyses before high-stakes decisions",
        ],
        failure_modes: &[
            "assumption lists too long to act on",
            "missing the assumptions shared by everyone in the room",
        ],
        differentiator: "Ranks assumptions by blast radius, not by visibility",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_valid() {
        let catalog = builtin_catalog();
        assert!(catalog.len() >= 12);
    }

    #[test]
    fn test_builtin_covers_every_category() {
        let catalog = builtin_catalog();
        for category in Category::ALL {
            assert!(
                !catalog.by_category(category).is_empty(),
                "no builtin mode for category {}",
                category
            );
        }
    }

    #[test]
    fn test_builtin_core_modes_have_preamble_keys() {
        for mode in builtin_catalog().by_tier(Tier::Core) {
            assert!(!mode.preamble_key.is_empty(), "mode {} lacks preamble key", mode.id);
        }
    }
}
