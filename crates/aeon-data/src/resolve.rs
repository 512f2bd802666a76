//! Resolution of deserialized tree data into a validated [`StudyGraph`].
//!
//! Labels are parsed and checked against the declared studies before the
//! graph builder runs, so that reference errors name the data file. Cycle
//! and slot-membership checks are left to [`StudyGraphBuilder::build`].

use aeon_studies::condition::ProgressStep;
use aeon_studies::graph::{ChallengeSpec, LockedPath};
use aeon_studies::{
    Condition, Phase, PlannerLayout, SlotSet, StudyGraph, StudyGraphBuilder, StudyId, StudyKind,
    StudyNode, Unlock,
};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use crate::loader::{
    DataLoadError, Format, check_duplicate, deserialize_file, deserialize_str, require_data_file,
    resolve_name,
};
use crate::schema::*;

/// Base name of the study tree file inside a data directory.
pub const STUDIES_FILE: &str = "studies";

// ===========================================================================
// Entry points
// ===========================================================================

/// Load `studies.{ron,toml,json}` from a data directory.
pub fn load_study_tree(dir: &Path) -> Result<StudyGraph, DataLoadError> {
    let path = require_data_file(dir, STUDIES_FILE)?;
    load_study_tree_file(&path)
}

/// Load a study tree from an explicit file path.
pub fn load_study_tree_file(path: &Path) -> Result<StudyGraph, DataLoadError> {
    let data: StudyTreeData = deserialize_file(path)?;
    let graph = resolve_tree(&data, path)?;
    info!(
        file = %path.display(),
        studies = graph.len(),
        edges = graph.edge_count(),
        "study tree loaded"
    );
    Ok(graph)
}

/// Parse and resolve a study tree held in memory.
pub fn parse_study_tree(content: &str, format: Format) -> Result<StudyGraph, DataLoadError> {
    let file = Path::new("<inline>");
    let data: StudyTreeData = deserialize_str(content, format, file)?;
    resolve_tree(&data, file)
}

/// Resolve tree data into a graph. `file` is only used in errors.
pub fn resolve_tree(data: &StudyTreeData, file: &Path) -> Result<StudyGraph, DataLoadError> {
    let resolver = Resolver::new(data, file)?;
    let mut builder = StudyGraph::builder();
    resolver.add_studies(data, &mut builder)?;
    resolver.add_edges(data, &mut builder)?;
    let slot_names = resolver.add_slot_sets(data, &mut builder)?;
    if let Some(locked) = &data.locked_path {
        builder.set_locked_path(LockedPath {
            enabled: resolver.condition(&locked.enabled)?,
            budget_counter: locked.budget_counter.clone(),
        });
    }
    builder.set_planner(resolver.planner(data, &slot_names)?);

    builder.build().map_err(|source| DataLoadError::Graph {
        file: file.to_path_buf(),
        source,
    })
}

// ===========================================================================
// Resolver
// ===========================================================================

struct Resolver<'a> {
    file: &'a Path,
    /// Canonical label (`TS71`) to id.
    labels: HashMap<String, StudyId>,
}

impl<'a> Resolver<'a> {
    fn new(data: &StudyTreeData, file: &'a Path) -> Result<Self, DataLoadError> {
        let mut labels = HashMap::with_capacity(data.studies.len());
        for study in &data.studies {
            let id = parse_label(&study.id, file)?;
            let canonical = id.to_string();
            check_duplicate(&labels, &canonical, file)?;
            labels.insert(canonical, id);
        }
        Ok(Self { file, labels })
    }

    fn study(&self, label: &str) -> Result<StudyId, DataLoadError> {
        let canonical = parse_label(label, self.file)?.to_string();
        resolve_name(&self.labels, &canonical, self.file, "study").copied()
    }

    fn condition(&self, data: &ConditionData) -> Result<Condition, DataLoadError> {
        Ok(match data {
            ConditionData::Always => Condition::Always,
            ConditionData::Never => Condition::Never,
            ConditionData::Flag(name) => Condition::flag(name.clone()),
            ConditionData::Owns(label) => Condition::owns(self.study(label)?),
            ConditionData::CounterAtLeast { counter, value } => {
                Condition::counter_at_least(counter.clone(), *value)
            }
            ConditionData::Progress {
                counter,
                base,
                step,
                completions,
            } => Condition::Progress {
                counter: counter.clone(),
                base: *base,
                step: match *step {
                    ProgressStepData::Add(v) => ProgressStep::Add(v),
                    ProgressStepData::Mul(v) => ProgressStep::Mul(v),
                },
                completions: completions.clone(),
            },
            ConditionData::Not(inner) => Condition::not(self.condition(inner)?),
            ConditionData::All(all) => Condition::All(self.conditions(all)?),
            ConditionData::Any(any) => Condition::Any(self.conditions(any)?),
        })
    }

    fn conditions(&self, data: &[ConditionData]) -> Result<Vec<Condition>, DataLoadError> {
        data.iter().map(|c| self.condition(c)).collect()
    }

    fn optional(&self, data: Option<&ConditionData>) -> Result<Option<Condition>, DataLoadError> {
        data.map(|c| self.condition(c)).transpose()
    }

    fn add_studies(
        &self,
        data: &StudyTreeData,
        builder: &mut StudyGraphBuilder,
    ) -> Result<(), DataLoadError> {
        for study in &data.studies {
            let id = self.study(&study.id)?;
            let mut node = match id {
                StudyId::Normal(n) => StudyNode::normal(n, study.cost),
                StudyId::Dilation(n) => StudyNode::dilation(n, study.cost),
                StudyId::Challenge(n) => {
                    let spec = match &study.challenge {
                        Some(challenge) => self.challenge(challenge)?,
                        None => ChallengeSpec::default(),
                    };
                    StudyNode::challenge(n, study.cost, spec)
                }
            };
            if study.challenge.is_some() && id.kind() != StudyKind::Challenge {
                return Err(DataLoadError::NotAChallenge {
                    file: self.file.to_path_buf(),
                    label: study.id.clone(),
                });
            }
            if let Some(requirement) = self.optional(study.requirement.as_ref())? {
                node = node.with_requirement(requirement);
            }
            if let Some(locked) = self.optional(study.locked_requirement.as_ref())? {
                node = node.with_locked_requirement(locked);
            }
            for unlock in &study.unlocks {
                node = node.with_unlock(match unlock {
                    UnlockData::Tab(tab) => Unlock::Tab(tab.clone()),
                    UnlockData::Grant { counter, amount } => Unlock::Grant {
                        counter: counter.clone(),
                        amount: *amount,
                    },
                    UnlockData::Custom(key) => Unlock::Custom(key.clone()),
                });
            }
            debug!(study = %id, "resolved study");
            builder.add_study(node);
        }
        Ok(())
    }

    fn challenge(&self, data: &ChallengeData) -> Result<ChallengeSpec, DataLoadError> {
        Ok(ChallengeSpec {
            secondary: self.optional(data.secondary.as_ref())?.unwrap_or_default(),
            remember_unlock: data.remember_unlock,
            approach: data.approach.as_deref().map(|a| self.study(a)).transpose()?,
            approach_extra: data
                .approach_extra
                .iter()
                .map(|a| self.study(a))
                .collect::<Result<_, _>>()?,
        })
    }

    fn add_edges(
        &self,
        data: &StudyTreeData,
        builder: &mut StudyGraphBuilder,
    ) -> Result<(), DataLoadError> {
        for study in &data.studies {
            let to = self.study(&study.id)?;
            for prerequisite in &study.prerequisites {
                builder.add_edge(self.study(prerequisite)?, to);
            }
        }
        for edge in &data.edges {
            let (from, to) = (self.study(&edge.from)?, self.study(&edge.to)?);
            match self.optional(edge.override_when.as_ref())? {
                Some(condition) => builder.add_edge_with_override(from, to, condition),
                None => builder.add_edge(from, to),
            };
        }
        Ok(())
    }

    /// Returns the declared set names, for resolving planner references.
    fn add_slot_sets(
        &self,
        data: &StudyTreeData,
        builder: &mut StudyGraphBuilder,
    ) -> Result<HashMap<String, ()>, DataLoadError> {
        let mut names = HashMap::new();
        for set_data in &data.slot_sets {
            check_duplicate(&names, &set_data.name, self.file)?;
            names.insert(set_data.name.clone(), ());

            let mut set = SlotSet::new(set_data.name.clone(), set_data.capacity);
            for branch in &set_data.branches {
                for &n in &branch.studies {
                    self.study(&StudyId::Normal(n).to_string())?;
                }
                set = set.branch(branch.name.clone(), branch.studies.iter().copied());
            }
            for bonus in &set_data.bonuses {
                set = set.bonus(self.condition(&bonus.when)?, bonus.extra);
            }
            if let Some(unlimited) = self.optional(set_data.unlimited_when.as_ref())? {
                set = set.unlimited_when(unlimited);
            }
            builder.add_slot_set(set);
        }
        Ok(names)
    }

    fn planner(
        &self,
        data: &StudyTreeData,
        slot_names: &HashMap<String, ()>,
    ) -> Result<PlannerLayout, DataLoadError> {
        if data.planner.is_empty() {
            return Ok(PlannerLayout {
                row_stride: data.row_stride,
                ..PlannerLayout::default()
            });
        }
        let set = |name: &String| -> Result<String, DataLoadError> {
            resolve_name(slot_names, name, self.file, "slot set")?;
            Ok(name.clone())
        };
        let mut phases = Vec::with_capacity(data.planner.len());
        for phase in &data.planner {
            phases.push(match phase {
                PhaseData::Target => Phase::Target,
                PhaseData::Gate { min_target } => Phase::Gate {
                    min_target: *min_target,
                },
                PhaseData::Linear { first, last, when } => Phase::Linear {
                    first: *first,
                    last: *last,
                    when: self.optional(when.as_ref())?.unwrap_or_default(),
                },
                PhaseData::Branching {
                    set: name,
                    first,
                    last,
                    branch_last,
                } => Phase::Branching {
                    set: set(name)?,
                    first: *first,
                    last: *last,
                    branch_last: *branch_last,
                },
                PhaseData::BranchFirst {
                    set: name,
                    branch_last,
                } => Phase::BranchFirst {
                    set: set(name)?,
                    branch_last: *branch_last,
                },
                PhaseData::CommittedBranch { set: name } => Phase::CommittedBranch { set: set(name)? },
                PhaseData::Convergence { study } => {
                    self.study(&StudyId::Normal(*study).to_string())?;
                    Phase::Convergence { study: *study }
                }
                PhaseData::Paired {
                    first,
                    last,
                    feeds_first,
                    feeds_last,
                    bypass,
                } => Phase::Paired {
                    first: *first,
                    last: *last,
                    feeds_first: *feeds_first,
                    feeds_last: *feeds_last,
                    bypass: self.optional(bypass.as_ref())?.unwrap_or(Condition::Never),
                },
            });
        }
        Ok(PlannerLayout {
            row_stride: data.row_stride,
            phases,
        })
    }
}

fn parse_label(label: &str, file: &Path) -> Result<StudyId, DataLoadError> {
    label.parse().map_err(|_| DataLoadError::InvalidLabel {
        file: file.to_path_buf(),
        label: label.to_string(),
    })
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use aeon_core::Decimal;
    use aeon_studies::{GameFlags, GraphError, PathPlanner, PurchaseLedger, RequirementEvaluator};

    const SMALL_TREE: &str = r#"
        (
            studies: [
                (id: "TS11", cost: 1),
                (id: "TS21", cost: 3, prerequisites: ["TS11"]),
                (id: "TS22", cost: 2, prerequisites: ["TS11"]),
                (id: "TS31", cost: 3, prerequisites: ["TS21"], locked_requirement: Some(Owns("TS21"))),
                (id: "TS32", cost: 2, prerequisites: ["TS22"], locked_requirement: Some(Owns("TS22"))),
                (
                    id: "EC1",
                    cost: 30,
                    prerequisites: ["TS31"],
                    challenge: Some((
                        secondary: Some(CounterAtLeast(counter: "eternities", value: 100)),
                        remember_unlock: true,
                        approach: Some("TS31"),
                    )),
                ),
                (id: "DS1", cost: "5000", requirement: Some(Flag("dilation")), unlocks: [Tab("dilation")]),
            ],
            edges: [
                (from: "EC1", to: "TS22", override_when: Some(Flag("perk"))),
            ],
            slot_sets: [
                (
                    name: "sides",
                    branches: [(name: "left", studies: [31]), (name: "right", studies: [32])],
                    unlimited_when: Some(Flag("split")),
                ),
            ],
            locked_path: Some((enabled: Flag("locked"))),
            planner: [
                Target,
                Linear(first: 11, last: 29),
                Branching(set: "sides", first: 31, last: 39, branch_last: 32),
                Target,
            ],
        )
    "#;

    fn ts(n: u32) -> StudyId {
        StudyId::Normal(n)
    }

    #[test]
    fn resolves_studies_edges_and_sets() {
        let graph = parse_study_tree(SMALL_TREE, Format::Ron).unwrap();
        assert_eq!(graph.len(), 7);
        // Five prerequisites plus the override edge.
        assert_eq!(graph.edge_count(), 6);
        assert_eq!(graph.slot_sets().len(), 1);
        assert!(graph.locked_path().is_some());
        assert_eq!(graph.planner().phases.len(), 4);

        let ec1 = graph.node(StudyId::Challenge(1)).unwrap().challenge_spec().unwrap();
        assert!(ec1.remember_unlock);
        assert_eq!(ec1.approach, Some(ts(31)));
        let ds1 = graph.node(StudyId::Dilation(1)).unwrap();
        assert_eq!(ds1.unlocks, vec![Unlock::Tab("dilation".into())]);
    }

    #[test]
    fn resolved_tree_behaves_like_a_built_one() {
        let graph = parse_study_tree(SMALL_TREE, Format::Ron).unwrap();
        let flags = GameFlags::new();
        let mut ledger = PurchaseLedger::with_balance(Decimal::from(100u32));

        let report = PathPlanner::new(&graph, &flags, &mut ledger).plan(ts(31));
        assert!(report.target_owned);
        assert_eq!(ledger.owned_normal().collect::<Vec<_>>(), vec![ts(11), ts(21), ts(22), ts(31)]);

        // The other side of the slot set is closed.
        let eval = RequirementEvaluator::new(&graph, &flags, &ledger);
        assert!(eval.is_satisfied(ts(32)));
        assert!(!ledger.can_purchase(&graph, &flags, ts(32)));
        assert!(!eval.is_satisfied(StudyId::Dilation(1)));
    }

    #[test]
    fn labels_are_case_insensitive_but_unique() {
        let data = r#"(studies: [(id: "TS11", cost: 1), (id: "ts11", cost: 2)])"#;
        assert!(matches!(
            parse_study_tree(data, Format::Ron),
            Err(DataLoadError::DuplicateName { name, .. }) if name == "TS11"
        ));
    }

    #[test]
    fn bad_label_is_reported() {
        let data = r#"(studies: [(id: "XY11", cost: 1)])"#;
        assert!(matches!(
            parse_study_tree(data, Format::Ron),
            Err(DataLoadError::InvalidLabel { label, .. }) if label == "XY11"
        ));
    }

    #[test]
    fn unknown_prerequisite_is_unresolved() {
        let data = r#"(studies: [(id: "TS21", cost: 1, prerequisites: ["TS11"])])"#;
        assert!(matches!(
            parse_study_tree(data, Format::Ron),
            Err(DataLoadError::UnresolvedRef { expected_kind: "study", name, .. }) if name == "TS11"
        ));
    }

    #[test]
    fn owns_condition_must_name_a_study() {
        let data = r#"(studies: [(id: "TS11", cost: 1, requirement: Some(Owns("TS99")))])"#;
        assert!(matches!(
            parse_study_tree(data, Format::Ron),
            Err(DataLoadError::UnresolvedRef { .. })
        ));
    }

    #[test]
    fn challenge_data_on_normal_study_is_rejected() {
        let data = r#"(studies: [(id: "TS11", cost: 1, challenge: Some(()))])"#;
        assert!(matches!(
            parse_study_tree(data, Format::Ron),
            Err(DataLoadError::NotAChallenge { .. })
        ));
    }

    #[test]
    fn planner_must_name_declared_sets() {
        let data = r#"(studies: [(id: "TS11", cost: 1)], planner: [CommittedBranch(set: "pace")])"#;
        assert!(matches!(
            parse_study_tree(data, Format::Ron),
            Err(DataLoadError::UnresolvedRef { expected_kind: "slot set", .. })
        ));
    }

    #[test]
    fn cycles_surface_as_graph_errors() {
        let data = r#"
            (studies: [
                (id: "TS11", cost: 1, prerequisites: ["TS21"]),
                (id: "TS21", cost: 1, prerequisites: ["TS11"]),
            ])
        "#;
        assert!(matches!(
            parse_study_tree(data, Format::Ron),
            Err(DataLoadError::Graph { source: GraphError::CycleDetected(_), .. })
        ));
    }

    #[test]
    fn empty_planner_uses_default_layout() {
        let data = r#"{"row_stride": 100, "studies": [{"id": "TS101", "cost": 1}]}"#;
        let graph = parse_study_tree(data, Format::Json).unwrap();
        assert_eq!(graph.row_stride(), 100);
        assert_eq!(graph.planner().phases.len(), 1);
    }

    #[test]
    fn load_from_directory() {
        let dir = std::env::temp_dir().join(format!("aeon_data_resolve_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("studies.ron"), SMALL_TREE).unwrap();

        let graph = load_study_tree(&dir).unwrap();
        assert_eq!(graph.len(), 7);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
