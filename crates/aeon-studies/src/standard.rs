//! The classic time-study tree and its path presets.

use aeon_core::Decimal;

use crate::condition::{Condition, GameFlags, ProgressStep};
use crate::event::Unlock;
use crate::graph::{ChallengeSpec, GraphError, LockedPath, SlotSet, StudyGraph, StudyNode};
use crate::id::{StudyId, StudyKind};
use crate::planner::{Phase, PlannerLayout};

/// Flag and counter names read by the standard layout.
pub mod flags {
    /// Every dimension path may be bought at once.
    pub const TIME_STUDY_SPLIT: &str = "dilation.time_study_split";
    /// Studies may be bought out of order.
    pub const LOCKED_PATH: &str = "v.locked_path";
    /// How many out-of-order purchases are allowed.
    pub const LOCKED_BUDGET: &str = "v.locked_budget";
    /// Challenge secondary requirements are ignored.
    pub const STUDY_EC_REQUIREMENT: &str = "perk.study_ec_requirement";
    pub const BYPASS_EC1_LOCK: &str = "perk.bypass_ec1_lock";
    pub const BYPASS_EC2_LOCK: &str = "perk.bypass_ec2_lock";
    pub const BYPASS_EC3_LOCK: &str = "perk.bypass_ec3_lock";
    pub const BYPASS_EC5_LOCK: &str = "perk.bypass_ec5_lock";

    pub const TIME_DIMENSIONS_BOUGHT: &str = "time_dimension1.bought";
    pub const REALITIES: &str = "realities";
    pub const TOTAL_THEOREMS: &str = "time_theorems.total";

    pub const ETERNITIES: &str = "eternities";
    pub const TD_TICKSPEED_UPGRADES: &str = "tickspeed.from_time_dimensions";
    pub const EIGHTH_DIMENSIONS: &str = "antimatter_dimension8.amount";
    pub const INFINITIES: &str = "infinities";
    pub const GALAXIES: &str = "galaxies";
    pub const REPLICANTI_GALAXIES: &str = "replicanti.galaxies";
    pub const ANTIMATTER: &str = "antimatter";
    pub const INFINITY_POINTS: &str = "infinity_points";
    pub const INFINITY_POWER: &str = "infinity_power";
    pub const ETERNITY_POINTS: &str = "eternity_points";

    /// Completion counter of eternity challenge `n`.
    pub fn completions(n: u32) -> String {
        format!("ec{n}.completions")
    }
}

pub const DIMENSION_SET: &str = "dimension";
pub const PACE_SET: &str = "pace";

// ---------------------------------------------------------------------------
// Static tables
// ---------------------------------------------------------------------------

const NORMAL_STUDIES: &[(u32, u32)] = &[
    (11, 1),
    (21, 3),
    (22, 2),
    (31, 3),
    (32, 2),
    (33, 2),
    (41, 4),
    (42, 6),
    (51, 3),
    (61, 3),
    (62, 3),
    (71, 4),
    (72, 6),
    (73, 5),
    (81, 4),
    (82, 6),
    (83, 5),
    (91, 4),
    (92, 5),
    (93, 7),
    (101, 4),
    (102, 6),
    (103, 6),
    (111, 12),
    (121, 9),
    (122, 9),
    (123, 9),
    (131, 5),
    (132, 5),
    (133, 5),
    (141, 4),
    (142, 4),
    (143, 4),
    (151, 8),
    (161, 7),
    (162, 7),
    (171, 15),
    (181, 200),
    (191, 400),
    (192, 730),
    (193, 300),
    (201, 900),
    (211, 120),
    (212, 150),
    (213, 200),
    (214, 120),
    (221, 900),
    (222, 900),
    (223, 900),
    (224, 900),
    (225, 900),
    (226, 900),
    (227, 900),
    (228, 900),
    (231, 500),
    (232, 500),
    (233, 500),
    (234, 500),
];

/// Plain `from -> to` prerequisites between normal studies.
const NORMAL_EDGES: &[(u32, u32)] = &[
    (11, 21),
    (11, 22),
    (21, 31),
    (21, 33),
    (22, 32),
    (31, 41),
    (32, 42),
    (41, 51),
    (42, 51),
    (51, 61),
    (61, 71),
    (61, 72),
    (61, 73),
    (71, 81),
    (72, 82),
    (73, 83),
    (81, 91),
    (82, 92),
    (83, 93),
    (91, 101),
    (92, 102),
    (93, 103),
    (101, 111),
    (102, 111),
    (103, 111),
    (111, 121),
    (111, 122),
    (111, 123),
    (121, 131),
    (122, 132),
    (123, 133),
    (131, 141),
    (132, 142),
    (133, 143),
    (141, 151),
    (142, 151),
    (143, 151),
    (151, 161),
    (151, 162),
    (161, 171),
    (162, 171),
    (192, 201),
    (191, 211),
    (191, 212),
    (193, 213),
    (193, 214),
    (211, 221),
    (211, 222),
    (212, 223),
    (212, 224),
    (213, 225),
    (213, 226),
    (214, 227),
    (214, 228),
    (221, 231),
    (222, 231),
    (223, 232),
    (224, 232),
    (225, 233),
    (226, 233),
    (227, 234),
    (228, 234),
];

/// `(challenge, cost, source studies, approach, approach extras)`.
const CHALLENGES: &[(u32, u32, &[u32], u32, &[u32])] = &[
    (1, 30, &[171], 171, &[]),
    (2, 35, &[171], 171, &[]),
    (3, 40, &[171], 171, &[]),
    (4, 70, &[143], 143, &[]),
    (5, 130, &[42], 42, &[]),
    (6, 85, &[121], 121, &[]),
    (7, 115, &[111], 111, &[]),
    (8, 115, &[123], 123, &[]),
    (9, 415, &[151], 151, &[]),
    (10, 550, &[181], 181, &[]),
    (11, 1, &[231, 232], 212, &[211]),
    (12, 1, &[233, 234], 214, &[213]),
];

const DILATION_COSTS: &[(u32, f64)] = &[(1, 5000.0), (2, 1e6), (3, 1e7), (4, 1e8), (5, 1e9), (6, 1.0)];

fn ts(n: u32) -> StudyId {
    StudyId::Normal(n)
}

fn ec(n: u32) -> StudyId {
    StudyId::Challenge(n)
}

fn completed(n: u32, times: u32) -> Condition {
    Condition::counter_at_least(flags::completions(n), times)
}

fn progress(counter: &str, base: &str, step: ProgressStep, n: u32) -> Condition {
    Condition::Progress {
        counter: counter.to_string(),
        base: base.parse().unwrap_or_default(),
        step,
        completions: flags::completions(n),
    }
}

fn add(v: u32) -> ProgressStep {
    ProgressStep::Add(Decimal::from(v))
}

fn mul(log10: i64) -> ProgressStep {
    ProgressStep::Mul(Decimal::from_mantissa_exponent(1.0, log10))
}

/// Secondary unlock requirement of a challenge, before the perk bypass.
fn secondary(n: u32) -> Condition {
    match n {
        1 => progress(flags::ETERNITIES, "20000", add(20000), n),
        2 => progress(flags::TD_TICKSPEED_UPGRADES, "1300", add(150), n),
        3 => progress(flags::EIGHTH_DIMENSIONS, "17300", add(1250), n),
        4 => progress(flags::INFINITIES, "1e8", add(25_000_000), n),
        5 => progress(flags::GALAXIES, "160", add(14), n),
        6 => progress(flags::REPLICANTI_GALAXIES, "40", add(5), n),
        7 => progress(flags::ANTIMATTER, "1e300000", mul(10000), n),
        8 => progress(flags::INFINITY_POINTS, "1e4000", mul(100), n),
        9 => progress(flags::INFINITY_POWER, "1e17500", mul(2000), n),
        10 => progress(flags::ETERNITY_POINTS, "1e100", mul(20), n),
        11 => Condition::All(vec![
            Condition::not(Condition::owns(ts(72))),
            Condition::not(Condition::owns(ts(73))),
        ]),
        12 => Condition::All(vec![
            Condition::not(Condition::owns(ts(71))),
            Condition::not(Condition::owns(ts(72))),
        ]),
        _ => Condition::Never,
    }
}

/// Requirement under the locked path: the study's branch parent is owned,
/// ignoring slot gating.
fn locked_requirement(n: u32) -> Condition {
    let parents: Vec<u32> = NORMAL_EDGES.iter().filter(|&&(_, to)| to == n).map(|&(from, _)| from).collect();
    let in_locked_section = (71..=103).contains(&n) || (121..=143).contains(&n) || (221..=234).contains(&n);
    if !in_locked_section || parents.is_empty() {
        return Condition::Never;
    }
    Condition::Any(parents.into_iter().map(|p| Condition::owns(ts(p))).collect())
}

/// Studies that also need challenge completions. These have no incoming
/// edges, so owning the challenge itself never opens them.
fn challenge_gated_requirement(n: u32) -> Option<Condition> {
    let with_perk = |ec: u32, perk: &str| Condition::Any(vec![completed(ec, 1), Condition::flag(perk)]);
    match n {
        62 => Some(Condition::All(vec![
            Condition::owns(ts(42)),
            with_perk(5, flags::BYPASS_EC5_LOCK),
        ])),
        181 => Some(Condition::All(vec![
            Condition::owns(ts(171)),
            with_perk(1, flags::BYPASS_EC1_LOCK),
            with_perk(2, flags::BYPASS_EC2_LOCK),
            with_perk(3, flags::BYPASS_EC3_LOCK),
        ])),
        191..=193 => Some(Condition::All(vec![Condition::owns(ts(181)), completed(10, 1)])),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Build the standard study tree.
pub fn layout() -> Result<StudyGraph, GraphError> {
    let mut b = StudyGraph::builder();

    for &(n, cost) in NORMAL_STUDIES {
        let mut node = StudyNode::normal(n, cost).with_locked_requirement(locked_requirement(n));
        if let Some(requirement) = challenge_gated_requirement(n) {
            node = node.with_requirement(requirement);
        }
        b.add_study(node);
    }
    for &(from, to) in NORMAL_EDGES {
        b.add_edge(ts(from), ts(to));
    }

    for &(n, cost, sources, approach, extra) in CHALLENGES {
        let spec = ChallengeSpec {
            secondary: Condition::Any(vec![Condition::flag(flags::STUDY_EC_REQUIREMENT), secondary(n)]),
            remember_unlock: n <= 10,
            approach: Some(ts(approach)),
            approach_extra: extra.iter().copied().map(ts).collect(),
        };
        b.add_study(StudyNode::challenge(n, cost, spec));
        for &source in sources {
            b.add_edge(ts(source), ec(n));
        }
    }

    for &(n, cost) in DILATION_COSTS {
        let mut node = StudyNode::dilation(n, Decimal::from_f64(cost));
        node = match n {
            1 => node
                .with_requirement(Condition::All(vec![
                    completed(11, 5),
                    completed(12, 5),
                    Condition::counter_at_least(flags::TOTAL_THEOREMS, 13000u32),
                ]))
                .with_unlock(Unlock::Tab("dilation".into())),
            6 => node
                .with_requirement(Condition::All(vec![
                    Condition::owns(StudyId::Dilation(5)),
                    Condition::counter_at_least(flags::ETERNITY_POINTS, Decimal::from_mantissa_exponent(1.0, 4000)),
                ]))
                .with_unlock(Unlock::Tab("reality".into())),
            _ => node,
        };
        b.add_study(node);
    }
    for n in 2..=5 {
        b.add_edge(StudyId::Dilation(n - 1), StudyId::Dilation(n));
    }

    b.add_slot_set(
        SlotSet::new(DIMENSION_SET, 1)
            .branch("nd", [71, 81, 91, 101])
            .branch("id", [72, 82, 92, 102])
            .branch("td", [73, 83, 93, 103])
            .bonus(Condition::owns(ts(201)), 1)
            .unlimited_when(Condition::flag(flags::TIME_STUDY_SPLIT)),
    );
    b.add_slot_set(
        SlotSet::new(PACE_SET, 1)
            .branch("active", [121, 131, 141])
            .branch("passive", [122, 132, 142])
            .branch("idle", [123, 133, 143]),
    );
    for pair in 0..4 {
        let light = 221 + 2 * pair;
        b.add_slot_set(
            SlotSet::new(format!("pair{light}"), 1)
                .branch("light", [light])
                .branch("dark", [light + 1]),
        );
    }

    b.set_locked_path(LockedPath {
        enabled: Condition::flag(flags::LOCKED_PATH),
        budget_counter: Some(flags::LOCKED_BUDGET.to_string()),
    });
    b.set_planner(planner_layout());
    b.build()
}

fn planner_layout() -> PlannerLayout {
    let locked = Condition::flag(flags::LOCKED_PATH);
    PlannerLayout {
        row_stride: 10,
        phases: vec![
            Phase::Target,
            Phase::Linear {
                first: 11,
                last: 70,
                when: Condition::Always,
            },
            Phase::Target,
            Phase::Gate { min_target: 71 },
            Phase::Branching {
                set: DIMENSION_SET.into(),
                first: 71,
                last: 120,
                branch_last: 103,
            },
            Phase::Convergence { study: 111 },
            Phase::Gate { min_target: 121 },
            Phase::BranchFirst {
                set: PACE_SET.into(),
                branch_last: 143,
            },
            Phase::Linear {
                first: 121,
                last: 214,
                when: locked.clone(),
            },
            Phase::CommittedBranch { set: PACE_SET.into() },
            Phase::Linear {
                first: 151,
                last: 214,
                when: Condition::Always,
            },
            Phase::Target,
            Phase::Gate { min_target: 230 },
            Phase::Paired {
                first: 221,
                last: 228,
                feeds_first: 231,
                feeds_last: 234,
                bypass: locked,
            },
            Phase::Target,
        ],
    }
}

// ---------------------------------------------------------------------------
// Path presets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetMode {
    /// Buy every row, choosing branches from the arguments.
    All,
    /// Buy only unambiguous rows and the optional studies the arguments name.
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PresetArg {
    Study(u32),
    Name(String),
}

impl PresetArg {
    fn parse(arg: &str) -> Self {
        let arg = arg.trim();
        match arg.parse() {
            Ok(n) => PresetArg::Study(n),
            Err(_) => PresetArg::Name(arg.to_ascii_lowercase()),
        }
    }

    fn is(&self, n: u32) -> bool {
        *self == PresetArg::Study(n)
    }

    fn named(&self, names: &[&str]) -> bool {
        matches!(self, PresetArg::Name(name) if names.contains(&name.as_str()))
    }
}

/// Columns (1-based) of a three-way branch the arguments choose, in argument
/// order. `names[col - 1]` lists the aliases of each column.
fn chosen_columns(args: &[PresetArg], rows: std::ops::RangeInclusive<u32>, names: &[&[&str]; 3]) -> Vec<u32> {
    let mut columns = Vec::new();
    for arg in args {
        for row in rows.clone() {
            for col in 1..=3u32 {
                if arg.is(row * 10 + col) || arg.named(names[col as usize - 1]) {
                    columns.push(col);
                }
            }
        }
    }
    columns
}

/// Build an import string for a standard-layout path.
///
/// Rows are visited top to bottom. Dimension and pace rows need a branch
/// named in `args` (by study id or alias such as `"nd"` or `"idle"`); without
/// one, the walk stops there. A second dimension branch is appended at the
/// end for trees allowing two.
pub fn path_preset(graph: &StudyGraph, game: &GameFlags, mode: PresetMode, args: &[&str]) -> String {
    let args: Vec<PresetArg> = args.iter().map(|a| PresetArg::parse(a)).collect();
    let named = |n: u32| args.iter().any(|a| a.is(n));
    let row_of = |row: u32| -> Vec<u32> {
        graph
            .studies_of(StudyKind::Normal)
            .map(StudyId::number)
            .filter(|n| n / 10 == row)
            .collect()
    };

    let mut master: Vec<u32> = Vec::new();
    let mut dimension: Option<u32> = None;
    let mut second_dimension: Option<u32> = None;
    let mut pace: Option<u32> = None;

    for row in 1..=24u32 {
        if mode == PresetMode::None {
            match row {
                2..=4 => {
                    for col in [1, 2] {
                        let wanted = (2..=4).any(|r| named(r * 10 + col));
                        if wanted && !master.contains(&(row * 10 + col)) {
                            master.push(row * 10 + col);
                        }
                    }
                    if row == 3 && named(33) {
                        master.push(33);
                    }
                    continue;
                }
                6 => {
                    master.push(61);
                    if named(62) {
                        master.push(62);
                    }
                    continue;
                }
                16 => {
                    master.extend([161, 162].into_iter().filter(|&n| named(n)));
                    continue;
                }
                19 => {
                    if named(191) {
                        master.push(191);
                    }
                    if named(192) || named(201) {
                        master.push(192);
                    }
                    if named(193) {
                        master.push(193);
                    }
                    continue;
                }
                21 => {
                    master.extend(
                        args.iter()
                            .filter_map(|a| match a {
                                PresetArg::Study(n) if (211..=214).contains(n) => Some(*n),
                                _ => None,
                            }),
                    );
                    continue;
                }
                _ => {}
            }
        }

        match row {
            7..=10 => {
                if mode == PresetMode::All && game.has_flag(flags::TIME_STUDY_SPLIT) {
                    master.extend([row * 10 + 1, row * 10 + 2, row * 10 + 3]);
                    continue;
                }
                let col = match dimension {
                    Some(col) => col,
                    None => {
                        let cols = chosen_columns(
                            &args,
                            7..=10,
                            &[&["nd", "normal"], &["id", "infinity"], &["td", "time"]],
                        );
                        let Some(&first) = cols.first() else {
                            break;
                        };
                        second_dimension = cols.iter().copied().find(|&c| c != first);
                        dimension = Some(first);
                        first
                    }
                };
                master.push(row * 10 + col);
            }
            12..=14 => {
                let col = match pace {
                    Some(col) => col,
                    None => {
                        let cols =
                            chosen_columns(&args, 12..=14, &[&["active"], &["passive"], &["idle"]]);
                        let Some(&first) = cols.first() else {
                            break;
                        };
                        pace = Some(first);
                        first
                    }
                };
                master.push(row * 10 + col);
            }
            22 | 23 => {
                let pairs = 8 / (row - 21);
                for first in (1..=pairs).step_by(2) {
                    let pick = args.iter().find_map(|a| match a {
                        PresetArg::Study(n) if *n == row * 10 + first || *n == row * 10 + first + 1 => {
                            Some(*n)
                        }
                        _ => None,
                    });
                    master.extend(pick);
                }
            }
            _ => master.extend(row_of(row)),
        }
    }

    if let Some(col) = second_dimension {
        master.extend([70 + col, 80 + col, 90 + col, 100 + col]);
    }

    let list: Vec<String> = master.iter().map(u32::to_string).collect();
    format!("{}|0", list.join(","))
}
