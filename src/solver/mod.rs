//! The solving capability boundary.
//!
//! The core never implements constraint or integer search. It hands a
//! [`CompiledModel`] to a [`SolverAdapter`] together with a wall-clock
//! time budget and an optional seed, and gets back a [`Solution`] with
//! one of the terminal statuses.
//!
//! [`IlpSolver`] is the bundled adapter, backed by `good_lp` with the
//! pure-Rust `microlp` MILP backend. The backend runs on a worker
//! thread; if the budget expires first, the adapter reports
//! [`SolveStatus::TimedOut`](crate::models::SolveStatus::TimedOut)
//! without surfacing any assignment — a surfaced assignment always
//! satisfies every hard constraint in full. The bundled backend
//! explores deterministically, so the seed changes nothing here; the
//! contract requires only that a seed alter exploration order, never
//! which assignments are legal.

use good_lp::{
    constraint, default_solver, variable, Expression, ProblemVariables, ResolutionError,
    Solution as LpSolution, SolverModel, Variable,
};
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crate::compiler::{Comparison, CompiledModel};
use crate::models::{SolveStatus, Solution};
use crate::rules::FlexibilityLevel;

/// Per-solve settings forwarded to the solving capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverConfig {
    /// Hard wall-clock budget for the solve call.
    pub time_budget: Duration,
    /// Optional exploration-order seed.
    pub seed: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_budget: Duration::from_secs(60),
            seed: None,
        }
    }
}

impl SolverConfig {
    /// The budget associated with a flexibility level, no seed.
    pub fn for_level(level: FlexibilityLevel) -> Self {
        Self {
            time_budget: level.time_budget(),
            seed: None,
        }
    }

    /// Sets the exploration seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Interface to an external constraint/integer solving capability.
///
/// Implementations must honor the time budget, report the three
/// terminal outcomes distinctly, and treat the seed as affecting
/// exploration order only.
pub trait SolverAdapter {
    /// Solves a compiled model within the configured budget.
    fn solve(&self, model: &CompiledModel, config: &SolverConfig) -> Solution;
}

/// The bundled ILP adapter over `good_lp`.
///
/// The backend runs on a detached worker thread. On budget expiry the
/// call returns timed out immediately, but the worker is not cancelled:
/// it runs to completion in the background and its late result is
/// dropped. Callers sizing budgets should expect the CPU cost of an
/// expired solve to outlive [`solve`](SolverAdapter::solve).
#[derive(Debug, Clone, Copy, Default)]
pub struct IlpSolver;

impl IlpSolver {
    /// Creates the adapter.
    pub fn new() -> Self {
        Self
    }
}

impl SolverAdapter for IlpSolver {
    fn solve(&self, model: &CompiledModel, config: &SolverConfig) -> Solution {
        if let Some(seed) = config.seed {
            debug!("seed {seed} accepted; bundled backend explores deterministically");
        }
        info!(
            "solving: {} variables, {} constraints, budget {:?}",
            model.num_variables(),
            model.constraints.len(),
            config.time_budget
        );

        let started = Instant::now();
        let worker_model = model.clone();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let outcome = run_backend(&worker_model);
            // Receiver may have given up on the budget already.
            let _ = tx.send(outcome);
        });

        match rx.recv_timeout(config.time_budget) {
            Ok(outcome) => {
                debug!("backend returned in {:.2?}", started.elapsed());
                solution_for_outcome(outcome)
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!("budget {:?} exhausted without an outcome", config.time_budget);
                Solution::timed_out()
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                warn!("backend worker terminated without reporting an outcome");
                Solution::timed_out()
            }
        }
    }
}

/// Maps a backend outcome to a terminal solution.
///
/// Only a literal [`ResolutionError::Infeasible`] becomes
/// [`SolveStatus::Infeasible`]: that status is a claim of proof.
/// Any other backend failure carries neither an assignment nor a proof
/// and is reported as timed out.
fn solution_for_outcome(
    outcome: Result<Vec<BTreeSet<usize>>, ResolutionError>,
) -> Solution {
    match outcome {
        Ok(assignment) => {
            // Pure feasibility model: any feasible point is optimal.
            Solution::solved(SolveStatus::Optimal, assignment)
        }
        Err(ResolutionError::Infeasible) => {
            info!("proven infeasible");
            Solution::infeasible()
        }
        Err(other) => {
            warn!("backend failed without an assignment or a proof: {other}");
            Solution::timed_out()
        }
    }
}

/// Translates the IR to a `good_lp` problem and runs the backend.
fn run_backend(model: &CompiledModel) -> Result<Vec<BTreeSet<usize>>, ResolutionError> {
    let mut problem = ProblemVariables::new();
    let vars: Vec<Variable> = problem.add_vector(variable().binary(), model.num_variables());

    // Feasibility problem: constant objective.
    let mut lp = problem
        .minimise(Expression::from(0.0))
        .using(default_solver);

    for c in &model.constraints {
        let expr = c
            .terms
            .iter()
            .fold(Expression::from(0.0), |acc, &(v, coeff)| {
                acc + coeff * Expression::from(vars[v])
            });
        let built = match c.cmp {
            Comparison::Eq => constraint!(expr == c.rhs),
            Comparison::Le => constraint!(expr <= c.rhs),
            Comparison::Ge => constraint!(expr >= c.rhs),
        };
        lp.add_constraint(built);
    }

    let solved = lp.solve()?;

    let mut assignment = vec![BTreeSet::new(); model.num_sessions()];
    for session in 0..model.num_sessions() {
        for slot in 0..model.num_slots() {
            if solved.value(vars[model.var_index(session, slot)]) > 0.5 {
                assignment[session].insert(slot);
            }
        }
    }
    Ok(assignment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ConstraintCompiler;
    use crate::models::{SessionCatalog, SessionRow, SlotGranularity, SlotGrid, SlotRef};
    use crate::rules::{RuleEntry, RuleKind, RuleSet, SessionFilter};

    fn grid_3x4_break_at_2() -> SlotGrid {
        SlotGrid::new(
            vec!["Mon".into(), "Tue".into(), "Wed".into()],
            vec!["P0".into(), "P1".into(), "P2".into(), "P3".into()],
            [2],
        )
        .unwrap()
    }

    fn catalog(rows: Vec<SessionRow>) -> SessionCatalog {
        SessionCatalog::from_rows(rows, SlotGranularity::from_minutes(60).unwrap()).unwrap()
    }

    fn solve(cat: &SessionCatalog, grid: &SlotGrid, rules: &RuleSet) -> Solution {
        let model = ConstraintCompiler::new(cat, grid, rules).compile().unwrap();
        IlpSolver::new().solve(&model, &SolverConfig::default())
    }

    // Scenario: two quota-2 sessions sharing a course on a 3x4 grid
    // with a break at period 2.
    #[test]
    fn test_shared_course_schedule_is_feasible_and_clean() {
        let grid = grid_3x4_break_at_2();
        let cat = catalog(vec![
            SessionRow::new("T1", "Math", "C1", 2.0),
            SessionRow::new("T2", "English", "C1", 2.0),
        ]);
        let solution = solve(&cat, &grid, &RuleSet::new());

        assert!(solution.is_solved());
        let t1 = solution.slots_for(0).unwrap();
        let t2 = solution.slots_for(1).unwrap();

        // Quotas met exactly
        assert_eq!(t1.len(), 2);
        assert_eq!(t2.len(), 2);
        // Shared course: never the same slot
        assert!(t1.is_disjoint(t2));
        // Never on a break slot
        for &slot in t1.iter().chain(t2) {
            assert!(!grid.is_break(slot));
        }
    }

    // Scenario: an availability window smaller than the quota.
    #[test]
    fn test_window_smaller_than_quota_is_infeasible() {
        let grid = grid_3x4_break_at_2();
        let cat = catalog(vec![SessionRow::new("T1", "Math", "C1", 3.0)]);
        let mut rules = RuleSet::new();
        rules
            .register(RuleEntry::new(
                "t1_window",
                RuleKind::AvailabilityWindow {
                    filter: SessionFilter::any().teacher("T1"),
                    allowed: vec![SlotRef::new(0, 0), SlotRef::new(0, 1)],
                },
            ))
            .unwrap();

        let solution = solve(&cat, &grid, &rules);
        assert_eq!(solution.status(), SolveStatus::Infeasible);
        assert!(solution.assignment().is_none());
    }

    // Scenario: a daily minimum the quota cannot cover.
    #[test]
    fn test_daily_minimum_beyond_quota_is_infeasible() {
        let grid = grid_3x4_break_at_2(); // 3 days
        let cat = catalog(vec![SessionRow::new("T1", "Math", "C1", 2.0)]);
        let mut rules = RuleSet::new();
        rules
            .register(RuleEntry::new(
                "math_every_day",
                RuleKind::DailyMinimum {
                    filter: SessionFilter::any().subject_contains("math"),
                    min_per_day: 1,
                },
            ))
            .unwrap();

        let solution = solve(&cat, &grid, &rules);
        assert_eq!(solution.status(), SolveStatus::Infeasible);
    }

    #[test]
    fn test_daily_exactly_one_places_one_per_day() {
        let grid = grid_3x4_break_at_2();
        let cat = catalog(vec![SessionRow::new("Andrea", "English Infant", "Infant A", 3.0)]);
        let mut rules = RuleSet::new();
        rules
            .register(RuleEntry::new(
                "andrea_daily",
                RuleKind::DailyExactlyOne {
                    filter: SessionFilter::any().teacher("Andrea"),
                },
            ))
            .unwrap();

        let solution = solve(&cat, &grid, &rules);
        assert!(solution.is_solved());
        let slots = solution.slots_for(0).unwrap();
        for day in 0..3 {
            let on_day = slots.iter().filter(|&&f| grid.day_of(f) == day).count();
            assert_eq!(on_day, 1);
        }
    }

    #[test]
    fn test_require_one_at_target_slot() {
        let grid = grid_3x4_break_at_2();
        let cat = catalog(vec![
            SessionRow::new("Toni", "Music", "C4", 1.0),
            SessionRow::new("Isabel", "Science", "C4", 1.0),
        ]);
        let mut rules = RuleSet::new();
        rules
            .register(RuleEntry::new(
                "c4_covered_tue_first",
                RuleKind::RequireOneAt {
                    filter: SessionFilter::any().any_teacher_of(["Toni", "Isabel"]),
                    slot: SlotRef::new(1, 0),
                },
            ))
            .unwrap();

        let solution = solve(&cat, &grid, &rules);
        assert!(solution.is_solved());
        let target = grid.flat_index(1, 0);
        let covered = (0..cat.len())
            .filter_map(|s| solution.slots_for(s))
            .any(|slots| slots.contains(&target));
        assert!(covered);
    }

    #[test]
    fn test_mutual_exclusion_end_to_end() {
        let grid = grid_3x4_break_at_2();
        // Fernando teaches PE; English runs in parallel courses.
        let cat = catalog(vec![
            SessionRow::new("Fernando", "PE", "C1", 3.0),
            SessionRow::new("Lucia", "English", "C2", 3.0),
        ]);
        let mut rules = RuleSet::new();
        rules
            .register(RuleEntry::new(
                "fernando_free_during_english",
                RuleKind::MutualExclusion {
                    left: SessionFilter::any().teacher("Fernando"),
                    right: SessionFilter::any().subject_contains("english"),
                },
            ))
            .unwrap();

        let solution = solve(&cat, &grid, &rules);
        assert!(solution.is_solved());
        let fernando = solution.slots_for(0).unwrap();
        let english = solution.slots_for(1).unwrap();
        assert!(fernando.is_disjoint(english));
    }

    #[test]
    fn test_backend_failure_is_not_an_infeasibility_proof() {
        // Only a literal infeasibility proof may claim Infeasible; any
        // other backend failure reports TimedOut with no assignment.
        let failed = solution_for_outcome(Err(ResolutionError::Unbounded));
        assert_eq!(failed.status(), SolveStatus::TimedOut);
        assert!(failed.assignment().is_none());

        let proven = solution_for_outcome(Err(ResolutionError::Infeasible));
        assert_eq!(proven.status(), SolveStatus::Infeasible);
    }

    #[test]
    fn test_trivial_infeasibility_quota_exceeds_grid() {
        // 1 day x 2 periods, both breaks: nothing is schedulable.
        let grid = SlotGrid::new(
            vec!["Mon".into()],
            vec!["P0".into(), "P1".into()],
            [0, 1],
        )
        .unwrap();
        let cat = catalog(vec![SessionRow::new("T1", "Math", "C1", 1.0)]);
        let solution = solve(&cat, &grid, &RuleSet::new());
        assert_eq!(solution.status(), SolveStatus::Infeasible);
    }
}
