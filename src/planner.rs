//! The generation lifecycle.
//!
//! Drives a problem from loaded data to a projected timetable:
//!
//! ```text
//! Idle -> (load_rows) -> Ready -> (generate) -> Solving
//!      -> { Solved | Infeasible | TimedOut }
//! ```
//!
//! From any terminal state, `generate`/`regenerate` solves again; from
//! any state, `load_rows` discards the current solution and returns to
//! `Ready`. Each generation compiles an independent model and yields an
//! independent solution. The finished solution is installed with a
//! single write under a lock, so readers never observe a half-updated
//! one; a solve that was in flight when new data arrived is discarded
//! on completion instead of resurrecting a stale result.
//!
//! The grid and rule set live on the planner and are only handed out
//! by shared reference, so configuration cannot be mutated while a
//! solve is in flight.

use log::info;
use parking_lot::RwLock;
use rand::Rng;
use std::sync::Arc;

use crate::compiler::ConstraintCompiler;
use crate::error::ConfigurationError;
use crate::models::{SessionCatalog, SessionRow, SlotGranularity, SlotGrid, Solution};
use crate::rules::RuleSet;
use crate::solver::{SolverAdapter, SolverConfig};

/// Where a planner currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    /// No session data loaded yet.
    Idle,
    /// Data loaded, nothing solved.
    Ready,
    /// A generation is running.
    Solving,
    /// The last generation produced an assignment.
    Solved,
    /// The last generation proved the model infeasible.
    Infeasible,
    /// The last generation ran out of budget.
    TimedOut,
}

struct PlannerInner {
    catalog: Option<Arc<SessionCatalog>>,
    solution: Option<Arc<Solution>>,
    state: GenerationState,
    /// Bumped on every data load; stale in-flight results are dropped.
    epoch: u64,
}

/// Owns the configuration and the current generation result.
pub struct Planner<S> {
    grid: SlotGrid,
    rules: RuleSet,
    solver: S,
    inner: RwLock<PlannerInner>,
}

impl<S: SolverAdapter> Planner<S> {
    /// Creates a planner over fixed configuration and a solver.
    pub fn new(grid: SlotGrid, rules: RuleSet, solver: S) -> Self {
        Self {
            grid,
            rules,
            solver,
            inner: RwLock::new(PlannerInner {
                catalog: None,
                solution: None,
                state: GenerationState::Idle,
                epoch: 0,
            }),
        }
    }

    /// Rebuilds the catalog from fresh input rows.
    ///
    /// Discards any current solution and returns the planner to
    /// [`Ready`](GenerationState::Ready).
    pub fn load_rows(
        &self,
        rows: Vec<SessionRow>,
        granularity: SlotGranularity,
    ) -> Result<(), ConfigurationError> {
        let catalog = SessionCatalog::from_rows(rows, granularity)?;
        info!(
            "loaded {} sessions ({} teachers, {} courses)",
            catalog.len(),
            catalog.teachers().len(),
            catalog.courses().len()
        );
        let mut inner = self.inner.write();
        inner.catalog = Some(Arc::new(catalog));
        inner.solution = None;
        inner.state = GenerationState::Ready;
        inner.epoch += 1;
        Ok(())
    }

    /// Compiles and solves with the level's default budget and no seed.
    pub fn generate(&self) -> Result<Arc<Solution>, ConfigurationError> {
        self.generate_with_seed(None)
    }

    /// Solves again with a fresh random seed.
    ///
    /// Caller-initiated; the planner never retries on its own.
    pub fn regenerate(&self) -> Result<Arc<Solution>, ConfigurationError> {
        let seed: u64 = rand::rng().random_range(1..=1_000_000);
        self.generate_with_seed(Some(seed))
    }

    /// Compiles a fresh model and solves it, blocking until the solver
    /// returns or its budget expires.
    pub fn generate_with_seed(
        &self,
        seed: Option<u64>,
    ) -> Result<Arc<Solution>, ConfigurationError> {
        let (catalog, epoch) = {
            let mut inner = self.inner.write();
            let catalog = inner
                .catalog
                .clone()
                .ok_or(ConfigurationError::NoSessionData)?;
            inner.state = GenerationState::Solving;
            (catalog, inner.epoch)
        };

        // Compile and solve without holding the lock: readers can still
        // see the previous solution while this one is produced.
        let model = ConstraintCompiler::new(&catalog, &self.grid, &self.rules).compile();
        let model = match model {
            Ok(model) => model,
            Err(err) => {
                let mut inner = self.inner.write();
                if inner.epoch == epoch {
                    inner.state = terminal_or_ready(&inner.solution);
                }
                return Err(err);
            }
        };

        let mut config = SolverConfig::for_level(self.rules.level());
        if let Some(seed) = seed {
            config = config.with_seed(seed);
        }
        let solution = Arc::new(self.solver.solve(&model, &config));

        let mut inner = self.inner.write();
        if inner.epoch == epoch {
            inner.solution = solution.is_solved().then(|| Arc::clone(&solution));
            inner.state = match solution.status() {
                s if s.is_solved() => GenerationState::Solved,
                crate::models::SolveStatus::Infeasible => GenerationState::Infeasible,
                _ => GenerationState::TimedOut,
            };
        } else {
            info!("discarding solve result for superseded data");
        }
        Ok(solution)
    }

    /// The current state.
    pub fn state(&self) -> GenerationState {
        self.inner.read().state
    }

    /// The last installed solution, if any.
    pub fn solution(&self) -> Option<Arc<Solution>> {
        self.inner.read().solution.clone()
    }

    /// The catalog built from the last loaded rows, if any.
    pub fn catalog(&self) -> Option<Arc<SessionCatalog>> {
        self.inner.read().catalog.clone()
    }

    /// The grid this planner schedules against.
    pub fn grid(&self) -> &SlotGrid {
        &self.grid
    }

    /// The rule registry this planner compiles with.
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }
}

fn terminal_or_ready(solution: &Option<Arc<Solution>>) -> GenerationState {
    if solution.is_some() {
        GenerationState::Solved
    } else {
        GenerationState::Ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CompiledModel;
    use crate::models::{SolveStatus, SlotRef};
    use crate::rules::{RuleEntry, RuleKind, SessionFilter};
    use crate::solver::IlpSolver;
    use parking_lot::Mutex;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread;

    fn grid() -> SlotGrid {
        SlotGrid::new(
            vec!["Mon".into(), "Tue".into(), "Wed".into()],
            vec!["P0".into(), "P1".into(), "P2".into(), "P3".into()],
            [2],
        )
        .unwrap()
    }

    fn rows() -> Vec<SessionRow> {
        vec![
            SessionRow::new("T1", "Math", "C1", 2.0),
            SessionRow::new("T2", "English", "C1", 2.0),
        ]
    }

    fn hourly() -> SlotGranularity {
        SlotGranularity::from_minutes(60).unwrap()
    }

    /// Scripted solver for lifecycle tests.
    struct StubSolver {
        outcomes: Vec<Solution>,
        calls: AtomicUsize,
    }

    impl StubSolver {
        fn returning(outcomes: Vec<Solution>) -> Self {
            Self {
                outcomes,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl SolverAdapter for StubSolver {
        fn solve(&self, model: &CompiledModel, _config: &SolverConfig) -> Solution {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes
                .get(call)
                .cloned()
                .unwrap_or_else(|| {
                    Solution::solved(
                        SolveStatus::Optimal,
                        vec![BTreeSet::new(); model.num_sessions()],
                    )
                })
        }
    }

    #[test]
    fn test_generate_before_load_fails() {
        let planner = Planner::new(grid(), RuleSet::new(), IlpSolver::new());
        assert_eq!(planner.state(), GenerationState::Idle);
        assert_eq!(
            planner.generate().unwrap_err(),
            ConfigurationError::NoSessionData
        );
        assert_eq!(planner.state(), GenerationState::Idle);
    }

    #[test]
    fn test_full_lifecycle_with_real_solver() {
        let planner = Planner::new(grid(), RuleSet::new(), IlpSolver::new());
        planner.load_rows(rows(), hourly()).unwrap();
        assert_eq!(planner.state(), GenerationState::Ready);
        assert!(planner.solution().is_none());

        let solution = planner.generate().unwrap();
        assert!(solution.is_solved());
        assert_eq!(planner.state(), GenerationState::Solved);
        assert!(planner.solution().is_some());
    }

    #[test]
    fn test_infeasible_and_timed_out_states() {
        let stub = StubSolver::returning(vec![Solution::infeasible(), Solution::timed_out()]);
        let planner = Planner::new(grid(), RuleSet::new(), stub);
        planner.load_rows(rows(), hourly()).unwrap();

        planner.generate().unwrap();
        assert_eq!(planner.state(), GenerationState::Infeasible);
        assert!(planner.solution().is_none());

        planner.generate().unwrap();
        assert_eq!(planner.state(), GenerationState::TimedOut);
        assert!(planner.solution().is_none());
    }

    #[test]
    fn test_reload_discards_solution() {
        let planner = Planner::new(grid(), RuleSet::new(), IlpSolver::new());
        planner.load_rows(rows(), hourly()).unwrap();
        planner.generate().unwrap();
        assert_eq!(planner.state(), GenerationState::Solved);

        planner.load_rows(rows(), hourly()).unwrap();
        assert_eq!(planner.state(), GenerationState::Ready);
        assert!(planner.solution().is_none());
    }

    #[test]
    fn test_regenerate_from_terminal_state() {
        let planner = Planner::new(grid(), RuleSet::new(), IlpSolver::new());
        planner.load_rows(rows(), hourly()).unwrap();
        planner.generate().unwrap();

        let again = planner.regenerate().unwrap();
        assert!(again.is_solved());
        assert_eq!(planner.state(), GenerationState::Solved);
    }

    /// Solver that blocks until the test releases it, so a solve can be
    /// held in flight while the planner receives new data.
    struct GatedSolver {
        started: mpsc::Sender<()>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl SolverAdapter for GatedSolver {
        fn solve(&self, model: &CompiledModel, _config: &SolverConfig) -> Solution {
            self.started.send(()).unwrap();
            self.release.lock().recv().unwrap();
            Solution::solved(
                SolveStatus::Optimal,
                vec![BTreeSet::new(); model.num_sessions()],
            )
        }
    }

    #[test]
    fn test_stale_result_not_installed_after_reload() {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let solver = GatedSolver {
            started: started_tx,
            release: Mutex::new(release_rx),
        };
        let planner = Arc::new(Planner::new(grid(), RuleSet::new(), solver));
        planner.load_rows(rows(), hourly()).unwrap();

        let in_flight = {
            let planner = Arc::clone(&planner);
            thread::spawn(move || planner.generate().unwrap())
        };
        started_rx.recv().unwrap();
        assert_eq!(planner.state(), GenerationState::Solving);

        // New data arrives while the solve is still running.
        planner.load_rows(rows(), hourly()).unwrap();
        release_tx.send(()).unwrap();

        // The solve itself finished with an assignment, but it belongs
        // to the superseded data and must not be installed.
        let finished = in_flight.join().unwrap();
        assert!(finished.is_solved());
        assert!(planner.solution().is_none());
        assert_eq!(planner.state(), GenerationState::Ready);
    }

    #[test]
    fn test_compile_error_surfaces_without_installing() {
        let mut rules = RuleSet::new();
        rules
            .register(RuleEntry::new(
                "off_grid",
                RuleKind::RequireOneAt {
                    filter: SessionFilter::any(),
                    slot: SlotRef::new(40, 0),
                },
            ))
            .unwrap();
        let planner = Planner::new(grid(), rules, IlpSolver::new());
        planner.load_rows(rows(), hourly()).unwrap();

        let err = planner.generate().unwrap_err();
        assert!(matches!(err, ConfigurationError::SlotOutOfRange { .. }));
        assert_eq!(planner.state(), GenerationState::Ready);
        assert!(planner.solution().is_none());
    }
}
