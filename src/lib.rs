//! Weekly teaching timetable core.
//!
//! Assigns recurring teaching sessions (teacher × subject × course,
//! each with a weekly slot quota) to a fixed weekly grid of time slots,
//! subject to hard feasibility rules and a registry of toggleable
//! scheduling rules, then projects the result into per-course and
//! per-teacher grids and load totals.
//!
//! # Modules
//!
//! - **`models`**: Domain types — `SlotGrid`, `SessionCatalog`,
//!   `Solution`
//! - **`rules`**: The rule registry — `RuleSet`, `RuleEntry`,
//!   `RuleKind`, flexibility levels
//! - **`compiler`**: Boolean-variable constraint compilation
//! - **`solver`**: The `SolverAdapter` boundary and the bundled ILP
//!   adapter
//! - **`projection`**: Grids and load summaries from a solved
//!   assignment
//! - **`planner`**: The generate/regenerate lifecycle
//!
//! # Pipeline
//!
//! ```text
//! SlotGrid + SessionCatalog + RuleSet
//!     -> ConstraintCompiler -> CompiledModel
//!     -> SolverAdapter      -> Solution
//!     -> SolutionProjector  -> grids + LoadSummary
//! ```
//!
//! File ingestion, rendering, and export are external collaborators:
//! rows come in as validated [`models::SessionRow`] values and results
//! leave as plain mapping/sequence structures.
//!
//! # Example
//!
//! ```
//! use timetabler::models::{SessionRow, SlotGranularity, SlotGrid};
//! use timetabler::planner::Planner;
//! use timetabler::projection::SolutionProjector;
//! use timetabler::rules::RuleSet;
//! use timetabler::solver::IlpSolver;
//!
//! let grid = SlotGrid::new(
//!     vec!["Mon".into(), "Tue".into(), "Wed".into()],
//!     vec!["09:00".into(), "10:00".into(), "11:00".into()],
//!     [1], // mid-morning break
//! )?;
//! let planner = Planner::new(grid, RuleSet::new(), IlpSolver::new());
//!
//! planner.load_rows(
//!     vec![SessionRow::new("T1", "Math", "C1", 2.0)],
//!     SlotGranularity::from_minutes(60)?,
//! )?;
//! let solution = planner.generate()?;
//!
//! let catalog = planner.catalog().unwrap();
//! let projector = SolutionProjector::new(&catalog, planner.grid(), &solution).unwrap();
//! let summary = projector.load_summary();
//! assert_eq!(summary.by_teacher["T1"].hours, 2.0);
//! # Ok::<(), timetabler::ConfigurationError>(())
//! ```

pub mod compiler;
pub mod error;
pub mod models;
pub mod planner;
pub mod projection;
pub mod rules;
pub mod solver;

pub use error::ConfigurationError;
