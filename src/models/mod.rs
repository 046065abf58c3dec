//! Timetabling domain models.
//!
//! Core data types for stating a weekly timetabling problem and holding
//! its result:
//!
//! - [`SlotGrid`]: the immutable day × period structure of the week,
//!   with designated break periods and a flat slot index.
//! - [`SessionCatalog`]: the normalized list of required sessions, each
//!   with an integer weekly slot quota.
//! - [`Solution`]: the outcome of one solve call.
//!
//! Grids are configuration, built once per run; catalogs are rebuilt
//! whenever new input data arrives, which invalidates any prior
//! solution.

mod grid;
mod session;
mod solution;

pub use grid::{SlotGrid, SlotRef};
pub use session::{Session, SessionCatalog, SessionRow, SlotGranularity};
pub use solution::{SolveStatus, Solution};
