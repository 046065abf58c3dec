//! Solver outcomes.
//!
//! A [`Solution`] is produced once per solve call and held immutably
//! until superseded by a newer solve or invalidated by new input data.
//! The assignment is present exactly when the status is a solved one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Terminal outcome of a solve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// A feasible assignment was found and proven optimal.
    Optimal,
    /// A feasible assignment was found but optimality was not proven.
    ///
    /// Treated identically to [`Optimal`](Self::Optimal) downstream.
    Feasible,
    /// The solver proved no assignment satisfies the hard constraints.
    Infeasible,
    /// The solve ended without a feasible assignment or an
    /// infeasibility proof, typically because the time budget expired.
    TimedOut,
}

impl SolveStatus {
    /// Whether this status carries an assignment.
    pub fn is_solved(&self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

/// The result of one generation run.
///
/// `assignment[session]` is the set of flat slot indices the session
/// occupies. For every solved solution, `assignment[s].len()` equals
/// the session's quota exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    status: SolveStatus,
    assignment: Option<Vec<BTreeSet<usize>>>,
}

impl Solution {
    /// Wraps a feasible or optimal assignment.
    pub fn solved(status: SolveStatus, assignment: Vec<BTreeSet<usize>>) -> Self {
        debug_assert!(status.is_solved());
        Self {
            status,
            assignment: Some(assignment),
        }
    }

    /// A proven-infeasible outcome.
    pub fn infeasible() -> Self {
        Self {
            status: SolveStatus::Infeasible,
            assignment: None,
        }
    }

    /// A budget-exhausted outcome with nothing to surface.
    pub fn timed_out() -> Self {
        Self {
            status: SolveStatus::TimedOut,
            assignment: None,
        }
    }

    /// The terminal status.
    pub fn status(&self) -> SolveStatus {
        self.status
    }

    /// Whether an assignment is available for projection.
    pub fn is_solved(&self) -> bool {
        self.status.is_solved()
    }

    /// The full assignment, if solved.
    pub fn assignment(&self) -> Option<&[BTreeSet<usize>]> {
        self.assignment.as_deref()
    }

    /// The slots assigned to one session, if solved.
    pub fn slots_for(&self, session: usize) -> Option<&BTreeSet<usize>> {
        self.assignment.as_ref().and_then(|a| a.get(session))
    }
}
