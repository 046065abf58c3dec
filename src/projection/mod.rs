//! Projection of a raw assignment into human-usable views.
//!
//! A solved [`Solution`] is a boolean matrix; consumers want weekly
//! grids per course and per teacher, and load totals. The projector
//! reads an immutable solution snapshot and builds:
//!
//! - [`TimetableGrid`]: days × periods of [`GridCell`]s. Break cells
//!   are the fixed [`GridCell::Break`] sentinel and are never looked up
//!   against the assignment.
//! - [`LoadSummary`]: slot counts per teacher / subject / course,
//!   converted back to declared hours with the same granularity that
//!   derived the quotas — the conversion is the exact inverse.
//!
//! Output types are plain mappings and sequences; rendering and export
//! stay with external collaborators.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{SessionCatalog, SlotGrid, Solution};

/// One lesson shown in a grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridEntry {
    pub subject: String,
    /// The teacher in a course view; the course in a teacher view.
    pub counterpart: String,
}

/// Contents of one (day, period) cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridCell {
    /// Blocked period; rendered as a fixed sentinel.
    Break,
    /// Lessons active in the slot. Empty means free.
    Lessons(Vec<GridEntry>),
}

impl GridCell {
    /// Whether the cell holds no lessons (break or free).
    pub fn is_empty(&self) -> bool {
        match self {
            GridCell::Break => true,
            GridCell::Lessons(entries) => entries.is_empty(),
        }
    }
}

/// A weekly view for one course or one teacher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimetableGrid {
    /// Course or teacher name the view belongs to.
    pub title: String,
    pub days: Vec<String>,
    pub periods: Vec<String>,
    /// Flat-indexed cells, same bijection as the grid.
    cells: Vec<GridCell>,
}

impl TimetableGrid {
    /// The cell at (day, period).
    pub fn cell(&self, day: usize, period: usize) -> &GridCell {
        &self.cells[day * self.periods.len() + period]
    }

    /// All cells in flat order.
    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }
}

/// Slot count and declared-hour equivalent for one grouping key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadEntry {
    pub slots: u32,
    pub hours: f64,
}

/// Aggregate teaching load per teacher, subject, and course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadSummary {
    pub by_teacher: BTreeMap<String, LoadEntry>,
    pub by_subject: BTreeMap<String, LoadEntry>,
    pub by_course: BTreeMap<String, LoadEntry>,
}

impl LoadSummary {
    /// Total assigned slots across all sessions.
    pub fn total_slots(&self) -> u32 {
        self.by_teacher.values().map(|e| e.slots).sum()
    }
}

/// Read-only projection over one solved solution.
pub struct SolutionProjector<'a> {
    catalog: &'a SessionCatalog,
    grid: &'a SlotGrid,
    solution: &'a Solution,
}

impl<'a> SolutionProjector<'a> {
    /// Creates a projector, or `None` if the solution carries no
    /// assignment (infeasible or timed out).
    pub fn new(
        catalog: &'a SessionCatalog,
        grid: &'a SlotGrid,
        solution: &'a Solution,
    ) -> Option<Self> {
        if !solution.is_solved() {
            return None;
        }
        Some(Self {
            catalog,
            grid,
            solution,
        })
    }

    /// The weekly grid for one course: each slot lists the
    /// (subject, teacher) pairs active there.
    pub fn course_grid(&self, course: &str) -> TimetableGrid {
        self.build_grid(course, |s| &s.course, |s| &s.teacher)
    }

    /// The weekly grid for one teacher: each slot lists the
    /// (subject, course) pairs active there.
    pub fn teacher_grid(&self, teacher: &str) -> TimetableGrid {
        self.build_grid(teacher, |s| &s.teacher, |s| &s.course)
    }

    /// One grid per distinct course, sorted by course name.
    pub fn course_grids(&self) -> Vec<TimetableGrid> {
        self.catalog
            .courses()
            .into_iter()
            .map(|c| self.course_grid(c))
            .collect()
    }

    /// One grid per distinct teacher, sorted by teacher name.
    pub fn teacher_grids(&self) -> Vec<TimetableGrid> {
        self.catalog
            .teachers()
            .into_iter()
            .map(|t| self.teacher_grid(t))
            .collect()
    }

    /// Assigned-slot totals per teacher, subject, and course, with the
    /// declared-hour equivalents.
    pub fn load_summary(&self) -> LoadSummary {
        let granularity = self.catalog.granularity();
        let counts = |key: fn(&crate::models::Session) -> &String| -> BTreeMap<String, LoadEntry> {
            self.catalog
                .sessions()
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    let assigned = self
                        .solution
                        .slots_for(i)
                        .map(|slots| slots.len() as u32)
                        .unwrap_or(0);
                    (key(s).clone(), assigned)
                })
                .into_group_map()
                .into_iter()
                .map(|(name, slot_counts)| {
                    let slots: u32 = slot_counts.into_iter().sum();
                    (
                        name,
                        LoadEntry {
                            slots,
                            hours: granularity.hours_for_slots(slots),
                        },
                    )
                })
                .collect()
        };

        LoadSummary {
            by_teacher: counts(|s| &s.teacher),
            by_subject: counts(|s| &s.subject),
            by_course: counts(|s| &s.course),
        }
    }

    fn build_grid(
        &self,
        title: &str,
        key: impl Fn(&crate::models::Session) -> &String,
        counterpart: impl Fn(&crate::models::Session) -> &String,
    ) -> TimetableGrid {
        let mut cells: Vec<GridCell> = self
            .grid
            .slots()
            .map(|f| {
                if self.grid.is_break(f) {
                    GridCell::Break
                } else {
                    GridCell::Lessons(Vec::new())
                }
            })
            .collect();

        for (i, session) in self.catalog.sessions().iter().enumerate() {
            if key(session) != title {
                continue;
            }
            let Some(slots) = self.solution.slots_for(i) else {
                continue;
            };
            for &flat in slots {
                if let GridCell::Lessons(entries) = &mut cells[flat] {
                    entries.push(GridEntry {
                        subject: session.subject.clone(),
                        counterpart: counterpart(session).clone(),
                    });
                }
            }
        }

        TimetableGrid {
            title: title.to_string(),
            days: self.grid.days().to_vec(),
            periods: self.grid.periods().to_vec(),
            cells,
        }
    }
}
