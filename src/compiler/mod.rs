//! Compilation of a catalog, grid, and rule set into a constraint model.
//!
//! The compiler creates one boolean decision variable per
//! (session, slot) pair and emits linear constraints over them:
//! four always-on hard families (quota, teacher exclusivity, course
//! exclusivity, break blocking) plus whatever the active rules
//! generate. The output is a solver-agnostic [`CompiledModel`] handed
//! to a [`SolverAdapter`](crate::solver::SolverAdapter).
//!
//! Compilation is pure and deterministic: identical inputs produce an
//! identical constraint list. Iteration runs sessions ascending, slots
//! ascending, and rules in registration order — no hash-map ordering
//! leaks into the emitted model. A fresh model is compiled for every
//! generation call and never reused.

use itertools::Itertools;
use log::{debug, info};
use std::collections::BTreeSet;

use crate::error::ConfigurationError;
use crate::models::{SessionCatalog, SlotGrid, SlotRef};
use crate::rules::{RuleKind, RuleSet, SessionFilter};

/// Relation between a linear expression and its right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Le,
    Ge,
}

/// One linear constraint over the decision variables.
///
/// `terms` holds (variable index, coefficient) pairs; the constraint
/// reads `sum(coeff * var) cmp rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub terms: Vec<(usize, f64)>,
    pub cmp: Comparison,
    pub rhs: f64,
}

impl LinearConstraint {
    fn with_unit_terms(vars: impl IntoIterator<Item = usize>, cmp: Comparison, rhs: f64) -> Self {
        Self {
            terms: vars.into_iter().map(|v| (v, 1.0)).collect(),
            cmp,
            rhs,
        }
    }

    /// `sum(vars) == rhs`
    pub fn eq(vars: impl IntoIterator<Item = usize>, rhs: f64) -> Self {
        Self::with_unit_terms(vars, Comparison::Eq, rhs)
    }

    /// `sum(vars) <= rhs`
    pub fn le(vars: impl IntoIterator<Item = usize>, rhs: f64) -> Self {
        Self::with_unit_terms(vars, Comparison::Le, rhs)
    }

    /// `sum(vars) >= rhs`
    pub fn ge(vars: impl IntoIterator<Item = usize>, rhs: f64) -> Self {
        Self::with_unit_terms(vars, Comparison::Ge, rhs)
    }
}

/// A compiled constraint model, opaque to everything but the solver.
///
/// Decision variables are boolean, indexed by
/// `session * num_slots + slot` — the same bijection the projector uses
/// to read an assignment back out.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledModel {
    num_sessions: usize,
    num_slots: usize,
    pub constraints: Vec<LinearConstraint>,
}

impl CompiledModel {
    /// Total decision variable count: |sessions| × |slots|.
    pub fn num_variables(&self) -> usize {
        self.num_sessions * self.num_slots
    }

    /// Number of sessions the model was compiled for.
    pub fn num_sessions(&self) -> usize {
        self.num_sessions
    }

    /// Number of slots the model was compiled for.
    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    /// Variable index of (session, slot).
    #[inline]
    pub fn var_index(&self, session: usize, slot: usize) -> usize {
        session * self.num_slots + slot
    }
}

/// Builds a [`CompiledModel`] from the catalog, grid, and active rules.
pub struct ConstraintCompiler<'a> {
    catalog: &'a SessionCatalog,
    grid: &'a SlotGrid,
    rules: &'a RuleSet,
}

impl<'a> ConstraintCompiler<'a> {
    /// Creates a compiler over borrowed, read-only inputs.
    pub fn new(catalog: &'a SessionCatalog, grid: &'a SlotGrid, rules: &'a RuleSet) -> Self {
        Self {
            catalog,
            grid,
            rules,
        }
    }

    /// Compiles the full model.
    ///
    /// Configuration problems (out-of-range slot references) abort
    /// compilation; no partial model is ever returned.
    pub fn compile(&self) -> Result<CompiledModel, ConfigurationError> {
        let mut model = CompiledModel {
            num_sessions: self.catalog.len(),
            num_slots: self.grid.slot_count(),
            constraints: Vec::new(),
        };

        info!(
            "compiling model: {} sessions x {} slots = {} variables",
            model.num_sessions,
            model.num_slots,
            model.num_variables()
        );

        self.emit_quotas(&mut model);
        self.emit_exclusivity(&mut model);
        self.emit_break_blocking(&mut model);

        for entry in self.rules.active() {
            self.emit_rule(&entry.name, &entry.kind, &mut model)?;
        }

        info!("compiled {} constraints", model.constraints.len());
        Ok(model)
    }

    /// Quota: each session occupies exactly its quota of slots.
    fn emit_quotas(&self, model: &mut CompiledModel) {
        for (s, session) in self.catalog.sessions().iter().enumerate() {
            let vars: Vec<usize> = self.grid.slots().map(|f| model.var_index(s, f)).collect();
            let quota = LinearConstraint::eq(vars, f64::from(session.quota));
            model.constraints.push(quota);
        }
    }

    /// Teacher and course exclusivity: at most one active session per
    /// slot for any teacher and for any course.
    fn emit_exclusivity(&self, model: &mut CompiledModel) {
        let sessions = self.catalog.sessions();
        for flat in self.grid.slots() {
            for teacher in self.catalog.teachers() {
                let group: Vec<usize> = sessions
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| s.teacher == teacher)
                    .map(|(i, _)| model.var_index(i, flat))
                    .collect();
                if group.len() > 1 {
                    model.constraints.push(LinearConstraint::le(group, 1.0));
                }
            }
            for course in self.catalog.courses() {
                let group: Vec<usize> = sessions
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| s.course == course)
                    .map(|(i, _)| model.var_index(i, flat))
                    .collect();
                if group.len() > 1 {
                    model.constraints.push(LinearConstraint::le(group, 1.0));
                }
            }
        }
    }

    /// Break blocking: no session occupies a break slot.
    fn emit_break_blocking(&self, model: &mut CompiledModel) {
        if self.catalog.is_empty() {
            return;
        }
        for flat in self.grid.slots().filter(|&f| self.grid.is_break(f)) {
            let vars: Vec<usize> = (0..self.catalog.len())
                .map(|s| model.var_index(s, flat))
                .collect();
            model.constraints.push(LinearConstraint::eq(vars, 0.0));
        }
    }

    fn emit_rule(
        &self,
        name: &str,
        kind: &RuleKind,
        model: &mut CompiledModel,
    ) -> Result<(), ConfigurationError> {
        match kind {
            RuleKind::AvailabilityWindow { filter, allowed } => {
                let allowed = self.resolve_slots(allowed, name)?;
                self.emit_slot_restriction(name, filter, &allowed, None, model)
            }
            RuleKind::FixedSlots {
                filter,
                allowed,
                exact_count,
            } => {
                let allowed = self.resolve_slots(allowed, name)?;
                self.emit_slot_restriction(name, filter, &allowed, *exact_count, model)
            }
            RuleKind::MutualExclusion { left, right } => {
                self.emit_mutual_exclusion(name, left, right, model);
                Ok(())
            }
            RuleKind::DailyMinimum {
                filter,
                min_per_day,
            } => {
                self.emit_daily_count(name, filter, Comparison::Ge, f64::from(*min_per_day), model);
                Ok(())
            }
            RuleKind::DailyExactlyOne { filter } => {
                self.emit_daily_count(name, filter, Comparison::Eq, 1.0, model);
                Ok(())
            }
            RuleKind::DailyMaximumOnePerSubject => {
                self.emit_daily_subject_cap(model);
                Ok(())
            }
            RuleKind::RequireOneAt { filter, slot } => {
                let flat = slot.resolve(self.grid, name)?;
                let group = self.matching(filter);
                if group.is_empty() {
                    debug!("rule `{name}`: no matching sessions, skipped");
                    return Ok(());
                }
                let vars: Vec<usize> = group.iter().map(|&s| model.var_index(s, flat)).collect();
                model.constraints.push(LinearConstraint::ge(vars, 1.0));
                Ok(())
            }
        }
    }

    /// Forces matching sessions to zero outside `allowed`; optionally
    /// pins the total over `allowed` to an exact count.
    fn emit_slot_restriction(
        &self,
        name: &str,
        filter: &SessionFilter,
        allowed: &BTreeSet<usize>,
        exact_count: Option<u32>,
        model: &mut CompiledModel,
    ) -> Result<(), ConfigurationError> {
        let group = self.matching(filter);
        if group.is_empty() {
            debug!("rule `{name}`: no matching sessions, skipped");
            return Ok(());
        }
        for &s in &group {
            let forbidden: Vec<usize> = self
                .grid
                .slots()
                .filter(|f| !allowed.contains(f))
                .map(|f| model.var_index(s, f))
                .collect();
            if !forbidden.is_empty() {
                model.constraints.push(LinearConstraint::eq(forbidden, 0.0));
            }
        }
        if let Some(count) = exact_count {
            let mut vars = Vec::with_capacity(group.len() * allowed.len());
            for &s in &group {
                for &f in allowed {
                    vars.push(model.var_index(s, f));
                }
            }
            model
                .constraints
                .push(LinearConstraint::eq(vars, f64::from(count)));
        }
        Ok(())
    }

    /// Per slot, the union of both groups occupies at most one slot.
    ///
    /// The union formulation gives true pairwise exclusion between the
    /// groups. A disjunction of negations would only forbid every
    /// listed variable being 1 at once, which is strictly weaker.
    fn emit_mutual_exclusion(
        &self,
        name: &str,
        left: &SessionFilter,
        right: &SessionFilter,
        model: &mut CompiledModel,
    ) {
        let left_group = self.matching(left);
        let right_group = self.matching(right);
        if left_group.is_empty() || right_group.is_empty() {
            debug!("rule `{name}`: one side matches no sessions, skipped");
            return;
        }
        let union: BTreeSet<usize> = left_group.iter().chain(&right_group).copied().collect();
        if union.len() < 2 {
            return;
        }
        for flat in self.grid.slots() {
            let vars: Vec<usize> = union.iter().map(|&s| model.var_index(s, flat)).collect();
            model.constraints.push(LinearConstraint::le(vars, 1.0));
        }
    }

    /// Per day, the group's occupancy compared against a count.
    fn emit_daily_count(
        &self,
        name: &str,
        filter: &SessionFilter,
        cmp: Comparison,
        rhs: f64,
        model: &mut CompiledModel,
    ) {
        let group = self.matching(filter);
        if group.is_empty() {
            debug!("rule `{name}`: no matching sessions, skipped");
            return;
        }
        for day in 0..self.grid.days().len() {
            let vars: Vec<(usize, f64)> = group
                .iter()
                .flat_map(|&s| self.grid.day_slots(day).map(move |f| (s, f)))
                .map(|(s, f)| (model.var_index(s, f), 1.0))
                .collect();
            model.constraints.push(LinearConstraint {
                terms: vars,
                cmp,
                rhs,
            });
        }
    }

    /// Per (course, subject) pair and day, at most one occupied slot.
    fn emit_daily_subject_cap(&self, model: &mut CompiledModel) {
        let sessions = self.catalog.sessions();
        let pairs: Vec<(&str, &str)> = sessions
            .iter()
            .map(|s| (s.course.as_str(), s.subject.as_str()))
            .unique()
            .collect();
        for (course, subject) in pairs {
            let group: Vec<usize> = sessions
                .iter()
                .enumerate()
                .filter(|(_, s)| s.course == course && s.subject == subject)
                .map(|(i, _)| i)
                .collect();
            for day in 0..self.grid.days().len() {
                let vars: Vec<usize> = group
                    .iter()
                    .flat_map(|&s| self.grid.day_slots(day).map(move |f| (s, f)))
                    .map(|(s, f)| model.var_index(s, f))
                    .collect();
                model.constraints.push(LinearConstraint::le(vars, 1.0));
            }
        }
    }

    fn matching(&self, filter: &SessionFilter) -> Vec<usize> {
        self.catalog
            .sessions()
            .iter()
            .enumerate()
            .filter(|(_, s)| filter.matches(s))
            .map(|(i, _)| i)
            .collect()
    }

    fn resolve_slots(
        &self,
        refs: &[SlotRef],
        rule: &str,
    ) -> Result<BTreeSet<usize>, ConfigurationError> {
        refs.iter().map(|r| r.resolve(self.grid, rule)).collect()
    }
}
