//! The rule registry: named, toggleable constraint generators.
//!
//! Every scheduling policy beyond the always-on feasibility rules is a
//! [`RuleEntry`] in a [`RuleSet`]. Adding a policy means registering an
//! entry — the compiler is never edited. Each entry carries a
//! [`RuleKind`] (the declarative constraint generator), a name, and a
//! default enabled/disabled state for each of the five flexibility
//! levels. Callers select a level, then may override individual rules
//! by name.
//!
//! # Predicates
//!
//! Rules select their target sessions with a [`SessionFilter`]. A rule
//! whose filter matches no sessions is skipped during compilation — it
//! is configuration for data that may not be present, not an error.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::ConfigurationError;
use crate::models::{Session, SlotRef};

/// Ordered preset selecting default rule states, most restrictive first.
///
/// More restrictive levels keep more rules enabled and get a larger
/// solve budget, since tighter models take longer to crack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FlexibilityLevel {
    /// Every registered rule at its strictest.
    Strict,
    Firm,
    Standard,
    Relaxed,
    /// Hard feasibility rules only, unless a rule opts in.
    Minimal,
}

impl FlexibilityLevel {
    /// All levels, most restrictive first.
    pub const ALL: [FlexibilityLevel; 5] = [
        FlexibilityLevel::Strict,
        FlexibilityLevel::Firm,
        FlexibilityLevel::Standard,
        FlexibilityLevel::Relaxed,
        FlexibilityLevel::Minimal,
    ];

    /// Position in [`ALL`](Self::ALL): 0 = most restrictive.
    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|l| l == self).unwrap_or(0)
    }

    /// Wall-clock solve budget for this level.
    pub fn time_budget(&self) -> Duration {
        match self {
            FlexibilityLevel::Strict => Duration::from_secs(300),
            FlexibilityLevel::Firm => Duration::from_secs(240),
            FlexibilityLevel::Standard => Duration::from_secs(180),
            FlexibilityLevel::Relaxed => Duration::from_secs(120),
            FlexibilityLevel::Minimal => Duration::from_secs(60),
        }
    }
}

/// A predicate selecting sessions by teacher, subject, and course.
///
/// All populated criteria must hold; an empty filter matches every
/// session. Matching is case-insensitive throughout, because input
/// files rarely agree with themselves on capitalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionFilter {
    teacher: Option<String>,
    teachers: Option<BTreeSet<String>>,
    subject_contains: Option<String>,
    course: Option<String>,
    courses: Option<BTreeSet<String>>,
    course_contains: Option<String>,
}

impl SessionFilter {
    /// A filter matching every session.
    pub fn any() -> Self {
        Self::default()
    }

    /// Requires an exact (case-insensitive) teacher name.
    pub fn teacher(mut self, name: impl Into<String>) -> Self {
        self.teacher = Some(lower(&name.into()));
        self
    }

    /// Requires the teacher to be one of the given names.
    pub fn any_teacher_of(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.teachers = Some(names.into_iter().map(|n| lower(&n.into())).collect());
        self
    }

    /// Requires the subject to contain a substring.
    pub fn subject_contains(mut self, fragment: impl Into<String>) -> Self {
        self.subject_contains = Some(lower(&fragment.into()));
        self
    }

    /// Requires an exact (case-insensitive) course name.
    pub fn course(mut self, name: impl Into<String>) -> Self {
        self.course = Some(lower(&name.into()));
        self
    }

    /// Requires the course to be one of the given names.
    pub fn any_course_of(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.courses = Some(names.into_iter().map(|n| lower(&n.into())).collect());
        self
    }

    /// Requires the course to contain a substring.
    pub fn course_contains(mut self, fragment: impl Into<String>) -> Self {
        self.course_contains = Some(lower(&fragment.into()));
        self
    }

    /// Whether a session satisfies every populated criterion.
    pub fn matches(&self, session: &Session) -> bool {
        let teacher = lower(&session.teacher);
        let subject = lower(&session.subject);
        let course = lower(&session.course);

        if let Some(t) = &self.teacher {
            if &teacher != t {
                return false;
            }
        }
        if let Some(ts) = &self.teachers {
            if !ts.contains(&teacher) {
                return false;
            }
        }
        if let Some(frag) = &self.subject_contains {
            if !subject.contains(frag.as_str()) {
                return false;
            }
        }
        if let Some(c) = &self.course {
            if &course != c {
                return false;
            }
        }
        if let Some(cs) = &self.courses {
            if !cs.contains(&course) {
                return false;
            }
        }
        if let Some(frag) = &self.course_contains {
            if !course.contains(frag.as_str()) {
                return false;
            }
        }
        true
    }
}

fn lower(s: &str) -> String {
    s.to_lowercase()
}

/// A declarative constraint generator.
///
/// Each variant expands to linear constraints over the (session, slot)
/// decision variables during compilation. Variants are data, not code:
/// the compiler dispatches on the tag and the rule table stays the
/// single place where scheduling policy lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RuleKind {
    /// Matching sessions may only occupy the listed slots; everything
    /// else is forced to zero. Models a fixed-schedule teacher.
    AvailabilityWindow {
        filter: SessionFilter,
        allowed: Vec<SlotRef>,
    },

    /// Two session groups must never both occupy the same slot.
    ///
    /// Emitted as "sum of the union of both groups' variables at the
    /// slot ≤ 1" for every slot — true pairwise exclusion, not merely
    /// "not all simultaneously".
    MutualExclusion {
        left: SessionFilter,
        right: SessionFilter,
    },

    /// The matching group must occupy at least `min_per_day` slots on
    /// every day.
    DailyMinimum {
        filter: SessionFilter,
        min_per_day: u32,
    },

    /// The matching group must occupy exactly one slot on every day.
    ///
    /// Kept distinct from combining [`DailyMinimum`](Self::DailyMinimum)
    /// with the per-subject daily cap, so callers state exactly-one
    /// explicitly when they mean it.
    DailyExactlyOne { filter: SessionFilter },

    /// Each (course, subject) pair occupies at most one slot per day.
    DailyMaximumOnePerSubject,

    /// Matching sessions are forced to zero outside `allowed`; with
    /// `exact_count`, the total over `allowed` must equal it.
    FixedSlots {
        filter: SessionFilter,
        allowed: Vec<SlotRef>,
        exact_count: Option<u32>,
    },

    /// At least one matching session must occupy the target slot.
    ///
    /// A ≥ 1 disjunction: any eligible session may satisfy it.
    RequireOneAt { filter: SessionFilter, slot: SlotRef },
}

/// A named rule with its per-level default states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEntry {
    /// Registry key, unique within a [`RuleSet`].
    pub name: String,
    /// Default enabled state, indexed by [`FlexibilityLevel::index`].
    pub enabled_at: [bool; 5],
    /// The constraint generator.
    pub kind: RuleKind,
}

impl RuleEntry {
    /// Creates an entry enabled at every level.
    pub fn new(name: impl Into<String>, kind: RuleKind) -> Self {
        Self {
            name: name.into(),
            enabled_at: [true; 5],
            kind,
        }
    }

    /// Enables this entry at `level` and everything more restrictive,
    /// disabling it at the more flexible levels.
    pub fn enabled_through(mut self, level: FlexibilityLevel) -> Self {
        let cutoff = level.index();
        for (i, slot) in self.enabled_at.iter_mut().enumerate() {
            *slot = i <= cutoff;
        }
        self
    }

    /// Sets the full per-level default table explicitly.
    pub fn with_defaults(mut self, enabled_at: [bool; 5]) -> Self {
        self.enabled_at = enabled_at;
        self
    }
}

/// The registry of toggleable rules.
///
/// Selecting a level is idempotent and touches neither the catalog nor
/// the grid; it only changes which defaults apply. Per-rule overrides
/// sit on top of the level defaults until cleared.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    entries: Vec<RuleEntry>,
    level: Option<FlexibilityLevel>,
    overrides: HashMap<String, bool>,
}

impl RuleSet {
    /// An empty registry at the default level.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a rule.
    ///
    /// # Errors
    /// `DuplicateRule` if the name is already taken.
    pub fn register(&mut self, entry: RuleEntry) -> Result<(), ConfigurationError> {
        if self.entries.iter().any(|e| e.name == entry.name) {
            return Err(ConfigurationError::DuplicateRule(entry.name));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_rule(mut self, entry: RuleEntry) -> Result<Self, ConfigurationError> {
        self.register(entry)?;
        Ok(self)
    }

    /// Selects a flexibility level. Idempotent.
    pub fn set_level(&mut self, level: FlexibilityLevel) {
        self.level = Some(level);
    }

    /// The selected level; [`Standard`](FlexibilityLevel::Standard)
    /// until one is chosen.
    pub fn level(&self) -> FlexibilityLevel {
        self.level.unwrap_or(FlexibilityLevel::Standard)
    }

    /// Forces a rule on or off regardless of the level defaults.
    ///
    /// # Errors
    /// `UnknownRule` if no rule with that name is registered.
    pub fn set_override(
        &mut self,
        name: &str,
        enabled: bool,
    ) -> Result<(), ConfigurationError> {
        if !self.entries.iter().any(|e| e.name == name) {
            return Err(ConfigurationError::UnknownRule(name.to_string()));
        }
        self.overrides.insert(name.to_string(), enabled);
        Ok(())
    }

    /// Drops all per-rule overrides, restoring the level defaults.
    pub fn clear_overrides(&mut self) {
        self.overrides.clear();
    }

    /// Whether a registered rule is currently enabled.
    pub fn is_enabled(&self, name: &str) -> Option<bool> {
        let entry = self.entries.iter().find(|e| e.name == name)?;
        Some(self.effective(entry))
    }

    /// Currently enabled rules, in registration order.
    pub fn active(&self) -> Vec<&RuleEntry> {
        self.entries
            .iter()
            .filter(|e| self.effective(e))
            .collect()
    }

    /// All registered rule names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Number of registered rules.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no rules are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn effective(&self, entry: &RuleEntry) -> bool {
        self.overrides
            .get(&entry.name)
            .copied()
            .unwrap_or(entry.enabled_at[self.level().index()])
    }
}
