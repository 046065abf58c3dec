//! Session requirements and their normalization into slot quotas.
//!
//! The ingestion collaborator hands over validated rows of
//! (teacher, subject, course, weekly hours). The core converts each
//! row's declared hours into an integer number of weekly slots using a
//! caller-chosen granularity. Division that does not come out even is a
//! [`ConfigurationError`] — quotas are never rounded.
//!
//! The catalog is rebuilt whenever new input arrives; any previously
//! produced solution is invalidated by the rebuild.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Tolerance for reading a fractional-hour declaration as whole minutes.
/// Covers values like 1.5 h that are exact in decimal but not binary.
const MINUTE_EPSILON: f64 = 1e-6;

/// One validated input row, as supplied by the ingestion collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRow {
    pub teacher: String,
    pub subject: String,
    pub course: String,
    /// Declared teaching duration per week, in hours. Positive rational.
    pub weekly_hours: f64,
}

impl SessionRow {
    /// Creates a row.
    pub fn new(
        teacher: impl Into<String>,
        subject: impl Into<String>,
        course: impl Into<String>,
        weekly_hours: f64,
    ) -> Self {
        Self {
            teacher: teacher.into(),
            subject: subject.into(),
            course: course.into(),
            weekly_hours,
        }
    }
}

/// The slot length used to derive quotas, in minutes.
///
/// The same granularity converts solved slot counts back to declared
/// hours, so the round trip hours → quota → hours is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotGranularity {
    minutes: u32,
}

impl SlotGranularity {
    /// Creates a granularity from a positive number of minutes.
    pub fn from_minutes(minutes: u32) -> Result<Self, ConfigurationError> {
        if minutes == 0 {
            return Err(ConfigurationError::ZeroGranularity);
        }
        Ok(Self { minutes })
    }

    /// Slot length in minutes.
    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    /// Converts declared weekly hours to a slot quota.
    ///
    /// # Errors
    /// `NonIntegralQuota` if the hours are not a whole number of minutes
    /// or do not divide evenly by the slot length. `row` is only used
    /// for error reporting.
    pub fn slots_for_hours(&self, hours: f64, row: usize) -> Result<u32, ConfigurationError> {
        let minutes = hours * 60.0;
        let rounded = minutes.round();
        if (minutes - rounded).abs() > MINUTE_EPSILON {
            return Err(ConfigurationError::NonIntegralQuota {
                row,
                hours,
                granularity_minutes: self.minutes,
            });
        }
        let total = rounded as u64;
        if total % u64::from(self.minutes) != 0 {
            return Err(ConfigurationError::NonIntegralQuota {
                row,
                hours,
                granularity_minutes: self.minutes,
            });
        }
        Ok((total / u64::from(self.minutes)) as u32)
    }

    /// Converts a solved slot count back to declared hours.
    ///
    /// Exact inverse of [`slots_for_hours`](Self::slots_for_hours).
    pub fn hours_for_slots(&self, slots: u32) -> f64 {
        f64::from(slots * self.minutes) / 60.0
    }
}

/// One recurring teaching assignment with its weekly slot quota.
///
/// Immutable for the duration of a generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub teacher: String,
    pub subject: String,
    pub course: String,
    /// Number of slots this session must occupy each week.
    pub quota: u32,
}

/// The normalized list of required sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCatalog {
    sessions: Vec<Session>,
    granularity: SlotGranularity,
}

impl SessionCatalog {
    /// Builds a catalog from input rows.
    ///
    /// Rejects blank fields, non-positive hours, and hours that do not
    /// divide evenly by the granularity. All checks run before any
    /// model is compiled.
    pub fn from_rows(
        rows: Vec<SessionRow>,
        granularity: SlotGranularity,
    ) -> Result<Self, ConfigurationError> {
        let mut sessions = Vec::with_capacity(rows.len());
        for (row, input) in rows.into_iter().enumerate() {
            let teacher = required_field(&input.teacher, row, "teacher")?;
            let subject = required_field(&input.subject, row, "subject")?;
            let course = required_field(&input.course, row, "course")?;
            if input.weekly_hours <= 0.0 {
                return Err(ConfigurationError::NonPositiveHours {
                    row,
                    hours: input.weekly_hours,
                });
            }
            let quota = granularity.slots_for_hours(input.weekly_hours, row)?;
            sessions.push(Session {
                teacher,
                subject,
                course,
                quota,
            });
        }
        Ok(Self {
            sessions,
            granularity,
        })
    }

    /// All sessions, in input order.
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Number of sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the catalog holds no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// The granularity quotas were derived with.
    pub fn granularity(&self) -> SlotGranularity {
        self.granularity
    }

    /// Sum of all quotas.
    pub fn total_quota(&self) -> u32 {
        self.sessions.iter().map(|s| s.quota).sum()
    }

    /// Distinct teacher names, sorted.
    pub fn teachers(&self) -> Vec<&str> {
        self.distinct(|s| &s.teacher)
    }

    /// Distinct subject names, sorted.
    pub fn subjects(&self) -> Vec<&str> {
        self.distinct(|s| &s.subject)
    }

    /// Distinct course names, sorted.
    pub fn courses(&self) -> Vec<&str> {
        self.distinct(|s| &s.course)
    }

    fn distinct<'a>(&'a self, key: impl Fn(&'a Session) -> &'a String) -> Vec<&'a str> {
        let mut values: Vec<&str> = self.sessions.iter().map(|s| key(s).as_str()).collect();
        values.sort_unstable();
        values.dedup();
        values
    }
}

fn required_field(
    value: &str,
    row: usize,
    field: &'static str,
) -> Result<String, ConfigurationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigurationError::MissingField { row, field });
    }
    Ok(trimmed.to_string())
}
