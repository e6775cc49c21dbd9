//! Core data structures for scrape sessions
//!
//! A [`Session`] is one scrape job's persisted state: a lifecycle status, an
//! extracted [`Profile`] snapshot and a human-readable elapsed duration. The
//! worker reports transitions as [`ProgressEvent`]s, which the watchdog
//! merges into the stored record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

// ============================================================================
// Session Status
// ============================================================================

/// Lifecycle status of a scrape session.
///
/// Transitions are monotonic along one of:
/// `Start → BadCredentials`, `Start → InfraFailure`,
/// `Start → LoggedIn → InfraFailure`,
/// `Start → LoggedIn → BaseInfoExtracted → {Succeeded, InfraFailure}`.
/// `TimedOut` may supersede any non-terminal status, assigned only by the
/// watchdog. Once terminal, the record is never mutated again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Session record created, login not attempted yet
    Start,
    /// Login succeeded, base-info extraction next
    LoggedIn,
    /// Target site rejected the credentials
    BadCredentials,
    /// Base profile fields and item counts extracted
    BaseInfoExtracted,
    /// All extraction phases completed
    Succeeded,
    /// Driver, store or unexpected page-structure failure
    InfraFailure,
    /// Time budget elapsed before a terminal outcome
    TimedOut,
}

impl SessionStatus {
    /// Whether no further transition may follow this status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::BadCredentials | Self::Succeeded | Self::InfraFailure | Self::TimedOut
        )
    }

    /// Stable identifier used in storage and API payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::LoggedIn => "logged_in",
            Self::BadCredentials => "bad_credentials",
            Self::BaseInfoExtracted => "base_info_extracted",
            Self::Succeeded => "succeeded",
            Self::InfraFailure => "infra_failure",
            Self::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Self::Start),
            "logged_in" => Ok(Self::LoggedIn),
            "bad_credentials" => Ok(Self::BadCredentials),
            "base_info_extracted" => Ok(Self::BaseInfoExtracted),
            "succeeded" => Ok(Self::Succeeded),
            "infra_failure" => Ok(Self::InfraFailure),
            "timed_out" => Ok(Self::TimedOut),
            other => Err(format!("unknown session status: {other}")),
        }
    }
}

// ============================================================================
// Profile
// ============================================================================

/// One skill entry on the resume page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    pub duration: String,
}

/// One job entry on the resume page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub title: String,
    pub related_skill: String,
    pub description: String,
    pub period: String,
    pub period_count: String,
}

/// Snapshot of the data extracted so far for one session.
///
/// `skills` and `jobs` are sized once, when their cardinality is discovered
/// on the page, and filled by ordinal position afterwards; they are never
/// resized or appended to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub image_url: String,
    pub name: String,
    pub role: String,
    pub description: String,
    pub total_experience: String,
    pub skills: Vec<Skill>,
    pub jobs: Vec<Job>,
}

impl Profile {
    /// Pre-size the repeated-item lists to the discovered counts.
    /// Extraction writes into these slots by index.
    pub fn allocate_items(&mut self, skill_count: usize, job_count: usize) {
        self.skills = vec![Skill::default(); skill_count];
        self.jobs = vec![Job::default(); job_count];
    }

    /// Strip decorative characters and surrounding whitespace from the
    /// free-text fields the page renders with separators.
    pub fn tidy(&mut self) {
        for skill in &mut self.skills {
            skill.duration = clean_text(&skill.duration);
        }
        for job in &mut self.jobs {
            job.description = clean_text(&job.description);
        }
    }
}

/// Remove newlines and the `·` list separator the target site uses,
/// then trim surrounding whitespace.
pub fn clean_text(s: &str) -> String {
    s.replace('\n', "").replace('·', "").trim().to_string()
}

// ============================================================================
// Credentials
// ============================================================================

/// Login credentials for the target site.
///
/// Transient: used only to drive the login step, never persisted. The
/// `Debug` impl redacts the password so credentials cannot leak into logs.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// Session and Progress Events
// ============================================================================

/// One scrape job's persisted state and identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub status: SessionStatus,
    pub profile: Profile,
    /// Human-readable duration since the worker started, e.g. `12.3s`
    pub elapsed: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a fresh record with status [`SessionStatus::Start`]
    pub fn new(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: SessionStatus::Start,
            profile: Profile::default(),
            elapsed: format_elapsed(Duration::ZERO),
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge a progress event into this record (read-modify-write step
    /// performed by the watchdog)
    pub fn apply(&mut self, event: &ProgressEvent) {
        self.status = event.status;
        self.profile = event.profile.clone();
        self.elapsed = event.elapsed.clone();
        self.updated_at = Utc::now();
    }
}

/// Immutable message the worker emits on each lifecycle transition,
/// consumed exactly once by the watchdog
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub session_id: Uuid,
    pub status: SessionStatus,
    pub profile: Profile,
    pub elapsed: String,
}

/// Render a duration the way the session record stores it: fractional
/// seconds below a minute, `XmYs` above.
pub fn format_elapsed(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{secs:.1}s")
    } else {
        // split on whole seconds so the remainder never rounds up to 60
        let total = d.as_secs();
        format!("{}m{}s", total / 60, total % 60)
    }
}
