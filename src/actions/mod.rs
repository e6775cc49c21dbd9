//! Extraction plan generation
//!
//! Pure functions that turn the selector schema (plus discovered item
//! counts) into ordered lists of [`PlanStep`]s for one browser session. Plans
//! are data: the worker executes them step by step against a
//! [`crate::driver::PageDriver`], writing extracted values into an
//! [`Extraction`] through [`Slot`] write targets.
//!
//! Step order matters. Instructions execute sequentially against one browser
//! session, and later field reads for item `i` must not race reads for item
//! `i + 1`, so item plans are grouped by item then by field, in ascending
//! ordinal order.

use std::time::Duration;

use crate::models::{Credentials, Profile};
use crate::selectors::{self, JobSelectors, SelectorSchema, SkillSelectors};

// Fixed pauses to accommodate asynchronous page rendering. Kept alongside
// explicit waits; a condition-based driver backend can ignore them.
const COOKIE_BANNER_SETTLE: Duration = Duration::from_secs(3);
const FORM_SETTLE: Duration = Duration::from_secs(2);
const LOGIN_REDIRECT_SETTLE: Duration = Duration::from_secs(5);
const RESUME_LINK_SETTLE: Duration = Duration::from_secs(2);
const PAGE_RENDER_SETTLE: Duration = Duration::from_secs(4);

// ============================================================================
// Write targets
// ============================================================================

/// Destination of one extracted value.
///
/// Indexed variants address a pre-allocated slot in the profile's repeated
/// item lists (0-based); callers size the lists before executing an item
/// plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    ImageUrl,
    Name,
    Role,
    Description,
    TotalExperience,
    ResumeUrl,
    SkillName(usize),
    SkillDuration(usize),
    JobTitle(usize),
    JobRelatedSkill(usize),
    JobDescription(usize),
    JobPeriod(usize),
    JobPeriodCount(usize),
}

/// Which repeated-item group a node-count query feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountKind {
    Skills,
    Jobs,
}

/// Mutable target the worker threads through plan execution
#[derive(Debug, Default)]
pub struct Extraction {
    pub profile: Profile,
    pub resume_url: Option<String>,
    pub skill_count: usize,
    pub job_count: usize,
}

impl Extraction {
    /// Write one extracted string into its slot. Out-of-range indexed slots
    /// are ignored; plans are generated from the same counts the lists were
    /// sized with, so this does not happen in practice.
    pub fn write(&mut self, slot: Slot, value: String) {
        let p = &mut self.profile;
        match slot {
            Slot::ImageUrl => p.image_url = value,
            Slot::Name => p.name = value,
            Slot::Role => p.role = value,
            Slot::Description => p.description = value,
            Slot::TotalExperience => p.total_experience = value,
            Slot::ResumeUrl => self.resume_url = Some(value),
            Slot::SkillName(i) => {
                if let Some(s) = p.skills.get_mut(i) {
                    s.name = value;
                }
            }
            Slot::SkillDuration(i) => {
                if let Some(s) = p.skills.get_mut(i) {
                    s.duration = value;
                }
            }
            Slot::JobTitle(i) => {
                if let Some(j) = p.jobs.get_mut(i) {
                    j.title = value;
                }
            }
            Slot::JobRelatedSkill(i) => {
                if let Some(j) = p.jobs.get_mut(i) {
                    j.related_skill = value;
                }
            }
            Slot::JobDescription(i) => {
                if let Some(j) = p.jobs.get_mut(i) {
                    j.description = value;
                }
            }
            Slot::JobPeriod(i) => {
                if let Some(j) = p.jobs.get_mut(i) {
                    j.period = value;
                }
            }
            Slot::JobPeriodCount(i) => {
                if let Some(j) = p.jobs.get_mut(i) {
                    j.period_count = value;
                }
            }
        }
    }

    /// Record a discovered item count
    pub fn set_count(&mut self, kind: CountKind, n: usize) {
        match kind {
            CountKind::Skills => self.skill_count = n,
            CountKind::Jobs => self.job_count = n,
        }
    }
}

// ============================================================================
// Plan steps
// ============================================================================

/// One concrete instruction in an extraction plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanStep {
    Navigate { url: String },
    WaitVisible { selector: String },
    Click { selector: String },
    SendKeys { selector: String, text: String },
    Sleep { duration: Duration },
    ReadText { selector: String, slot: Slot },
    ReadAttribute { selector: String, attr: String, slot: Slot },
    CountNodes { selector: String, kind: CountKind },
}

/// A templated field of one repeated item: the selector carries the ordinal
/// placeholder, the constructor maps a 0-based list index to its write slot.
pub struct TemplatedField {
    pub selector: String,
    pub slot: fn(usize) -> Slot,
}

/// The two fields of one skill entry, in page order
pub fn skill_fields(s: &SkillSelectors) -> Vec<TemplatedField> {
    vec![
        TemplatedField {
            selector: s.name.clone(),
            slot: Slot::SkillName,
        },
        TemplatedField {
            selector: s.duration.clone(),
            slot: Slot::SkillDuration,
        },
    ]
}

/// The five fields of one job entry, in page order
pub fn job_fields(j: &JobSelectors) -> Vec<TemplatedField> {
    vec![
        TemplatedField {
            selector: j.title.clone(),
            slot: Slot::JobTitle,
        },
        TemplatedField {
            selector: j.related_skill.clone(),
            slot: Slot::JobRelatedSkill,
        },
        TemplatedField {
            selector: j.description.clone(),
            slot: Slot::JobDescription,
        },
        TemplatedField {
            selector: j.period.clone(),
            slot: Slot::JobPeriod,
        },
        TemplatedField {
            selector: j.period_count.clone(),
            slot: Slot::JobPeriodCount,
        },
    ]
}

// ============================================================================
// Plan builders
// ============================================================================

/// Fixed login sequence: navigate, dismiss the cookie banner, fill the
/// credentials, submit. The worker captures the resulting location itself to
/// decide between success and rejected credentials.
pub fn login_plan(schema: &SelectorSchema, credentials: &Credentials) -> Vec<PlanStep> {
    vec![
        PlanStep::Navigate {
            url: schema.urls.start_page.clone(),
        },
        PlanStep::WaitVisible {
            selector: schema.buttons.accept_cookie.clone(),
        },
        PlanStep::Sleep {
            duration: COOKIE_BANNER_SETTLE,
        },
        PlanStep::Click {
            selector: schema.buttons.accept_cookie.clone(),
        },
        PlanStep::Sleep {
            duration: FORM_SETTLE,
        },
        PlanStep::SendKeys {
            selector: schema.inputs.email.clone(),
            text: credentials.email.clone(),
        },
        PlanStep::SendKeys {
            selector: schema.inputs.password.clone(),
            text: credentials.password.clone(),
        },
        PlanStep::Sleep {
            duration: FORM_SETTLE,
        },
        PlanStep::Click {
            selector: schema.buttons.login.clone(),
        },
        PlanStep::Sleep {
            duration: LOGIN_REDIRECT_SETTLE,
        },
    ]
}

/// Resolve the resume URL from the profile page
pub fn resume_url_plan(schema: &SelectorSchema) -> Vec<PlanStep> {
    vec![
        PlanStep::Navigate {
            url: schema.urls.profile.clone(),
        },
        PlanStep::WaitVisible {
            selector: schema.buttons.resume.clone(),
        },
        PlanStep::Sleep {
            duration: RESUME_LINK_SETTLE,
        },
        PlanStep::ReadAttribute {
            selector: schema.buttons.resume.clone(),
            attr: "href".to_string(),
            slot: Slot::ResumeUrl,
        },
    ]
}

/// Fixed-length base-info plan: single-value profile fields plus the two
/// node-count queries. Evaluated once, before the repeated-item counts are
/// known; its counts feed [`items_plan`].
pub fn base_info_plan(schema: &SelectorSchema, resume_url: &str) -> Vec<PlanStep> {
    let rs = &schema.resume_section;
    vec![
        PlanStep::Navigate {
            url: resume_url.to_string(),
        },
        PlanStep::Sleep {
            duration: PAGE_RENDER_SETTLE,
        },
        PlanStep::ReadText {
            selector: rs.name.clone(),
            slot: Slot::Name,
        },
        PlanStep::ReadText {
            selector: rs.description.clone(),
            slot: Slot::Description,
        },
        PlanStep::ReadText {
            selector: rs.role.clone(),
            slot: Slot::Role,
        },
        PlanStep::ReadText {
            selector: rs.total_experience.clone(),
            slot: Slot::TotalExperience,
        },
        PlanStep::ReadAttribute {
            selector: rs.image.clone(),
            attr: "src".to_string(),
            slot: Slot::ImageUrl,
        },
        PlanStep::CountNodes {
            selector: rs.skills.clone(),
            kind: CountKind::Skills,
        },
        PlanStep::CountNodes {
            selector: rs.jobs.clone(),
            kind: CountKind::Jobs,
        },
    ]
}

/// Expand one templated group for `count` items: for ordinal `i` in
/// `[1, count]`, substitute the placeholder and pair the concrete selector
/// with the write slot at list index `i - 1`. Yields exactly
/// `count * fields.len()` steps, grouped by item then by field.
pub fn item_plan(fields: &[TemplatedField], count: usize) -> Vec<PlanStep> {
    let mut steps = Vec::with_capacity(count * fields.len());
    for ordinal in 1..=count {
        for field in fields {
            steps.push(PlanStep::ReadText {
                selector: selectors::substitute(&field.selector, ordinal),
                slot: (field.slot)(ordinal - 1),
            });
        }
    }
    steps
}

/// Full repeated-item plan: return to the resume page, then expand both
/// templated groups for their discovered counts. A zero count contributes
/// nothing; callers skip execution entirely when both counts are zero.
pub fn items_plan(
    schema: &SelectorSchema,
    resume_url: &str,
    skill_count: usize,
    job_count: usize,
) -> Vec<PlanStep> {
    let mut steps = vec![
        PlanStep::Navigate {
            url: resume_url.to_string(),
        },
        PlanStep::Sleep {
            duration: PAGE_RENDER_SETTLE,
        },
    ];
    if skill_count > 0 {
        steps.extend(item_plan(&skill_fields(&schema.skill_selectors), skill_count));
    }
    if job_count > 0 {
        steps.extend(item_plan(&job_fields(&schema.job_selectors), job_count));
    }
    steps
}
