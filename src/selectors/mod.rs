//! Selector schema for the target web application
//!
//! The schema is a static JSON document grouping the URL set, input and
//! button selectors, single-value resume-section selectors, and the two
//! templated repeated-item groups (skills, jobs). It is loaded once at
//! startup and shared read-only for the process lifetime.
//!
//! Templated selectors address "the i-th repeated node" through the
//! [`ORDINAL_PLACEHOLDER`] token, which [`substitute`] replaces with a
//! 1-based decimal index.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{Error, Result};

/// Reserved token in templated selectors, replaced by a 1-based item index
pub const ORDINAL_PLACEHOLDER: &str = "{n}";

/// URL set for the target application
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Urls {
    /// Public landing page carrying the login form
    pub start_page: String,
    /// Page the site redirects to after a successful login
    pub dashboard: String,
    /// Profile page carrying the link to the resume view
    pub profile: String,
}

/// Input-field selectors for the login form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inputs {
    pub email: String,
    pub password: String,
}

/// Button selectors
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buttons {
    pub accept_cookie: String,
    pub login: String,
    /// Anchor whose `href` is the resume URL
    pub resume: String,
}

/// Single-value selectors on the resume page, plus the two node-count
/// selectors for the repeated item groups
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeSection {
    pub image: String,
    pub name: String,
    pub role: String,
    pub total_experience: String,
    pub description: String,
    /// Matches every skill entry node; counted, not read
    pub skills: String,
    /// Matches every job entry node; counted, not read
    pub jobs: String,
}

/// Templated selectors for the fields of one skill entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillSelectors {
    pub name: String,
    pub duration: String,
}

/// Templated selectors for the fields of one job entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSelectors {
    pub title: String,
    pub related_skill: String,
    pub description: String,
    pub period: String,
    pub period_count: String,
}

/// The complete selector schema document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorSchema {
    pub urls: Urls,
    pub inputs: Inputs,
    pub buttons: Buttons,
    pub resume_section: ResumeSection,
    pub skill_selectors: SkillSelectors,
    pub job_selectors: JobSelectors,
}

impl SelectorSchema {
    /// Parse a schema from a JSON reader
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let schema: Self = serde_json::from_reader(reader)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Load a schema from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    /// Check structural invariants: well-formed URLs and the ordinal
    /// placeholder present in every templated field selector.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("urls.startPage", &self.urls.start_page),
            ("urls.dashboard", &self.urls.dashboard),
            ("urls.profile", &self.urls.profile),
        ] {
            url::Url::parse(value)
                .map_err(|e| Error::config(format!("{name}: invalid URL: {e}")))?;
        }

        let templated = [
            ("skillSelectors.name", &self.skill_selectors.name),
            ("skillSelectors.duration", &self.skill_selectors.duration),
            ("jobSelectors.title", &self.job_selectors.title),
            ("jobSelectors.relatedSkill", &self.job_selectors.related_skill),
            ("jobSelectors.description", &self.job_selectors.description),
            ("jobSelectors.period", &self.job_selectors.period),
            ("jobSelectors.periodCount", &self.job_selectors.period_count),
        ];
        for (name, selector) in templated {
            if !selector.contains(ORDINAL_PLACEHOLDER) {
                return Err(Error::config(format!(
                    "{name}: templated selector is missing the {ORDINAL_PLACEHOLDER} placeholder"
                )));
            }
        }

        Ok(())
    }
}

/// Substitute the ordinal placeholder with a 1-based decimal index to
/// obtain the concrete selector addressing the i-th repeated node.
pub fn substitute(template: &str, ordinal: usize) -> String {
    template.replace(ORDINAL_PLACEHOLDER, &ordinal.to_string())
}
