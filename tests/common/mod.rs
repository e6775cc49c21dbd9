//! Common test utilities

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use comet_scraper::cache::OptionalCache;
use comet_scraper::driver::{DriverError, DriverFactory, DriverResult, PageDriver};
use comet_scraper::engine::SessionEngine;
use comet_scraper::models::{Credentials, Session};
use comet_scraper::selectors::{
    Buttons, Inputs, JobSelectors, ResumeSection, SelectorSchema, SkillSelectors, Urls,
};
use comet_scraper::store::MemoryStore;

/// A schema with the shape of the real document, pointed at test hosts
pub fn test_schema() -> SelectorSchema {
    SelectorSchema {
        urls: Urls {
            start_page: "https://target.example/welcome".to_string(),
            dashboard: "https://target.example/dashboard".to_string(),
            profile: "https://target.example/freelancer/profile".to_string(),
        },
        inputs: Inputs {
            email: "input[name=email]".to_string(),
            password: "input[name=password]".to_string(),
        },
        buttons: Buttons {
            accept_cookie: "#accept-cookies".to_string(),
            login: "button[type=submit]".to_string(),
            resume: "a.resume-link".to_string(),
        },
        resume_section: ResumeSection {
            image: ".resume img.avatar".to_string(),
            name: ".resume h1.name".to_string(),
            role: ".resume .role".to_string(),
            total_experience: ".resume .experience-total".to_string(),
            description: ".resume .bio".to_string(),
            skills: ".resume .skill-entry".to_string(),
            jobs: ".resume .job-entry".to_string(),
        },
        skill_selectors: SkillSelectors {
            name: ".skill-entry:nth-child({n}) .name".to_string(),
            duration: ".skill-entry:nth-child({n}) .duration".to_string(),
        },
        job_selectors: JobSelectors {
            title: ".job-entry:nth-child({n}) .title".to_string(),
            related_skill: ".job-entry:nth-child({n}) .skill".to_string(),
            description: ".job-entry:nth-child({n}) .desc".to_string(),
            period: ".job-entry:nth-child({n}) .period".to_string(),
            period_count: ".job-entry:nth-child({n}) .period-count".to_string(),
        },
    }
}

/// Credentials accepted by [`ScriptedDriver::happy`]
pub fn test_credentials() -> Credentials {
    Credentials {
        email: "user@example.com".to_string(),
        password: "hunter2".to_string(),
    }
}

// ============================================================================
// Scripted driver
// ============================================================================

/// A page driver that replays scripted page content.
///
/// Reads resolve against the scripted maps (empty string / zero when
/// unscripted), `current_location` returns the scripted location, and fixed
/// pauses are skipped entirely so tests run at full speed.
#[derive(Clone, Default)]
pub struct ScriptedDriver {
    texts: HashMap<String, String>,
    attrs: HashMap<(String, String), String>,
    counts: HashMap<String, usize>,
    location: String,
    fail_selector: Option<String>,
    hang_on_navigate: bool,
}

impl ScriptedDriver {
    /// A driver scripted for a fully successful scrape against
    /// [`test_schema`], with `skills` skill entries and `jobs` job entries.
    pub fn happy(schema: &SelectorSchema, skills: usize, jobs: usize) -> Self {
        let rs = &schema.resume_section;
        let mut driver = Self::default()
            .with_location(&schema.urls.dashboard)
            .with_attr(&schema.buttons.resume, "href", "https://target.example/resume/42")
            .with_text(&rs.name, "Ada Lovelace")
            .with_text(&rs.role, "Systems Engineer")
            .with_text(&rs.total_experience, "12 years")
            .with_text(&rs.description, "Writes engines.")
            .with_attr(&rs.image, "src", "https://target.example/ada.png")
            .with_count(&rs.skills, skills)
            .with_count(&rs.jobs, jobs);

        for i in 1..=skills {
            driver = driver
                .with_text(
                    &comet_scraper::selectors::substitute(&schema.skill_selectors.name, i),
                    &format!("Skill {i}"),
                )
                .with_text(
                    &comet_scraper::selectors::substitute(&schema.skill_selectors.duration, i),
                    &format!("{i} years"),
                );
        }
        for i in 1..=jobs {
            let js = &schema.job_selectors;
            driver = driver
                .with_text(
                    &comet_scraper::selectors::substitute(&js.title, i),
                    &format!("Job {i}"),
                )
                .with_text(
                    &comet_scraper::selectors::substitute(&js.related_skill, i),
                    &format!("Skill {i}"),
                )
                .with_text(
                    &comet_scraper::selectors::substitute(&js.description, i),
                    &format!("Did thing {i}\n"),
                )
                .with_text(
                    &comet_scraper::selectors::substitute(&js.period, i),
                    "2020 - 2022",
                )
                .with_text(
                    &comet_scraper::selectors::substitute(&js.period_count, i),
                    "2 years",
                );
        }
        driver
    }

    pub fn with_text(mut self, selector: &str, text: &str) -> Self {
        self.texts.insert(selector.to_string(), text.to_string());
        self
    }

    pub fn with_attr(mut self, selector: &str, attr: &str, value: &str) -> Self {
        self.attrs
            .insert((selector.to_string(), attr.to_string()), value.to_string());
        self
    }

    pub fn with_count(mut self, selector: &str, count: usize) -> Self {
        self.counts.insert(selector.to_string(), count);
        self
    }

    pub fn with_location(mut self, location: &str) -> Self {
        self.location = location.to_string();
        self
    }

    /// Fail every operation touching this selector
    #[allow(dead_code)]
    pub fn failing_on(mut self, selector: &str) -> Self {
        self.fail_selector = Some(selector.to_string());
        self
    }

    /// Block forever on the first navigation
    #[allow(dead_code)]
    pub fn hanging(mut self) -> Self {
        self.hang_on_navigate = true;
        self
    }

    fn check(&self, selector: &str) -> DriverResult<()> {
        match &self.fail_selector {
            Some(fail) if fail == selector => Err(DriverError::ElementNotFound {
                selector: selector.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl PageDriver for ScriptedDriver {
    async fn navigate(&self, _url: &str) -> DriverResult<()> {
        if self.hang_on_navigate {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn wait_visible(&self, selector: &str) -> DriverResult<()> {
        self.check(selector)
    }

    async fn click(&self, selector: &str) -> DriverResult<()> {
        self.check(selector)
    }

    async fn send_keys(&self, selector: &str, _text: &str) -> DriverResult<()> {
        self.check(selector)
    }

    async fn read_text(&self, selector: &str) -> DriverResult<String> {
        self.check(selector)?;
        Ok(self.texts.get(selector).cloned().unwrap_or_default())
    }

    async fn read_attribute(&self, selector: &str, attr: &str) -> DriverResult<String> {
        self.check(selector)?;
        Ok(self
            .attrs
            .get(&(selector.to_string(), attr.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn count_nodes(&self, selector: &str) -> DriverResult<usize> {
        self.check(selector)?;
        Ok(self.counts.get(selector).copied().unwrap_or(0))
    }

    async fn current_location(&self) -> DriverResult<String> {
        Ok(self.location.clone())
    }

    async fn sleep(&self, _duration: Duration) {}
}

/// Factory handing out clones of one scripted driver
pub struct ScriptedFactory {
    template: ScriptedDriver,
}

impl ScriptedFactory {
    pub fn new(template: ScriptedDriver) -> Self {
        Self { template }
    }
}

#[async_trait]
impl DriverFactory for ScriptedFactory {
    async fn create(&self) -> DriverResult<Box<dyn PageDriver>> {
        Ok(Box::new(self.template.clone()))
    }
}

// ============================================================================
// Engine fixtures
// ============================================================================

/// An engine over a fresh memory store with no cache
pub fn test_engine(drivers: Arc<dyn DriverFactory>, budget: Duration) -> Arc<SessionEngine> {
    Arc::new(SessionEngine::new(
        Arc::new(MemoryStore::new()),
        Arc::new(OptionalCache::disabled()),
        Arc::new(test_schema()),
        drivers,
        budget,
        CancellationToken::new(),
    ))
}

/// Poll the session record until the status is terminal
pub async fn wait_terminal(engine: &SessionEngine, id: uuid::Uuid) -> Session {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let session = engine.get_session(id).await.expect("session must exist");
        if session.status.is_terminal() {
            return session;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "session {id} never reached a terminal status (last: {})",
            session.status
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
