//! Crawl worker: drives one browser session through the scrape lifecycle
//!
//! The worker executes login, base-info extraction and (when the page has
//! repeated items) item extraction as sequential phases against one
//! [`PageDriver`] session. Each phase transition emits one [`ProgressEvent`];
//! dropping the event sender when `run` returns is the completion signal the
//! watchdog waits for, so every exit path signals completion exactly once.
//!
//! No phase is retried: a failure is terminal for the session. The worker
//! never assigns `TimedOut`; that status is owned by the watchdog. The
//! watchdog's cancellation token is checked between plan steps, so a timed
//! out worker stops issuing driver calls at the next step boundary.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::actions::{self, Extraction, PlanStep};
use crate::driver::{DriverError, PageDriver};
use crate::models::{format_elapsed, Credentials, Profile, ProgressEvent, SessionStatus};
use crate::selectors::SelectorSchema;

/// Why a phase stopped before reaching its success transition
#[derive(Error, Debug)]
enum PhaseError {
    /// The site did not land on the authenticated dashboard after submit
    #[error("credentials rejected by target site")]
    BadCredentials,

    /// The driver failed; surfaced as an infrastructure failure
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// The watchdog requested a stop; no further events are emitted
    #[error("cancelled")]
    Cancelled,
}

/// One session's crawl task
pub struct CrawlWorker {
    driver: Box<dyn PageDriver>,
    schema: Arc<SelectorSchema>,
}

impl CrawlWorker {
    pub fn new(driver: Box<dyn PageDriver>, schema: Arc<SelectorSchema>) -> Self {
        Self { driver, schema }
    }

    /// Run the full lifecycle for one session.
    ///
    /// Consumes the worker: the driver session ends with the crawl, and the
    /// event sender drops on return, closing the progress channel.
    pub async fn run(
        self,
        session_id: Uuid,
        credentials: Credentials,
        events: mpsc::Sender<ProgressEvent>,
        cancel: CancellationToken,
    ) {
        let start = Instant::now();
        let mut out = Extraction::default();

        match self.login(&credentials, &cancel).await {
            Ok(()) => {
                tracing::info!(%session_id, "login succeeded");
                emit(&events, session_id, SessionStatus::LoggedIn, &out.profile, start).await;
            }
            Err(PhaseError::BadCredentials) => {
                tracing::info!(%session_id, "credentials rejected");
                emit(&events, session_id, SessionStatus::BadCredentials, &out.profile, start)
                    .await;
                return;
            }
            Err(PhaseError::Driver(e)) => {
                tracing::warn!(%session_id, error = %e, "login phase failed");
                emit(&events, session_id, SessionStatus::InfraFailure, &out.profile, start).await;
                return;
            }
            Err(PhaseError::Cancelled) => {
                tracing::info!(%session_id, "worker cancelled during login");
                return;
            }
        }

        match self.base_info(&mut out, &cancel).await {
            Ok(()) => {
                tracing::info!(
                    %session_id,
                    skills = out.skill_count,
                    jobs = out.job_count,
                    "base info extracted"
                );
                emit(&events, session_id, SessionStatus::BaseInfoExtracted, &out.profile, start)
                    .await;
            }
            Err(PhaseError::Cancelled) => {
                tracing::info!(%session_id, "worker cancelled during base info");
                return;
            }
            Err(e) => {
                tracing::warn!(%session_id, error = %e, "base info phase failed");
                emit(&events, session_id, SessionStatus::InfraFailure, &out.profile, start).await;
                return;
            }
        }

        if out.skill_count + out.job_count > 0 {
            match self.extract_items(&mut out, &cancel).await {
                Ok(()) => {}
                Err(PhaseError::Cancelled) => {
                    tracing::info!(%session_id, "worker cancelled during item extraction");
                    return;
                }
                Err(e) => {
                    tracing::warn!(%session_id, error = %e, "item extraction phase failed");
                    emit(&events, session_id, SessionStatus::InfraFailure, &out.profile, start)
                        .await;
                    return;
                }
            }
        }

        tracing::info!(%session_id, "scrape succeeded");
        emit(&events, session_id, SessionStatus::Succeeded, &out.profile, start).await;
    }

    /// Login phase: fixed action sequence, then decide on the resulting
    /// location. Anywhere but the dashboard means rejected credentials.
    async fn login(
        &self,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> Result<(), PhaseError> {
        let plan = actions::login_plan(&self.schema, credentials);
        let mut scratch = Extraction::default();
        self.execute(&plan, &mut scratch, cancel).await?;

        let location = self.driver.current_location().await?;
        if location != self.schema.urls.dashboard {
            return Err(PhaseError::BadCredentials);
        }
        Ok(())
    }

    /// Base-info phase: resolve the resume URL, then read the single-value
    /// fields and the two repeated-item node counts.
    async fn base_info(
        &self,
        out: &mut Extraction,
        cancel: &CancellationToken,
    ) -> Result<(), PhaseError> {
        self.execute(&actions::resume_url_plan(&self.schema), out, cancel)
            .await?;

        let resume_url = out.resume_url.clone().ok_or_else(|| {
            PhaseError::Driver(DriverError::ElementNotFound {
                selector: self.schema.buttons.resume.clone(),
            })
        })?;

        self.execute(&actions::base_info_plan(&self.schema, &resume_url), out, cancel)
            .await
    }

    /// Item extraction phase: pre-size the profile lists to the discovered
    /// counts, execute both templated plans, then clean up free-text fields.
    async fn extract_items(
        &self,
        out: &mut Extraction,
        cancel: &CancellationToken,
    ) -> Result<(), PhaseError> {
        let resume_url = out.resume_url.clone().unwrap_or_default();
        out.profile.allocate_items(out.skill_count, out.job_count);

        let plan = actions::items_plan(&self.schema, &resume_url, out.skill_count, out.job_count);
        self.execute(&plan, out, cancel).await?;

        out.profile.tidy();
        Ok(())
    }

    /// Execute a plan step by step, honoring cancellation at step boundaries
    async fn execute(
        &self,
        plan: &[PlanStep],
        out: &mut Extraction,
        cancel: &CancellationToken,
    ) -> Result<(), PhaseError> {
        for step in plan {
            if cancel.is_cancelled() {
                return Err(PhaseError::Cancelled);
            }
            match step {
                PlanStep::Navigate { url } => self.driver.navigate(url).await?,
                PlanStep::WaitVisible { selector } => self.driver.wait_visible(selector).await?,
                PlanStep::Click { selector } => self.driver.click(selector).await?,
                PlanStep::SendKeys { selector, text } => {
                    self.driver.send_keys(selector, text).await?
                }
                PlanStep::Sleep { duration } => self.driver.sleep(*duration).await,
                PlanStep::ReadText { selector, slot } => {
                    let value = self.driver.read_text(selector).await?;
                    out.write(*slot, value);
                }
                PlanStep::ReadAttribute { selector, attr, slot } => {
                    let value = self.driver.read_attribute(selector, attr).await?;
                    out.write(*slot, value);
                }
                PlanStep::CountNodes { selector, kind } => {
                    let n = self.driver.count_nodes(selector).await?;
                    out.set_count(*kind, n);
                }
            }
        }
        Ok(())
    }
}

/// Send one progress event. The watchdog may already be gone (timeout or
/// shutdown); a closed channel is expected then and not an error.
async fn emit(
    events: &mpsc::Sender<ProgressEvent>,
    session_id: Uuid,
    status: SessionStatus,
    profile: &Profile,
    start: Instant,
) {
    let event = ProgressEvent {
        session_id,
        status,
        profile: profile.clone(),
        elapsed: format_elapsed(start.elapsed()),
    };
    if events.send(event).await.is_err() {
        tracing::debug!(%session_id, %status, "watchdog gone, progress event dropped");
    }
}
