use crate::action::{ActionRequest, OutcomeStatus};
use crate::config::Settings;
use crate::error::{ListingError, Result};
use crate::page::Page;
use crate::resilience::{ResilienceController, StepScope};
use crate::types::UploadState;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// An optional step that failed without aborting the product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SoftFailure {
    pub state: UploadState,
    pub element_key: String,
    pub reason: String,
}

/// What a flow hook gets to work with: the page, the guarded action
/// surface, and the settings. Contains no selector strings.
pub struct StepContext<'a> {
    page: &'a mut dyn Page,
    controller: &'a ResilienceController<'a>,
    settings: &'a Settings,
    scope: StepScope,
    state: UploadState,
    soft_failures: Vec<SoftFailure>,
}

impl<'a> StepContext<'a> {
    pub fn new(
        page: &'a mut dyn Page,
        controller: &'a ResilienceController<'a>,
        settings: &'a Settings,
        scope: StepScope,
    ) -> Self {
        Self {
            page,
            controller,
            settings,
            scope,
            state: UploadState::Start,
            soft_failures: Vec::new(),
        }
    }

    pub fn scope(&self) -> &StepScope {
        &self.scope
    }

    pub fn region(&self) -> &str {
        &self.scope.region
    }

    pub fn settings(&self) -> &Settings {
        self.settings
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    pub(crate) fn enter(&mut self, state: UploadState) {
        self.state = state;
    }

    pub(crate) fn take_soft_failures(&mut self) -> Vec<SoftFailure> {
        std::mem::take(&mut self.soft_failures)
    }

    pub fn page(&mut self) -> &mut dyn Page {
        &mut *self.page
    }

    fn timeout(&self) -> Duration {
        self.settings.actions.timeout()
    }

    // -----------------------------------------------------------------------
    // Guarded actions
    // -----------------------------------------------------------------------

    pub fn click(&mut self, key: &str, mandatory: bool) -> Result<OutcomeStatus> {
        let request = ActionRequest::click(key, mandatory, self.timeout());
        self.run(request)
    }

    pub fn input(&mut self, key: &str, text: &str, mandatory: bool) -> Result<OutcomeStatus> {
        let request = ActionRequest::input(key, text, mandatory, self.timeout());
        self.run(request)
    }

    pub fn upload(&mut self, key: &str, files: Vec<PathBuf>) -> Result<OutcomeStatus> {
        let request = ActionRequest::upload(key, files, true, self.timeout());
        self.run(request)
    }

    /// Presence check for a state marker; never escalates.
    pub fn probe(&mut self, key: &str) -> Result<bool> {
        self.controller.probe(&mut *self.page, &self.scope, key)
    }

    /// A configured non-locator value such as a search keyword.
    pub fn value(&self, key: &str) -> Result<Option<String>> {
        self.controller.value(&self.scope, key)
    }

    /// Configured `(primary, fallback)` locators for a key.
    pub fn locators(&self, key: &str) -> Result<Vec<String>> {
        let (primary, fallback) = self.controller.resolver().get_with_fallback(
            key,
            &self.scope.region,
            &self.scope.category,
        )?;
        Ok(primary.into_iter().chain(fallback).collect())
    }

    fn run(&mut self, request: ActionRequest) -> Result<OutcomeStatus> {
        let outcome = self
            .controller
            .perform(&mut *self.page, &self.scope, &request)?;
        match outcome.status {
            OutcomeStatus::Ok => {
                let settle = self.settings.actions.settle();
                self.page.pause(settle);
            }
            OutcomeStatus::Skipped => {}
            OutcomeStatus::SoftFailed => {
                let reason = outcome.error.unwrap_or_else(|| "failed".to_string());
                warn!(
                    state = %self.state,
                    element_key = %request.element_key,
                    reason = %reason,
                    "optional step failed, continuing"
                );
                self.soft_failures.push(SoftFailure {
                    state: self.state,
                    element_key: request.element_key.clone(),
                    reason,
                });
            }
            OutcomeStatus::CriticalFailed => {
                return Err(ListingError::CriticalOperationFailed {
                    state: self.state.to_string(),
                    reason: format!(
                        "{}: {}",
                        request.element_key,
                        outcome.error.unwrap_or_else(|| "failed".to_string())
                    ),
                });
            }
        }
        Ok(outcome.status)
    }

    // -----------------------------------------------------------------------
    // Navigation and waits
    // -----------------------------------------------------------------------

    /// Base URL of the current region, falling back to SG when unmapped.
    pub fn domain(&self) -> Result<String> {
        if let Some(d) = self.settings.domain_for(&self.scope.region) {
            return Ok(d.to_string());
        }
        warn!(region = %self.scope.region, "no domain configured for region, using SG");
        self.settings
            .domain_for("SG")
            .map(str::to_string)
            .ok_or_else(|| ListingError::CriticalOperationFailed {
                state: self.state.to_string(),
                reason: format!("no domain configured for region {}", self.scope.region),
            })
    }

    pub fn navigate(&mut self, url: &str) -> Result<()> {
        let timeout = self.settings.navigation_timeout();
        self.page
            .navigate(url, timeout)
            .map_err(|e| ListingError::CriticalOperationFailed {
                state: self.state.to_string(),
                reason: format!("navigation to {url} failed: {e}"),
            })?;
        info!(url, "navigated");
        Ok(())
    }

    pub fn open_manage_page(&mut self) -> Result<()> {
        let url = format!("{}/manage-listings/", self.domain()?);
        self.navigate(&url)
    }

    pub fn pause_ms(&mut self, ms: u64) {
        self.page.pause(Duration::from_millis(ms));
    }
}
