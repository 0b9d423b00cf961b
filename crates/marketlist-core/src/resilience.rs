//! Fallback, bounded retry and interactive repair around single UI actions.
//!
//! [`ResilienceController::perform`] is the only place that interprets the
//! `mandatory` flag of a step:
//!
//! 1. resolve `(primary, fallback)`; nothing configured is fatal for a
//!    mandatory step (`ConfigMissing` when the partition has no file at
//!    all) and a skip for an optional one
//! 2. try primary; a clean miss on an optional step is `Skipped` at once
//! 3. try fallback when it differs from primary
//! 4. retry both, `retries` rounds, with a fixed delay
//! 5. ask the repair port for a replacement, persist it, retry once
//! 6. otherwise `CriticalFailed` (mandatory) or `SoftFailed` (optional)

use crate::action::{execute, ActionOutcome, ActionRequest, Attempt};
use crate::config::ActionSettings;
use crate::error::{ListingError, Result};
use crate::page::Page;
use crate::repair::{RepairRequest, RepairResponse, SelectorRepairPort};
use crate::selector::{validate_selector, SelectorResolver};
use crate::types::Variant;
use std::time::Duration;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Extra rounds over (primary, fallback) after the first pass.
    pub retries: u32,
    pub delay: Duration,
    /// Malformed repair answers tolerated before giving up on the step.
    pub max_repair_prompts: u32,
}

impl RetryPolicy {
    pub fn from_settings(actions: &ActionSettings) -> Self {
        Self {
            retries: actions.retry_times,
            delay: actions.retry_delay(),
            max_repair_prompts: actions.max_repair_prompts,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&ActionSettings::default())
    }
}

// ---------------------------------------------------------------------------
// StepScope
// ---------------------------------------------------------------------------

/// Who a step runs for: selector partition plus log context.
#[derive(Debug, Clone)]
pub struct StepScope {
    pub region: String,
    pub category: String,
    pub browser_id: String,
    pub sku: String,
}

// ---------------------------------------------------------------------------
// ResilienceController
// ---------------------------------------------------------------------------

pub struct ResilienceController<'a> {
    resolver: &'a SelectorResolver,
    repair: &'a dyn SelectorRepairPort,
    policy: RetryPolicy,
}

/// How the candidate loop ended before escalation.
enum Pass {
    Hit(String),
    Skip,
    Miss(Option<String>),
}

impl<'a> ResilienceController<'a> {
    pub fn new(
        resolver: &'a SelectorResolver,
        repair: &'a dyn SelectorRepairPort,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            resolver,
            repair,
            policy,
        }
    }

    pub fn resolver(&self) -> &SelectorResolver {
        self.resolver
    }

    pub fn perform(
        &self,
        page: &mut dyn Page,
        scope: &StepScope,
        request: &ActionRequest,
    ) -> Result<ActionOutcome> {
        let key = request.element_key.as_str();
        let (primary, fallback) =
            self.resolver
                .get_with_fallback(key, &scope.region, &scope.category)?;

        let mut candidates: Vec<String> = Vec::with_capacity(2);
        candidates.extend(primary);
        if let Some(fb) = fallback {
            if !candidates.contains(&fb) {
                candidates.push(fb);
            }
        }

        if candidates.is_empty() {
            if request.mandatory {
                let file = self.resolver.store().file_for(&scope.region, &scope.category);
                if !file.exists() {
                    return Err(ListingError::ConfigMissing {
                        region: scope.region.clone(),
                        category: scope.category.clone(),
                    });
                }
                return Err(ListingError::SelectorUnresolved {
                    key: key.to_string(),
                    region: scope.region.clone(),
                    category: scope.category.clone(),
                });
            }
            debug!(element_key = key, "no selector configured for optional step, skipping");
            return Ok(ActionOutcome::skipped(0, "no selector configured"));
        }

        let mut attempts = 0u32;
        let mut last_error = None;

        for round in 0..=self.policy.retries {
            if round > 0 {
                debug!(element_key = key, round, "retrying after delay");
                page.pause(self.policy.delay);
            }
            match self.pass(page, request, &candidates, &mut attempts) {
                Pass::Hit(selector) => return Ok(ActionOutcome::ok(&selector, attempts)),
                Pass::Skip => {
                    info!(
                        element_key = key,
                        browser_id = %scope.browser_id,
                        sku = %scope.sku,
                        "optional element absent, skipping"
                    );
                    return Ok(ActionOutcome::skipped(attempts, "element absent"));
                }
                Pass::Miss(err) => {
                    if err.is_some() {
                        last_error = err;
                    }
                }
            }
        }

        warn!(
            element_key = key,
            browser_id = %scope.browser_id,
            sku = %scope.sku,
            attempts,
            error = last_error.as_deref().unwrap_or("element not found"),
            "all configured selectors failed, escalating to repair"
        );
        self.escalate(page, scope, request, candidates, attempts, last_error)
    }

    /// Probe for an element without acting and without escalation.
    ///
    /// Used for state markers such as "meet-up already enabled"; an
    /// unconfigured key or a driver error reads as absent.
    pub fn probe(&self, page: &mut dyn Page, scope: &StepScope, key: &str) -> Result<bool> {
        let (primary, fallback) =
            self.resolver
                .get_with_fallback(key, &scope.region, &scope.category)?;
        for selector in primary.into_iter().chain(fallback) {
            match page.exists(&selector) {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) => warn!(element_key = key, %selector, error = %e, "probe failed"),
            }
        }
        Ok(false)
    }

    /// Read a configured value (search keywords live beside locators).
    pub fn value(&self, scope: &StepScope, key: &str) -> Result<Option<String>> {
        self.resolver
            .get_selector(key, &scope.region, &scope.category, Variant::Primary)
    }

    fn pass(
        &self,
        page: &mut dyn Page,
        request: &ActionRequest,
        candidates: &[String],
        attempts: &mut u32,
    ) -> Pass {
        let mut last_error = None;
        for selector in candidates {
            *attempts += 1;
            match execute(page, request, selector) {
                Attempt::Done => {
                    debug!(
                        element_key = %request.element_key,
                        %selector,
                        attempt = *attempts,
                        "action succeeded"
                    );
                    return Pass::Hit(selector.clone());
                }
                Attempt::Absent if !request.mandatory => return Pass::Skip,
                Attempt::Absent => {
                    debug!(element_key = %request.element_key, %selector, "element not found");
                }
                Attempt::Failed(e) => {
                    debug!(element_key = %request.element_key, %selector, error = %e, "action failed");
                    last_error = Some(e.to_string());
                }
            }
        }
        Pass::Miss(last_error)
    }

    fn escalate(
        &self,
        page: &mut dyn Page,
        scope: &StepScope,
        request: &ActionRequest,
        tried: Vec<String>,
        mut attempts: u32,
        last_error: Option<String>,
    ) -> Result<ActionOutcome> {
        let key = request.element_key.as_str();
        let failed =
            |attempts, reason: String| Ok(ActionOutcome::failed(request.mandatory, attempts, reason));
        let reason = last_error
            .clone()
            .unwrap_or_else(|| "element not found".to_string());

        if self.policy.max_repair_prompts == 0 {
            return failed(attempts, reason);
        }

        let mut prompt = RepairRequest {
            element_key: key.to_string(),
            description: self
                .resolver
                .description(key, &scope.region, &scope.category)?,
            action: request.kind,
            mandatory: request.mandatory,
            region: scope.region.clone(),
            category: scope.category.clone(),
            browser_id: scope.browser_id.clone(),
            sku: scope.sku.clone(),
            tried,
            last_error: last_error.clone(),
            page_url: page.current_url(),
            rejected: None,
        };

        for _ in 0..self.policy.max_repair_prompts {
            match self.repair.request(&prompt) {
                RepairResponse::Replace(selector) => {
                    let selector = selector.trim().to_string();
                    if !validate_selector(&selector) {
                        warn!(element_key = key, %selector, "rejected malformed selector");
                        prompt.rejected = Some(selector);
                        continue;
                    }
                    if let Err(e) = self.resolver.update_selector(
                        key,
                        Variant::Primary,
                        &selector,
                        &scope.region,
                        &scope.category,
                    ) {
                        warn!(element_key = key, error = %e, "could not persist repaired selector");
                    }
                    attempts += 1;
                    return match execute(page, request, &selector) {
                        Attempt::Done => {
                            info!(element_key = key, %selector, "repaired selector worked");
                            Ok(ActionOutcome::ok(&selector, attempts))
                        }
                        Attempt::Absent => failed(
                            attempts,
                            format!("repaired selector '{selector}' matched nothing"),
                        ),
                        Attempt::Failed(e) => {
                            failed(attempts, format!("repaired selector '{selector}' failed: {e}"))
                        }
                    };
                }
                RepairResponse::Skip if !request.mandatory => {
                    info!(element_key = key, "operator skipped optional step");
                    return Ok(ActionOutcome::skipped(attempts, "skipped by operator"));
                }
                RepairResponse::Skip => {
                    warn!(element_key = key, "skip is not allowed for a mandatory step");
                    prompt.rejected = Some("skip".to_string());
                }
                RepairResponse::Decline => {
                    info!(element_key = key, "operator declined repair");
                    return failed(attempts, format!("{reason} (repair declined)"));
                }
                RepairResponse::Abort => {
                    warn!(element_key = key, "operator aborted the run");
                    return Err(ListingError::Aborted(format!(
                        "operator quit while repairing '{key}'"
                    )));
                }
            }
        }

        failed(
            attempts,
            format!(
                "no valid selector after {} repair prompts",
                self.policy.max_repair_prompts
            ),
        )
    }
}
