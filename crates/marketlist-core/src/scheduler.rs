//! Sequential multi-account batch runner.
//!
//! One product at a time, one browser session at a time. Products already
//! recorded inside the progress window are skipped without touching their
//! browser; successes are recorded as soon as each product finishes.

use crate::config::Settings;
use crate::enrich::enrich;
use crate::error::{ListingError, Result};
use crate::orchestrator::{Orchestrator, SoftFailure, UploadReport};
use crate::page::Page;
use crate::product::Product;
use crate::progress::ProgressTracker;
use crate::registry::FlowRegistry;
use crate::resilience::ResilienceController;
use crate::session::{SessionHandle, SessionProvider};
use crate::types::{Terminal, UploadState};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::any::Any;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{error, info, info_span, warn};

// ---------------------------------------------------------------------------
// ListingRunner
// ---------------------------------------------------------------------------

/// Runs one product on an acquired page.
pub trait ListingRunner {
    fn run(&self, page: &mut dyn Page, product: &Product) -> Result<UploadReport>;

    /// Checked before a session is acquired for the product.
    fn supports(&self, _region: &str, _category: &str) -> bool {
        true
    }
}

/// Production runner: registry lookup, detail enrichment, orchestrator.
pub struct FlowRunner<'a> {
    registry: &'a FlowRegistry,
    controller: &'a ResilienceController<'a>,
    settings: &'a Settings,
    rng: RefCell<StdRng>,
    interrupt: Option<&'a AtomicBool>,
}

impl<'a> FlowRunner<'a> {
    pub fn new(
        registry: &'a FlowRegistry,
        controller: &'a ResilienceController<'a>,
        settings: &'a Settings,
    ) -> Self {
        Self {
            registry,
            controller,
            settings,
            rng: RefCell::new(StdRng::from_entropy()),
            interrupt: None,
        }
    }

    /// Deterministic descriptions, sizes and meet-up picks.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = RefCell::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_interrupt(mut self, flag: &'a AtomicBool) -> Self {
        self.interrupt = Some(flag);
        self
    }
}

impl ListingRunner for FlowRunner<'_> {
    fn run(&self, page: &mut dyn Page, product: &Product) -> Result<UploadReport> {
        let flow = self.registry.get(&product.region, &product.category)?;
        let details = enrich(product, &self.settings.listing, &mut *self.rng.borrow_mut());
        let mut orchestrator = Orchestrator::new(self.controller, self.settings, flow.as_ref());
        if let Some(flag) = self.interrupt {
            orchestrator = orchestrator.with_interrupt(flag);
        }
        orchestrator.run(page, product, &details)
    }

    fn supports(&self, region: &str, category: &str) -> bool {
        self.registry.supports(region, category)
    }
}

// ---------------------------------------------------------------------------
// RunSummary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ProductResult {
    pub row_index: usize,
    pub sku: String,
    pub browser_id: String,
    pub region: String,
    pub category: String,
    pub terminal: Terminal,
    /// Last state the orchestrator entered; `None` when it never started.
    pub reached: Option<UploadState>,
    pub soft_failures: Vec<SoftFailure>,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BrowserStats {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub failed_skus: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub source_id: String,
    pub total_input: usize,
    pub skipped_done: usize,
    pub attempted: usize,
    pub succeeded: usize,
    /// Succeeded products that had at least one optional step fail.
    pub soft_failures: usize,
    pub failed: usize,
    pub not_attempted: usize,
    /// Percentage of attempted products that succeeded.
    pub success_rate: f64,
    pub aborted: bool,
    pub per_browser: BTreeMap<String, BrowserStats>,
    pub results: Vec<ProductResult>,
}

impl RunSummary {
    fn push(&mut self, result: ProductResult) {
        let stats = self.per_browser.entry(result.browser_id.clone()).or_default();
        stats.total += 1;
        self.attempted += 1;
        if result.terminal.is_success() {
            stats.success += 1;
            self.succeeded += 1;
            if result.terminal == Terminal::SoftFailure {
                self.soft_failures += 1;
            }
        } else {
            stats.failed += 1;
            stats.failed_skus.push(result.sku.clone());
            self.failed += 1;
        }
        self.results.push(result);
    }

    fn finish(&mut self) {
        self.success_rate = if self.attempted == 0 {
            0.0
        } else {
            self.succeeded as f64 * 100.0 / self.attempted as f64
        };
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

pub struct Scheduler<'a> {
    provider: &'a mut dyn SessionProvider,
    tracker: &'a mut ProgressTracker,
    runner: &'a dyn ListingRunner,
    source_id: String,
    interrupt: Option<&'a AtomicBool>,
}

/// What happened to the in-flight product.
enum Outcome {
    Finished(UploadReport),
    Failed(String),
    Aborted(String),
}

impl<'a> Scheduler<'a> {
    pub fn new(
        provider: &'a mut dyn SessionProvider,
        tracker: &'a mut ProgressTracker,
        runner: &'a dyn ListingRunner,
        source_id: &str,
    ) -> Self {
        Self {
            provider,
            tracker,
            runner,
            source_id: source_id.to_string(),
            interrupt: None,
        }
    }

    /// Checked before each product starts.
    pub fn with_interrupt(mut self, flag: &'a AtomicBool) -> Self {
        self.interrupt = Some(flag);
        self
    }

    /// Process `products` in order.
    ///
    /// Individual product failures never end the run. `Err` means the run
    /// could not continue at all: session tokens could not be resolved, or a
    /// success could not be written to the progress store.
    pub fn run(&mut self, products: &[Product]) -> Result<RunSummary> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = info_span!("run", run_id = %run_id, source_id = %self.source_id);
        let _guard = span.enter();

        let mut summary = RunSummary {
            run_id,
            source_id: self.source_id.clone(),
            total_input: products.len(),
            ..RunSummary::default()
        };

        let pending: Vec<&Product> = products
            .iter()
            .filter(|p| {
                !self
                    .tracker
                    .is_done(&self.source_id, &p.region, &p.browser_id, &p.sku)
            })
            .collect();
        summary.skipped_done = products.len() - pending.len();
        info!(
            total = products.len(),
            skipped = summary.skipped_done,
            pending = pending.len(),
            window_days = self.tracker.window_days(),
            "starting run"
        );
        if pending.is_empty() {
            summary.finish();
            return Ok(summary);
        }

        let mut seen = HashSet::new();
        let browser_ids: Vec<String> = pending
            .iter()
            .filter(|p| seen.insert(p.browser_id.as_str()))
            .map(|p| p.browser_id.clone())
            .collect();
        let tokens = self.provider.resolve_tokens(&browser_ids)?;
        info!(browsers = browser_ids.len(), resolved = tokens.len(), "session tokens resolved");

        for (i, product) in pending.iter().enumerate() {
            if self.interrupted() {
                warn!(remaining = pending.len() - i, "interrupt received, stopping run");
                summary.aborted = true;
                summary.not_attempted = pending.len() - i;
                break;
            }

            let started = Instant::now();
            let outcome = if !self.runner.supports(&product.region, &product.category) {
                Outcome::Failed(
                    ListingError::UnsupportedCombination {
                        region: product.region.clone(),
                        category: product.category.clone(),
                    }
                    .to_string(),
                )
            } else {
                match tokens.get(&product.browser_id) {
                    Some(token) => match self.provider.acquire(&product.browser_id, token) {
                        Ok(handle) => self.run_in_session(handle, product),
                        Err(e) => Outcome::Failed(e.to_string()),
                    },
                    None => Outcome::Failed(
                        ListingError::SessionAcquisitionFailed {
                            browser_id: product.browser_id.clone(),
                            reason: "no session token resolved".to_string(),
                        }
                        .to_string(),
                    ),
                }
            };

            let elapsed_ms = started.elapsed().as_millis() as u64;
            let (result, aborted) = match outcome {
                Outcome::Finished(report) => (result_from_report(product, report), None),
                Outcome::Failed(reason) => {
                    error!(
                        browser_id = %product.browser_id,
                        sku = %product.sku,
                        error = %reason,
                        "product failed"
                    );
                    (failed_result(product, reason, elapsed_ms), None)
                }
                Outcome::Aborted(reason) => {
                    let result = failed_result(product, format!("aborted: {reason}"), elapsed_ms);
                    (result, Some(reason))
                }
            };

            if result.terminal.is_success() {
                self.tracker.record(
                    &self.source_id,
                    &product.region,
                    &product.browser_id,
                    &product.sku,
                )?;
            }
            summary.push(result);

            if let Some(reason) = aborted {
                warn!(%reason, "run aborted");
                summary.aborted = true;
                summary.not_attempted = pending.len() - i - 1;
                break;
            }
        }

        summary.finish();
        info!(
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            failed = summary.failed,
            soft_failures = summary.soft_failures,
            aborted = summary.aborted,
            "run finished"
        );
        Ok(summary)
    }

    /// Run the product, then release the session whatever happened.
    fn run_in_session(&mut self, mut handle: SessionHandle, product: &Product) -> Outcome {
        let runner = self.runner;
        let page = handle.page.as_mut();
        let result = panic::catch_unwind(AssertUnwindSafe(|| runner.run(page, product)));

        let outcome = match result {
            Ok(Ok(report)) => Outcome::Finished(report),
            Ok(Err(ListingError::Aborted(reason))) => Outcome::Aborted(reason),
            Ok(Err(e)) => Outcome::Failed(e.to_string()),
            Err(payload) => {
                Outcome::Failed(format!("orchestrator panicked: {}", panic_message(&*payload)))
            }
        };

        let browser_id = handle.browser_id.clone();
        if let Err(e) = self.provider.release(handle) {
            error!(%browser_id, error = %e, "failed to release session");
        }
        outcome
    }

    fn interrupted(&self) -> bool {
        self.interrupt
            .map(|f| f.load(Ordering::SeqCst))
            .unwrap_or(false)
    }
}

fn result_from_report(product: &Product, report: UploadReport) -> ProductResult {
    ProductResult {
        row_index: product.row_index,
        sku: product.sku.clone(),
        browser_id: product.browser_id.clone(),
        region: product.region.clone(),
        category: product.category.clone(),
        terminal: report.terminal,
        reached: Some(report.reached),
        soft_failures: report.soft_failures,
        error: report.failure,
        elapsed_ms: report.elapsed_ms,
    }
}

fn failed_result(product: &Product, reason: String, elapsed_ms: u64) -> ProductResult {
    ProductResult {
        row_index: product.row_index,
        sku: product.sku.clone(),
        browser_id: product.browser_id.clone(),
        region: product.region.clone(),
        category: product.category.clone(),
        terminal: Terminal::CriticalFailure,
        reached: None,
        soft_failures: Vec::new(),
        error: Some(reason),
        elapsed_ms,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
