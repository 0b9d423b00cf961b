//! Per-product upload state machine.
//!
//! States run strictly in [`UploadState`] order. Each state is a short
//! sequence of guarded steps; mandatory step failures end the product in
//! `CriticalFailure`, optional ones are collected as soft failures.

mod context;

pub use context::{SoftFailure, StepContext};

use crate::config::Settings;
use crate::enrich::{collect_media, ListingDetails};
use crate::error::{ListingError, Result};
use crate::flows::ListingFlow;
use crate::keys;
use crate::page::{PageError, WaitState};
use crate::product::Product;
use crate::resilience::{ResilienceController, StepScope};
use crate::types::{Terminal, UploadState};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, warn};

const PRE_PUBLISH_SETTLE_MS: u64 = 10_000;
const MEDIA_SETTLE_MS: u64 = 2_000;
const EDIT_OPEN_SETTLE_MS: u64 = 2_000;
const ACTIVATE_SETTLE_MS: u64 = 5_000;

// ---------------------------------------------------------------------------
// UploadReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    pub sku: String,
    pub browser_id: String,
    pub terminal: Terminal,
    /// Last state entered; the failing state for critical failures.
    pub reached: UploadState,
    pub transitions: Vec<UploadState>,
    pub soft_failures: Vec<SoftFailure>,
    pub failure: Option<String>,
    pub elapsed_ms: u64,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator<'a> {
    controller: &'a ResilienceController<'a>,
    settings: &'a Settings,
    flow: &'a dyn ListingFlow,
    interrupt: Option<&'a AtomicBool>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        controller: &'a ResilienceController<'a>,
        settings: &'a Settings,
        flow: &'a dyn ListingFlow,
    ) -> Self {
        Self {
            controller,
            settings,
            flow,
            interrupt: None,
        }
    }

    /// Checked between states; when set the product stops with `Aborted`.
    pub fn with_interrupt(mut self, flag: &'a AtomicBool) -> Self {
        self.interrupt = Some(flag);
        self
    }

    /// Drive one product to a terminal state.
    ///
    /// Only an abort (operator quit or interrupt) is returned as `Err`;
    /// every other failure is folded into the report.
    pub fn run(
        &self,
        page: &mut dyn crate::page::Page,
        product: &Product,
        details: &ListingDetails,
    ) -> Result<UploadReport> {
        let started = Instant::now();
        let span = info_span!("upload", browser_id = %product.browser_id, sku = %product.sku);
        let _guard = span.enter();

        let scope = StepScope {
            region: product.region.clone(),
            category: product.category.clone(),
            browser_id: product.browser_id.clone(),
            sku: product.sku.clone(),
        };
        let mut ctx = StepContext::new(page, self.controller, self.settings, scope);
        let mut transitions = Vec::new();
        let mut failure = None;
        let mut state = UploadState::Start;

        loop {
            if self.interrupted() {
                warn!(state = %state, "interrupt received, stopping product");
                return Err(ListingError::Aborted("interrupted".to_string()));
            }
            ctx.enter(state);
            transitions.push(state);
            info!(state = %state, "entering state");

            match self.step(state, &mut ctx, product, details) {
                Ok(()) => {}
                Err(e @ ListingError::Aborted(_)) => return Err(e),
                Err(e) => {
                    error!(state = %state, error = %e, "product failed");
                    failure = Some(e.to_string());
                    break;
                }
            }
            match state.next() {
                Some(next) => state = next,
                None => break,
            }
        }

        let soft_failures = ctx.take_soft_failures();
        let terminal = if failure.is_some() {
            Terminal::CriticalFailure
        } else if soft_failures.is_empty() {
            Terminal::Done
        } else {
            Terminal::SoftFailure
        };
        info!(%terminal, soft_failures = soft_failures.len(), "product finished");

        Ok(UploadReport {
            sku: product.sku.clone(),
            browser_id: product.browser_id.clone(),
            terminal,
            reached: state,
            transitions,
            soft_failures,
            failure,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    fn interrupted(&self) -> bool {
        self.interrupt
            .map(|f| f.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    fn step(
        &self,
        state: UploadState,
        ctx: &mut StepContext<'_>,
        product: &Product,
        details: &ListingDetails,
    ) -> Result<()> {
        let flow = self.flow;
        match state {
            UploadState::Start | UploadState::Done => Ok(()),
            UploadState::Navigate => {
                let url = ctx.domain()?;
                ctx.navigate(&url)
            }
            UploadState::OpenListingForm => {
                ctx.click(keys::SELL_BUTTON, true)?;
                Ok(())
            }
            UploadState::UploadMedia => {
                let files = collect_media(
                    &product.media_folder,
                    &self.settings.listing.image_extensions,
                )?;
                if files.is_empty() {
                    return Err(ListingError::CriticalOperationFailed {
                        state: state.to_string(),
                        reason: format!(
                            "no media files in {}",
                            product.media_folder.display()
                        ),
                    });
                }
                info!(count = files.len(), "uploading media");
                ctx.click(keys::UPLOAD_IMAGES_BUTTON, true)?;
                ctx.upload(keys::IMAGE_FILE_INPUT, files)?;
                ctx.pause_ms(MEDIA_SETTLE_MS);
                flow.dismiss_popups(ctx)
            }
            UploadState::ChooseInitialCategory => {
                ctx.click(keys::SERVICE_CATEGORY_SELECTOR, true)?;
                ctx.input(keys::CATEGORY_SEARCH_INPUT, flow.search_keyword(), true)?;
                ctx.pause_ms(2000);
                ctx.click(keys::SERVICE_CATEGORY_OPTION, true)?;
                Ok(())
            }
            UploadState::FillCoreFields => {
                ctx.input(keys::TITLE_INPUT, &details.title, true)?;
                ctx.input(keys::PRICE_INPUT, &details.price, true)?;
                flow.fill_core_extras(ctx, details)
            }
            UploadState::RegionSpecificAdjustments => flow.region_adjustments(ctx, details),
            UploadState::Publish => {
                ctx.pause_ms(PRE_PUBLISH_SETTLE_MS);
                ctx.click(keys::PUBLISH_BUTTON, true)?;
                Ok(())
            }
            UploadState::AwaitConfirmation => {
                self.await_confirmation(ctx)?;
                Ok(())
            }
            UploadState::CorrectFinalCategory => {
                ctx.open_manage_page()?;
                ctx.click(keys::INACTIVE_TAB, true)?;
                ctx.click(keys::INACTIVE_FIRST_ITEM, true)?;
                ctx.pause_ms(EDIT_OPEN_SETTLE_MS);
                ctx.click(keys::EDIT_BUTTON, true)?;
                ctx.click(keys::AI_WRITING_CANCEL, false)?;
                flow.correct_final_category(ctx, details)
            }
            UploadState::FillCategorySpecifics => flow.fill_category_specifics(ctx, details),
            UploadState::HandleLocationOrDeliverySettings => flow.location_or_delivery(ctx, details),
            UploadState::Activate => {
                // save the edited listing, then activate it from the manage page
                ctx.click(keys::PUBLISH_BUTTON, true)?;
                self.await_confirmation(ctx)?;
                ctx.open_manage_page()?;
                ctx.click(keys::INACTIVE_TAB, true)?;
                ctx.click(keys::ACTIVATE_BUTTON, true)?;
                ctx.click(keys::CONFIRM_ACTIVATE, true)?;
                ctx.pause_ms(ACTIVATE_SETTLE_MS);
                Ok(())
            }
        }
    }

    /// Wait for the post-publish dialog to appear and then go away.
    ///
    /// Never fails the product: a dialog that never shows, a detection error
    /// or an unconfigured selector fall back to a fixed wait; a dialog that
    /// lingers past the vanish timeout is logged and the flow continues.
    fn await_confirmation(&self, ctx: &mut StepContext<'_>) -> Result<Confirmation> {
        let cfg = &self.settings.confirmation;
        let fallback_ms = cfg.fallback_wait_ms;
        let appear = Duration::from_millis(cfg.appear_timeout_ms);
        let vanish = Duration::from_millis(cfg.vanish_timeout_ms);

        let locators = ctx.locators(keys::CONFIRMATION_DIALOG)?;
        if locators.is_empty() {
            warn!("no confirmation dialog selector configured, using fixed wait");
            ctx.pause_ms(fallback_ms);
            return Ok(Confirmation::FixedWait);
        }

        // Primary, then fallback; the first locator that shows wins.
        let mut shown = None;
        for selector in locators {
            match ctx.page().wait_for(&selector, WaitState::Visible, appear) {
                Ok(()) => {
                    shown = Some(selector);
                    break;
                }
                Err(PageError::Timeout { .. }) | Err(PageError::NotFound(_)) => {
                    debug!(%selector, "confirmation dialog not seen with this locator");
                }
                Err(e) => {
                    warn!(%selector, error = %e, "confirmation detection failed");
                }
            }
        }
        let Some(selector) = shown else {
            info!("confirmation dialog did not appear, using fixed wait");
            ctx.pause_ms(fallback_ms);
            return Ok(Confirmation::FixedWait);
        };

        match ctx.page().wait_for(&selector, WaitState::Hidden, vanish) {
            Ok(()) => {
                info!("confirmation dialog closed");
                Ok(Confirmation::Closed)
            }
            Err(PageError::Timeout { .. }) => {
                warn!(%selector, "confirmation dialog still open, continuing");
                Ok(Confirmation::Lingering)
            }
            Err(e) => {
                warn!(%selector, error = %e, "confirmation detection failed, using fixed wait");
                ctx.pause_ms(fallback_ms);
                Ok(Confirmation::FixedWait)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Confirmation {
    Closed,
    Lingering,
    FixedWait,
}
