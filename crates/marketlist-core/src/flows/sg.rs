use super::common::{ensure_meetup, CategoryProfile};
use super::ListingFlow;
use crate::enrich::ListingDetails;
use crate::error::Result;
use crate::keys;
use crate::orchestrator::StepContext;

pub struct SgFlow {
    profile: CategoryProfile,
}

impl SgFlow {
    pub fn new(profile: CategoryProfile) -> Self {
        Self { profile }
    }
}

impl ListingFlow for SgFlow {
    fn region(&self) -> &str {
        "SG"
    }

    fn profile(&self) -> &CategoryProfile {
        &self.profile
    }

    fn dismiss_popups(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        // only shown on an account's first listing
        ctx.click(keys::NEW_ACCOUNT_POPUP_CLOSE, false)?;
        ctx.click(keys::AI_WRITING_CANCEL, false)?;
        Ok(())
    }

    fn region_adjustments(&self, ctx: &mut StepContext<'_>, _details: &ListingDetails) -> Result<()> {
        ctx.click(keys::LOCATION_SELECTOR, false)?;
        ctx.pause_ms(2000);
        ctx.click(keys::LOCATION_OPTION, true)?;
        Ok(())
    }

    fn location_or_delivery(&self, ctx: &mut StepContext<'_>, details: &ListingDetails) -> Result<()> {
        ensure_meetup(ctx, details)
    }
}
