use super::common::CategoryProfile;
use super::ListingFlow;
use crate::enrich::ListingDetails;
use crate::error::Result;
use crate::keys;
use crate::orchestrator::StepContext;
use tracing::info;

/// Hong Kong: Chinese search terms, condition and description on the first
/// form, and delivery instead of meet-up.
pub struct HkFlow {
    profile: CategoryProfile,
}

impl HkFlow {
    pub fn new(profile: CategoryProfile) -> Self {
        Self { profile }
    }
}

impl ListingFlow for HkFlow {
    fn region(&self) -> &str {
        "HK"
    }

    fn profile(&self) -> &CategoryProfile {
        &self.profile
    }

    fn search_keyword(&self) -> &str {
        "其他"
    }

    fn fill_core_extras(&self, ctx: &mut StepContext<'_>, details: &ListingDetails) -> Result<()> {
        ctx.click(keys::CONDITION_NEW_USED, true)?;
        ctx.input(keys::DESCRIPTION_INPUT, &details.description, true)?;
        Ok(())
    }

    fn region_adjustments(&self, ctx: &mut StepContext<'_>, _details: &ListingDetails) -> Result<()> {
        if ctx.probe(keys::WHATSAPP_PROMPT)? {
            info!("closing WhatsApp number prompt");
            ctx.click(keys::WHATSAPP_CLOSE, true)?;
        }
        if ctx.probe(keys::MEETUP_ENABLED_MARKER)? {
            info!("turning meet-up off");
            ctx.click(keys::MEETUP_TOGGLE, true)?;
        }
        if !ctx.probe(keys::DELIVERY_ENABLED_MARKER)? {
            info!("turning delivery on");
            ctx.click(keys::DELIVERY_TOGGLE, true)?;
        }
        Ok(())
    }
}
