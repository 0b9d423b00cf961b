//! Per-(region, category) listing behaviour.
//!
//! The orchestrator owns the state sequence; a [`ListingFlow`] fills in the
//! parts that differ by market. Flows are looked up through
//! [`crate::registry::FlowRegistry`].

mod common;
mod hk;
mod my;
mod sg;

pub use common::CategoryProfile;
pub use hk::HkFlow;
pub use my::MyFlow;
pub use sg::SgFlow;

use crate::enrich::ListingDetails;
use crate::error::Result;
use crate::keys;
use crate::orchestrator::StepContext;

pub trait ListingFlow {
    fn region(&self) -> &str;

    fn profile(&self) -> &CategoryProfile;

    /// Term typed into the category search to reach the placeholder category.
    fn search_keyword(&self) -> &str {
        "others"
    }

    /// Popups that may cover the form right after photos are added.
    fn dismiss_popups(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        ctx.click(keys::AI_WRITING_CANCEL, false)?;
        Ok(())
    }

    /// Core fields beyond title and price.
    fn fill_core_extras(&self, _ctx: &mut StepContext<'_>, _details: &ListingDetails) -> Result<()> {
        Ok(())
    }

    /// Market toggles set before the first publish.
    fn region_adjustments(&self, _ctx: &mut StepContext<'_>, _details: &ListingDetails) -> Result<()> {
        Ok(())
    }

    /// Move the published placeholder listing into its real category.
    fn correct_final_category(&self, ctx: &mut StepContext<'_>, details: &ListingDetails) -> Result<()> {
        common::choose_final_category(ctx, self.profile(), details)
    }

    fn fill_category_specifics(&self, ctx: &mut StepContext<'_>, details: &ListingDetails) -> Result<()> {
        common::fill_specifics(ctx, self.profile(), details)
    }

    fn location_or_delivery(&self, _ctx: &mut StepContext<'_>, _details: &ListingDetails) -> Result<()> {
        Ok(())
    }
}
