use super::common::{ensure_meetup, CategoryProfile};
use super::ListingFlow;
use crate::enrich::ListingDetails;
use crate::error::Result;
use crate::orchestrator::StepContext;

pub struct MyFlow {
    profile: CategoryProfile,
}

impl MyFlow {
    pub fn new(profile: CategoryProfile) -> Self {
        Self { profile }
    }
}

impl ListingFlow for MyFlow {
    fn region(&self) -> &str {
        "MY"
    }

    fn profile(&self) -> &CategoryProfile {
        &self.profile
    }

    fn location_or_delivery(&self, ctx: &mut StepContext<'_>, details: &ListingDetails) -> Result<()> {
        ensure_meetup(ctx, details)
    }
}
