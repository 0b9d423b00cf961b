use crate::enrich::ListingDetails;
use crate::error::Result;
use crate::keys;
use crate::orchestrator::StepContext;
use crate::product::Gender;
use tracing::{debug, info};

const SEARCH_SETTLE_MS: u64 = 2000;
const DEFAULT_BRAND_KEYWORD: &str = "other";

/// What a product category needs on the edit page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryProfile {
    pub name: &'static str,
    /// Men's and women's subcategories are separate options.
    pub gendered: bool,
    pub sized: bool,
    pub default_keyword: &'static str,
}

impl CategoryProfile {
    pub const SNEAKERS: CategoryProfile = CategoryProfile {
        name: "sneakers",
        gendered: true,
        sized: true,
        default_keyword: "sneakers",
    };

    pub const CLOTHES: CategoryProfile = CategoryProfile {
        name: "clothes",
        gendered: true,
        sized: true,
        default_keyword: "clothes",
    };

    pub const BAGS: CategoryProfile = CategoryProfile {
        name: "bags",
        gendered: false,
        sized: false,
        default_keyword: "bags",
    };
}

pub(crate) fn choose_final_category(
    ctx: &mut StepContext<'_>,
    profile: &CategoryProfile,
    details: &ListingDetails,
) -> Result<()> {
    ctx.click(keys::FINAL_CATEGORY_SELECTOR, true)?;

    let keyword = ctx
        .value(keys::FINAL_CATEGORY_KEYWORD)?
        .unwrap_or_else(|| profile.default_keyword.to_string());
    ctx.input(keys::FINAL_CATEGORY_SEARCH_INPUT, &keyword, true)?;
    ctx.pause_ms(SEARCH_SETTLE_MS);

    let option = if !profile.gendered {
        keys::FINAL_CATEGORY_OPTION
    } else if details.gender == Gender::Male {
        keys::FINAL_CATEGORY_MEN_OPTION
    } else {
        keys::FINAL_CATEGORY_WOMEN_OPTION
    };
    info!(category = profile.name, %keyword, option, "choosing final category");
    ctx.click(option, true)?;
    Ok(())
}

pub(crate) fn fill_specifics(
    ctx: &mut StepContext<'_>,
    profile: &CategoryProfile,
    details: &ListingDetails,
) -> Result<()> {
    ctx.click(keys::CONDITION_SELECTOR, true)?;

    ctx.click(keys::BRAND_SELECTOR, true)?;
    let brand_keyword = ctx
        .value(keys::BRAND_SEARCH_KEYWORD)?
        .unwrap_or_else(|| DEFAULT_BRAND_KEYWORD.to_string());
    ctx.input(keys::BRAND_SEARCH_INPUT, &brand_keyword, true)?;
    ctx.pause_ms(SEARCH_SETTLE_MS);
    ctx.click(keys::BRAND_OPTION, true)?;
    if details.brand.is_empty() {
        debug!("no brand on product, leaving brand field empty");
    } else {
        ctx.input(keys::BRAND_INPUT, &details.brand, true)?;
    }

    if profile.sized {
        ctx.click(keys::SIZE_SELECTOR, true)?;
        ctx.input(keys::SIZE_SEARCH_INPUT, &details.size, true)?;
        ctx.pause_ms(SEARCH_SETTLE_MS);
        ctx.click(keys::SIZE_OPTION, true)?;
    }

    ctx.click(keys::MULTI_QUANTITY_CHECKBOX, false)?;
    Ok(())
}

/// Pick a meet-up spot unless the account already has one preselected.
pub(crate) fn ensure_meetup(ctx: &mut StepContext<'_>, details: &ListingDetails) -> Result<()> {
    if ctx.probe(keys::MEETUP_PRESELECTED)? {
        info!("meet-up location already selected");
        return Ok(());
    }
    info!(location = %details.meetup_location, "selecting meet-up location");
    ctx.click(keys::MEETUP_LOCATION_TOGGLE, true)?;
    ctx.input(keys::MEETUP_INPUT, &details.meetup_location, true)?;
    ctx.pause_ms(SEARCH_SETTLE_MS);
    ctx.click(keys::MEETUP_OPTION, true)?;
    Ok(())
}
