use crate::config::ListingSettings;
use crate::error::Result;
use crate::paths::normalize_region;
use crate::product::{Gender, Product};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

const DEFAULT_SIZE: &str = "40";
const FALLBACK_MEETUP_REGION: &str = "SG";

/// Everything a flow types into the listing form for one product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingDetails {
    pub title: String,
    pub price: String,
    pub description: String,
    pub brand: String,
    pub gender: Gender,
    pub size: String,
    pub meetup_location: String,
}

/// Fill in the randomized fields the source list does not carry.
pub fn enrich<R: Rng + ?Sized>(
    product: &Product,
    listing: &ListingSettings,
    rng: &mut R,
) -> ListingDetails {
    let gender = product.gender();
    let description = product
        .attribute("description")
        .map(str::to_string)
        .or_else(|| listing.descriptions.choose(rng).cloned())
        .unwrap_or_default();
    let size = pick_size(listing, gender, rng);
    let meetup_location = pick_meetup(listing, &product.region, rng);

    info!(
        sku = %product.sku,
        %gender,
        size = %size,
        meetup = %meetup_location,
        "listing details enriched"
    );

    ListingDetails {
        title: product.title.clone(),
        price: product.price.clone(),
        description,
        brand: product.brand().to_string(),
        gender,
        size,
        meetup_location,
    }
}

fn pick_size<R: Rng + ?Sized>(listing: &ListingSettings, gender: Gender, rng: &mut R) -> String {
    let pool = match gender {
        Gender::Female => &listing.female_sizes,
        Gender::Male => &listing.male_sizes,
        Gender::Unisex => return DEFAULT_SIZE.to_string(),
    };
    pool.choose(rng)
        .cloned()
        .unwrap_or_else(|| DEFAULT_SIZE.to_string())
}

fn pick_meetup<R: Rng + ?Sized>(listing: &ListingSettings, region: &str, rng: &mut R) -> String {
    let region = normalize_region(region);
    listing
        .meetup_locations
        .get(&region)
        .filter(|l| !l.is_empty())
        .or_else(|| listing.meetup_locations.get(FALLBACK_MEETUP_REGION))
        .and_then(|l| l.choose(rng).cloned())
        .unwrap_or_default()
}

/// Files in `folder` (non-recursive, sorted by name) whose extension is in
/// `extensions`, compared case-insensitively. A missing folder is empty.
pub fn collect_media(folder: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Ok(Vec::new());
    }
    let wanted: Vec<String> = extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
        .collect();
    let mut files = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| wanted.contains(&e.to_ascii_lowercase()))
            .unwrap_or(false);
        if matches {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
