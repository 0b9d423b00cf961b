use crate::error::{ListingError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// File constants
// ---------------------------------------------------------------------------

pub const SETTINGS_FILE: &str = "marketlist.yaml";
pub const SELECTOR_FILE: &str = "css_selectors.yaml";
pub const DEFAULT_SELECTORS_DIR: &str = "selectors";
pub const DEFAULT_PROGRESS_FILE: &str = "success_records.json";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn settings_path(root: &Path) -> PathBuf {
    root.join(SETTINGS_FILE)
}

/// `<selectors_dir>/<REGION>/<category>/css_selectors.yaml`
pub fn selector_file(selectors_dir: &Path, region: &str, category: &str) -> PathBuf {
    selectors_dir
        .join(normalize_region(region))
        .join(normalize_category(category))
        .join(SELECTOR_FILE)
}

/// Resolve a possibly-relative settings path against the workspace root.
pub fn under_root(root: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        root.join(p)
    }
}

// ---------------------------------------------------------------------------
// Partition keys
// ---------------------------------------------------------------------------

pub fn normalize_region(region: &str) -> String {
    region.trim().to_ascii_uppercase()
}

pub fn normalize_category(category: &str) -> String {
    category.trim().to_ascii_lowercase()
}

// ---------------------------------------------------------------------------
// Selector key validation
// ---------------------------------------------------------------------------

static KEY_RE: OnceLock<Regex> = OnceLock::new();

fn key_re() -> &'static Regex {
    KEY_RE.get_or_init(|| Regex::new(r"^[a-z0-9_]+(\.[a-z0-9_]+)*$").unwrap())
}

/// Element keys are dotted paths of lowercase identifiers, e.g.
/// `basic_elements.sell_button`.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.len() > 128 || !key_re().is_match(key) {
        return Err(ListingError::InvalidSelectorKey(key.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_keys() {
        for key in [
            "basic_elements.sell_button",
            "publishing.publish_button",
            "sneakers_sg.men_sneakers_option",
            "title",
        ] {
            validate_key(key).unwrap_or_else(|_| panic!("expected valid: {key}"));
        }
    }

    #[test]
    fn invalid_keys() {
        for key in ["", ".leading", "trailing.", "a..b", "Has.Upper", "with space"] {
            assert!(validate_key(key).is_err(), "expected invalid: {key}");
        }
    }

    #[test]
    fn selector_file_layout() {
        let dir = Path::new("/tmp/proj/selectors");
        assert_eq!(
            selector_file(dir, "sg", "Sneakers"),
            PathBuf::from("/tmp/proj/selectors/SG/sneakers/css_selectors.yaml")
        );
    }

    #[test]
    fn under_root_keeps_absolute_paths() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            under_root(root, "/var/data/records.json"),
            PathBuf::from("/var/data/records.json")
        );
        assert_eq!(
            under_root(root, "success_records.json"),
            PathBuf::from("/tmp/proj/success_records.json")
        );
    }
}
