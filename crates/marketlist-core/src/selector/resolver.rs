use super::{SelectorDefinition, SelectorStore};
use crate::config::ReloadPolicy;
use crate::error::{ListingError, Result};
use crate::paths::validate_key;
use crate::types::Variant;
use tracing::{debug, info};

/// Looks up element definitions and writes repairs back through the store.
pub struct SelectorResolver {
    store: SelectorStore,
    reload: ReloadPolicy,
}

impl SelectorResolver {
    pub fn new(store: SelectorStore, reload: ReloadPolicy) -> Self {
        Self { store, reload }
    }

    pub fn store(&self) -> &SelectorStore {
        &self.store
    }

    /// Full definition for `key`, or `None` when the file has no entry.
    pub fn definition(
        &self,
        key: &str,
        region: &str,
        category: &str,
    ) -> Result<Option<SelectorDefinition>> {
        check_region(key, region)?;
        validate_key(key)?;
        self.refresh(region, category);
        Ok(self.store.load(region, category).lookup(key))
    }

    pub fn get_selector(
        &self,
        key: &str,
        region: &str,
        category: &str,
        variant: Variant,
    ) -> Result<Option<String>> {
        Ok(self
            .definition(key, region, category)?
            .and_then(|d| d.get(variant).map(str::to_string)))
    }

    /// `(primary, fallback)` for `key`; either side may be absent.
    pub fn get_with_fallback(
        &self,
        key: &str,
        region: &str,
        category: &str,
    ) -> Result<(Option<String>, Option<String>)> {
        let def = self.definition(key, region, category)?.unwrap_or_default();
        Ok((def.primary, def.fallback))
    }

    pub fn description(&self, key: &str, region: &str, category: &str) -> Result<String> {
        let from_file = self.get_selector(key, region, category, Variant::Description)?;
        Ok(from_file
            .or_else(|| crate::keys::describe(key).map(str::to_string))
            .unwrap_or_else(|| key.to_string()))
    }

    /// Read-modify-write one variant of `key`, then drop the cached tree.
    ///
    /// Returns whether the stored value changed. A missing file is created.
    pub fn update_selector(
        &self,
        key: &str,
        variant: Variant,
        value: &str,
        region: &str,
        category: &str,
    ) -> Result<bool> {
        check_region(key, region)?;
        validate_key(key)?;
        let value = value.trim();
        let mut tree = self.store.read_for_update(region, category)?;
        let previous = tree.set(key, variant, value)?;
        if previous.as_deref() == Some(value) {
            debug!(element_key = key, %variant, "selector unchanged");
            return Ok(false);
        }
        self.store.write_back(region, category, &tree)?;
        info!(
            element_key = key,
            %variant,
            region,
            category,
            selector = value,
            "selector updated"
        );
        Ok(true)
    }

    fn refresh(&self, region: &str, category: &str) {
        match self.reload {
            ReloadPolicy::Always => self.store.invalidate(region, category),
            ReloadPolicy::OnChange => {
                if self.store.is_stale(region, category) {
                    self.store.invalidate(region, category);
                }
            }
            ReloadPolicy::Never => {}
        }
    }
}

fn check_region(key: &str, region: &str) -> Result<()> {
    if region.trim().is_empty() {
        return Err(ListingError::MissingRegion(key.to_string()));
    }
    Ok(())
}
