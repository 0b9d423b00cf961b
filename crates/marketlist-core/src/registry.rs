use crate::error::{ListingError, Result};
use crate::flows::{CategoryProfile, HkFlow, ListingFlow, MyFlow, SgFlow};
use crate::paths::{normalize_category, normalize_region};
use std::collections::BTreeMap;

pub type FlowFactory = fn() -> Box<dyn ListingFlow>;

/// Explicit (region, category) → flow table, filled once at startup.
#[derive(Default)]
pub struct FlowRegistry {
    factories: BTreeMap<(String, String), FlowFactory>,
}

impl FlowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// SG, HK and MY for sneakers, bags and clothes.
    pub fn with_defaults() -> Self {
        let mut r = Self::new();
        r.register("SG", "sneakers", || Box::new(SgFlow::new(CategoryProfile::SNEAKERS)));
        r.register("SG", "bags", || Box::new(SgFlow::new(CategoryProfile::BAGS)));
        r.register("SG", "clothes", || Box::new(SgFlow::new(CategoryProfile::CLOTHES)));
        r.register("HK", "sneakers", || Box::new(HkFlow::new(CategoryProfile::SNEAKERS)));
        r.register("HK", "bags", || Box::new(HkFlow::new(CategoryProfile::BAGS)));
        r.register("HK", "clothes", || Box::new(HkFlow::new(CategoryProfile::CLOTHES)));
        r.register("MY", "sneakers", || Box::new(MyFlow::new(CategoryProfile::SNEAKERS)));
        r.register("MY", "bags", || Box::new(MyFlow::new(CategoryProfile::BAGS)));
        r.register("MY", "clothes", || Box::new(MyFlow::new(CategoryProfile::CLOTHES)));
        r
    }

    /// Later registrations for the same pair replace earlier ones.
    pub fn register(&mut self, region: &str, category: &str, factory: FlowFactory) {
        self.factories.insert(
            (normalize_region(region), normalize_category(category)),
            factory,
        );
    }

    pub fn get(&self, region: &str, category: &str) -> Result<Box<dyn ListingFlow>> {
        let key = (normalize_region(region), normalize_category(category));
        self.factories
            .get(&key)
            .map(|factory| factory())
            .ok_or(ListingError::UnsupportedCombination {
                region: key.0,
                category: key.1,
            })
    }

    pub fn supports(&self, region: &str, category: &str) -> bool {
        self.factories
            .contains_key(&(normalize_region(region), normalize_category(category)))
    }

    pub fn combinations(&self) -> Vec<(String, String)> {
        self.factories.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_nine_combinations() {
        let r = FlowRegistry::with_defaults();
        assert_eq!(r.combinations().len(), 9);
        let flow = r.get("hk", "Clothes").unwrap();
        assert_eq!(flow.region(), "HK");
        assert_eq!(flow.profile().name, "clothes");
        assert_eq!(flow.search_keyword(), "其他");
    }

    #[test]
    fn unknown_pair_is_unsupported() {
        let r = FlowRegistry::with_defaults();
        assert!(matches!(
            r.get("TW", "sneakers"),
            Err(ListingError::UnsupportedCombination { .. })
        ));
        assert!(!r.supports("SG", "watches"));
    }

    #[test]
    fn register_overrides() {
        let mut r = FlowRegistry::new();
        r.register("sg", "bags", || Box::new(MyFlow::new(CategoryProfile::BAGS)));
        assert_eq!(r.get("SG", "bags").unwrap().region(), "MY");
    }
}
