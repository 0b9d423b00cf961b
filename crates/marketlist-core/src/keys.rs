//! Logical element keys used by the listing flows.
//!
//! Keys name a UI element's role; the concrete locator lives in the
//! per-(region, category) selector file. `marketlist init` scaffolds every
//! key listed in [`CATALOG`] so operators only have to fill in values.

// ---------------------------------------------------------------------------
// basic_elements
// ---------------------------------------------------------------------------

pub const SELL_BUTTON: &str = "basic_elements.sell_button";
pub const UPLOAD_IMAGES_BUTTON: &str = "basic_elements.upload_images_button";
pub const IMAGE_FILE_INPUT: &str = "basic_elements.image_file_input";
pub const NEW_ACCOUNT_POPUP_CLOSE: &str = "basic_elements.new_account_popup_close";
pub const AI_WRITING_CANCEL: &str = "basic_elements.ai_writing_cancel_button";
pub const CONDITION_NEW_USED: &str = "basic_elements.condition_new_used";
pub const LOCATION_SELECTOR: &str = "basic_elements.location_selector";
pub const LOCATION_OPTION: &str = "basic_elements.location_option";

// ---------------------------------------------------------------------------
// category_selection
// ---------------------------------------------------------------------------

pub const SERVICE_CATEGORY_SELECTOR: &str = "category_selection.service_category_selector";
pub const CATEGORY_SEARCH_INPUT: &str = "category_selection.category_search_input";
pub const SERVICE_CATEGORY_OPTION: &str = "category_selection.service_category_option";

// ---------------------------------------------------------------------------
// product_info
// ---------------------------------------------------------------------------

pub const TITLE_INPUT: &str = "product_info.title_input";
pub const PRICE_INPUT: &str = "product_info.price_input";
pub const DESCRIPTION_INPUT: &str = "product_info.description_input";

// ---------------------------------------------------------------------------
// popups_and_settings
// ---------------------------------------------------------------------------

pub const WHATSAPP_PROMPT: &str = "popups_and_settings.whatsapp_prompt";
pub const WHATSAPP_CLOSE: &str = "popups_and_settings.whatsapp_close";
pub const MEETUP_ENABLED_MARKER: &str = "popups_and_settings.meetup_enabled_marker";
pub const MEETUP_TOGGLE: &str = "popups_and_settings.meetup_toggle";
pub const DELIVERY_ENABLED_MARKER: &str = "popups_and_settings.delivery_enabled_marker";
pub const DELIVERY_TOGGLE: &str = "popups_and_settings.delivery_toggle";

// ---------------------------------------------------------------------------
// publishing
// ---------------------------------------------------------------------------

pub const PUBLISH_BUTTON: &str = "publishing.publish_button";
pub const CONFIRMATION_DIALOG: &str = "publishing.confirmation_dialog";

// ---------------------------------------------------------------------------
// editing
// ---------------------------------------------------------------------------

pub const INACTIVE_TAB: &str = "editing.inactive_tab";
pub const INACTIVE_FIRST_ITEM: &str = "editing.inactive_first_item";
pub const EDIT_BUTTON: &str = "editing.edit_button";
pub const ACTIVATE_BUTTON: &str = "editing.activate_button";
pub const CONFIRM_ACTIVATE: &str = "editing.confirm_activate";

// ---------------------------------------------------------------------------
// final_category
// ---------------------------------------------------------------------------

pub const FINAL_CATEGORY_SELECTOR: &str = "final_category.category_selector";
/// Value is a search term, not a locator.
pub const FINAL_CATEGORY_KEYWORD: &str = "final_category.category_search_keyword";
pub const FINAL_CATEGORY_SEARCH_INPUT: &str = "final_category.category_search_input";
pub const FINAL_CATEGORY_MEN_OPTION: &str = "final_category.men_option";
pub const FINAL_CATEGORY_WOMEN_OPTION: &str = "final_category.women_option";
pub const FINAL_CATEGORY_OPTION: &str = "final_category.option";

// ---------------------------------------------------------------------------
// specifics
// ---------------------------------------------------------------------------

pub const CONDITION_SELECTOR: &str = "specifics.condition_selector";
pub const BRAND_SELECTOR: &str = "specifics.brand_selector";
/// Value is a search term, not a locator.
pub const BRAND_SEARCH_KEYWORD: &str = "specifics.brand_search_keyword";
pub const BRAND_SEARCH_INPUT: &str = "specifics.brand_search_input";
pub const BRAND_OPTION: &str = "specifics.brand_option";
pub const BRAND_INPUT: &str = "specifics.brand_input";
pub const SIZE_SELECTOR: &str = "specifics.size_selector";
pub const SIZE_SEARCH_INPUT: &str = "specifics.size_search_input";
pub const SIZE_OPTION: &str = "specifics.size_option";
pub const MULTI_QUANTITY_CHECKBOX: &str = "specifics.multi_quantity_checkbox";

// ---------------------------------------------------------------------------
// meetup
// ---------------------------------------------------------------------------

pub const MEETUP_PRESELECTED: &str = "meetup.preselected_marker";
pub const MEETUP_LOCATION_TOGGLE: &str = "meetup.toggle";
pub const MEETUP_INPUT: &str = "meetup.input";
pub const MEETUP_OPTION: &str = "meetup.option";

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

pub struct KeyInfo {
    pub key: &'static str,
    pub description: &'static str,
}

const fn info(key: &'static str, description: &'static str) -> KeyInfo {
    KeyInfo { key, description }
}

pub const CATALOG: &[KeyInfo] = &[
    info(SELL_BUTTON, "Sell button on the home page"),
    info(UPLOAD_IMAGES_BUTTON, "Button that opens the photo picker"),
    info(IMAGE_FILE_INPUT, "File input receiving listing photos"),
    info(NEW_ACCOUNT_POPUP_CLOSE, "Close button of the first-listing popup"),
    info(AI_WRITING_CANCEL, "Switch from AI writing to manual entry"),
    info(CONDITION_NEW_USED, "Condition choice on the listing form"),
    info(LOCATION_SELECTOR, "Location picker on the listing form"),
    info(LOCATION_OPTION, "First location suggestion"),
    info(SERVICE_CATEGORY_SELECTOR, "Category picker on the listing form"),
    info(CATEGORY_SEARCH_INPUT, "Search box inside the category picker"),
    info(SERVICE_CATEGORY_OPTION, "Placeholder category search result"),
    info(TITLE_INPUT, "Listing title field"),
    info(PRICE_INPUT, "Listing price field"),
    info(DESCRIPTION_INPUT, "Listing description field"),
    info(WHATSAPP_PROMPT, "Marker shown when the WhatsApp number prompt is open"),
    info(WHATSAPP_CLOSE, "Close button of the WhatsApp number prompt"),
    info(MEETUP_ENABLED_MARKER, "Marker shown while meet-up is enabled"),
    info(MEETUP_TOGGLE, "Meet-up toggle on the listing form"),
    info(DELIVERY_ENABLED_MARKER, "Marker shown while delivery is enabled"),
    info(DELIVERY_TOGGLE, "Delivery toggle on the listing form"),
    info(PUBLISH_BUTTON, "Publish / list now button"),
    info(CONFIRMATION_DIALOG, "Transient dialog shown after publishing"),
    info(INACTIVE_TAB, "Inactive listings tab on the manage page"),
    info(INACTIVE_FIRST_ITEM, "First listing under the inactive tab"),
    info(EDIT_BUTTON, "Edit listing button"),
    info(ACTIVATE_BUTTON, "Activate listing button"),
    info(CONFIRM_ACTIVATE, "Confirm button of the activate dialog"),
    info(FINAL_CATEGORY_SELECTOR, "Category picker on the edit page"),
    info(FINAL_CATEGORY_KEYWORD, "Search term for the real category"),
    info(FINAL_CATEGORY_SEARCH_INPUT, "Search box inside the edit-page category picker"),
    info(FINAL_CATEGORY_MEN_OPTION, "Men's subcategory result"),
    info(FINAL_CATEGORY_WOMEN_OPTION, "Women's subcategory result"),
    info(FINAL_CATEGORY_OPTION, "Subcategory result for ungendered categories"),
    info(CONDITION_SELECTOR, "Condition choice on the edit page"),
    info(BRAND_SELECTOR, "Brand picker"),
    info(BRAND_SEARCH_KEYWORD, "Search term for the brand picker"),
    info(BRAND_SEARCH_INPUT, "Search box inside the brand picker"),
    info(BRAND_OPTION, "Brand search result"),
    info(BRAND_INPUT, "Free-text brand field"),
    info(SIZE_SELECTOR, "Size picker"),
    info(SIZE_SEARCH_INPUT, "Search box inside the size picker"),
    info(SIZE_OPTION, "Size search result"),
    info(MULTI_QUANTITY_CHECKBOX, "Sell multiple quantities checkbox"),
    info(MEETUP_PRESELECTED, "Marker present when a meet-up location is already chosen"),
    info(MEETUP_LOCATION_TOGGLE, "Meet-up toggle on the edit page"),
    info(MEETUP_INPUT, "Meet-up location search field"),
    info(MEETUP_OPTION, "Meet-up location suggestion"),
];

pub fn describe(key: &str) -> Option<&'static str> {
    CATALOG.iter().find(|k| k.key == key).map(|k| k.description)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::validate_key;
    use std::collections::HashSet;

    #[test]
    fn catalog_keys_are_valid_and_unique() {
        let mut seen = HashSet::new();
        for entry in CATALOG {
            validate_key(entry.key).unwrap();
            assert!(seen.insert(entry.key), "duplicate key {}", entry.key);
            assert!(!entry.description.is_empty());
        }
    }

    #[test]
    fn describe_known_key() {
        assert_eq!(describe(PUBLISH_BUTTON), Some("Publish / list now button"));
        assert_eq!(describe("nope.nothing"), None);
    }
}
