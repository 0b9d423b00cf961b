use crate::error::ListingError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Variant
// ---------------------------------------------------------------------------

/// Which field of a selector definition to read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Primary,
    Fallback,
    Description,
}

impl Variant {
    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Primary => "primary",
            Variant::Fallback => "fallback",
            Variant::Description => "description",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Variant {
    type Err = ListingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(Variant::Primary),
            "fallback" => Ok(Variant::Fallback),
            "description" => Ok(Variant::Description),
            _ => Err(ListingError::InvalidVariant(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ActionKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Click,
    Input,
    Check,
    Upload,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Click => "click",
            ActionKind::Input => "input",
            ActionKind::Check => "check",
            ActionKind::Upload => "upload",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// UploadState
// ---------------------------------------------------------------------------

/// Linear states of a single listing upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadState {
    Start,
    Navigate,
    OpenListingForm,
    UploadMedia,
    ChooseInitialCategory,
    FillCoreFields,
    RegionSpecificAdjustments,
    Publish,
    AwaitConfirmation,
    CorrectFinalCategory,
    FillCategorySpecifics,
    HandleLocationOrDeliverySettings,
    Activate,
    Done,
}

impl UploadState {
    pub fn all() -> &'static [UploadState] {
        &[
            UploadState::Start,
            UploadState::Navigate,
            UploadState::OpenListingForm,
            UploadState::UploadMedia,
            UploadState::ChooseInitialCategory,
            UploadState::FillCoreFields,
            UploadState::RegionSpecificAdjustments,
            UploadState::Publish,
            UploadState::AwaitConfirmation,
            UploadState::CorrectFinalCategory,
            UploadState::FillCategorySpecifics,
            UploadState::HandleLocationOrDeliverySettings,
            UploadState::Activate,
            UploadState::Done,
        ]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<UploadState> {
        UploadState::all().get(self.index() + 1).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UploadState::Start => "start",
            UploadState::Navigate => "navigate",
            UploadState::OpenListingForm => "open_listing_form",
            UploadState::UploadMedia => "upload_media",
            UploadState::ChooseInitialCategory => "choose_initial_category",
            UploadState::FillCoreFields => "fill_core_fields",
            UploadState::RegionSpecificAdjustments => "region_specific_adjustments",
            UploadState::Publish => "publish",
            UploadState::AwaitConfirmation => "await_confirmation",
            UploadState::CorrectFinalCategory => "correct_final_category",
            UploadState::FillCategorySpecifics => "fill_category_specifics",
            UploadState::HandleLocationOrDeliverySettings => {
                "handle_location_or_delivery_settings"
            }
            UploadState::Activate => "activate",
            UploadState::Done => "done",
        }
    }
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Terminal
// ---------------------------------------------------------------------------

/// How a product's state machine ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminal {
    Done,
    SoftFailure,
    CriticalFailure,
}

impl Terminal {
    pub fn as_str(self) -> &'static str {
        match self {
            Terminal::Done => "done",
            Terminal::SoftFailure => "soft_failure",
            Terminal::CriticalFailure => "critical_failure",
        }
    }

    /// Done and SoftFailure both published and activated the listing.
    pub fn is_success(self) -> bool {
        matches!(self, Terminal::Done | Terminal::SoftFailure)
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
