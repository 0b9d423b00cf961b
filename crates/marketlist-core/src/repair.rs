//! Selector repair port: the escalation path when every configured locator
//! for a step has failed. Production backs it with a console prompt; tests
//! and unattended runs use scripted or declining implementations.

use crate::types::ActionKind;
use serde::Serialize;

/// Context handed to the operator when a step cannot find its element.
#[derive(Debug, Clone, Serialize)]
pub struct RepairRequest {
    pub element_key: String,
    pub description: String,
    pub action: ActionKind,
    pub mandatory: bool,
    pub region: String,
    pub category: String,
    pub browser_id: String,
    pub sku: String,
    pub tried: Vec<String>,
    pub last_error: Option<String>,
    pub page_url: Option<String>,
    /// Set when the previous answer was rejected as malformed.
    pub rejected: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairResponse {
    /// Use this selector, persist it as the new primary and retry once.
    Replace(String),
    /// Skip an optional step.
    Skip,
    /// Give up on this step; the product continues or fails per `mandatory`.
    Decline,
    /// Stop the whole run.
    Abort,
}

pub trait SelectorRepairPort {
    fn request(&self, request: &RepairRequest) -> RepairResponse;
}

/// Never repairs. Used for `--non-interactive` runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclineRepair;

impl SelectorRepairPort for DeclineRepair {
    fn request(&self, _request: &RepairRequest) -> RepairResponse {
        RepairResponse::Decline
    }
}
