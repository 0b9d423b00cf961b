use crate::page::{Page, PageError, WaitState};
use crate::types::ActionKind;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ActionRequest
// ---------------------------------------------------------------------------

/// One UI step as the orchestrator describes it. Carries no selector.
#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub kind: ActionKind,
    pub element_key: String,
    pub payload: Option<String>,
    pub files: Vec<PathBuf>,
    pub mandatory: bool,
    pub timeout: Duration,
}

impl ActionRequest {
    fn new(kind: ActionKind, key: &str, mandatory: bool, timeout: Duration) -> Self {
        Self {
            kind,
            element_key: key.to_string(),
            payload: None,
            files: Vec::new(),
            mandatory,
            timeout,
        }
    }

    pub fn click(key: &str, mandatory: bool, timeout: Duration) -> Self {
        Self::new(ActionKind::Click, key, mandatory, timeout)
    }

    pub fn input(key: &str, text: &str, mandatory: bool, timeout: Duration) -> Self {
        Self {
            payload: Some(text.to_string()),
            ..Self::new(ActionKind::Input, key, mandatory, timeout)
        }
    }

    pub fn check(key: &str, mandatory: bool, timeout: Duration) -> Self {
        Self::new(ActionKind::Check, key, mandatory, timeout)
    }

    pub fn upload(key: &str, files: Vec<PathBuf>, mandatory: bool, timeout: Duration) -> Self {
        Self {
            files,
            ..Self::new(ActionKind::Upload, key, mandatory, timeout)
        }
    }
}

// ---------------------------------------------------------------------------
// ActionOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Ok,
    Skipped,
    SoftFailed,
    CriticalFailed,
}

impl OutcomeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeStatus::Ok => "ok",
            OutcomeStatus::Skipped => "skipped",
            OutcomeStatus::SoftFailed => "soft_failed",
            OutcomeStatus::CriticalFailed => "critical_failed",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    pub status: OutcomeStatus,
    pub selector_used: Option<String>,
    pub attempts: u32,
    pub error: Option<String>,
}

impl ActionOutcome {
    pub fn ok(selector: &str, attempts: u32) -> Self {
        Self {
            status: OutcomeStatus::Ok,
            selector_used: Some(selector.to_string()),
            attempts,
            error: None,
        }
    }

    pub fn skipped(attempts: u32, reason: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Skipped,
            selector_used: None,
            attempts,
            error: Some(reason.into()),
        }
    }

    pub fn failed(mandatory: bool, attempts: u32, reason: impl Into<String>) -> Self {
        Self {
            status: if mandatory {
                OutcomeStatus::CriticalFailed
            } else {
                OutcomeStatus::SoftFailed
            },
            selector_used: None,
            attempts,
            error: Some(reason.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == OutcomeStatus::Ok
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Result of a single attempt with a single selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    Done,
    /// The element cleanly does not exist.
    Absent,
    Failed(PageError),
}

/// Perform one action with one selector.
///
/// Waits for the element to become visible (attached for uploads), then
/// acts. A wait timeout is disambiguated with an existence probe so that
/// "never rendered" and "rendered but not actionable" stay separate.
pub fn execute(page: &mut dyn Page, request: &ActionRequest, selector: &str) -> Attempt {
    if request.kind == ActionKind::Check {
        return match page.exists(selector) {
            Ok(true) => Attempt::Done,
            Ok(false) => Attempt::Absent,
            Err(e) => Attempt::Failed(e),
        };
    }

    let state = match request.kind {
        ActionKind::Upload => WaitState::Attached,
        _ => WaitState::Visible,
    };
    match page.wait_for(selector, state, request.timeout) {
        Ok(()) => {}
        Err(PageError::NotFound(_)) => return Attempt::Absent,
        Err(e @ PageError::Timeout { .. }) => {
            return match page.exists(selector) {
                Ok(false) => Attempt::Absent,
                _ => Attempt::Failed(e),
            };
        }
        Err(e) => return Attempt::Failed(e),
    }

    let result = match request.kind {
        ActionKind::Click => page.click(selector),
        ActionKind::Input => page.type_text(selector, request.payload.as_deref().unwrap_or("")),
        ActionKind::Upload => page.set_files(selector, &request.files),
        ActionKind::Check => Ok(()),
    };
    match result {
        Ok(()) => Attempt::Done,
        Err(PageError::NotFound(_)) => Attempt::Absent,
        Err(e) => Attempt::Failed(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePage;

    const T: Duration = Duration::from_millis(50);

    #[test]
    fn click_present_element() {
        let mut page = FakePage::new().with_element("#sell");
        let attempt = execute(&mut page, &ActionRequest::click("k", true, T), "#sell");
        assert_eq!(attempt, Attempt::Done);
        assert_eq!(page.clicks(), vec!["#sell"]);
    }

    #[test]
    fn missing_element_is_absent() {
        let mut page = FakePage::new();
        let attempt = execute(&mut page, &ActionRequest::click("k", true, T), "#gone");
        assert_eq!(attempt, Attempt::Absent);
    }

    #[test]
    fn hidden_element_times_out_as_failure() {
        let mut page = FakePage::new().with_hidden("#covered");
        let attempt = execute(&mut page, &ActionRequest::click("k", true, T), "#covered");
        assert!(matches!(attempt, Attempt::Failed(PageError::Timeout { .. })));
        assert!(page.clicks().is_empty());
    }

    #[test]
    fn input_types_payload() {
        let mut page = FakePage::new().with_element("#title");
        let req = ActionRequest::input("product_info.title_input", "Air Max", true, T);
        assert_eq!(execute(&mut page, &req, "#title"), Attempt::Done);
        assert_eq!(page.typed(), vec![("#title".to_string(), "Air Max".to_string())]);
    }

    #[test]
    fn check_reports_presence() {
        let mut page = FakePage::new().with_hidden("#marker");
        let req = ActionRequest::check("k", false, T);
        assert_eq!(execute(&mut page, &req, "#marker"), Attempt::Done);
        assert_eq!(execute(&mut page, &req, "#other"), Attempt::Absent);
    }

    #[test]
    fn upload_needs_only_attached_input() {
        let mut page = FakePage::new().with_hidden("input[type=file]");
        let req = ActionRequest::upload(
            "basic_elements.image_file_input",
            vec![PathBuf::from("/tmp/a.jpg")],
            true,
            T,
        );
        assert_eq!(execute(&mut page, &req, "input[type=file]"), Attempt::Done);
        assert_eq!(page.uploads().len(), 1);
    }

    #[test]
    fn outcome_constructors() {
        assert_eq!(
            ActionOutcome::failed(true, 3, "x").status,
            OutcomeStatus::CriticalFailed
        );
        assert_eq!(
            ActionOutcome::failed(false, 3, "x").status,
            OutcomeStatus::SoftFailed
        );
        assert!(ActionOutcome::ok("#a", 1).is_ok());
    }
}
