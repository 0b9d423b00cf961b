//! In-crate doubles for the page, session and repair seams.

use crate::error::{ListingError, Result};
use crate::keys;
use crate::page::{Page, PageError, PageResult, WaitState};
use crate::paths::selector_file;
use crate::repair::{RepairRequest, RepairResponse, SelectorRepairPort};
use crate::session::{SessionHandle, SessionProvider, SessionToken};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

pub type EventLog = Rc<RefCell<Vec<String>>>;

// ---------------------------------------------------------------------------
// Selector fixtures
// ---------------------------------------------------------------------------

pub fn write_selectors(dir: &Path, region: &str, category: &str, yaml: &str) {
    let path = selector_file(dir, region, category);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, yaml).unwrap();
}

/// Locator the fixture assigns to a catalog key: `#basic_elements-sell_button`.
pub fn fixture_selector(key: &str) -> String {
    format!("#{}", key.replace('.', "-"))
}

fn is_value_key(key: &str) -> bool {
    key == keys::FINAL_CATEGORY_KEYWORD || key == keys::BRAND_SEARCH_KEYWORD
}

/// Write a selector file covering the whole key catalog.
pub fn write_full_selectors(dir: &Path, region: &str, category: &str) {
    let mut tree = crate::selector::SelectorTree::default();
    for entry in keys::CATALOG {
        let value = match entry.key {
            k if k == keys::FINAL_CATEGORY_KEYWORD => category.to_string(),
            k if k == keys::BRAND_SEARCH_KEYWORD => "other".to_string(),
            k => fixture_selector(k),
        };
        tree.set(entry.key, crate::types::Variant::Primary, &value)
            .unwrap();
    }
    write_selectors(dir, region, category, &tree.to_yaml().unwrap());
}

// ---------------------------------------------------------------------------
// FakePage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Element {
    visible: bool,
    sticky: bool,
}

/// Scriptable page. Missing elements time out on visibility waits, like a
/// real driver polling until its deadline.
#[derive(Default)]
pub struct FakePage {
    elements: HashMap<String, Element>,
    errors: HashMap<String, PageError>,
    fail_navigation: bool,
    url: Option<String>,
    log: EventLog,
    clicks: Vec<String>,
    typed: Vec<(String, String)>,
    uploads: Vec<(String, Vec<PathBuf>)>,
    navigations: Vec<String>,
    pauses: Vec<Duration>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every catalog locator visible, except state markers.
    pub fn with_catalog() -> Self {
        let markers = [
            keys::WHATSAPP_PROMPT,
            keys::MEETUP_ENABLED_MARKER,
            keys::DELIVERY_ENABLED_MARKER,
            keys::MEETUP_PRESELECTED,
        ];
        let mut page = Self::new();
        for entry in keys::CATALOG {
            if is_value_key(entry.key) || markers.contains(&entry.key) {
                continue;
            }
            page = page.with_element(&fixture_selector(entry.key));
        }
        page
    }

    pub fn with_element(mut self, selector: &str) -> Self {
        self.elements.insert(
            selector.to_string(),
            Element {
                visible: true,
                sticky: false,
            },
        );
        self
    }

    pub fn with_hidden(mut self, selector: &str) -> Self {
        self.elements.insert(
            selector.to_string(),
            Element {
                visible: false,
                sticky: false,
            },
        );
        self
    }

    /// Visible and never goes away.
    pub fn with_sticky(mut self, selector: &str) -> Self {
        self.elements.insert(
            selector.to_string(),
            Element {
                visible: true,
                sticky: true,
            },
        );
        self
    }

    pub fn with_error(mut self, selector: &str, error: PageError) -> Self {
        self.errors.insert(selector.to_string(), error);
        self
    }

    pub fn without(mut self, selector: &str) -> Self {
        self.elements.remove(selector);
        self
    }

    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = log;
        self
    }

    pub fn failing_navigation(mut self) -> Self {
        self.fail_navigation = true;
        self
    }

    pub fn clicks(&self) -> Vec<String> {
        self.clicks.clone()
    }

    pub fn typed(&self) -> Vec<(String, String)> {
        self.typed.clone()
    }

    pub fn uploads(&self) -> Vec<(String, Vec<PathBuf>)> {
        self.uploads.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.clone()
    }

    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.clone()
    }

    fn error_for(&self, selector: &str) -> PageResult<()> {
        match self.errors.get(selector) {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn record(&self, event: String) {
        self.log.borrow_mut().push(event);
    }
}

impl Page for FakePage {
    fn navigate(&mut self, url: &str, timeout: Duration) -> PageResult<()> {
        if self.fail_navigation {
            return Err(PageError::Driver(format!("navigation to {url} failed")));
        }
        self.navigations.push(url.to_string());
        self.url = Some(url.to_string());
        self.record(format!("navigate {url}"));
        let _ = timeout;
        Ok(())
    }

    fn wait_for(&mut self, selector: &str, state: WaitState, timeout: Duration) -> PageResult<()> {
        self.error_for(selector)?;
        let element = self.elements.get(selector).copied();
        let ok = match (state, element) {
            (WaitState::Attached, Some(_)) => true,
            (WaitState::Visible, Some(e)) => e.visible,
            (WaitState::Attached | WaitState::Visible, None) => false,
            (WaitState::Hidden | WaitState::Detached, None) => true,
            (WaitState::Hidden, Some(e)) if !e.visible => true,
            (WaitState::Hidden | WaitState::Detached, Some(e)) => {
                if e.sticky {
                    false
                } else {
                    self.elements.remove(selector);
                    true
                }
            }
        };
        if ok {
            Ok(())
        } else {
            Err(PageError::timeout(selector, state, timeout))
        }
    }

    fn click(&mut self, selector: &str) -> PageResult<()> {
        self.error_for(selector)?;
        if !self.elements.contains_key(selector) {
            return Err(PageError::NotFound(selector.to_string()));
        }
        self.clicks.push(selector.to_string());
        self.record(format!("click {selector}"));
        Ok(())
    }

    fn type_text(&mut self, selector: &str, text: &str) -> PageResult<()> {
        self.error_for(selector)?;
        if !self.elements.contains_key(selector) {
            return Err(PageError::NotFound(selector.to_string()));
        }
        self.typed.push((selector.to_string(), text.to_string()));
        self.record(format!("type {selector}={text}"));
        Ok(())
    }

    fn exists(&mut self, selector: &str) -> PageResult<bool> {
        self.error_for(selector)?;
        Ok(self.elements.contains_key(selector))
    }

    fn set_files(&mut self, selector: &str, files: &[PathBuf]) -> PageResult<()> {
        self.error_for(selector)?;
        if !self.elements.contains_key(selector) {
            return Err(PageError::NotFound(selector.to_string()));
        }
        self.uploads.push((selector.to_string(), files.to_vec()));
        self.record(format!("upload {selector} x{}", files.len()));
        Ok(())
    }

    fn pause(&mut self, duration: Duration) {
        self.pauses.push(duration);
    }

    fn current_url(&mut self) -> Option<String> {
        self.url.clone()
    }
}

// ---------------------------------------------------------------------------
// ScriptedRepair
// ---------------------------------------------------------------------------

/// Answers repair prompts from a queue; declines once the queue is empty.
pub struct ScriptedRepair {
    answers: RefCell<VecDeque<RepairResponse>>,
    seen: RefCell<Vec<RepairRequest>>,
}

impl ScriptedRepair {
    pub fn new(answers: Vec<RepairResponse>) -> Self {
        Self {
            answers: RefCell::new(answers.into()),
            seen: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.borrow().len()
    }

    pub fn requests(&self) -> Vec<RepairRequest> {
        self.seen.borrow().clone()
    }
}

impl SelectorRepairPort for ScriptedRepair {
    fn request(&self, request: &RepairRequest) -> RepairResponse {
        self.seen.borrow_mut().push(request.clone());
        self.answers
            .borrow_mut()
            .pop_front()
            .unwrap_or(RepairResponse::Decline)
    }
}

// ---------------------------------------------------------------------------
// FakeSessions
// ---------------------------------------------------------------------------

type PageFactory = Box<dyn Fn(&str) -> FakePage>;

/// Session provider that hands out [`FakePage`]s and logs every call.
pub struct FakeSessions {
    pub log: EventLog,
    factory: PageFactory,
    fail_acquire: HashSet<String>,
    fail_resolve: bool,
    resolve_calls: Cell<usize>,
}

impl FakeSessions {
    pub fn new() -> Self {
        Self {
            log: Rc::new(RefCell::new(Vec::new())),
            factory: Box::new(|_| FakePage::with_catalog()),
            fail_acquire: HashSet::new(),
            fail_resolve: false,
            resolve_calls: Cell::new(0),
        }
    }

    pub fn with_pages(mut self, factory: impl Fn(&str) -> FakePage + 'static) -> Self {
        self.factory = Box::new(factory);
        self
    }

    pub fn failing_acquire(mut self, browser_id: &str) -> Self {
        self.fail_acquire.insert(browser_id.to_string());
        self
    }

    pub fn failing_resolve(mut self) -> Self {
        self.fail_resolve = true;
        self
    }

    pub fn events(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.get()
    }
}

impl SessionProvider for FakeSessions {
    fn resolve_tokens(&mut self, browser_ids: &[String]) -> Result<HashMap<String, SessionToken>> {
        self.resolve_calls.set(self.resolve_calls.get() + 1);
        self.log
            .borrow_mut()
            .push(format!("resolve {}", browser_ids.join(",")));
        if self.fail_resolve {
            return Err(ListingError::SessionInfrastructure(
                "vendor API unreachable".to_string(),
            ));
        }
        Ok(browser_ids
            .iter()
            .map(|id| (id.clone(), SessionToken(format!("profile-{id}"))))
            .collect())
    }

    fn acquire(&mut self, browser_id: &str, token: &SessionToken) -> Result<SessionHandle> {
        self.log.borrow_mut().push(format!("acquire {browser_id}"));
        if self.fail_acquire.contains(browser_id) {
            return Err(ListingError::SessionAcquisitionFailed {
                browser_id: browser_id.to_string(),
                reason: "profile locked".to_string(),
            });
        }
        let page = (self.factory)(browser_id).with_log(Rc::clone(&self.log));
        Ok(SessionHandle::new(browser_id, token.clone(), Box::new(page)))
    }

    fn release(&mut self, handle: SessionHandle) -> Result<()> {
        self.log
            .borrow_mut()
            .push(format!("release {}", handle.browser_id));
        Ok(())
    }
}
