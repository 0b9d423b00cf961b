use crate::error::Result;
use crate::page::Page;
use std::collections::HashMap;
use std::fmt;

/// Opaque, vendor-specific handle needed to open a browser profile
/// (e.g. the profile id a browser sequence number maps to).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(pub String);

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A leased browser. Owned by the scheduler for one product.
pub struct SessionHandle {
    pub browser_id: String,
    pub token: SessionToken,
    pub page: Box<dyn Page>,
}

impl SessionHandle {
    pub fn new(browser_id: &str, token: SessionToken, page: Box<dyn Page>) -> Self {
        Self {
            browser_id: browser_id.to_string(),
            token,
            page,
        }
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("browser_id", &self.browser_id)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

/// External browser sessions, one at a time.
pub trait SessionProvider {
    /// Map browser ids to acquisition tokens. Called once per run with the
    /// distinct ids still needed; failure here aborts the run.
    fn resolve_tokens(&mut self, browser_ids: &[String]) -> Result<HashMap<String, SessionToken>>;

    fn acquire(&mut self, browser_id: &str, token: &SessionToken) -> Result<SessionHandle>;

    /// Close the browser. Consumes the handle so it cannot be reused.
    fn release(&mut self, handle: SessionHandle) -> Result<()>;
}
