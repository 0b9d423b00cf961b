use crate::vendor::VendorClient;
use marketlist_core::error::{ListingError, Result};
use marketlist_core::page::Page;
use marketlist_core::session::{SessionHandle, SessionProvider, SessionToken};
use std::collections::HashMap;
use tracing::{info, warn};

/// Attaches a page to a freshly opened browser.
pub trait PageConnector {
    fn connect(&self, ws_endpoint: &str) -> anyhow::Result<Box<dyn Page>>;
}

/// Opens and closes vendor browser profiles around each product.
pub struct VendorSessions<C> {
    client: Box<dyn VendorClient>,
    connector: C,
}

impl<C: PageConnector> VendorSessions<C> {
    pub fn new(client: Box<dyn VendorClient>, connector: C) -> Self {
        Self { client, connector }
    }

    fn close_quietly(&self, browser_id: &str, token: &SessionToken) {
        if let Err(e) = self.client.close(&token.0) {
            warn!(%browser_id, profile = %token, error = %format!("{e:#}"), "failed to close browser");
        }
    }
}

impl<C: PageConnector> SessionProvider for VendorSessions<C> {
    fn resolve_tokens(&mut self, browser_ids: &[String]) -> Result<HashMap<String, SessionToken>> {
        let profiles = self
            .client
            .resolve(browser_ids)
            .map_err(|e| ListingError::SessionInfrastructure(format!("{e:#}")))?;
        info!(
            vendor = %self.client.vendor(),
            requested = browser_ids.len(),
            resolved = profiles.len(),
            "browser profiles resolved"
        );
        Ok(profiles
            .into_iter()
            .map(|(id, profile)| (id, SessionToken(profile)))
            .collect())
    }

    fn acquire(&mut self, browser_id: &str, token: &SessionToken) -> Result<SessionHandle> {
        let failed = |e: anyhow::Error| ListingError::SessionAcquisitionFailed {
            browser_id: browser_id.to_string(),
            reason: format!("{e:#}"),
        };
        let ws = self.client.open(&token.0).map_err(failed)?;
        info!(%browser_id, profile = %token, "browser opened");
        match self.connector.connect(&ws) {
            Ok(page) => Ok(SessionHandle::new(browser_id, token.clone(), page)),
            Err(e) => {
                // opened but unusable: close it so nothing leaks
                self.close_quietly(browser_id, token);
                Err(failed(e))
            }
        }
    }

    fn release(&mut self, handle: SessionHandle) -> Result<()> {
        let SessionHandle {
            browser_id,
            token,
            page,
        } = handle;
        drop(page);
        self.client
            .close(&token.0)
            .map_err(|e| ListingError::SessionInfrastructure(format!("{e:#}")))?;
        info!(%browser_id, profile = %token, "browser closed");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Connectors
// ---------------------------------------------------------------------------

#[cfg(feature = "cdp")]
pub struct CdpConnector;

#[cfg(feature = "cdp")]
impl PageConnector for CdpConnector {
    fn connect(&self, ws_endpoint: &str) -> anyhow::Result<Box<dyn Page>> {
        Ok(Box::new(crate::cdp::CdpPage::connect(ws_endpoint)?))
    }
}

/// Used when the binary is built without a browser driver.
#[cfg(not(feature = "cdp"))]
pub struct CdpConnector;

#[cfg(not(feature = "cdp"))]
impl PageConnector for CdpConnector {
    fn connect(&self, _ws_endpoint: &str) -> anyhow::Result<Box<dyn Page>> {
        anyhow::bail!("marketlist was built without the `cdp` feature; cannot drive a browser")
    }
}
