use crate::output::print_json;
use crate::vendor;
use anyhow::Context;
use marketlist_core::config::Settings;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let settings = Settings::load(root).context("failed to load settings")?;
    let client = vendor::client_for(&settings.browser)?;
    let base = settings.browser.base_url();
    let result = client.health();

    if json {
        print_json(&serde_json::json!({
            "vendor": client.vendor(),
            "api": base,
            "ok": result.is_ok(),
            "error": result.as_ref().err().map(|e| format!("{e:#}")),
        }))?;
    } else if result.is_ok() {
        println!("{} API at {base}: ok", client.vendor());
    }

    result.with_context(|| format!("{} API at {base} is not healthy", client.vendor()))
}
