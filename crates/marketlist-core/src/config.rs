use crate::error::{ListingError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// BrowserSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vendor {
    BitBrowser,
    IxBrowser,
}

impl Vendor {
    pub fn as_str(self) -> &'static str {
        match self {
            Vendor::BitBrowser => "bit_browser",
            Vendor::IxBrowser => "ix_browser",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Vendor::BitBrowser => 54345,
            Vendor::IxBrowser => 53200,
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSettings {
    #[serde(default = "default_vendor")]
    pub vendor: Vendor,
    /// Local API port; the vendor default is used when unset.
    #[serde(default)]
    pub api_port: Option<u16>,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_vendor() -> Vendor {
    Vendor::BitBrowser
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            vendor: default_vendor(),
            api_port: None,
            api_key: String::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl BrowserSettings {
    pub fn port(&self) -> u16 {
        self.api_port.unwrap_or_else(|| self.vendor.default_port())
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port())
    }
}

// ---------------------------------------------------------------------------
// ActionSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSettings {
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
    #[serde(default = "default_retry_times")]
    pub retry_times: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default = "default_max_repair_prompts")]
    pub max_repair_prompts: u32,
}

fn default_timeout_ms() -> u64 {
    8000
}

fn default_retry_times() -> u32 {
    1
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_settle_ms() -> u64 {
    1000
}

fn default_max_repair_prompts() -> u32 {
    3
}

impl Default for ActionSettings {
    fn default() -> Self {
        Self {
            default_timeout_ms: default_timeout_ms(),
            retry_times: default_retry_times(),
            retry_delay_ms: default_retry_delay_ms(),
            settle_ms: default_settle_ms(),
            max_repair_prompts: default_max_repair_prompts(),
        }
    }
}

impl ActionSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

// ---------------------------------------------------------------------------
// SelectorSettings
// ---------------------------------------------------------------------------

/// When the selector cache is dropped before a resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadPolicy {
    /// Invalidate before every resolve, so operator edits apply immediately.
    Always,
    /// Invalidate only when the backing file's mtime changed.
    OnChange,
    /// Load once per process (repairs still invalidate their own entry).
    Never,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorSettings {
    #[serde(default = "default_selectors_dir")]
    pub dir: String,
    #[serde(default = "default_reload")]
    pub reload: ReloadPolicy,
}

fn default_selectors_dir() -> String {
    paths::DEFAULT_SELECTORS_DIR.to_string()
}

fn default_reload() -> ReloadPolicy {
    ReloadPolicy::Always
}

impl Default for SelectorSettings {
    fn default() -> Self {
        Self {
            dir: default_selectors_dir(),
            reload: default_reload(),
        }
    }
}

// ---------------------------------------------------------------------------
// ProgressSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSettings {
    #[serde(default = "default_progress_file")]
    pub file: String,
    /// Trailing window, in days, consulted when deciding what is already done.
    #[serde(default = "default_window_days")]
    pub window_days: u32,
}

fn default_progress_file() -> String {
    paths::DEFAULT_PROGRESS_FILE.to_string()
}

fn default_window_days() -> u32 {
    2
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            file: default_progress_file(),
            window_days: default_window_days(),
        }
    }
}

// ---------------------------------------------------------------------------
// ConfirmationSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationSettings {
    #[serde(default = "default_appear_ms")]
    pub appear_timeout_ms: u64,
    #[serde(default = "default_vanish_ms")]
    pub vanish_timeout_ms: u64,
    #[serde(default = "default_fallback_wait_ms")]
    pub fallback_wait_ms: u64,
}

fn default_appear_ms() -> u64 {
    5000
}

fn default_vanish_ms() -> u64 {
    30000
}

fn default_fallback_wait_ms() -> u64 {
    8000
}

impl Default for ConfirmationSettings {
    fn default() -> Self {
        Self {
            appear_timeout_ms: default_appear_ms(),
            vanish_timeout_ms: default_vanish_ms(),
            fallback_wait_ms: default_fallback_wait_ms(),
        }
    }
}

// ---------------------------------------------------------------------------
// ListingSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSettings {
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
    #[serde(default = "default_descriptions")]
    pub descriptions: Vec<String>,
    #[serde(default = "default_male_sizes")]
    pub male_sizes: Vec<String>,
    #[serde(default = "default_female_sizes")]
    pub female_sizes: Vec<String>,
    #[serde(default = "default_meetup_locations")]
    pub meetup_locations: BTreeMap<String, Vec<String>>,
}

fn default_image_extensions() -> Vec<String> {
    ["jpg", "jpeg", "png", "webp"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_descriptions() -> Vec<String> {
    vec![
        "Brand new, 100% authentic. Ships within 2 days.".to_string(),
        "Authentic item in brand new condition. Message for more photos.".to_string(),
        "Brand new with box. Fast delivery, deal via chat.".to_string(),
    ]
}

fn default_male_sizes() -> Vec<String> {
    ["40", "41", "42", "43", "44"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_female_sizes() -> Vec<String> {
    ["36", "37", "38", "39"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_meetup_locations() -> BTreeMap<String, Vec<String>> {
    let mut m = BTreeMap::new();
    m.insert(
        "SG".to_string(),
        vec![
            "Jurong East MRT".to_string(),
            "Tampines MRT".to_string(),
            "Bishan MRT".to_string(),
        ],
    );
    m
}

impl Default for ListingSettings {
    fn default() -> Self {
        Self {
            image_extensions: default_image_extensions(),
            descriptions: default_descriptions(),
            male_sizes: default_male_sizes(),
            female_sizes: default_female_sizes(),
            meetup_locations: default_meetup_locations(),
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub actions: ActionSettings,
    #[serde(default)]
    pub selectors: SelectorSettings,
    #[serde(default)]
    pub progress: ProgressSettings,
    #[serde(default)]
    pub confirmation: ConfirmationSettings,
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,
    #[serde(default = "default_domains")]
    pub domains: BTreeMap<String, String>,
    #[serde(default)]
    pub listing: ListingSettings,
}

fn default_navigation_timeout_ms() -> u64 {
    60000
}

fn default_domains() -> BTreeMap<String, String> {
    let mut m = BTreeMap::new();
    m.insert("SG".to_string(), "https://www.carousell.sg".to_string());
    m.insert("HK".to_string(), "https://www.carousell.com.hk".to_string());
    m.insert("MY".to_string(), "https://www.carousell.com.my".to_string());
    m
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            browser: BrowserSettings::default(),
            actions: ActionSettings::default(),
            selectors: SelectorSettings::default(),
            progress: ProgressSettings::default(),
            confirmation: ConfirmationSettings::default(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            domains: default_domains(),
            listing: ListingSettings::default(),
        }
    }
}

impl Settings {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::settings_path(root);
        if !path.exists() {
            return Err(ListingError::NotInitialized(path.display().to_string()));
        }
        let data = std::fs::read_to_string(&path)?;
        let settings: Settings = serde_yaml::from_str(&data)?;
        Ok(settings)
    }

    /// Like [`Settings::load`], but a missing file yields defaults.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        match Self::load(root) {
            Err(ListingError::NotInitialized(_)) => Ok(Self::default()),
            other => other,
        }
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::settings_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn selectors_dir(&self, root: &Path) -> PathBuf {
        paths::under_root(root, &self.selectors.dir)
    }

    pub fn progress_path(&self, root: &Path) -> PathBuf {
        paths::under_root(root, &self.progress.file)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    /// Base URL for a region, without trailing slash.
    pub fn domain_for(&self, region: &str) -> Option<&str> {
        self.domains
            .get(&paths::normalize_region(region))
            .map(|d| d.trim_end_matches('/'))
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.domains.is_empty() {
            warnings.push(error("domains is empty: no region can be navigated"));
        }
        for (region, url) in &self.domains {
            if region != &paths::normalize_region(region) {
                warnings.push(warning(format!(
                    "domain key '{region}' should be upper case"
                )));
            }
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                warnings.push(error(format!(
                    "domain for '{region}' is not an http(s) URL: '{url}'"
                )));
            }
        }

        if self.progress.window_days == 0 {
            warnings.push(error(
                "progress.window_days is 0: completed products would never be skipped",
            ));
        }

        if self.actions.retry_times > 3 {
            warnings.push(warning(format!(
                "actions.retry_times is {}: more than 3 local retries slows failing runs",
                self.actions.retry_times
            )));
        }
        if self.actions.default_timeout_ms == 0 {
            warnings.push(error("actions.default_timeout_ms must be positive"));
        }
        if self.actions.max_repair_prompts == 0 {
            warnings.push(warning(
                "actions.max_repair_prompts is 0: selector repair is disabled",
            ));
        }

        if self.browser.api_key.trim().is_empty()
            && self.browser.vendor == Vendor::BitBrowser
        {
            warnings.push(warning("browser.api_key is empty"));
        }

        if self.listing.image_extensions.is_empty() {
            warnings.push(error(
                "listing.image_extensions is empty: no media would be uploaded",
            ));
        }
        if self.listing.descriptions.is_empty() {
            warnings.push(warning("listing.descriptions is empty"));
        }
        if !self.listing.meetup_locations.contains_key("SG") {
            warnings.push(warning(
                "listing.meetup_locations has no SG entry to fall back to",
            ));
        }

        if self.confirmation.fallback_wait_ms > self.confirmation.vanish_timeout_ms {
            warnings.push(warning(
                "confirmation.fallback_wait_ms exceeds vanish_timeout_ms",
            ));
        }

        warnings
    }
}

fn warning(message: impl Into<String>) -> ConfigWarning {
    ConfigWarning {
        level: WarnLevel::Warning,
        message: message.into(),
    }
}

fn error(message: impl Into<String>) -> ConfigWarning {
    ConfigWarning {
        level: WarnLevel::Error,
        message: message.into(),
    }
}
