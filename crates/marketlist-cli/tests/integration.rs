#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn marketlist(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("marketlist").unwrap();
    cmd.current_dir(dir.path())
        .env("MARKETLIST_ROOT", dir.path())
        .env_remove("RUST_LOG");
    cmd
}

fn init_workspace(dir: &TempDir) {
    marketlist(dir).arg("init").assert().success();
}

fn write_products(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("batch.yaml");
    std::fs::write(
        &path,
        r#"
- sku: AJ1-001
  browser_id: 7
  title_en: Air Jordan 1 Chicago
  sg_price: 320
  folder: media/aj1
  brand: Nike
  gender: men
- sku: YZ-350
  browser_id: 7
  title_en: Yeezy 350
  sg_price: 280.5
  folder: media/yz
- sku: SB-DUNK
  browser_id: 12
  title_en: SB Dunk Low
  sg_price: 150
  folder: media/sb
"#,
    )
    .unwrap();
    path
}

// ---------------------------------------------------------------------------
// marketlist init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_settings_and_selector_files() {
    let dir = TempDir::new().unwrap();
    marketlist(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("created: marketlist.yaml"));

    assert!(dir.path().join("marketlist.yaml").exists());
    for region in ["SG", "HK", "MY"] {
        for category in ["sneakers", "bags", "clothes"] {
            let file = dir
                .path()
                .join(format!("selectors/{region}/{category}/css_selectors.yaml"));
            assert!(file.exists(), "{} missing", file.display());
        }
    }
    let sg = std::fs::read_to_string(dir.path().join("selectors/SG/sneakers/css_selectors.yaml"))
        .unwrap();
    assert!(sg.contains("sell_button"));
    assert!(sg.contains("Sell button on the home page"));
}

#[test]
fn init_keeps_edited_selector_files() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    let file = dir.path().join("selectors/SG/bags/css_selectors.yaml");
    std::fs::write(&file, "basic_elements:\n  sell_button: '#mine'\n").unwrap();

    marketlist(&dir)
        .args(["init", "--regions", "SG", "--categories", "bags"])
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:"));
    assert_eq!(
        std::fs::read_to_string(&file).unwrap(),
        "basic_elements:\n  sell_button: '#mine'\n"
    );
}

// ---------------------------------------------------------------------------
// marketlist config
// ---------------------------------------------------------------------------

#[test]
fn commands_require_init() {
    let dir = TempDir::new().unwrap();
    marketlist(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("marketlist init"));
}

#[test]
fn default_settings_validate() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    marketlist(&dir).args(["config", "validate"]).assert().success();
}

#[test]
fn invalid_settings_fail_validation() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("marketlist.yaml"),
        "progress:\n  window_days: 0\n",
    )
    .unwrap();
    marketlist(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("window_days"));
}

#[test]
fn config_show_json_has_defaults() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    let output = marketlist(&dir)
        .args(["--json", "config", "show"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["progress"]["window_days"], 2);
    assert_eq!(value["browser"]["vendor"], "bit_browser");
}

// ---------------------------------------------------------------------------
// marketlist selector
// ---------------------------------------------------------------------------

#[test]
fn selector_set_then_get() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    marketlist(&dir)
        .args([
            "selector",
            "set",
            "basic_elements.sell_button",
            "button[data-testid='sell']",
            "--region",
            "sg",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated"));

    marketlist(&dir)
        .args([
            "selector",
            "get",
            "basic_elements.sell_button",
            "--region",
            "SG",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("button[data-testid='sell']"))
        .stdout(predicate::str::contains("Sell button on the home page"));

    // other partitions are untouched
    marketlist(&dir)
        .args([
            "selector",
            "get",
            "basic_elements.sell_button",
            "--region",
            "HK",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("primary:     -"));
}

#[test]
fn selector_fallback_variant() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    marketlist(&dir)
        .args([
            "selector",
            "set",
            "publishing.publish_button",
            "text=List now",
            "--region",
            "MY",
            "--category",
            "bags",
            "--variant",
            "fallback",
        ])
        .assert()
        .success();
    let file =
        std::fs::read_to_string(dir.path().join("selectors/MY/bags/css_selectors.yaml")).unwrap();
    assert!(file.contains("fallback"));
    assert!(file.contains("text=List now"));
}

#[test]
fn malformed_selector_is_rejected() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    marketlist(&dir)
        .args([
            "selector",
            "set",
            "basic_elements.sell_button",
            "div[unclosed",
            "--region",
            "SG",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a usable"));
}

#[test]
fn bad_key_is_rejected() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    marketlist(&dir)
        .args(["selector", "set", "Bad Key", "#x", "--region", "SG"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid selector key"));
}

#[test]
fn selector_keys_lists_catalog() {
    let dir = TempDir::new().unwrap();
    marketlist(&dir)
        .args(["selector", "keys"])
        .assert()
        .success()
        .stdout(predicate::str::contains("publishing.confirmation_dialog"));
}

// ---------------------------------------------------------------------------
// marketlist progress / run --dry-run
// ---------------------------------------------------------------------------

fn record_done(dir: &TempDir, source: &str, browser: &str, sku: &str) {
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    let doc = serde_json::json!({
        "created_at": "2026-01-01T00:00:00",
        "records": {
            format!("{source}_SG_{today}"): {
                "source_id": source,
                "region": "SG",
                "date": today,
                "browser_records": { browser: [sku] }
            }
        }
    });
    std::fs::write(
        dir.path().join("success_records.json"),
        serde_json::to_string_pretty(&doc).unwrap(),
    )
    .unwrap();
}

#[test]
fn dry_run_skips_recorded_products() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    let products = write_products(&dir);
    record_done(&dir, "batch.yaml", "7", "AJ1-001");

    let output = marketlist(&dir)
        .args(["--json", "run", "--region", "SG", "--dry-run"])
        .arg(&products)
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["source_id"], "batch.yaml");
    assert_eq!(value["total_input"], 3);
    assert_eq!(value["skipped_done"], 1);
    let skus: Vec<&str> = value["pending"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["sku"].as_str().unwrap())
        .collect();
    assert_eq!(skus, vec!["YZ-350", "SB-DUNK"]);
    assert_eq!(value["pending"][0]["price"], "280.5");
}

#[test]
fn dry_run_table() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    let products = write_products(&dir);
    marketlist(&dir)
        .args(["run", "--region", "SG", "--dry-run"])
        .arg(&products)
        .assert()
        .success()
        .stdout(predicate::str::contains("3 pending, 0 already done"));
}

#[test]
fn progress_show_and_clear() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    record_done(&dir, "batch.yaml", "7", "AJ1-001");

    marketlist(&dir)
        .args(["progress", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("batch.yaml"))
        .stdout(predicate::str::contains("1 products done"));

    marketlist(&dir)
        .args(["progress", "clear", "--source", "other.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 0"));

    marketlist(&dir)
        .args(["progress", "clear", "--source", "batch.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 1"));

    marketlist(&dir)
        .args(["progress", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No progress recorded"));
}

#[test]
fn run_rejects_unknown_region() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    let products = write_products(&dir);
    marketlist(&dir)
        .args(["run", "--region", "JP", "--dry-run"])
        .arg(&products)
        .assert()
        .failure();
}
