use crate::output::{print_json, print_table};
use crate::products;
use crate::repair_console::ConsoleRepair;
use crate::session::{CdpConnector, VendorSessions};
use crate::{signals, vendor};
use anyhow::Context;
use clap::Args;
use marketlist_core::config::{Settings, WarnLevel};
use marketlist_core::product::Product;
use marketlist_core::progress::ProgressTracker;
use marketlist_core::registry::FlowRegistry;
use marketlist_core::repair::{DeclineRepair, SelectorRepairPort};
use marketlist_core::resilience::{ResilienceController, RetryPolicy};
use marketlist_core::scheduler::{FlowRunner, RunSummary, Scheduler};
use marketlist_core::selector::{SelectorResolver, SelectorStore};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Args)]
pub struct RunArgs {
    /// Product file (YAML or JSON list of rows)
    pub products: PathBuf,

    /// Marketplace region: SG, HK or MY
    #[arg(long)]
    pub region: String,

    /// Category for rows without a `category` column
    #[arg(long, default_value = "sneakers")]
    pub category: String,

    /// Never prompt for selector repairs; failing steps give up
    #[arg(long)]
    pub non_interactive: bool,

    /// List pending products without opening any browser
    #[arg(long)]
    pub dry_run: bool,

    /// Progress key for this product list (default: the file name)
    #[arg(long)]
    pub source_id: Option<String>,
}

pub fn run(root: &Path, args: RunArgs, json: bool) -> anyhow::Result<()> {
    let settings = Settings::load(root).context("failed to load settings")?;
    let errors: Vec<_> = settings
        .validate()
        .into_iter()
        .filter(|w| w.level == WarnLevel::Error)
        .collect();
    for w in &errors {
        eprintln!("[error] {}", w.message);
    }
    if !errors.is_empty() {
        anyhow::bail!("settings have errors; run 'marketlist config validate'");
    }

    let products = products::load(&args.products, &args.region, &args.category)?;
    let source_id = match &args.source_id {
        Some(id) => id.clone(),
        None => source_id_for(&args.products),
    };
    let mut tracker = ProgressTracker::open(
        settings.progress_path(root),
        settings.progress.window_days,
    );

    if args.dry_run {
        return dry_run(&products, &tracker, &source_id, json);
    }

    let resolver = SelectorResolver::new(
        SelectorStore::new(settings.selectors_dir(root)),
        settings.selectors.reload,
    );
    let repair: Box<dyn SelectorRepairPort> = if args.non_interactive {
        Box::new(DeclineRepair)
    } else {
        Box::new(ConsoleRepair::stdio())
    };
    let controller = ResilienceController::new(
        &resolver,
        repair.as_ref(),
        RetryPolicy::from_settings(&settings.actions),
    );
    let registry = FlowRegistry::with_defaults();
    let stop = signals::install()?;
    let runner = FlowRunner::new(&registry, &controller, &settings).with_interrupt(&stop);
    let mut sessions = VendorSessions::new(vendor::client_for(&settings.browser)?, CdpConnector);

    let summary = Scheduler::new(&mut sessions, &mut tracker, &runner, &source_id)
        .with_interrupt(&stop)
        .run(&products)?;

    if json {
        print_json(&summary)?;
    } else {
        print_summary(&summary);
    }
    if summary.aborted {
        anyhow::bail!(
            "run stopped early; {} product(s) not attempted",
            summary.not_attempted
        );
    }
    Ok(())
}

/// Progress records are keyed by the product file name so a re-run of the
/// same file resumes, wherever it was launched from.
fn source_id_for(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn dry_run(
    products: &[Product],
    tracker: &ProgressTracker,
    source_id: &str,
    json: bool,
) -> anyhow::Result<()> {
    let registry = FlowRegistry::with_defaults();
    let pending: Vec<&Product> = products
        .iter()
        .filter(|p| !tracker.is_done(source_id, &p.region, &p.browser_id, &p.sku))
        .collect();
    let skipped = products.len() - pending.len();

    if json {
        return print_json(&serde_json::json!({
            "source_id": source_id,
            "total_input": products.len(),
            "skipped_done": skipped,
            "pending": pending,
        }));
    }

    let rows = pending
        .iter()
        .map(|p| {
            let flow = if registry.supports(&p.region, &p.category) {
                "yes"
            } else {
                warn!(sku = %p.sku, region = %p.region, category = %p.category, "no listing flow");
                "no"
            };
            vec![
                p.row_index.to_string(),
                p.sku.clone(),
                p.browser_id.clone(),
                p.category.clone(),
                p.price.clone(),
                flow.to_string(),
            ]
        })
        .collect();
    print_table(&["ROW", "SKU", "BROWSER", "CATEGORY", "PRICE", "FLOW"], rows);
    println!(
        "\n{} pending, {skipped} already done ({source_id})",
        pending.len()
    );
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let rows = summary
        .results
        .iter()
        .map(|r| {
            vec![
                r.row_index.to_string(),
                r.sku.clone(),
                r.browser_id.clone(),
                r.terminal.to_string(),
                r.reached.map(|s| s.to_string()).unwrap_or_else(|| "-".into()),
                r.error.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["ROW", "SKU", "BROWSER", "RESULT", "REACHED", "ERROR"], rows);

    println!();
    println!("run:            {}", summary.run_id);
    println!("input:          {}", summary.total_input);
    println!("already done:   {}", summary.skipped_done);
    println!("attempted:      {}", summary.attempted);
    println!(
        "succeeded:      {} ({} with soft failures)",
        summary.succeeded, summary.soft_failures
    );
    println!("failed:         {}", summary.failed);
    println!("not attempted:  {}", summary.not_attempted);
    println!("success rate:   {:.1}%", summary.success_rate);

    for (browser, stats) in &summary.per_browser {
        if stats.failed > 0 {
            println!(
                "browser {browser}: {}/{} failed ({})",
                stats.failed,
                stats.total,
                stats.failed_skus.join(", ")
            );
        }
    }
}
