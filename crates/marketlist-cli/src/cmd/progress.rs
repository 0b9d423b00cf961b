use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use marketlist_core::config::Settings;
use marketlist_core::progress::{ClearFilter, ProgressTracker};
use std::path::Path;

#[derive(Subcommand)]
pub enum ProgressSubcommand {
    /// Summarize completed products inside the window
    Show {
        /// Product source id (defaults to every source with records)
        #[arg(long)]
        source: Option<String>,
        /// Region (required with --source)
        #[arg(long, requires = "source")]
        region: Option<String>,
    },

    /// Delete recorded progress
    Clear {
        /// Only records for this product source
        #[arg(long)]
        source: Option<String>,
        /// Only records for this region
        #[arg(long)]
        region: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: ProgressSubcommand, json: bool) -> anyhow::Result<()> {
    let settings = Settings::load(root).context("failed to load settings")?;
    let mut tracker = ProgressTracker::open(
        settings.progress_path(root),
        settings.progress.window_days,
    );

    match subcmd {
        ProgressSubcommand::Show { source, region } => {
            let summaries = match (source, region) {
                (Some(source), Some(region)) => vec![tracker.summarize(&source, &region)],
                (Some(source), None) => tracker
                    .summarize_all()
                    .into_iter()
                    .filter(|s| s.source_id == source)
                    .collect(),
                _ => tracker.summarize_all(),
            };
            if json {
                return print_json(&summaries);
            }
            if summaries.is_empty() {
                println!(
                    "No progress recorded in the last {} days.",
                    tracker.window_days()
                );
                return Ok(());
            }
            let rows = summaries
                .iter()
                .flat_map(|s| {
                    s.per_browser.iter().map(move |(browser, count)| {
                        vec![
                            s.source_id.clone(),
                            s.region.clone(),
                            browser.clone(),
                            count.to_string(),
                        ]
                    })
                })
                .collect();
            print_table(&["SOURCE", "REGION", "BROWSER", "DONE"], rows);
            let total: usize = summaries.iter().map(|s| s.total_skus).sum();
            println!(
                "\n{total} products done in the last {} days",
                tracker.window_days()
            );
        }
        ProgressSubcommand::Clear { source, region } => {
            let removed = tracker
                .clear(&ClearFilter {
                    source_id: source,
                    region,
                })
                .context("failed to clear progress")?;
            if json {
                print_json(&serde_json::json!({ "removed": removed }))?;
            } else {
                println!("Removed {removed} day record(s).");
            }
        }
    }
    Ok(())
}
