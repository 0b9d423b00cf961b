use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use marketlist_core::config::Settings;
use marketlist_core::keys;
use marketlist_core::selector::{validate_selector, SelectorResolver, SelectorStore};
use marketlist_core::types::Variant;
use std::path::Path;

#[derive(Subcommand)]
pub enum SelectorSubcommand {
    /// Show the primary, fallback and description of an element key
    Get {
        /// Dotted element key, e.g. basic_elements.sell_button
        key: String,
        #[arg(long)]
        region: String,
        #[arg(long, default_value = "sneakers")]
        category: String,
    },

    /// Set one variant of an element key
    Set {
        key: String,
        value: String,
        #[arg(long)]
        region: String,
        #[arg(long, default_value = "sneakers")]
        category: String,
        /// primary, fallback or description
        #[arg(long, default_value = "primary")]
        variant: String,
    },

    /// List every element key the listing flows use
    Keys,
}

pub fn run(root: &Path, subcmd: SelectorSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        SelectorSubcommand::Get {
            key,
            region,
            category,
        } => get(root, &key, &region, &category, json),
        SelectorSubcommand::Set {
            key,
            value,
            region,
            category,
            variant,
        } => set(root, &key, &value, &region, &category, &variant, json),
        SelectorSubcommand::Keys => list_keys(json),
    }
}

fn resolver(root: &Path) -> anyhow::Result<SelectorResolver> {
    let settings = Settings::load(root).context("failed to load settings")?;
    Ok(SelectorResolver::new(
        SelectorStore::new(settings.selectors_dir(root)),
        settings.selectors.reload,
    ))
}

fn get(root: &Path, key: &str, region: &str, category: &str, json: bool) -> anyhow::Result<()> {
    let resolver = resolver(root)?;
    let def = resolver
        .definition(key, region, category)?
        .with_context(|| format!("'{key}' is not defined for {region}/{category}"))?;
    if json {
        return print_json(&def);
    }
    let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    println!("primary:     {}", show(&def.primary));
    println!("fallback:    {}", show(&def.fallback));
    println!("description: {}", show(&def.description));
    Ok(())
}

fn set(
    root: &Path,
    key: &str,
    value: &str,
    region: &str,
    category: &str,
    variant: &str,
    json: bool,
) -> anyhow::Result<()> {
    let variant: Variant = variant.parse()?;
    if variant != Variant::Description && !validate_selector(value) {
        anyhow::bail!("'{value}' is not a usable CSS, XPath or text selector");
    }
    let resolver = resolver(root)?;
    let changed = resolver.update_selector(key, variant, value, region, category)?;
    if json {
        print_json(&serde_json::json!({
            "key": key,
            "variant": variant,
            "value": value.trim(),
            "changed": changed,
        }))?;
    } else if changed {
        println!("Updated {key} ({variant}) for {region}/{category}.");
    } else {
        println!("{key} ({variant}) already has that value.");
    }
    Ok(())
}

fn list_keys(json: bool) -> anyhow::Result<()> {
    if json {
        let keys: Vec<_> = keys::CATALOG
            .iter()
            .map(|k| serde_json::json!({ "key": k.key, "description": k.description }))
            .collect();
        return print_json(&keys);
    }
    let rows = keys::CATALOG
        .iter()
        .map(|k| vec![k.key.to_string(), k.description.to_string()])
        .collect();
    print_table(&["KEY", "DESCRIPTION"], rows);
    Ok(())
}
