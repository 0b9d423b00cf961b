use anyhow::Context;
use marketlist_core::{
    config::Settings,
    io, keys, paths,
    selector::{SelectorStore, SelectorTree},
    types::Variant,
};
use std::path::Path;

pub fn run(root: &Path, regions: &[String], categories: &[String]) -> anyhow::Result<()> {
    println!("Initializing marketlist in: {}", root.display());

    // 1. Settings file
    let settings_path = paths::settings_path(root);
    let settings = if settings_path.exists() {
        println!("  exists:  {}", paths::SETTINGS_FILE);
        Settings::load(root).context("failed to load marketlist.yaml")?
    } else {
        let settings = Settings::default();
        settings
            .save(root)
            .context("failed to write marketlist.yaml")?;
        println!("  created: {}", paths::SETTINGS_FILE);
        settings
    };

    // 2. One selector skeleton per region/category, never overwriting edits
    let template = skeleton()?;
    let store = SelectorStore::new(settings.selectors_dir(root));
    for region in regions {
        for category in categories {
            let file = store.file_for(region, category);
            let shown = file
                .strip_prefix(root)
                .unwrap_or(&file)
                .display()
                .to_string();
            if io::write_if_missing(&file, template.as_bytes())
                .with_context(|| format!("failed to write {shown}"))?
            {
                println!("  created: {shown}");
            } else {
                println!("  exists:  {shown}");
            }
        }
    }

    println!("\nFill in selectors with `marketlist selector set <key> <selector> --region <R> --category <C>`.");
    Ok(())
}

/// Every known element key with an empty primary and its description.
fn skeleton() -> anyhow::Result<String> {
    let mut tree = SelectorTree::default();
    for info in keys::CATALOG {
        tree.set(info.key, Variant::Primary, "")?;
        tree.set(info.key, Variant::Description, info.description)?;
    }
    Ok(tree.to_yaml()?)
}
