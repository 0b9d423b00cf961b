//! Product file data source.
//!
//! A product file is a YAML or JSON list of rows mirroring the source
//! spreadsheet columns:
//!
//! ```yaml
//! - sku: AJ1-001
//!   browser_id: 12
//!   title_en: Air Jordan 1 Retro High
//!   title_cn: 喬丹1代
//!   gender: men
//!   brand: Nike
//!   sg_price: 250
//!   hk_price: 1800
//!   my_price: 900
//!   folder: media/AJ1-001
//! ```
//!
//! Unknown columns are kept as product attributes.

use anyhow::{bail, Context};
use marketlist_core::paths::{normalize_category, normalize_region};
use marketlist_core::product::Product;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const RESERVED: &[&str] = &[
    "sku",
    "browser_id",
    "title_en",
    "title_cn",
    "folder",
    "category",
    "sg_price",
    "hk_price",
    "my_price",
];

/// Read the rows of `path` bound to `region`. Rows without a SKU or
/// browser id are skipped; order is preserved.
pub fn load(path: &Path, region: &str, default_category: &str) -> anyhow::Result<Vec<Product>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read product file {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let products = parse(&data, base, region, default_category)
        .with_context(|| format!("invalid product file {}", path.display()))?;
    info!(count = products.len(), path = %path.display(), "products loaded");
    Ok(products)
}

pub fn parse(
    data: &str,
    base: &Path,
    region: &str,
    default_category: &str,
) -> anyhow::Result<Vec<Product>> {
    let region = normalize_region(region);
    let price_column = price_column(&region)?;

    let rows: Vec<Mapping> = match serde_yaml::from_str::<Value>(data)? {
        Value::Sequence(rows) => rows
            .into_iter()
            .map(|row| match row {
                Value::Mapping(m) => Ok(m),
                other => bail!("expected a mapping per product row, got {other:?}"),
            })
            .collect::<anyhow::Result<_>>()?,
        Value::Null => Vec::new(),
        _ => bail!("product file must contain a list of rows"),
    };

    let mut products = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let row_index = i + 1;
        let sku = cell(row, "sku");
        let browser_id = cell(row, "browser_id");
        let (Some(sku), Some(browser_id)) = (sku, browser_id) else {
            warn!(row = row_index, "row has no sku or browser_id, skipping");
            continue;
        };

        let title_en = cell(row, "title_en");
        let title_cn = cell(row, "title_cn");
        let title = if region == "HK" {
            title_cn.or(title_en)
        } else {
            title_en.or(title_cn)
        }
        .unwrap_or_default();

        let price = cell(row, price_column).unwrap_or_else(|| {
            warn!(row = row_index, %sku, column = price_column, "no price for region, using 0");
            "0".to_string()
        });

        let category = cell(row, "category")
            .map(|c| normalize_category(&c))
            .unwrap_or_else(|| normalize_category(default_category));
        let folder = cell(row, "folder").unwrap_or_default();

        let attributes: BTreeMap<String, String> = row
            .iter()
            .filter_map(|(k, _)| k.as_str())
            .filter(|k| !RESERVED.contains(k))
            .filter_map(|k| cell(row, k).map(|v| (k.to_string(), v)))
            .collect();

        products.push(Product {
            row_index,
            sku,
            browser_id,
            region: region.clone(),
            category,
            title,
            price,
            attributes,
            media_folder: resolve_folder(base, &folder),
        });
    }
    Ok(products)
}

fn price_column(region: &str) -> anyhow::Result<&'static str> {
    match region {
        "SG" => Ok("sg_price"),
        "HK" => Ok("hk_price"),
        "MY" => Ok("my_price"),
        other => bail!("unsupported region '{other}': expected SG, HK or MY"),
    }
}

/// A cell as trimmed text; numbers are rendered the way a spreadsheet
/// would show them (`12`, not `12.0`).
fn cell(row: &Mapping, name: &str) -> Option<String> {
    let text = match row.get(name)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn resolve_folder(base: &Path, folder: &str) -> PathBuf {
    let p = PathBuf::from(folder);
    if p.is_absolute() {
        p
    } else {
        base.join(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROWS: &str = r#"
- sku: AJ1-001
  browser_id: 12
  title_en: Air Jordan 1
  title_cn: 喬丹1代
  gender: men
  brand: Nike
  sg_price: 250
  hk_price: "1800"
  folder: media/AJ1-001
- sku: ""
  browser_id: 3
- sku: BAG-9
  browser_id: "4"
  title_en: Tote
  category: Bags
  folder: /abs/bag
"#;

    #[test]
    fn parses_rows_for_region() {
        let products = parse(ROWS, Path::new("/batch"), "sg", "sneakers").unwrap();
        assert_eq!(products.len(), 2);

        let shoe = &products[0];
        assert_eq!(shoe.row_index, 1);
        assert_eq!(shoe.sku, "AJ1-001");
        assert_eq!(shoe.browser_id, "12");
        assert_eq!(shoe.region, "SG");
        assert_eq!(shoe.category, "sneakers");
        assert_eq!(shoe.title, "Air Jordan 1");
        assert_eq!(shoe.price, "250");
        assert_eq!(shoe.brand(), "Nike");
        assert_eq!(shoe.attribute("gender"), Some("men"));
        assert_eq!(shoe.media_folder, PathBuf::from("/batch/media/AJ1-001"));

        let bag = &products[1];
        assert_eq!(bag.row_index, 3);
        assert_eq!(bag.category, "bags");
        assert_eq!(bag.price, "0");
        assert_eq!(bag.media_folder, PathBuf::from("/abs/bag"));
    }

    #[test]
    fn hk_prefers_chinese_title() {
        let products = parse(ROWS, Path::new("."), "HK", "sneakers").unwrap();
        assert_eq!(products[0].title, "喬丹1代");
        assert_eq!(products[0].price, "1800");
        assert_eq!(products[1].title, "Tote");
    }

    #[test]
    fn json_rows_parse() {
        let json = r#"[{"sku": "X1", "browser_id": 7, "title_en": "Shirt", "my_price": 89.5}]"#;
        let products = parse(json, Path::new("."), "MY", "clothes").unwrap();
        assert_eq!(products[0].price, "89.5");
        assert_eq!(products[0].category, "clothes");
    }

    #[test]
    fn unknown_region_rejected() {
        assert!(parse(ROWS, Path::new("."), "TW", "sneakers").is_err());
    }

    #[test]
    fn non_list_rejected() {
        assert!(parse("sku: X", Path::new("."), "SG", "sneakers").is_err());
    }
}
