use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// One row of the source product list, already bound to a region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub row_index: usize,
    pub sku: String,
    pub browser_id: String,
    pub region: String,
    pub category: String,
    pub title: String,
    pub price: String,
    /// Free-form columns: `brand`, `gender`, `condition`, ...
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    pub media_folder: PathBuf,
}

impl Product {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    pub fn brand(&self) -> &str {
        self.attribute("brand").unwrap_or("")
    }

    pub fn gender(&self) -> Gender {
        self.attribute("gender")
            .map(Gender::parse)
            .unwrap_or(Gender::Unisex)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Unisex,
}

impl Gender {
    /// Lenient parse of spreadsheet values, English or Chinese labels; anything
    /// unknown is unisex.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "men" | "mens" | "man" | "m" => Gender::Male,
            "female" | "women" | "womens" | "woman" | "f" => Gender::Female,
            "男" | "男性" | "男装" | "男裝" | "男士" => Gender::Male,
            "女" | "女性" | "女装" | "女裝" | "女士" => Gender::Female,
            _ => Gender::Unisex,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unisex => "unisex",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
