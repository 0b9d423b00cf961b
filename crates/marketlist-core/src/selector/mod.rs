//! Selector configuration: per-(region, category) YAML trees of element
//! definitions, a caching store, and the resolver the flows talk to.

mod resolver;
mod store;

pub use resolver::SelectorResolver;
pub use store::SelectorStore;

use crate::error::{ListingError, Result};
use crate::paths::validate_key;
use crate::types::Variant;
use serde::Serialize;
use serde_yaml::{Mapping, Value};

// ---------------------------------------------------------------------------
// SelectorDefinition
// ---------------------------------------------------------------------------

/// One element's locators. Empty strings in the file read as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectorDefinition {
    pub primary: Option<String>,
    pub fallback: Option<String>,
    pub description: Option<String>,
}

impl SelectorDefinition {
    pub fn get(&self, variant: Variant) -> Option<&str> {
        match variant {
            Variant::Primary => self.primary.as_deref(),
            Variant::Fallback => self.fallback.as_deref(),
            Variant::Description => self.description.as_deref(),
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            // A bare string leaf is shorthand for `{primary: ...}`.
            Value::String(s) => Some(Self {
                primary: non_empty(Some(s.as_str())),
                ..Self::default()
            }),
            Value::Mapping(m) => {
                let field = |name: &str| non_empty(m.get(name).and_then(Value::as_str));
                let def = Self {
                    primary: field("primary"),
                    fallback: field("fallback"),
                    description: field("description"),
                };
                if def.primary.is_none() && def.fallback.is_none() && def.description.is_none() {
                    None
                } else {
                    Some(def)
                }
            }
            _ => None,
        }
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// SelectorTree
// ---------------------------------------------------------------------------

/// The parsed contents of one `css_selectors.yaml`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectorTree {
    root: Mapping,
}

impl SelectorTree {
    pub fn parse(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        match serde_yaml::from_str::<Value>(yaml)? {
            Value::Mapping(root) => Ok(Self { root }),
            Value::Null => Ok(Self::default()),
            _ => Err(ListingError::Settings(
                "selector file must contain a mapping at the top level".to_string(),
            )),
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.root)?)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Walk a dotted key down to its definition.
    pub fn lookup(&self, key: &str) -> Option<SelectorDefinition> {
        let mut node = &self.root;
        let mut parts = key.split('.').peekable();
        while let Some(part) = parts.next() {
            let child = node.get(part)?;
            if parts.peek().is_none() {
                return SelectorDefinition::from_value(child);
            }
            node = child.as_mapping()?;
        }
        None
    }

    /// Set one variant of `key`, creating intermediate nodes as needed.
    ///
    /// Returns the previous value of that variant.
    pub fn set(&mut self, key: &str, variant: Variant, value: &str) -> Result<Option<String>> {
        validate_key(key)?;
        let parts: Vec<&str> = key.split('.').collect();
        let (leaf, parents) = parts
            .split_last()
            .ok_or_else(|| ListingError::InvalidSelectorKey(key.to_string()))?;

        let mut node = &mut self.root;
        for part in parents {
            let slot = node
                .entry(Value::String(part.to_string()))
                .or_insert_with(|| Value::Mapping(Mapping::new()));
            if !slot.is_mapping() {
                *slot = Value::Mapping(Mapping::new());
            }
            node = match slot {
                Value::Mapping(m) => m,
                _ => unreachable!("slot was just replaced with a mapping"),
            };
        }

        let entry = node
            .entry(Value::String(leaf.to_string()))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        if let Some(s) = entry.as_str().map(str::to_string) {
            let mut m = Mapping::new();
            m.insert(Value::String("primary".into()), Value::String(s));
            *entry = Value::Mapping(m);
        }
        if !entry.is_mapping() {
            *entry = Value::Mapping(Mapping::new());
        }
        let Value::Mapping(def) = entry else {
            unreachable!("entry was just replaced with a mapping");
        };
        let previous = def
            .insert(
                Value::String(variant.as_str().to_string()),
                Value::String(value.to_string()),
            )
            .and_then(|v| v.as_str().map(str::to_string));
        Ok(previous)
    }

    /// All dotted keys that carry a definition, in file order.
    pub fn keys(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_keys(&self.root, "", &mut out);
        out
    }
}

fn collect_keys(node: &Mapping, prefix: &str, out: &mut Vec<String>) {
    for (k, v) in node {
        let Some(k) = k.as_str() else { continue };
        let path = if prefix.is_empty() {
            k.to_string()
        } else {
            format!("{prefix}.{k}")
        };
        if SelectorDefinition::from_value(v).is_some() {
            out.push(path);
        } else if let Value::Mapping(m) = v {
            collect_keys(m, &path, out);
        }
    }
}

// ---------------------------------------------------------------------------
// Shape validation
// ---------------------------------------------------------------------------

/// Accept CSS, XPath (`//`, `(//`, `xpath=`) and text (`text=`) locators.
///
/// Rejects blank input and anything with unbalanced brackets or quotes.
pub fn validate_selector(selector: &str) -> bool {
    let s = selector.trim();
    if s.is_empty() {
        return false;
    }
    if let Some(rest) = s.strip_prefix("text=") {
        return !rest.trim().is_empty();
    }
    if let Some(rest) = s.strip_prefix("xpath=") {
        let rest = rest.trim();
        return (rest.starts_with('/') || rest.starts_with('(')) && balanced(rest);
    }
    if s.starts_with("//") || s.starts_with("(//") {
        return balanced(s);
    }
    let first = s.chars().next().unwrap_or(' ');
    let css_start = first.is_ascii_alphabetic() || matches!(first, '.' | '#' | '[' | '*' | ':');
    css_start && balanced(s)
}

fn balanced(s: &str) -> bool {
    let mut stack = Vec::new();
    let mut quote: Option<char> = None;
    for c in s.chars() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' => stack.push(c),
            ')' => {
                if stack.pop() != Some('(') {
                    return false;
                }
            }
            ']' => {
                if stack.pop() != Some('[') {
                    return false;
                }
            }
            _ => {}
        }
    }
    stack.is_empty() && quote.is_none()
}
