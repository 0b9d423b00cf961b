use super::SelectorTree;
use crate::error::Result;
use crate::io::atomic_write;
use crate::paths::{normalize_category, normalize_region, selector_file};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::SystemTime;
use tracing::{debug, error, info, warn};

type CacheKey = (String, String);

struct CacheEntry {
    tree: Rc<SelectorTree>,
    mtime: Option<SystemTime>,
}

/// Loads and caches selector trees keyed by (region, category).
///
/// The store is passive: it never watches the filesystem. Callers decide
/// when to [`invalidate`](SelectorStore::invalidate), either
/// unconditionally or after checking [`is_stale`](SelectorStore::is_stale).
pub struct SelectorStore {
    dir: PathBuf,
    cache: RefCell<HashMap<CacheKey, CacheEntry>>,
}

impl SelectorStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn file_for(&self, region: &str, category: &str) -> PathBuf {
        selector_file(&self.dir, region, category)
    }

    /// Return the cached tree, reading the backing file on a miss.
    ///
    /// A missing file yields an empty tree and a warning; mandatory steps
    /// then fail with `ConfigMissing`. An unparseable file is logged and
    /// also treated as empty, so the failure surfaces as an unresolvable
    /// selector.
    pub fn load(&self, region: &str, category: &str) -> Rc<SelectorTree> {
        let key = cache_key(region, category);
        if let Some(entry) = self.cache.borrow().get(&key) {
            debug!(region = %key.0, category = %key.1, "selector cache hit");
            return Rc::clone(&entry.tree);
        }

        let path = self.file_for(region, category);
        let tree = match read_tree(&path) {
            Ok(Some(tree)) => {
                info!(path = %path.display(), "loaded selector config");
                tree
            }
            Ok(None) => {
                warn!(path = %path.display(), "selector config file missing");
                SelectorTree::default()
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to parse selector config");
                SelectorTree::default()
            }
        };

        let tree = Rc::new(tree);
        self.cache.borrow_mut().insert(
            key,
            CacheEntry {
                tree: Rc::clone(&tree),
                mtime: modified(&path),
            },
        );
        tree
    }

    /// Read the backing file bypassing the cache. Parse errors propagate so
    /// a read-modify-write never clobbers a file it could not understand.
    pub fn read_for_update(&self, region: &str, category: &str) -> Result<SelectorTree> {
        let path = self.file_for(region, category);
        Ok(read_tree(&path)?.unwrap_or_default())
    }

    pub fn invalidate(&self, region: &str, category: &str) {
        let key = cache_key(region, category);
        if self.cache.borrow_mut().remove(&key).is_some() {
            debug!(region = %key.0, category = %key.1, "selector cache invalidated");
        }
    }

    pub fn is_cached(&self, region: &str, category: &str) -> bool {
        self.cache
            .borrow()
            .contains_key(&cache_key(region, category))
    }

    /// True when the backing file's mtime differs from the one seen at load.
    /// Entries that are not cached are not stale.
    pub fn is_stale(&self, region: &str, category: &str) -> bool {
        let key = cache_key(region, category);
        let cache = self.cache.borrow();
        let Some(entry) = cache.get(&key) else {
            return false;
        };
        entry.mtime != modified(&self.file_for(region, category))
    }

    /// Persist a whole tree atomically and drop the cached copy.
    pub fn write_back(&self, region: &str, category: &str, tree: &SelectorTree) -> Result<()> {
        let path = self.file_for(region, category);
        let data = tree.to_yaml()?;
        atomic_write(&path, data.as_bytes())?;
        info!(path = %path.display(), "selector config written");
        self.invalidate(region, category);
        Ok(())
    }
}

fn cache_key(region: &str, category: &str) -> CacheKey {
    (normalize_region(region), normalize_category(category))
}

fn read_tree(path: &Path) -> Result<Option<SelectorTree>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(path)?;
    SelectorTree::parse(&data).map(Some)
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Variant;
    use tempfile::TempDir;

    fn write(dir: &Path, region: &str, category: &str, body: &str) {
        let path = selector_file(dir, region, category);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    #[test]
    fn missing_file_is_empty_tree() {
        let dir = TempDir::new().unwrap();
        let store = SelectorStore::new(dir.path());
        let tree = store.load("SG", "sneakers");
        assert!(tree.is_empty());
        assert!(store.is_cached("SG", "sneakers"));
    }

    #[test]
    fn load_is_cached_until_invalidated() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "SG", "sneakers", "a:\n  b: '#one'\n");
        let store = SelectorStore::new(dir.path());
        assert_eq!(
            store.load("SG", "sneakers").lookup("a.b").unwrap().primary.as_deref(),
            Some("#one")
        );

        write(dir.path(), "SG", "sneakers", "a:\n  b: '#two'\n");
        assert_eq!(
            store.load("SG", "sneakers").lookup("a.b").unwrap().primary.as_deref(),
            Some("#one")
        );

        store.invalidate("sg", "SNEAKERS");
        assert_eq!(
            store.load("SG", "sneakers").lookup("a.b").unwrap().primary.as_deref(),
            Some("#two")
        );
    }

    #[test]
    fn stale_after_file_appears() {
        let dir = TempDir::new().unwrap();
        let store = SelectorStore::new(dir.path());
        store.load("HK", "clothes");
        assert!(!store.is_stale("HK", "clothes"));
        write(dir.path(), "HK", "clothes", "a:\n  b: '#x'\n");
        assert!(store.is_stale("HK", "clothes"));
        assert!(!store.is_stale("MY", "bags"));
    }

    #[test]
    fn malformed_file_loads_empty_but_blocks_update() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "SG", "bags", "a: [unclosed\n");
        let store = SelectorStore::new(dir.path());
        assert!(store.load("SG", "bags").is_empty());
        assert!(store.read_for_update("SG", "bags").is_err());
    }

    #[test]
    fn write_back_persists_and_invalidates() {
        let dir = TempDir::new().unwrap();
        let store = SelectorStore::new(dir.path());
        store.load("MY", "sneakers");
        let mut tree = store.read_for_update("MY", "sneakers").unwrap();
        tree.set("publishing.publish_button", Variant::Primary, "#go")
            .unwrap();
        store.write_back("MY", "sneakers", &tree).unwrap();
        assert!(!store.is_cached("MY", "sneakers"));
        assert!(store.file_for("MY", "sneakers").exists());
        let reloaded = store.load("MY", "sneakers");
        assert_eq!(
            reloaded
                .lookup("publishing.publish_button")
                .unwrap()
                .primary
                .as_deref(),
            Some("#go")
        );
    }
}
