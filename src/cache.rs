use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Last handled revision of every generated file, persisted between runs.
#[derive(Debug, Serialize, Deserialize)]
pub struct RevisionCache {
    pub version: String,
    pub updated_at: DateTime<Utc>,
    pub entries: HashMap<String, Revision>,
}

/// A file's state at the time it was handled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub modified: DateTime<Utc>,
    pub hash: String,
}

impl Revision {
    pub fn of(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let modified = std::fs::metadata(path)?.modified()?;
        Ok(Self {
            modified: DateTime::<Utc>::from(modified),
            hash: compute_hash(&content),
        })
    }

    pub fn from_content(content: &str, modified: DateTime<Utc>) -> Self {
        Self {
            modified,
            hash: compute_hash(content),
        }
    }
}

pub fn compute_hash(content: &str) -> String {
    use md5::{Digest, Md5};
    let mut hasher = Md5::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Cache key for `path`: relative to `root` when possible, always with `/`.
/// Both sides are resolved first, so `./Gen/A.cs` and `/project/Gen/A.cs`
/// share a key.
pub fn relative_key(root: &Path, path: &Path) -> String {
    let root = resolve(root);
    let path = resolve(path);
    let relative = pathdiff::diff_paths(&path, &root).unwrap_or(path);
    relative.to_string_lossy().replace('\\', "/")
}

/// Canonical form of `path`. A deleted file resolves through its parent.
fn resolve(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => parent
            .canonicalize()
            .map(|p| p.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}

impl RevisionCache {
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            updated_at: Utc::now(),
            entries: HashMap::new(),
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        let cache = Self::from_json(&content)?;

        // Invalidate cache if version mismatch
        if cache.version != env!("CARGO_PKG_VERSION") {
            return Ok(Self::new());
        }

        Ok(cache)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = self.to_json()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let cache: RevisionCache = serde_json::from_str(json)?;
        Ok(cache)
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        let json = serde_json::to_string_pretty(self)?;
        Ok(json)
    }

    pub fn get(&self, key: &str) -> Option<&Revision> {
        self.entries.get(key)
    }

    pub fn record(&mut self, key: &str, revision: Revision) {
        self.entries.insert(key.to_string(), revision);
        self.updated_at = Utc::now();
    }

    /// Whether this exact content was already handled. A touched file with
    /// identical content counts as handled.
    pub fn is_handled(&self, key: &str, current: &Revision) -> bool {
        self.entries
            .get(key)
            .map(|e| e.hash == current.hash)
            .unwrap_or(false)
    }

    pub fn forget(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

impl Default for RevisionCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cache_roundtrip() {
        let mut cache = RevisionCache::new();
        cache.record("GeneratedEnums/Weapon.cs", Revision::from_content("enum A {}", Utc::now()));

        let json = cache.to_json().unwrap();
        let loaded = RevisionCache::from_json(&json).unwrap();

        let entry = loaded.get("GeneratedEnums/Weapon.cs").unwrap();
        assert_eq!(entry.hash, compute_hash("enum A {}"));
    }

    #[test]
    fn test_is_handled() {
        let mut cache = RevisionCache::new();
        let revision = Revision::from_content("enum A { X }", Utc::now());
        cache.record("A.cs", revision.clone());

        assert!(cache.is_handled("A.cs", &revision));
        let touched = Revision::from_content("enum A { X }", Utc::now());
        assert!(cache.is_handled("A.cs", &touched));
        let edited = Revision::from_content("enum A { X, Y }", Utc::now());
        assert!(!cache.is_handled("A.cs", &edited));
        assert!(!cache.is_handled("B.cs", &revision));

        cache.forget("A.cs");
        assert!(!cache.is_handled("A.cs", &revision));
    }

    #[test]
    fn test_load_missing_file() {
        let cache = RevisionCache::load(Path::new("/nonexistent/path.json")).unwrap();
        assert!(cache.entries.is_empty());
    }

    #[test]
    fn test_version_mismatch_invalidates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        let mut cache = RevisionCache::new();
        cache.version = "0.0.0-old".to_string();
        cache.record("A.cs", Revision::from_content("x", Utc::now()));
        cache.save(&path).unwrap();

        assert!(RevisionCache::load(&path).unwrap().entries.is_empty());
    }

    #[test]
    fn test_revision_of_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("A.cs");
        std::fs::write(&path, "enum A {}").unwrap();
        let revision = Revision::of(&path).unwrap();
        assert_eq!(revision.hash, compute_hash("enum A {}"));
        assert!(Revision::of(&dir.path().join("missing.cs")).is_err());
    }

    #[test]
    fn test_relative_key() {
        let root = PathBuf::from("/project");
        assert_eq!(
            relative_key(&root, Path::new("/project/GeneratedEnums/A.cs")),
            "GeneratedEnums/A.cs"
        );
    }

    #[test]
    fn test_relative_key_resolves_both_sides() {
        let dir = TempDir::new().unwrap();
        let generated = dir.path().join("GeneratedEnums");
        std::fs::create_dir(&generated).unwrap();
        std::fs::write(generated.join("A.cs"), "enum A {}").unwrap();

        let expected = relative_key(dir.path(), &generated.join("A.cs"));
        assert_eq!(expected, "GeneratedEnums/A.cs");
        assert_eq!(relative_key(&dir.path().join("."), &generated.join("A.cs")), expected);
        assert_eq!(
            relative_key(dir.path(), &dir.path().join("GeneratedEnums/./../GeneratedEnums/A.cs")),
            expected
        );

        // Deleted files keep the key they had
        std::fs::remove_file(generated.join("A.cs")).unwrap();
        assert_eq!(relative_key(&dir.path().join("."), &generated.join("A.cs")), expected);
    }
}
