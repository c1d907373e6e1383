use crate::definition::EnumDefinition;
use crate::error::{Result, SyncError};
use crate::scanner;
use log::{debug, warn};
use std::path::{Path, PathBuf};

/// Definitions persisted as `<dir>/<EnumName>.json`.
pub struct DefinitionStore {
    dir: PathBuf,
}

impl DefinitionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, enum_name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", enum_name))
    }

    /// Read one record, healing misaligned lists.
    pub fn load(&self, path: &Path) -> Result<EnumDefinition> {
        let content = std::fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
        let mut def: EnumDefinition =
            serde_json::from_str(&content).map_err(|e| SyncError::Store {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        if def.normalize() {
            debug!("Healed misaligned member lists in {}", path.display());
        }
        Ok(def)
    }

    /// Every readable record. Malformed ones are skipped with a warning.
    pub fn find_all(&self) -> Vec<EnumDefinition> {
        scanner::scan_definitions(&self.dir)
            .iter()
            .filter_map(|path| match self.load(path) {
                Ok(def) => Some(def),
                Err(e) => {
                    warn!("Skipping definition: {}", e);
                    None
                }
            })
            .collect()
    }

    /// Looks at `<name>.json` first, then at every record's `enum_name`.
    pub fn find_by_name(&self, enum_name: &str) -> Result<Option<EnumDefinition>> {
        let path = self.path_for(enum_name);
        if path.is_file() {
            let def = self.load(&path)?;
            if def.enum_name() == enum_name {
                return Ok(Some(def));
            }
        }
        Ok(self
            .find_all()
            .into_iter()
            .find(|def| def.enum_name() == enum_name))
    }

    pub fn save(&self, def: &EnumDefinition) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir).map_err(|e| SyncError::io(&self.dir, e))?;
        let path = self.path_for(def.enum_name());
        let mut json = serde_json::to_string_pretty(def).map_err(|e| SyncError::Store {
            path: path.clone(),
            message: e.to_string(),
        })?;
        json.push('\n');
        std::fs::write(&path, json).map_err(|e| SyncError::io(&path, e))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_find() {
        let dir = TempDir::new().unwrap();
        let store = DefinitionStore::new(dir.path().join("defs"));

        let mut def = EnumDefinition::new("Weapon", "Game.Enums", false);
        def.add_value("Sword", "Sharp").unwrap();
        let path = store.save(&def).unwrap();
        assert_eq!(path, store.path_for("Weapon"));

        assert_eq!(store.find_by_name("Weapon").unwrap(), Some(def.clone()));
        assert_eq!(store.find_by_name("Armor").unwrap(), None);
        assert_eq!(store.find_all(), vec![def]);
    }

    #[test]
    fn test_find_by_enum_name_in_renamed_file() {
        let dir = TempDir::new().unwrap();
        let store = DefinitionStore::new(dir.path());
        std::fs::write(
            dir.path().join("weapons-old.json"),
            r#"{"enum_name": "Weapon", "values": ["Sword"]}"#,
        )
        .unwrap();

        let def = store.find_by_name("Weapon").unwrap().unwrap();
        assert_eq!(def.values(), ["Sword"]);
        assert_eq!(def.tooltips(), [""]);
    }

    #[test]
    fn test_malformed_record() {
        let dir = TempDir::new().unwrap();
        let store = DefinitionStore::new(dir.path());
        let path = dir.path().join("Broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(store.load(&path), Err(SyncError::Store { .. })));
        assert!(store.find_all().is_empty());
        assert!(store.find_by_name("Broken").is_err());
    }
}
