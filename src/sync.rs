//! Event-driven synchronization between stored definitions and generated files.
//!
//! Every trigger becomes a [`SyncEvent`] on a FIFO queue. Events are handled one
//! at a time to completion; a failure is logged and counted, never propagated
//! out of [`SyncEngine::run`].

use crate::cache::{relative_key, Revision, RevisionCache};
use crate::config::Config;
use crate::definition::EnumDefinition;
use crate::error::{Result, SyncError, Violation};
use crate::generator::EnumGenerator;
use crate::merge::{merge, MergeReport};
use crate::numbering;
use crate::parser::EnumParser;
use crate::scanner;
use crate::store::DefinitionStore;
use crate::validator;
use log::{debug, info, warn};
use std::collections::{BTreeSet, VecDeque};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Process every generated file
    StartupScan,
    /// A generated file was created or modified; held until the next build
    FileChanged(PathBuf),
    /// Process the files changed since the previous build
    BuildFinished,
    /// Regenerate one definition's file, or all of them
    Apply(Option<String>),
}

/// Counters for one drain of the event queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub created: usize,
    pub merged: usize,
    pub written: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// This revision was handled before
    AlreadyHandled,
    /// No definition and nothing to create one from
    Empty,
    Created(MergeReport),
    Merged(MergeReport),
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written(PathBuf),
    Unchanged(PathBuf),
}

pub struct SyncEngine {
    config: Config,
    store: DefinitionStore,
    parser: EnumParser,
    generator: EnumGenerator,
    cache: RevisionCache,
    queue: VecDeque<SyncEvent>,
    pending: BTreeSet<PathBuf>,
    force: bool,
}

impl SyncEngine {
    pub fn new(config: Config) -> Self {
        let cache_path = config.cache_path();
        let cache = RevisionCache::load(&cache_path).unwrap_or_else(|e| {
            warn!("Ignoring unreadable cache {}: {}", cache_path.display(), e);
            RevisionCache::new()
        });
        Self {
            store: DefinitionStore::new(config.definitions_dir()),
            parser: EnumParser::new(),
            generator: EnumGenerator::new(config.generate_options()),
            cache,
            queue: VecDeque::new(),
            pending: BTreeSet::new(),
            force: false,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &DefinitionStore {
        &self.store
    }

    /// Ignore the revision cache and rewrite files even when unchanged.
    pub fn set_force(&mut self, force: bool) {
        self.force = force;
    }

    pub fn push(&mut self, event: SyncEvent) {
        self.queue.push_back(event);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drain the queue, then persist the revision cache.
    pub fn run(&mut self) -> SyncStats {
        let mut stats = SyncStats::default();
        while let Some(event) = self.queue.pop_front() {
            debug!("Handling {:?}", event);
            self.handle(event, &mut stats);
        }
        self.save_cache();
        stats
    }

    pub fn save_cache(&self) {
        let path = self.config.cache_path();
        if let Err(e) = self.cache.save(&path) {
            warn!("Failed to save cache {}: {}", path.display(), e);
        }
    }

    fn handle(&mut self, event: SyncEvent, stats: &mut SyncStats) {
        match event {
            SyncEvent::StartupScan => {
                for path in scanner::scan_generated(&self.config.generated_dir()) {
                    self.process_and_count(&path, stats);
                }
            }
            SyncEvent::FileChanged(path) => {
                if scanner::is_enum_source(&path) {
                    self.pending.insert(path);
                }
            }
            SyncEvent::BuildFinished => {
                for path in std::mem::take(&mut self.pending) {
                    if path.is_file() {
                        self.process_and_count(&path, stats);
                    } else {
                        // Deleted files never delete definitions
                        debug!("{} no longer exists", path.display());
                        self.cache.forget(&relative_key(&self.config.root, &path));
                    }
                }
            }
            SyncEvent::Apply(Some(name)) => {
                let result = self.apply(&name);
                count_write(result, stats);
            }
            SyncEvent::Apply(None) => {
                for def in self.store.find_all() {
                    let result = self.write_definition(&def);
                    count_write(result, stats);
                }
            }
        }
    }

    fn process_and_count(&mut self, path: &Path, stats: &mut SyncStats) {
        match self.process_file(path) {
            Ok(FileOutcome::AlreadyHandled) | Ok(FileOutcome::Empty) => stats.skipped += 1,
            Ok(FileOutcome::Created(_)) => stats.created += 1,
            Ok(FileOutcome::Merged(_)) => stats.merged += 1,
            Ok(FileOutcome::Unchanged) => stats.unchanged += 1,
            Err(e) => {
                warn!("{}", e);
                stats.failed += 1;
            }
        }
    }

    /// Merge one generated file into its definition, creating the definition
    /// when the file is standalone. The definition is keyed by the file stem.
    pub fn process_file(&mut self, path: &Path) -> Result<FileOutcome> {
        let key = relative_key(&self.config.root, path);
        let revision = Revision::of(path).map_err(|e| SyncError::io(path, e))?;
        if !self.force && self.cache.is_handled(&key, &revision) {
            if let Some(handled) = self.cache.get(&key) {
                debug!("{} already handled (modified {})", key, handled.modified);
            }
            return Ok(FileOutcome::AlreadyHandled);
        }

        let parsed = self.parser.parse_file(path)?;
        let enum_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        if let Some(declared) = parsed.enum_name.as_deref() {
            if declared != enum_name {
                debug!("{} declares '{}', syncing as '{}'", key, declared, enum_name);
            }
        }

        let policy = self.config.numbering();
        let outcome = match self.store.find_by_name(&enum_name)? {
            Some(existing) => {
                let merged = merge(&existing, &parsed, &policy);
                if merged.changed {
                    self.store.save(&merged.definition)?;
                    info!("Merged {} into '{}': {}", key, enum_name, merged.report.summary());
                    FileOutcome::Merged(merged.report)
                } else {
                    debug!("{} matches '{}'", key, enum_name);
                    FileOutcome::Unchanged
                }
            }
            None if parsed.values.is_empty() => {
                warn!("{} has no members; not creating a definition", key);
                FileOutcome::Empty
            }
            None => {
                if let Some(rule) = validator::check_name(&enum_name) {
                    return Err(validation_error(
                        &enum_name,
                        Violation {
                            name: enum_name.clone(),
                            rule,
                        },
                    ));
                }
                let fresh = EnumDefinition::new(&enum_name, &parsed.namespace, parsed.use_flags);
                let merged = merge(&fresh, &parsed, &policy);
                self.store.save(&merged.definition)?;
                info!("Created definition '{}' from {}", enum_name, key);
                FileOutcome::Created(merged.report)
            }
        };

        self.cache.record(&key, revision);
        Ok(outcome)
    }

    /// Regenerate the file of one stored definition.
    pub fn apply(&mut self, enum_name: &str) -> Result<WriteOutcome> {
        let def = self.load_required(enum_name)?;
        self.write_definition(&def)
    }

    /// Generate `def` into the generated directory. The file is only touched
    /// when its content would change, and the written revision is recorded so
    /// its change notification is not merged back.
    pub fn write_definition(&mut self, def: &EnumDefinition) -> Result<WriteOutcome> {
        let (path, text) = self.render(def)?;
        self.write_rendered(&path, &text)
    }

    /// Target path and text for `def`, after name protection and validation.
    fn render(&self, def: &EnumDefinition) -> Result<(PathBuf, String)> {
        let path = self
            .config
            .generated_dir()
            .join(format!("{}.cs", def.enum_name()));

        if self.config.generation.prevent_value_name_changes && path.is_file() {
            match self.parser.parse_file(&path) {
                Ok(existing) => {
                    let violations = validator::protected_violations(def, &existing.names());
                    if !violations.is_empty() {
                        return Err(SyncError::Validation {
                            enum_name: def.enum_name().to_string(),
                            violations,
                        });
                    }
                }
                Err(e) => debug!("Skipping name protection: {}", e),
            }
        }

        let text = self.generator.generate(def)?;
        Ok((path, text))
    }

    fn write_rendered(&mut self, path: &Path, text: &str) -> Result<WriteOutcome> {
        let key = relative_key(&self.config.root, path);
        let current = std::fs::read_to_string(path).ok();

        let outcome = if !self.force && current.as_deref() == Some(text) {
            debug!("{} is up to date", key);
            WriteOutcome::Unchanged(path.to_path_buf())
        } else {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir).map_err(|e| SyncError::io(dir, e))?;
            }
            std::fs::write(path, text).map_err(|e| SyncError::io(path, e))?;
            info!("Wrote {}", key);
            WriteOutcome::Written(path.to_path_buf())
        };

        let revision = Revision::of(path).map_err(|e| SyncError::io(path, e))?;
        self.cache.record(&key, revision);
        Ok(outcome)
    }

    /// Write a starter enum file and create its definition from it.
    pub fn create_enum(
        &mut self,
        enum_name: &str,
        namespace: Option<&str>,
        use_flags: bool,
        overwrite: bool,
    ) -> Result<PathBuf> {
        if let Some(rule) = validator::check_name(enum_name) {
            return Err(validation_error(
                enum_name,
                Violation {
                    name: enum_name.to_string(),
                    rule,
                },
            ));
        }

        let dir = self.config.generated_dir();
        let path = dir.join(format!("{}.cs", enum_name));
        if path.exists() && !overwrite {
            return Err(SyncError::AlreadyExists(path));
        }

        let namespace = namespace.unwrap_or(self.config.defaults.namespace.as_str()).to_string();
        let use_flags = use_flags || self.config.defaults.use_flags;
        let text = self.generator.template(enum_name, &namespace, use_flags)?;
        std::fs::create_dir_all(&dir).map_err(|e| SyncError::io(&dir, e))?;
        std::fs::write(&path, text).map_err(|e| SyncError::io(&path, e))?;
        info!("Created {}", path.display());

        self.process_file(&path)?;
        Ok(path)
    }

    /// Add a value, optionally sanitizing the name first. Returns the name used.
    pub fn add_value(
        &mut self,
        enum_name: &str,
        value: &str,
        tooltip: &str,
        sanitize: bool,
    ) -> Result<String> {
        let name = if sanitize {
            validator::sanitize_identifier(value)
        } else {
            value.to_string()
        };
        let mut def = self.load_required(enum_name)?;
        def.add_value(&name, tooltip)
            .map_err(|v| validation_error(enum_name, v))?;
        self.commit(&def)?;
        Ok(name)
    }

    /// Soft-delete a value. Returns the number it keeps in the generated file.
    pub fn remove_value(&mut self, enum_name: &str, value: &str) -> Result<i64> {
        let mut def = self.load_required(enum_name)?;
        let policy = self.config.numbering();
        let number = numbering::soft_delete(&mut def, value, &policy)
            .ok_or_else(|| unknown_value(enum_name, value))?;
        self.commit(&def)?;
        Ok(number)
    }

    pub fn restore_value(&mut self, enum_name: &str, value: &str) -> Result<()> {
        let mut def = self.load_required(enum_name)?;
        let policy = self.config.numbering();
        if !numbering::restore(&mut def, value, &policy) {
            return Err(unknown_value(enum_name, value));
        }
        self.commit(&def)?;
        Ok(())
    }

    pub fn rename_value(&mut self, enum_name: &str, old: &str, new: &str) -> Result<()> {
        let mut def = self.load_required(enum_name)?;
        let renamed = def
            .rename_value(old, new)
            .map_err(|v| validation_error(enum_name, v))?;
        if !renamed {
            return Err(unknown_value(enum_name, old));
        }
        self.commit(&def)?;
        Ok(())
    }

    /// Every stored definition with the rules it breaks. Clean ones are left out.
    pub fn check(&self) -> Vec<(String, Vec<Violation>)> {
        let generated_dir = self.config.generated_dir();
        self.store
            .find_all()
            .into_iter()
            .filter_map(|def| {
                let mut violations = validator::validate_definition(&def);
                if self.config.generation.prevent_value_name_changes {
                    let path = generated_dir.join(format!("{}.cs", def.enum_name()));
                    if let Ok(existing) = self.parser.parse_file(&path) {
                        violations.extend(validator::protected_violations(&def, &existing.names()));
                    }
                }
                if violations.is_empty() {
                    None
                } else {
                    Some((def.enum_name().to_string(), violations))
                }
            })
            .collect()
    }

    fn load_required(&self, enum_name: &str) -> Result<EnumDefinition> {
        self.store
            .find_by_name(enum_name)?
            .ok_or_else(|| SyncError::UnknownDefinition(enum_name.to_string()))
    }

    /// Render first so a definition that cannot be generated is never saved,
    /// and save before writing so the file never holds members the stored
    /// definition lacks.
    fn commit(&mut self, def: &EnumDefinition) -> Result<()> {
        let (path, text) = self.render(def)?;
        self.store.save(def)?;
        self.write_rendered(&path, &text)?;
        Ok(())
    }
}

fn count_write(result: Result<WriteOutcome>, stats: &mut SyncStats) {
    match result {
        Ok(WriteOutcome::Written(_)) => stats.written += 1,
        Ok(WriteOutcome::Unchanged(_)) => stats.unchanged += 1,
        Err(e) => {
            warn!("{}", e);
            stats.failed += 1;
        }
    }
}

fn validation_error(enum_name: &str, violation: Violation) -> SyncError {
    SyncError::Validation {
        enum_name: enum_name.to_string(),
        violations: vec![violation],
    }
}

fn unknown_value(enum_name: &str, value: &str) -> SyncError {
    SyncError::UnknownValue {
        enum_name: enum_name.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViolationRule;
    use crate::numbering::assign_numbers;
    use std::fs;
    use tempfile::TempDir;

    fn new_engine(dir: &TempDir) -> SyncEngine {
        let mut config = Config::with_root(dir.path());
        config.generation.use_powers_of_two_for_unflagged = false;
        SyncEngine::new(config)
    }

    fn generated(dir: &TempDir, name: &str) -> PathBuf {
        dir.path().join("GeneratedEnums").join(format!("{}.cs", name))
    }

    fn write_generated(dir: &TempDir, name: &str, text: &str) -> PathBuf {
        let path = generated(dir, name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, text).unwrap();
        path
    }

    fn seed(engine: &SyncEngine, values: &[&str]) -> EnumDefinition {
        let mut def = EnumDefinition::new("Weapon", "Game.Enums", false);
        for v in values {
            def.add_value(v, "").unwrap();
        }
        engine.store().save(&def).unwrap();
        def
    }

    #[test]
    fn test_startup_scan_creates_definitions() {
        let dir = TempDir::new().unwrap();
        write_generated(
            &dir,
            "Element",
            "namespace Game { [System.Flags] public enum Element { Fire = 1, Water = 2 } }",
        );
        let mut engine = new_engine(&dir);
        engine.push(SyncEvent::StartupScan);
        let stats = engine.run();
        assert_eq!(stats.created, 1);

        let def = engine.store().find_by_name("Element").unwrap().unwrap();
        assert_eq!(def.namespace(), "Game");
        assert!(def.use_flags());
        assert_eq!(def.values(), ["Fire", "Water"]);
        assert!(dir.path().join(".enum-sync-cache.json").exists());
    }

    #[test]
    fn test_written_files_are_not_merged_back() {
        let dir = TempDir::new().unwrap();
        let mut engine = new_engine(&dir);
        seed(&engine, &["Sword", "Bow"]);

        engine.push(SyncEvent::Apply(Some("Weapon".to_string())));
        assert_eq!(engine.run().written, 1);

        engine.push(SyncEvent::FileChanged(generated(&dir, "Weapon")));
        engine.push(SyncEvent::BuildFinished);
        let stats = engine.run();
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.merged, 0);

        engine.push(SyncEvent::Apply(None));
        assert_eq!(engine.run().unchanged, 1);
    }

    #[test]
    fn test_event_paths_share_keys_with_the_scan() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::with_root(&dir.path().join("."));
        config.generation.use_powers_of_two_for_unflagged = false;
        let mut engine = SyncEngine::new(config);
        write_generated(&dir, "Good", "enum Good { A = 0 }");

        engine.push(SyncEvent::StartupScan);
        assert_eq!(engine.run().created, 1);

        // The watcher reports the same file under another spelling
        let spelled = dir.path().join("GeneratedEnums/../GeneratedEnums/Good.cs");
        engine.push(SyncEvent::FileChanged(spelled));
        engine.push(SyncEvent::BuildFinished);
        assert_eq!(engine.run().skipped, 1);

        let cache = fs::read_to_string(dir.path().join(".enum-sync-cache.json")).unwrap();
        assert_eq!(cache.matches("Good.cs").count(), 1);
    }

    #[test]
    fn test_failed_save_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let mut engine = new_engine(&dir);
        seed(&engine, &["Sword"]);
        engine.apply("Weapon").unwrap();
        let path = generated(&dir, "Weapon");
        let before = fs::read_to_string(&path).unwrap();

        // The record is still found, but its own path cannot be written
        let store_dir = dir.path().join("EnumDefinitions");
        fs::rename(store_dir.join("Weapon.json"), store_dir.join("weapon-old.json")).unwrap();
        fs::create_dir(store_dir.join("Weapon.json")).unwrap();

        assert!(matches!(
            engine.add_value("Weapon", "Bow", "", false),
            Err(SyncError::Io { .. })
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
        let def = engine.store().find_by_name("Weapon").unwrap().unwrap();
        assert_eq!(def.values(), ["Sword"]);
    }

    #[test]
    fn test_hand_edit_is_merged_after_build() {
        let dir = TempDir::new().unwrap();
        let mut engine = new_engine(&dir);
        seed(&engine, &["Sword", "Bow"]);
        engine.apply("Weapon").unwrap();

        let path = write_generated(
            &dir,
            "Weapon",
            r#"namespace Game.Enums
{
    public enum Weapon
    {
        Sword = 0,
        [System.Obsolete("Removed")]
        Bow = 1,
        Axe = 2,
    }
}
"#,
        );
        engine.push(SyncEvent::FileChanged(path.clone()));
        assert_eq!(engine.run(), SyncStats::default());
        assert_eq!(engine.pending_len(), 1);

        engine.push(SyncEvent::BuildFinished);
        assert_eq!(engine.run().merged, 1);

        let def = engine.store().find_by_name("Weapon").unwrap().unwrap();
        assert_eq!(def.values(), ["Sword", "Axe"]);
        assert_eq!(def.removed_number("Bow"), Some(1));
        assert_eq!(
            assign_numbers(&def, engine.config().numbering().mode_of(&def)),
            Some(vec![0, 2])
        );

        engine.apply("Weapon").unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("        Axe = 2,\n"));
        assert!(text.contains("        [System.Obsolete(\"Removed\")]\n        Bow = 1,\n"));
    }

    #[test]
    fn test_failures_do_not_stop_the_queue() {
        let dir = TempDir::new().unwrap();
        write_generated(&dir, "Broken", "public class Broken {}");
        write_generated(&dir, "Good", "enum Good { A = 0 }");

        let mut engine = new_engine(&dir);
        engine.push(SyncEvent::StartupScan);
        let stats = engine.run();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.created, 1);

        // A fresh engine picks up the persisted revisions
        let mut again = new_engine(&dir);
        again.push(SyncEvent::StartupScan);
        let stats = again.run();
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.failed, 1);
    }

    #[test]
    fn test_force_reprocesses_handled_files() {
        let dir = TempDir::new().unwrap();
        write_generated(&dir, "Good", "enum Good { A = 0 }");
        let mut engine = new_engine(&dir);
        engine.push(SyncEvent::StartupScan);
        engine.run();

        engine.set_force(true);
        engine.push(SyncEvent::StartupScan);
        assert_eq!(engine.run().unchanged, 1);
    }

    #[test]
    fn test_create_enum_template() {
        let dir = TempDir::new().unwrap();
        let mut engine = new_engine(&dir);
        let path = engine.create_enum("Stage", None, false, false).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("namespace Game.Enums"));

        let def = engine.store().find_by_name("Stage").unwrap().unwrap();
        assert_eq!(def.values(), ["None", "Value1", "Value2", "Value3"]);

        assert!(matches!(
            engine.create_enum("Stage", None, false, false),
            Err(SyncError::AlreadyExists(_))
        ));
        assert!(engine.create_enum("class", None, false, false).is_err());
    }

    #[test]
    fn test_mutations_keep_numbers_stable() {
        let dir = TempDir::new().unwrap();
        let mut engine = new_engine(&dir);
        seed(&engine, &["Sword", "Bow", "Axe"]);

        assert_eq!(engine.remove_value("Weapon", "Bow").unwrap(), 1);
        assert_eq!(
            engine.add_value("Weapon", "2 handed", "", true).unwrap(),
            "_2_handed"
        );
        engine.restore_value("Weapon", "Bow").unwrap();

        let text = fs::read_to_string(generated(&dir, "Weapon")).unwrap();
        assert!(text.contains("Sword = 0,"));
        assert!(text.contains("Axe = 2,"));
        assert!(text.contains("_2_handed = 3,"));
        assert!(text.contains("Bow = 1,"));
        assert!(!text.contains("Obsolete"));

        assert!(matches!(
            engine.remove_value("Weapon", "Spear"),
            Err(SyncError::UnknownValue { .. })
        ));
        assert!(matches!(
            engine.add_value("Armor", "Plate", "", false),
            Err(SyncError::UnknownDefinition(_))
        ));
    }

    #[test]
    fn test_protected_names() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::with_root(dir.path());
        config.generation.prevent_value_name_changes = true;
        let mut engine = SyncEngine::new(config);
        seed(&engine, &["Sword", "Bow"]);
        engine.apply("Weapon").unwrap();

        match engine.rename_value("Weapon", "Bow", "Crossbow") {
            Err(SyncError::Validation { violations, .. }) => {
                assert_eq!(violations[0].name, "Bow");
                assert_eq!(violations[0].rule, ViolationRule::Protected);
            }
            other => panic!("expected protected violation, got {:?}", other),
        }
        let def = engine.store().find_by_name("Weapon").unwrap().unwrap();
        assert_eq!(def.values(), ["Sword", "Bow"]);

        // Soft delete keeps the name
        engine.remove_value("Weapon", "Bow").unwrap();
    }

    #[test]
    fn test_check_reports_broken_definitions() {
        let dir = TempDir::new().unwrap();
        let engine = new_engine(&dir);
        seed(&engine, &["Sword"]);
        fs::write(
            dir.path().join("EnumDefinitions").join("Bad.json"),
            r#"{"enum_name": "Bad", "values": ["A", "A", "int"]}"#,
        )
        .unwrap();

        let report = engine.check();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].0, "Bad");
        assert_eq!(report[0].1.len(), 2);
    }
}
