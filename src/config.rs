use crate::generator::GenerateOptions;
use crate::numbering::NumberingPolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Directory relative paths resolve against; the config file's parent
    #[serde(skip)]
    pub root: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    #[serde(default = "default_definitions_dir")]
    pub definitions_dir: PathBuf,
    #[serde(default = "default_generated_dir")]
    pub generated_dir: PathBuf,
    #[serde(default = "default_cache_file")]
    pub cache_file: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            definitions_dir: default_definitions_dir(),
            generated_dir: default_generated_dir(),
            cache_file: default_cache_file(),
        }
    }
}

fn default_definitions_dir() -> PathBuf {
    PathBuf::from("EnumDefinitions")
}

fn default_generated_dir() -> PathBuf {
    PathBuf::from("GeneratedEnums")
}

fn default_cache_file() -> PathBuf {
    PathBuf::from(".enum-sync-cache.json")
}

#[derive(Debug, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub use_flags: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            use_flags: false,
        }
    }
}

fn default_namespace() -> String {
    "Game.Enums".to_string()
}

#[derive(Debug, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_true")]
    pub use_powers_of_two_for_unflagged: bool,
    #[serde(default = "default_true")]
    pub include_tooltips: bool,
    #[serde(default = "default_true")]
    pub include_auto_generated_header: bool,
    /// Refuse to drop or rename members still present in the generated file
    #[serde(default)]
    pub prevent_value_name_changes: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            use_powers_of_two_for_unflagged: true,
            include_tooltips: true,
            include_auto_generated_header: true,
            prevent_value_name_changes: false,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(config)
    }

    /// Defaults rooted at `root`, used when no config file exists.
    pub fn with_root(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            ..Self::default()
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn definitions_dir(&self) -> PathBuf {
        self.resolve(&self.project.definitions_dir)
    }

    pub fn generated_dir(&self) -> PathBuf {
        self.resolve(&self.project.generated_dir)
    }

    pub fn cache_path(&self) -> PathBuf {
        self.resolve(&self.project.cache_file)
    }

    pub fn numbering(&self) -> NumberingPolicy {
        NumberingPolicy {
            powers_of_two_for_unflagged: self.generation.use_powers_of_two_for_unflagged,
        }
    }

    pub fn generate_options(&self) -> GenerateOptions {
        GenerateOptions {
            numbering: self.numbering(),
            include_tooltips: self.generation.include_tooltips,
            include_auto_generated_header: self.generation.include_auto_generated_header,
        }
    }
}
