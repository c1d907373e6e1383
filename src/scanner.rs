use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Files directly inside `dir` with the given extension, sorted by path.
/// A missing directory yields nothing.
fn scan_flat(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case(extension))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

/// Generated C# enum files.
pub fn scan_generated(dir: &Path) -> Vec<PathBuf> {
    scan_flat(dir, "cs")
}

/// Stored definition records.
pub fn scan_definitions(dir: &Path) -> Vec<PathBuf> {
    scan_flat(dir, "json")
}

/// Build and cache directories never hold hand-written enums.
const SKIPPED_DIRS: &[&str] = &["Library", "Temp", "obj", "bin"];

/// Every `*.cs` file under `root`, at any depth, sorted by path.
pub fn scan_sources(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() || !is_enum_source(path) {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        if relative.components().any(|c| {
            let name = c.as_os_str().to_string_lossy();
            name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref())
        }) {
            continue;
        }

        files.push(path.to_path_buf());
    }

    files.sort();
    files
}

/// Whether a watcher event path is a generated enum file.
pub fn is_enum_source(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("cs"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_generated() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("B.cs"), "enum B {}").unwrap();
        fs::write(dir.path().join("A.cs"), "enum A {}").unwrap();
        fs::write(dir.path().join("A.cs.meta"), "guid").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = scan_generated(dir.path());
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["A.cs", "B.cs"]);
    }

    #[test]
    fn test_subdirectories_are_not_scanned() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        fs::write(sub.join("b.json"), "{}").unwrap();

        assert_eq!(scan_definitions(dir.path()).len(), 1);
    }

    #[test]
    fn test_scan_sources_recurses_and_skips_build_dirs() {
        let dir = TempDir::new().unwrap();
        for sub in ["Scripts/Items", "Library", "Temp", ".git"] {
            fs::create_dir_all(dir.path().join(sub)).unwrap();
        }
        fs::write(dir.path().join("Root.cs"), "").unwrap();
        fs::write(dir.path().join("Scripts/Items/Weapon.cs"), "").unwrap();
        fs::write(dir.path().join("Library/Cached.cs"), "").unwrap();
        fs::write(dir.path().join("Temp/Scratch.cs"), "").unwrap();
        fs::write(dir.path().join(".git/Hook.cs"), "").unwrap();

        let files: Vec<_> = scan_sources(dir.path())
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            files,
            vec![PathBuf::from("Root.cs"), PathBuf::from("Scripts/Items/Weapon.cs")]
        );
    }

    #[test]
    fn test_missing_directory() {
        assert!(scan_generated(Path::new("/nonexistent/dir")).is_empty());
    }

    #[test]
    fn test_is_enum_source() {
        assert!(is_enum_source(Path::new("Gen/Weapon.cs")));
        assert!(!is_enum_source(Path::new("Gen/Weapon.cs.meta")));
        assert!(!is_enum_source(Path::new("Gen")));
    }
}
