//! Finds enums in hand-written C# sources and appends members to them in
//! place, outside the definition store.

use crate::error::{ParseError, Result, SyncError, Violation, ViolationRule};
use crate::numbering::{next_value, NumberingPolicy};
use crate::parser::literal::{escape_string, strip_comments};
use crate::parser::{EnumBlock, EnumParser, ParsedEnum};
use crate::scanner;
use crate::validator;
use log::{debug, info, warn};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const INDENT: &str = "    ";

/// An enum declared in some source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedEnum {
    pub path: PathBuf,
    pub parsed: ParsedEnum,
}

impl DetectedEnum {
    pub fn name(&self) -> &str {
        self.parsed.enum_name.as_deref().unwrap_or_default()
    }

    /// `Namespace.Name`, or just the name in the global namespace.
    pub fn qualified_name(&self) -> String {
        if self.parsed.namespace.is_empty() {
            self.name().to_string()
        } else {
            format!("{}.{}", self.parsed.namespace, self.name())
        }
    }
}

/// Every enum declared in `path`, in file order.
pub fn find_enums_in_file(parser: &EnumParser, path: &Path) -> Result<Vec<DetectedEnum>> {
    Ok(parser
        .parse_all_file(path)?
        .into_iter()
        .map(|block| DetectedEnum {
            path: path.to_path_buf(),
            parsed: block.parsed,
        })
        .collect())
}

/// Every enum declared in a `*.cs` file under `root`. Files that cannot be
/// read or parsed are skipped with a warning.
pub fn find_enums_in_project(parser: &EnumParser, root: &Path) -> Vec<DetectedEnum> {
    let mut found = Vec::new();
    for path in scanner::scan_sources(root) {
        match find_enums_in_file(parser, &path) {
            Ok(enums) => {
                debug!("{}: {} enum(s)", path.display(), enums.len());
                found.extend(enums);
            }
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }
    found
}

/// Append `value` to the enum `enum_name` declared in `path`, numbered after
/// every member it already declares, obsolete ones included. The file is
/// backed up first and restored if the write fails. Returns the number.
pub fn insert_value(
    parser: &EnumParser,
    path: &Path,
    enum_name: &str,
    value: &str,
    tooltip: &str,
    policy: &NumberingPolicy,
) -> Result<i64> {
    let content = fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
    let parse_error = |source: ParseError| SyncError::Parse {
        path: path.to_path_buf(),
        source,
    };
    let blocks = parser.parse_all(&content).map_err(parse_error)?;
    let block = find_block(&blocks, enum_name).ok_or_else(|| SyncError::EnumNotFound {
        path: path.to_path_buf(),
        enum_name: enum_name.to_string(),
    })?;

    let rule = validator::check_name(value).or_else(|| {
        block
            .parsed
            .get(value)
            .map(|_| ViolationRule::Duplicate)
    });
    if let Some(rule) = rule {
        return Err(SyncError::Validation {
            enum_name: enum_name.to_string(),
            violations: vec![Violation {
                name: value.to_string(),
                rule,
            }],
        });
    }

    let used: Vec<i64> = block.parsed.values.iter().map(|v| v.numeric_value).collect();
    let number = next_value(&used, policy.mode_for(block.parsed.use_flags))
        .ok_or_else(|| SyncError::NumbersExhausted(enum_name.to_string()))?;

    let edited = insert_member(&content, block, value, tooltip, number);

    // Never write text the parser cannot read back with the new member
    let reread = parser.parse_all(&edited).map_err(parse_error)?;
    let inserted = find_block(&reread, enum_name)
        .and_then(|b| b.parsed.get(value))
        .is_some_and(|v| v.numeric_value == number && !v.is_obsolete);
    if !inserted {
        return Err(parse_error(ParseError::new(format!(
            "inserting '{}' into '{}' did not produce a readable member",
            value, enum_name
        ))));
    }

    write_with_backup(path, &edited)?;
    info!("Inserted {}.{} = {} into {}", enum_name, value, number, path.display());
    Ok(number)
}

fn find_block<'a>(blocks: &'a [EnumBlock], enum_name: &str) -> Option<&'a EnumBlock> {
    blocks
        .iter()
        .find(|b| b.parsed.enum_name.as_deref() == Some(enum_name))
}

/// Text of `content` with a member added as the last entry of `block`.
/// A closing brace on its own line gets the member on a new line above it,
/// indented like the last member; a one-line body is extended in place.
fn insert_member(content: &str, block: &EnumBlock, value: &str, tooltip: &str, number: i64) -> String {
    let stripped = strip_comments(content);
    let body_start = block.open + 1;
    let last = stripped[body_start..block.close]
        .trim_end()
        .len()
        .checked_sub(1)
        .map(|n| body_start + n);
    let needs_comma = last.is_some_and(|i| stripped.as_bytes()[i] != b',');

    let close_line = line_start(content, block.close);
    let own_line = content[close_line..block.close].trim().is_empty();

    let (at, insertion) = if own_line {
        let indent = match last {
            Some(i) if line_start(content, i) > block.open => {
                leading_whitespace(content, line_start(content, i)).to_string()
            }
            _ => format!("{}{}", leading_whitespace(content, close_line), INDENT),
        };
        let mut lines = String::new();
        if !tooltip.is_empty() {
            lines.push_str(&format!(
                "{}[UnityEngine.Tooltip(\"{}\")]\n",
                indent,
                escape_string(tooltip)
            ));
        }
        lines.push_str(&format!("{}{} = {},\n", indent, value, number));
        (close_line, lines)
    } else {
        let attribute = if tooltip.is_empty() {
            String::new()
        } else {
            format!("[UnityEngine.Tooltip(\"{}\")] ", escape_string(tooltip))
        };
        let gap = if content[..block.close].ends_with(char::is_whitespace) { "" } else { " " };
        (block.close, format!("{}{}{} = {}, ", gap, attribute, value, number))
    };

    let mut out = String::with_capacity(content.len() + insertion.len() + 1);
    match last {
        Some(i) if needs_comma => {
            out.push_str(&content[..=i]);
            out.push(',');
            out.push_str(&content[i + 1..at]);
        }
        _ => out.push_str(&content[..at]),
    }
    out.push_str(&insertion);
    out.push_str(&content[at..]);
    out
}

fn line_start(text: &str, offset: usize) -> usize {
    text[..offset].rfind('\n').map_or(0, |n| n + 1)
}

fn leading_whitespace(text: &str, start: usize) -> &str {
    let line = &text[start..];
    let end = line
        .find(|c: char| !c.is_whitespace() || c == '\n')
        .unwrap_or(line.len());
    &line[..end]
}

/// `Weapon.cs` -> `Weapon.cs.backup`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".backup");
    PathBuf::from(name)
}

/// Copy the backup of `path` back over it and delete the backup.
pub fn restore_backup(path: &Path) -> Result<()> {
    let backup = backup_path(path);
    fs::copy(&backup, path).map_err(|e| SyncError::io(path, e))?;
    fs::remove_file(&backup).map_err(|e| SyncError::io(&backup, e))
}

/// Replace the content of `path`, keeping a backup until the write succeeds.
pub fn write_with_backup(path: &Path, content: &str) -> Result<()> {
    replace_with_backup(path, |p| fs::write(p, content))
}

fn replace_with_backup(path: &Path, write: impl FnOnce(&Path) -> io::Result<()>) -> Result<()> {
    let backup = backup_path(path);
    fs::copy(path, &backup).map_err(|e| SyncError::io(&backup, e))?;

    if let Err(e) = write(path) {
        if let Err(restore) = restore_backup(path) {
            warn!("Could not restore {} from {}: {}", path.display(), backup.display(), restore);
        }
        return Err(SyncError::io(path, e));
    }

    if let Err(e) = fs::remove_file(&backup) {
        warn!("Could not remove backup {}: {}", backup.display(), e);
    }
    Ok(())
}
