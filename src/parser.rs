pub mod attribute;
pub mod enum_info;
pub mod literal;

pub use enum_info::{EnumBlock, ParsedEnum, ParsedEnumValue};

use crate::error::{ParseError, Result, SyncError};
use crate::validator;
use log::{debug, warn};
use regex::Regex;
use std::path::Path;

/// Pattern-matching reader for C# enum declarations.
///
/// `parse` reads the first enum declaration in the text, `parse_all` reads
/// every one. This is not a C# front end: member initializers must be
/// integer literals or shifts of integer literals, anything else is skipped.
pub struct EnumParser {
    enum_decl: Regex,
    namespace: Regex,
    flags: Regex,
    member: Regex,
    integer: Regex,
}

impl EnumParser {
    pub fn new() -> Self {
        // Constant patterns; a failure here is a programming error.
        let compile = |pattern: &str| Regex::new(pattern).expect("invalid built-in pattern");
        Self {
            enum_decl: compile(
                r"((?:\[[^\[\]]*\]\s*)*)(?:(?:public|internal|private|protected|new)\s+)*enum\s+@?([\p{L}_][\p{L}\p{N}_]*)\s*(?::\s*[\w.]+\s*)?\{",
            ),
            namespace: compile(r"(?m)^\s*namespace\s+@?([\p{L}_][\p{L}\p{N}_.]*)"),
            flags: compile(r"\bFlags(?:Attribute)?\b"),
            member: compile(r"(?s)^(@?[\p{L}_][\p{L}\p{N}_]*)\s*(?:=\s*(.+?))?\s*$"),
            integer: compile(
                r"^(-)?\s*(?:0[xX]([0-9A-Fa-f_]+)|0[bB]([01_]+)|([0-9][0-9_]*))(?:[uU][lL]?|[lL][uU]?)?$",
            ),
        }
    }

    pub fn parse_file(&self, path: &Path) -> Result<ParsedEnum> {
        let content = std::fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
        self.parse(&content).map_err(|source| SyncError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(&self, text: &str) -> std::result::Result<ParsedEnum, ParseError> {
        let stripped = literal::strip_comments(text);
        self.next_block(&stripped, 0)?
            .map(|block| block.parsed)
            .ok_or_else(|| ParseError::new("no enum declaration found"))
    }

    /// Every enum declared in `text`, in order, with its body offsets.
    pub fn parse_all(&self, text: &str) -> std::result::Result<Vec<EnumBlock>, ParseError> {
        let stripped = literal::strip_comments(text);
        let mut blocks = Vec::new();
        let mut from = 0;
        while let Some(block) = self.next_block(&stripped, from)? {
            from = block.close + 1;
            blocks.push(block);
        }
        Ok(blocks)
    }

    pub fn parse_all_file(&self, path: &Path) -> Result<Vec<EnumBlock>> {
        let content = std::fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
        self.parse_all(&content).map_err(|source| SyncError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// First enum declared at or after byte `from` of comment-free text.
    fn next_block(
        &self,
        stripped: &str,
        from: usize,
    ) -> std::result::Result<Option<EnumBlock>, ParseError> {
        let Some(decl) = self.enum_decl.captures(&stripped[from..]) else {
            return Ok(None);
        };
        let enum_name = decl.get(2).map(|m| m.as_str().to_string());
        let Some(whole) = decl.get(0) else {
            return Ok(None);
        };
        let start = from + whole.start();
        let open = from + whole.end() - 1;
        let close = literal::matching_close(stripped, open).ok_or_else(|| {
            ParseError::new(format!(
                "enum '{}' has no closing brace",
                enum_name.as_deref().unwrap_or_default()
            ))
        })?;

        let namespace = self
            .namespace
            .captures_iter(stripped)
            .take_while(|c| c.get(0).is_some_and(|m| m.start() < start))
            .last()
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim_end_matches('.').to_string())
            .unwrap_or_default();

        let use_flags = decl
            .get(1)
            .is_some_and(|attrs| self.flags.is_match(attrs.as_str()));

        let values = self.parse_members(&stripped[open + 1..close]);

        Ok(Some(EnumBlock {
            parsed: ParsedEnum {
                enum_name,
                namespace,
                use_flags,
                values,
            },
            open,
            close,
        }))
    }

    fn parse_members(&self, body: &str) -> Vec<ParsedEnumValue> {
        let mut values = Vec::new();
        let mut previous: Option<i64> = None;

        for item in literal::split_top_level(body, b',') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }

            let (attributes, declaration) = attribute::take_attributes(item);
            let Some(caps) = self.member.captures(declaration) else {
                debug!("Skipping unrecognized enum member: {}", declaration);
                continue;
            };
            let name = validator::verbatim_name(&caps[1]).to_string();

            // Implicit members get what the compiler assigns: previous + 1, first = 0
            let (numeric_value, explicit_value) = match caps.get(2) {
                Some(expr) => match self.evaluate(expr.as_str()) {
                    Some(n) => (n, true),
                    None => {
                        warn!(
                            "Skipping enum member '{}': initializer '{}' is not an integer constant",
                            name,
                            expr.as_str()
                        );
                        continue;
                    }
                },
                None => (previous.map_or(0, |p| p.saturating_add(1)), false),
            };
            previous = Some(numeric_value);

            let is_obsolete = attributes.iter().any(|a| a.name == "Obsolete");
            let tooltip = attributes
                .iter()
                .filter(|a| a.name == "Tooltip")
                .find_map(|a| a.first_string())
                .unwrap_or_default();

            values.push(ParsedEnumValue {
                name,
                numeric_value,
                is_obsolete,
                tooltip,
                explicit_value,
            });
        }

        values
    }

    /// Integer literal, optionally parenthesized or shifted (`1 << 3`).
    fn evaluate(&self, expr: &str) -> Option<i64> {
        let mut expr = expr.trim();
        while expr.starts_with('(') && literal::matching_close(expr, 0) == Some(expr.len() - 1) {
            expr = expr[1..expr.len() - 1].trim();
        }

        if let Some((lhs, rhs)) = expr.split_once("<<") {
            let base = self.evaluate(lhs)?;
            let shift = u32::try_from(self.evaluate(rhs)?).ok()?;
            return base.checked_shl(shift).filter(|v| v >> shift == base);
        }

        let caps = self.integer.captures(expr)?;
        let (digits, radix) = if let Some(hex) = caps.get(2) {
            (hex.as_str(), 16)
        } else if let Some(bin) = caps.get(3) {
            (bin.as_str(), 2)
        } else {
            (caps.get(4)?.as_str(), 10)
        };
        let magnitude = i64::from_str_radix(&digits.replace('_', ""), radix).ok()?;
        if caps.get(1).is_some() {
            Some(-magnitude)
        } else {
            Some(magnitude)
        }
    }
}

impl Default for EnumParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse C# enum source text.
pub fn parse(text: &str) -> std::result::Result<ParsedEnum, ParseError> {
    EnumParser::new().parse(text)
}
