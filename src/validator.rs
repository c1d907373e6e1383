use crate::definition::EnumDefinition;
use crate::error::{Violation, ViolationRule};
use std::collections::HashSet;

const CSHARP_KEYWORDS: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked",
    "class", "const", "continue", "decimal", "default", "delegate", "do", "double", "else",
    "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
    "foreach", "goto", "if", "implicit", "in", "int", "interface", "internal", "is", "lock",
    "long", "namespace", "new", "null", "object", "operator", "out", "override", "params",
    "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed", "short",
    "sizeof", "stackalloc", "static", "string", "struct", "switch", "this", "throw", "true",
    "try", "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort", "using", "virtual",
    "void", "volatile", "while",
];

/// Letter or underscore first, then letters, digits and underscores.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Keywords are matched case-sensitively, as the C# compiler does.
pub fn is_keyword(name: &str) -> bool {
    CSHARP_KEYWORDS.contains(&name)
}

/// Checks one name, returning the first rule it breaks. A keyword is
/// accepted in its verbatim form (`@class`); the `@` is only kept for
/// keywords, so `@Walk` is rejected in favour of `Walk`.
pub fn check_name(name: &str) -> Option<ViolationRule> {
    if let Some(verbatim) = name.strip_prefix('@') {
        return (!is_keyword(verbatim)).then_some(ViolationRule::InvalidIdentifier);
    }
    if name.trim().is_empty() {
        Some(ViolationRule::Empty)
    } else if !is_valid_identifier(name) {
        Some(ViolationRule::InvalidIdentifier)
    } else if is_keyword(name) {
        Some(ViolationRule::Keyword)
    } else {
        None
    }
}

/// Name as stored and generated: `@` is dropped unless it escapes a keyword.
pub fn verbatim_name(name: &str) -> &str {
    match name.strip_prefix('@') {
        Some(rest) if !is_keyword(rest) => rest,
        _ => name,
    }
}

/// Empty namespace means the global namespace and is accepted.
pub fn is_valid_namespace(namespace: &str) -> bool {
    namespace.is_empty()
        || namespace
            .split('.')
            .all(|segment| check_name(segment).is_none())
}

/// Replace invalid characters with underscores, prefix a leading digit.
/// e.g., "2nd place" -> "_2nd_place"
pub fn sanitize_identifier(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let mut sanitized: String = trimmed
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if sanitized.starts_with(|c: char| c.is_ascii_digit()) {
        sanitized.insert(0, '_');
    }
    if is_keyword(&sanitized) {
        sanitized.insert(0, '_');
    }
    sanitized
}

/// Validate everything generation depends on. Duplicates are compared
/// case-sensitively, matching C# member lookup.
pub fn validate_definition(def: &EnumDefinition) -> Vec<Violation> {
    let mut violations = Vec::new();

    if let Some(rule) = check_name(def.enum_name()) {
        violations.push(Violation {
            name: def.enum_name().to_string(),
            rule,
        });
    }
    if !is_valid_namespace(def.namespace()) {
        violations.push(Violation {
            name: def.namespace().to_string(),
            rule: ViolationRule::InvalidIdentifier,
        });
    }

    let mut seen = HashSet::new();
    for name in def.values().iter().chain(def.removed_values()) {
        if let Some(rule) = check_name(name) {
            violations.push(Violation {
                name: name.clone(),
                rule,
            });
            continue;
        }
        if !seen.insert(name.as_str()) {
            let rule = if def.values().contains(name) && def.removed_values().contains(name) {
                ViolationRule::ActiveAndRemoved
            } else {
                ViolationRule::Duplicate
            };
            violations.push(Violation {
                name: name.clone(),
                rule,
            });
        }
    }

    violations
}

/// Names from the previously generated file that the definition no longer
/// carries, neither active nor soft-deleted.
pub fn protected_violations(def: &EnumDefinition, generated_names: &[String]) -> Vec<Violation> {
    generated_names
        .iter()
        .filter(|name| !def.has_value(name) && !def.has_removed_value(name))
        .map(|name| Violation {
            name: name.clone(),
            rule: ViolationRule::Protected,
        })
        .collect()
}
