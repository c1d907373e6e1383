use super::literal::{decode_string_literal, matching_close, split_top_level};

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAttribute {
    /// Name without `global::`, namespace qualifier or `Attribute` suffix
    pub name: String,
    /// Argument values as written, named arguments without their name
    pub args: Vec<String>,
}

impl ParsedAttribute {
    /// Value of the first string literal argument, unescaped.
    pub fn first_string(&self) -> Option<String> {
        self.args.iter().find_map(|arg| decode_string_literal(arg))
    }
}

/// Split leading `[...]` attribute sections off a member declaration.
/// Returns the attributes and the remaining declaration text.
pub fn take_attributes(item: &str) -> (Vec<ParsedAttribute>, &str) {
    let mut attributes = Vec::new();
    let mut rest = item.trim_start();

    while rest.starts_with('[') {
        let Some(close) = matching_close(rest, 0) else {
            break;
        };
        for attr in split_top_level(&rest[1..close], b',') {
            if let Some(parsed) = parse_attribute(attr) {
                attributes.push(parsed);
            }
        }
        rest = rest[close + 1..].trim_start();
    }

    (attributes, rest)
}

/// Parse one attribute such as `UnityEngine.Tooltip("text")` or `System.Obsolete`.
pub fn parse_attribute(text: &str) -> Option<ParsedAttribute> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let (raw_name, args_text) = match text.find('(') {
        Some(open) => {
            let close = matching_close(text, open)?;
            (&text[..open], Some(&text[open + 1..close]))
        }
        None => (text, None),
    };

    let name = normalize_name(raw_name.trim());
    if name.is_empty() {
        return None;
    }

    let args = args_text
        .map(|a| {
            split_top_level(a, b',')
                .into_iter()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(parse_arg)
                .collect()
        })
        .unwrap_or_default();

    Some(ParsedAttribute { name, args })
}

fn normalize_name(raw: &str) -> String {
    let unqualified = raw.trim_start_matches("global::");
    let last = unqualified.rsplit('.').next().unwrap_or(unqualified).trim();
    match last.strip_suffix("Attribute") {
        Some(base) if !base.is_empty() => base.to_string(),
        _ => last.to_string(),
    }
}

fn parse_arg(arg: &str) -> String {
    // Named arguments (`message: "x"`, `Prop = 1`) keep only their value
    let value = match arg.split_once([':', '=']) {
        Some((name, value))
            if !arg.starts_with(['"', '@'])
                && name.trim().chars().all(|c| c.is_alphanumeric() || c == '_') =>
        {
            value.trim()
        }
        _ => arg,
    };
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_normalized() {
        assert_eq!(parse_attribute("UnityEngine.Tooltip(\"x\")").unwrap().name, "Tooltip");
        assert_eq!(parse_attribute("global::System.ObsoleteAttribute").unwrap().name, "Obsolete");
        assert_eq!(parse_attribute("Flags").unwrap().name, "Flags");
    }

    #[test]
    fn test_args() {
        let attr = parse_attribute(r#"System.Obsolete("Removed", false)"#).unwrap();
        assert_eq!(attr.first_string().as_deref(), Some("Removed"));
        assert_eq!(attr.args, vec![r#""Removed""#, "false"]);

        let attr = parse_attribute(r#"Obsolete(message: "Use B")"#).unwrap();
        assert_eq!(attr.first_string().as_deref(), Some("Use B"));

        let attr = parse_attribute(r#"Tooltip(Names.Hint, @"C:\dir")"#).unwrap();
        assert_eq!(attr.first_string().as_deref(), Some(r"C:\dir"));
    }

    #[test]
    fn test_take_attributes() {
        let (attrs, rest) =
            take_attributes(r#" [UnityEngine.Tooltip("a ] b")] [System.Obsolete] Old = 5"#);
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].first_string().as_deref(), Some("a ] b"));
        assert_eq!(attrs[1].name, "Obsolete");
        assert_eq!(rest, "Old = 5");
    }

    #[test]
    fn test_combined_section() {
        let (attrs, rest) = take_attributes(r#"[Tooltip("t"), Obsolete] Old"#);
        assert_eq!(attrs.len(), 2);
        assert_eq!(rest, "Old");
    }
}
