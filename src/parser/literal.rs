//! Byte-level scanning helpers shared by the enum parser and generator.
//!
//! All delimiters handled here are ASCII, so byte offsets returned by these
//! helpers always fall on UTF-8 character boundaries.

/// True when a string or char literal starts at `i` (`"..."`, `@"..."`, `'x'`).
pub fn is_literal_start(bytes: &[u8], i: usize) -> bool {
    match bytes.get(i) {
        Some(b'"') | Some(b'\'') => true,
        Some(b'@') => bytes.get(i + 1) == Some(&b'"'),
        _ => false,
    }
}

/// Offset just past the literal starting at `start`. Unterminated regular
/// literals end at the line break.
pub fn literal_end(bytes: &[u8], start: usize) -> usize {
    let verbatim = bytes[start] == b'@';
    let quote_pos = if verbatim { start + 1 } else { start };
    let quote = bytes[quote_pos];
    let mut i = quote_pos + 1;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' if !verbatim => i += 2,
            b'\n' if !verbatim => return i,
            b if b == quote => {
                if verbatim && bytes.get(i + 1) == Some(&quote) {
                    i += 2;
                } else {
                    return i + 1;
                }
            }
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Blank out `//` and `/* */` comments, leaving string literals untouched.
/// Comment text becomes spaces and line breaks are kept, so byte offsets
/// into the result are offsets into `text`.
pub fn strip_comments(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut copied_from = 0;
    let mut i = 0;

    while i < bytes.len() {
        if is_literal_start(bytes, i) {
            i = literal_end(bytes, i);
            continue;
        }
        let end = if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'/') {
            text[i..].find('\n').map_or(bytes.len(), |n| i + n)
        } else if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'*') {
            text[i + 2..].find("*/").map_or(bytes.len(), |n| i + 2 + n + 2)
        } else {
            i += 1;
            continue;
        };
        out.push_str(&text[copied_from..i]);
        for c in text[i..end].chars() {
            if c == '\n' {
                out.push('\n');
            } else {
                out.extend(std::iter::repeat(' ').take(c.len_utf8()));
            }
        }
        i = end;
        copied_from = end;
    }

    out.push_str(&text[copied_from..]);
    out
}

/// Offset of the bracket closing the one at `open`.
pub fn matching_close(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let (open_b, close_b) = match bytes.get(open)? {
        b'{' => (b'{', b'}'),
        b'[' => (b'[', b']'),
        b'(' => (b'(', b')'),
        _ => return None,
    };

    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        if is_literal_start(bytes, i) {
            i = literal_end(bytes, i);
            continue;
        }
        if bytes[i] == open_b {
            depth += 1;
        } else if bytes[i] == close_b {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

/// Split on `sep` where it is not nested in brackets or inside a literal.
pub fn split_top_level(text: &str, sep: u8) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if is_literal_start(bytes, i) {
            i = literal_end(bytes, i);
            continue;
        }
        match bytes[i] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b if b == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }

    parts.push(&text[start..]);
    parts
}

/// Escape text for a C# regular string literal (without the quotes).
pub fn escape_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            // C# treats U+2028/U+2029 as line breaks inside a literal
            c if c.is_control() || c == '\u{2028}' || c == '\u{2029}' => {
                out.push_str(&format!("\\u{:04X}", c as u32))
            }
            c => out.push(c),
        }
    }
    out
}

/// Decode a quoted C# string literal, regular or verbatim.
pub fn decode_string_literal(literal: &str) -> Option<String> {
    let literal = literal.trim();
    if let Some(body) = literal
        .strip_prefix("@\"")
        .and_then(|rest| rest.strip_suffix('"'))
    {
        return Some(body.replace("\"\"", "\""));
    }
    let body = literal.strip_prefix('"')?.strip_suffix('"')?;
    Some(unescape_string(body))
}

/// Reverse of [`escape_string`], also accepting the other C# escapes.
pub fn unescape_string(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('0') => out.push('\0'),
            Some('a') => out.push('\u{7}'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('u') => push_code_point(&mut out, &mut chars, 4, 4),
            Some('U') => push_code_point(&mut out, &mut chars, 8, 8),
            Some('x') => push_code_point(&mut out, &mut chars, 1, 4),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn push_code_point(
    out: &mut String,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    min: usize,
    max: usize,
) {
    let mut digits = String::new();
    while digits.len() < max {
        match chars.peek() {
            Some(c) if c.is_ascii_hexdigit() => {
                digits.push(*c);
                chars.next();
            }
            _ => break,
        }
    }
    let decoded = (digits.len() >= min)
        .then(|| u32::from_str_radix(&digits, 16).ok())
        .flatten()
        .and_then(char::from_u32);
    match decoded {
        Some(c) => out.push(c),
        None => out.push_str(&digits),
    }
}
