//! C-style escaping for string values and `;`-separated string lists.

/// Escapes `\r`, `\n` and backslashes so the value fits on one line.
#[must_use]
pub fn escape_string_cstyle(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            '\\' => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    out
}

/// Reverses [`escape_string_cstyle`].
///
/// `\n` and `\r` map to control characters; any other escaped character maps
/// to itself. Returns `None` for a dangling trailing backslash.
#[must_use]
pub fn unescape_string_cstyle(input: &str) -> Option<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next()? {
                'n' => out.push('\n'),
                'r' => out.push('\r'),
                other => out.push(other),
            }
        } else {
            out.push(c);
        }
    }
    Some(out)
}

fn needs_quotes(value: &str) -> bool {
    value
        .chars()
        .any(|c| matches!(c, ' ' | ';' | '\t' | '\\' | '"' | '\r' | '\n'))
}

/// Joins strings with `;`, quoting and escaping entries that need it.
///
/// A lone empty string is written as `""` so it survives a round trip.
#[must_use]
pub fn escape_strings_cstyle<S: AsRef<str>>(values: &[S]) -> String {
    let mut out = String::new();
    for (index, value) in values.iter().enumerate() {
        let value = value.as_ref();
        if index > 0 {
            out.push(';');
        }
        let quote = (values.len() == 1 && value.is_empty()) || needs_quotes(value);
        if !quote {
            out.push_str(value);
            continue;
        }
        out.push('"');
        for c in value.chars() {
            match c {
                '\\' | '"' => {
                    out.push('\\');
                    out.push(c);
                },
                '\r' => out.push_str("\\r"),
                '\n' => out.push_str("\\n"),
                other => out.push(other),
            }
        }
        out.push('"');
    }
    out
}

/// Splits a `;`-separated list produced by [`escape_strings_cstyle`].
///
/// Returns `None` on an unterminated quote, a dangling escape or garbage
/// between a closing quote and the next separator.
#[must_use]
pub fn unescape_strings_cstyle(input: &str) -> Option<Vec<String>> {
    let chars: Vec<char> = input.chars().collect();
    let mut out = Vec::new();
    if chars.is_empty() {
        return Some(out);
    }
    let mut index = 0;
    loop {
        while matches!(chars[index], ' ' | '\t') {
            index += 1;
            if index == chars.len() {
                return Some(out);
            }
        }

        let mut word = String::new();
        if chars[index] == '"' {
            index += 1;
            loop {
                let c = *chars.get(index)?;
                if c == '"' {
                    break;
                }
                if c == '\\' {
                    index += 1;
                    match *chars.get(index)? {
                        'n' => word.push('\n'),
                        'r' => word.push('\r'),
                        other => word.push(other),
                    }
                } else {
                    word.push(c);
                }
                index += 1;
            }
            index += 1;
        } else {
            while let Some(&c) = chars.get(index) {
                if c == ';' {
                    break;
                }
                word.push(c);
                index += 1;
            }
        }
        out.push(word);

        if index == chars.len() {
            return Some(out);
        }
        while matches!(chars[index], ' ' | '\t') {
            index += 1;
            if index == chars.len() {
                return Some(out);
            }
        }
        if chars[index] != ';' {
            return None;
        }
        index += 1;
        if index == chars.len() {
            out.push(String::new());
            return Some(out);
        }
    }
}
