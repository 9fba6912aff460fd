//! Values of literal tokens.

/// Content of a quoted or long-bracket string, with escapes applied.
pub fn string_value(text: &str) -> String {
    if text.starts_with('[') {
        return long_string_value(text);
    }
    let Some(quote) = text.chars().next() else {
        return String::new();
    };
    let inner = &text[quote.len_utf8()..];
    let inner = inner.strip_suffix(quote).unwrap_or(inner);

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escaped) = chars.next() else {
            break;
        };
        match escaped {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'a' => out.push('\u{7}'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '\n' => out.push('\n'),
            'z' => {
                while chars.peek().is_some_and(|c| c.is_whitespace()) {
                    chars.next();
                }
            }
            'x' => {
                let hex: String = (0..2).filter_map(|_| chars.next()).collect();
                if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                    out.push(byte as char);
                }
            }
            'u' => {
                let mut code = String::new();
                if chars.peek() == Some(&'{') {
                    chars.next();
                    for c in chars.by_ref() {
                        if c == '}' {
                            break;
                        }
                        code.push(c);
                    }
                }
                if let Some(c) = u32::from_str_radix(&code, 16).ok().and_then(char::from_u32) {
                    out.push(c);
                }
            }
            d if d.is_ascii_digit() => {
                let mut value = d.to_digit(10).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(10)) {
                        Some(digit) => {
                            value = value * 10 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                if let Some(c) = char::from_u32(value) {
                    out.push(c);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// `[==[text]==]` without the brackets; a leading newline is dropped.
fn long_string_value(text: &str) -> String {
    let level = text[1..].chars().take_while(|c| *c == '=').count();
    let open = level + 2;
    let close = level + 2;
    if text.len() < open + close {
        return String::new();
    }
    let inner = &text[open..text.len() - close];
    let inner = inner
        .strip_prefix("\r\n")
        .or_else(|| inner.strip_prefix('\n'))
        .unwrap_or(inner);
    inner.to_string()
}

/// Decimal or hexadecimal integer; hex literals wrap around like Lua does.
pub fn integer_value(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let value = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).ok()? as i64,
        None => digits.parse::<i64>().ok()?,
    };
    Some(if negative { value.wrapping_neg() } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_escapes() {
        assert_eq!(string_value(r#""a\tb""#), "a\tb");
        assert_eq!(string_value("'it\\'s'"), "it's");
        assert_eq!(string_value(r#""\65\x42\u{43}""#), "ABC");
        assert_eq!(string_value("\"a\\z   b\""), "ab");
    }

    #[test]
    fn test_long_strings() {
        assert_eq!(string_value("[[\nline]]"), "line");
        assert_eq!(string_value("[==[a]]b]==]"), "a]]b");
    }

    #[test]
    fn test_integers() {
        assert_eq!(integer_value("42"), Some(42));
        assert_eq!(integer_value("0xff"), Some(255));
        assert_eq!(integer_value("-3"), Some(-3));
        assert_eq!(integer_value("1.5"), None);
    }
}
