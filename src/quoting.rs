//! C string/character literal quoting (§4.3). Iterates by `char`, matching
//! the source's per-codepoint string walk rather than a byte walk.

pub fn char_literal(c: char, quote: char) -> String {
    match c {
        '\\' => "\\\\".to_string(),
        c if c == quote => format!("\\{c}"),
        c if (c as u32) < 0x20 || c as u32 == 0x7f => format!("\\{:03o}", c as u32),
        c => c.to_string(),
    }
}

pub fn quote_char(c: char) -> String {
    format!("'{}'", char_literal(c, '\''))
}

pub fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        out.push_str(&char_literal(c, '"'));
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_ascii_passes_through() {
        assert_eq!(quote_string("hello"), "\"hello\"");
    }

    #[test]
    fn backslash_and_quote_are_escaped() {
        assert_eq!(quote_string("a\\b\"c"), "\"a\\\\b\\\"c\"");
    }

    #[test]
    fn control_bytes_become_octal() {
        assert_eq!(quote_string("\t"), "\"\\011\"");
        assert_eq!(quote_string("\x7f"), "\"\\177\"");
    }

    #[test]
    fn quote_char_escapes_single_quote() {
        assert_eq!(quote_char('\''), "'\\''");
        assert_eq!(quote_char('x'), "'x'");
    }

    #[test]
    fn non_ascii_passes_through_unescaped() {
        assert_eq!(quote_string("café"), "\"café\"");
    }
}
