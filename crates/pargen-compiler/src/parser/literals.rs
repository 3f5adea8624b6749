//! Decoding of string literals, character literals, and character classes.

use crate::ast::CharSet;

/// Resolves a backslash escape to the character it stands for. Escapes that
/// have no special meaning stand for themselves.
pub(crate) fn unescape_char(c: char) -> char {
    match c {
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'b' => '\u{08}',
        'v' => '\u{0B}',
        'a' => '\u{07}',
        'f' => '\u{0C}',
        _ => c,
    }
}

/// Decodes the content of a `"..."` token (quotes included in `text`).
pub(crate) fn parse_string_literal(text: &str) -> Vec<char> {
    let inner = &text[1..text.len() - 1];
    let mut out = Vec::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(esc) = chars.next() {
                out.push(unescape_char(esc));
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Decodes a `[...]` class or `'c'` literal token into a set of ranges.
/// `a-z` forms a range; a `-` first, last, or escaped is literal.
pub(crate) fn parse_char_class(text: &str, inverted: bool) -> CharSet {
    let mut set = CharSet {
        inverted,
        ranges: Vec::new(),
    };

    if text.starts_with('\'') {
        let content: Vec<char> = text[1..text.len() - 1].chars().collect();
        let c = match content.as_slice() {
            ['\\', esc] => unescape_char(*esc),
            [c] => *c,
            _ => unreachable!("lexer guarantees a one-character literal"),
        };
        set.ranges.push((c, c));
        return set;
    }

    let inner = &text[1..text.len() - 1];

    // Decode escapes first so that range detection sees literal characters.
    // `escaped` tracks which are immune to `-` range syntax.
    let mut items: Vec<(char, bool)> = Vec::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(esc) = chars.next() {
                items.push((unescape_char(esc), true));
            }
        } else {
            items.push((c, false));
        }
    }

    let mut i = 0;
    while i < items.len() {
        let (c, _) = items[i];
        let dash_next = i + 2 < items.len() && items[i + 1] == ('-', false);
        if dash_next {
            let (hi, _) = items[i + 2];
            set.ranges.push((c.min(hi), c.max(hi)));
            i += 3;
        } else {
            set.ranges.push((c, c));
            i += 1;
        }
    }

    set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_literal_escapes() {
        assert_eq!(parse_string_literal(r#""a\nb""#), vec!['a', '\n', 'b']);
        assert_eq!(parse_string_literal(r#""\"\\""#), vec!['"', '\\']);
        assert_eq!(parse_string_literal(r#""""#), Vec::<char>::new());
    }

    #[test]
    fn char_class_ranges_and_literals() {
        let set = parse_char_class("[a-z_]", false);
        assert_eq!(set.ranges, vec![('a', 'z'), ('_', '_')]);
        assert!(set.matches('q'));
        assert!(set.matches('_'));
        assert!(!set.matches('A'));
    }

    #[test]
    fn char_class_literal_dash() {
        // Leading and trailing dashes are literal.
        assert_eq!(parse_char_class("[-a]", false).ranges, vec![
            ('-', '-'),
            ('a', 'a')
        ]);
        assert_eq!(parse_char_class("[a-]", false).ranges, vec![
            ('a', 'a'),
            ('-', '-')
        ]);
        // An escaped dash never forms a range.
        assert_eq!(parse_char_class(r"[a\-z]", false).ranges, vec![
            ('a', 'a'),
            ('-', '-'),
            ('z', 'z')
        ]);
    }

    #[test]
    fn inverted_class_complements() {
        let set = parse_char_class("['\\\"']", true);
        assert!(set.inverted);
        assert!(set.matches('x'));
        assert!(!set.matches('"'));
    }

    #[test]
    fn single_quoted_char() {
        assert_eq!(parse_char_class("'+'", false).ranges, vec![('+', '+')]);
        assert_eq!(parse_char_class(r"'\n'", false).ranges, vec![('\n', '\n')]);
    }
}
