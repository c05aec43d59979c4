//! `@name` parameter scanning for raw SQL.
//!
//! The statement text is copied verbatim except for `@name` tokens, which
//! become PostgreSQL positional parameters. A repeated name reuses its
//! position. Tokens inside string literals (including `E'...'` escape
//! strings and `$tag$...$tag$` dollar quotes), quoted identifiers and comments
//! are left alone, as is `@@`.

use std::iter::Peekable;
use std::str::Chars;

/// Raw SQL rewritten to positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedSql {
    /// Statement text with `$n` in place of each `@name`.
    pub text: String,
    /// Parameter names; `names[i]` is bound to `$i+1`.
    pub names: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    SingleQuoted,
    /// `E'...'`, where a backslash escapes the next character.
    EscapeQuoted,
    DollarQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn follows_ident(text: &str) -> bool {
    text.chars().next_back().is_some_and(is_ident_char)
}

/// The `$tag$` (or `$$`) delimiter starting at a `$`, given what follows it.
fn dollar_delimiter(rest: &Peekable<Chars<'_>>) -> Option<String> {
    let mut delimiter = String::from("$");
    for c in rest.clone() {
        if c == '$' {
            delimiter.push(c);
            return Some(delimiter);
        }
        let allowed = if delimiter.len() == 1 {
            is_ident_start(c)
        } else {
            is_ident_char(c)
        };
        if !allowed {
            return None;
        }
        delimiter.push(c);
    }
    None
}

/// Rewrite `@name` tokens into `$n` positional parameters.
pub fn scan(sql: &str) -> ScannedSql {
    let mut text = String::with_capacity(sql.len());
    let mut names: Vec<String> = Vec::new();
    let mut state = State::Normal;
    let mut delimiter = String::new();
    let mut body_start = 0;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Normal => match c {
                '\'' => {
                    state = State::SingleQuoted;
                    text.push(c);
                }
                '"' => {
                    state = State::DoubleQuoted;
                    text.push(c);
                }
                'E' | 'e' if chars.peek() == Some(&'\'') && !follows_ident(&text) => {
                    state = State::EscapeQuoted;
                    text.push(c);
                    if let Some(quote) = chars.next() {
                        text.push(quote);
                    }
                }
                '$' => match dollar_delimiter(&chars).filter(|_| !follows_ident(&text)) {
                    Some(open) => {
                        // the leading `$` is `c`; consume the rest of the delimiter
                        for _ in 1..open.len() {
                            chars.next();
                        }
                        text.push_str(&open);
                        body_start = text.len();
                        delimiter = open;
                        state = State::DollarQuoted;
                    }
                    None => text.push(c),
                },
                '-' if chars.peek() == Some(&'-') => {
                    state = State::LineComment;
                    text.push(c);
                }
                '/' if chars.peek() == Some(&'*') => {
                    state = State::BlockComment;
                    text.push(c);
                    if let Some(star) = chars.next() {
                        text.push(star);
                    }
                }
                '@' if chars.peek() == Some(&'@') => {
                    text.push_str("@@");
                    chars.next();
                }
                '@' if chars.peek().is_some_and(|n| is_ident_start(*n)) => {
                    let mut name = String::new();
                    while let Some(&n) = chars.peek() {
                        if !is_ident_char(n) {
                            break;
                        }
                        name.push(n);
                        chars.next();
                    }
                    let position = match names.iter().position(|existing| *existing == name) {
                        Some(index) => index + 1,
                        None => {
                            names.push(name);
                            names.len()
                        }
                    };
                    text.push('$');
                    text.push_str(&position.to_string());
                }
                _ => text.push(c),
            },
            State::SingleQuoted => {
                text.push(c);
                // '' inside a literal closes and reopens, which is equivalent
                if c == '\'' {
                    state = State::Normal;
                }
            }
            State::EscapeQuoted => {
                text.push(c);
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            text.push(escaped);
                        }
                    }
                    '\'' if chars.peek() == Some(&'\'') => {
                        text.push('\'');
                        chars.next();
                    }
                    '\'' => state = State::Normal,
                    _ => {}
                }
            }
            State::DollarQuoted => {
                text.push(c);
                if c == '$' && text[body_start..].ends_with(delimiter.as_str()) {
                    state = State::Normal;
                }
            }
            State::DoubleQuoted => {
                text.push(c);
                if c == '"' {
                    state = State::Normal;
                }
            }
            State::LineComment => {
                text.push(c);
                if c == '\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment => {
                text.push(c);
                if c == '*' && chars.peek() == Some(&'/') {
                    if let Some(slash) = chars.next() {
                        text.push(slash);
                    }
                    state = State::Normal;
                }
            }
        }
    }

    ScannedSql { text, names }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rewrites_tokens_in_order() {
        let scanned = scan("SELECT * FROM t WHERE a = @first AND b = @second");
        assert_eq!(scanned.text, "SELECT * FROM t WHERE a = $1 AND b = $2");
        assert_eq!(scanned.names, vec!["first", "second"]);
    }

    #[test]
    fn test_repeated_name_reuses_position() {
        let scanned = scan("SELECT @id, @other WHERE x = @id");
        assert_eq!(scanned.text, "SELECT $1, $2 WHERE x = $1");
        assert_eq!(scanned.names, vec!["id", "other"]);
    }

    #[test]
    fn test_ignores_quoted_and_commented_tokens() {
        let sql = "SELECT '@a', \"@b\", 'it''s @c' -- @d\n/* @e */ @@version, @f";
        let scanned = scan(sql);
        assert_eq!(
            scanned.text,
            "SELECT '@a', \"@b\", 'it''s @c' -- @d\n/* @e */ @@version, $1"
        );
        assert_eq!(scanned.names, vec!["f"]);
    }

    #[test]
    fn test_ignores_tokens_in_dollar_quotes() {
        let sql = "SELECT $$ @a $$, $fn$ it's @b $x$ $fn$, $1, a$b, @c";
        let scanned = scan(sql);
        assert_eq!(
            scanned.text,
            "SELECT $$ @a $$, $fn$ it's @b $x$ $fn$, $1, a$b, $1"
        );
        assert_eq!(scanned.names, vec!["c"]);
    }

    #[test]
    fn test_ignores_tokens_in_escape_strings() {
        let sql = r"SELECT E'it\'s @a', e'x''@b', name'@c', @d";
        let scanned = scan(sql);
        assert_eq!(scanned.text, r"SELECT E'it\'s @a', e'x''@b', name'@c', $1");
        assert_eq!(scanned.names, vec!["d"]);
    }

    #[test]
    fn test_lone_at_is_literal() {
        let scanned = scan("SELECT 1 @ 2, @1");
        assert_eq!(scanned.text, "SELECT 1 @ 2, @1");
        assert!(scanned.names.is_empty());
    }

    #[test]
    fn test_token_ends_at_non_identifier() {
        let scanned = scan("WHERE id=@id::int AND n=@n_2;");
        assert_eq!(scanned.text, "WHERE id=$1::int AND n=$2;");
        assert_eq!(scanned.names, vec!["id", "n_2"]);
    }
}
