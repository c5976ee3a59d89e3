//! Delimiter scanner for locating the end of a function body.
//!
//! This is not a parser. It walks bytes from a starting offset, tracks the
//! nesting of `()`, `[]` and `{}`, and steps over string literals, template
//! literals and comments so that delimiters inside them are not counted.
//! All delimiters are ASCII, so scanning bytes never splits a UTF-8 sequence.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    LineComment,
    BlockComment,
    /// Single- or double-quoted string opened at `start`
    Quoted { quote: u8, start: usize },
    Template,
}

/// Byte offset of the `}` that closes the first top-level block at or after `from`.
///
/// The block opener is the first `{` seen while paren and bracket depth are
/// both zero, so for `function Foo({ a }: Props) { ... }` the destructuring
/// brace inside the parameter list is skipped and the body brace is used.
///
/// A quote directly after an identifier character (`Don't`, `users'`) is
/// JSX prose, not a string opener. A quoted string that still runs into a
/// newline is taken to be stray prose too, and scanning resumes right after
/// the quote.
///
/// Returns `None` when no block opens, or when the delimiters are unbalanced.
pub fn block_end(text: &str, from: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if from > bytes.len() {
        return None;
    }

    let mut mode = Mode::Code;
    let mut parens = 0usize;
    let mut brackets = 0usize;
    let mut braces = 0usize;
    let mut opened = false;
    // Brace depth at each `${` currently open inside a template literal
    let mut interpolations: Vec<usize> = Vec::new();

    let mut i = from;
    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();

        match mode {
            Mode::LineComment => {
                if b == b'\n' {
                    mode = Mode::Code;
                }
            }
            Mode::BlockComment => {
                if b == b'*' && next == Some(b'/') {
                    mode = Mode::Code;
                    i += 1;
                }
            }
            Mode::Quoted { quote, start } => {
                if b == b'\\' {
                    i += 1;
                } else if b == quote {
                    mode = Mode::Code;
                } else if b == b'\n' {
                    mode = Mode::Code;
                    i = start + 1;
                    continue;
                }
            }
            Mode::Template => {
                if b == b'\\' {
                    i += 1;
                } else if b == b'`' {
                    mode = Mode::Code;
                } else if b == b'$' && next == Some(b'{') {
                    interpolations.push(braces);
                    mode = Mode::Code;
                    i += 1;
                }
            }
            Mode::Code => match b {
                b'/' if next == Some(b'/') => {
                    mode = Mode::LineComment;
                    i += 1;
                }
                b'/' if next == Some(b'*') => {
                    mode = Mode::BlockComment;
                    i += 1;
                }
                b'\'' | b'"' if !follows_identifier(bytes, i) => {
                    mode = Mode::Quoted { quote: b, start: i }
                }
                b'`' => mode = Mode::Template,
                b'(' => parens += 1,
                b')' => parens = parens.checked_sub(1)?,
                b'[' => brackets += 1,
                b']' => brackets = brackets.checked_sub(1)?,
                b'{' => {
                    if !opened && parens == 0 && brackets == 0 && interpolations.is_empty() {
                        opened = true;
                    }
                    braces += 1;
                }
                b'}' => {
                    if interpolations.last() == Some(&braces) {
                        interpolations.pop();
                        mode = Mode::Template;
                    } else {
                        braces = braces.checked_sub(1)?;
                        if opened && braces == 0 {
                            return Some(i);
                        }
                    }
                }
                _ => {}
            },
        }

        i += 1;
    }

    None
}

fn follows_identifier(bytes: &[u8], i: usize) -> bool {
    i > 0 && matches!(bytes[i - 1], b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'$')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(text: &str) -> Option<&str> {
        block_end(text, 0).map(|end| &text[..=end])
    }

    #[test]
    fn test_simple_function_body() {
        let text = "function Foo() { return 1 }\nconst after = {}\n";
        assert_eq!(region(text), Some("function Foo() { return 1 }"));
    }

    #[test]
    fn test_skips_destructured_parameters() {
        let text = "function Foo({ a, b }: { a: string; b: number }) {\n  return a\n}\nexport {}\n";
        assert_eq!(
            region(text),
            Some("function Foo({ a, b }: { a: string; b: number }) {\n  return a\n}")
        );
    }

    #[test]
    fn test_nested_blocks_and_jsx() {
        let text = "function Foo() {\n  if (x) { y() }\n  return <div style={{ a: 1 }}>{items.map(i => { return i })}</div>\n}\n// }\n";
        let end = block_end(text, 0).unwrap();
        assert_eq!(&text[end..end + 2], "}\n");
        assert!(text[end + 1..].starts_with("\n// }"));
    }

    #[test]
    fn test_braces_in_strings_and_comments_are_ignored() {
        let text = "function Foo() {\n  const s = \"}\"\n  const t = '{'\n  // }\n  /* } */\n  return s\n}";
        assert_eq!(region(text), Some(text));
    }

    #[test]
    fn test_template_literal_interpolation() {
        let text = "function Foo() {\n  return `a ${ { b: 1 }.b } }`\n}\nrest";
        assert_eq!(region(text), Some("function Foo() {\n  return `a ${ { b: 1 }.b } }`\n}"));
    }

    #[test]
    fn test_apostrophe_in_jsx_text() {
        let text = "function Foo() {\n  return <p>Don't {name}</p>\n}\nconst x = 1\n";
        assert_eq!(region(text), Some("function Foo() {\n  return <p>Don't {name}</p>\n}"));
    }

    #[test]
    fn test_apostrophe_before_quoted_strings_on_same_line() {
        let text = "export function Foo({ done }: P) {\n  return (\n    <p>Don't forget {done ? 'yes' : 'no'}</p>\n  )\n}\nexport const x = {}\n";
        assert_eq!(
            region(text),
            Some("export function Foo({ done }: P) {\n  return (\n    <p>Don't forget {done ? 'yes' : 'no'}</p>\n  )\n}")
        );
    }

    #[test]
    fn test_keyword_before_string_still_opens_it() {
        let text = "function Foo(k) {\n  switch (k) {\n    case '}': return '{'\n  }\n}\nrest";
        assert_eq!(
            region(text),
            Some("function Foo(k) {\n  switch (k) {\n    case '}': return '{'\n  }\n}")
        );
    }

    #[test]
    fn test_no_block_returns_none() {
        assert_eq!(block_end("const a = 1", 0), None);
    }

    #[test]
    fn test_unbalanced_returns_none() {
        assert_eq!(block_end("function Foo() {\n  return 1\n", 0), None);
        assert_eq!(block_end("function Foo()) {}", 0), None);
    }

    #[test]
    fn test_start_offset() {
        let text = "const a = { x: 1 }\nfunction Foo() { }\n";
        let from = text.find("function").unwrap();
        let end = block_end(text, from).unwrap();
        assert_eq!(&text[from..=end], "function Foo() { }");
    }

    #[test]
    fn test_offset_past_end() {
        assert_eq!(block_end("abc", 10), None);
    }
}
