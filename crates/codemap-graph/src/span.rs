//! Source spans of brace-delimited declarations.

/// Lexical state of the brace scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    Str(char),
    StrEscape(char),
    LineComment,
    BlockComment,
}

/// Last line (0-based) of the declaration starting on `start_line`.
///
/// Scans forward for the first `{` and returns the line holding its matching
/// `}`. Braces inside string literals, character literals and comments are
/// ignored. A `;` before any `{`, outside parentheses and brackets, ends the
/// declaration on that line, which covers abstract and interface methods. When nothing matches the span runs
/// to the end of the source.
///
/// # Examples
///
/// ```
/// use codemap_graph::span::block_end;
///
/// let src = "class A {\n  void f() {\n    g(\"}\");\n  }\n}\nclass B {}\n";
/// assert_eq!(block_end(src, 0), 4);
/// assert_eq!(block_end(src, 1), 3);
/// assert_eq!(block_end("interface I {\n  void f();\n}\n", 1), 1);
/// assert_eq!(block_end("void f() {\n  open(", 0), 1);
/// ```
pub fn block_end(source: &str, start_line: usize) -> usize {
    let last_line = source.lines().count().saturating_sub(1);
    if start_line > last_line {
        return last_line;
    }

    let Some(offset) = line_offset(source, start_line) else {
        return last_line;
    };

    let chars: Vec<char> = source[offset..].chars().collect();
    let mut line = start_line;
    let mut depth = 0usize;
    let mut opened = false;
    let mut nesting = 0usize;
    let mut state = State::Code;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match state {
            State::Code => match c {
                '/' if next == Some('/') => {
                    state = State::LineComment;
                    i += 1;
                }
                '/' if next == Some('*') => {
                    state = State::BlockComment;
                    i += 1;
                }
                '"' | '`' => state = State::Str(c),
                '\'' => i += char_literal_len(&chars[i..]).saturating_sub(1),
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' if opened => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return line;
                    }
                }
                '(' | '[' if !opened => nesting += 1,
                ')' | ']' if !opened => nesting = nesting.saturating_sub(1),
                ';' if !opened && nesting == 0 => return line,
                _ => {}
            },
            State::Str(quote) => {
                if c == '\\' {
                    state = State::StrEscape(quote);
                } else if c == quote {
                    state = State::Code;
                }
            }
            State::StrEscape(quote) => state = State::Str(quote),
            State::LineComment => {
                if c == '\n' {
                    state = State::Code;
                }
            }
            State::BlockComment => {
                if c == '*' && next == Some('/') {
                    state = State::Code;
                    i += 1;
                }
            }
        }

        if chars.get(i) == Some(&'\n') {
            line += 1;
        }
        i += 1;
    }

    last_line
}

/// Source lines `start..=end` (0-based), joined and trimmed.
///
/// # Examples
///
/// ```
/// use codemap_graph::span::slice_lines;
///
/// assert_eq!(slice_lines("a\n  b\nc\n", 1, 2), "b\nc");
/// ```
pub fn slice_lines(source: &str, start: usize, end: usize) -> String {
    source
        .lines()
        .skip(start)
        .take(end.saturating_sub(start) + 1)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Byte offset of the start of `line`.
fn line_offset(source: &str, line: usize) -> Option<usize> {
    if line == 0 {
        return Some(0);
    }
    source
        .match_indices('\n')
        .nth(line - 1)
        .map(|(i, _)| i + 1)
        .filter(|&i| i < source.len())
}

/// Length of a character literal starting at `chars[0] == '\''`, or 1 when
/// the quote does not open one (Rust lifetimes, for example).
fn char_literal_len(chars: &[char]) -> usize {
    match chars.get(1) {
        Some('\\') => chars
            .iter()
            .skip(3)
            .take(10)
            .take_while(|&&c| c != '\n')
            .position(|&c| c == '\'')
            .map_or(1, |p| p + 4),
        Some(_) if chars.get(2) == Some(&'\'') => 3,
        _ => 1,
    }
}
