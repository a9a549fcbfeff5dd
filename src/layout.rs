//! Turns indentation into explicit block markers so that the grammar does not
//! have to track the off-side rule by itself.
//!
//! ```text
//! if x:            if x:\n
//!     y = 1   ==>  \x0Ey = 1\n
//! z = 2            \x0Fz = 2\n
//! ```
use crate::exception::{Exception, ExceptionKind};

/// Emitted before the first line of an indented block.
pub const INDENT: char = '\u{0E}';
/// Emitted once for each block closed before a line.
pub const DEDENT: char = '\u{0F}';

const TAB_WIDTH: usize = 8;
/// Deepest bracket nesting accepted.
const MAX_BRACKETS: usize = 200;
/// Operators chained within one expression. Each can add a level to the
/// syntax tree, and both the parser and the evaluator recurse on it.
const MAX_OPERATORS: usize = 3000;

/// The normalized source and where each of its lines came from.
#[derive(Debug, PartialEq)]
pub struct Layout {
    pub text: String,
    /// `lines[i]` is the 1-based physical line number of the `i`-th
    /// normalized line.
    lines: Vec<usize>,
}

impl Layout {
    /// Maps a 1-based line number in `text` back to the source.
    pub fn source_line(&self, normalized: usize) -> usize {
        match self.lines.get(normalized.saturating_sub(1)) {
            Some(line) => *line,
            None => self.lines.last().copied().unwrap_or(1),
        }
    }
}

struct LogicalLine {
    indent: usize,
    body: String,
    /// The physical line the logical line starts on.
    line: usize,
}

fn indent_error(message: &str, line: usize) -> Exception {
    Exception::new(
        ExceptionKind::IndentationError,
        format!("{} (<string>, line {})", message, line),
    )
}

/// Splits `source` into logical lines: joins bracketed and backslash
/// continued lines, drops comments and blank lines.
fn logical_lines(source: &str) -> Result<Vec<LogicalLine>, Exception> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut indent = 0;
    let mut at_line_start = true;
    let mut start_line = 1;
    let mut line = 1;
    let mut depth: usize = 0;
    let mut quote: Option<char> = None;
    let mut chars = source.chars().peekable();

    macro_rules! finish_line {
        () => {
            let body = current.trim_end().to_owned();
            if !body.is_empty() {
                lines.push(LogicalLine {
                    indent,
                    body,
                    line: start_line,
                });
            }
            current.clear();
            indent = 0;
            at_line_start = true;
            depth = 0;
        };
    }

    while let Some(ch) = chars.next() {
        if ch == INDENT || ch == DEDENT {
            return Err(Exception::new(
                ExceptionKind::SyntaxError,
                format!("invalid non-printable character (<string>, line {})", line),
            ));
        }

        if at_line_start {
            match ch {
                ' ' => {
                    indent += 1;
                    continue;
                }
                '\t' => {
                    indent = (indent / TAB_WIDTH + 1) * TAB_WIDTH;
                    continue;
                }
                '\x0C' => {
                    indent = 0;
                    continue;
                }
                _ => {
                    at_line_start = false;
                    start_line = line;
                }
            }
        }

        if let Some(q) = quote {
            current.push(ch);
            match ch {
                '\\' => {
                    if let Some(next) = chars.next() {
                        if next == '\n' {
                            line += 1;
                        }
                        current.push(next);
                    }
                }
                '\n' => {
                    // An unterminated literal; leave it to the parser.
                    line += 1;
                    quote = None;
                    current.pop();
                    finish_line!();
                }
                _ if ch == q => quote = None,
                _ => {}
            }
            continue;
        }

        match ch {
            '\'' | '"' => {
                quote = Some(ch);
                current.push(ch);
            }
            '#' => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '\\' if chars.peek() == Some(&'\n') => {
                chars.next();
                line += 1;
                current.push(' ');
            }
            '(' | '[' | '{' => {
                depth += 1;
                current.push(ch);
            }
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            '\r' => {}
            '\n' => {
                line += 1;
                if depth > 0 {
                    current.push(' ');
                } else {
                    finish_line!();
                }
            }
            _ => current.push(ch),
        }
    }

    finish_line!();
    Ok(lines)
}

fn is_operator_word(word: &str) -> bool {
    match word {
        "and" | "or" | "not" | "if" | "else" | "lambda" | "in" | "is" | "for" => true,
        _ => false,
    }
}

/// Rejects an expression nested deep enough to run the parser out of stack:
/// too many brackets, or a chain of operators (`- - - x`, `a + b + ...`,
/// `f()()()`) that is too long.
pub fn check_nesting(text: &str, line: usize) -> Result<(), Exception> {
    // Operators seen at each open bracket level, innermost last.
    let mut levels: Vec<usize> = vec![0];
    let mut total = 0;
    let mut after_operand = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        let mut operators = 0;
        let mut opens = false;
        match ch {
            '\'' | '"' => {
                while let Some(next) = chars.next() {
                    if next == '\\' {
                        chars.next();
                    } else if next == ch {
                        break;
                    }
                }
                after_operand = true;
            }
            '(' | '[' | '{' => {
                // A call or a subscript extends the chain it follows.
                if after_operand {
                    operators = 1;
                }
                opens = true;
                after_operand = false;
            }
            ')' | ']' | '}' => {
                if levels.len() > 1 {
                    total -= levels.pop().unwrap_or(0);
                }
                after_operand = true;
            }
            ',' | ';' => {
                if let Some(count) = levels.last_mut() {
                    total -= *count;
                    *count = 0;
                }
                after_operand = false;
            }
            '.' if after_operand && !chars.peek().map_or(false, char::is_ascii_digit) => {
                operators = 1;
                after_operand = false;
            }
            '+' | '-' | '*' | '/' | '%' | '<' | '>' | '=' | '!' | '~' | '&' | '|' | '^' | '@' => {
                operators = 1;
                after_operand = false;
            }
            ':' => after_operand = false,
            c if c.is_alphanumeric() || c == '_' => {
                // Numbers keep their decimal point.
                let number = c.is_ascii_digit();
                let mut word = c.to_string();
                while let Some(&next) = chars.peek() {
                    if !(next.is_alphanumeric() || next == '_' || number && next == '.') {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }

                if is_operator_word(&word) {
                    operators = 1;
                    after_operand = false;
                } else {
                    after_operand = true;
                }
            }
            _ => {}
        }

        if operators > 0 {
            if let Some(count) = levels.last_mut() {
                *count += operators;
            }
            total += operators;
            if total > MAX_OPERATORS {
                return Err(Exception::new(
                    ExceptionKind::RecursionError,
                    "maximum recursion depth exceeded during compilation",
                ));
            }
        }

        if opens {
            levels.push(0);
            if levels.len() > MAX_BRACKETS + 1 {
                return Err(Exception::syntax_error("too many nested parentheses", line));
            }
        }
    }

    Ok(())
}

/// Normalizes `source`. Every line of the result ends with `\n`.
pub fn layout(source: &str) -> Result<Layout, Exception> {
    let mut text = String::new();
    let mut lines = Vec::new();
    let mut stack = vec![0];
    let mut opens_block = false;
    let mut last_line = 1;

    for logical in logical_lines(source)? {
        let top = *stack.last().unwrap_or(&0);
        if opens_block {
            if logical.indent <= top {
                return Err(indent_error("expected an indented block", logical.line));
            }
            stack.push(logical.indent);
            text.push(INDENT);
        } else if logical.indent > top {
            return Err(indent_error("unexpected indent", logical.line));
        } else {
            while logical.indent < *stack.last().unwrap_or(&0) {
                stack.pop();
                text.push(DEDENT);
            }

            if logical.indent != *stack.last().unwrap_or(&0) {
                return Err(indent_error(
                    "unindent does not match any outer indentation level",
                    logical.line,
                ));
            }
        }

        check_nesting(&logical.body, logical.line)?;
        opens_block = logical.body.ends_with(':');
        text.push_str(&logical.body);
        text.push('\n');
        lines.push(logical.line);
        last_line = logical.line;
    }

    if opens_block {
        return Err(indent_error("expected an indented block", last_line + 1));
    }

    for _ in 1..stack.len() {
        text.push(DEDENT);
    }

    trace!("layout: {:?}", text);
    Ok(Layout { text, lines })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(source: &str) -> String {
        layout(source).unwrap().text
    }

    #[test]
    fn flat_lines() {
        assert_eq!(text("print(1)"), "print(1)\n");
        assert_eq!(text("a = 1\n\n\nb = 2\n"), "a = 1\nb = 2\n");
        assert_eq!(text(""), "");
        assert_eq!(text("# nothing here\n   \n"), "");
    }

    #[test]
    fn blocks() {
        assert_eq!(
            text("if x:\n    y = 1\nz = 2"),
            "if x:\n\u{0E}y = 1\n\u{0F}z = 2\n"
        );
        assert_eq!(
            text("for i in a:\n  if i:\n    print(i)\n"),
            "for i in a:\n\u{0E}if i:\n\u{0E}print(i)\n\u{0F}\u{0F}"
        );
        assert_eq!(
            text("if a:\n\tb\nelse:\n\tc"),
            "if a:\n\u{0E}b\n\u{0F}else:\n\u{0E}c\n\u{0F}"
        );
    }

    #[test]
    fn continuations_and_comments() {
        assert_eq!(text("x = [1,\n     2]  # two"), "x = [1,      2]\n");
        assert_eq!(text("x = 1 + \\\n 2"), "x = 1 +   2\n");
        assert_eq!(text("s = '# not a comment'"), "s = '# not a comment'\n");
        assert_eq!(text("s = \"a'b\" # c"), "s = \"a'b\"\n");
    }

    #[test]
    fn source_lines() {
        let layout = layout("\n\na = 1\n\nb = (1,\n2)\nc = 3").unwrap();
        assert_eq!(layout.source_line(1), 3);
        assert_eq!(layout.source_line(2), 5);
        assert_eq!(layout.source_line(3), 7);
    }

    #[test]
    fn nesting_limits() {
        let nested = |open: &str, close: &str, n: usize| {
            format!("x = {}1{}", open.repeat(n), close.repeat(n))
        };
        assert!(layout(&nested("(", ")", 200)).is_ok());
        assert!(layout(&nested("[", "]", 200)).is_ok());
        assert_eq!(
            layout(&nested("(", ")", 201)).unwrap_err().message,
            "too many nested parentheses (<string>, line 1)"
        );
        assert_eq!(
            layout(&nested("{", "}", 500)).unwrap_err().kind,
            ExceptionKind::SyntaxError
        );

        let unary = layout(&format!("x = {}1", "-".repeat(50000))).unwrap_err();
        assert_eq!(unary.kind, ExceptionKind::RecursionError);
        assert_eq!(unary.message, "maximum recursion depth exceeded during compilation");
        assert!(layout(&format!("x = {}1", "not ".repeat(5000))).is_err());
        assert!(layout(&format!("x = f{}", "()".repeat(5000))).is_err());

        // Commas and brackets end a chain; string contents are not code.
        assert!(layout(&format!("x = [{}]", vec!["-1.5"; 5000].join(", "))).is_ok());
        assert!(layout(&format!("x = {}", vec!["(1 + 2)"; 1000].join(" * "))).is_ok());
        assert!(layout(&format!("s = '{}'", "(-".repeat(5000))).is_ok());
    }

    #[test]
    fn indentation_errors() {
        assert_eq!(
            layout("  x = 1").unwrap_err().message,
            "unexpected indent (<string>, line 1)"
        );
        assert_eq!(
            layout("if x:\ny = 1").unwrap_err().message,
            "expected an indented block (<string>, line 2)"
        );
        assert_eq!(
            layout("if x:").unwrap_err().message,
            "expected an indented block (<string>, line 2)"
        );
        assert_eq!(
            layout("if x:\n    y\n  z").unwrap_err().message,
            "unindent does not match any outer indentation level (<string>, line 3)"
        );
        assert_eq!(
            layout("if x:\ny").unwrap_err().kind,
            ExceptionKind::IndentationError
        );
    }
}
