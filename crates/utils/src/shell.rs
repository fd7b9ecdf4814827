//! Argument-blob handling without a shell.
//!
//! The runner accepts its child's arguments as one string. Windows hands
//! that string to the child untouched; everywhere else it has to become an
//! argument vector, which [`split_command_line`] produces using POSIX
//! quoting rules. Nothing is expanded: `$VAR`, `*` and `$(...)` reach the
//! child literally.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplitError {
    #[error("unterminated {quote} quote starting at byte {offset}")]
    UnterminatedQuote { quote: char, offset: usize },
}

/// Split an argument blob into words.
///
/// - whitespace separates words
/// - `'...'` is taken literally
/// - `"..."` groups; inside it `\` only escapes `"`, `\`, `$` and `` ` ``
/// - an unquoted `\` escapes the following character
/// - backslash-newline is a line continuation
pub fn split_command_line(input: &str) -> Result<Vec<String>, SplitError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = input.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some((_, '\'')) => break,
                        Some((_, c)) => current.push(c),
                        None => return Err(SplitError::UnterminatedQuote { quote: '\'', offset }),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some((_, '"')) => break,
                        Some((_, '\\')) => match chars.peek() {
                            Some(&(_, next @ ('"' | '\\' | '$' | '`'))) => {
                                current.push(next);
                                chars.next();
                            }
                            Some(&(_, '\n')) => {
                                chars.next();
                            }
                            _ => current.push('\\'),
                        },
                        Some((_, c)) => current.push(c),
                        None => return Err(SplitError::UnterminatedQuote { quote: '"', offset }),
                    }
                }
            }
            '\\' => match chars.next() {
                Some((_, '\n')) => {}
                Some((_, next)) => {
                    current.push(next);
                    in_word = true;
                }
                None => {
                    current.push('\\');
                    in_word = true;
                }
            },
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// Render a program and its arguments for log and error messages.
pub fn display_command(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .map(|part| part.shell_escape())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Helper trait for quoting arguments for display
pub trait ShellEscape {
    fn shell_escape(&self) -> String;
}

impl ShellEscape for str {
    fn shell_escape(&self) -> String {
        if cfg!(windows) {
            if self.is_empty() {
                "\"\"".to_string()
            } else if self.contains(|c: char| c.is_whitespace() || "\"^%!<>&|()".contains(c)) {
                format!("\"{}\"", self.replace('"', "\"\""))
            } else {
                self.to_string()
            }
        } else if self.is_empty() {
            "''".to_string()
        } else if self.contains('\'') {
            // End the quote, emit an escaped quote, reopen
            format!("'{}'", self.replace('\'', "'\"'\"'"))
        } else if self
            .chars()
            .all(|c| c.is_alphanumeric() || "._-/=".contains(c))
        {
            self.to_string()
        } else {
            format!("'{}'", self)
        }
    }
}
