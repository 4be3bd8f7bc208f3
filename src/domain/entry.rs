// debugger-proto-gen is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// Entry extraction turns GL entry-point declarations into sequentially numbered function names.

use thiserror::Error;

/// Token that marks a line as a GL entry-point declaration.
pub const ENTRY_MARKER: &str = "API_ENTRY(";

/// A function name pulled from one marker line, with its assigned enum value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub index: u32,
    /// 1-based line number in the input the entry came from.
    pub line: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}: entry marker without closing parenthesis")]
    MissingCloseParen { line: usize },
    #[error("line {line}: entry marker with an empty function name")]
    EmptyName { line: usize },
    #[error("line {line}: `{name}` is not a valid schema identifier")]
    InvalidName { line: usize, name: String },
}

impl ParseError {
    pub fn line(&self) -> usize {
        match self {
            Self::MissingCloseParen { line }
            | Self::EmptyName { line }
            | Self::InvalidName { line, .. } => *line,
        }
    }
}

/// Lazily walks `lines`, numbering every recognized entry from `start_index`.
///
/// The counter lives in the returned iterator; call [`Entries::next_index`]
/// once it is drained to chain a further pass without reusing values.
pub fn extract_entries<I>(lines: I, start_index: u32) -> Entries<I::IntoIter>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    Entries {
        lines: lines.into_iter(),
        line_no: 0,
        next_index: start_index,
    }
}

pub struct Entries<I> {
    lines: I,
    line_no: usize,
    next_index: u32,
}

impl<I> Entries<I> {
    /// First enum value not handed out by this pass.
    pub fn next_index(&self) -> u32 {
        self.next_index
    }
}

impl<I> Iterator for Entries<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    type Item = Result<Entry, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        for raw in self.lines.by_ref() {
            self.line_no += 1;
            let line = raw.as_ref();
            if !line.contains(ENTRY_MARKER) {
                continue;
            }

            let entry = parse_name(line, self.line_no).map(|name| {
                let index = self.next_index;
                self.next_index += 1;
                Entry {
                    name,
                    index,
                    line: self.line_no,
                }
            });
            return Some(entry);
        }
        None
    }
}

fn parse_name(line: &str, line_no: usize) -> Result<String, ParseError> {
    // The marker guarantees at least one '('.
    let open = line
        .find('(')
        .ok_or(ParseError::MissingCloseParen { line: line_no })?;
    let rest = &line[open + 1..];
    let close = rest
        .find(')')
        .ok_or(ParseError::MissingCloseParen { line: line_no })?;
    // Padding inside the parentheses is not part of the name.
    let name = rest[..close].trim();

    if name.is_empty() {
        return Err(ParseError::EmptyName { line: line_no });
    }
    if !is_identifier(name) {
        return Err(ParseError::InvalidName {
            line: line_no,
            name: name.to_string(),
        });
    }

    Ok(name.to_string())
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
