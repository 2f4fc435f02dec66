// ABOUTME: Character-level CSV scanner with quote state and embedded newlines
// ABOUTME: Yields one Vec<String> per row for the remote export parser

use std::iter::Peekable;
use std::str::Chars;

pub const QUOTE: char = '"';
pub const DELIMITER: char = ',';

/// Iterator over the rows of delimited text.
///
/// Outside quotes `,` ends a field and either `\n` or `\r` ends a row. Inside
/// quotes `""` is a literal quote, a lone `"` closes the quote, and every other
/// character (line breaks included) is kept. Rows with no fields and an empty
/// current field are skipped, which absorbs the second half of `\r\n`.
pub struct RowScanner<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> RowScanner<'a> {
    pub fn new(content: &'a str) -> Self {
        Self {
            chars: content.chars().peekable(),
        }
    }
}

impl Iterator for RowScanner<'_> {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut fields = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;

        while let Some(c) = self.chars.next() {
            if in_quotes {
                if c == QUOTE {
                    if self.chars.peek() == Some(&QUOTE) {
                        self.chars.next();
                        current.push(QUOTE);
                    } else {
                        in_quotes = false;
                    }
                } else {
                    current.push(c);
                }
                continue;
            }

            match c {
                QUOTE => in_quotes = true,
                DELIMITER => fields.push(std::mem::take(&mut current)),
                '\n' | '\r' => {
                    if !fields.is_empty() || !current.is_empty() {
                        fields.push(current);
                        return Some(fields);
                    }
                }
                _ => current.push(c),
            }
        }

        // Trailing row without a line terminator
        if !fields.is_empty() || !current.is_empty() {
            fields.push(current);
            return Some(fields);
        }
        None
    }
}

/// Remove one leading and one trailing quote, if present.
pub fn trim_quotes(value: &str) -> &str {
    let value = value.strip_prefix(QUOTE).unwrap_or(value);
    value.strip_suffix(QUOTE).unwrap_or(value)
}
