//! Quote-aware CSV tokenizer and writer

use std::io::{self, Write};

/// Split CSV text into rows of fields.
///
/// Tokenizes character by character: `,` ends a field and `\n` or `\r\n`
/// ends a row, but only outside quotes. Inside quotes every character is
/// literal, including newlines, and `""` is one literal quote. A lone `\r`
/// outside quotes is kept as content. Blank rows are dropped.
pub fn parse_csv(content: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => row.push(std::mem::take(&mut field)),
            '\n' if !in_quotes => finish_row(&mut rows, &mut row, &mut field),
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {
                chars.next();
                finish_row(&mut rows, &mut row, &mut field);
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        finish_row(&mut rows, &mut row, &mut field);
    }

    rows
}

fn finish_row(rows: &mut Vec<Vec<String>>, row: &mut Vec<String>, field: &mut String) {
    row.push(std::mem::take(field));
    let done = std::mem::take(row);
    if done.len() > 1 || !done[0].is_empty() {
        rows.push(done);
    }
}

/// Quote a field when it holds a comma, quote or line break
pub fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Write one `\n`-terminated row
pub fn write_row<W, S>(writer: &mut W, fields: &[S]) -> io::Result<()>
where
    W: Write,
    S: AsRef<str>,
{
    let line = fields
        .iter()
        .map(|f| escape_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    writeln!(writer, "{}", line)
}
