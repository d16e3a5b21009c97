//! Flat CSV reader (fallback source)
//!
//! First non-blank line is the header. Fields are split with a quote-aware
//! splitter so commas inside quoted labels survive.

use crate::types::CellValue;

use super::{DatasetError, RawTable};

/// Split a CSV line respecting quoted fields (handles commas inside quotes).
/// Returns owned strings because quoted fields need unquoting.
pub(crate) fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    // Escaped quote ("")
                    if chars.peek() == Some(&'"') {
                        current.push('"');
                        chars.next();
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}

/// Parse CSV text into a header and typed rows.
pub(crate) fn parse_csv(text: &str) -> Result<RawTable, DatasetError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty());

    let header = lines
        .next()
        .ok_or_else(|| DatasetError::Malformed("no header line".to_string()))?;

    let columns: Vec<String> = split_record(header)
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let name = name.trim();
            if name.is_empty() {
                format!("Unnamed: {i}")
            } else {
                name.to_string()
            }
        })
        .collect();

    let rows = lines
        .map(|line| {
            split_record(line)
                .iter()
                .map(|field| CellValue::parse(field))
                .collect::<Vec<_>>()
        })
        .collect();

    Ok(RawTable { columns, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_quoted_fields() {
        let fields = split_record(r#"1,"spoiled, badly",3,"say ""hi""""#);
        assert_eq!(fields, vec!["1", "spoiled, badly", "3", r#"say "hi""#]);
    }

    #[test]
    fn test_parse_header_and_rows() {
        let table = parse_csv("\u{feff}MQ2A,MQ4A,output\r\n1.5,,0\r\n\r\n2,NaN,1\n").unwrap();
        assert_eq!(table.columns, vec!["MQ2A", "MQ4A", "output"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][1], CellValue::Missing);
        assert_eq!(table.rows[1][0], CellValue::Number(2.0));
        assert_eq!(table.rows[1][1], CellValue::Missing);
    }

    #[test]
    fn test_blank_header_named() {
        let table = parse_csv(",MQ2A\n0,1\n").unwrap();
        assert_eq!(table.columns[0], "Unnamed: 0");
    }

    #[test]
    fn test_empty_text_is_malformed() {
        assert!(matches!(parse_csv("\n\n"), Err(DatasetError::Malformed(_))));
    }
}
