//! XLSX workbook reader (primary source)
//!
//! An `.xlsx` file is a zip container of XML parts. Only the first worksheet
//! is read; its first row is the header. Supported cell types: numeric,
//! shared string, inline string, formula string and boolean. Error cells
//! read as missing.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::types::CellValue;

use super::{DatasetError, RawTable};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const DEFAULT_SHEET_PART: &str = "xl/worksheets/sheet1.xml";

fn malformed(msg: impl std::fmt::Display) -> DatasetError {
    DatasetError::Malformed(msg.to_string())
}

/// Parse workbook bytes into a header and typed rows.
pub(crate) fn parse_xlsx(bytes: &[u8]) -> Result<RawTable, DatasetError> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| malformed(format!("not a zip container: {e}")))?;

    let shared = match read_part(&mut archive, SHARED_STRINGS_PART)? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };

    let sheet_part = first_sheet_part(&mut archive)?;
    let sheet_xml = read_part(&mut archive, &sheet_part)?
        .ok_or_else(|| malformed(format!("worksheet part {sheet_part} missing")))?;

    let grid = parse_sheet(&sheet_xml, &shared)?;
    table_from_grid(grid)
}

fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>, DatasetError> {
    match archive.by_name(name) {
        Ok(mut file) => {
            let mut xml = String::new();
            file.read_to_string(&mut xml)
                .map_err(|e| malformed(format!("{name}: {e}")))?;
            Ok(Some(xml))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(malformed(format!("{name}: {e}"))),
    }
}

fn attr_value(e: &BytesStart<'_>, local: &[u8]) -> Result<Option<String>, DatasetError> {
    for attr in e.attributes() {
        let attr = attr.map_err(malformed)?;
        if attr.key.local_name().as_ref() == local {
            let value = attr.unescape_value().map_err(malformed)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Resolve the part name of the first worksheet via the workbook relationships.
fn first_sheet_part<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<String, DatasetError> {
    let Some(workbook) = read_part(archive, WORKBOOK_PART)? else {
        return Ok(DEFAULT_SHEET_PART.to_string());
    };

    let mut rel_id = None;
    let mut reader = Reader::from_str(&workbook);
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                rel_id = attr_value(&e, b"id")?;
                break;
            }
            Event::Eof => break,
            _ => {}
        }
    }
    let Some(rel_id) = rel_id else {
        return Ok(DEFAULT_SHEET_PART.to_string());
    };

    let Some(rels) = read_part(archive, WORKBOOK_RELS_PART)? else {
        return Ok(DEFAULT_SHEET_PART.to_string());
    };

    let mut reader = Reader::from_str(&rels);
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if attr_value(&e, b"Id")?.as_deref() == Some(rel_id.as_str()) {
                    if let Some(target) = attr_value(&e, b"Target")? {
                        return Ok(match target.strip_prefix('/') {
                            Some(absolute) => absolute.to_string(),
                            None => format!("xl/{target}"),
                        });
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(DEFAULT_SHEET_PART.to_string())
}

fn parse_shared_strings(xml: &str) -> Result<Vec<String>, DatasetError> {
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    // Phonetic runs carry their own <t> elements that are not part of the value.
    let mut in_phonetic = false;

    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"t" if !in_phonetic => in_text = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(t) if in_text => current.push_str(&t.unescape().map_err(malformed)?),
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                b"si" => strings.push(std::mem::take(&mut current)),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

/// Column count of the widest sheet a workbook can hold (`A` to `XFD`).
const MAX_COLUMNS: usize = 16_384;

/// Column index from an A1-style reference ("C7" -> 2).
///
/// `Ok(None)` when the reference has no column letters. References past
/// `XFD` are malformed.
fn column_index(reference: &str) -> Result<Option<usize>, DatasetError> {
    let letters: Vec<u8> = reference
        .bytes()
        .take_while(u8::is_ascii_alphabetic)
        .collect();
    if letters.is_empty() {
        return Ok(None);
    }
    let out_of_range = || malformed(format!("cell reference {reference} is past column XFD"));
    if letters.len() > 3 {
        return Err(out_of_range());
    }
    let idx = letters
        .iter()
        .fold(0usize, |idx, ch| idx * 26 + usize::from(ch.to_ascii_uppercase() - b'A') + 1);
    if idx > MAX_COLUMNS {
        return Err(out_of_range());
    }
    Ok(Some(idx - 1))
}

/// Column of a `<c>` element: its `r` reference, else the next free column.
fn cell_column(reference: Option<&str>, next_col: usize) -> Result<usize, DatasetError> {
    let col = match reference {
        Some(r) => column_index(r)?.unwrap_or(next_col),
        None => next_col,
    };
    if col >= MAX_COLUMNS {
        return Err(malformed(format!("row has more than {MAX_COLUMNS} columns")));
    }
    Ok(col)
}

fn cell_value(kind: Option<&str>, raw: &str, shared: &[String]) -> CellValue {
    match kind {
        Some("s") => raw
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|i| shared.get(i))
            .map_or(CellValue::Missing, |s| CellValue::parse(s)),
        Some("inlineStr" | "str") => CellValue::parse(raw),
        Some("b") => match raw.trim() {
            "1" => CellValue::Number(1.0),
            "0" => CellValue::Number(0.0),
            _ => CellValue::Missing,
        },
        Some("e") => CellValue::Missing,
        Some("d") => CellValue::Text(raw.trim().to_string()),
        _ => match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => CellValue::Number(v),
            _ => CellValue::Missing,
        },
    }
}

/// Sparse sheet content: row number -> (column index -> value).
type Grid = BTreeMap<usize, BTreeMap<usize, CellValue>>;

fn parse_sheet(xml: &str, shared: &[String]) -> Result<Grid, DatasetError> {
    let mut grid = Grid::new();

    let mut row_num = 0usize;
    let mut next_col = 0usize;
    let mut cell_col = 0usize;
    let mut cell_kind: Option<String> = None;
    let mut in_cell = false;
    let mut capture = false;
    let mut buf = String::new();

    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    row_num = attr_value(&e, b"r")?
                        .and_then(|r| r.parse().ok())
                        .unwrap_or(row_num + 1);
                    next_col = 0;
                }
                b"c" => {
                    cell_col = cell_column(attr_value(&e, b"r")?.as_deref(), next_col)?;
                    cell_kind = attr_value(&e, b"t")?;
                    in_cell = true;
                    buf.clear();
                }
                b"v" | b"t" if in_cell => capture = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                // Styled but empty cell
                let col = cell_column(attr_value(&e, b"r")?.as_deref(), next_col)?;
                next_col = col + 1;
            }
            Event::Text(t) if capture => buf.push_str(&t.unescape().map_err(malformed)?),
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => capture = false,
                b"c" if in_cell => {
                    let value = cell_value(cell_kind.as_deref(), &buf, shared);
                    if !value.is_missing() {
                        grid.entry(row_num).or_default().insert(cell_col, value);
                    }
                    next_col = cell_col + 1;
                    in_cell = false;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(grid)
}

fn table_from_grid(mut grid: Grid) -> Result<RawTable, DatasetError> {
    let (_, header) = grid
        .pop_first()
        .ok_or_else(|| malformed("worksheet has no rows"))?;

    let width = header.keys().next_back().map_or(0, |last| last + 1);
    let columns: Vec<String> = (0..width)
        .map(|i| match header.get(&i) {
            Some(CellValue::Text(s)) => s.trim().to_string(),
            Some(other) => other.as_label().unwrap_or_else(|| format!("Unnamed: {i}")),
            None => format!("Unnamed: {i}"),
        })
        .collect();

    let rows = grid
        .into_values()
        .map(|cells| {
            let mut row = vec![CellValue::Missing; width];
            for (col, value) in cells {
                if col < width {
                    row[col] = value;
                }
            }
            row
        })
        .collect();

    Ok(RawTable { columns, rows })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    /// Build a minimal single-sheet workbook.
    pub(crate) fn build_workbook(sheet_xml: &str, shared_xml: Option<&str>) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let opts = FileOptions::default();

        writer.start_file(WORKBOOK_PART, opts).unwrap();
        writer
            .write_all(
                br#"<?xml version="1.0" encoding="UTF-8"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Data" sheetId="1" r:id="rId7"/></sheets></workbook>"#,
            )
            .unwrap();

        writer.start_file(WORKBOOK_RELS_PART, opts).unwrap();
        writer
            .write_all(
                br#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId7" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/data.xml"/>
</Relationships>"#,
            )
            .unwrap();

        writer.start_file("xl/worksheets/data.xml", opts).unwrap();
        writer.write_all(sheet_xml.as_bytes()).unwrap();

        if let Some(shared) = shared_xml {
            writer.start_file(SHARED_STRINGS_PART, opts).unwrap();
            writer.write_all(shared.as_bytes()).unwrap();
        }

        writer.finish().unwrap().into_inner()
    }

    const SHARED: &str = r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="4" uniqueCount="4">
<si><t>MQ2A</t></si><si><t>MQ4A</t></si><si><r><t>out</t></r><r><t>put</t></r></si><si><t>fresh</t></si>
</sst>"#;

    const SHEET: &str = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="C1" t="s"><v>2</v></c></row>
<row r="2"><c r="A2"><v>101.5</v></c><c r="C2" t="s"><v>3</v></c></row>
<row r="3"><c r="A3"><v>99</v></c><c r="B3" t="e"><v>#DIV/0!</v></c><c r="C3" t="inlineStr"><is><t>spoiled</t></is></c></row>
</sheetData></worksheet>"#;

    #[test]
    fn test_parse_workbook() {
        let bytes = build_workbook(SHEET, Some(SHARED));
        let table = parse_xlsx(&bytes).unwrap();
        assert_eq!(table.columns, vec!["MQ2A", "MQ4A", "output"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][0], CellValue::Number(101.5));
        assert_eq!(table.rows[0][1], CellValue::Missing);
        assert_eq!(table.rows[0][2], CellValue::Text("fresh".into()));
        assert_eq!(table.rows[1][1], CellValue::Missing);
        assert_eq!(table.rows[1][2], CellValue::Text("spoiled".into()));
    }

    #[test]
    fn test_column_index() {
        assert_eq!(column_index("A1").unwrap(), Some(0));
        assert_eq!(column_index("Z9").unwrap(), Some(25));
        assert_eq!(column_index("AA10").unwrap(), Some(26));
        assert_eq!(column_index("xfd3").unwrap(), Some(16_383));
        assert_eq!(column_index("12").unwrap(), None);
        assert!(matches!(column_index("XFE1"), Err(DatasetError::Malformed(_))));
        assert!(matches!(column_index("AAAAAAAAAAAAAAA1"), Err(DatasetError::Malformed(_))));
    }

    #[test]
    fn test_oversized_cell_reference_is_malformed() {
        let sheet = r#"<worksheet><sheetData>
<row r="1"><c r="A1" t="inlineStr"><is><t>MQ2A</t></is></c></row>
<row r="2"><c r="AAAAAAAAAAAAAAA2"><v>5</v></c></row>
</sheetData></worksheet>"#;
        let bytes = build_workbook(sheet, None);
        assert!(matches!(parse_xlsx(&bytes), Err(DatasetError::Malformed(_))));

        let wide = r#"<worksheet><sheetData>
<row r="1"><c r="A1" t="inlineStr"><is><t>MQ2A</t></is></c><c r="ZZZ1"><v>1</v></c></row>
</sheetData></worksheet>"#;
        assert!(matches!(parse_xlsx(&build_workbook(wide, None)), Err(DatasetError::Malformed(_))));
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(parse_xlsx(b"MQ2A,output\n1,0\n"), Err(DatasetError::Malformed(_))));
    }
}
