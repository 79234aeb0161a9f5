use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use calamine::{Data, Range, Reader, Sheets};

use crate::error::{Result, SeedError};
use crate::normalize::display_text;

static EMPTY: Data = Data::Empty;

// ---------------------------------------------------------------------------
// Workbook
// ---------------------------------------------------------------------------

pub struct Workbook {
    sheets: Sheets<BufReader<File>>,
    names: Vec<String>,
}

impl Workbook {
    pub fn open(path: &Path) -> Result<Self> {
        let sheets = calamine::open_workbook_auto(path)?;
        let names = sheets.sheet_names().to_vec();
        log::info!("Opened {} ({} sheets: {:?})", path.display(), names.len(), names);
        Ok(Self { sheets, names })
    }

    pub fn sheet_names(&self) -> &[String] {
        &self.names
    }

    /// Loads the first candidate sheet that exists.
    pub fn sheet(&mut self, candidates: &[String]) -> Result<Sheet> {
        self.optional_sheet(candidates)?
            .ok_or_else(|| SeedError::MissingSheet(candidates.join(" / ")))
    }

    pub fn optional_sheet(&mut self, candidates: &[String]) -> Result<Option<Sheet>> {
        let Some(name) = find_sheet_name(&self.names, candidates) else {
            return Ok(None);
        };
        let name = name.to_string();
        let range = self.sheets.worksheet_range(&name)?;
        let sheet = Sheet::from_range(name, &range);
        log::info!("Loaded sheet '{}' ({} rows)", sheet.name, sheet.rows.len());
        Ok(Some(sheet))
    }
}

/// Exact names win; otherwise names are compared with trailing whitespace
/// removed, so "Estratti " and "Estratti" find each other.
pub fn find_sheet_name<'a>(names: &'a [String], candidates: &[String]) -> Option<&'a str> {
    candidates
        .iter()
        .find_map(|c| names.iter().find(|n| *n == c))
        .or_else(|| {
            candidates.iter().find_map(|c| {
                names
                    .iter()
                    .find(|n| n.trim_end() == c.trim_end())
            })
        })
        .map(String::as_str)
}

// ---------------------------------------------------------------------------
// Sheet
// ---------------------------------------------------------------------------

/// A sheet's cells addressed from A1, whatever the used range says.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    rows: Vec<Vec<Data>>,
}

impl Sheet {
    pub fn from_range(name: String, range: &Range<Data>) -> Self {
        let (row_off, col_off) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));
        let mut rows = vec![Vec::new(); row_off];
        for row in range.rows() {
            let mut cells = vec![Data::Empty; col_off];
            cells.extend(row.iter().cloned());
            rows.push(cells);
        }
        Self { name, rows }
    }

    #[cfg(test)]
    pub fn from_rows(name: &str, rows: Vec<Vec<Data>>) -> Self {
        Self {
            name: name.to_string(),
            rows,
        }
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn row(&self, index: usize) -> Option<&[Data]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn rows_from(&self, first: usize) -> impl Iterator<Item = &[Data]> {
        self.rows.iter().skip(first).map(Vec::as_slice)
    }
}

// ---------------------------------------------------------------------------
// Column map
// ---------------------------------------------------------------------------

/// Field name -> column index, resolved once per sheet before any row is read.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    columns: HashMap<&'static str, usize>,
}

impl ColumnMap {
    /// Fields laid out left to right from column A. The sheet must be at
    /// least as wide as the field list (its header row normally ensures it).
    pub fn positional(sheet: &Sheet, fields: &[&'static str]) -> Result<Self> {
        let width = sheet.width();
        if let Some(missing) = fields.get(width) {
            return Err(SeedError::MissingColumn {
                sheet: sheet.name.clone(),
                column: format!("{missing} (column {})", width + 1),
            });
        }
        let columns = fields.iter().enumerate().map(|(i, f)| (*f, i)).collect();
        Ok(Self { columns })
    }

    /// Fields located by header text on `header_row` (trimmed, case-insensitive).
    pub fn from_header(
        sheet: &Sheet,
        header_row: usize,
        fields: &[(&'static str, &str)],
    ) -> Result<Self> {
        let headers: Vec<String> = sheet
            .row(header_row)
            .unwrap_or_default()
            .iter()
            .map(|c| display_text(c).unwrap_or_default().to_lowercase())
            .collect();
        let mut columns = HashMap::new();
        for (field, header) in fields {
            let wanted = header.trim().to_lowercase();
            let idx = headers.iter().position(|h| *h == wanted).ok_or_else(|| {
                SeedError::MissingColumn {
                    sheet: sheet.name.clone(),
                    column: header.to_string(),
                }
            })?;
            columns.insert(*field, idx);
        }
        Ok(Self { columns })
    }

    /// Short rows read as empty cells.
    pub fn get<'a>(&self, row: &'a [Data], field: &str) -> &'a Data {
        self.columns
            .get(field)
            .and_then(|&i| row.get(i))
            .unwrap_or(&EMPTY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Data {
        Data::String(v.to_string())
    }

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_find_sheet_name_prefers_exact() {
        let sheets = names(&["Estratti", "Estratti "]);
        assert_eq!(find_sheet_name(&sheets, &names(&["Estratti "])), Some("Estratti "));
    }

    #[test]
    fn test_find_sheet_name_tolerates_trailing_space() {
        let sheets = names(&["Subscription ", "Pagamenti"]);
        assert_eq!(
            find_sheet_name(&sheets, &names(&["Subscription"])),
            Some("Subscription ")
        );
        assert_eq!(find_sheet_name(&sheets, &names(&["VAT register new"])), None);
    }

    #[test]
    fn test_positional_map() {
        let sheet = Sheet::from_rows("Test", vec![vec![s("a"), s("b"), s("c")], vec![s("1")]]);
        let map = ColumnMap::positional(&sheet, &["first", "second", "third"]).unwrap();
        let row = sheet.row(1).unwrap();
        assert_eq!(map.get(row, "first"), &s("1"));
        assert_eq!(map.get(row, "third"), &Data::Empty);
    }

    #[test]
    fn test_positional_map_rejects_narrow_sheet() {
        let sheet = Sheet::from_rows("Narrow", vec![vec![s("a"), s("b")]]);
        let err = ColumnMap::positional(&sheet, &["first", "second", "third"]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Narrow"), "{msg}");
        assert!(msg.contains("third"), "{msg}");
    }

    #[test]
    fn test_header_map() {
        let sheet = Sheet::from_rows(
            "Pagamenti",
            vec![
                vec![s("NOTE PAGAMENTI"), s(" cliente "), s("Costo Servizio")],
                vec![s("late"), s("Acme"), Data::Float(500.0)],
            ],
        );
        let map = ColumnMap::from_header(
            &sheet,
            0,
            &[("company", "CLIENTE"), ("cost", "COSTO SERVIZIO"), ("notes", "NOTE PAGAMENTI")],
        )
        .unwrap();
        let row = sheet.row(1).unwrap();
        assert_eq!(map.get(row, "company"), &s("Acme"));
        assert_eq!(map.get(row, "cost"), &Data::Float(500.0));
        assert_eq!(map.get(row, "notes"), &s("late"));
    }

    #[test]
    fn test_header_map_reports_missing_column() {
        let sheet = Sheet::from_rows("Pagamenti", vec![vec![s("CLIENTE")]]);
        let err = ColumnMap::from_header(&sheet, 0, &[("start", "DATA AVVIO")]).unwrap_err();
        assert!(matches!(
            err,
            SeedError::MissingColumn { ref sheet, ref column } if sheet == "Pagamenti" && column == "DATA AVVIO"
        ));
    }

    #[test]
    fn test_rows_from_skips_header() {
        let sheet = Sheet::from_rows("T", vec![vec![s("h")], vec![s("a")], vec![s("b")]]);
        let rows: Vec<_> = sheet.rows_from(1).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(sheet.width(), 1);
    }
}
