// src/extract.rs

use std::collections::HashMap;

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// A key column plus at least one metric column.
const MIN_COLUMNS: usize = 2;

static TABLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table").expect("selector should parse"));
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("selector should parse"));
static HEADER_CELL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("th").expect("selector should parse"));
static ANY_CELL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("th, td").expect("selector should parse"));

#[derive(Debug, Error, PartialEq)]
pub enum ExtractError {
    #[error("no <table> element found in page")]
    NoTable,
    #[error("table header has {found} columns, need at least {need}")]
    ShortHeader { found: usize, need: usize },
    #[error("body row {row} has {found} cells, header has {expected}")]
    RowArity {
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("duplicate region key {0:?}")]
    DuplicateKey(String),
}

/// One table cell. Numeric when the source text parses as a number after
/// cleaning (thousands separators, leading `+`), otherwise plain text.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl Cell {
    fn parse(raw: &str) -> Self {
        match parse_number(raw) {
            Some(n) => Cell::Number(n),
            None => Cell::Text(raw.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseRow {
    /// Region name, the join key.
    pub name: String,
    /// One cell per metric column, in header order.
    pub cells: Vec<Cell>,
}

/// Row-indexed case table: ordered rows keyed by region name.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseTable {
    columns: Vec<String>,
    rows: Vec<CaseRow>,
    index: HashMap<String, usize>,
}

impl CaseTable {
    /// Metric column names, excluding the key column.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[CaseRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&CaseRow> {
        self.index.get(name).map(|&i| &self.rows[i])
    }

    /// Explicit try-get join: `None` when the region is absent, the column is
    /// unknown, or the cell is not numeric.
    pub fn metric(&self, name: &str, column: &str) -> Option<f64> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.get(name)?.cells.get(col)?.as_number()
    }

    /// Numeric values of one column, in row order. Non-numeric cells are
    /// skipped.
    pub fn column_values<'a>(&'a self, column: &str) -> impl Iterator<Item = f64> + 'a {
        let col = self.columns.iter().position(|c| c == column);
        self.rows
            .iter()
            .filter_map(move |row| row.cells.get(col?)?.as_number())
    }
}

/// Parse the first `<table>` in `html` into a `CaseTable`, keeping at most
/// the first `row_limit` body rows. The first column is the region key.
pub fn extract_table(html: &str, row_limit: usize) -> Result<CaseTable, ExtractError> {
    let document = Html::parse_document(html);
    let table = document.select(&TABLE).next().ok_or(ExtractError::NoTable)?;

    // Header: the first row that carries <th> cells, else the first row.
    let mut header: Option<Vec<String>> = None;
    let mut body_rows: Vec<ElementRef> = Vec::new();
    for row in table.select(&ROW) {
        if header.is_none() {
            let ths: Vec<String> = row
                .select(&HEADER_CELL)
                .map(|c| cell_text(&c))
                .collect();
            if !ths.is_empty() {
                header = Some(ths);
                continue;
            }
            let any: Vec<String> = row.select(&ANY_CELL).map(|c| cell_text(&c)).collect();
            if !any.is_empty() {
                header = Some(any);
                continue;
            }
            // blank filler row before the header
            continue;
        }
        body_rows.push(row);
    }

    let header = header.ok_or(ExtractError::NoTable)?;
    if header.len() < MIN_COLUMNS {
        return Err(ExtractError::ShortHeader {
            found: header.len(),
            need: MIN_COLUMNS,
        });
    }

    let columns: Vec<String> = header[1..].to_vec();
    let mut rows: Vec<CaseRow> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in body_rows {
        if rows.len() == row_limit {
            break;
        }
        let cells: Vec<String> = row.select(&ANY_CELL).map(|c| cell_text(&c)).collect();
        if cells.is_empty() {
            continue;
        }
        if cells.len() != header.len() {
            return Err(ExtractError::RowArity {
                row: rows.len(),
                found: cells.len(),
                expected: header.len(),
            });
        }
        let name = cells[0].clone();
        if index.insert(name.clone(), rows.len()).is_some() {
            return Err(ExtractError::DuplicateKey(name));
        }
        rows.push(CaseRow {
            name,
            cells: cells[1..].iter().map(|c| Cell::parse(c)).collect(),
        });
    }

    Ok(CaseTable {
        columns,
        rows,
        index,
    })
}

/// Concatenated text of a cell with whitespace collapsed.
fn cell_text(cell: &ElementRef) -> String {
    cell.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `"1,234,567"` and `"+5,000"` are numbers; `""` and `"N/A"` are not.
fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .trim_start_matches('+')
        .chars()
        .filter(|&c| c != ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_page(rows: usize) -> String {
        let mut body = String::new();
        for i in 0..rows {
            let cases = format!("{},{:03}", 1 + i, 100 + i);
            body.push_str(&format!(
                "<tr><td>State{i}</td><td>{cases}</td><td>{}</td></tr>\n",
                i * 10
            ));
        }
        format!(
            "<html><body><table>\
             <thead><tr><th>USAState</th><th>TotalCases</th><th>TotalDeaths</th></tr></thead>\
             <tbody>{body}</tbody></table></body></html>"
        )
    }

    #[test]
    fn truncates_to_row_limit_in_source_order() {
        let table = extract_table(&state_page(70), 62).unwrap();
        assert_eq!(table.len(), 62);
        assert_eq!(table.rows()[0].name, "State0");
        assert_eq!(table.rows()[61].name, "State61");
        assert!(table.get("State62").is_none());
    }

    #[test]
    fn keeps_everything_when_under_the_limit() {
        let table = extract_table(&state_page(5), 62).unwrap();
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn extraction_is_deterministic() {
        let html = state_page(70);
        let a = extract_table(&html, 62).unwrap();
        let b = extract_table(&html, 62).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn parses_separators_and_signs() {
        let table = extract_table(&state_page(3), 62).unwrap();
        // "1,100" in the fixture
        assert_eq!(table.metric("State0", "TotalCases"), Some(1100.0));
        assert_eq!(table.metric("State2", "TotalDeaths"), Some(20.0));
        assert_eq!(parse_number("+5,000"), Some(5000.0));
        assert_eq!(parse_number("N/A"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn metric_lookup_misses_are_none() {
        let table = extract_table(&state_page(3), 62).unwrap();
        assert_eq!(table.metric("Guam", "TotalCases"), None);
        assert_eq!(table.metric("State0", "NoSuchColumn"), None);
    }

    #[test]
    fn non_numeric_cells_read_as_text() {
        let html = "<table><tr><th>State</th><th>TotalCases</th></tr>\
                    <tr><td>Atlantis</td><td>N/A</td></tr></table>";
        let table = extract_table(html, 62).unwrap();
        assert_eq!(table.metric("Atlantis", "TotalCases"), None);
        assert_eq!(
            table.get("Atlantis").unwrap().cells[0],
            Cell::Text("N/A".to_string())
        );
    }

    #[test]
    fn page_without_table_fails() {
        assert_eq!(
            extract_table("<html><p>nothing here</p></html>", 62),
            Err(ExtractError::NoTable)
        );
    }

    #[test]
    fn single_column_header_fails() {
        let html = "<table><tr><th>OnlyKey</th></tr><tr><td>A</td></tr></table>";
        assert_eq!(
            extract_table(html, 62),
            Err(ExtractError::ShortHeader { found: 1, need: 2 })
        );
    }

    #[test]
    fn ragged_row_fails() {
        let html = "<table><tr><th>State</th><th>TotalCases</th></tr>\
                    <tr><td>Ohio</td><td>10</td></tr>\
                    <tr><td>Utah</td></tr></table>";
        assert_eq!(
            extract_table(html, 62),
            Err(ExtractError::RowArity {
                row: 1,
                found: 1,
                expected: 2
            })
        );
    }

    #[test]
    fn duplicate_region_fails() {
        let html = "<table><tr><th>State</th><th>TotalCases</th></tr>\
                    <tr><td>Ohio</td><td>10</td></tr>\
                    <tr><td>Ohio</td><td>11</td></tr></table>";
        assert_eq!(
            extract_table(html, 62),
            Err(ExtractError::DuplicateKey("Ohio".to_string()))
        );
    }

    #[test]
    fn headerless_table_uses_first_row_as_header() {
        let html = "<table><tr><td>State</td><td>TotalCases</td></tr>\
                    <tr><td>Ohio</td><td>10</td></tr></table>";
        let table = extract_table(html, 62).unwrap();
        assert_eq!(table.columns(), ["TotalCases".to_string()]);
        assert_eq!(table.metric("Ohio", "TotalCases"), Some(10.0));
    }
}
