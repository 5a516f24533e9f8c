use crate::results::{LeadRow, columns};
use calamine::{Reader, open_workbook_auto};
use csv::StringRecord;
use std::collections::HashSet;
use std::error::Error;
use std::fs::File;
use std::path::Path;

/// Write the lead table as CSV, header included even when there are no rows
pub fn write_rows<P: AsRef<Path>>(path: P, rows: &[LeadRow]) -> Result<(), Box<dyn Error>> {
    let path = path.as_ref();
    if is_spreadsheet(path) {
        return Err(format!(
            "cannot write {}: spreadsheets are read-only, export to a .csv path",
            path.display()
        )
        .into());
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(!rows.is_empty())
        .from_path(path)?;

    if rows.is_empty() {
        writer.write_record(columns::ALL)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    ::log::info!("Export: {} ({} rows)", path.display(), rows.len());
    Ok(())
}

/// Read a lead table written by an earlier stage, CSV or `.xlsx`
pub fn read_rows<P: AsRef<Path>>(path: P) -> Result<Vec<LeadRow>, Box<dyn Error>> {
    let path = path.as_ref();
    let table = Table::load(path)?;

    let mut rows = Vec::with_capacity(table.records.len());
    for record in &table.records {
        rows.push(record.deserialize(Some(&table.headers))?);
    }
    ::log::info!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Fails unless the table at `path` has a `column` header
pub fn require_column<P: AsRef<Path>>(path: P, column: &str) -> Result<(), Box<dyn Error>> {
    let path = path.as_ref();
    let table = Table::load(path)?;
    if table.headers.iter().any(|header| header == column) {
        Ok(())
    } else {
        Err(format!("column '{}' missing from {}", column, path.display()).into())
    }
}

fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx") || ext.eq_ignore_ascii_case("xls"))
}

/// Header row plus data rows, whatever the file format
struct Table {
    headers: StringRecord,
    records: Vec<StringRecord>,
}

impl Table {
    fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        if is_spreadsheet(path) {
            Self::from_workbook(path)
        } else {
            Self::from_csv(path)
        }
    }

    fn from_csv(path: &Path) -> Result<Self, Box<dyn Error>> {
        let file =
            File::open(path).map_err(|e| format!("cannot open {}: {}", path.display(), e))?;
        let mut reader = csv::ReaderBuilder::new().from_reader(file);

        let headers = reader.headers()?.clone();
        let records = reader.records().collect::<Result<Vec<_>, _>>()?;
        Ok(Self { headers, records })
    }

    /// First worksheet; its first row holds the column names
    fn from_workbook(path: &Path) -> Result<Self, Box<dyn Error>> {
        let mut workbook = open_workbook_auto(path)
            .map_err(|e| format!("cannot open {}: {}", path.display(), e))?;
        let Some(sheet) = workbook.sheet_names().first().cloned() else {
            return Err(format!("{} has no worksheet", path.display()).into());
        };
        let range = workbook.worksheet_range(&sheet)?;

        let mut rows = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect::<StringRecord>());
        let headers = rows.next().unwrap_or_default();
        let records = rows.collect();
        Ok(Self { headers, records })
    }
}

/// Keep the first row for each offer URL, input order preserved
pub fn dedup_by_url(rows: Vec<LeadRow>) -> Vec<LeadRow> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert(row.offer_url.clone()))
        .collect()
}
