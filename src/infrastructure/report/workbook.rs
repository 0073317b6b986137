// ============================================================
// WORKBOOK READER
// ============================================================
// Extract raw cell grids from XLSX/XLS buffers, one grid per sheet

use std::io::Cursor;

use calamine::{Data, DataType, Range, Reader, Xls, Xlsx};

use crate::domain::error::AppError;

use super::{SheetGrid, SourceFormat};

/// Read every sheet of a workbook buffer into raw grids.
///
/// Sheets are returned in workbook order; a source may spread roles or
/// grades across tabs, so none are skipped here (emptiness is the
/// parser's call).
pub fn read_workbook(buffer: &[u8], format: SourceFormat) -> Result<Vec<SheetGrid>, AppError> {
    match format {
        SourceFormat::Xlsx => {
            let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(buffer.to_vec()))
                .map_err(|e| AppError::ParseError(format!("Failed to open workbook: {}", e)))?;
            let names = workbook.sheet_names().to_owned();
            let mut grids = Vec::with_capacity(names.len());
            for name in names {
                let range = workbook.worksheet_range(&name).map_err(|e| {
                    AppError::ParseError(format!("Failed to read worksheet range: {}", e))
                })?;
                grids.push(SheetGrid::new(name, range_to_rows(&range)));
            }
            Ok(grids)
        }
        SourceFormat::Xls => {
            let mut workbook: Xls<_> = Xls::new(Cursor::new(buffer.to_vec()))
                .map_err(|e| AppError::ParseError(format!("Failed to open workbook: {}", e)))?;
            let names = workbook.sheet_names().to_owned();
            let mut grids = Vec::with_capacity(names.len());
            for name in names {
                let range = workbook.worksheet_range(&name).map_err(|e| {
                    AppError::ParseError(format!("Failed to read worksheet range: {}", e))
                })?;
                grids.push(SheetGrid::new(name, range_to_rows(&range)));
            }
            Ok(grids)
        }
        SourceFormat::Delimited => Err(AppError::Internal(
            "Delimited buffers are not workbooks".to_string(),
        )),
    }
}

fn range_to_rows(range: &Range<Data>) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for row in range.rows() {
        let row_data: Vec<String> = row
            .iter()
            .map(|cell| {
                cell.as_string()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("{}", cell))
            })
            .collect();
        rows.push(row_data);
    }
    rows
}
