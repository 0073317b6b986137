// ============================================================
// REPORT INFRASTRUCTURE LAYER
// ============================================================
// Container detection, encoding/delimiter handling, and raw grid
// extraction from workbook or delimited-text buffers

mod container;
mod delimited;
mod workbook;

pub use container::SourceFormat;
pub use delimited::DelimitedReader;
pub use workbook::read_workbook;

/// One sheet's worth of raw cells. Delimited sources produce a single
/// grid; workbooks produce one per non-empty sheet.
#[derive(Debug, Clone)]
pub struct SheetGrid {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl SheetGrid {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows
            .iter()
            .all(|row| row.iter().all(|cell| cell.trim().is_empty()))
    }
}
