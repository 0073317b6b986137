// ============================================================
// DELIMITED TEXT READER
// ============================================================
// Decode CSV-style exports with encoding and delimiter detection

use csv::ReaderBuilder;
use encoding_rs::{UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};

use crate::domain::error::AppError;

use super::SheetGrid;

/// Reader for delimited-text report exports.
///
/// Header handling is left to dialect detection downstream, so every line
/// is returned as a raw row.
pub struct DelimitedReader {
    /// Delimiter character (default: comma)
    delimiter: u8,
}

impl Default for DelimitedReader {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl DelimitedReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Decode and parse a raw buffer with automatic delimiter detection.
    pub fn read_auto_detect(buffer: &[u8]) -> Result<(SheetGrid, u8), AppError> {
        let content = decode_text(buffer);
        let delimiter = Self::detect_delimiter(&content);
        let grid = Self::default().with_delimiter(delimiter).parse_content(&content)?;
        Ok((grid, delimiter))
    }

    /// Parse decoded content into a single raw grid.
    pub fn parse_content(&self, content: &str) -> Result<SheetGrid, AppError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true) // Allow rows with different lengths
            .from_reader(content.as_bytes());

        let mut rows = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                AppError::ParseError(format!("Failed to parse delimited row {}: {}", index + 1, e))
            })?;
            rows.push(record.iter().map(|cell| cell.to_string()).collect());
        }

        Ok(SheetGrid::new("report", rows))
    }

    /// Detect delimiter from content (comma, semicolon, tab, pipe)
    pub fn detect_delimiter(content: &str) -> u8 {
        let candidates = [b',', b';', b'\t', b'|'];

        let mut best_delimiter = b',';
        let mut best_score = 0.0f32;

        for &delimiter in &candidates {
            let sample_lines: Vec<_> = content.lines().take(10).collect();

            if sample_lines.is_empty() {
                continue;
            }

            let mut field_counts = Vec::new();
            for line in &sample_lines {
                let count = line.chars().filter(|&c| c as u8 == delimiter).count();
                field_counts.push(count);
            }

            // Score by consistency (low standard deviation) and frequency
            if !field_counts.is_empty() {
                let avg = field_counts.iter().sum::<usize>() as f32 / field_counts.len() as f32;
                let variance = field_counts
                    .iter()
                    .map(|&x| (x as f32 - avg).powi(2))
                    .sum::<f32>()
                    / field_counts.len() as f32;

                let score = avg / (1.0 + variance.sqrt());

                if score > best_score {
                    best_score = score;
                    best_delimiter = delimiter;
                }
            }
        }

        best_delimiter
    }
}

/// Decode a text buffer: BOM sniffing first, then UTF-8, then the
/// Windows-1252 fallback common in case-management exports.
pub fn decode_text(buffer: &[u8]) -> String {
    if buffer.starts_with(&[0xEF, 0xBB, 0xBF]) {
        let (decoded, _, _) = UTF_8.decode(&buffer[3..]);
        return decoded.into_owned();
    }
    if buffer.starts_with(&[0xFF, 0xFE]) {
        let (decoded, _, _) = UTF_16LE.decode(&buffer[2..]);
        return decoded.into_owned();
    }
    if buffer.starts_with(&[0xFE, 0xFF]) {
        let (decoded, _, _) = UTF_16BE.decode(&buffer[2..]);
        return decoded.into_owned();
    }

    if let Ok(utf8) = std::str::from_utf8(buffer) {
        return utf8.to_string();
    }

    let (decoded, _, _) = WINDOWS_1252.decode(buffer);
    decoded.into_owned()
}
