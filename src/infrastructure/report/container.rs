/// Container format of an uploaded report buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Office Open XML workbook (zip container).
    Xlsx,
    /// Legacy binary workbook (CFB container).
    Xls,
    /// Anything else is treated as delimited text.
    Delimited,
}

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const CFB_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

impl SourceFormat {
    /// Detect the container from the file signature. Callers may lie about
    /// MIME types, so the declared type is never consulted.
    pub fn detect(buffer: &[u8]) -> SourceFormat {
        if buffer.starts_with(ZIP_MAGIC) {
            SourceFormat::Xlsx
        } else if buffer.starts_with(CFB_MAGIC) {
            SourceFormat::Xls
        } else {
            SourceFormat::Delimited
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Xlsx => "xlsx workbook",
            SourceFormat::Xls => "xls workbook",
            SourceFormat::Delimited => "delimited text",
        }
    }
}
