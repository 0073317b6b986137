pub mod import_pipeline;
pub mod pii_scrubber;
pub mod report_parser;
pub mod report_schema;
pub mod student_matcher;
