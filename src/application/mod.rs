pub mod use_cases;

pub use use_cases::import_pipeline::ImportPipeline;
pub use use_cases::pii_scrubber::PiiScrubber;
pub use use_cases::report_parser::ReportParser;
pub use use_cases::student_matcher::match_students;
