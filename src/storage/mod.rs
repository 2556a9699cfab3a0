pub mod report_writer;
pub mod sqlite;

pub use report_writer::ReportWriter;
pub use sqlite::Storage;
