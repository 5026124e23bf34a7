//! Report payloads and their Markdown/JSON rendering.

pub mod generator;
pub mod payload;

pub use generator::{generate_json_report, generate_markdown_report, RunReport};
pub use payload::{CompleteReport, PartialReport, ReportInput, ReportSettings};
