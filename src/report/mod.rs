pub mod writer;

pub use writer::{log_high_confidence_summary, write_reports, ReportPaths, RunArtifacts};
