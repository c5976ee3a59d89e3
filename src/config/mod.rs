pub mod loader;
pub mod runner;
pub mod schema;
pub mod version;

pub use loader::{discover_job_files, load_from_path, load_from_str, ConfigError};
pub use runner::{check_jobs, run_jobs, JobOutcome, JobReport, RunError, RunMode};
pub use schema::{JobConfig, JobDefinition, Messages, Metadata, ValidationError, ValidationIssue};
pub use version::{read_project_version, ManifestError, VersionError, VersionGate};
