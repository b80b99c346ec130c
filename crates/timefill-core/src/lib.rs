pub mod config;
pub mod date_range;
pub mod error;
pub mod export;
pub mod gap_analyzer;
pub mod importer;
pub mod scheduler;
pub mod workflow;

pub use config::{Credentials, Settings, CREDENTIALS_FILE};
pub use date_range::{BusinessDay, DateRange, DateRangeResolver, WorkCalendar};
pub use error::{ErrorKind, Result, TimefillError};
pub use export::{normalize_duration, ExportOutcome, ReportExporter, ReportRow, ReportSource, WorkReport};
pub use gap_analyzer::{Gap, GapAnalyzer};
pub use importer::{load_task_csv, ImportReport, Importer};
pub use scheduler::{Schedule, Scheduler};
pub use workflow::{list_overlapping, work_status, WorkStatus, Workflow, WorkflowOutcome, WorkflowStep};
