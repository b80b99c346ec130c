pub mod clockify;
pub mod github;
pub mod http;
pub mod traits;

pub use clockify::{
    convert_entries, convert_report, parse_iso8601_duration, ClockifyClient, ClockifyTimeEntry,
    ClockifyUser, ReportResponse,
};
pub use github::{GitHubClient, Repository};
pub use traits::{Commit, CommitSource, DetailedReport, NewTimeEntry, TimeEntry, TimeTracking};
