//! Active test reporting: lists the content tests currently running, how many
//! days each still needs and how its best experience compares with the
//! original.

pub mod error;
pub mod experiments;
pub mod settings;
pub mod types;

pub use error::{ReportError, Result};
pub use experiments::collaborators::{Collaborators, SystemClock};
pub use experiments::model::{Report, ReportRow};
pub use experiments::report::{ActiveTestReporter, ActiveTestsQuery};
pub use experiments::stats::SampleSizeEstimator;
pub use experiments::store::ContentRepository;
pub use settings::ReportSettings;
pub use types::{ItemId, ItemUri};
