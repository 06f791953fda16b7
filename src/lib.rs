// Partitioned signal-archive retrieval and alignment library.
//
// Retrieves time-stamped samples of named signals from a partitioned
// historical archive and aligns several retrieved series onto a common
// timeline. The archive backend and the signal catalog are collaborators
// behind traits; this crate owns the partition planning, the
// bounded-concurrency fetch, the value codec and the alignment algorithms.
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use application::aligner::{correlate, fill};
pub use application::archive_repository::{ArchiveBackend, ProgressSink, SignalCatalog};
pub use application::retrieval_service::{ExtractMode, RetrievalService};
pub use domain::descriptor::{Access, ScalarKind, Shape, SignalDescriptor, SignalName};
pub use domain::partition::{DAY_US, PartitionWindow, plan};
pub use domain::sample::{Quality, RawRow, Sample};
pub use domain::series::Series;
pub use domain::value::{Value, state_label};
pub use error::{ArchiveError, BackendError};
pub use infrastructure::config::{ArchiveConfig, ArchiveSettings, load_archive_config};
pub use infrastructure::http_backend::HttpArchiveBackend;
