pub mod cli;
pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod schema;
pub mod sources;
pub mod storage;
pub mod sync;

pub use error::{Result, SyncError};
pub use schema::{Record, RecordType, Value};
pub use storage::{MergeOutcome, Storage};
pub use sync::{RunSummary, SyncEngine, SyncOptions, SyncWindow};
