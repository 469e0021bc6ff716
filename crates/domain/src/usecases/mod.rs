//! Application use cases / business logic

pub mod sync_run;
pub mod transform;

pub use sync_run::{SyncError, SyncRun, SyncRunConfig};
pub use transform::{ContentTransformer, TransformConfig};
