//! Upload transport handles, field settings and the staged upload queue.

mod field_path;
mod handle;
mod queue;
mod settings;

pub use field_path::{FieldPath, FIELD_FILE_SEPARATOR, SEGMENT_SEPARATOR};
pub use handle::{TempUpload, UploadHandle, UploadMeta};
pub use queue::{AppliedChange, PendingAction, PendingSummary, PendingUpload, QueueState, UploadQueue};
pub use settings::{check_filename, Blueprint, FieldSettings};
