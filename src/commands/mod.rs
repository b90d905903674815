//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod inspect;
pub mod models;
pub mod replay;
pub mod sync;
pub mod utils;

// Re-export main command functions
pub use inspect::execute_inspect;
pub use models::{InspectArgs, ReplayArgs, SyncArgs};
pub use replay::{aggregate, execute_replay, print_report_summary, validate_args};
pub use sync::{execute_sync, validate_sync_args};
pub use utils::{display_schema, display_version};
