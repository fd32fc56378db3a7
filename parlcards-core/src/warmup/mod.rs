//! Resumable cache warmup

pub mod handle;
pub mod orchestrator;
pub mod progress;
pub mod state;

pub use handle::WarmupHandle;
pub use orchestrator::{WarmupOptions, WarmupOrchestrator};
pub use progress::{progress_path, WarmupProgress};
pub use state::{WarmupReport, WarmupState, WarmupStatus};
