//! Pipeline components: worker pool, per-cycle context, directory walk, cycle controller.

pub mod context;
pub mod error_handler;
pub mod orchestrator;
pub mod pool;
pub mod walk;

pub use context::SubmitContext;
pub use error_handler::report_skipped_paths;
pub use orchestrator::{Components, CycleController, CycleSettings};
pub use pool::WorkerPool;
pub use walk::{
    ContainerResult, ContainerTally, DirectoryWalker, WalkOutcome, to_outcome_walkdir,
    walkdir_iter,
};
