//! Stack synchronization
//!
//! - Remote status polling (per-branch PR state, fanned out concurrently)
//! - Merge detection over successive snapshots
//! - The sync engine: fetch, rebase with ref propagation, the
//!   conflict-resolution loop, metadata update and cleanup

pub mod detector;
pub mod engine;
pub mod poller;
pub mod state;

pub use detector::{MergeDetector, MergedEvent};
pub use engine::SyncEngine;
pub use poller::{BranchInfo, StatusPoller};
pub use state::{SyncOutcome, SyncPhase, SyncRun, SyncStateFile};
