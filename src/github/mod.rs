//! Review-platform integration, via the `gh` command-line client

pub mod client;
pub mod metadata;
pub mod pr;

pub use client::GhClient;
pub use metadata::{PrMetadataSynchronizer, PrSyncReport};
pub use pr::{PrStatus, PullRequest};
