// ABOUTME: Table reconciliation engine - snapshot, repair, resolve, lock and apply
// ABOUTME: Re-exports the driver and the per-stage building blocks

pub mod applier;
pub mod driver;
pub mod lock;
pub mod repair;
pub mod resolver;
pub mod snapshot;
pub mod stats;

pub use applier::{Applier, Mutation};
pub use driver::Reconciler;
pub use lock::{LockCoordinator, LockState};
pub use repair::{RepairPolicy, TableRepair};
pub use resolver::{resolve, Decision};
pub use snapshot::Snapshot;
pub use stats::{RunStats, TableStats};
