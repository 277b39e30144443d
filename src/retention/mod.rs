//! Account retention lifecycle.
//!
//! A deleted account moves through `ACTIVE -> PENDING_DELETION ->
//! CLEANUP_COMPLETE`, with `RESTORED` reachable from `PENDING_DELETION`
//! until the retention deadline. The relational rows and the identity
//! record live in independent services, so the purge, the restore, and
//! the sweep are each ordered sequences of idempotent steps with the
//! irreversible one (identity deletion) last.

pub mod purge;
pub mod restore;
pub mod sweep;

pub use purge::{delete_user, find_active_record, latest_record, DeleteOutcome};
pub use restore::{restore_user, RestoreOutcome};
pub use sweep::{run_sweep, SweepReport, SweepScheduler};
