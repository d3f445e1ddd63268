//! Background synchronization: tag-triggered work that runs outside the
//! request/response cycle.

mod manager;
mod queue;

pub use manager::{SyncManager, SyncReport, SyncTag};
pub use queue::{generate_action_id, ActionQueue, FileActionQueue, MemoryActionQueue, QueuedAction};
