//! Counting semaphores carved from one fixed pool, and bounded mailboxes built on top of them.

mod mailbox;
mod region;

pub use mailbox::{MailboxHandle, MailboxPool, MailboxRegion, MAILBOX_SLOTS, MAX_MAILBOXES};
pub use region::{host_concurrency, SemHandle, Semaphore, SemaphorePool, SharedRegion, MAX_SEMAPHORES};
