use super::region::{SemHandle, SemaphorePool, SharedRegion, MAX_SEMAPHORES};
use crate::error::IpcError;
use log::{trace, warn};
use parking_lot::Mutex;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const MAX_MAILBOXES: usize = 30;

/// Unread messages a single mailbox can hold before `send` blocks.
pub const MAILBOX_SLOTS: usize = 8;

struct Ring<M> {
   data: [M; MAILBOX_SLOTS],
   next_in: usize,
   next_out: usize,
}

impl<M: Copy> Ring<M> {
   fn push(&mut self, message: M) {
      self.data[self.next_in] = message;
      self.next_in = (self.next_in + 1) % MAILBOX_SLOTS;
   }

   fn pop(&mut self) -> M {
      let message = self.data[self.next_out];
      self.next_out = (self.next_out + 1) % MAILBOX_SLOTS;
      message
   }
}

/// Bounded ring of messages guarded by three semaphores: items, free space and the ring itself.
pub struct Mailbox<M> {
   ring: UnsafeCell<Ring<M>>,
   item_available: SemHandle,
   space_available: SemHandle,
   mutex: SemHandle,
   generation: AtomicUsize,
}

// SAFETY: the ring is only reached through `Mailbox::locked`, which holds the mailbox's mutex
// semaphore for the whole access.
unsafe impl<M: Send> Sync for Mailbox<M> {}

impl<M: Copy + Default> Mailbox<M> {
   fn config(semaphores: &SemaphorePool) -> Result<Mailbox<M>, IpcError> {
      Ok(Mailbox {
         ring: UnsafeCell::new(Ring {
            data: [M::default(); MAILBOX_SLOTS],
            next_in: 0,
            next_out: 0,
         }),
         item_available: semaphores.allocate(0)?,
         space_available: semaphores.allocate(MAILBOX_SLOTS)?,
         mutex: semaphores.allocate(1)?,
         generation: AtomicUsize::new(0),
      })
   }

   fn locked<R>(&self, semaphores: &SemaphorePool, f: impl FnOnce(&mut Ring<M>) -> R) -> R {
      semaphores.wait(self.mutex);
      // SAFETY: holding the mutex semaphore, so this is the only live reference to the ring
      let result = f(unsafe { &mut *self.ring.get() });
      semaphores.signal(self.mutex);
      result
   }
}

/// The fixed set of mailboxes, parked on a free list until acquired.
pub struct MailboxPool<M> {
   mailboxes: Box<[Mailbox<M>]>,
   free: Mutex<Vec<usize>>,
}

impl<M: Copy + Default> MailboxPool<M> {
   pub fn preallocate(semaphores: &SemaphorePool, count: usize) -> Result<MailboxPool<M>, IpcError> {
      let mailboxes = (0..count)
         .map(|_| Mailbox::config(semaphores))
         .collect::<Result<Vec<_>, _>>()?;
      Ok(MailboxPool {
         mailboxes: mailboxes.into_boxed_slice(),
         // popped from the back, so mailbox 0 goes out first
         free: Mutex::new((0..count).rev().collect()),
      })
   }

   pub fn capacity(&self) -> usize {
      self.mailboxes.len()
   }

   pub fn available(&self) -> usize {
      self.free.lock().len()
   }
}

/// Names one acquisition of one mailbox. Once the mailbox is released every handle to it goes
/// stale, including copies, so a late `send` cannot land in the next owner's mailbox.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MailboxHandle {
   index: usize,
   generation: usize,
}

/// A shared region whose payload is a mailbox pool. The pool (and the semaphores behind it) is
/// only built on the first `acquire`.
pub struct MailboxRegion<M> {
   region: SharedRegion<MailboxPool<M>>,
   pool_size: usize,
}

impl<M: Copy + Default + Send> MailboxRegion<M> {
   pub fn new() -> MailboxRegion<M> {
      MailboxRegion::with_capacity(MAX_SEMAPHORES, MAX_MAILBOXES)
   }

   pub fn with_capacity(semaphores: usize, mailboxes: usize) -> MailboxRegion<M> {
      MailboxRegion {
         region: SharedRegion::with_capacity(semaphores),
         pool_size: mailboxes,
      }
   }

   pub fn semaphores(&self) -> &SemaphorePool {
      self.region.semaphores()
   }

   fn pool(&self) -> Result<&MailboxPool<M>, IpcError> {
      let pool_size = self.pool_size;
      self
         .region
         .payload_or_init(|semaphores| MailboxPool::preallocate(semaphores, pool_size))
   }

   fn open(&self, handle: MailboxHandle) -> Result<&Mailbox<M>, IpcError> {
      let stale = IpcError::StaleHandle { index: handle.index };
      let mailbox = self
         .region
         .payload()
         .and_then(|pool| pool.mailboxes.get(handle.index))
         .ok_or_else(|| stale.clone())?;
      if mailbox.generation.load(Ordering::SeqCst) != handle.generation {
         return Err(stale);
      }
      Ok(mailbox)
   }

   pub fn acquire(&self) -> Result<MailboxHandle, IpcError> {
      let pool = self.pool()?;
      let index = pool.free.lock().pop().ok_or(IpcError::CapacityExceeded {
         resource: "mailbox",
         capacity: pool.capacity(),
      })?;
      let generation = pool.mailboxes[index].generation.load(Ordering::SeqCst);
      trace!("acquired mailbox {} (generation {})", index, generation);
      Ok(MailboxHandle { index, generation })
   }

   /// Returns the mailbox to the free list. Any messages still unread are dropped, so the next
   /// owner starts with an empty mailbox. Nobody may be blocked in `send` or `receive` on it.
   pub fn release(&self, handle: MailboxHandle) -> Result<(), IpcError> {
      let mailbox = self.open(handle)?;
      let semaphores = self.semaphores();
      let pool = self.pool()?;

      let mut free = pool.free.lock();
      // a second release of the same handle sees the bumped generation and fails here
      if mailbox
         .generation
         .compare_exchange(handle.generation, handle.generation.wrapping_add(1), Ordering::SeqCst, Ordering::SeqCst)
         .is_err()
      {
         return Err(IpcError::StaleHandle { index: handle.index });
      }

      let mut discarded = 0;
      while semaphores.try_wait(mailbox.item_available) {
         mailbox.locked(semaphores, |ring| ring.pop());
         semaphores.signal(mailbox.space_available);
         discarded += 1;
      }
      if discarded > 0 {
         warn!("mailbox {} released with {} unread messages", handle.index, discarded);
      }

      free.push(handle.index);
      trace!("released mailbox {}", handle.index);
      Ok(())
   }

   /// Blocks while the mailbox is full.
   pub fn send(&self, handle: MailboxHandle, message: M) -> Result<(), IpcError> {
      let mailbox = self.open(handle)?;
      let semaphores = self.semaphores();
      semaphores.wait(mailbox.space_available);
      mailbox.locked(semaphores, |ring| ring.push(message));
      semaphores.signal(mailbox.item_available);
      Ok(())
   }

   /// Blocks while the mailbox is empty.
   pub fn receive(&self, handle: MailboxHandle) -> Result<M, IpcError> {
      let mailbox = self.open(handle)?;
      let semaphores = self.semaphores();
      semaphores.wait(mailbox.item_available);
      let message = mailbox.locked(semaphores, |ring| ring.pop());
      semaphores.signal(mailbox.space_available);
      Ok(message)
   }
}

impl<M: Copy + Default + Send> Default for MailboxRegion<M> {
   fn default() -> MailboxRegion<M> {
      MailboxRegion::new()
   }
}
