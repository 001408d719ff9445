use crate::error::IpcError;
use log::debug;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

pub const MAX_SEMAPHORES: usize = 1000;

/// Counting semaphore. `wait` blocks the calling thread while the count is zero.
#[derive(Debug)]
pub struct Semaphore {
   count: Mutex<usize>,
   available: Condvar,
}

impl Semaphore {
   pub fn new(count: usize) -> Semaphore {
      Semaphore {
         count: Mutex::new(count),
         available: Condvar::new(),
      }
   }

   pub fn wait(&self) {
      let mut count = self.count.lock();
      while *count == 0 {
         self.available.wait(&mut count);
      }
      *count -= 1;
   }

   /// Takes a token if one is there, without blocking.
   pub fn try_wait(&self) -> bool {
      let mut count = self.count.lock();
      if *count == 0 {
         return false;
      }
      *count -= 1;
      true
   }

   pub fn signal(&self) {
      *self.count.lock() += 1;
      self.available.notify_one();
   }

   pub fn count(&self) -> usize {
      *self.count.lock()
   }

   fn reset(&self, count: usize) {
      *self.count.lock() = count;
   }
}

/// Index of a semaphore inside the [`SemaphorePool`] that allocated it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SemHandle(usize);

/// Fixed array of semaphores handed out front to back. Allocation only moves forward: a
/// semaphore, once given out, belongs to its owner for the life of the pool.
///
/// `wait`, `try_wait`, `signal` and `count` take handles from this pool's own `allocate`. A handle
/// from another pool names an unrelated semaphore, or panics if it is past this pool's capacity.
#[derive(Debug)]
pub struct SemaphorePool {
   slots: Box<[Semaphore]>,
   used: AtomicUsize,
}

impl SemaphorePool {
   pub fn with_capacity(capacity: usize) -> SemaphorePool {
      SemaphorePool {
         slots: (0..capacity).map(|_| Semaphore::new(0)).collect(),
         used: AtomicUsize::new(0),
      }
   }

   pub fn capacity(&self) -> usize {
      self.slots.len()
   }

   pub fn used(&self) -> usize {
      self.used.load(Ordering::SeqCst)
   }

   pub fn allocate(&self, initial: usize) -> Result<SemHandle, IpcError> {
      let capacity = self.capacity();
      let index = self
         .used
         .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
            if used < capacity {
               Some(used + 1)
            } else {
               None
            }
         })
         .map_err(|_| IpcError::CapacityExceeded {
            resource: "semaphore",
            capacity,
         })?;
      self.slots[index].reset(initial);
      Ok(SemHandle(index))
   }

   pub fn wait(&self, handle: SemHandle) {
      self.slots[handle.0].wait();
   }

   pub fn try_wait(&self, handle: SemHandle) -> bool {
      self.slots[handle.0].try_wait()
   }

   pub fn signal(&self, handle: SemHandle) {
      self.slots[handle.0].signal();
   }

   pub fn count(&self, handle: SemHandle) -> usize {
      self.slots[handle.0].count()
   }

   /// Semaphores are never returned to the pool; asking to is a programming error.
   pub fn delete(&self, _handle: SemHandle) -> Result<(), IpcError> {
      Err(IpcError::Unsupported {
         operation: "deleting a semaphore",
      })
   }
}

/// A semaphore pool plus one payload built from it. The payload is created by the first
/// `payload_or_init` call and every later call returns that same payload.
#[derive(Debug)]
pub struct SharedRegion<T> {
   semaphores: SemaphorePool,
   payload: OnceLock<T>,
   init: Mutex<()>,
}

impl<T> SharedRegion<T> {
   pub fn new() -> SharedRegion<T> {
      SharedRegion::with_capacity(MAX_SEMAPHORES)
   }

   pub fn with_capacity(semaphores: usize) -> SharedRegion<T> {
      SharedRegion {
         semaphores: SemaphorePool::with_capacity(semaphores),
         payload: OnceLock::new(),
         init: Mutex::new(()),
      }
   }

   pub fn semaphores(&self) -> &SemaphorePool {
      &self.semaphores
   }

   pub fn payload(&self) -> Option<&T> {
      self.payload.get()
   }

   pub fn payload_or_init<F>(&self, init: F) -> Result<&T, IpcError>
   where
      F: FnOnce(&SemaphorePool) -> Result<T, IpcError>,
   {
      if let Some(payload) = self.payload.get() {
         return Ok(payload);
      }
      let _guard = self.init.lock();
      if let Some(payload) = self.payload.get() {
         return Ok(payload);
      }
      let payload = init(&self.semaphores)?;
      debug!(
         "shared region initialised, {} of {} semaphores in use",
         self.semaphores.used(),
         self.semaphores.capacity()
      );
      Ok(self.payload.get_or_init(|| payload))
   }
}

impl<T> Default for SharedRegion<T> {
   fn default() -> SharedRegion<T> {
      SharedRegion::new()
   }
}

/// Number of logical cores available to this process.
pub fn host_concurrency() -> usize {
   std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}
