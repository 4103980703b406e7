//! Mutex backends and the scoped lock guard.
//!
//! This module supplies the mutual-exclusion capability that [`OnceFlag`]
//! builds on. The capability itself is [`lock_api::RawMutex`] (blocking
//! `lock`, non-blocking `try_lock`, `unlock`, and a `const INIT` so flags can
//! live in statics), and two backends implement it:
//!
//! - [`RawHostMutex`] (with the `std` feature): a word-sized mutex that parks
//!   contended threads on `parking_lot_core`'s futex layer.
//! - [`RawSpinMutex`] (always available, the default without `std`): a
//!   test-and-test-and-set spinlock for targets with no parking facility.
//!
//! [`RawSystemMutex`] names whichever backend the build selected. Embedded
//! kernels that expose their native mutex as a `RawMutex` implementation can
//! be plugged in through the generic parameter on [`OnceFlag`] instead; both
//! backends here are merely the defaults.
//!
//! [`OnceFlag`]: crate::OnceFlag

use core::hint;
use core::sync::atomic::{AtomicBool, Ordering};

use lock_api::{GuardSend, RawMutex};

#[cfg(feature = "std")]
use core::sync::atomic::AtomicU8;
#[cfg(feature = "std")]
use parking_lot_core::{DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};

/// Raw mutex for hosted targets, blocking via `parking_lot_core`.
///
/// One byte of state with two flags:
/// - Bit 0: LOCKED - a thread holds the mutex
/// - Bit 1: PARKED - at least one thread is parked waiting for it
///
/// Uncontended lock and unlock are a single compare-exchange; contended paths
/// fall through to the futex-based parking lot keyed on this state byte.
#[cfg(feature = "std")]
pub struct RawHostMutex {
   state: AtomicU8,
}

#[cfg(feature = "std")]
impl RawHostMutex {
   /// Bit flag: a thread currently holds the mutex.
   const LOCKED: u8 = 1;
   /// Bit flag: at least one thread is parked on this mutex.
   const PARKED: u8 = 2;

   #[cold]
   fn lock_slow(&self) {
      loop {
         let state = self.state.load(Ordering::Relaxed);

         // Free again? Take it, keeping PARKED intact for the waiters.
         if state & Self::LOCKED == 0 {
            match self.state.compare_exchange_weak(
               state,
               state | Self::LOCKED,
               Ordering::Acquire,
               Ordering::Relaxed,
            ) {
               Ok(_) => return,
               Err(_) => {
                  hint::spin_loop();
                  continue;
               }
            }
         }

         // Held by someone else; announce that we are about to park.
         if state & Self::PARKED == 0 {
            if self
               .state
               .compare_exchange_weak(
                  state,
                  state | Self::PARKED,
                  Ordering::Relaxed,
                  Ordering::Relaxed,
               )
               .is_err()
            {
               // State moved under us, possibly to unlocked. Retry.
               hint::spin_loop();
               continue;
            }
         }

         // SAFETY: The address passed to park must match the address used for
         // unpark. We consistently use the address of the state byte.
         unsafe {
            // park() re-validates the state before sleeping and only sleeps
            // while the mutex is still held with waiters announced.
            let _ = parking_lot_core::park(
               self.state.as_ptr() as usize,
               || self.state.load(Ordering::Relaxed) == (Self::LOCKED | Self::PARKED),
               || {},
               |_, _| {},
               DEFAULT_PARK_TOKEN,
               None,
            );
         }
         // Woken (or spurious); retry from the top.
      }
   }

   #[cold]
   fn unlock_slow(&self) {
      // SAFETY: See safety comment in `lock_slow`; same key.
      unsafe {
         parking_lot_core::unpark_one(self.state.as_ptr() as usize, |result| {
            // Hand the mutex back while the queue is still locked, clearing
            // PARKED once the last waiter has been woken.
            let new_state = if result.have_more_threads {
               Self::PARKED
            } else {
               0
            };
            self.state.store(new_state, Ordering::Release);
            DEFAULT_UNPARK_TOKEN
         });
      }
   }
}

#[cfg(feature = "std")]
unsafe impl RawMutex for RawHostMutex {
   const INIT: Self = Self {
      state: AtomicU8::new(0),
   };

   type GuardMarker = GuardSend;

   #[inline]
   fn lock(&self) {
      if self
         .state
         .compare_exchange_weak(0, Self::LOCKED, Ordering::Acquire, Ordering::Relaxed)
         .is_err()
      {
         self.lock_slow();
      }
   }

   #[inline]
   fn try_lock(&self) -> bool {
      let mut state = self.state.load(Ordering::Relaxed);
      loop {
         if state & Self::LOCKED != 0 {
            return false;
         }
         match self.state.compare_exchange_weak(
            state,
            state | Self::LOCKED,
            Ordering::Acquire,
            Ordering::Relaxed,
         ) {
            Ok(_) => return true,
            Err(observed) => state = observed,
         }
      }
   }

   #[inline]
   unsafe fn unlock(&self) {
      if self
         .state
         .compare_exchange(Self::LOCKED, 0, Ordering::Release, Ordering::Relaxed)
         .is_ok()
      {
         return;
      }
      self.unlock_slow();
   }
}

/// Raw mutex for targets without a parking facility.
///
/// Test-and-test-and-set with capped exponential backoff: contending threads
/// spin on a plain load until the lock looks free, then race one
/// compare-exchange. Suitable as a stand-in for an RTOS kernel mutex on
/// builds where none is wired in.
pub struct RawSpinMutex {
   locked: AtomicBool,
}

unsafe impl RawMutex for RawSpinMutex {
   const INIT: Self = Self {
      locked: AtomicBool::new(false),
   };

   type GuardMarker = GuardSend;

   #[inline]
   fn lock(&self) {
      let mut backoff = 1_u32;
      while !self.try_lock() {
         while self.locked.load(Ordering::Relaxed) {
            for _ in 0..backoff {
               hint::spin_loop();
            }
            if backoff < 64 {
               backoff <<= 1;
            }
         }
      }
   }

   #[inline]
   fn try_lock(&self) -> bool {
      self
         .locked
         .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
         .is_ok()
   }

   #[inline]
   unsafe fn unlock(&self) {
      self.locked.store(false, Ordering::Release);
   }
}

/// The mutex backend selected for this build.
///
/// With the `std` feature this is [`RawHostMutex`]; without it,
/// [`RawSpinMutex`]. Code that should run on both kinds of target can stay
/// generic over [`RawMutex`] instead and treat this alias as a default.
#[cfg(feature = "std")]
pub type RawSystemMutex = RawHostMutex;

/// The mutex backend selected for this build.
///
/// With the `std` feature this is [`RawHostMutex`]; without it,
/// [`RawSpinMutex`]. Code that should run on both kinds of target can stay
/// generic over [`RawMutex`] instead and treat this alias as a default.
#[cfg(not(feature = "std"))]
pub type RawSystemMutex = RawSpinMutex;

/// A data-carrying mutex over the selected backend.
pub type SystemMutex<T> = lock_api::Mutex<RawSystemMutex, T>;

/// Guard returned by [`SystemMutex::lock`].
pub type SystemMutexGuard<'a, T> = lock_api::MutexGuard<'a, RawSystemMutex, T>;

/// A data-carrying mutex over the spinlock backend.
pub type SpinMutex<T> = lock_api::Mutex<RawSpinMutex, T>;

/// Guard returned by [`SpinMutex::lock`].
pub type SpinMutexGuard<'a, T> = lock_api::MutexGuard<'a, RawSpinMutex, T>;

/// Scope-bound ownership of a raw mutex.
///
/// Construction with [`new`] acquires the mutex; dropping the guard releases
/// it exactly once, on every exit path out of the enclosing scope, including
/// unwinding. [`adopt`] skips the acquisition for callers that already hold
/// the lock.
///
/// The guard borrows the mutex rather than owning it and is deliberately
/// neither `Copy` nor `Clone`: duplicating it would release twice.
///
/// [`new`]: ScopedLock::new
/// [`adopt`]: ScopedLock::adopt
#[must_use = "the mutex is released as soon as the guard is dropped"]
pub struct ScopedLock<'a, R: RawMutex> {
   mutex: &'a R,
}

impl<'a, R: RawMutex> ScopedLock<'a, R> {
   /// Acquires `mutex`, blocking until it is available.
   #[inline]
   pub fn new(mutex: &'a R) -> Self {
      mutex.lock();
      Self { mutex }
   }

   /// Wraps a mutex the calling thread has already locked.
   ///
   /// # Safety
   ///
   /// The caller must hold `mutex`, and no other guard may manage the same
   /// acquisition; the returned guard takes over the release.
   #[inline]
   pub unsafe fn adopt(mutex: &'a R) -> Self {
      Self { mutex }
   }
}

impl<R: RawMutex> Drop for ScopedLock<'_, R> {
   #[inline]
   fn drop(&mut self) {
      // SAFETY: The guard holds the mutex, either by having locked it in
      // `new` or by the caller's assertion in `adopt`.
      unsafe { self.mutex.unlock() };
   }
}
