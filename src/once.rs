//! The once flag and the call-once protocol.
//!
//! A [`OnceFlag`] pairs a raw mutex with an atomic "done" marker. Any number
//! of threads may race [`call_once`] against the same flag; the action runs
//! to completion exactly once, and every caller (including the one that ran
//! it) returns only after that completion.
//!
//! The protocol is double-checked locking. After the first completed call,
//! the only cost is a single acquire-ordered load; the mutex is touched again
//! only if the flag is observed unset. The re-check under the lock is what
//! closes the race the unsynchronized fast-path read opens.
//!
//! An action that panics (or, for [`try_call_once`], returns `Err`) leaves
//! the flag unset: the lock is released as the failure propagates, and a
//! later call may run another action. There is no poisoning.

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

use lock_api::RawMutex;

use crate::action::OnceAction;
use crate::mutex::{RawSystemMutex, ScopedLock};

/// Tracks whether a guarded action has run to completion.
///
/// The flag is `const`-constructible with no heap allocation and no
/// initialization-order dependency, so it is safe to use as a `static`
/// guarding global one-time setup. The mutex backend defaults to
/// [`RawSystemMutex`] and can be overridden with any [`RawMutex`]
/// implementation, such as an RTOS kernel's native mutex.
///
/// ```
/// use portable_once::{call_once, OnceFlag};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// static TABLES_BUILT: OnceFlag = OnceFlag::new();
/// static BUILDS: AtomicUsize = AtomicUsize::new(0);
///
/// fn build_tables() {
///    BUILDS.fetch_add(1, Ordering::Relaxed);
/// }
///
/// call_once(&TABLES_BUILT, build_tables, ());
/// call_once(&TABLES_BUILT, build_tables, ());
/// assert_eq!(BUILDS.load(Ordering::Relaxed), 1);
/// ```
pub struct OnceFlag<R = RawSystemMutex> {
   mutex: R,
   done: AtomicBool,
}

impl OnceFlag {
   /// Creates a flag whose action has not yet run, over the build's default
   /// mutex backend.
   #[inline]
   #[must_use]
   pub const fn new() -> Self {
      Self::with_backend()
   }
}

impl<R: RawMutex> OnceFlag<R> {
   /// Creates a flag whose action has not yet run, over the mutex backend
   /// `R`.
   #[inline]
   #[must_use]
   pub const fn with_backend() -> Self {
      Self {
         mutex: R::INIT,
         done: AtomicBool::new(false),
      }
   }

   /// Whether the guarded action has run to completion.
   ///
   /// This method never blocks. A `false` answer may be stale by the time it
   /// is observed; `true` is final.
   #[inline]
   pub fn is_done(&self) -> bool {
      self.done.load(Ordering::Acquire)
   }

   /// Slow path of [`call_once`]: serialize, re-check, run, mark done.
   #[cold]
   fn run<S, C>(&self, action: C, args: C::Args)
   where
      C: OnceAction<S>,
   {
      let _guard = ScopedLock::new(&self.mutex);

      // Another thread may have completed the action between our fast-path
      // read and acquiring the mutex.
      if self.done.load(Ordering::Acquire) {
         return;
      }

      action.invoke(args);

      // Release ordering makes the action's effects visible to any thread
      // whose fast-path Acquire load sees `true`. If `invoke` panicked we
      // never get here, and the guard has already released the mutex on the
      // way out.
      self.done.store(true, Ordering::Release);
   }

   /// Slow path of [`try_call_once`]. `Err` propagates with the flag unset.
   #[cold]
   fn try_run<E, F>(&self, init: F) -> Result<(), E>
   where
      F: FnOnce() -> Result<(), E>,
   {
      let _guard = ScopedLock::new(&self.mutex);

      if self.done.load(Ordering::Acquire) {
         return Ok(());
      }

      init()?;
      self.done.store(true, Ordering::Release);
      Ok(())
   }
}

impl<R: RawMutex> Default for OnceFlag<R> {
   /// Equivalent to [`OnceFlag::with_backend`].
   #[inline]
   fn default() -> Self {
      Self::with_backend()
   }
}

impl<R> fmt::Debug for OnceFlag<R> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("OnceFlag")
         .field("done", &self.done.load(Ordering::Acquire))
         .finish_non_exhaustive()
   }
}

/// Runs `action` with `args` exactly once per `flag`.
///
/// Across any number of concurrent calls sharing one flag, exactly one call
/// runs the action; every call returns only after that execution has fully
/// completed. Calls made after completion return immediately without taking
/// the mutex.
///
/// The action may be any closure, function item, or function pointer taking
/// up to four arguments, or a [`BoundMethod`] pairing a method with its
/// receiver. Arguments are passed as a tuple:
///
/// ```
/// use portable_once::{call_once, OnceFlag};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// fn seed(total: &AtomicUsize, by: usize) {
///    total.fetch_add(by, Ordering::Relaxed);
/// }
///
/// let seeded = OnceFlag::new();
/// let total = AtomicUsize::new(0);
///
/// call_once(&seeded, seed, (&total, 7));
/// call_once(&seeded, seed, (&total, 7));
/// assert_eq!(total.load(Ordering::Relaxed), 7);
/// ```
///
/// # Panics
///
/// A panic in the action propagates to the caller that ran it. The flag stays
/// unset, so a subsequent call may run an action again; other callers blocked
/// on the mutex simply find the flag unset and one of them retries.
///
/// [`BoundMethod`]: crate::BoundMethod
#[inline]
pub fn call_once<R, S, C>(flag: &OnceFlag<R>, action: C, args: C::Args)
where
   R: RawMutex,
   C: OnceAction<S>,
{
   if flag.done.load(Ordering::Acquire) {
      return;
   }
   flag.run(action, args);
}

/// Fallible form of [`call_once`].
///
/// If the flag is unset, runs `init`; on `Ok(())` the flag is marked done, on
/// `Err` the error propagates unchanged and the flag stays unset so a later
/// call may retry. Once the flag is set, returns `Ok(())` without running
/// anything.
///
/// ```
/// use portable_once::{try_call_once, OnceFlag};
///
/// let loaded = OnceFlag::new();
///
/// let attempt: Result<(), &str> = try_call_once(&loaded, || Err("device not ready"));
/// assert_eq!(attempt, Err("device not ready"));
/// assert!(!loaded.is_done());
///
/// let attempt: Result<(), &str> = try_call_once(&loaded, || Ok(()));
/// assert_eq!(attempt, Ok(()));
/// assert!(loaded.is_done());
/// ```
#[inline]
pub fn try_call_once<R, E, F>(flag: &OnceFlag<R>, init: F) -> Result<(), E>
where
   R: RawMutex,
   F: FnOnce() -> Result<(), E>,
{
   if flag.done.load(Ordering::Acquire) {
      return Ok(());
   }
   flag.try_run(init)
}

/// Runs a plain function exactly once per `flag`.
///
/// Thin wrapper over [`call_once`] for the common case of guarding lazy
/// static initialization with a zero-argument function pointer.
#[inline]
pub fn init_once<R: RawMutex>(flag: &OnceFlag<R>, init: fn()) {
   call_once(flag, init, ());
}

/// Runs `init(arg)` exactly once per `flag`.
///
/// Like [`init_once`], but for initializers that take a typed argument.
#[inline]
pub fn init_once_arg<R: RawMutex, A>(flag: &OnceFlag<R>, init: fn(&A), arg: &A) {
   call_once(flag, init, (arg,));
}

/// Object-style wrapper around a [`OnceFlag`].
///
/// For callers that prefer `state.init(f, arg)` over the free functions. If
/// `init` has not been called before by any thread, it runs `f(arg)`;
/// otherwise it waits until the prior invocation has finished, then returns.
///
/// ```
/// use portable_once::OnceInit;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// fn register(count: &AtomicUsize) {
///    count.fetch_add(1, Ordering::Relaxed);
/// }
///
/// let registered = OnceInit::new();
/// let count = AtomicUsize::new(0);
///
/// registered.init(register, &count);
/// registered.init(register, &count);
/// assert_eq!(count.load(Ordering::Relaxed), 1);
/// ```
pub struct OnceInit<R = RawSystemMutex> {
   flag: OnceFlag<R>,
}

impl OnceInit {
   /// Creates a wrapper whose initializer has not yet run, over the build's
   /// default mutex backend.
   #[inline]
   #[must_use]
   pub const fn new() -> Self {
      Self::with_backend()
   }
}

impl<R: RawMutex> OnceInit<R> {
   /// Creates a wrapper whose initializer has not yet run, over the mutex
   /// backend `R`.
   #[inline]
   #[must_use]
   pub const fn with_backend() -> Self {
      Self {
         flag: OnceFlag::with_backend(),
      }
   }

   /// Runs `init(arg)` exactly once across all callers of this object.
   #[inline]
   pub fn init<A>(&self, init: fn(&A), arg: &A) {
      init_once_arg(&self.flag, init, arg);
   }

   /// Whether the initializer has run to completion.
   #[inline]
   pub fn is_done(&self) -> bool {
      self.flag.is_done()
   }
}

impl<R: RawMutex> Default for OnceInit<R> {
   /// Equivalent to [`OnceInit::with_backend`].
   #[inline]
   fn default() -> Self {
      Self::with_backend()
   }
}

impl<R> fmt::Debug for OnceInit<R> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("OnceInit")
         .field("done", &self.flag.done.load(Ordering::Acquire))
         .finish_non_exhaustive()
   }
}
