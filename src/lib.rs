//! Exactly-once initialization over a pluggable mutex.
//!
//! This crate provides a [`call_once`] protocol for running an action exactly
//! once across any number of racing threads, built on a small mutex adapter
//! that targets both hosted platforms and real-time embedded kernels:
//!
//! - [`OnceFlag`]: a `const`-constructible flag pairing a mutex with an
//!   atomic "done" marker, driven by [`call_once`] / [`try_call_once`].
//! - [`RawSystemMutex`]: the mutex backend selected at build time, with any
//!   [`lock_api::RawMutex`] pluggable in its place: futex parking via
//!   `parking_lot_core` on hosted targets (`std` feature), a spinlock on
//!   bare ones.
//! - [`ScopedLock`]: an RAII guard over a raw mutex, releasing on every exit
//!   path, with an adopt mode for locks acquired elsewhere.
//!
//! # Features
//!
//! - **Cheap fast path**: after the first completed call, `call_once` is a
//!   single acquire-ordered load.
//! - **Wait-for-completion**: every caller returns only after the one
//!   execution has fully finished, never merely started.
//! - **Retry on failure**: a panicking or `Err`-returning action leaves the
//!   flag unset; there is no poisoning.
//! - **Static-friendly**: flags need no heap and no runtime initialization,
//!   so they work as globals guarding lazy singleton setup.
//! - **Portable**: `no_std` without the `std` feature; an RTOS kernel mutex
//!   drops in through the [`RawMutex`] seam.
//!
//! # Examples
//!
//! Guarding one-time global setup:
//!
//! ```rust
//! use portable_once::{init_once, OnceFlag};
//! use std::sync::atomic::{AtomicBool, Ordering};
//!
//! static DRIVER_READY: OnceFlag = OnceFlag::new();
//! static READY: AtomicBool = AtomicBool::new(false);
//!
//! fn bring_up_driver() {
//!    READY.store(true, Ordering::Relaxed);
//! }
//!
//! init_once(&DRIVER_READY, bring_up_driver);
//! init_once(&DRIVER_READY, bring_up_driver); // no-op, already done
//! assert!(READY.load(Ordering::Relaxed));
//! ```
//!
//! Forwarding arguments to the action:
//!
//! ```rust
//! use portable_once::{call_once, OnceFlag};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! fn record(slot: &AtomicUsize, value: usize) {
//!    slot.store(value, Ordering::Relaxed);
//! }
//!
//! let flag = OnceFlag::new();
//! let slot = AtomicUsize::new(0);
//!
//! call_once(&flag, record, (&slot, 42));
//! call_once(&flag, record, (&slot, 99)); // ignored
//! assert_eq!(slot.load(Ordering::Relaxed), 42);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

/// Dispatch over the shapes a once-action can take.
mod action;

/// Mutex backends and the scoped lock guard.
mod mutex;

/// The once flag and the call-once protocol.
mod once;

pub use action::{BoundMethod, ForwardReceiver, Method, OnceAction, Plain, ReceiverOnly};
#[cfg(feature = "std")]
pub use mutex::RawHostMutex;
pub use mutex::{
   RawSpinMutex, RawSystemMutex, ScopedLock, SpinMutex, SpinMutexGuard, SystemMutex,
   SystemMutexGuard,
};
pub use once::{call_once, init_once, init_once_arg, try_call_once, OnceFlag, OnceInit};

pub use lock_api::RawMutex;
