use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use portable_once::{RawMutex, RawSpinMutex, RawSystemMutex, ScopedLock, SpinMutex, SystemMutex};

#[test]
fn test_try_lock_free_then_held() {
   let mutex = Arc::new(RawSystemMutex::INIT);

   let guard = ScopedLock::new(&*mutex);
   {
      let mutex = Arc::clone(&mutex);
      thread::spawn(move || {
         // Held by the main thread; must fail without blocking
         assert!(!mutex.try_lock());
      })
      .join()
      .unwrap();
   }
   drop(guard);

   // Free again: try_lock succeeds and leaves the mutex held
   assert!(mutex.try_lock());
   {
      let mutex = Arc::clone(&mutex);
      thread::spawn(move || {
         assert!(!mutex.try_lock());
      })
      .join()
      .unwrap();
   }
   // SAFETY: held by the try_lock above.
   unsafe { mutex.unlock() };
}

#[test]
fn test_spin_try_lock_free_then_held() {
   let mutex = RawSpinMutex::INIT;

   assert!(mutex.try_lock());
   assert!(!mutex.try_lock());
   // SAFETY: held by the first try_lock.
   unsafe { mutex.unlock() };
   assert!(mutex.try_lock());
   // SAFETY: held by the try_lock above.
   unsafe { mutex.unlock() };
}

#[test]
fn test_scoped_lock_releases_on_normal_exit() {
   let mutex = RawSystemMutex::INIT;

   {
      let _guard = ScopedLock::new(&mutex);
      assert!(!mutex.try_lock());
   }
   assert!(mutex.try_lock());
   // SAFETY: held by the try_lock above.
   unsafe { mutex.unlock() };
}

#[test]
fn test_scoped_lock_releases_on_unwind() {
   let mutex = RawSystemMutex::INIT;

   let result = panic::catch_unwind(AssertUnwindSafe(|| {
      let _guard = ScopedLock::new(&mutex);
      panic!("unwinding through the guard");
   }));
   assert!(result.is_err());

   // The unwind released the lock
   assert!(mutex.try_lock());
   // SAFETY: held by the try_lock above.
   unsafe { mutex.unlock() };
}

#[test]
fn test_adopt_takes_over_release() {
   let mutex = RawSystemMutex::INIT;

   assert!(mutex.try_lock());
   {
      // SAFETY: we hold the mutex via the try_lock above.
      let _guard = unsafe { ScopedLock::adopt(&mutex) };
      assert!(!mutex.try_lock());
   }
   assert!(mutex.try_lock());
   // SAFETY: held by the try_lock above.
   unsafe { mutex.unlock() };
}

#[test]
fn test_host_mutex_contention() {
   let counter = Arc::new(SystemMutex::new(0_usize));

   let threads: Vec<_> = (0..8)
      .map(|_| {
         let counter = Arc::clone(&counter);
         thread::spawn(move || {
            for _ in 0..100 {
               *counter.lock() += 1;
            }
         })
      })
      .collect();

   for handle in threads {
      handle.join().unwrap();
   }
   assert_eq!(*counter.lock(), 800);
}

#[test]
fn test_spin_mutex_contention() {
   let counter = Arc::new(SpinMutex::new(0_usize));

   let threads: Vec<_> = (0..4)
      .map(|_| {
         let counter = Arc::clone(&counter);
         thread::spawn(move || {
            for _ in 0..100 {
               *counter.lock() += 1;
            }
         })
      })
      .collect();

   for handle in threads {
      handle.join().unwrap();
   }
   assert_eq!(*counter.lock(), 400);
}

#[test]
fn test_lock_waits_for_holder() {
   let mutex = Arc::new(RawSystemMutex::INIT);
   let guard = ScopedLock::new(&*mutex);

   let waiter = {
      let mutex = Arc::clone(&mutex);
      thread::spawn(move || {
         // Blocks until the main thread releases
         let _guard = ScopedLock::new(&*mutex);
      })
   };

   // Give the waiter time to park on the mutex, then let it through
   thread::sleep(Duration::from_millis(50));
   drop(guard);
   waiter.join().unwrap();
}
