use std::sync::atomic::{AtomicUsize, Ordering};

use portable_once::{init_once, OnceFlag};

static PAGE_SIZE_PROBED: OnceFlag = OnceFlag::new();
static PAGE_SIZE: AtomicUsize = AtomicUsize::new(0);
static PROBES: AtomicUsize = AtomicUsize::new(0);

fn probe_page_size() {
   // This runs only once, no matter how many threads race here
   PROBES.fetch_add(1, Ordering::Relaxed);
   println!("Probing page size...");
   // Simulate slow hardware discovery
   std::thread::sleep(std::time::Duration::from_millis(50));
   PAGE_SIZE.store(4096, Ordering::Release);
}

fn page_size() -> usize {
   init_once(&PAGE_SIZE_PROBED, probe_page_size);
   PAGE_SIZE.load(Ordering::Acquire)
}

fn main() {
   let threads: Vec<_> = (0..5)
      .map(|_| {
         std::thread::spawn(|| {
            println!("Thread sees page size: {}", page_size());
         })
      })
      .collect();

   for t in threads {
      t.join().unwrap();
   }

   assert_eq!(page_size(), 4096);
   assert_eq!(PROBES.load(Ordering::Relaxed), 1); // Probe ran only once
   println!("Final page size: {}", page_size());
}
