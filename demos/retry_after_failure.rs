use portable_once::{try_call_once, OnceFlag};

static CALIBRATED: OnceFlag = OnceFlag::new();

fn calibrate(fail: bool) -> Result<(), &'static str> {
   try_call_once(&CALIBRATED, || {
      println!("Calibrating (fail={})...", fail);
      if fail {
         Err("sensor not ready")
      } else {
         Ok(())
      }
   })
}

fn main() {
   // First attempt fails and leaves the flag unset
   match calibrate(true) {
      Ok(()) => panic!("Should have failed"),
      Err(e) => println!("Caught error: {}", e),
   }
   assert!(!CALIBRATED.is_done());

   // Second attempt succeeds
   calibrate(false).expect("Should have succeeded");
   assert!(CALIBRATED.is_done());

   // Subsequent attempts (even failing ones) are no-ops
   calibrate(true).expect("Should not have re-run the initializer");
   println!("Calibration done");
}
