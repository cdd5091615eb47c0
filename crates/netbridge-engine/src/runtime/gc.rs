//! Managed garbage collector controls

use netbridge_sdk::abi::bool32;
use netbridge_sdk::GcCollectionMode;

use crate::runtime::Runtime;

/// Front for the collector entry points
pub struct Gc {
    runtime: Runtime,
}

impl Gc {
    /// Bind to a runtime
    pub fn new(runtime: Runtime) -> Self {
        Gc { runtime }
    }

    /// Full blocking, non-compacting collection of every generation
    pub fn collect(&self) {
        self.collect_with(-1, GcCollectionMode::Default, true, false);
    }

    /// Collect `generation` (-1 for all) with explicit mode and flags
    pub fn collect_with(
        &self,
        generation: i32,
        mode: GcCollectionMode,
        blocking: bool,
        compacting: bool,
    ) {
        tracing::debug!(generation, ?mode, blocking, compacting, "collecting managed garbage");
        unsafe {
            (self.runtime.collect_garbage)(
                generation,
                mode as i32,
                bool32(blocking),
                bool32(compacting),
            )
        }
    }

    /// Block until queued finalizers have run
    pub fn wait_for_pending_finalizers(&self) {
        unsafe { (self.runtime.wait_for_pending_finalizers)() }
    }
}
