//! Deferred deallocation for objects handed to the audio thread
//!
//! Channel strips and signal sources travel to the audio thread as
//! `basedrop::Owned`. When the graph drops one (track removal, dispose),
//! the free is queued for a background collector thread instead of
//! happening inside the callback.

use basedrop::{Collector, Handle, Owned};
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

/// How often queued drops are reclaimed
const COLLECT_INTERVAL: Duration = Duration::from_millis(50);

static COLLECTOR: OnceLock<Handle> = OnceLock::new();

/// Wrap a value for transfer to the audio thread
///
/// The first call starts the collector thread for the whole process.
pub fn rt_owned<T: Send + 'static>(value: T) -> Owned<T> {
    Owned::new(COLLECTOR.get_or_init(start_collector), value)
}

fn start_collector() -> Handle {
    let mut collector = Collector::new();
    let handle = collector.handle();

    let spawned = thread::Builder::new()
        .name("mixdesk-gc".to_string())
        .spawn(move || {
            log::info!("Graph collector running every {:?}", COLLECT_INTERVAL);
            loop {
                collector.collect();
                thread::sleep(COLLECT_INTERVAL);
            }
        });

    // Without the thread, released strips leak instead of being freed
    if let Err(e) = spawned {
        log::error!("Failed to start graph collector thread: {}", e);
    }
    handle
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::Release);
        }
    }

    #[test]
    fn test_dropped_value_is_reclaimed_off_thread() {
        let dropped = Arc::new(AtomicBool::new(false));
        let owned = rt_owned(DropFlag(Arc::clone(&dropped)));
        drop(owned);

        let deadline = Instant::now() + Duration::from_secs(2);
        while !dropped.load(Ordering::Acquire) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(dropped.load(Ordering::Acquire));
    }
}
