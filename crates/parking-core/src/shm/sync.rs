//! Process-shared mutex and condition variable, laid out inline so the same bytes are valid
//! synchronization state in every process that maps them.
//!
//! This mirrors the original C implementation's use of `pthread_mutexattr_setpshared` /
//! `pthread_condattr_setpshared` directly over `libc::pthread_mutex_t` / `libc::pthread_cond_t`,
//! rather than `parking_lot`'s primitives (which park threads through a process-local table and
//! cannot be shared across address spaces).

use crate::error::{init_failure, Result};
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;

/// A `pthread_mutex_t` configured `PTHREAD_PROCESS_SHARED`, valid for the lifetime of the
/// mapping it lives in.
#[repr(C)]
pub struct ProcessMutex {
    inner: UnsafeCell<libc::pthread_mutex_t>,
}

unsafe impl Send for ProcessMutex {}
unsafe impl Sync for ProcessMutex {}

impl ProcessMutex {
    /// Initializes the mutex in place. Must be called exactly once by the creating process
    /// before any process locks it.
    ///
    /// # Safety
    ///
    /// `self` must be part of a mapping that will remain valid (and at the same address in
    /// every mapping process) for as long as the mutex is used.
    pub unsafe fn init(&self) -> Result<()> {
        let mut attr = MaybeUninit::<libc::pthread_mutexattr_t>::uninit();
        if libc::pthread_mutexattr_init(attr.as_mut_ptr()) != 0 {
            return Err(init_failure("pthread_mutexattr_init failed"));
        }
        let mut attr = attr.assume_init();
        if libc::pthread_mutexattr_setpshared(&mut attr, libc::PTHREAD_PROCESS_SHARED) != 0 {
            libc::pthread_mutexattr_destroy(&mut attr);
            return Err(init_failure("pthread_mutexattr_setpshared failed"));
        }
        let rc = libc::pthread_mutex_init(self.inner.get(), &attr);
        libc::pthread_mutexattr_destroy(&mut attr);
        if rc != 0 {
            return Err(init_failure("pthread_mutex_init failed"));
        }
        Ok(())
    }

    /// # Safety
    ///
    /// Must only be called once, by the process that destroys the shared region.
    pub unsafe fn destroy(&self) {
        libc::pthread_mutex_destroy(self.inner.get());
    }

    #[inline]
    pub fn lock(&self) -> ProcessMutexGuard<'_> {
        let rc = unsafe { libc::pthread_mutex_lock(self.inner.get()) };
        assert_eq!(rc, 0, "pthread_mutex_lock failed: {rc}");
        ProcessMutexGuard { mutex: self }
    }

    #[inline]
    fn unlock(&self) {
        let rc = unsafe { libc::pthread_mutex_unlock(self.inner.get()) };
        assert_eq!(rc, 0, "pthread_mutex_unlock failed: {rc}");
    }
}

pub struct ProcessMutexGuard<'a> {
    mutex: &'a ProcessMutex,
}

impl Drop for ProcessMutexGuard<'_> {
    fn drop(&mut self) {
        self.mutex.unlock();
    }
}

/// A `pthread_cond_t` configured `PTHREAD_PROCESS_SHARED`, always waited on together with the
/// `ProcessMutex` in the same channel.
#[repr(C)]
pub struct ProcessCondvar {
    inner: UnsafeCell<libc::pthread_cond_t>,
}

unsafe impl Send for ProcessCondvar {}
unsafe impl Sync for ProcessCondvar {}

impl ProcessCondvar {
    /// # Safety
    ///
    /// Same requirements as [`ProcessMutex::init`].
    pub unsafe fn init(&self) -> Result<()> {
        let mut attr = MaybeUninit::<libc::pthread_condattr_t>::uninit();
        if libc::pthread_condattr_init(attr.as_mut_ptr()) != 0 {
            return Err(init_failure("pthread_condattr_init failed"));
        }
        let mut attr = attr.assume_init();
        if libc::pthread_condattr_setpshared(&mut attr, libc::PTHREAD_PROCESS_SHARED) != 0 {
            libc::pthread_condattr_destroy(&mut attr);
            return Err(init_failure("pthread_condattr_setpshared failed"));
        }
        let rc = libc::pthread_cond_init(self.inner.get(), &attr);
        libc::pthread_condattr_destroy(&mut attr);
        if rc != 0 {
            return Err(init_failure("pthread_cond_init failed"));
        }
        Ok(())
    }

    /// # Safety
    ///
    /// Must only be called once, by the process that destroys the shared region.
    pub unsafe fn destroy(&self) {
        libc::pthread_cond_destroy(self.inner.get());
    }

    /// Waits, releasing `guard`'s mutex for the duration, then reacquiring it before returning.
    pub fn wait<'a>(&self, guard: ProcessMutexGuard<'a>) -> ProcessMutexGuard<'a> {
        let rc = unsafe {
            libc::pthread_cond_wait(self.inner.get(), guard.mutex.inner.get())
        };
        assert_eq!(rc, 0, "pthread_cond_wait failed: {rc}");
        guard
    }

    /// Waits with a relative timeout (scaled sleeps elsewhere use this indirectly for poll
    /// granularity); returns the guard regardless of whether the wait timed out, since every
    /// caller re-checks its own condition afterwards.
    pub fn wait_timeout<'a>(
        &self,
        guard: ProcessMutexGuard<'a>,
        timeout: std::time::Duration,
    ) -> ProcessMutexGuard<'a> {
        let mut now = MaybeUninit::<libc::timespec>::uninit();
        unsafe {
            libc::clock_gettime(libc::CLOCK_REALTIME, now.as_mut_ptr());
        }
        let mut ts = unsafe { now.assume_init() };
        ts.tv_sec += i64::try_from(timeout.as_secs()).unwrap_or(i64::MAX);
        ts.tv_nsec += i64::from(timeout.subsec_nanos());
        if ts.tv_nsec >= 1_000_000_000 {
            ts.tv_nsec -= 1_000_000_000;
            ts.tv_sec += 1;
        }
        unsafe {
            libc::pthread_cond_timedwait(self.inner.get(), guard.mutex.inner.get(), &ts);
        }
        guard
    }

    #[inline]
    pub fn broadcast(&self) {
        let rc = unsafe { libc::pthread_cond_broadcast(self.inner.get()) };
        assert_eq!(rc, 0, "pthread_cond_broadcast failed: {rc}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    struct Channel {
        mutex: ProcessMutex,
        cond: ProcessCondvar,
        value: UnsafeCell<u32>,
    }
    unsafe impl Send for Channel {}
    unsafe impl Sync for Channel {}

    fn make_channel() -> Arc<Channel> {
        let chan = Arc::new(Channel {
            mutex: ProcessMutex {
                inner: UnsafeCell::new(unsafe { MaybeUninit::zeroed().assume_init() }),
            },
            cond: ProcessCondvar {
                inner: UnsafeCell::new(unsafe { MaybeUninit::zeroed().assume_init() }),
            },
            value: UnsafeCell::new(0),
        });
        unsafe {
            chan.mutex.init().unwrap();
            chan.cond.init().unwrap();
        }
        chan
    }

    #[test]
    fn lock_unlock_round_trips() {
        let chan = make_channel();
        {
            let _guard = chan.mutex.lock();
            unsafe { *chan.value.get() = 42 };
        }
        assert_eq!(unsafe { *chan.value.get() }, 42);
        unsafe {
            chan.mutex.destroy();
            chan.cond.destroy();
        }
    }

    #[test]
    fn broadcast_wakes_waiter_across_threads() {
        let chan = make_channel();
        let reader = Arc::clone(&chan);
        let handle = thread::spawn(move || {
            let mut guard = reader.mutex.lock();
            while unsafe { *reader.value.get() } == 0 {
                guard = reader.cond.wait(guard);
            }
            drop(guard);
        });
        thread::sleep(Duration::from_millis(20));
        {
            let _guard = chan.mutex.lock();
            unsafe { *chan.value.get() = 1 };
            chan.cond.broadcast();
        }
        handle.join().unwrap();
        unsafe {
            chan.mutex.destroy();
            chan.cond.destroy();
        }
    }
}
