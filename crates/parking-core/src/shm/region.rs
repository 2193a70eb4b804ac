//! Creation, opening and teardown of the named POSIX shared memory object that backs the
//! [`Entrance`]/[`Exit`]/[`Level`] channel arrays.
//!
//! Layout is three contiguous blocks, `Entrance[n_ent]` then `Exit[n_exit]` then `Level[n_lvl]`,
//! each block's start aligned to that type's natural alignment. The Simulator is the only
//! process that ever creates the region; the Manager and the Fire Alarm Unit always open an
//! existing one and trust that it has already been initialized.

use super::channels::{Entrance, Exit, Level};
use crate::error::{init_failure, Result};
use memmap2::MmapMut;
use std::ffi::CString;
use std::mem::{align_of, size_of};
use std::os::fd::{FromRawFd, OwnedFd};

fn aligned_offset(offset: usize, align: usize) -> usize {
    (offset + align - 1) / align * align
}

struct Layout {
    entrances_off: usize,
    exits_off: usize,
    levels_off: usize,
    total: usize,
}

fn layout(n_ent: usize, n_exit: usize, n_lvl: usize) -> Layout {
    let entrances_off = 0;
    let after_entrances = entrances_off + n_ent * size_of::<Entrance>();
    let exits_off = aligned_offset(after_entrances, align_of::<Exit>());
    let after_exits = exits_off + n_exit * size_of::<Exit>();
    let levels_off = aligned_offset(after_exits, align_of::<Level>());
    let total = levels_off + n_lvl * size_of::<Level>();
    Layout {
        entrances_off,
        exits_off,
        levels_off,
        total,
    }
}

/// An open mapping of the shared region, sized for a particular `(n_ent, n_exit, n_lvl)` and
/// owning the mapping for as long as it lives.
pub struct ShmHandle {
    name: String,
    mmap: MmapMut,
    layout: Layout,
    owner: bool,
}

impl ShmHandle {
    /// Creates (replacing any stale object of the same name) and fully initializes a new
    /// region: every lock and condition variable constructed, every gate `Closed`, every
    /// level's temperature at the spec's ambient default.
    ///
    /// Any failure here is fatal; the caller must abort rather than continue with a partially
    /// initialized region other processes may already be mapping.
    pub fn create(name: &str, n_ent: usize, n_exit: usize, n_lvl: usize) -> Result<Self> {
        let layout = layout(n_ent, n_exit, n_lvl);
        let cname =
            CString::new(name).map_err(|e| init_failure(format!("invalid shm name: {e}")))?;

        unsafe {
            libc::shm_unlink(cname.as_ptr());
        }

        let fd = unsafe {
            libc::shm_open(
                cname.as_ptr(),
                libc::O_CREAT | libc::O_EXCL | libc::O_RDWR,
                0o600,
            )
        };
        if fd < 0 {
            return Err(init_failure(format!(
                "shm_open({name}) failed: {}",
                std::io::Error::last_os_error()
            )));
        }
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };

        if unsafe { libc::ftruncate(std::os::fd::AsRawFd::as_raw_fd(&fd), layout.total as i64) }
            != 0
        {
            unsafe {
                libc::shm_unlink(cname.as_ptr());
            }
            return Err(init_failure(format!(
                "ftruncate({name}, {}) failed: {}",
                layout.total,
                std::io::Error::last_os_error()
            )));
        }

        let mmap = unsafe {
            MmapMut::map_mut(&fd).map_err(|e| init_failure(format!("mmap({name}) failed: {e}")))?
        };

        let mut handle = Self {
            name: name.to_owned(),
            mmap,
            layout,
            owner: true,
        };

        unsafe { handle.init_in_place(n_ent, n_exit, n_lvl)? };
        Ok(handle)
    }

    unsafe fn init_in_place(&mut self, n_ent: usize, n_exit: usize, n_lvl: usize) -> Result<()> {
        for entrance in self.entrances_mut(n_ent) {
            entrance.lpr.init()?;
            entrance.gate.init()?;
            entrance.sign.init()?;
        }
        for exit in self.exits_mut(n_exit) {
            exit.lpr.init()?;
            exit.gate.init()?;
        }
        for level in self.levels_mut(n_lvl) {
            level.init()?;
        }
        Ok(())
    }

    /// Opens an existing region by name without creating or initializing anything. The caller
    /// must already know the `(n_ent, n_exit, n_lvl)` the creator used, normally by sharing the
    /// same configuration file.
    pub fn open(name: &str, n_ent: usize, n_exit: usize, n_lvl: usize) -> Result<Self> {
        let layout = layout(n_ent, n_exit, n_lvl);
        let cname =
            CString::new(name).map_err(|e| init_failure(format!("invalid shm name: {e}")))?;

        let fd = unsafe { libc::shm_open(cname.as_ptr(), libc::O_RDWR, 0o600) };
        if fd < 0 {
            return Err(init_failure(format!(
                "shm_open({name}) failed: {}",
                std::io::Error::last_os_error()
            )));
        }
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };

        let mmap = unsafe {
            MmapMut::map_mut(&fd).map_err(|e| init_failure(format!("mmap({name}) failed: {e}")))?
        };
        if mmap.len() < layout.total {
            return Err(init_failure(format!(
                "{name} is {} bytes, expected at least {}",
                mmap.len(),
                layout.total
            )));
        }

        Ok(Self {
            name: name.to_owned(),
            mmap,
            layout,
            owner: false,
        })
    }

    pub fn entrances(&self, n_ent: usize) -> &[Entrance] {
        unsafe {
            std::slice::from_raw_parts(
                self.mmap.as_ptr().add(self.layout.entrances_off).cast(),
                n_ent,
            )
        }
    }

    fn entrances_mut(&mut self, n_ent: usize) -> &mut [Entrance] {
        unsafe {
            std::slice::from_raw_parts_mut(
                self.mmap.as_mut_ptr().add(self.layout.entrances_off).cast(),
                n_ent,
            )
        }
    }

    pub fn exits(&self, n_exit: usize) -> &[Exit] {
        unsafe {
            std::slice::from_raw_parts(
                self.mmap.as_ptr().add(self.layout.exits_off).cast(),
                n_exit,
            )
        }
    }

    fn exits_mut(&mut self, n_exit: usize) -> &mut [Exit] {
        unsafe {
            std::slice::from_raw_parts_mut(
                self.mmap.as_mut_ptr().add(self.layout.exits_off).cast(),
                n_exit,
            )
        }
    }

    pub fn levels(&self, n_lvl: usize) -> &[Level] {
        unsafe {
            std::slice::from_raw_parts(
                self.mmap.as_ptr().add(self.layout.levels_off).cast(),
                n_lvl,
            )
        }
    }

    fn levels_mut(&mut self, n_lvl: usize) -> &mut [Level] {
        unsafe {
            std::slice::from_raw_parts_mut(
                self.mmap.as_mut_ptr().add(self.layout.levels_off).cast(),
                n_lvl,
            )
        }
    }

    /// Destroys every lock and condition variable in the region and, if this handle created the
    /// region, unlinks the named object so the next run starts fresh.
    ///
    /// Takes `&self`, not ownership: every channel's own `destroy` only needs shared access (the
    /// same way its normal operation does), which lets a `'static`-leaked handle — the shape
    /// every long-lived worker thread needs a reference to — still be destroyed from the thread
    /// running the shutdown sequence, after every other borrow of it has stopped being used.
    /// Must only be called once, by the process shutting the whole system down; other processes
    /// should simply exit and let their mapping be dropped.
    pub fn destroy(&self, n_ent: usize, n_exit: usize, n_lvl: usize) {
        for entrance in self.entrances(n_ent) {
            unsafe {
                entrance.lpr.destroy();
                entrance.gate.destroy();
                entrance.sign.destroy();
            }
        }
        for exit in self.exits(n_exit) {
            unsafe {
                exit.lpr.destroy();
                exit.gate.destroy();
            }
        }
        for level in self.levels(n_lvl) {
            unsafe {
                level.destroy();
            }
        }
        if self.owner {
            if let Ok(cname) = CString::new(self.name.clone()) {
                unsafe {
                    libc::shm_unlink(cname.as_ptr());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_name(tag: &str) -> String {
        // A test-only substitute for a timestamp-based name: the process id plus the calling
        // test's tag is unique enough for a single test binary run.
        format!("/parking-core-test-{tag}-{}", std::process::id())
    }

    #[test]
    fn create_then_open_see_the_same_region() {
        let name = unique_name("create-open");
        let mut handle = ShmHandle::create(&name, 2, 1, 3).unwrap();
        handle.entrances(2)[0].gate.request(b'O');

        let reopened = ShmHandle::open(&name, 2, 1, 3).unwrap();
        assert_eq!(reopened.entrances(2)[0].gate.status(), b'O');
        assert_eq!(reopened.levels(3)[0].temperature(), 25);

        reopened.destroy(2, 1, 3);
    }

    #[test]
    fn layout_blocks_are_disjoint_and_aligned() {
        let l = layout(3, 4, 5);
        assert_eq!(l.entrances_off, 0);
        assert!(l.exits_off >= 3 * size_of::<Entrance>());
        assert_eq!(l.exits_off % align_of::<Exit>(), 0);
        assert!(l.levels_off >= l.exits_off + 4 * size_of::<Exit>());
        assert_eq!(l.levels_off % align_of::<Level>(), 0);
        assert!(l.total >= l.levels_off + 5 * size_of::<Level>());
    }
}
