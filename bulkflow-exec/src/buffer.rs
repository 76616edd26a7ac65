//! Pooled buffer handles

use std::fmt;
use std::sync::Arc;

use bulkflow_format::{FlowError, ReleaseSite, Result};
use parking_lot::{Mutex, RwLock};

use crate::pool::PoolInner;

/// Exclusive handle to a pooled region
///
/// The handle is move-only: [`Buffer::release`] consumes it, so a region
/// cannot be returned twice through the same handle. Dropping a buffer
/// without releasing it leaks the region from the pool's point of view and
/// shows up as `checked_out` in [`PoolStats`](crate::PoolStats).
pub struct Buffer {
    pool: Arc<PoolInner>,
    region: Box<[u8]>,
    class: usize,
    len: usize,
}

impl Buffer {
    pub(crate) fn new(pool: Arc<PoolInner>, region: Box<[u8]>, class: usize) -> Self {
        Self {
            pool,
            region,
            class,
            len: 0,
        }
    }

    /// Size of the region in bytes.
    pub fn capacity(&self) -> usize {
        self.region.len()
    }

    /// Filled length.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Filled prefix of the region.
    pub fn as_slice(&self) -> &[u8] {
        &self.region[..self.len]
    }

    /// The whole region, regardless of the filled length.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.region
    }

    /// Set the filled length after writing through [`Buffer::as_mut_slice`].
    pub fn set_len(&mut self, len: usize) -> Result<()> {
        if len > self.capacity() {
            return Err(FlowError::CapacityExceeded {
                needed: len,
                available: self.capacity(),
            });
        }
        self.len = len;
        Ok(())
    }

    /// Copy `bytes` after the filled prefix.
    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        let available = self.capacity() - self.len;
        if bytes.len() > available {
            return Err(FlowError::CapacityExceeded {
                needed: bytes.len(),
                available,
            });
        }
        self.region[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        Ok(())
    }

    /// Reset the filled length to zero.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Return the region to the pool.
    pub fn release(self) {
        self.pool.return_region(self.class, self.region);
    }

    /// Convert into a cloneable handle whose release is checked at runtime.
    pub fn into_shared(self) -> SharedBuffer {
        SharedBuffer {
            state: Arc::new(SharedState {
                capacity: self.region.len(),
                class: self.class,
                slot: Mutex::new(Slot {
                    len: self.len,
                    released: None,
                    returned: false,
                }),
                region: RwLock::new(self.region),
                pool: self.pool,
            }),
        }
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("capacity", &self.capacity())
            .field("len", &self.len)
            .finish()
    }
}

/// Thread-safe handle to a pooled region, shared between several holders
///
/// Exactly one [`SharedBuffer::release`] returns the region. Every other
/// call, including ones racing it, fails with
/// [`FlowError::DoubleRelease`] naming where the region was first released,
/// and leaves the pool untouched.
///
/// No operation blocks. A read or write that conflicts with a borrow in
/// progress fails with [`FlowError::BufferBusy`]. Releasing from inside a
/// borrow succeeds; the region goes back to the pool when the last borrow
/// ends.
#[derive(Clone)]
pub struct SharedBuffer {
    state: Arc<SharedState>,
}

struct SharedState {
    pool: Arc<PoolInner>,
    class: usize,
    capacity: usize,
    // Held only for short bookkeeping, never while caller code runs.
    slot: Mutex<Slot>,
    region: RwLock<Box<[u8]>>,
}

struct Slot {
    len: usize,
    released: Option<ReleaseSite>,
    returned: bool,
}

impl Slot {
    fn live(&self) -> Result<()> {
        match self.released {
            None => Ok(()),
            Some(first_release) => Err(FlowError::UseAfterRelease { first_release }),
        }
    }
}

impl SharedState {
    /// Take the region out once released and no longer borrowed.
    fn take_region(&self, slot: &mut Slot) -> Option<Box<[u8]>> {
        if slot.released.is_none() || slot.returned {
            return None;
        }
        let mut region = self.region.try_write()?;
        slot.returned = true;
        Some(std::mem::take(&mut *region))
    }

    /// Hand a released region back to the pool if nothing borrows it.
    fn settle(&self) {
        let region = self.take_region(&mut self.slot.lock());
        if let Some(region) = region {
            self.pool.return_region(self.class, region);
        }
    }
}

impl SharedBuffer {
    /// Size of the region in bytes.
    pub fn capacity(&self) -> usize {
        self.state.capacity
    }

    /// Filled length, or `UseAfterRelease` once released.
    pub fn len(&self) -> Result<usize> {
        let slot = self.state.slot.lock();
        slot.live()?;
        Ok(slot.len)
    }

    /// True once some holder has released the region.
    pub fn is_released(&self) -> bool {
        self.state.slot.lock().released.is_some()
    }

    /// Run `f` over the filled bytes.
    pub fn read<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R> {
        let (region, len) = {
            let slot = self.state.slot.lock();
            slot.live()?;
            let region = self
                .state
                .region
                .try_read_recursive()
                .ok_or(FlowError::BufferBusy)?;
            (region, slot.len)
        };
        let result = f(&region[..len]);
        drop(region);
        self.state.settle();
        Ok(result)
    }

    /// Run `f` over the whole region.
    pub fn write<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> Result<R> {
        let mut region = {
            let slot = self.state.slot.lock();
            slot.live()?;
            self.state.region.try_write().ok_or(FlowError::BufferBusy)?
        };
        let result = f(&mut region[..]);
        drop(region);
        self.state.settle();
        Ok(result)
    }

    /// Set the filled length.
    pub fn set_len(&self, new_len: usize) -> Result<()> {
        let mut slot = self.state.slot.lock();
        slot.live()?;
        if new_len > self.state.capacity {
            return Err(FlowError::CapacityExceeded {
                needed: new_len,
                available: self.state.capacity,
            });
        }
        slot.len = new_len;
        Ok(())
    }

    /// Return the region to the pool; only the first call succeeds.
    #[track_caller]
    pub fn release(&self) -> Result<()> {
        let site = ReleaseSite::caller();
        let mut slot = self.state.slot.lock();
        if let Some(first_release) = slot.released {
            drop(slot);
            self.state.pool.record_double_release(first_release, site);
            return Err(FlowError::DoubleRelease { first_release });
        }
        slot.released = Some(site);
        let region = self.state.take_region(&mut slot);
        drop(slot);
        if let Some(region) = region {
            self.state.pool.return_region(self.state.class, region);
        }
        Ok(())
    }
}

impl fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedBuffer")
            .field("capacity", &self.state.capacity)
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::{BufferPool, PoolConfig};

    use super::*;

    fn pool() -> BufferPool {
        BufferPool::new(PoolConfig::with_page_size(64)).unwrap()
    }

    #[test]
    fn test_fill_length() {
        let pool = pool();
        let mut buffer = pool.allocate().unwrap();
        assert!(buffer.is_empty());
        buffer.append(b"hello").unwrap();
        buffer.append(b" world").unwrap();
        assert_eq!(buffer.as_slice(), b"hello world");

        buffer.clear();
        buffer.as_mut_slice()[..3].copy_from_slice(b"abc");
        buffer.set_len(3).unwrap();
        assert_eq!(buffer.as_slice(), b"abc");
        buffer.release();
    }

    #[test]
    fn test_append_never_grows() {
        let pool = pool();
        let mut buffer = pool.allocate().unwrap();
        buffer.append(&[1u8; 60]).unwrap();
        match buffer.append(&[2u8; 8]) {
            Err(FlowError::CapacityExceeded { needed, available }) => {
                assert_eq!(needed, 8);
                assert_eq!(available, 4);
            }
            other => panic!("expected capacity error, got {other:?}"),
        }
        assert_eq!(buffer.len(), 60);
        assert!(buffer.set_len(65).is_err());
        assert_eq!(buffer.capacity(), 64);
    }

    #[test]
    fn test_shared_double_release_is_detected() {
        let pool = pool();
        let shared = pool.allocate().unwrap().into_shared();
        let other = shared.clone();

        shared.release().unwrap();
        let free_after_first = pool.stats().free_regions;

        match other.release() {
            Err(FlowError::DoubleRelease { first_release }) => {
                assert!(first_release.file().ends_with("buffer.rs"));
            }
            other => panic!("expected double release, got {other:?}"),
        }
        let stats = pool.stats();
        assert_eq!(stats.free_regions, free_after_first);
        assert_eq!(stats.double_releases, 1);
        assert_eq!(stats.releases, 1);
    }

    #[test]
    fn test_shared_use_after_release() {
        let pool = pool();
        let mut buffer = pool.allocate().unwrap();
        buffer.append(b"data").unwrap();
        let shared = buffer.into_shared();

        assert_eq!(shared.read(|bytes| bytes.to_vec()).unwrap(), b"data");
        shared.write(|region| region[0] = b'D').unwrap();
        assert_eq!(shared.read(|bytes| bytes[0]).unwrap(), b'D');
        assert_eq!(shared.len().unwrap(), 4);

        shared.release().unwrap();
        assert!(shared.is_released());
        assert!(matches!(
            shared.read(|bytes| bytes.len()),
            Err(FlowError::UseAfterRelease { .. })
        ));
        assert!(matches!(
            shared.set_len(1),
            Err(FlowError::UseAfterRelease { .. })
        ));
    }

    #[test]
    fn test_release_inside_read_defers_return() {
        let pool = pool();
        let mut buffer = pool.allocate().unwrap();
        buffer.append(b"abc").unwrap();
        let shared = buffer.into_shared();
        let holder = shared.clone();

        let (seen, released) = shared
            .read(|bytes| {
                let released = holder.release();
                // Still borrowed, so the region has not gone back yet.
                assert_eq!(pool.stats().free_regions, 0);
                assert!(matches!(
                    holder.read(|b| b.len()),
                    Err(FlowError::UseAfterRelease { .. })
                ));
                assert!(matches!(holder.len(), Err(FlowError::UseAfterRelease { .. })));
                (bytes.to_vec(), released)
            })
            .unwrap();
        assert_eq!(seen, b"abc");
        assert!(released.is_ok());

        let stats = pool.stats();
        assert_eq!(stats.free_regions, 1);
        assert_eq!(stats.checked_out, 0);
        assert_eq!(stats.releases, 1);
        assert!(matches!(
            shared.release(),
            Err(FlowError::DoubleRelease { .. })
        ));
    }

    #[test]
    fn test_release_inside_write_and_nested_reads() {
        let pool = pool();
        let shared = pool.allocate().unwrap().into_shared();
        let holder = shared.clone();

        shared
            .write(|region| {
                region[0] = 1;
                assert!(matches!(holder.read(|_| ()), Err(FlowError::BufferBusy)));
                assert!(matches!(holder.write(|_| ()), Err(FlowError::BufferBusy)));
                holder.set_len(1).unwrap();
                holder.release().unwrap();
            })
            .unwrap();
        assert_eq!(pool.stats().free_regions, 1);

        let shared = pool.allocate().unwrap().into_shared();
        let holder = shared.clone();
        let inner = shared
            .read(|_| {
                holder
                    .read(|_| {
                        assert!(matches!(holder.write(|_| ()), Err(FlowError::BufferBusy)));
                        holder.release()
                    })
                    .unwrap()
            })
            .unwrap();
        assert!(inner.is_ok());
        let stats = pool.stats();
        assert_eq!(stats.checked_out, 0);
        assert_eq!(stats.releases, 2);
    }

    #[test]
    fn test_shared_release_keeps_first_site() {
        let pool = pool();
        let shared = pool.allocate().unwrap().into_shared();
        shared.release().unwrap();
        let first_line = line!() - 1;
        for _ in 0..3 {
            match shared.release() {
                Err(FlowError::DoubleRelease { first_release }) => {
                    assert_eq!(first_release.line(), first_line);
                }
                other => panic!("expected double release, got {other:?}"),
            }
        }
        assert_eq!(pool.stats().double_releases, 3);
    }
}
