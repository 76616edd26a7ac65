//! Size-classed buffer pool
//!
//! Regions come in classes of `page_size * 2^k` bytes. Each class keeps its
//! own bounded lock-free free list, created on first use, so allocation and
//! release never take a pool-wide lock. Regions are never split or merged:
//! a released region only serves later requests of the same class.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use bulkflow_format::{FlowError, ReleaseSite, Result};
use crossbeam::queue::ArrayQueue;
use serde::Serialize;
use tracing::{debug, error, trace, warn};

use crate::buffer::Buffer;
use crate::config::PoolConfig;

/// Pool of reusable byte regions, cheap to clone and share across threads
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

pub(crate) struct PoolInner {
    config: PoolConfig,
    /// Free list per class; index `k` holds regions of `page_size << k` bytes.
    classes: Vec<OnceLock<ArrayQueue<Box<[u8]>>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
    releases: AtomicUsize,
    drops: AtomicUsize,
    evictions: AtomicUsize,
    double_releases: AtomicUsize,
    checked_out: AtomicUsize,
    reserved_bytes: AtomicUsize,
}

/// Pool statistics for monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Regions currently on free lists.
    pub free_regions: usize,
    /// Allocations served from a free list.
    pub hits: usize,
    /// Allocations that reserved a new region.
    pub misses: usize,
    /// Successful releases.
    pub releases: usize,
    /// Released regions dropped because their class list was full.
    pub drops: usize,
    /// Free regions dropped to make room under `memory_limit`.
    pub evictions: usize,
    /// Detected double releases.
    pub double_releases: usize,
    /// Buffers handed out and not yet released.
    pub checked_out: usize,
    /// Bytes of every region the pool has reserved and not dropped.
    pub reserved_bytes: usize,
}

impl PoolStats {
    /// Calculate hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Class index and capacity of the smallest `page_size * 2^k >= minimum`.
fn class_of(page_size: usize, minimum: usize) -> Option<(usize, usize)> {
    let mut index = 0;
    let mut capacity = page_size;
    while capacity < minimum {
        capacity = capacity.checked_mul(2)?;
        index += 1;
    }
    Some((index, capacity))
}

/// Number of classes whose size still fits in `usize`.
fn class_count(page_size: usize) -> usize {
    let mut count = 0;
    let mut size = Some(page_size);
    while let Some(s) = size {
        count += 1;
        size = s.checked_mul(2);
    }
    count
}

fn reserve_region(capacity: usize) -> Option<Box<[u8]>> {
    let mut region = Vec::new();
    region.try_reserve_exact(capacity).ok()?;
    region.resize(capacity, 0);
    Some(region.into_boxed_slice())
}

impl BufferPool {
    /// Create a pool, validating `config`.
    pub fn new(config: PoolConfig) -> Result<Self> {
        config.validate()?;
        let classes = (0..class_count(config.page_size))
            .map(|_| OnceLock::new())
            .collect();
        debug!(
            page_size = config.page_size,
            max_free_per_class = config.max_free_per_class,
            memory_limit = ?config.memory_limit,
            "created buffer pool"
        );
        Ok(Self {
            inner: Arc::new(PoolInner {
                config,
                classes,
                hits: AtomicUsize::new(0),
                misses: AtomicUsize::new(0),
                releases: AtomicUsize::new(0),
                drops: AtomicUsize::new(0),
                evictions: AtomicUsize::new(0),
                double_releases: AtomicUsize::new(0),
                checked_out: AtomicUsize::new(0),
                reserved_bytes: AtomicUsize::new(0),
            }),
        })
    }

    /// Allocate a buffer of exactly one page.
    pub fn allocate(&self) -> Result<Buffer> {
        self.allocate_with_capacity(self.inner.config.page_size)
    }

    /// Allocate a buffer whose capacity is the smallest size class holding
    /// `minimum` bytes.
    pub fn allocate_with_capacity(&self, minimum: usize) -> Result<Buffer> {
        let Some((index, capacity)) = class_of(self.inner.config.page_size, minimum) else {
            warn!(requested = minimum, "no size class can hold the request");
            return Err(FlowError::OutOfMemory { requested: minimum });
        };

        if let Some(region) = self.inner.queue(index).pop() {
            self.inner.hits.fetch_add(1, Ordering::Relaxed);
            self.inner.checked_out.fetch_add(1, Ordering::Relaxed);
            return Ok(Buffer::new(Arc::clone(&self.inner), region, index));
        }

        trace!(capacity, "free list empty, reserving region");
        if self.inner.try_reserve_bytes(capacity).is_err() {
            // Idle regions of other classes still count against the limit.
            self.inner.evict_free_regions(index, capacity);
            self.inner.reserve_bytes(capacity)?;
        }
        let Some(region) = reserve_region(capacity) else {
            self.inner.reserved_bytes.fetch_sub(capacity, Ordering::AcqRel);
            warn!(requested = capacity, "backing allocation failed");
            return Err(FlowError::OutOfMemory {
                requested: capacity,
            });
        };
        self.inner.misses.fetch_add(1, Ordering::Relaxed);
        self.inner.checked_out.fetch_add(1, Ordering::Relaxed);
        Ok(Buffer::new(Arc::clone(&self.inner), region, index))
    }

    /// Capacity `allocate_with_capacity(minimum)` would return, or `None`
    /// if that class overflows `usize`.
    pub fn size_class_for(&self, minimum: usize) -> Option<usize> {
        class_of(self.inner.config.page_size, minimum).map(|(_, capacity)| capacity)
    }

    /// Free regions held for the class of exactly `capacity` bytes.
    pub fn free_regions_in_class(&self, capacity: usize) -> usize {
        match class_of(self.inner.config.page_size, capacity) {
            Some((index, exact)) if exact == capacity => self.inner.classes[index]
                .get()
                .map_or(0, ArrayQueue::len),
            _ => 0,
        }
    }

    /// Get pool statistics.
    pub fn stats(&self) -> PoolStats {
        let inner = &self.inner;
        PoolStats {
            free_regions: inner
                .classes
                .iter()
                .filter_map(OnceLock::get)
                .map(ArrayQueue::len)
                .sum(),
            hits: inner.hits.load(Ordering::Relaxed),
            misses: inner.misses.load(Ordering::Relaxed),
            releases: inner.releases.load(Ordering::Relaxed),
            drops: inner.drops.load(Ordering::Relaxed),
            evictions: inner.evictions.load(Ordering::Relaxed),
            double_releases: inner.double_releases.load(Ordering::Relaxed),
            checked_out: inner.checked_out.load(Ordering::Relaxed),
            reserved_bytes: inner.reserved_bytes.load(Ordering::Acquire),
        }
    }

    /// Smallest size class in bytes.
    pub fn page_size(&self) -> usize {
        self.inner.config.page_size
    }

    /// Options the pool was built with.
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl PoolInner {
    fn queue(&self, index: usize) -> &ArrayQueue<Box<[u8]>> {
        self.classes[index].get_or_init(|| ArrayQueue::new(self.config.max_free_per_class))
    }

    fn limit(&self) -> usize {
        self.config.memory_limit.unwrap_or(usize::MAX)
    }

    /// Account for `capacity` new bytes if that stays within the limit,
    /// returning the reserved total on failure.
    fn try_reserve_bytes(&self, capacity: usize) -> std::result::Result<(), usize> {
        let limit = self.limit();
        self.reserved_bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |reserved| {
                reserved.checked_add(capacity).filter(|total| *total <= limit)
            })
            .map(|_| ())
    }

    /// Account for `capacity` new bytes, never exceeding the memory limit.
    fn reserve_bytes(&self, capacity: usize) -> Result<()> {
        let limit = self.limit();
        self.try_reserve_bytes(capacity).map_err(|reserved| {
            warn!(
                requested = capacity,
                reserved,
                limit,
                "memory limit reached"
            );
            FlowError::OutOfMemory {
                requested: capacity,
            }
        })
    }

    /// Drop free regions of classes other than `keep`, largest first, until
    /// `capacity` more bytes fit under the limit or nothing idle is left.
    fn evict_free_regions(&self, keep: usize, capacity: usize) {
        let limit = self.limit();
        let mut evicted = 0usize;
        for (index, class) in self.classes.iter().enumerate().rev() {
            if index == keep {
                continue;
            }
            let Some(queue) = class.get() else {
                continue;
            };
            while self
                .reserved_bytes
                .load(Ordering::Acquire)
                .saturating_add(capacity)
                > limit
            {
                let Some(region) = queue.pop() else {
                    break;
                };
                self.reserved_bytes.fetch_sub(region.len(), Ordering::AcqRel);
                evicted += 1;
            }
        }
        if evicted > 0 {
            self.evictions.fetch_add(evicted, Ordering::Relaxed);
            debug!(evicted, requested = capacity, "evicted free regions under memory limit");
        }
    }

    /// Put a released region back on its class list.
    pub(crate) fn return_region(&self, index: usize, region: Box<[u8]>) {
        self.checked_out.fetch_sub(1, Ordering::Relaxed);
        self.releases.fetch_add(1, Ordering::Relaxed);
        if let Err(region) = self.queue(index).push(region) {
            self.drops.fetch_add(1, Ordering::Relaxed);
            self.reserved_bytes.fetch_sub(region.len(), Ordering::AcqRel);
        }
    }

    pub(crate) fn record_double_release(&self, first_release: ReleaseSite, second: ReleaseSite) {
        self.double_releases.fetch_add(1, Ordering::Relaxed);
        error!(
            first_release = %first_release,
            second_release = %second,
            "buffer released twice"
        );
    }
}
