//! Physical frame allocator
//!
//! A single dense bitmap over all usable physical memory, plus a 16-bit
//! refcount array used only for frames shared under copy-on-write.
//! Single-frame allocation rotates a cursor across the bitmap so repeated
//! calls are O(1) amortised instead of always rescanning from frame zero.

#![allow(dead_code)]

use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use spin::Mutex;

#[allow(unused_imports)]
use crate::println;
use crate::raii::{FrameGuard, FramesGuard};

/// Size of a physical frame (4KB)
pub const FRAME_SIZE: usize = 4096;

/// Maximum number of frames this allocator can track. Sized for 16GB of
/// physical memory at 4KB frames; `init` trims the tracked range down to
/// the boot memory map's actual highest usable frame.
const MAX_FRAMES: usize = 4 * 1024 * 1024;
const BITMAP_WORDS: usize = MAX_FRAMES / 64;

/// `alloc_one_low` searches `[LOW_MEM_START, LOW_MEM_HIGH)` first -- frames
/// reachable without relying on the direct physical map -- then falls back
/// to `[MIN_LOW_MEM, LOW_MEM_START)`.
const LOW_MEM_START: u64 = (2 * 1024 * 1024) / FRAME_SIZE as u64; // 2MiB
const LOW_MEM_HIGH: u64 = (128 * 1024 * 1024) / FRAME_SIZE as u64; // 128MiB
const MIN_LOW_MEM: u64 = (1 * 1024 * 1024) / FRAME_SIZE as u64; // 1MiB

/// Physical frame number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FrameNumber(u64);

impl FrameNumber {
    pub const fn new(num: u64) -> Self {
        Self(num)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    pub const fn as_addr(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.0 * FRAME_SIZE as u64)
    }
}

/// Physical memory address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PhysicalAddress(pub u64);

impl PhysicalAddress {
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    pub const fn as_usize(&self) -> usize {
        self.0 as usize
    }

    pub const fn as_frame(&self) -> FrameNumber {
        FrameNumber::new(self.0 / FRAME_SIZE as u64)
    }

    pub const fn offset(&self, offset: u64) -> Self {
        Self::new(self.0 + offset)
    }
}

/// Physical frame representation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalFrame {
    number: FrameNumber,
}

impl PhysicalFrame {
    pub fn new(number: FrameNumber) -> Self {
        Self { number }
    }

    pub fn number(&self) -> FrameNumber {
        self.number
    }

    pub fn addr(&self) -> usize {
        (self.number.0 * FRAME_SIZE as u64) as usize
    }
}

/// Kind of a region reported by the boot memory map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryRegionKind {
    /// Usable RAM, free for the allocator to hand out.
    Usable,
    /// Reserved by firmware, MMIO, or the bootloader; never allocated.
    Reserved,
    /// Holds the kernel image itself; never allocated.
    Kernel,
    /// Holds the boot-time page tables; never allocated.
    PageTable,
}

/// One contiguous span from the boot memory map.
#[derive(Debug, Clone, Copy)]
pub struct MemoryRegion {
    pub start: PhysicalAddress,
    pub end: PhysicalAddress,
    pub kind: MemoryRegionKind,
}

impl MemoryRegion {
    pub const fn new(start: u64, end: u64, kind: MemoryRegionKind) -> Self {
        Self {
            start: PhysicalAddress::new(start),
            end: PhysicalAddress::new(end),
            kind,
        }
    }
}

/// Frame allocation result
pub type Result<T> = core::result::Result<T, FrameAllocatorError>;

/// Frame allocator errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAllocatorError {
    /// No frames available
    OutOfMemory,
    /// Invalid frame number (outside the tracked range)
    InvalidFrame,
    /// Invalid allocation size (zero, or larger than the tracked range)
    InvalidSize,
    /// Frame was already free; `free` is not idempotent
    DoubleFree,
}

/// Statistics for the frame allocator
#[derive(Debug, Clone, Copy)]
pub struct FrameAllocatorStats {
    pub total_frames: u64,
    pub free_frames: u64,
    pub alloc_count: u64,
    pub free_count: u64,
}

/// Dense bitmap (1 = free, 0 = allocated) plus a per-frame refcount.
/// refcount 0 always means free, refcount 1 means allocated with a single
/// owner, and refcount N > 1 means the frame is additionally shared
/// copy-on-write by N owners.
pub struct FrameAllocator {
    bitmap: Mutex<[u64; BITMAP_WORDS]>,
    refcounts: Mutex<Vec<u16>>,
    /// First frame number this allocator is willing to hand out; frames
    /// below this are not RAM, or are reserved by the boot map.
    base_frame: AtomicU64,
    /// One past the last tracked frame.
    limit_frame: AtomicU64,
    free_count: AtomicUsize,
    /// Rotating search cursor for `alloc_one`.
    cursor: AtomicU64,
    alloc_count: AtomicU64,
    free_op_count: AtomicU64,
}

impl FrameAllocator {
    pub const fn new() -> Self {
        Self {
            bitmap: Mutex::new([0u64; BITMAP_WORDS]),
            refcounts: Mutex::new(Vec::new()),
            base_frame: AtomicU64::new(0),
            limit_frame: AtomicU64::new(0),
            free_count: AtomicUsize::new(0),
            cursor: AtomicU64::new(0),
            alloc_count: AtomicU64::new(0),
            free_op_count: AtomicU64::new(0),
        }
    }

    /// Initialize the allocator from a boot memory map. Marks every
    /// `Usable` byte range as free and everything else (and everything
    /// outside any usable range) as permanently allocated.
    ///
    /// Idempotent only in the sense that calling it twice re-derives the
    /// same state from the same map; it is meant to be called exactly
    /// once, during boot.
    pub fn init(&self, regions: &[MemoryRegion]) {
        let mut bitmap = self.bitmap.lock();
        for word in bitmap.iter_mut() {
            *word = 0;
        }

        let mut highest = 0u64;
        for region in regions {
            let end_frame = region.end.as_u64().div_ceil(FRAME_SIZE as u64);
            highest = highest.max(end_frame);
        }
        let tracked = highest.min(MAX_FRAMES as u64);
        self.limit_frame.store(tracked, Ordering::Release);
        self.base_frame.store(0, Ordering::Release);

        let mut refcounts = self.refcounts.lock();
        refcounts.clear();
        refcounts.resize(tracked as usize, 0);

        let mut free = 0usize;
        for region in regions {
            if region.kind != MemoryRegionKind::Usable {
                continue;
            }
            let start_frame = region.start.as_u64().div_ceil(FRAME_SIZE as u64);
            let end_frame = (region.end.as_u64() / FRAME_SIZE as u64).min(tracked);
            for frame in start_frame..end_frame {
                let word_idx = (frame / 64) as usize;
                let bit_idx = frame % 64;
                if word_idx >= bitmap.len() {
                    break;
                }
                if bitmap[word_idx] & (1 << bit_idx) == 0 {
                    bitmap[word_idx] |= 1 << bit_idx;
                    free += 1;
                }
            }
        }

        // Every frame whose bit did not end up free is allocated (reserved
        // by the boot map, or outside any usable range): give it refcount 1
        // so refcount == 0 remains exactly "free".
        for frame in 0..tracked {
            let word_idx = (frame / 64) as usize;
            let bit_idx = frame % 64;
            if bitmap[word_idx] & (1 << bit_idx) == 0 {
                refcounts[frame as usize] = 1;
            }
        }

        self.free_count.store(free, Ordering::Release);
        self.cursor.store(LOW_MEM_HIGH.min(tracked), Ordering::Release);

        println!(
            "[FA] init: {} frames tracked, {} free ({} MB)",
            tracked,
            free,
            (free * FRAME_SIZE) / (1024 * 1024)
        );
    }

    fn tracked_frames(&self) -> u64 {
        self.limit_frame.load(Ordering::Acquire)
    }

    fn take_bit(bitmap: &mut [u64; BITMAP_WORDS], frame: u64) -> bool {
        let word_idx = (frame / 64) as usize;
        let bit_idx = frame % 64;
        if bitmap[word_idx] & (1 << bit_idx) != 0 {
            bitmap[word_idx] &= !(1 << bit_idx);
            true
        } else {
            false
        }
    }

    fn give_bit(bitmap: &mut [u64; BITMAP_WORDS], frame: u64) -> bool {
        let word_idx = (frame / 64) as usize;
        let bit_idx = frame % 64;
        if bitmap[word_idx] & (1 << bit_idx) == 0 {
            bitmap[word_idx] |= 1 << bit_idx;
            true
        } else {
            false
        }
    }

    /// Allocate one frame, starting the scan from a rotating cursor so
    /// repeated single-frame allocations do not rescan low memory.
    pub fn alloc_one(&self) -> Result<FrameNumber> {
        let tracked = self.tracked_frames();
        if tracked == 0 {
            return Err(FrameAllocatorError::OutOfMemory);
        }
        let start = self.cursor.load(Ordering::Relaxed) % tracked;
        // Lock refcounts before bitmap, matching free_contig's order.
        let mut refcounts = self.refcounts.lock();
        let mut bitmap = self.bitmap.lock();

        for i in 0..tracked {
            let frame = (start + i) % tracked;
            if Self::take_bit(&mut bitmap, frame) {
                self.free_count.fetch_sub(1, Ordering::Release);
                self.alloc_count.fetch_add(1, Ordering::Relaxed);
                self.cursor.store((frame + 1) % tracked, Ordering::Relaxed);
                refcounts[frame as usize] = 1;
                return Ok(FrameNumber::new(frame));
            }
        }

        Err(FrameAllocatorError::OutOfMemory)
    }

    /// Allocate one frame from a region reachable without the direct
    /// physical map, for building early page tables. Tries
    /// `[2MiB, 128MiB)` first, then falls back to `[1MiB, 2MiB)`.
    pub fn alloc_one_low(&self) -> Result<FrameNumber> {
        let tracked = self.tracked_frames();
        let mut refcounts = self.refcounts.lock();
        let mut bitmap = self.bitmap.lock();

        let high = LOW_MEM_HIGH.min(tracked);
        for frame in LOW_MEM_START..high {
            if Self::take_bit(&mut bitmap, frame) {
                self.free_count.fetch_sub(1, Ordering::Release);
                self.alloc_count.fetch_add(1, Ordering::Relaxed);
                refcounts[frame as usize] = 1;
                return Ok(FrameNumber::new(frame));
            }
        }

        let start_fallback = MIN_LOW_MEM.min(tracked);
        let end_fallback = LOW_MEM_START.min(tracked);
        for frame in start_fallback..end_fallback {
            if Self::take_bit(&mut bitmap, frame) {
                self.free_count.fetch_sub(1, Ordering::Release);
                self.alloc_count.fetch_add(1, Ordering::Relaxed);
                refcounts[frame as usize] = 1;
                return Ok(FrameNumber::new(frame));
            }
        }

        Err(FrameAllocatorError::OutOfMemory)
    }

    /// Allocate `count` contiguous frames via a linear scan. There is no
    /// fast path for this: contiguous allocation is rare (DMA buffers,
    /// large mappings) and a first-fit scan is simple and correct.
    pub fn alloc_contig(&self, count: usize) -> Result<FrameNumber> {
        if count == 0 {
            return Err(FrameAllocatorError::InvalidSize);
        }
        let tracked = self.tracked_frames();
        if count as u64 > tracked {
            return Err(FrameAllocatorError::InvalidSize);
        }

        let mut refcounts = self.refcounts.lock();
        let mut bitmap = self.bitmap.lock();
        let mut run_start = 0u64;
        let mut run_len = 0u64;

        for frame in 0..tracked {
            let word_idx = (frame / 64) as usize;
            let bit_idx = frame % 64;
            let free = bitmap[word_idx] & (1 << bit_idx) != 0;
            if free {
                if run_len == 0 {
                    run_start = frame;
                }
                run_len += 1;
                if run_len == count as u64 {
                    for f in run_start..run_start + count as u64 {
                        Self::take_bit(&mut bitmap, f);
                        refcounts[f as usize] = 1;
                    }
                    self.free_count.fetch_sub(count, Ordering::Release);
                    self.alloc_count.fetch_add(1, Ordering::Relaxed);
                    return Ok(FrameNumber::new(run_start));
                }
            } else {
                run_len = 0;
            }
        }

        Err(FrameAllocatorError::OutOfMemory)
    }

    /// Drop this allocator's reference to `frame`. When the refcount is
    /// above zero (the frame is COW-shared), this only decrements it; the
    /// bit returns to the free bitmap only when the last reference drops.
    pub fn free(&self, frame: FrameNumber) -> Result<()> {
        self.free_contig(frame, 1)
    }

    /// Free `count` contiguous frames starting at `frame`.
    pub fn free_contig(&self, frame: FrameNumber, count: usize) -> Result<()> {
        let tracked = self.tracked_frames();
        let start = frame.as_u64();
        if start + count as u64 > tracked {
            return Err(FrameAllocatorError::InvalidFrame);
        }

        let mut refcounts = self.refcounts.lock();
        let mut bitmap = self.bitmap.lock();
        let mut freed = 0usize;

        for f in start..start + count as u64 {
            let idx = f as usize;
            if refcounts[idx] == 0 {
                return Err(FrameAllocatorError::DoubleFree);
            }
            refcounts[idx] -= 1;
            if refcounts[idx] > 0 {
                continue;
            }
            if !Self::give_bit(&mut bitmap, f) {
                return Err(FrameAllocatorError::DoubleFree);
            }
            freed += 1;
        }

        self.free_count.fetch_add(freed, Ordering::Release);
        self.free_op_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Add one reference to a frame shared copy-on-write. The frame must
    /// currently be allocated (refcount >= 1).
    pub fn ref_frame(&self, frame: FrameNumber) -> Result<()> {
        let idx = frame.as_u64() as usize;
        let mut refcounts = self.refcounts.lock();
        if idx >= refcounts.len() || refcounts[idx] == 0 {
            return Err(FrameAllocatorError::InvalidFrame);
        }
        refcounts[idx] = refcounts[idx].saturating_add(1);
        Ok(())
    }

    /// Current refcount: 0 means the frame is free, 1 means allocated with
    /// a single owner, N > 1 means additionally shared by N owners.
    pub fn refcount(&self, frame: FrameNumber) -> u16 {
        let idx = frame.as_u64() as usize;
        let refcounts = self.refcounts.lock();
        refcounts.get(idx).copied().unwrap_or(0)
    }

    pub fn get_stats(&self) -> FrameAllocatorStats {
        FrameAllocatorStats {
            total_frames: self.tracked_frames(),
            free_frames: self.free_count.load(Ordering::Acquire) as u64,
            alloc_count: self.alloc_count.load(Ordering::Relaxed),
            free_count: self.free_op_count.load(Ordering::Relaxed),
        }
    }

    // -- Compatibility surface used throughout the kernel tree --------

    /// Allocate `count` frames. `numa_node` is accepted and ignored: this
    /// allocator manages a single pool.
    pub fn allocate_frames(&self, count: usize, _numa_node: Option<usize>) -> Result<FrameNumber> {
        if count == 1 {
            self.alloc_one()
        } else {
            self.alloc_contig(count)
        }
    }

    pub fn free_frames(&self, frame: FrameNumber, count: usize) -> Result<()> {
        self.free_contig(frame, count)
    }

    /// Mark a specific frame as permanently allocated, outside normal
    /// alloc/free accounting. Used to protect boot page-table frames.
    pub fn mark_frame_used(&self, frame: FrameNumber) -> Result<()> {
        let mut bitmap = self.bitmap.lock();
        if Self::take_bit(&mut bitmap, frame.as_u64()) {
            self.free_count.fetch_sub(1, Ordering::Release);
        }
        Ok(())
    }

    /// Allocate a single frame with an RAII guard that frees it on drop.
    pub fn allocate_frame_raii(&'static self) -> Result<FrameGuard> {
        let frame_num = self.alloc_one()?;
        Ok(FrameGuard::new(PhysicalFrame::new(frame_num), self))
    }

    /// Allocate multiple (not necessarily contiguous) frames with an RAII
    /// guard that frees all of them on drop.
    pub fn allocate_frames_raii(&'static self, count: usize) -> Result<FramesGuard> {
        let mut frames = Vec::with_capacity(count);
        for _ in 0..count {
            match self.alloc_one() {
                Ok(frame_num) => frames.push(PhysicalFrame::new(frame_num)),
                Err(e) => {
                    for f in &frames {
                        let _ = self.free(f.number());
                    }
                    return Err(e);
                }
            }
        }
        Ok(FramesGuard::new(frames, self))
    }

    /// Free a frame (used by RAII guards on drop).
    ///
    /// # Safety
    ///
    /// The caller must ensure the frame was allocated by this allocator
    /// and is not referenced anywhere else after this call.
    pub unsafe fn free_frame(&self, frame: PhysicalFrame) {
        if let Err(_e) = self.free(frame.number()) {
            #[cfg(not(target_arch = "aarch64"))]
            println!(
                "[FrameAllocator] Warning: failed to free frame {}: {:?}",
                frame.number().as_u64(),
                _e
            );
        }
    }

    pub fn deallocate_frame(&self, addr: PhysicalAddress) {
        let _ = self.free(addr.as_frame());
    }
}

impl Default for FrameAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Global frame allocator instance
pub static FRAME_ALLOCATOR: Mutex<FrameAllocator> = Mutex::new(FrameAllocator::new());

// ============================================================================
// Per-CPU Page Cache
// ============================================================================

/// Per-CPU page frame cache to reduce global FRAME_ALLOCATOR contention.
///
/// Single-frame allocations (page faults, mmap, fork) dominate. By caching
/// frames per-CPU, we avoid acquiring the global lock on every allocation.
///
/// When the cache is empty, it batch-refills from the global allocator.
/// When full, it batch-drains back to the global allocator.
pub struct PerCpuPageCache {
    /// Cached frame numbers
    frames: [u64; Self::CAPACITY],
    /// Number of valid entries in `frames`
    count: usize,
}

impl Default for PerCpuPageCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PerCpuPageCache {
    /// Maximum frames cached per CPU
    const CAPACITY: usize = 64;
    /// Refill from global when cache drops below this
    const LOW_WATERMARK: usize = 16;
    /// Drain to global when cache exceeds this
    const HIGH_WATERMARK: usize = 48;
    /// Number of frames to transfer in a batch
    const BATCH_SIZE: usize = 32;

    pub const fn new() -> Self {
        Self {
            frames: [0; Self::CAPACITY],
            count: 0,
        }
    }

    /// Try to allocate a single frame from the per-CPU cache.
    /// Returns None if cache is empty (caller should refill from global).
    #[inline]
    pub fn alloc_one(&mut self) -> Option<FrameNumber> {
        if self.count == 0 {
            return None;
        }
        self.count -= 1;
        Some(FrameNumber::new(self.frames[self.count]))
    }

    /// Return a single frame to the per-CPU cache.
    /// Returns false if cache is full (caller should drain to global).
    #[inline]
    pub fn free_one(&mut self, frame: FrameNumber) -> bool {
        if self.count >= Self::CAPACITY {
            return false;
        }
        self.frames[self.count] = frame.as_u64();
        self.count += 1;
        true
    }

    /// Is the cache below the low watermark?
    #[inline]
    pub fn needs_refill(&self) -> bool {
        self.count < Self::LOW_WATERMARK
    }

    /// Is the cache above the high watermark?
    #[inline]
    pub fn needs_drain(&self) -> bool {
        self.count > Self::HIGH_WATERMARK
    }

    /// Batch-refill from the global frame allocator.
    /// Acquires the global lock once, filling up to BATCH_SIZE frames.
    pub fn batch_refill(&mut self) {
        let global = FRAME_ALLOCATOR.lock();
        let to_refill = Self::BATCH_SIZE.min(Self::CAPACITY - self.count);
        for _ in 0..to_refill {
            match global.alloc_one() {
                Ok(frame) => {
                    self.frames[self.count] = frame.as_u64();
                    self.count += 1;
                }
                Err(_) => break,
            }
        }
    }

    /// Batch-drain excess frames back to the global allocator.
    /// Acquires the global lock once, returning BATCH_SIZE frames.
    pub fn batch_drain(&mut self) {
        let global = FRAME_ALLOCATOR.lock();
        let to_drain = Self::BATCH_SIZE.min(self.count);
        for _ in 0..to_drain {
            if self.count == 0 {
                break;
            }
            self.count -= 1;
            let frame = FrameNumber::new(self.frames[self.count]);
            let _ = global.free(frame);
        }
    }

    /// Number of cached frames
    pub fn cached_count(&self) -> usize {
        self.count
    }
}

/// Per-CPU page caches (one per CPU, protected by per-CPU access pattern)
///
/// SAFETY: Each CPU accesses only its own index via `current_cpu_id()`.
/// During bootstrap, only CPU 0 runs. After SMP bringup, each CPU
/// initializes its own cache. No cross-CPU access occurs.
static PER_CPU_PAGE_CACHES: Mutex<[PerCpuPageCache; 16]> =
    Mutex::new([const { PerCpuPageCache::new() }; 16]);

/// Allocate a single physical frame using the per-CPU cache.
///
/// Fast path: no global lock contention for single-frame allocs.
/// Falls back to global allocator if cache is empty and refill fails.
pub fn per_cpu_alloc_frame() -> Result<FrameNumber> {
    let cpu_id = crate::sched::smp::current_cpu_id() as usize;

    let mut caches = PER_CPU_PAGE_CACHES.lock();
    let cache = &mut caches[cpu_id.min(15)];

    if let Some(frame) = cache.alloc_one() {
        return Ok(frame);
    }

    cache.batch_refill();

    if let Some(frame) = cache.alloc_one() {
        return Ok(frame);
    }

    FRAME_ALLOCATOR.lock().alloc_one()
}

/// Free a single physical frame using the per-CPU cache.
///
/// Fast path: no global lock contention for single-frame frees.
/// Drains excess frames back to global if cache is full.
pub fn per_cpu_free_frame(frame: FrameNumber) -> Result<()> {
    let cpu_id = crate::sched::smp::current_cpu_id() as usize;

    let mut caches = PER_CPU_PAGE_CACHES.lock();
    let cache = &mut caches[cpu_id.min(15)];

    if cache.free_one(frame) {
        if cache.needs_drain() {
            cache.batch_drain();
        }
        return Ok(());
    }

    cache.batch_drain();
    if cache.free_one(frame) {
        return Ok(());
    }

    FRAME_ALLOCATOR.lock().free(frame)
}

#[cfg(all(test, not(target_os = "none")))]
mod tests {
    use super::*;

    fn test_regions() -> [MemoryRegion; 1] {
        [MemoryRegion::new(0, 16 * 1024 * 1024, MemoryRegionKind::Usable)]
    }

    #[test]
    fn test_alloc_free_roundtrip() {
        let fa = FrameAllocator::new();
        fa.init(&test_regions());
        let before = fa.get_stats().free_frames;

        let frame = fa.alloc_one().expect("alloc_one should succeed");
        assert_eq!(fa.get_stats().free_frames, before - 1);

        fa.free(frame).expect("free should succeed");
        assert_eq!(fa.get_stats().free_frames, before);
    }

    #[test]
    fn test_double_free_detected() {
        let fa = FrameAllocator::new();
        fa.init(&test_regions());
        let frame = fa.alloc_one().unwrap();
        fa.free(frame).unwrap();
        assert_eq!(fa.free(frame), Err(FrameAllocatorError::DoubleFree));
    }

    #[test]
    fn test_contig_allocation() {
        let fa = FrameAllocator::new();
        fa.init(&test_regions());
        let start = fa.alloc_contig(8).expect("contig alloc should succeed");
        for i in 0..8 {
            // every frame in the run should read as allocated, single owner
            assert_eq!(fa.refcount(FrameNumber::new(start.as_u64() + i)), 1);
        }
        fa.free_contig(start, 8).expect("contig free should succeed");
        for i in 0..8 {
            assert_eq!(fa.refcount(FrameNumber::new(start.as_u64() + i)), 0);
        }
    }

    #[test]
    fn test_refcounted_frame_survives_one_free() {
        let fa = FrameAllocator::new();
        fa.init(&test_regions());
        let frame = fa.alloc_one().unwrap();
        fa.ref_frame(frame).unwrap(); // now shared by 2 owners
        let before = fa.get_stats().free_frames;

        fa.free(frame).unwrap(); // first owner drops
        assert_eq!(fa.get_stats().free_frames, before); // still held

        fa.free(frame).unwrap(); // last owner drops
        assert_eq!(fa.get_stats().free_frames, before + 1);
    }

    #[test]
    fn test_alloc_one_low_stays_in_range() {
        let fa = FrameAllocator::new();
        fa.init(&[MemoryRegion::new(0, 256 * 1024 * 1024, MemoryRegionKind::Usable)]);
        let frame = fa.alloc_one_low().expect("low alloc should succeed");
        assert!(frame.as_u64() >= MIN_LOW_MEM && frame.as_u64() < LOW_MEM_HIGH);
    }

    #[test]
    fn test_invariant_free_plus_used_constant() {
        let fa = FrameAllocator::new();
        fa.init(&test_regions());
        let total = fa.get_stats().total_frames;
        let free0 = fa.get_stats().free_frames;

        let mut allocated = Vec::new();
        for _ in 0..10 {
            allocated.push(fa.alloc_one().unwrap());
        }
        let free1 = fa.get_stats().free_frames;
        assert_eq!(free0 - free1, 10);
        assert_eq!(total, fa.get_stats().total_frames);

        for f in allocated {
            fa.free(f).unwrap();
        }
        assert_eq!(fa.get_stats().free_frames, free0);
    }
}
