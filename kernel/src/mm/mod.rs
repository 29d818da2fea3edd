//! Memory management
//!
//! Physical frame allocation, 4-level page tables, per-address-space
//! virtual memory management with copy-on-write, and the kernel heap.

#![allow(dead_code)]

use core::sync::atomic::{AtomicU64, Ordering};

pub mod frame_allocator;
pub mod heap;
pub mod page_table;
pub mod vas;
pub mod vmm;

pub use frame_allocator::{
    FrameAllocator, FrameAllocatorError, FrameAllocatorStats, FrameNumber, MemoryRegion,
    MemoryRegionKind, PhysicalAddress, PhysicalFrame, FRAME_ALLOCATOR, FRAME_SIZE,
};
pub use vas::{MappingType, VirtualAddressSpace, VirtualMapping};

/// Virtual memory address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct VirtualAddress(pub u64);

impl VirtualAddress {
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    pub const fn add(&self, offset: usize) -> Self {
        Self(self.0 + offset as u64)
    }
}

/// Page size options
#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSize {
    /// 4 KiB pages
    Small = 4096,
    /// 2 MiB pages
    Large = 2 * 1024 * 1024,
    /// 1 GiB pages
    Huge = 1024 * 1024 * 1024,
}

/// Page table entry flags, architecture-neutral bit positions matching
/// x86_64's PTE layout (the only architecture this crate targets).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageFlags(pub u64);

impl PageFlags {
    pub const PRESENT: Self = Self(1 << 0);
    pub const WRITABLE: Self = Self(1 << 1);
    pub const USER: Self = Self(1 << 2);
    pub const WRITE_THROUGH: Self = Self(1 << 3);
    pub const NO_CACHE: Self = Self(1 << 4);
    pub const ACCESSED: Self = Self(1 << 5);
    pub const DIRTY: Self = Self(1 << 6);
    pub const HUGE: Self = Self(1 << 7);
    pub const GLOBAL: Self = Self(1 << 8);
    /// Software-defined bit (available in the PTE's OS-reserved range)
    /// marking a page copy-on-write. Not interpreted by hardware.
    pub const COW: Self = Self(1 << 9);
    pub const NO_EXECUTE: Self = Self(1 << 63);

    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn without(&self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl core::ops::BitOr for PageFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl core::ops::BitAnd for PageFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

/// Virtual base of the direct physical-memory map: every physical address
/// `p` is also reachable at `PHYS_MEM_OFFSET + p`. Set once during boot
/// before any page table is walked by physical address.
pub static PHYS_MEM_OFFSET: AtomicU64 = AtomicU64::new(0);

/// Record the direct map's base address, established by the bootstrap
/// code before any address space other than the boot one is touched.
pub fn set_phys_mem_offset(offset: u64) {
    PHYS_MEM_OFFSET.store(offset, Ordering::Release);
}

/// Translate a physical address to its direct-mapped virtual address.
pub fn phys_to_virt_addr(phys: u64) -> u64 {
    PHYS_MEM_OFFSET.load(Ordering::Acquire) + phys
}

/// Initialize memory management: bring up the frame allocator from the
/// boot memory map, then the kernel heap.
pub fn init(regions: &[MemoryRegion]) -> Result<(), &'static str> {
    crate::println!("[MM] Initializing memory management...");

    FRAME_ALLOCATOR.lock().init(regions);
    heap::init()?;

    crate::println!("[MM] Memory management initialized");
    Ok(())
}
