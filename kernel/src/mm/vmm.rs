//! Architecture-specific TLB management
//!
//! Per-address-space page tables and mappings live in [`super::vas`]; this
//! module only holds the TLB invalidation primitives that `vas` calls after
//! changing a translation.

#![allow(dead_code)]

pub mod tlb {
    use super::super::VirtualAddress;

    /// Flush TLB for a specific address
    #[cfg(target_arch = "x86_64")]
    pub fn flush_address(addr: VirtualAddress) {
        unsafe {
            core::arch::asm!("invlpg [{}]", in(reg) addr.as_u64());
        }
    }

    #[cfg(not(target_arch = "x86_64"))]
    pub fn flush_address(_addr: VirtualAddress) {}

    /// Flush entire TLB
    #[cfg(target_arch = "x86_64")]
    pub fn flush_all() {
        unsafe {
            let cr3: u64;
            core::arch::asm!("mov {}, cr3", out(reg) cr3);
            core::arch::asm!("mov cr3, {}", in(reg) cr3);
        }
    }

    #[cfg(not(target_arch = "x86_64"))]
    pub fn flush_all() {}
}
