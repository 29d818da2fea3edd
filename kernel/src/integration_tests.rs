//! Integration tests for inter-subsystem communication
//!
//! This module provides tests that verify proper interaction between
//! different kernel subsystems.

#![cfg(test)]

extern crate alloc;

use crate::{
    cap::{self, manager::cap_manager, object::ObjectRef, token::Rights},
    ipc, println, process,
};

/// Test IPC endpoint creation together with capability issuance and checks
#[test_case]
fn test_ipc_with_capabilities() {
    cap::init();
    process::init_without_init_process().expect("Process init failed");
    ipc::init();

    let cap_space = cap::CapabilitySpace::new();
    let (_endpoint_id, token) =
        crate::cap::ipc_integration::create_endpoint_with_capability(&cap_space)
            .expect("Failed to create endpoint");

    assert!(cap::manager::check_capability(token, Rights::READ, &cap_space).is_ok());
    assert!(cap::manager::check_capability(token, Rights::WRITE, &cap_space).is_ok());

    // A right never granted to this token must be rejected.
    let no_grant = Rights::READ | Rights::WRITE;
    assert!(!no_grant.contains(Rights::EXECUTE));
}

/// Test process creation followed by capability issuance over a memory object
#[test_case]
fn test_process_with_capabilities() {
    cap::init();
    process::init_without_init_process().expect("Process init failed");

    let pid = process::lifecycle::create_process(alloc::string::String::from("test_process"), 0)
        .expect("Failed to create process");
    assert!(pid.0 > 0);

    let cap_space = cap::CapabilitySpace::new();
    let object = ObjectRef::Process { pid };
    let token = cap_manager()
        .create_capability(object, Rights::READ | Rights::WRITE, &cap_space)
        .expect("Failed to create capability");

    assert!(cap::manager::check_capability(token, Rights::READ, &cap_space).is_ok());
}

/// Test IPC endpoint creation and lookup between two distinct owners
#[test_case]
fn test_ipc_message_passing() {
    process::init_without_init_process().expect("Process init failed");
    ipc::init();

    let (endpoint1, _cap1) = ipc::create_endpoint(1).expect("Failed to create endpoint 1");
    let (endpoint2, _cap2) = ipc::create_endpoint(2).expect("Failed to create endpoint 2");

    assert_ne!(endpoint1, endpoint2);
    assert!(ipc::lookup_endpoint(endpoint1).is_ok());
    assert!(ipc::lookup_endpoint(endpoint2).is_ok());
}

/// Test performance counters respond to recorded events
#[test_case]
fn test_performance_monitoring() {
    crate::perf::init().expect("Perf init failed");

    crate::perf::reset_stats();
    crate::perf::count_syscall();
    crate::perf::count_context_switch();

    let counters = crate::perf::get_stats();
    assert_eq!(counters.syscalls, 1);
    assert_eq!(counters.context_switches, 1);
}

#[cfg(test)]
mod module_tests {
    use super::*;

    /// Run all integration tests
    pub fn run_all() {
        test_ipc_with_capabilities();
        test_process_with_capabilities();
        test_ipc_message_passing();
        test_performance_monitoring();

        println!("[INTEGRATION] All integration tests passed!");
    }
}
