//! System call interface for VeridianOS
//!
//! Provides the kernel-side implementation of system calls including IPC
//! operations.

#![allow(dead_code)]

extern crate alloc;
use alloc::sync::Arc;

use crate::{
    cap::{manager::cap_manager, object::ObjectRef, token::CapabilityToken, token::Rights},
    ipc::{channel::Endpoint, IpcError, Message, SmallMessage},
    mm::vas::MappingType,
    process::current_process,
};

mod process;
use process::*;

/// System call numbers
#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    // IPC system calls
    IpcSend = 0,
    IpcReceive = 1,
    IpcCall = 2,
    IpcReply = 3,
    IpcCreateEndpoint = 4,
    IpcBindEndpoint = 5,
    IpcShareMemory = 6,
    IpcMapMemory = 7,

    // Process management
    ProcessYield = 10,
    ProcessExit = 11,
    ProcessFork = 12,
    ProcessExec = 13,
    ProcessWait = 14,
    ProcessGetPid = 15,
    ProcessGetPPid = 16,
    ProcessSetPriority = 17,
    ProcessGetPriority = 18,

    // Thread management
    ThreadCreate = 40,
    ThreadExit = 41,
    ThreadJoin = 42,
    ThreadGetTid = 43,
    ThreadSetAffinity = 44,
    ThreadGetAffinity = 45,

    // Memory management
    MemoryMap = 20,
    MemoryUnmap = 21,

    // Capability management
    CapabilityGrant = 30,
    CapabilityRevoke = 31,
}

/// System call result type
pub type SyscallResult = Result<usize, SyscallError>;

/// System call error codes
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallError {
    InvalidSyscall = -1,
    InvalidArgument = -2,
    PermissionDenied = -3,
    ResourceNotFound = -4,
    OutOfMemory = -5,
    WouldBlock = -6,
    Interrupted = -7,
    InvalidState = -8,
}

impl From<IpcError> for SyscallError {
    fn from(err: IpcError) -> Self {
        match err {
            IpcError::InvalidCapability => SyscallError::PermissionDenied,
            IpcError::ProcessNotFound => SyscallError::ResourceNotFound,
            IpcError::EndpointNotFound => SyscallError::ResourceNotFound,
            IpcError::OutOfMemory => SyscallError::OutOfMemory,
            IpcError::WouldBlock => SyscallError::WouldBlock,
            IpcError::PermissionDenied => SyscallError::PermissionDenied,
            _ => SyscallError::InvalidArgument,
        }
    }
}

/// System call handler entry point
#[no_mangle]
pub extern "C" fn syscall_handler(
    syscall_num: usize,
    arg1: usize,
    arg2: usize,
    arg3: usize,
    arg4: usize,
    arg5: usize,
) -> isize {
    let result = match Syscall::try_from(syscall_num) {
        Ok(syscall) => handle_syscall(syscall, arg1, arg2, arg3, arg4, arg5),
        Err(_) => Err(SyscallError::InvalidSyscall),
    };

    match result {
        Ok(value) => value as isize,
        Err(error) => error as i32 as isize,
    }
}

/// Handle individual system calls
fn handle_syscall(
    syscall: Syscall,
    arg1: usize,
    arg2: usize,
    arg3: usize,
    arg4: usize,
    arg5: usize,
) -> SyscallResult {
    match syscall {
        // IPC system calls
        Syscall::IpcSend => sys_ipc_send(arg1, arg2, arg3, arg4),
        Syscall::IpcReceive => sys_ipc_receive(arg1, arg2),
        Syscall::IpcCall => sys_ipc_call(arg1, arg2, arg3, arg4, arg5),
        Syscall::IpcReply => sys_ipc_reply(arg1, arg2, arg3),
        Syscall::IpcCreateEndpoint => sys_ipc_create_endpoint(),

        // Process management
        Syscall::ProcessYield => sys_yield(),
        Syscall::ProcessExit => sys_exit(arg1),
        Syscall::ProcessFork => sys_fork(),
        Syscall::ProcessExec => sys_exec(arg1, arg2, arg3),
        Syscall::ProcessWait => sys_wait(arg1 as isize, arg2, arg3),
        Syscall::ProcessGetPid => sys_getpid(),
        Syscall::ProcessGetPPid => sys_getppid(),
        Syscall::ProcessSetPriority => sys_setpriority(arg1, arg2, arg3),
        Syscall::ProcessGetPriority => sys_getpriority(arg1, arg2),

        // Thread management
        Syscall::ThreadCreate => sys_thread_create(arg1, arg2, arg3, arg4),
        Syscall::ThreadExit => sys_thread_exit(arg1),
        Syscall::ThreadJoin => sys_thread_join(arg1, arg2),
        Syscall::ThreadGetTid => sys_gettid(),
        Syscall::ThreadSetAffinity => sys_thread_setaffinity(arg1, arg2, arg3),
        Syscall::ThreadGetAffinity => sys_thread_getaffinity(arg1, arg2, arg3),

        // Memory management
        Syscall::MemoryMap => sys_mmap(arg1, arg2),
        Syscall::MemoryUnmap => sys_munmap(arg1, arg2),

        // Capability management
        Syscall::CapabilityGrant => sys_capability_grant(arg1, arg2, arg3),
        Syscall::CapabilityRevoke => sys_capability_revoke(arg1),

        _ => Err(SyscallError::InvalidSyscall),
    }
}

/// Map memory into the current process's address space
///
/// # Arguments
/// - size: length in bytes (page-rounded by the VAS)
/// - mapping_type: 0=Code 1=Data 2=Stack 3=Heap 4=File 5=Shared 6=Device
fn sys_mmap(size: usize, mapping_type: usize) -> SyscallResult {
    if size == 0 {
        return Err(SyscallError::InvalidArgument);
    }

    let mapping_type = match mapping_type {
        0 => MappingType::Code,
        1 => MappingType::Data,
        2 => MappingType::Stack,
        3 => MappingType::Heap,
        4 => MappingType::File,
        5 => MappingType::Shared,
        6 => MappingType::Device,
        _ => return Err(SyscallError::InvalidArgument),
    };

    let proc = current_process().ok_or(SyscallError::InvalidState)?;
    let addr = proc
        .memory_space
        .lock()
        .mmap(size, mapping_type)
        .map_err(|_| SyscallError::OutOfMemory)?;

    Ok(addr.as_u64() as usize)
}

/// Unmap a region previously returned by [`sys_mmap`]
fn sys_munmap(addr: usize, size: usize) -> SyscallResult {
    if addr == 0 || size == 0 {
        return Err(SyscallError::InvalidArgument);
    }

    let proc = current_process().ok_or(SyscallError::InvalidState)?;
    proc.memory_space
        .lock()
        .unmap(addr, size)
        .map_err(|_| SyscallError::InvalidArgument)?;

    Ok(0)
}

/// Grant a capability held by the current process to another process
///
/// # Arguments
/// - cap: raw `CapabilityToken` value held by the caller
/// - target_pid: PID of the receiving process
/// - rights: subset of the caller's rights to derive for the new holder
fn sys_capability_grant(cap: usize, target_pid: usize, rights: usize) -> SyscallResult {
    let source = current_process().ok_or(SyscallError::InvalidState)?;
    let target = crate::process::get_process(crate::process::ProcessId(target_pid as u64))
        .ok_or(SyscallError::ResourceNotFound)?;

    let token = crate::cap::token::CapabilityToken::from_u64(cap as u64);
    let new_cap = cap_manager()
        .delegate(
            token,
            &source.capability_space.lock(),
            &target.capability_space.lock(),
            Rights::new(rights as u32),
        )
        .map_err(|_| SyscallError::PermissionDenied)?;

    Ok(new_cap.to_u64() as usize)
}

/// Revoke a capability globally, invalidating every holder's copy
fn sys_capability_revoke(cap: usize) -> SyscallResult {
    let token = crate::cap::token::CapabilityToken::from_u64(cap as u64);
    cap_manager()
        .revoke(token)
        .map_err(|_| SyscallError::PermissionDenied)?;

    Ok(0)
}

/// Resolve a raw capability argument to the endpoint it targets
///
/// Looks the token up in the current process's capability space; only a
/// capability over an `ObjectRef::Endpoint` is accepted.
fn resolve_endpoint(capability: usize) -> Result<Arc<Endpoint>, SyscallError> {
    let proc = current_process().ok_or(SyscallError::InvalidState)?;
    let token = CapabilityToken::from_u64(capability as u64);
    let (object, _rights) = proc
        .capability_space
        .lock()
        .lookup_entry(token)
        .ok_or(SyscallError::PermissionDenied)?;

    match object {
        ObjectRef::Endpoint { endpoint } => Ok(endpoint),
        _ => Err(SyscallError::InvalidArgument),
    }
}

/// Create a port and return a capability for it
///
/// The returned value is the raw `CapabilityToken`; pass it back as the
/// `capability` argument of the other `sys_ipc_*` calls.
fn sys_ipc_create_endpoint() -> SyscallResult {
    let proc = current_process().ok_or(SyscallError::InvalidState)?;
    let cap_space = proc.capability_space.lock();
    let (_endpoint_id, cap) = crate::cap::ipc_integration::create_endpoint_with_capability(
        &cap_space,
    )
    .map_err(SyscallError::from)?;
    Ok(cap.to_u64() as usize)
}

/// IPC send system call
///
/// # Arguments
/// - capability: Capability token for the target port
/// - msg_ptr: Pointer to a `SmallMessage`
/// - msg_size: Size of the message (must fit `SmallMessage`; the core port
///   layer only carries inline payloads)
/// - flags: Send flags (unused)
fn sys_ipc_send(capability: usize, msg_ptr: usize, msg_size: usize, _flags: usize) -> SyscallResult {
    if msg_ptr == 0 || msg_size == 0 || msg_size > core::mem::size_of::<SmallMessage>() {
        return Err(SyscallError::InvalidArgument);
    }

    let endpoint = resolve_endpoint(capability)?;
    let proc = current_process().ok_or(SyscallError::InvalidState)?;
    let msg = unsafe { *(msg_ptr as *const SmallMessage) };
    endpoint.send_sync(Message::Small(msg), proc.pid)?;

    Ok(0)
}

/// IPC receive system call
///
/// # Arguments
/// - capability: Capability token for the port to receive from
/// - buffer: Buffer to receive the message into (sized for `SmallMessage`)
///
/// Blocks the caller until a message is queued.
fn sys_ipc_receive(capability: usize, buffer: usize) -> SyscallResult {
    if buffer == 0 {
        return Err(SyscallError::InvalidArgument);
    }

    let endpoint = resolve_endpoint(capability)?;
    let proc = current_process().ok_or(SyscallError::InvalidState)?;
    let msg = endpoint.receive_sync(proc.pid)?;

    let small = match msg {
        Message::Small(s) => s,
        // Out-of-line transfers are not part of the core port layer.
        Message::Large(_) => return Err(SyscallError::InvalidArgument),
    };
    unsafe {
        *(buffer as *mut SmallMessage) = small;
    }

    Ok(core::mem::size_of::<SmallMessage>())
}

/// IPC call (send and wait for reply)
///
/// Sends the request on the capability's port, then blocks for a single
/// reply on the same port. This is the two-party rendezvous case of the
/// port layer's call/reply semantics; routing a reply back through a
/// dedicated transient port is left for a multi-party extension.
fn sys_ipc_call(
    capability: usize,
    send_msg: usize,
    send_size: usize,
    recv_buf: usize,
    _recv_size: usize,
) -> SyscallResult {
    if send_msg == 0
        || send_size == 0
        || send_size > core::mem::size_of::<SmallMessage>()
        || recv_buf == 0
    {
        return Err(SyscallError::InvalidArgument);
    }

    let endpoint = resolve_endpoint(capability)?;
    let proc = current_process().ok_or(SyscallError::InvalidState)?;

    let request = unsafe { *(send_msg as *const SmallMessage) };
    endpoint.send_sync(Message::Small(request), proc.pid)?;

    let reply = endpoint.receive_sync(proc.pid)?;
    let small = match reply {
        Message::Small(s) => s,
        Message::Large(_) => return Err(SyscallError::InvalidArgument),
    };
    unsafe {
        *(recv_buf as *mut SmallMessage) = small;
    }

    Ok(core::mem::size_of::<SmallMessage>())
}

/// Reply to a previous call
///
/// # Arguments
/// - capability: Capability token for the port the original call arrived on
/// - msg_ptr: Pointer to the reply `SmallMessage`
/// - msg_size: Size of the reply (must fit `SmallMessage`)
fn sys_ipc_reply(capability: usize, msg_ptr: usize, msg_size: usize) -> SyscallResult {
    if msg_ptr == 0 || msg_size == 0 || msg_size > core::mem::size_of::<SmallMessage>() {
        return Err(SyscallError::InvalidArgument);
    }

    let endpoint = resolve_endpoint(capability)?;
    let proc = current_process().ok_or(SyscallError::InvalidState)?;
    let reply = unsafe { *(msg_ptr as *const SmallMessage) };
    endpoint.send_sync(Message::Small(reply), proc.pid)?;

    Ok(0)
}

/// Yield CPU to another process
fn sys_yield() -> SyscallResult {
    crate::sched::ipc_blocking::yield_cpu();
    Ok(0)
}

impl TryFrom<usize> for Syscall {
    type Error = ();

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            // IPC system calls
            0 => Ok(Syscall::IpcSend),
            1 => Ok(Syscall::IpcReceive),
            2 => Ok(Syscall::IpcCall),
            3 => Ok(Syscall::IpcReply),
            4 => Ok(Syscall::IpcCreateEndpoint),
            5 => Ok(Syscall::IpcBindEndpoint),
            6 => Ok(Syscall::IpcShareMemory),
            7 => Ok(Syscall::IpcMapMemory),

            // Process management
            10 => Ok(Syscall::ProcessYield),
            11 => Ok(Syscall::ProcessExit),
            12 => Ok(Syscall::ProcessFork),
            13 => Ok(Syscall::ProcessExec),
            14 => Ok(Syscall::ProcessWait),
            15 => Ok(Syscall::ProcessGetPid),
            16 => Ok(Syscall::ProcessGetPPid),
            17 => Ok(Syscall::ProcessSetPriority),
            18 => Ok(Syscall::ProcessGetPriority),

            // Memory management
            20 => Ok(Syscall::MemoryMap),
            21 => Ok(Syscall::MemoryUnmap),

            // Capability management
            30 => Ok(Syscall::CapabilityGrant),
            31 => Ok(Syscall::CapabilityRevoke),

            // Thread management
            40 => Ok(Syscall::ThreadCreate),
            41 => Ok(Syscall::ThreadExit),
            42 => Ok(Syscall::ThreadJoin),
            43 => Ok(Syscall::ThreadGetTid),
            44 => Ok(Syscall::ThreadSetAffinity),
            45 => Ok(Syscall::ThreadGetAffinity),

            _ => Err(()),
        }
    }
}
