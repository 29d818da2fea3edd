//! IPC capability integration
//!
//! Integrates capability-based access control with the IPC system.

use super::{
    manager::{cap_manager, CapError},
    object::ObjectRef,
    space::CapabilitySpace,
    token::{CapabilityToken, Rights},
};
use crate::{
    ipc::{EndpointId, IpcError},
    process::ProcessId,
};

#[cfg(feature = "alloc")]
extern crate alloc;

/// IPC-specific capability rights
pub struct IpcRights;

impl IpcRights {
    /// Can send messages to endpoint
    pub const SEND: Rights = Rights::WRITE;
    /// Can receive messages from endpoint
    pub const RECEIVE: Rights = Rights::READ;
    /// Can bind to endpoint
    pub const BIND: Rights = Rights::EXECUTE;
    /// Can delegate endpoint capability
    pub const GRANT: Rights = Rights::GRANT;
    /// Can create new endpoints
    pub const CREATE: Rights = Rights::CREATE;
}

/// Create an IPC endpoint capability
///
/// Wraps the endpoint already registered under `endpoint_id` so the
/// capability shares its queue with the registry entry and with any
/// capability later delegated from it, instead of pointing at an
/// unreachable copy.
pub fn create_endpoint_capability(
    endpoint_id: EndpointId,
    owner: ProcessId,
    rights: Rights,
    cap_space: &CapabilitySpace,
) -> Result<CapabilityToken, CapError> {
    #[cfg(feature = "alloc")]
    {
        let endpoint = crate::ipc::registry::get_endpoint_arc(endpoint_id)
            .map_err(|_| CapError::InvalidObject)?;
        let object = ObjectRef::Endpoint { endpoint };
        cap_manager().create_capability(object, rights, cap_space)
    }
    #[cfg(not(feature = "alloc"))]
    {
        let object = ObjectRef::Process { pid: owner };
        cap_manager().create_capability(object, rights, cap_space)
    }
}

/// Find the capability this process already holds over a given endpoint
///
/// Used by the IPC layer to answer "find the capability for this port"
/// without the caller having to carry the token separately.
#[cfg(feature = "alloc")]
pub fn find_endpoint_capability(
    endpoint_id: EndpointId,
    cap_space: &CapabilitySpace,
) -> Option<CapabilityToken> {
    cap_space.find_by_resource(ObjectRef::ENDPOINT_KIND, endpoint_id)
}

/// Check if process has permission to send to endpoint
pub fn check_send_permission(
    cap: CapabilityToken,
    cap_space: &CapabilitySpace,
) -> Result<(), IpcError> {
    match super::manager::check_capability(cap, IpcRights::SEND, cap_space) {
        Ok(()) => Ok(()),
        Err(CapError::InvalidCapability) => Err(IpcError::InvalidCapability),
        Err(CapError::InsufficientRights) => Err(IpcError::PermissionDenied),
        Err(CapError::CapabilityRevoked) => Err(IpcError::InvalidCapability),
        Err(_) => Err(IpcError::PermissionDenied),
    }
}

/// Check if process has permission to receive from endpoint
pub fn check_receive_permission(
    cap: CapabilityToken,
    cap_space: &CapabilitySpace,
) -> Result<(), IpcError> {
    match super::manager::check_capability(cap, IpcRights::RECEIVE, cap_space) {
        Ok(()) => Ok(()),
        Err(CapError::InvalidCapability) => Err(IpcError::InvalidCapability),
        Err(CapError::InsufficientRights) => Err(IpcError::PermissionDenied),
        Err(CapError::CapabilityRevoked) => Err(IpcError::InvalidCapability),
        Err(_) => Err(IpcError::PermissionDenied),
    }
}

/// Check if process has permission to bind to endpoint
pub fn check_bind_permission(
    cap: CapabilityToken,
    cap_space: &CapabilitySpace,
) -> Result<(), IpcError> {
    match super::manager::check_capability(cap, IpcRights::BIND, cap_space) {
        Ok(()) => Ok(()),
        Err(CapError::InvalidCapability) => Err(IpcError::InvalidCapability),
        Err(CapError::InsufficientRights) => Err(IpcError::PermissionDenied),
        Err(CapError::CapabilityRevoked) => Err(IpcError::InvalidCapability),
        Err(_) => Err(IpcError::PermissionDenied),
    }
}

/// Delegate IPC endpoint capability to another process
pub fn delegate_endpoint_capability(
    cap: CapabilityToken,
    source_cap_space: &CapabilitySpace,
    target_cap_space: &CapabilitySpace,
    new_rights: Rights,
) -> Result<CapabilityToken, IpcError> {
    match cap_manager().delegate(cap, source_cap_space, target_cap_space, new_rights) {
        Ok(new_cap) => Ok(new_cap),
        Err(CapError::InvalidCapability) => Err(IpcError::InvalidCapability),
        Err(CapError::PermissionDenied) => Err(IpcError::PermissionDenied),
        Err(_) => Err(IpcError::PermissionDenied),
    }
}

/// Wrapper for IPC operations with capability checks
pub struct CapabilityCheckedIpc;

impl CapabilityCheckedIpc {
    /// Send a message with capability check
    pub fn send_with_capability(
        endpoint_id: EndpointId,
        cap: CapabilityToken,
        cap_space: &CapabilitySpace,
        msg: crate::ipc::Message,
    ) -> Result<(), IpcError> {
        check_send_permission(cap, cap_space)?;

        let sender = crate::process::current_process()
            .map(|p| p.pid)
            .unwrap_or(ProcessId(0));
        crate::ipc::registry::get_endpoint_arc(endpoint_id)?.send_sync(msg, sender)
    }

    /// Receive a message with capability check
    pub fn receive_with_capability(
        endpoint_id: EndpointId,
        cap: CapabilityToken,
        cap_space: &CapabilitySpace,
    ) -> Result<crate::ipc::Message, IpcError> {
        check_receive_permission(cap, cap_space)?;

        let receiver = crate::process::current_process()
            .map(|p| p.pid)
            .unwrap_or(ProcessId(0));
        crate::ipc::registry::get_endpoint_arc(endpoint_id)?.receive_sync(receiver)
    }
}

/// Create a new IPC endpoint with initial capability
pub fn create_endpoint_with_capability(
    cap_space: &CapabilitySpace,
) -> Result<(EndpointId, CapabilityToken), IpcError> {
    // Get current process ID
    let owner = crate::process::current_process()
        .map(|p| p.pid)
        .unwrap_or(ProcessId(0));

    // Create the endpoint through the registry (registry endpoints are keyed
    // by the raw ipc::capability::ProcessId, not the process::ProcessId newtype)
    let (endpoint_id, _ipc_cap) = crate::ipc::registry::create_endpoint(owner.0)?;

    // Create full-rights capability for owner
    let rights = IpcRights::SEND | IpcRights::RECEIVE | IpcRights::BIND | IpcRights::GRANT;
    let cap = create_endpoint_capability(endpoint_id, owner, rights, cap_space)
        .map_err(|_| IpcError::OutOfMemory)?;

    Ok((endpoint_id, cap))
}
