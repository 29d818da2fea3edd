//! Scheduler
//!
//! Per-CPU priority-bitmap ready queues with MLFQ-style active/expired
//! swap (`queue`), the scheduling policy and context-switch driver
//! (`scheduler`), task control blocks (`task`), SMP bring-up and per-CPU
//! state (`smp`), and the blocking primitives IPC uses to park and wake
//! tasks (`ipc_blocking`).

#![allow(dead_code)]

pub mod init;
pub mod ipc_blocking;
pub mod load_balance;
pub mod metrics;
pub mod numa;
pub mod percpu_queue;
pub mod process_compat;
pub mod queue;
pub mod riscv_scheduler;
pub mod runtime;
pub mod scheduler;
pub mod smp;
pub mod task;
pub mod task_management;
pub mod task_ptr;

pub use crate::process::{ProcessId, ProcessState, ThreadId};
pub use ipc_blocking::{block_on_ipc, block_process, wake_up_process, yield_cpu};
pub use runtime::idle_task_entry;
pub use scheduler::SCHEDULER;
pub use task::{Priority, SchedClass, Task, TaskContext};
pub use task_management::exit_task;

/// Current task's process id, or process 0 if nothing has been
/// scheduled yet (early boot, before `init`).
pub fn current_process_id() -> ProcessId {
    match SCHEDULER.lock().current() {
        // SAFETY: a task pointer held by the scheduler stays valid for
        // as long as it's current.
        Some(task) => unsafe { task.as_ref().pid },
        None => ProcessId(0),
    }
}

/// Current task's raw thread id, or 0 if nothing has been scheduled yet.
pub fn get_current_thread_id() -> u64 {
    match SCHEDULER.lock().current() {
        // SAFETY: see `current_process_id`.
        Some(task) => unsafe { task.as_ref().tid.0 },
        None => 0,
    }
}

/// Advance the current task's time slice by one tick, preempting it
/// through the scheduler once the slice runs out.
pub fn timer_tick() {
    SCHEDULER.lock().tick();
}

/// Bring up SMP, the idle task, and the preemption timer.
pub fn init() {
    init::init();
}

/// Hand control to the scheduler. Never returns.
pub fn run() -> ! {
    runtime::start();
}
