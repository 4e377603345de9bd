//! Task Module
//!
//! Background execution of render and AO passes with progress reporting and
//! cooperative cancellation.
//!
//! - task_data.rs: tokens, contexts, handles, groups
//! - task_operations.rs: scheduling and submission

pub mod task_data;
pub mod task_operations;

pub use task_data::{AoOutcome, CancellationToken, TaskContext, TaskGroup, TaskHandle};

pub use task_operations::{
    // Groups
    cancel_active_task,
    create_task_group,
    create_task_group_with_threads,
    is_busy,
    run_task,

    // Context
    report_phase,
    report_progress,

    // Handles
    cancel_task,
    is_task_finished,
    task_phase,
    task_progress,
    try_task_result,
    wait_for_task,

    // Submission
    submit_ambient_occlusion,
    submit_render,
};
