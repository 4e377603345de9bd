//! Background task operations
//!
//! A group owns at most one worker thread. Starting a task cancels the
//! running one and joins it first, so two passes never write the same
//! framebuffer or mesh set. Results travel on an unbounded channel and are
//! kept until the handle reads them.

use super::task_data::{
    ActiveTask, AoOutcome, CancellationToken, ProgressSlot, TaskContext, TaskGroup, TaskHandle,
};
use crate::ambient_occlusion::{ambient_occlusion_with, validate_ao_settings, AoSettings};
use crate::error::{ErrorContext, ViewerError, ViewerResult};
use crate::mesh::TexturedMesh;
use crate::renderer::{render_meshes_with, validate_view, RenderOutcome, RenderView};
use crossbeam_channel::TryRecvError;
use parking_lot::Mutex;
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ============================================================================
// GROUPS
// ============================================================================

/// Group whose jobs use the global rayon pool
pub fn create_task_group(name: &str) -> TaskGroup {
    TaskGroup {
        name: name.to_string(),
        pool: None,
        current: Mutex::new(None),
    }
}

/// Group whose jobs run inside a dedicated pool of `threads` workers
pub fn create_task_group_with_threads(name: &str, threads: usize) -> ViewerResult<TaskGroup> {
    let prefix = name.to_string();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .thread_name(move |i| format!("{}-worker-{}", prefix, i))
        .build()
        .with_context(|| format!("Failed to build worker pool for '{}'", name))?;

    log::info!(
        "[TaskGroup::create] '{}' with {} worker threads",
        name,
        threads.max(1)
    );
    Ok(TaskGroup {
        name: name.to_string(),
        pool: Some(Arc::new(pool)),
        current: Mutex::new(None),
    })
}

/// Start `job` on a background thread after stopping the running task.
pub fn run_task<T, F>(group: &TaskGroup, label: &str, job: F) -> ViewerResult<TaskHandle<T>>
where
    T: Send + 'static,
    F: FnOnce(&TaskContext) -> ViewerResult<T> + Send + 'static,
{
    let mut current = group.current.lock();
    if let Some(previous) = current.take() {
        stop_task(&group.name, previous);
    }

    let context = TaskContext {
        cancel: CancellationToken::new(),
        progress: Arc::new(ProgressSlot::default()),
    };
    let (sender, receiver) = crossbeam_channel::unbounded();
    let finished = Arc::new(AtomicBool::new(false));

    let handle = TaskHandle {
        label: label.to_string(),
        cancel: context.cancel.clone(),
        progress: context.progress.clone(),
        finished: finished.clone(),
        result: receiver,
    };

    let pool = group.pool.clone();
    let task_label = label.to_string();
    let worker_context = context.clone();
    let thread = std::thread::Builder::new()
        .name(format!("{}-{}", group.name, label))
        .spawn(move || {
            let outcome = panic::catch_unwind(panic::AssertUnwindSafe(|| match &pool {
                Some(pool) => pool.install(|| job(&worker_context)),
                None => job(&worker_context),
            }));

            let result = match outcome {
                Ok(result) => result,
                Err(panic_info) => {
                    let message = if let Some(s) = panic_info.downcast_ref::<String>() {
                        s.clone()
                    } else if let Some(s) = panic_info.downcast_ref::<&str>() {
                        s.to_string()
                    } else {
                        "Unknown panic".to_string()
                    };
                    Err(ViewerError::TaskFailed {
                        task: task_label.clone(),
                        error: message,
                    })
                }
            };

            if let Err(e) = &result {
                log::error!("[TaskGroup::run_task] Task '{}' failed: {}", task_label, e);
            }
            // The handle may already be gone; the result is then simply discarded
            let _ = sender.send(result);
            finished.store(true, Ordering::Release);
        })
        .map_err(|e| ViewerError::TaskFailed {
            task: label.to_string(),
            error: e.to_string(),
        })?;

    log::info!("[TaskGroup::run_task] '{}' started task '{}'", group.name, label);
    *current = Some(ActiveTask {
        label: label.to_string(),
        cancel: context.cancel,
        thread,
    });
    Ok(handle)
}

fn stop_task(group_name: &str, task: ActiveTask) {
    if !task.thread.is_finished() {
        log::info!(
            "[TaskGroup::stop_task] '{}' cancelling running task '{}'",
            group_name,
            task.label
        );
    }
    task.cancel.cancel();
    if task.thread.join().is_err() {
        log::warn!(
            "[TaskGroup::stop_task] Worker of task '{}' terminated abnormally",
            task.label
        );
    }
}

/// Cancel the running task, if any, and wait until it has stopped
pub fn cancel_active_task(group: &TaskGroup) {
    let previous = group.current.lock().take();
    if let Some(task) = previous {
        stop_task(&group.name, task);
    }
}

/// True while a task of this group is still running
pub fn is_busy(group: &TaskGroup) -> bool {
    group
        .current
        .lock()
        .as_ref()
        .map_or(false, |task| !task.thread.is_finished())
}

impl Drop for TaskGroup {
    fn drop(&mut self) {
        if let Some(task) = self.current.get_mut().take() {
            stop_task(&self.name, task);
        }
    }
}

// ============================================================================
// CONTEXT
// ============================================================================

/// Publish `fraction` and return true when the task should stop
pub fn report_progress(context: &TaskContext, fraction: f32) -> bool {
    context
        .progress
        .fraction_bits
        .store(fraction.clamp(0.0, 1.0).to_bits(), Ordering::Release);
    context.cancel.is_cancelled()
}

/// Publish a phase label with `fraction` and return true when the task should stop
pub fn report_phase(context: &TaskContext, phase: &str, fraction: f32) -> bool {
    {
        let mut current = context.progress.phase.lock();
        if current.as_str() != phase {
            current.clear();
            current.push_str(phase);
        }
    }
    report_progress(context, fraction)
}

// ============================================================================
// HANDLES
// ============================================================================

pub fn task_progress(handle: &TaskHandle<impl Sized>) -> f32 {
    f32::from_bits(handle.progress.fraction_bits.load(Ordering::Acquire))
}

pub fn task_phase(handle: &TaskHandle<impl Sized>) -> String {
    handle.progress.phase.lock().clone()
}

/// Request cancellation without waiting
pub fn cancel_task(handle: &TaskHandle<impl Sized>) {
    handle.cancel.cancel();
}

pub fn is_task_finished(handle: &TaskHandle<impl Sized>) -> bool {
    handle.finished.load(Ordering::Acquire)
}

/// Non-blocking check for the task result
pub fn try_task_result<T>(handle: &TaskHandle<T>) -> Option<ViewerResult<T>> {
    match handle.result.try_recv() {
        Ok(result) => Some(result),
        Err(TryRecvError::Empty) => None,
        Err(TryRecvError::Disconnected) => Some(Err(ViewerError::TaskFailed {
            task: handle.label.clone(),
            error: "result already taken or worker lost".to_string(),
        })),
    }
}

/// Block until the task delivers its result
pub fn wait_for_task<T>(handle: TaskHandle<T>) -> ViewerResult<T> {
    handle.result.recv().map_err(|_| ViewerError::TaskFailed {
        task: handle.label.clone(),
        error: "worker ended without a result".to_string(),
    })?
}

// ============================================================================
// SUBMISSION
// ============================================================================

/// Render a mesh snapshot in the background.
///
/// An empty mesh set or an invalid view is rejected before anything starts.
pub fn submit_render(
    group: &TaskGroup,
    meshes: Arc<Vec<TexturedMesh>>,
    view: RenderView,
) -> ViewerResult<TaskHandle<RenderOutcome>> {
    if meshes.is_empty() {
        return Err(ViewerError::NoMeshes);
    }
    validate_view(&view)?;

    run_task(group, "render", move |context| {
        render_meshes_with(&meshes, &view, |fraction| report_progress(context, fraction))
    })
}

/// Compute ambient occlusion in the background.
///
/// The meshes are moved into the task and handed back in the outcome, so
/// nothing else can read them while values are written.
pub fn submit_ambient_occlusion(
    group: &TaskGroup,
    meshes: Vec<TexturedMesh>,
    settings: AoSettings,
) -> ViewerResult<TaskHandle<AoOutcome>> {
    if meshes.is_empty() {
        return Err(ViewerError::NoMeshes);
    }
    validate_ao_settings(&settings)?;

    run_task(group, "ambient occlusion", move |context| {
        let mut meshes = meshes;
        let status = ambient_occlusion_with(&mut meshes, &settings, |phase, fraction| {
            report_phase(context, phase, fraction)
        })?;
        Ok(AoOutcome { meshes, status })
    })
}
