//! Background task data structures

use crate::error::ViewerResult;
use crate::mesh::TexturedMesh;
use crate::ambient_occlusion::AoStatus;
use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Shared cooperative cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Latest-value progress published by a running task
#[derive(Debug, Default)]
pub struct ProgressSlot {
    /// f32 bits of the last reported fraction
    pub fraction_bits: AtomicU32,
    pub phase: Mutex<String>,
}

/// What a running job sees: its cancellation flag and its progress slot
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub cancel: CancellationToken,
    pub progress: Arc<ProgressSlot>,
}

/// Caller side of a submitted task
#[derive(Debug)]
pub struct TaskHandle<T> {
    pub label: String,
    pub cancel: CancellationToken,
    pub progress: Arc<ProgressSlot>,
    pub finished: Arc<AtomicBool>,
    pub result: Receiver<ViewerResult<T>>,
}

/// Task currently owned by a group
#[derive(Debug)]
pub struct ActiveTask {
    pub label: String,
    pub cancel: CancellationToken,
    pub thread: JoinHandle<()>,
}

/// Runs at most one task at a time for one display surface
#[derive(Debug)]
pub struct TaskGroup {
    pub name: String,
    pub pool: Option<Arc<rayon::ThreadPool>>,
    pub current: Mutex<Option<ActiveTask>>,
}

/// Meshes handed back by an AO task, with or without fresh values
#[derive(Debug, Clone)]
pub struct AoOutcome {
    pub meshes: Vec<TexturedMesh>,
    pub status: AoStatus,
}
