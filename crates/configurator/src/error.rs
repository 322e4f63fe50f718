//! Failure taxonomy and the reporting contract every pipeline stage uses.

use std::cell::RefCell;
use std::rc::Rc;

use streaming::error::FetchError;
use thiserror::Error;
use tracing::error;

use crate::capability::CapabilityError;

pub const CONTEXT_MODEL_FETCH: &str = "ModelLoadPipeline:fetch";
pub const CONTEXT_MODEL_APPLY: &str = "ModelLoadPipeline:apply";
pub const CONTEXT_IMAGE_DISPLAY: &str = "ImageLoadPipeline:display";
pub const CONTEXT_CAPABILITY_PROBE: &str = "CapabilityDetector:probe";
pub const CONTEXT_SURFACE_CREATE: &str = "RenderSurface:create";

/// Shown with any failure that takes the 3D path away from the user.
pub const REMEDIATION: &str =
    "Try using a modern browser like Chrome, Firefox, or Edge with hardware acceleration enabled.";

/// A model downloaded and decoded but could not be prepared for display.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    #[error("{uri}: scene contains no drawable surfaces")]
    EmptyScene { uri: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rendering surface could not be created: {message}")]
pub struct SurfaceCreationError {
    pub message: String,
}

impl SurfaceCreationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Capability(#[from] CapabilityError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Apply(#[from] ApplyError),
    #[error(transparent)]
    Surface(#[from] SurfaceCreationError),
}

/// Receives every failure the core cannot hide. Fire and forget.
pub trait ErrorReporter {
    fn report(&self, error: &PipelineError, context: &'static str);
}

/// Logs each report at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, err: &PipelineError, context: &'static str) {
        error!(context, error = %err, "pipeline failure");
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub context: &'static str,
    pub error: PipelineError,
}

/// Keeps reports in memory. Clones share the same log.
#[derive(Debug, Default, Clone)]
pub struct RecordingReporter {
    reports: Rc<RefCell<Vec<Report>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.reports.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.borrow().is_empty()
    }

    pub fn in_context(&self, context: &str) -> Vec<Report> {
        self.reports
            .borrow()
            .iter()
            .filter(|r| r.context == context)
            .cloned()
            .collect()
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, err: &PipelineError, context: &'static str) {
        self.reports.borrow_mut().push(Report {
            context,
            error: err.clone(),
        });
    }
}
