use once_cell::unsync::OnceCell;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::REMEDIATION;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("no hardware-accelerated graphics adapter is available")]
    NoAdapter,
    #[error("only a software renderer is available ({adapter})")]
    SoftwareOnly { adapter: String },
    #[error("3D rendering is disabled: {0}")]
    Disabled(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    pub supports_3d: bool,
    /// Why 3D is unavailable, worded for the user.
    pub reason: Option<String>,
}

impl Capability {
    pub fn supported() -> Self {
        Self {
            supports_3d: true,
            reason: None,
        }
    }

    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self {
            supports_3d: false,
            reason: Some(reason.into()),
        }
    }

    fn from_error(err: &CapabilityError) -> Self {
        Self::unsupported(format!("3D view unavailable: {err}. {REMEDIATION}"))
    }
}

/// Environment check for hardware-accelerated rendering.
pub trait CapabilityProbe {
    fn probe(&self) -> Result<(), CapabilityError>;
}

/// Probe with a fixed answer, for hosts that already know.
#[derive(Debug, Clone)]
pub struct StaticProbe(Result<(), CapabilityError>);

impl StaticProbe {
    pub fn supported() -> Self {
        Self(Ok(()))
    }

    pub fn failing(err: CapabilityError) -> Self {
        Self(Err(err))
    }
}

impl CapabilityProbe for StaticProbe {
    fn probe(&self) -> Result<(), CapabilityError> {
        self.0.clone()
    }
}

#[derive(Debug)]
struct Detection {
    capability: Capability,
    error: Option<CapabilityError>,
}

/// Runs its probe at most once and remembers the answer.
#[derive(Debug)]
pub struct CapabilityDetector<P> {
    probe: P,
    detection: OnceCell<Detection>,
}

impl<P: CapabilityProbe> CapabilityDetector<P> {
    pub fn new(probe: P) -> Self {
        Self {
            probe,
            detection: OnceCell::new(),
        }
    }

    pub fn detect(&self) -> &Capability {
        &self.detection().capability
    }

    /// The probe failure behind an unsupported result, if any.
    pub fn failure(&self) -> Option<&CapabilityError> {
        self.detection().error.as_ref()
    }

    fn detection(&self) -> &Detection {
        self.detection.get_or_init(|| match self.probe.probe() {
            Ok(()) => {
                debug!("hardware-accelerated rendering available");
                Detection {
                    capability: Capability::supported(),
                    error: None,
                }
            }
            Err(err) => {
                warn!(error = %err, "3D rendering unavailable");
                Detection {
                    capability: Capability::from_error(&err),
                    error: Some(err),
                }
            }
        })
    }
}
