use std::sync::Arc;

use foundation::ids::Version;

use crate::configuration::RepresentationKind;
use crate::material::SurfaceAppearance;
use crate::model::ModelAsset;
use crate::motion::CameraPose;
use crate::still::ImageRef;

pub const INTERACTION_HINT: &str = "Drag to rotate • Scroll to zoom";

/// What is drawn for one configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum VisualState {
    Rendering3D {
        model: Arc<ModelAsset>,
        appearance: SurfaceAppearance,
    },
    Rendering2D(ImageRef),
    Placeholder,
    ErrorDisplay(String),
}

impl VisualState {
    pub fn label(&self) -> &'static str {
        match self {
            VisualState::Rendering3D { .. } => "3d",
            VisualState::Rendering2D(_) => "2d",
            VisualState::Placeholder => "placeholder",
            VisualState::ErrorDisplay(_) => "error",
        }
    }

    pub fn is_3d(&self) -> bool {
        matches!(self, VisualState::Rendering3D { .. })
    }
}

impl std::fmt::Display for VisualState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VisualState::Rendering3D { model, appearance } => write!(
                f,
                "3d {} ({} surfaces, {})",
                model.source,
                model.surfaces.len(),
                appearance.base_color.to_hex()
            ),
            VisualState::Rendering2D(image) => write!(f, "2d {}", image.uri),
            VisualState::Placeholder => f.write_str("placeholder"),
            VisualState::ErrorDisplay(message) => write!(f, "error: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub visual: VisualState,
    pub opacity: f32,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Presentation {
    /// Configuration version the newest visible layer belongs to.
    pub version: Version,
    pub kind: RepresentationKind,
    /// Bottom to top. Opacities sum to one.
    pub layers: Vec<Layer>,
    pub model_yaw: f64,
    pub camera: CameraPose,
    pub notice: Option<String>,
    pub hint: Option<&'static str>,
}

impl Presentation {
    pub fn total_opacity(&self) -> f32 {
        self.layers.iter().map(|l| l.opacity).sum()
    }

    /// The layer that dominates the frame.
    pub fn primary(&self) -> Option<&VisualState> {
        self.layers
            .iter()
            .rev()
            .max_by(|a, b| a.opacity.total_cmp(&b.opacity))
            .map(|l| &l.visual)
    }

    pub fn is_transitioning(&self) -> bool {
        self.layers.len() > 1
    }
}
