//! The user-chosen (color, view) pair and partial updates to it.

use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ColorId {
    #[default]
    Purple,
    Blue,
    Orange,
}

impl ColorId {
    pub const ALL: [ColorId; 3] = [ColorId::Purple, ColorId::Blue, ColorId::Orange];

    /// Case-insensitive, whitespace-tolerant; `None` outside the closed set.
    pub fn try_parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(raw))
    }

    /// Unrecognized values clamp to the default color.
    pub fn parse(raw: &str) -> Self {
        Self::try_parse(raw).unwrap_or_default()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColorId::Purple => "purple",
            ColorId::Blue => "blue",
            ColorId::Orange => "orange",
        }
    }
}

impl fmt::Display for ColorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ViewMode {
    #[default]
    Front,
    Side,
    Back,
    Top,
    /// Free orbit around the 3D model.
    Interactive,
}

impl ViewMode {
    pub const ALL: [ViewMode; 5] = [
        ViewMode::Front,
        ViewMode::Side,
        ViewMode::Back,
        ViewMode::Top,
        ViewMode::Interactive,
    ];

    pub fn try_parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(raw))
    }

    pub fn parse(raw: &str) -> Self {
        Self::try_parse(raw).unwrap_or_default()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ViewMode::Front => "front",
            ViewMode::Side => "side",
            ViewMode::Back => "back",
            ViewMode::Top => "top",
            ViewMode::Interactive => "interactive",
        }
    }

    pub fn is_interactive(self) -> bool {
        self == ViewMode::Interactive
    }

    /// The still image shown for this view. `Interactive` has none of its own.
    pub fn still(self) -> ViewMode {
        match self {
            ViewMode::Interactive => ViewMode::default(),
            other => other,
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Configuration {
    pub color: ColorId,
    pub view: ViewMode,
}

impl Configuration {
    pub fn new(color: ColorId, view: ViewMode) -> Self {
        Self { color, view }
    }

    /// A new value with the patch's fields merged over this one.
    pub fn merged(self, patch: &ConfigPatch) -> Self {
        Self {
            color: patch.color.unwrap_or(self.color),
            view: patch.view.unwrap_or(self.view),
        }
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.color, self.view)
    }
}

/// A partial selection: fields left `None` keep their current value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct ConfigPatch {
    pub color: Option<ColorId>,
    pub view: Option<ViewMode>,
}

impl ConfigPatch {
    pub fn color(color: ColorId) -> Self {
        Self {
            color: Some(color),
            view: None,
        }
    }

    pub fn view(view: ViewMode) -> Self {
        Self {
            color: None,
            view: Some(view),
        }
    }

    pub fn with_color(mut self, color: ColorId) -> Self {
        self.color = Some(color);
        self
    }

    /// Builds a patch from untrusted strings, clamping unknown values.
    pub fn from_raw(color: Option<&str>, view: Option<&str>) -> Self {
        Self {
            color: color.map(ColorId::parse),
            view: view.map(ViewMode::parse),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.view.is_none()
    }
}

/// Which render path a configuration is shown through.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RepresentationKind {
    Model3D,
    Image2D,
}

impl RepresentationKind {
    pub fn label(self) -> &'static str {
        match self {
            RepresentationKind::Model3D => "model",
            RepresentationKind::Image2D => "image",
        }
    }
}
