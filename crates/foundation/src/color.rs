/// Linear-ish RGB color with components in `[0, 1]`.
///
/// Colors are authored as `#RRGGBB` hex strings; no color-space conversion
/// happens here.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorParseError {
    pub input: String,
}

impl std::fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid hex color {:?} (expected #RRGGBB)", self.input)
    }
}

impl std::error::Error for ColorParseError {}

impl Rgb {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Builds a color from a packed `0xRRGGBB` value.
    pub const fn from_u32(rgb: u32) -> Self {
        Self {
            r: ((rgb >> 16) & 0xff) as f32 / 255.0,
            g: ((rgb >> 8) & 0xff) as f32 / 255.0,
            b: (rgb & 0xff) as f32 / 255.0,
        }
    }

    pub fn from_hex(hex: &str) -> Result<Self, ColorParseError> {
        let err = || ColorParseError {
            input: hex.to_string(),
        };
        let digits = hex.trim().strip_prefix('#').ok_or_else(err)?;
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(err());
        }
        let packed = u32::from_str_radix(digits, 16).map_err(|_| err())?;
        Ok(Self::from_u32(packed))
    }

    pub fn to_hex(self) -> String {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02X}{:02X}{:02X}", q(self.r), q(self.g), q(self.b))
    }

    pub fn components(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    pub fn is_normalized(self) -> bool {
        self.components()
            .iter()
            .all(|c| c.is_finite() && (0.0..=1.0).contains(c))
    }
}
