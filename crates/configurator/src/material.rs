use foundation::color::Rgb;

use crate::configuration::ColorId;

/// Material parameters applied to every paintable surface of the model.
///
/// All scalar fields lie in `[0, 1]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SurfaceAppearance {
    pub base_color: Rgb,
    pub emissive_color: Rgb,
    pub emissive_intensity: f32,
    pub metalness: f32,
    pub roughness: f32,
    pub clear_coat: f32,
    pub clear_coat_roughness: f32,
    pub reflectivity: f32,
}

impl SurfaceAppearance {
    pub fn scalars(&self) -> [f32; 6] {
        [
            self.emissive_intensity,
            self.metalness,
            self.roughness,
            self.clear_coat,
            self.clear_coat_roughness,
            self.reflectivity,
        ]
    }

    pub fn is_normalized(&self) -> bool {
        self.base_color.is_normalized()
            && self.emissive_color.is_normalized()
            && self.scalars().iter().all(|v| (0.0..=1.0).contains(v))
    }
}

const PURPLE: Rgb = Rgb::from_u32(0xB794F6);
const BLUE: Rgb = Rgb::from_u32(0x7AB7FF);
const ORANGE: Rgb = Rgb::from_u32(0xFFAC74);

const EMISSIVE_INTENSITY: f32 = 0.2;
const METALNESS: f32 = 0.4;
const ROUGHNESS: f32 = 0.3;
const CLEAR_COAT: f32 = 0.5;
const CLEAR_COAT_ROUGHNESS: f32 = 0.1;
const REFLECTIVITY: f32 = 0.5;

pub struct MaterialMapper;

impl MaterialMapper {
    pub fn base_color(color: ColorId) -> Rgb {
        match color {
            ColorId::Purple => PURPLE,
            ColorId::Blue => BLUE,
            ColorId::Orange => ORANGE,
        }
    }

    pub fn map_color(color: ColorId) -> SurfaceAppearance {
        let base = Self::base_color(color);
        SurfaceAppearance {
            base_color: base,
            emissive_color: base,
            emissive_intensity: EMISSIVE_INTENSITY,
            metalness: METALNESS,
            roughness: ROUGHNESS,
            clear_coat: CLEAR_COAT,
            clear_coat_roughness: CLEAR_COAT_ROUGHNESS,
            reflectivity: REFLECTIVITY,
        }
    }

    /// Unknown names get the purple appearance, same as [`ColorId::default`].
    pub fn map_name(raw: &str) -> SurfaceAppearance {
        Self::map_color(ColorId::parse(raw))
    }
}
