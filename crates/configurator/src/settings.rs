use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const ENV_IMAGE_BASE: &str = "SUITCASE_IMAGE_BASE";
pub const ENV_MODEL_URL: &str = "SUITCASE_MODEL_URL";
pub const ENV_FETCH_TIMEOUT_MS: &str = "SUITCASE_FETCH_TIMEOUT_MS";
pub const ENV_FADE_MS: &str = "SUITCASE_FADE_MS";
pub const ENV_CACHE_BUST: &str = "SUITCASE_CACHE_BUST";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid value {value:?} for {var}")]
    Env { var: &'static str, value: String },
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub assets: AssetSettings,
    pub fetch: FetchSettings,
    pub cache: CacheSettings,
    pub transition: TransitionSettings,
    pub motion: MotionSettings,
    pub orbit: OrbitSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    /// Directory holding `suitcase-{color}-{view}.png`.
    pub image_base: String,
    /// Image on `image_base` that is known to exist.
    pub fallback_image: String,
    pub model_url: String,
    pub model_mirrors: Vec<String>,
    pub image_placeholder: String,
    pub model_placeholder: String,
    pub model_scale: f64,
    pub model_offset: [f64; 3],
}

const DEFAULT_IMAGE_BASE: &str =
    "https://raw.githubusercontent.com/Dr31K0/models/b284a7ad9445681838f7d343907e78e0a3b40ce5";

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            image_base: DEFAULT_IMAGE_BASE.to_string(),
            fallback_image: "suitcase-purple-front.png".to_string(),
            model_url: "https://cdn.jsdelivr.net/gh/Dr31K0/3DSuitcase@main/model.glb".to_string(),
            model_mirrors: Vec::new(),
            image_placeholder: "bundled:suitcase-placeholder.png".to_string(),
            model_placeholder: "bundled:placeholder-box".to_string(),
            model_scale: 1.5,
            model_offset: [0.0, -0.1, 0.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// In-flight fetches older than this fail with a timeout; 0 disables.
    pub timeout_ms: u64,
    pub cache_bust: bool,
    pub max_pending: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 15_000,
            cache_bust: true,
            max_pending: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub image_budget_bytes: usize,
    pub model_budget_bytes: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            image_budget_bytes: 64 * 1024 * 1024,
            model_budget_bytes: 256 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TransitionSettings {
    pub fade_ms: u64,
}

impl Default for TransitionSettings {
    fn default() -> Self {
        Self { fade_ms: 200 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MotionSettings {
    pub idle_amplitude_rad: f64,
    /// Seconds per radian of the idle oscillation's phase.
    pub idle_time_scale_s: f64,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            idle_amplitude_rad: 0.1,
            idle_time_scale_s: 4.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OrbitSettings {
    pub min_polar_rad: f64,
    pub max_polar_rad: f64,
    pub min_distance: f64,
    pub max_distance: f64,
    pub start: [f64; 3],
    pub rotate_rad_per_px: f64,
    pub zoom_per_unit: f64,
}

impl Default for OrbitSettings {
    fn default() -> Self {
        Self {
            min_polar_rad: FRAC_PI_4,
            max_polar_rad: FRAC_PI_2,
            min_distance: 3.0,
            max_distance: 7.0,
            start: [0.0, 0.0, 5.0],
            rotate_rad_per_px: 0.005,
            zoom_per_unit: 0.01,
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects bounds that cannot describe a range.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let orbit = &self.orbit;
        check_range("orbit.polar", orbit.min_polar_rad, orbit.max_polar_rad)?;
        check_range("orbit.distance", orbit.min_distance, orbit.max_distance)?;
        if orbit.min_distance <= 0.0 {
            return Err(SettingsError::Invalid {
                field: "orbit.min_distance",
                reason: format!("{} is not positive", orbit.min_distance),
            });
        }
        Ok(())
    }

    /// Defaults when `path` is `None` or names a file that does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, SettingsError> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Applies `SUITCASE_*` overrides read through `lookup`.
    pub fn with_env(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SettingsError> {
        if let Some(base) = lookup(ENV_IMAGE_BASE) {
            self.assets.image_base = base;
        }
        if let Some(url) = lookup(ENV_MODEL_URL) {
            self.assets.model_url = url;
        }
        if let Some(raw) = lookup(ENV_FETCH_TIMEOUT_MS) {
            self.fetch.timeout_ms = parse_env(ENV_FETCH_TIMEOUT_MS, raw)?;
        }
        if let Some(raw) = lookup(ENV_FADE_MS) {
            self.transition.fade_ms = parse_env(ENV_FADE_MS, raw)?;
        }
        if let Some(raw) = lookup(ENV_CACHE_BUST) {
            self.fetch.cache_bust = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(SettingsError::Env {
                        var: ENV_CACHE_BUST,
                        value: raw,
                    });
                }
            };
        }
        Ok(self)
    }

    pub fn with_process_env(self) -> Result<Self, SettingsError> {
        self.with_env(|var| std::env::var(var).ok())
    }
}

fn check_range(field: &'static str, min: f64, max: f64) -> Result<(), SettingsError> {
    if min.is_finite() && max.is_finite() && min <= max {
        return Ok(());
    }
    Err(SettingsError::Invalid {
        field,
        reason: format!("min {min} exceeds max {max}"),
    })
}

fn parse_env<T: std::str::FromStr>(var: &'static str, raw: String) -> Result<T, SettingsError> {
    raw.trim()
        .parse()
        .map_err(|_| SettingsError::Env { var, value: raw })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_json_keeps_defaults() {
        let settings = Settings::from_json(
            r#"{
                "fetch": { "timeout_ms": 500 },
                "assets": { "model_mirrors": ["https://mirror/model.glb"] }
            }"#,
        )
        .unwrap();
        assert_eq!(settings.fetch.timeout_ms, 500);
        assert!(settings.fetch.cache_bust);
        assert_eq!(settings.assets.model_mirrors, vec!["https://mirror/model.glb"]);
        assert_eq!(settings.assets.fallback_image, "suitcase-purple-front.png");
        assert_eq!(settings.transition, TransitionSettings { fade_ms: 200 });
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_MODEL_URL, "file:///tmp/model.glb"),
            (ENV_FADE_MS, " 350 "),
            (ENV_CACHE_BUST, "off"),
        ]);
        let settings = Settings::default()
            .with_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(settings.assets.model_url, "file:///tmp/model.glb");
        assert_eq!(settings.transition.fade_ms, 350);
        assert!(!settings.fetch.cache_bust);
        assert_eq!(settings.fetch.timeout_ms, 15_000);
    }

    #[test]
    fn bad_env_value_is_an_error() {
        let err = Settings::default()
            .with_env(|k| (k == ENV_FETCH_TIMEOUT_MS).then(|| "soon".to_string()))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value \"soon\" for SUITCASE_FETCH_TIMEOUT_MS"
        );
    }

    #[test]
    fn inverted_orbit_bounds_are_rejected() {
        let settings =
            Settings::from_json(r#"{ "orbit": { "min_distance": 8.0, "max_distance": 7.0 } }"#)
                .unwrap();
        let err = settings.validate().unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Invalid {
                field: "orbit.distance",
                ..
            }
        ));
        assert!(Settings::default().validate().is_ok());

        let path = std::env::temp_dir().join(format!("suitcase-orbit-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "orbit": { "min_polar_rad": 2.0, "max_polar_rad": 1.0 } }"#)
            .unwrap();
        let loaded = Settings::load(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(
            loaded,
            Err(SettingsError::Invalid {
                field: "orbit.polar",
                ..
            })
        ));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings =
            Settings::load_or_default(Some(Path::new("/nonexistent/suitcase.json"))).unwrap();
        assert_eq!(settings, Settings::default());
    }
}
