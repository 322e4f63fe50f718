use streaming::candidate::CandidateList;

use crate::configuration::{ColorId, Configuration, RepresentationKind, ViewMode};
use crate::settings::AssetSettings;

/// Maps a configuration to the ordered sources for its asset.
///
/// Pure: the same inputs always give the same list. Cache tokens are added by
/// the load pipelines, not here.
#[derive(Debug, Clone)]
pub struct AssetResolver {
    image_base: String,
    fallback_image: String,
    model_url: String,
    model_mirrors: Vec<String>,
    image_placeholder: String,
    model_placeholder: String,
}

impl Default for AssetResolver {
    fn default() -> Self {
        Self::from_settings(&AssetSettings::default())
    }
}

impl AssetResolver {
    pub fn from_settings(assets: &AssetSettings) -> Self {
        Self {
            image_base: assets.image_base.trim_end_matches('/').to_string(),
            fallback_image: assets.fallback_image.clone(),
            model_url: assets.model_url.clone(),
            model_mirrors: assets.model_mirrors.clone(),
            image_placeholder: assets.image_placeholder.clone(),
            model_placeholder: assets.model_placeholder.clone(),
        }
    }

    pub fn resolve(&self, config: &Configuration, kind: RepresentationKind) -> CandidateList {
        match kind {
            RepresentationKind::Model3D => CandidateList::new(
                std::iter::once(self.model_url.clone()).chain(self.model_mirrors.iter().cloned()),
                self.model_placeholder.as_str(),
            ),
            RepresentationKind::Image2D => CandidateList::new(
                [
                    self.image_uri(config.color, config.view),
                    format!("{}/{}", self.image_base, self.fallback_image),
                ],
                self.image_placeholder.as_str(),
            ),
        }
    }

    /// `{base}/suitcase-{color}-{view}.png`, always with a still view.
    pub fn image_uri(&self, color: ColorId, view: ViewMode) -> String {
        format!("{}/suitcase-{}-{}.png", self.image_base, color, view.still())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::ConfigPatch;
    use pretty_assertions::assert_eq;

    const BASE: &str =
        "https://raw.githubusercontent.com/Dr31K0/models/b284a7ad9445681838f7d343907e78e0a3b40ce5";

    fn locations(list: &CandidateList) -> Vec<String> {
        list.iter().map(|c| c.location()).collect()
    }

    #[test]
    fn image_list_is_primary_known_good_placeholder() {
        let resolver = AssetResolver::default();
        let config = Configuration::new(ColorId::Blue, ViewMode::Side);
        let list = resolver.resolve(&config, RepresentationKind::Image2D);
        assert_eq!(
            locations(&list),
            vec![
                format!("{BASE}/suitcase-blue-side.png"),
                format!("{BASE}/suitcase-purple-front.png"),
                "bundled:suitcase-placeholder.png".to_string(),
            ]
        );
    }

    #[test]
    fn known_good_image_is_not_listed_twice() {
        let resolver = AssetResolver::default();
        let list = resolver.resolve(&Configuration::default(), RepresentationKind::Image2D);
        assert_eq!(list.len(), 2);
        assert!(list.placeholder().is_bundled());
    }

    #[test]
    fn model_list_ignores_color_and_includes_mirrors() {
        let assets = AssetSettings {
            model_mirrors: vec![
                "https://raw.githubusercontent.com/Dr31K0/3DSuitcase/main/model.glb".into(),
            ],
            ..AssetSettings::default()
        };
        let resolver = AssetResolver::from_settings(&assets);
        let blue = Configuration::default().merged(&ConfigPatch::color(ColorId::Blue));
        let a = resolver.resolve(&blue, RepresentationKind::Model3D);
        let b = resolver.resolve(&Configuration::default(), RepresentationKind::Model3D);
        assert_eq!(a, b);
        assert_eq!(
            locations(&a),
            vec![
                "https://cdn.jsdelivr.net/gh/Dr31K0/3DSuitcase@main/model.glb".to_string(),
                "https://raw.githubusercontent.com/Dr31K0/3DSuitcase/main/model.glb".to_string(),
                "bundled:placeholder-box".to_string(),
            ]
        );
    }

    #[test]
    fn every_configuration_ends_in_a_placeholder() {
        let resolver = AssetResolver::default();
        for color in ["purple", "BLUE", "magenta", ""] {
            for view in ["front", "interactive", "sideways", "Top"] {
                let config = Configuration::default()
                    .merged(&ConfigPatch::from_raw(Some(color), Some(view)));
                for kind in [RepresentationKind::Image2D, RepresentationKind::Model3D] {
                    let list = resolver.resolve(&config, kind);
                    assert!(list.placeholder().is_bundled());
                    assert!(!list.primary().location().contains("interactive"));
                }
            }
        }
    }
}
