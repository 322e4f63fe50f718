//! 3D geometry: decoding, painting, and the load pipeline that fetches it.
//!
//! Geometry does not depend on the configuration, so it is fetched once and
//! pinned in the cache. A color change only repaints a clone of the pristine
//! asset.

use std::sync::Arc;

use bytes::Bytes;
use foundation::ids::Version;
use foundation::math::Vec3;
use streaming::cache::{AssetCache, MemoryBudget};
use streaming::candidate::{AssetKey, Candidate, CandidateList};
use streaming::chain::FallbackChain;
use streaming::error::FetchError;
use streaming::load_state::LoadState;
use streaming::pipeline::FetchPipeline;
use streaming::request::{AssetClass, FetchId};
use tracing::{debug, warn};

use crate::configuration::ColorId;
use crate::error::{
    ApplyError, CONTEXT_MODEL_APPLY, CONTEXT_MODEL_FETCH, ErrorReporter, PipelineError,
};
use crate::material::{MaterialMapper, SurfaceAppearance};
use crate::settings::{AssetSettings, CacheSettings};

/// Size of the bundled stand-in box, in model units.
pub const PLACEHOLDER_BOX: [f32; 3] = [1.0, 0.6, 0.2];

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Mesh {
        mesh: usize,
        primitive: usize,
        vertex_count: usize,
    },
    Box {
        width: f32,
        height: f32,
        depth: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pub name: String,
    pub geometry: Geometry,
    /// Surfaces without a material slot keep their authored look.
    pub paintable: bool,
    pub appearance: Option<SurfaceAppearance>,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl Surface {
    fn new(name: String, geometry: Geometry, paintable: bool) -> Self {
        Self {
            name,
            geometry,
            paintable,
            appearance: None,
            cast_shadow: false,
            receive_shadow: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelAsset {
    pub source: AssetKey,
    pub surfaces: Vec<Surface>,
    /// True for the bundled box shown when every remote failed.
    pub placeholder: bool,
    pub scale: f64,
    pub offset: Vec3,
}

impl ModelAsset {
    /// Parses a binary glTF and collects every mesh primitive reachable from
    /// the default scene. An empty result is left for the caller to judge.
    pub fn decode_glb(source: AssetKey, bytes: &[u8]) -> Result<Self, gltf::Error> {
        let gltf = gltf::Gltf::from_slice(bytes)?;
        let mut surfaces = Vec::new();
        if let Some(scene) = gltf.default_scene().or_else(|| gltf.scenes().next()) {
            for node in scene.nodes() {
                collect_surfaces(&node, &mut surfaces);
            }
        }
        Ok(Self {
            source,
            surfaces,
            placeholder: false,
            scale: 1.0,
            offset: Vec3::ZERO,
        })
    }

    pub fn placeholder_box(source: AssetKey) -> Self {
        let [width, height, depth] = PLACEHOLDER_BOX;
        Self {
            source,
            surfaces: vec![Surface::new(
                "placeholder-box".to_string(),
                Geometry::Box {
                    width,
                    height,
                    depth,
                },
                true,
            )],
            placeholder: true,
            scale: 1.0,
            offset: Vec3::ZERO,
        }
    }

    pub fn placed(mut self, scale: f64, offset: Vec3) -> Self {
        self.scale = scale;
        self.offset = offset;
        self
    }

    pub fn paintable_count(&self) -> usize {
        self.surfaces.iter().filter(|s| s.paintable).count()
    }

    /// A copy with `appearance` on every paintable surface and shadows on
    /// every surface.
    pub fn painted(&self, appearance: &SurfaceAppearance) -> Self {
        let mut out = self.clone();
        for surface in &mut out.surfaces {
            if surface.paintable {
                surface.appearance = Some(*appearance);
            }
            surface.cast_shadow = true;
            surface.receive_shadow = true;
        }
        out
    }
}

fn collect_surfaces(node: &gltf::Node<'_>, out: &mut Vec<Surface>) {
    if let Some(mesh) = node.mesh() {
        let mesh_name = mesh
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("mesh{}", mesh.index()));
        for primitive in mesh.primitives() {
            let vertex_count = primitive
                .get(&gltf::Semantic::Positions)
                .map(|a| a.count())
                .unwrap_or(0);
            out.push(Surface::new(
                format!("{mesh_name}/{}", primitive.index()),
                Geometry::Mesh {
                    mesh: mesh.index(),
                    primitive: primitive.index(),
                    vertex_count,
                },
                primitive.material().index().is_some(),
            ));
        }
    }
    for child in node.children() {
        collect_surfaces(&child, out);
    }
}

/// What a model request or fetch completion produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelStep {
    /// Still fetching; keep showing what is on screen.
    Pending,
    Ready {
        version: Version,
        model: Arc<ModelAsset>,
        appearance: SurfaceAppearance,
        /// The geometry came out of the cache rather than a fetch.
        cached: bool,
    },
    Failed {
        version: Version,
        message: String,
    },
}

#[derive(Debug)]
struct Target {
    version: Version,
    color: ColorId,
}

#[derive(Debug)]
pub struct ModelLoadPipeline {
    cache: AssetCache<ModelAsset>,
    state: LoadState<Arc<ModelAsset>>,
    chain: Option<FallbackChain>,
    in_flight: Option<FetchId>,
    target: Option<Target>,
    painted: Option<(ColorId, Arc<ModelAsset>)>,
    cache_bust: bool,
    scale: f64,
    offset: Vec3,
}

impl ModelLoadPipeline {
    pub fn new(assets: &AssetSettings, cache: &CacheSettings, cache_bust: bool) -> Self {
        let [x, y, z] = assets.model_offset;
        Self {
            cache: AssetCache::new(MemoryBudget::new(cache.model_budget_bytes)),
            state: LoadState::Idle,
            chain: None,
            in_flight: None,
            target: None,
            painted: None,
            cache_bust,
            scale: assets.model_scale,
            offset: Vec3::new(x, y, z),
        }
    }

    /// Geometry lifecycle; `Ready` holds the unpainted asset.
    pub fn state(&self) -> &LoadState<Arc<ModelAsset>> {
        &self.state
    }

    pub fn in_flight(&self) -> Option<FetchId> {
        self.in_flight
    }

    /// Asks for the model painted in `color`, on behalf of `version`.
    ///
    /// Ready geometry is repainted synchronously. A failed load stays failed.
    /// An in-flight load is kept and simply retargeted.
    pub fn request(
        &mut self,
        version: Version,
        candidates: CandidateList,
        color: ColorId,
        fetches: &mut FetchPipeline,
        reporter: &dyn ErrorReporter,
    ) -> ModelStep {
        self.target = Some(Target { version, color });
        if self.state.is_ready() {
            return self.paint_ready(false);
        }
        if let LoadState::Failed(message) = &self.state {
            return ModelStep::Failed {
                version,
                message: message.clone(),
            };
        }
        if self.state.is_loading() {
            return ModelStep::Pending;
        }

        let key = candidates.primary().key();
        if let Some(model) = self.cache.get(&key) {
            debug!(key = %key, "geometry served from cache");
            self.state = LoadState::Ready(model);
            return self.paint_ready(true);
        }

        let candidates = if self.cache_bust {
            candidates.with_cache_token(version.get())
        } else {
            candidates
        };
        self.chain = Some(FallbackChain::new(candidates));
        self.start_current(fetches, reporter)
    }

    pub fn on_fetch_result(
        &mut self,
        id: FetchId,
        result: Result<Bytes, FetchError>,
        fetches: &mut FetchPipeline,
        reporter: &dyn ErrorReporter,
    ) -> Option<ModelStep> {
        if self.in_flight != Some(id) {
            return None;
        }
        self.in_flight = None;
        let chain = self.chain.as_ref()?;
        let candidate = chain.current().clone();
        let cache_key = chain.candidates().primary().key();
        let location = candidate.location();

        let decoded = result.and_then(|bytes| {
            ModelAsset::decode_glb(candidate.key(), &bytes)
                .map(|model| (model, bytes.len()))
                .map_err(|err| FetchError::decode(location.as_str(), err))
        });

        match decoded {
            Ok((model, _)) if model.surfaces.is_empty() => {
                let err = ApplyError::EmptyScene { uri: location };
                reporter.report(&PipelineError::from(err.clone()), CONTEXT_MODEL_APPLY);
                self.chain = None;
                self.state = LoadState::Failed(err.to_string());
                Some(self.failed_step(err.to_string()))
            }
            Ok((model, bytes)) => {
                debug!(uri = %location, surfaces = model.surfaces.len(), "geometry loaded");
                let model = Arc::new(model.placed(self.scale, self.offset));
                self.remember(cache_key, Arc::clone(&model), bytes);
                self.chain = None;
                self.state = LoadState::Ready(model);
                Some(self.paint_ready(false))
            }
            Err(err) => {
                warn!(uri = %location, error = %err, "model candidate failed");
                let chain = self.chain.as_mut()?;
                chain.advance(err);
                Some(self.start_current(fetches, reporter))
            }
        }
    }

    /// Abandons any in-flight fetch and releases decoded geometry, which
    /// stays pinned in the cache. A failure or the placeholder box is kept.
    pub fn cancel(&mut self, fetches: &mut FetchPipeline) {
        if let Some(id) = self.in_flight.take() {
            let _ = fetches.cancel(id);
            debug!(%id, "model fetch abandoned");
        }
        let release = match &self.state {
            LoadState::Loading { .. } => true,
            LoadState::Ready(model) => !model.placeholder,
            LoadState::Idle | LoadState::Failed(_) => false,
        };
        if release {
            self.state = LoadState::Idle;
            self.chain = None;
            self.painted = None;
        }
        self.target = None;
    }

    /// Starts the chain's current candidate. Reaching the bundled box reports
    /// the exhausted chain once and resolves immediately.
    fn start_current(
        &mut self,
        fetches: &mut FetchPipeline,
        reporter: &dyn ErrorReporter,
    ) -> ModelStep {
        loop {
            let Some(chain) = self.chain.as_mut() else {
                return ModelStep::Pending;
            };
            match chain.current().clone() {
                Candidate::Remote { uri, key } => {
                    match fetches.submit(AssetClass::Model, uri.as_str(), key) {
                        Ok(id) => {
                            self.in_flight = Some(id);
                            self.state = LoadState::Loading {
                                attempt: chain.attempt(),
                                uri,
                            };
                            return ModelStep::Pending;
                        }
                        Err(full) => {
                            warn!(uri = %uri, error = %full, "model fetch not queued");
                            chain.advance(FetchError::Rejected { uri });
                        }
                    }
                }
                Candidate::Bundled { .. } => {
                    if chain.remotes_exhausted() && chain.candidates().remote_count() > 0 {
                        reporter.report(
                            &PipelineError::from(chain.exhausted_error()),
                            CONTEXT_MODEL_FETCH,
                        );
                    }
                    let key = chain.current().key();
                    let model =
                        Arc::new(ModelAsset::placeholder_box(key).placed(self.scale, self.offset));
                    self.chain = None;
                    self.state = LoadState::Ready(model);
                    return self.paint_ready(false);
                }
            }
        }
    }

    fn remember(&mut self, key: AssetKey, model: Arc<ModelAsset>, bytes: usize) {
        match self.cache.insert(key.clone(), model, bytes) {
            Ok(_) => {
                let _ = self.cache.pin(&key);
            }
            Err(err) => warn!(key = %key, error = %err, "geometry not cached"),
        }
    }

    fn paint_ready(&mut self, cached: bool) -> ModelStep {
        let (version, color) = match &self.target {
            Some(t) => (t.version, t.color),
            None => return ModelStep::Pending,
        };
        let LoadState::Ready(geometry) = &self.state else {
            return ModelStep::Pending;
        };

        let appearance = MaterialMapper::map_color(color);
        let reused = self
            .painted
            .as_ref()
            .filter(|(c, m)| *c == color && m.source == geometry.source)
            .map(|(_, m)| Arc::clone(m));
        let model = match reused {
            Some(model) => model,
            None => {
                let model = Arc::new(geometry.painted(&appearance));
                self.painted = Some((color, Arc::clone(&model)));
                model
            }
        };
        ModelStep::Ready {
            version,
            model,
            appearance,
            cached,
        }
    }

    fn failed_step(&self, message: String) -> ModelStep {
        match &self.target {
            Some(t) => ModelStep::Failed {
                version: t.version,
                message,
            },
            None => ModelStep::Pending,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Packs a glTF JSON document and an optional binary buffer into a GLB.
    pub fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
        let mut json = json.as_bytes().to_vec();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }
        let mut bin = bin.to_vec();
        while bin.len() % 4 != 0 {
            bin.push(0);
        }
        let bin_chunk = if bin.is_empty() { 0 } else { 8 + bin.len() };
        let total = 12 + 8 + json.len() + bin_chunk;

        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json.len() as u32).to_le_bytes());
        out.extend_from_slice(b"JSON");
        out.extend_from_slice(&json);
        if !bin.is_empty() {
            out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
            out.extend_from_slice(b"BIN\0");
            out.extend_from_slice(&bin);
        }
        out
    }

    /// One triangle worth of `VEC3` float positions.
    fn triangle_positions() -> Vec<u8> {
        [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect()
    }

    /// A suitcase-like scene: a parent node with a painted shell primitive and
    /// an unpainted handle primitive.
    pub fn suitcase_glb() -> Vec<u8> {
        glb(
            r#"{
            "asset": { "version": "2.0" },
            "scene": 0,
            "scenes": [ { "nodes": [0] } ],
            "nodes": [ { "children": [1] }, { "mesh": 0 } ],
            "meshes": [ {
                "name": "suitcase",
                "primitives": [
                    { "attributes": { "POSITION": 0 }, "material": 0 },
                    { "attributes": { "POSITION": 0 } }
                ]
            } ],
            "materials": [ { "name": "shell" } ],
            "buffers": [ { "byteLength": 36 } ],
            "bufferViews": [ { "buffer": 0, "byteOffset": 0, "byteLength": 36 } ],
            "accessors": [ {
                "bufferView": 0,
                "byteOffset": 0,
                "componentType": 5126,
                "count": 3,
                "type": "VEC3",
                "min": [0.0, 0.0, 0.0],
                "max": [1.0, 1.0, 0.0]
            } ]
        }"#,
            &triangle_positions(),
        )
    }

    pub fn empty_scene_glb() -> Vec<u8> {
        glb(
            r#"{
            "asset": { "version": "2.0" },
            "scene": 0,
            "scenes": [ { "nodes": [0] } ],
            "nodes": [ { "name": "empty" } ]
        }"#,
            &[],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{empty_scene_glb, suitcase_glb};
    use super::*;
    use crate::error::RecordingReporter;
    use foundation::time::Time;
    use runtime::budget::FrameBudget;
    use streaming::request::FetchCommand;

    fn pipeline() -> ModelLoadPipeline {
        ModelLoadPipeline::new(&AssetSettings::default(), &CacheSettings::default(), true)
    }

    fn candidates() -> CandidateList {
        CandidateList::new(["https://cdn/model.glb"], "bundled:placeholder-box")
    }

    fn started(fetches: &mut FetchPipeline) -> Vec<FetchId> {
        fetches
            .take_commands(&mut FrameBudget::unlimited(), Time(0.0))
            .into_iter()
            .filter_map(|c| match c {
                FetchCommand::Start(r) => Some(r.id),
                FetchCommand::Abort(_) => None,
            })
            .collect()
    }

    #[test]
    fn decodes_nested_primitives() {
        let model =
            ModelAsset::decode_glb(AssetKey::from_uri("https://cdn/model.glb"), &suitcase_glb())
                .unwrap();
        assert_eq!(model.surfaces.len(), 2);
        assert_eq!(model.paintable_count(), 1);
        assert_eq!(model.surfaces[0].name, "suitcase/0");
        assert!(matches!(
            model.surfaces[0].geometry,
            Geometry::Mesh { vertex_count: 3, .. }
        ));
    }

    #[test]
    fn painting_touches_only_paintable_surfaces() {
        let model =
            ModelAsset::decode_glb(AssetKey::from_uri("https://cdn/model.glb"), &suitcase_glb())
                .unwrap();
        let blue = MaterialMapper::map_color(ColorId::Blue);
        let painted = model.painted(&blue);
        assert_eq!(painted.surfaces[0].appearance, Some(blue));
        assert_eq!(painted.surfaces[1].appearance, None);
        assert!(painted.surfaces.iter().all(|s| s.cast_shadow && s.receive_shadow));
        assert!(model.surfaces.iter().all(|s| s.appearance.is_none()));
    }

    #[test]
    fn loads_once_then_recolors_without_fetching() {
        let reporter = RecordingReporter::new();
        let mut fetches = FetchPipeline::new(8);
        let mut models = pipeline();

        let step = models.request(
            Version::new(1),
            candidates(),
            ColorId::Purple,
            &mut fetches,
            &reporter,
        );
        assert_eq!(step, ModelStep::Pending);
        let ids = started(&mut fetches);
        assert_eq!(ids.len(), 1);
        fetches.complete(ids[0], Time(0.1));

        let step = models
            .on_fetch_result(ids[0], Ok(Bytes::from(suitcase_glb())), &mut fetches, &reporter)
            .expect("tracked");
        assert!(matches!(step, ModelStep::Ready { version, .. } if version == Version::new(1)));

        let step = models.request(
            Version::new(2),
            candidates(),
            ColorId::Orange,
            &mut fetches,
            &reporter,
        );
        let ModelStep::Ready { model, appearance, .. } = step else {
            panic!("expected a synchronous recolor, got {step:?}");
        };
        assert!(!model.placeholder);
        assert_eq!(appearance.base_color.to_hex(), "#FFAC74");
        assert_eq!(model.surfaces[0].appearance, Some(appearance));
        assert_eq!(model.scale, 1.5);
        assert!(fetches.is_idle());
        assert!(reporter.is_empty());
    }

    #[test]
    fn primary_failure_falls_back_to_box_and_reports_once() {
        let reporter = RecordingReporter::new();
        let mut fetches = FetchPipeline::new(8);
        let mut models = pipeline();
        models.request(
            Version::new(0),
            candidates(),
            ColorId::Blue,
            &mut fetches,
            &reporter,
        );
        let id = started(&mut fetches)[0];
        fetches.complete(id, Time(0.1));

        let err = FetchError::Status {
            uri: "https://cdn/model.glb?v=0".into(),
            status: 404,
        };
        let step = models
            .on_fetch_result(id, Err(err), &mut fetches, &reporter)
            .expect("tracked");
        let ModelStep::Ready { model, .. } = step else {
            panic!("expected placeholder, got {step:?}");
        };
        assert!(model.placeholder);
        assert_eq!(
            model.surfaces[0].appearance.map(|a| a.base_color.to_hex()),
            Some("#7AB7FF".to_string())
        );

        let reports = reporter.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].context, CONTEXT_MODEL_FETCH);
        assert!(matches!(
            &reports[0].error,
            PipelineError::Fetch(FetchError::Exhausted { attempted }) if attempted.len() == 1
        ));

        // The box stays for the session, even across a cancel.
        models.cancel(&mut fetches);
        let step = models.request(
            Version::new(1),
            candidates(),
            ColorId::Orange,
            &mut fetches,
            &reporter,
        );
        assert!(matches!(step, ModelStep::Ready { model, .. } if model.placeholder));
        assert!(fetches.is_idle());
        assert_eq!(reporter.len(), 1);
    }

    #[test]
    fn released_geometry_is_served_from_the_pinned_cache() {
        let reporter = RecordingReporter::new();
        let mut fetches = FetchPipeline::new(8);
        let mut models = pipeline();
        models.request(
            Version::new(1),
            candidates(),
            ColorId::Purple,
            &mut fetches,
            &reporter,
        );
        let id = started(&mut fetches)[0];
        fetches.complete(id, Time(0.1));
        models
            .on_fetch_result(id, Ok(Bytes::from(suitcase_glb())), &mut fetches, &reporter)
            .expect("tracked");
        assert!(models.cache.is_pinned(&AssetKey::from_uri("https://cdn/model.glb")));

        models.cancel(&mut fetches);
        assert_eq!(models.state(), &LoadState::Idle);

        let step = models.request(
            Version::new(2),
            candidates(),
            ColorId::Blue,
            &mut fetches,
            &reporter,
        );
        let ModelStep::Ready { model, cached, .. } = step else {
            panic!("expected a cache hit, got {step:?}");
        };
        assert!(cached);
        assert!(!model.placeholder);
        assert_eq!(model.paintable_count(), 1);
        assert!(started(&mut fetches).is_empty());
        assert!(reporter.is_empty());
    }

    #[test]
    fn undecodable_payload_advances_the_chain() {
        let reporter = RecordingReporter::new();
        let mut fetches = FetchPipeline::new(8);
        let mut models = pipeline();
        let list = CandidateList::new(
            ["https://cdn/model.glb", "https://mirror/model.glb"],
            "bundled:placeholder-box",
        );
        models.request(Version::new(0), list, ColorId::Purple, &mut fetches, &reporter);
        let first = started(&mut fetches)[0];
        fetches.complete(first, Time(0.1));

        let step = models
            .on_fetch_result(first, Ok(Bytes::from_static(b"<html>")), &mut fetches, &reporter)
            .expect("tracked");
        assert_eq!(step, ModelStep::Pending);
        assert!(matches!(
            models.state(),
            LoadState::Loading { attempt: 2, uri } if uri == "https://mirror/model.glb"
        ));
        assert!(reporter.is_empty());
        assert_eq!(started(&mut fetches).len(), 1);
    }

    #[test]
    fn empty_scene_is_a_terminal_apply_error() {
        let reporter = RecordingReporter::new();
        let mut fetches = FetchPipeline::new(8);
        let mut models = pipeline();
        models.request(
            Version::new(3),
            candidates(),
            ColorId::Purple,
            &mut fetches,
            &reporter,
        );
        let id = started(&mut fetches)[0];
        fetches.complete(id, Time(0.1));

        let step = models
            .on_fetch_result(id, Ok(Bytes::from(empty_scene_glb())), &mut fetches, &reporter)
            .expect("tracked");
        assert!(matches!(step, ModelStep::Failed { version, .. } if version == Version::new(3)));
        assert_eq!(reporter.in_context(CONTEXT_MODEL_APPLY).len(), 1);

        let again = models.request(
            Version::new(4),
            candidates(),
            ColorId::Blue,
            &mut fetches,
            &reporter,
        );
        assert!(matches!(again, ModelStep::Failed { .. }));
        assert!(fetches.is_idle());
        assert_eq!(reporter.len(), 1);
    }

    #[test]
    fn cancelled_fetch_results_are_ignored() {
        let reporter = RecordingReporter::new();
        let mut fetches = FetchPipeline::new(8);
        let mut models = pipeline();
        models.request(
            Version::new(1),
            candidates(),
            ColorId::Purple,
            &mut fetches,
            &reporter,
        );
        let id = started(&mut fetches)[0];
        models.cancel(&mut fetches);
        assert_eq!(models.state(), &LoadState::Idle);

        let late =
            models.on_fetch_result(id, Ok(Bytes::from(suitcase_glb())), &mut fetches, &reporter);
        assert!(late.is_none());
    }
}
