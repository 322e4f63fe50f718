//! The configurator engine: store, pipelines and transitions wired together.
//!
//! The engine never performs I/O. Each frame the host:
//! 1. drains [`FetchCommand`]s with [`Configurator::take_fetch_commands`],
//! 2. reports finished fetches with [`Configurator::fetch_completed`],
//! 3. calls [`Configurator::tick`] and draws the returned [`Presentation`].

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use bytes::Bytes;
use foundation::ids::Version;
use foundation::time::Time;
use runtime::budget::FrameBudget;
use runtime::event_bus::{Event, EventBus};
use runtime::frame::Frame;
use runtime::metrics::Metrics;
use streaming::error::FetchError;
use streaming::load_state::LoadState;
use streaming::pipeline::FetchPipeline;
use streaming::request::{AssetClass, FetchCommand, FetchId, FetchRequest};
use tracing::{debug, info};

use crate::capability::{Capability, CapabilityDetector, CapabilityProbe};
use crate::configuration::{ConfigPatch, Configuration, RepresentationKind};
use crate::error::{
    CONTEXT_CAPABILITY_PROBE, CONTEXT_SURFACE_CREATE, ErrorReporter, PipelineError, REMEDIATION,
    SurfaceCreationError,
};
use crate::model::{ModelAsset, ModelLoadPipeline, ModelStep};
use crate::motion::{IdleMotion, OrbitControls};
use crate::resolver::AssetResolver;
use crate::settings::Settings;
use crate::still::{ImageLoadPipeline, ImageRef, ImageStep};
use crate::store::{ConfigChange, ConfigurationStore, SubscriptionId};
use crate::transition::{Commit, Offer, TransitionCoordinator};
use crate::visual::{INTERACTION_HINT, Presentation, VisualState};

const DEFAULT_DT_S: f64 = 1.0 / 60.0;

pub struct Configurator {
    store: ConfigurationStore,
    inbox: Rc<RefCell<Vec<ConfigChange>>>,
    subscription: Option<SubscriptionId>,
    resolver: AssetResolver,
    capability: Capability,
    surface_failure: Option<SurfaceCreationError>,
    fetches: FetchPipeline,
    models: ModelLoadPipeline,
    images: ImageLoadPipeline,
    transition: TransitionCoordinator,
    idle: IdleMotion,
    orbit: OrbitControls,
    reporter: Box<dyn ErrorReporter>,
    bus: EventBus,
    metrics: Metrics,
    frame: Frame,
    kind: RepresentationKind,
    timeout_ms: u64,
}

impl Configurator {
    /// Builds the engine and starts loading the default configuration.
    ///
    /// A failed capability probe is reported here, once.
    pub fn new<P: CapabilityProbe>(
        settings: &Settings,
        detector: &CapabilityDetector<P>,
        reporter: Box<dyn ErrorReporter>,
    ) -> Self {
        let capability = detector.detect().clone();
        if let Some(err) = detector.failure() {
            reporter.report(&PipelineError::from(err.clone()), CONTEXT_CAPABILITY_PROBE);
        }

        let mut store = ConfigurationStore::default();
        let inbox: Rc<RefCell<Vec<ConfigChange>>> = Rc::default();
        let subscription = {
            let inbox = Rc::clone(&inbox);
            store.subscribe(move |change| inbox.borrow_mut().push(*change))
        };

        let cache_bust = settings.fetch.cache_bust;
        let mut engine = Self {
            store,
            inbox,
            subscription: Some(subscription),
            resolver: AssetResolver::from_settings(&settings.assets),
            capability,
            surface_failure: None,
            fetches: FetchPipeline::new(settings.fetch.max_pending)
                .with_timeout_ms(settings.fetch.timeout_ms),
            models: ModelLoadPipeline::new(&settings.assets, &settings.cache, cache_bust),
            images: ImageLoadPipeline::new(&settings.cache, cache_bust),
            transition: TransitionCoordinator::new(
                VisualState::Placeholder,
                settings.transition.fade_ms,
            ),
            idle: IdleMotion::from_settings(&settings.motion),
            orbit: OrbitControls::from_settings(&settings.orbit),
            reporter,
            bus: EventBus::new(),
            metrics: Metrics::new(),
            frame: Frame::new(0, DEFAULT_DT_S),
            kind: RepresentationKind::Image2D,
            timeout_ms: settings.fetch.timeout_ms,
        };
        let initial = engine.store.get();
        engine.load(engine.store.version(), initial);
        engine
    }

    pub fn config(&self) -> Configuration {
        self.store.get()
    }

    pub fn version(&self) -> Version {
        self.store.version()
    }

    pub fn store(&self) -> &ConfigurationStore {
        &self.store
    }

    /// Changes made through the store are picked up on the next
    /// [`Self::pump`] or [`Self::tick`].
    pub fn store_mut(&mut self) -> &mut ConfigurationStore {
        &mut self.store
    }

    pub fn kind(&self) -> RepresentationKind {
        self.kind
    }

    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    pub fn surface_failure(&self) -> Option<&SurfaceCreationError> {
        self.surface_failure.as_ref()
    }

    pub fn model_state(&self) -> &LoadState<Arc<ModelAsset>> {
        self.models.state()
    }

    pub fn image_state(&self) -> &LoadState<ImageRef> {
        self.images.state()
    }

    pub fn visible(&self) -> &VisualState {
        self.transition.stable()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn events(&self) -> &[Event] {
        self.bus.events()
    }

    pub fn events_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.bus.of_kind(kind)
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        self.bus.drain()
    }

    /// Nothing queued, in flight, or mid-transition.
    pub fn is_settled(&self) -> bool {
        self.fetches.is_idle() && !self.transition.is_transitioning()
    }

    /// Applies a selection and starts loading for it right away.
    pub fn select(&mut self, patch: ConfigPatch) -> Option<Version> {
        let change = self.store.set(patch);
        self.pump();
        change.map(|c| c.version)
    }

    /// Processes store changes in the order they were made.
    pub fn pump(&mut self) {
        let changes = std::mem::take(&mut *self.inbox.borrow_mut());
        for change in changes {
            self.load(change.version, change.config);
        }
    }

    pub fn take_fetch_commands(&mut self, budget: &mut FrameBudget) -> Vec<FetchCommand> {
        let commands = self.fetches.take_commands(budget, self.now());
        for command in &commands {
            match command {
                FetchCommand::Start(request) => {
                    self.metrics.inc("fetch.started");
                    self.bus.emit(
                        self.frame,
                        "fetch",
                        format!("start {} {}", request.id, request.uri),
                    );
                }
                FetchCommand::Abort(id) => {
                    self.bus.emit(self.frame, "fetch", format!("abort {id}"));
                }
            }
        }
        commands
    }

    /// Host callback for a finished fetch. Unknown or abandoned ids are
    /// discarded.
    pub fn fetch_completed(&mut self, id: FetchId, result: Result<Bytes, FetchError>) {
        let Some(done) = self.fetches.complete(id, self.now()) else {
            self.discard_stale(id);
            return;
        };
        if result.is_err() {
            self.metrics.inc("fetch.failed");
        }
        self.metrics
            .record("fetch.latency_ms", (done.elapsed_s * 1000.0).round() as i64);
        self.route(done.request, result);
    }

    /// Advances time: store changes, timeouts, fades. Returns what to draw.
    pub fn tick(&mut self, frame: Frame) -> Presentation {
        self.frame = frame;
        self.pump();

        for request in self.fetches.expire(frame.time) {
            self.metrics.inc("fetch.timeout");
            let err = FetchError::Timeout {
                uri: request.uri.clone(),
                after_ms: self.timeout_ms,
            };
            self.route(request, Err(err));
        }
        self.metrics
            .set_gauge("fetch.in_flight", self.fetches.in_flight_len() as i64);

        if let Some(version) = self.transition.tick(frame.time) {
            self.metrics.inc("transition.commit");
            self.bus.emit(
                self.frame,
                "commit",
                format!("{version} {}", self.transition.stable()),
            );
        }

        self.presentation()
    }

    pub fn presentation(&self) -> Presentation {
        let now = self.now();
        let layers = self.transition.layers(now);
        let model_yaw = if layers.iter().any(|l| l.visual.is_3d()) {
            self.idle.yaw_at(now)
        } else {
            0.0
        };
        Presentation {
            version: self.transition.visible_version(),
            kind: self.kind,
            layers,
            model_yaw,
            camera: self.orbit.pose(),
            notice: self.capability.reason.clone(),
            hint: (self.kind == RepresentationKind::Model3D).then_some(INTERACTION_HINT),
        }
    }

    pub fn drag(&mut self, dx_px: f64, dy_px: f64) {
        self.orbit.drag(dx_px, dy_px);
    }

    pub fn zoom(&mut self, delta: f64) {
        self.orbit.zoom(delta);
    }

    /// The renderer could not create its surface. 3D stays off for the rest
    /// of the session; the user sees why.
    pub fn surface_failed(&mut self, err: SurfaceCreationError) {
        if self.surface_failure.is_some() {
            return;
        }
        self.reporter
            .report(&PipelineError::from(err.clone()), CONTEXT_SURFACE_CREATE);
        let message = format!("{err}. {REMEDIATION}");
        self.capability = Capability::unsupported(message.clone());
        self.surface_failure = Some(err);
        self.models.cancel(&mut self.fetches);

        if self.kind == RepresentationKind::Model3D {
            let version = self.store.version();
            self.kind = RepresentationKind::Image2D;
            self.transition.begin(version, self.now());
            self.offer(version, VisualState::ErrorDisplay(message), Commit::Immediate);
        }
    }

    /// Abandons all loads and detaches from the store. Returns the aborts the
    /// host should still perform.
    pub fn shutdown(&mut self) -> Vec<FetchCommand> {
        if let Some(id) = self.subscription.take() {
            self.store.unsubscribe(id);
        }
        self.models.cancel(&mut self.fetches);
        self.images.cancel(&mut self.fetches);
        self.fetches.take_commands(&mut FrameBudget::new(0), self.now())
    }

    fn now(&self) -> Time {
        self.frame.time
    }

    fn kind_for(&self, config: &Configuration) -> RepresentationKind {
        if config.view.is_interactive()
            && self.capability.supports_3d
            && self.surface_failure.is_none()
        {
            RepresentationKind::Model3D
        } else {
            RepresentationKind::Image2D
        }
    }

    fn load(&mut self, version: Version, config: Configuration) {
        if self.transition.begin(version, self.now()) {
            self.metrics.inc("transition.superseded");
        }
        self.kind = self.kind_for(&config);
        self.bus.emit(
            self.frame,
            "config",
            format!("{version} {config} as {}", self.kind.label()),
        );
        let candidates = self.resolver.resolve(&config, self.kind);

        match self.kind {
            RepresentationKind::Model3D => {
                self.images.cancel(&mut self.fetches);
                let was_ready = self.models.state().is_ready();
                let step = self.models.request(
                    version,
                    candidates,
                    config.color,
                    &mut self.fetches,
                    self.reporter.as_ref(),
                );
                match step {
                    ModelStep::Ready { cached: true, .. } => self.metrics.inc("cache.hit"),
                    ModelStep::Ready { .. } if was_ready => self.metrics.inc("model.recolor"),
                    _ => {}
                }
                self.apply_model_step(step);
            }
            RepresentationKind::Image2D => {
                self.models.cancel(&mut self.fetches);
                let step = self.images.start(
                    version,
                    candidates,
                    &mut self.fetches,
                    self.reporter.as_ref(),
                );
                if matches!(step, ImageStep::Ready { cached: true, .. }) {
                    self.metrics.inc("cache.hit");
                }
                self.apply_image_step(step);
            }
        }
    }

    fn route(&mut self, request: FetchRequest, result: Result<Bytes, FetchError>) {
        match request.class {
            AssetClass::Model => {
                let step = self.models.on_fetch_result(
                    request.id,
                    result,
                    &mut self.fetches,
                    self.reporter.as_ref(),
                );
                match step {
                    None => self.discard_stale(request.id),
                    Some(step) => {
                        if let ModelStep::Ready { version, model, .. } = &step
                            && model.placeholder
                        {
                            self.bus.emit(
                                self.frame,
                                "fallback",
                                format!("{version} {}", model.source),
                            );
                        }
                        self.apply_model_step(step);
                    }
                }
            }
            AssetClass::Image => {
                let step = self.images.on_fetch_result(
                    request.id,
                    result,
                    &mut self.fetches,
                    self.reporter.as_ref(),
                );
                match step {
                    None => self.discard_stale(request.id),
                    Some(step) => {
                        if let ImageStep::Ready { version, image, .. } = &step
                            && image.bundled
                        {
                            self.bus
                                .emit(self.frame, "fallback", format!("{version} {}", image.uri));
                        }
                        self.apply_image_step(step);
                    }
                }
            }
        }
    }

    fn apply_model_step(&mut self, step: ModelStep) {
        match step {
            ModelStep::Pending => {}
            ModelStep::Ready {
                version,
                model,
                appearance,
                ..
            } => self.offer(
                version,
                VisualState::Rendering3D { model, appearance },
                Commit::Immediate,
            ),
            ModelStep::Failed { version, message } => {
                self.offer(version, VisualState::ErrorDisplay(message), Commit::Immediate)
            }
        }
    }

    fn apply_image_step(&mut self, step: ImageStep) {
        if let ImageStep::Ready { version, image, .. } = step {
            self.offer(version, VisualState::Rendering2D(image), Commit::Crossfade);
        }
    }

    fn offer(&mut self, version: Version, visual: VisualState, commit: Commit) {
        let summary = visual.to_string();
        match self.transition.offer(version, visual, self.now(), commit) {
            Offer::Stale => {
                debug!(%version, visual = %summary, "stale visual dropped");
                self.bus
                    .emit(self.frame, "stale", format!("{version} {summary}"));
            }
            Offer::Committed => {
                info!(%version, visual = %summary, "visual committed");
                self.metrics.inc("transition.commit");
                self.bus
                    .emit(self.frame, "commit", format!("{version} {summary}"));
            }
            Offer::Fading => {
                debug!(%version, visual = %summary, "crossfade started");
            }
        }
    }

    fn discard_stale(&mut self, id: FetchId) {
        debug!(%id, "stale fetch result discarded");
        self.metrics.inc("fetch.stale");
        self.bus.emit(self.frame, "stale", format!("{id} discarded"));
    }
}
