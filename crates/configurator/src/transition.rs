use foundation::ids::Version;
use foundation::time::{Time, TimeSpan};
use tracing::debug;

use crate::visual::{Layer, VisualState};

/// How a ready visual replaces the one on screen.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Commit {
    Immediate,
    Crossfade,
}

/// Result of offering a visual to the coordinator.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Offer {
    /// Tagged with a superseded version; dropped.
    Stale,
    Committed,
    Fading,
}

#[derive(Debug, Clone)]
struct Fade {
    from: VisualState,
    to: VisualState,
    version: Version,
    span: TimeSpan,
}

/// Sole owner of the visible [`VisualState`].
///
/// `begin` opens a transition toward a new configuration version; the old
/// visual stays fully visible until `offer` hands over a ready visual for
/// that same version. A newer `begin` supersedes whatever is in progress.
#[derive(Debug)]
pub struct TransitionCoordinator {
    stable: VisualState,
    stable_version: Version,
    latest: Version,
    awaiting: bool,
    fade: Option<Fade>,
    fade_s: f64,
}

fn ease(p: f64) -> f64 {
    p * p * (3.0 - 2.0 * p)
}

impl TransitionCoordinator {
    pub fn new(initial: VisualState, fade_ms: u64) -> Self {
        Self {
            stable: initial,
            stable_version: Version::INITIAL,
            latest: Version::INITIAL,
            awaiting: false,
            fade: None,
            fade_s: Time::from_millis(fade_ms).seconds(),
        }
    }

    pub fn latest(&self) -> Version {
        self.latest
    }

    pub fn stable(&self) -> &VisualState {
        &self.stable
    }

    pub fn stable_version(&self) -> Version {
        self.stable_version
    }

    /// Version of the visual fading in, or of the stable one.
    pub fn visible_version(&self) -> Version {
        self.fade
            .as_ref()
            .map_or(self.stable_version, |fade| fade.version)
    }

    /// A target was requested but nothing has been committed for it yet.
    pub fn is_transitioning(&self) -> bool {
        self.awaiting || self.fade.is_some()
    }

    /// Starts a transition toward `version`. Returns `true` if an unfinished
    /// transition was superseded.
    pub fn begin(&mut self, version: Version, now: Time) -> bool {
        let superseded = self.is_transitioning();
        if let Some(fade) = self.fade.take() {
            // Keep whichever side of the fade dominates the screen right now.
            if fade.span.progress(now) >= 0.5 {
                self.stable = fade.to;
                self.stable_version = fade.version;
            }
        }
        self.latest = version;
        self.awaiting = true;
        if superseded {
            debug!(%version, "transition superseded");
        }
        superseded
    }

    pub fn offer(
        &mut self,
        version: Version,
        visual: VisualState,
        now: Time,
        commit: Commit,
    ) -> Offer {
        if version != self.latest || !self.awaiting {
            return Offer::Stale;
        }
        self.awaiting = false;

        if commit == Commit::Immediate || self.fade_s <= 0.0 {
            self.stable = visual;
            self.stable_version = version;
            self.fade = None;
            return Offer::Committed;
        }

        self.fade = Some(Fade {
            from: self.stable.clone(),
            to: visual,
            version,
            span: TimeSpan::starting_at(now, self.fade_s),
        });
        Offer::Fading
    }

    /// Finishes an elapsed fade. Returns the version it committed.
    pub fn tick(&mut self, now: Time) -> Option<Version> {
        if !self.fade.as_ref()?.span.is_complete(now) {
            return None;
        }
        let fade = self.fade.take()?;
        self.stable = fade.to;
        self.stable_version = fade.version;
        Some(fade.version)
    }

    /// Visible layers, bottom to top, with opacities summing to one.
    pub fn layers(&self, now: Time) -> Vec<Layer> {
        match &self.fade {
            None => vec![Layer {
                visual: self.stable.clone(),
                opacity: 1.0,
            }],
            Some(fade) => {
                let p = ease(fade.span.progress(now)) as f32;
                vec![
                    Layer {
                        visual: fade.from.clone(),
                        opacity: 1.0 - p,
                    },
                    Layer {
                        visual: fade.to.clone(),
                        opacity: p,
                    },
                ]
            }
        }
    }
}
