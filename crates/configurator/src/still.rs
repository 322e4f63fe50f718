use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use foundation::ids::Version;
use streaming::cache::{AssetCache, MemoryBudget};
use streaming::candidate::{AssetKey, Candidate, CandidateList};
use streaming::chain::FallbackChain;
use streaming::error::FetchError;
use streaming::load_state::LoadState;
use streaming::pipeline::FetchPipeline;
use streaming::request::{AssetClass, FetchId};
use tracing::{debug, warn};

use crate::error::{CONTEXT_IMAGE_DISPLAY, ErrorReporter, PipelineError};
use crate::settings::CacheSettings;

/// A displayable still: where it came from and, for remote images, its size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub uri: String,
    pub key: AssetKey,
    pub size: Option<(u32, u32)>,
    pub bundled: bool,
}

impl ImageRef {
    pub fn bundled(candidate: &Candidate) -> Self {
        Self {
            uri: candidate.location(),
            key: candidate.key(),
            size: None,
            bundled: true,
        }
    }
}

fn image_dimensions(bytes: &[u8]) -> Result<(u32, u32), image::ImageError> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .into_dimensions()
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImageStep {
    Pending,
    Ready {
        version: Version,
        image: ImageRef,
        cached: bool,
    },
}

#[derive(Debug)]
struct ActiveLoad {
    version: Version,
    chain: FallbackChain,
    fetch: Option<FetchId>,
}

/// Loads the still for the newest configuration. Starting a new load
/// supersedes the previous one; the bundled placeholder is the last resort.
#[derive(Debug)]
pub struct ImageLoadPipeline {
    cache: AssetCache<ImageRef>,
    state: LoadState<ImageRef>,
    active: Option<ActiveLoad>,
    cache_bust: bool,
}

impl ImageLoadPipeline {
    pub fn new(cache: &CacheSettings, cache_bust: bool) -> Self {
        Self {
            cache: AssetCache::new(MemoryBudget::new(cache.image_budget_bytes)),
            state: LoadState::Idle,
            active: None,
            cache_bust,
        }
    }

    pub fn state(&self) -> &LoadState<ImageRef> {
        &self.state
    }

    pub fn in_flight(&self) -> Option<FetchId> {
        self.active.as_ref().and_then(|a| a.fetch)
    }

    pub fn start(
        &mut self,
        version: Version,
        candidates: CandidateList,
        fetches: &mut FetchPipeline,
        reporter: &dyn ErrorReporter,
    ) -> ImageStep {
        self.cancel(fetches);

        let key = candidates.primary().key();
        if let Some(image) = self.cache.get(&key) {
            debug!(key = %key, "image served from cache");
            let image = ImageRef::clone(&image);
            self.state = LoadState::Ready(image.clone());
            return ImageStep::Ready {
                version,
                image,
                cached: true,
            };
        }

        let candidates = if self.cache_bust {
            candidates.with_cache_token(version.get())
        } else {
            candidates
        };
        self.active = Some(ActiveLoad {
            version,
            chain: FallbackChain::new(candidates),
            fetch: None,
        });
        self.start_current(fetches, reporter)
    }

    pub fn on_fetch_result(
        &mut self,
        id: FetchId,
        result: Result<Bytes, FetchError>,
        fetches: &mut FetchPipeline,
        reporter: &dyn ErrorReporter,
    ) -> Option<ImageStep> {
        let active = self.active.as_mut().filter(|a| a.fetch == Some(id))?;
        active.fetch = None;
        let version = active.version;
        let candidate = active.chain.current().clone();
        let location = candidate.location();

        let decoded = result.and_then(|bytes| {
            image_dimensions(&bytes)
                .map(|size| (size, bytes.len()))
                .map_err(|err| FetchError::decode(location.as_str(), err))
        });

        match decoded {
            Ok((size, bytes)) => {
                let image = ImageRef {
                    uri: location,
                    key: candidate.key(),
                    size: Some(size),
                    bundled: false,
                };
                debug!(uri = %image.uri, width = size.0, height = size.1, "image loaded");
                let cached = self
                    .cache
                    .insert(image.key.clone(), Arc::new(image.clone()), bytes);
                if let Err(err) = cached {
                    warn!(key = %image.key, error = %err, "image not cached");
                }
                self.active = None;
                self.state = LoadState::Ready(image.clone());
                Some(ImageStep::Ready {
                    version,
                    image,
                    cached: false,
                })
            }
            Err(err) => {
                warn!(uri = %location, error = %err, "image candidate failed");
                active.chain.advance(err);
                Some(self.start_current(fetches, reporter))
            }
        }
    }

    /// Abandons the active load, if any.
    pub fn cancel(&mut self, fetches: &mut FetchPipeline) {
        if let Some(active) = self.active.take() {
            if let Some(id) = active.fetch {
                let _ = fetches.cancel(id);
                debug!(%id, "image fetch abandoned");
            }
            if self.state.is_loading() {
                self.state = LoadState::Idle;
            }
        }
    }

    fn start_current(
        &mut self,
        fetches: &mut FetchPipeline,
        reporter: &dyn ErrorReporter,
    ) -> ImageStep {
        loop {
            let Some(active) = self.active.as_mut() else {
                return ImageStep::Pending;
            };
            match active.chain.current().clone() {
                Candidate::Remote { uri, key } => {
                    match fetches.submit(AssetClass::Image, uri.as_str(), key) {
                        Ok(id) => {
                            active.fetch = Some(id);
                            self.state = LoadState::Loading {
                                attempt: active.chain.attempt(),
                                uri,
                            };
                            return ImageStep::Pending;
                        }
                        Err(full) => {
                            warn!(uri = %uri, error = %full, "image fetch not queued");
                            active.chain.advance(FetchError::Rejected { uri });
                        }
                    }
                }
                placeholder @ Candidate::Bundled { .. } => {
                    if active.chain.candidates().remote_count() > 0 {
                        reporter.report(
                            &PipelineError::from(active.chain.exhausted_error()),
                            CONTEXT_IMAGE_DISPLAY,
                        );
                    }
                    let version = active.version;
                    let image = ImageRef::bundled(&placeholder);
                    self.active = None;
                    self.state = LoadState::Ready(image.clone());
                    return ImageStep::Ready {
                        version,
                        image,
                        cached: false,
                    };
                }
            }
        }
    }
}
