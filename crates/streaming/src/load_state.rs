/// Load lifecycle of one pipeline's current target.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    Idle,
    Loading { attempt: usize, uri: String },
    Ready(T),
    Failed(String),
}

impl<T> Default for LoadState<T> {
    fn default() -> Self {
        LoadState::Idle
    }
}

impl<T> LoadState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading { .. })
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, LoadState::Ready(_))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            LoadState::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LoadState::Idle => "idle",
            LoadState::Loading { .. } => "loading",
            LoadState::Ready(_) => "ready",
            LoadState::Failed(_) => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LoadState;

    #[test]
    fn starts_idle() {
        let state: LoadState<u32> = LoadState::default();
        assert_eq!(state, LoadState::Idle);
        assert_eq!(state.label(), "idle");
        assert!(!state.is_loading() && !state.is_ready());
    }

    #[test]
    fn only_ready_exposes_a_value() {
        let loading: LoadState<u32> = LoadState::Loading {
            attempt: 2,
            uri: "https://mirror/model.glb".to_string(),
        };
        assert!(loading.is_loading());
        assert_eq!(loading.ready(), None);
        assert_eq!(loading.label(), "loading");

        let ready = LoadState::Ready(7u32);
        assert!(ready.is_ready());
        assert_eq!(ready.ready(), Some(&7));
        assert_eq!(ready.label(), "ready");

        let failed: LoadState<u32> = LoadState::Failed("empty scene".to_string());
        assert_eq!(failed.ready(), None);
        assert_eq!(failed.label(), "failed");
    }
}
