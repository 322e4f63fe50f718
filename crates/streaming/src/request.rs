use crate::candidate::AssetKey;

/// Identifies one fetch handed to the host.
///
/// Ids are never reused within a pipeline, so a completion for an id the
/// pipeline no longer tracks is stale and can be dropped.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchId(pub u64);

impl std::fmt::Display for FetchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fetch#{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssetClass {
    Model,
    Image,
}

impl AssetClass {
    /// Queue priority; smaller runs first.
    pub fn priority(self) -> i32 {
        match self {
            AssetClass::Image => 0,
            AssetClass::Model => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AssetClass::Model => "model",
            AssetClass::Image => "image",
        }
    }
}

/// A fetch the host should perform: GET `uri`, then report back by `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub id: FetchId,
    pub uri: String,
    pub key: AssetKey,
    pub class: AssetClass,
}

/// What the host is asked to do this frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchCommand {
    Start(FetchRequest),
    Abort(FetchId),
}
