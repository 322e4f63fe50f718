/// Monotonic version stamped on every configuration the store publishes.
///
/// Ordering is the only thing that matters: a result tagged with an older
/// version than the latest one is stale.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version(u64);

impl Version {
    pub const INITIAL: Version = Version(0);

    pub fn new(n: u64) -> Self {
        Version(n)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn next(self) -> Self {
        Version(self.0 + 1)
    }

    pub fn is_newer_than(self, other: Version) -> bool {
        self.0 > other.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}
