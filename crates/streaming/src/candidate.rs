/// Scheme prefix for assets compiled into the application.
pub const BUNDLED_SCHEME: &str = "bundled:";

/// Logical identity of an asset: its location without query or fragment.
///
/// Cache-busting tokens live in the query string, so two URIs that differ only
/// by `?v=...` name the same asset.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetKey(String);

impl AssetKey {
    pub fn from_uri(uri: &str) -> Self {
        let end = uri.find(['?', '#']).unwrap_or(uri.len());
        Self(uri[..end].to_string())
    }

    pub fn bundled(name: &str) -> Self {
        Self(format!("{BUNDLED_SCHEME}{name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_bundled(&self) -> bool {
        self.0.starts_with(BUNDLED_SCHEME)
    }
}

impl std::fmt::Display for AssetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    Remote { uri: String, key: AssetKey },
    Bundled { name: String },
}

impl Candidate {
    pub fn remote(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let key = AssetKey::from_uri(&uri);
        Candidate::Remote { uri, key }
    }

    /// Accepts either a bare name or a `bundled:` URI.
    pub fn bundled(name: impl Into<String>) -> Self {
        let name = name.into();
        let name = match name.strip_prefix(BUNDLED_SCHEME) {
            Some(rest) => rest.to_string(),
            None => name,
        };
        Candidate::Bundled { name }
    }

    pub fn key(&self) -> AssetKey {
        match self {
            Candidate::Remote { key, .. } => key.clone(),
            Candidate::Bundled { name } => AssetKey::bundled(name),
        }
    }

    /// Where the asset comes from, as shown in logs and error reports.
    pub fn location(&self) -> String {
        match self {
            Candidate::Remote { uri, .. } => uri.clone(),
            Candidate::Bundled { name } => format!("{BUNDLED_SCHEME}{name}"),
        }
    }

    pub fn is_bundled(&self) -> bool {
        matches!(self, Candidate::Bundled { .. })
    }
}

/// Ordered sources for one asset: remote candidates first, then exactly one
/// bundled placeholder which cannot fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateList {
    candidates: Vec<Candidate>,
}

impl CandidateList {
    /// Remotes that share an [`AssetKey`] with an earlier remote are dropped.
    pub fn new<I, S>(remotes: I, placeholder: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut candidates: Vec<Candidate> = Vec::new();
        for uri in remotes {
            let candidate = Candidate::remote(uri);
            let key = candidate.key();
            if candidates.iter().any(|c| c.key() == key) {
                continue;
            }
            candidates.push(candidate);
        }
        candidates.push(Candidate::bundled(placeholder));
        Self { candidates }
    }

    pub fn primary(&self) -> &Candidate {
        &self.candidates[0]
    }

    pub fn placeholder(&self) -> &Candidate {
        &self.candidates[self.candidates.len() - 1]
    }

    pub fn get(&self, index: usize) -> Option<&Candidate> {
        self.candidates.get(index)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn remote_count(&self) -> usize {
        self.candidates.len() - 1
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }

    /// Appends `v={token}` to the primary remote's URI. Keys are unchanged.
    pub fn with_cache_token(mut self, token: u64) -> Self {
        if let Some(Candidate::Remote { uri, .. }) = self.candidates.first_mut() {
            let sep = if uri.contains('?') { '&' } else { '?' };
            uri.push_str(&format!("{sep}v={token}"));
        }
        self
    }

    /// True when both lists name the same assets in the same order.
    pub fn same_assets(&self, other: &CandidateList) -> bool {
        self.candidates.len() == other.candidates.len()
            && self
                .candidates
                .iter()
                .zip(&other.candidates)
                .all(|(a, b)| a.key() == b.key())
    }
}
