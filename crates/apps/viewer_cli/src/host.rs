use std::collections::HashMap;

use bytes::Bytes;
use streaming::candidate::BUNDLED_SCHEME;
use streaming::error::FetchError;
use streaming::request::{FetchCommand, FetchId, FetchRequest};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub type Completion = (FetchId, Result<Bytes, FetchError>);

/// Executes fetch commands on the tokio runtime and collects completions.
pub struct FetchHost {
    client: reqwest::Client,
    tasks: HashMap<FetchId, JoinHandle<()>>,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
}

impl FetchHost {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            client: reqwest::Client::new(),
            tasks: HashMap::new(),
            tx,
            rx,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    pub fn execute(&mut self, commands: Vec<FetchCommand>) {
        for command in commands {
            match command {
                FetchCommand::Start(request) => self.start(request),
                FetchCommand::Abort(id) => {
                    if let Some(task) = self.tasks.remove(&id) {
                        task.abort();
                        debug!(%id, "fetch aborted");
                    }
                }
            }
        }
    }

    /// Completions that arrived since the last call.
    pub fn drain(&mut self) -> Vec<Completion> {
        let mut done = Vec::new();
        while let Ok((id, result)) = self.rx.try_recv() {
            if self.tasks.remove(&id).is_some() {
                done.push((id, result));
            }
        }
        done
    }

    pub fn abort_all(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }

    fn start(&mut self, request: FetchRequest) {
        let client = self.client.clone();
        let tx = self.tx.clone();
        let id = request.id;
        let task = tokio::spawn(async move {
            let result = fetch(&client, &request.uri).await;
            if let Err(err) = &result {
                warn!(%id, error = %err, "fetch failed");
            }
            let _ = tx.send((id, result));
        });
        self.tasks.insert(id, task);
    }
}

impl Default for FetchHost {
    fn default() -> Self {
        Self::new()
    }
}

async fn fetch(client: &reqwest::Client, uri: &str) -> Result<Bytes, FetchError> {
    if let Some(path) = uri.strip_prefix("file://") {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        return tokio::fs::read(path)
            .await
            .map(Bytes::from)
            .map_err(|err| FetchError::network(uri, err));
    }
    if uri.starts_with(BUNDLED_SCHEME) {
        return Err(FetchError::network(uri, "bundled assets are not fetched"));
    }

    let response = client
        .get(uri)
        .send()
        .await
        .map_err(|err| FetchError::network(uri, err))?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            uri: uri.to_string(),
            status: status.as_u16(),
        });
    }
    response
        .bytes()
        .await
        .map_err(|err| FetchError::network(uri, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn reads_file_uris_ignoring_cache_token() {
        let path = std::env::temp_dir().join(format!("suitcase-host-{}.bin", std::process::id()));
        tokio::fs::write(&path, b"glb").await.unwrap();
        let uri = format!("file://{}?v=3", path.display());

        let bytes = fetch(&reqwest::Client::new(), &uri).await.unwrap();
        assert_eq!(&bytes[..], b"glb");
        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn missing_file_is_a_network_error() {
        let err = fetch(&reqwest::Client::new(), "file:///definitely/not/here.png")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }));
    }

    #[tokio::test]
    async fn aborted_fetches_never_complete() {
        let mut host = FetchHost::new();
        let request = FetchRequest {
            id: FetchId(7),
            uri: "file:///definitely/not/here.png".to_string(),
            key: streaming::candidate::AssetKey::from_uri("file:///definitely/not/here.png"),
            class: streaming::request::AssetClass::Image,
        };
        host.execute(vec![FetchCommand::Start(request), FetchCommand::Abort(FetchId(7))]);
        tokio::task::yield_now().await;
        assert_eq!(host.in_flight(), 0);
        assert!(host.drain().is_empty());
    }
}
