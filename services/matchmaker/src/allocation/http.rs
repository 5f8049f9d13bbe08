//! HTTP allocator client.
//!
//! Posts `GameServerAllocation` documents to an allocator service and turns
//! the returned status into an [`AllocationResponse`].
//!
//! The selector prefers servers of the fleet that are already allocated and
//! still have room for the whole match, and falls back to a ready server.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{
    AllocationError, AllocationRequest, AllocationResponse, AllocationState, Allocator,
    GameServerPort,
};

const API_VERSION: &str = "allocation.agones.dev/v1";
const KIND: &str = "GameServerAllocation";
const FLEET_LABEL: &str = "agones.dev/fleet";
const MATCH_ID_ANNOTATION: &str = "matchforge.dev/match-id";

/// Allocator backed by an HTTP allocation endpoint.
pub struct HttpAllocator {
    client: reqwest::Client,
    url: String,
}

impl HttpAllocator {
    /// Creates a client for the allocator at `base_url`.
    ///
    /// `timeout` bounds each allocation request; a request that times out
    /// fails that match only.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: format!("{}/gameserverallocation", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl Allocator for HttpAllocator {
    async fn allocate(
        &self,
        request: &AllocationRequest,
    ) -> Result<AllocationResponse, AllocationError> {
        let body = GameServerAllocation::from_request(request);
        debug!(url = %self.url, fleet = %request.fleet_name, "Requesting game server allocation");

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AllocationError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Allocator rejected request");
            return Err(AllocationError::Transport(format!(
                "allocator returned {}: {}",
                status, body
            )));
        }

        let allocation: GameServerAllocation = response
            .json()
            .await
            .map_err(|e| AllocationError::Malformed(e.to_string()))?;

        let status = allocation.status.unwrap_or_default();
        Ok(AllocationResponse {
            state: status.state,
            game_server_name: status.game_server_name,
            address: status.address,
            ports: status.ports,
            annotations: status.metadata.annotations,
        })
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameServerAllocation {
    #[serde(default)]
    api_version: String,
    #[serde(default)]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    spec: Option<AllocationSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<AllocationStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllocationSpec {
    selectors: Vec<GameServerSelector>,
    metadata: ObjectMeta,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameServerSelector {
    match_labels: HashMap<String, String>,
    game_server_state: String,
    players: PlayerSelector,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerSelector {
    min_available: i64,
    max_available: i64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMeta {
    #[serde(default)]
    labels: HashMap<String, String>,
    #[serde(default)]
    annotations: HashMap<String, String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllocationStatus {
    #[serde(default)]
    state: Option<AllocationState>,
    #[serde(default)]
    game_server_name: String,
    #[serde(default)]
    address: String,
    #[serde(default)]
    ports: Vec<GameServerPort>,
    #[serde(default)]
    metadata: ObjectMeta,
}

impl GameServerAllocation {
    fn from_request(request: &AllocationRequest) -> Self {
        let selector = |state: &str| GameServerSelector {
            match_labels: HashMap::from([(FLEET_LABEL.to_string(), request.fleet_name.clone())]),
            game_server_state: state.to_string(),
            players: PlayerSelector {
                min_available: i64::from(request.player_count),
                max_available: i64::MAX,
            },
        };

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            spec: Some(AllocationSpec {
                selectors: vec![selector("Allocated"), selector("Ready")],
                metadata: ObjectMeta {
                    labels: HashMap::new(),
                    annotations: HashMap::from([(
                        MATCH_ID_ANNOTATION.to_string(),
                        request.match_id.to_string(),
                    )]),
                },
            }),
            status: None,
        }
    }
}
