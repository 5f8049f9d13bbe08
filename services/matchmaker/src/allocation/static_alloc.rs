//! In-process allocator for running the matchmaker without a fleet.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tracing::info;

use super::{
    AllocationError, AllocationRequest, AllocationResponse, AllocationState, Allocator,
    GameServerPort, PROTOCOL_VERSION_ANNOTATION, VERSION_NAME_ANNOTATION,
};

/// Allocator that always succeeds, handing out a fixed address and
/// consecutive ports.
pub struct StaticAllocator {
    address: String,
    base_port: u16,
    counter: AtomicU32,
    annotations: HashMap<String, String>,
}

impl StaticAllocator {
    pub fn new(address: impl Into<String>, base_port: u16) -> Self {
        Self {
            address: address.into(),
            base_port,
            counter: AtomicU32::new(0),
            annotations: HashMap::new(),
        }
    }

    /// Reports the given protocol version and build name on every allocation.
    pub fn with_versions(mut self, protocol_version: i64, version_name: impl Into<String>) -> Self {
        self.annotations.insert(
            PROTOCOL_VERSION_ANNOTATION.to_string(),
            protocol_version.to_string(),
        );
        self.annotations
            .insert(VERSION_NAME_ANNOTATION.to_string(), version_name.into());
        self
    }
}

impl Default for StaticAllocator {
    fn default() -> Self {
        Self::new("127.0.0.1", 25565)
    }
}

#[async_trait]
impl Allocator for StaticAllocator {
    async fn allocate(
        &self,
        request: &AllocationRequest,
    ) -> Result<AllocationResponse, AllocationError> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let offset = u16::try_from(n % 1000).unwrap_or_default();
        let port = self.base_port.saturating_add(offset);
        let game_server_name = format!("{}-{:05}", request.fleet_name, n);

        info!(
            match_id = %request.match_id,
            game_server = %game_server_name,
            port,
            "[STATIC] Allocated game server"
        );

        Ok(AllocationResponse {
            state: Some(AllocationState::Allocated),
            game_server_name,
            address: self.address.clone(),
            ports: vec![GameServerPort {
                name: "default".to_string(),
                port: i32::from(port),
            }],
            annotations: self.annotations.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matchforge_id::MatchId;

    fn request() -> AllocationRequest {
        AllocationRequest {
            fleet_name: "lobby".to_string(),
            match_id: MatchId::new(),
            player_count: 1,
        }
    }

    #[tokio::test]
    async fn test_static_allocator_increments_port() {
        let allocator = StaticAllocator::new("10.0.0.9", 30000);
        let first = allocator.allocate(&request()).await.unwrap().into_assignment().unwrap();
        let second = allocator.allocate(&request()).await.unwrap().into_assignment().unwrap();

        assert_eq!(first.server_address, "10.0.0.9");
        assert_eq!(first.server_port, 30000);
        assert_eq!(second.server_port, 30001);
        assert_eq!(first.server_id, "lobby-00000");
        assert_ne!(first.server_id, second.server_id);
    }

    #[tokio::test]
    async fn test_static_allocator_versions() {
        let allocator = StaticAllocator::default().with_versions(765, "1.20.4");
        let assignment = allocator
            .allocate(&request())
            .await
            .unwrap()
            .into_assignment()
            .unwrap();
        assert_eq!(assignment.protocol_version, Some(765));
        assert_eq!(assignment.version_name.as_deref(), Some("1.20.4"));
    }
}
