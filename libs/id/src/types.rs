//! Concrete ID types.

use crate::define_id;
use crate::IdError;

// =============================================================================
// Matchmaking
// =============================================================================

define_id!(MatchId, "match");

// =============================================================================
// Messaging
// =============================================================================

define_id!(MessageId, "msg");

// =============================================================================
// Players
// =============================================================================

/// A player's account identity.
///
/// Unlike the matchmaker's own IDs this carries no prefix: the UUID is minted
/// by the account system and travels through the queue unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlayerId(uuid::Uuid);

impl PlayerId {
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Generates a random player ID. Intended for tests and tooling.
    #[must_use]
    pub fn new_random() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    #[must_use]
    pub const fn uuid(&self) -> uuid::Uuid {
        self.0
    }

    pub fn parse(s: &str) -> Result<Self, IdError> {
        if s.is_empty() {
            return Err(IdError::Empty);
        }
        uuid::Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| IdError::InvalidUuid(e.to_string()))
    }
}

impl From<uuid::Uuid> for PlayerId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

impl From<PlayerId> for uuid::Uuid {
    fn from(id: PlayerId) -> Self {
        id.0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for PlayerId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for PlayerId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for PlayerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        uuid::Uuid::deserialize(deserializer).map(Self)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_match_id_roundtrip() {
        let id = MatchId::new();
        let s = id.to_string();
        let parsed: MatchId = s.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_match_id_prefix() {
        let id = MatchId::new();
        assert!(id.to_string().starts_with("match_"));
    }

    #[test]
    fn test_match_id_invalid_prefix() {
        let result: Result<MatchId, _> = "msg_01HV4Z2WQXKJNM8GPQY6VBKC3D".parse();
        assert!(matches!(
            result.unwrap_err(),
            IdError::InvalidPrefix { expected: "match", .. }
        ));
    }

    #[test]
    fn test_match_id_missing_separator() {
        let result: Result<MatchId, _> = "match01HV4Z2WQXKJNM8GPQY6VBKC3D".parse();
        assert!(matches!(result.unwrap_err(), IdError::MissingSeparator));
    }

    #[test]
    fn test_match_id_empty() {
        let result: Result<MatchId, _> = "".parse();
        assert!(result.unwrap_err().is_empty());
    }

    #[test]
    fn test_match_id_invalid_ulid() {
        let result: Result<MatchId, _> = "match_invalid".parse();
        assert!(matches!(result.unwrap_err(), IdError::InvalidUlid(_)));
    }

    #[test]
    fn test_match_id_json_is_prefixed_string() {
        let id = MatchId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let parsed: MatchId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_match_id_json_rejects_foreign_prefix() {
        let msg = MessageId::new();
        let json = serde_json::to_string(&msg).unwrap();
        let err = serde_json::from_str::<MatchId>(&json).unwrap_err();
        assert!(err.to_string().contains("invalid ID prefix"));
    }

    #[test]
    fn test_match_ids_sortable() {
        let id1 = MatchId::new();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let id2 = MatchId::new();
        assert!(id1 < id2);
    }

    #[test]
    fn test_prefixes_unique() {
        assert_ne!(MatchId::PREFIX, MessageId::PREFIX);
    }

    #[test]
    fn test_player_id_parse() {
        let parsed: PlayerId = "6f1c1e0a-52d8-4b1e-9d4a-0f0c3c1d2e3f".parse().unwrap();
        assert_eq!(
            parsed.to_string(),
            "6f1c1e0a-52d8-4b1e-9d4a-0f0c3c1d2e3f"
        );
    }

    #[test]
    fn test_player_id_rejects_garbage() {
        assert!(matches!(
            PlayerId::parse("not-a-uuid").unwrap_err(),
            IdError::InvalidUuid(_)
        ));
        assert!(PlayerId::parse("").unwrap_err().is_empty());
    }

    #[test]
    fn test_player_id_json_is_bare_uuid() {
        let id = PlayerId::new_random();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.uuid()));
    }

    proptest! {
        #[test]
        fn prop_player_id_display_parses_back(bytes in any::<[u8; 16]>()) {
            let id = PlayerId::from_uuid(uuid::Uuid::from_bytes(bytes));
            prop_assert_eq!(PlayerId::parse(&id.to_string()).unwrap(), id);
        }
    }
}
