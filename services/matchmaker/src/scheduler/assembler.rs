//! Match assembly: splitting drained intents into fixed-size matches.

use chrono::Utc;
use matchforge_events::{Match, Ticket};
use tracing::info;

use crate::allocation::{AllocationRequest, PendingMatch};
use crate::queue::Intent;

/// Batches intents into matches of `players_per_match`.
///
/// Intents are consumed in the order given, so the same drained queue always
/// produces matches with the same composition. Only the last match of a batch
/// may be short.
#[derive(Debug, Clone)]
pub struct MatchAssembler {
    fleet_name: String,
    game_mode_id: String,
    players_per_match: usize,
}

impl MatchAssembler {
    /// `players_per_match` is clamped to at least one.
    pub fn new(
        fleet_name: impl Into<String>,
        game_mode_id: impl Into<String>,
        players_per_match: usize,
    ) -> Self {
        Self {
            fleet_name: fleet_name.into(),
            game_mode_id: game_mode_id.into(),
            players_per_match: players_per_match.max(1),
        }
    }

    pub fn game_mode_id(&self) -> &str {
        &self.game_mode_id
    }

    pub fn fleet_name(&self) -> &str {
        &self.fleet_name
    }

    pub fn players_per_match(&self) -> usize {
        self.players_per_match
    }

    /// Builds one match, and its allocation request, per chunk of intents.
    pub fn assemble(&self, intents: &[Intent]) -> Vec<PendingMatch> {
        if intents.is_empty() {
            return Vec::new();
        }

        let created_at = Utc::now();
        let pending: Vec<PendingMatch> = intents
            .chunks(self.players_per_match)
            .map(|chunk| {
                let mut m = Match::new(self.game_mode_id.as_str());
                m.tickets = chunk
                    .iter()
                    .map(|intent| {
                        Ticket::for_player(
                            intent.player_id,
                            self.game_mode_id.as_str(),
                            intent.auto_teleport,
                            created_at,
                        )
                    })
                    .collect();
                let request = AllocationRequest::for_match(self.fleet_name.as_str(), &m);
                PendingMatch { r#match: m, request }
            })
            .collect();

        info!(
            match_count = pending.len(),
            player_count = intents.len(),
            players_per_match = self.players_per_match,
            "Created matches from players"
        );

        pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matchforge_id::PlayerId;
    use proptest::prelude::*;
    use rstest::rstest;
    use std::collections::HashSet;

    fn intents(n: usize) -> Vec<Intent> {
        (0..n)
            .map(|i| Intent {
                player_id: PlayerId::new_random(),
                auto_teleport: i % 2 == 0,
            })
            .collect()
    }

    #[test]
    fn test_empty_input_yields_no_matches() {
        let assembler = MatchAssembler::new("lobby", "lobby", 4);
        assert!(assembler.assemble(&[]).is_empty());
    }

    #[rstest]
    #[case(5, 2, vec![2, 2, 1])]
    #[case(4, 2, vec![2, 2])]
    #[case(1, 50, vec![1])]
    #[case(7, 3, vec![3, 3, 1])]
    #[case(3, 1, vec![1, 1, 1])]
    fn test_ticket_counts(
        #[case] players: usize,
        #[case] per_match: usize,
        #[case] expected: Vec<usize>,
    ) {
        let assembler = MatchAssembler::new("lobby", "lobby", per_match);
        let counts: Vec<_> = assembler
            .assemble(&intents(players))
            .iter()
            .map(|p| p.r#match.ticket_count())
            .collect();
        assert_eq!(counts, expected);
    }

    #[test]
    fn test_requests_sized_to_their_match() {
        let assembler = MatchAssembler::new("lobby-fleet", "lobby", 2);
        for p in assembler.assemble(&intents(5)) {
            assert_eq!(p.request.match_id, p.r#match.id);
            assert_eq!(p.request.player_count as usize, p.r#match.ticket_count());
            assert_eq!(p.request.fleet_name, "lobby-fleet");
        }
    }

    #[test]
    fn test_tickets_carry_intent_and_mode() {
        let assembler = MatchAssembler::new("lobby", "proxy", 10);
        let input = intents(3);
        let pending = assembler.assemble(&input);
        let m = &pending[0].r#match;

        assert_eq!(m.game_mode_id, "proxy");
        assert!(m.assignment.is_none());
        assert!(m.map_id.is_none());
        for (ticket, intent) in m.tickets.iter().zip(&input) {
            assert_eq!(ticket.player_ids, vec![intent.player_id]);
            assert_eq!(ticket.auto_teleport, intent.auto_teleport);
            assert_eq!(ticket.game_mode_id, "proxy");
            assert!(!ticket.dequeue_on_disconnect);
            assert!(!ticket.in_pending_match);
        }
    }

    #[test]
    fn test_composition_follows_input_order() {
        let assembler = MatchAssembler::new("lobby", "lobby", 2);
        let input = intents(4);
        let pending = assembler.assemble(&input);
        let players: Vec<_> = pending.iter().flat_map(|p| p.r#match.player_ids()).collect();
        let expected: Vec<_> = input.iter().map(|i| i.player_id).collect();
        assert_eq!(players, expected);
    }

    #[test]
    fn test_zero_players_per_match_clamped() {
        let assembler = MatchAssembler::new("lobby", "lobby", 0);
        assert_eq!(assembler.players_per_match(), 1);
        assert_eq!(assembler.assemble(&intents(2)).len(), 2);
    }

    proptest! {
        #[test]
        fn prop_partition_is_exact(n in 0usize..300, per_match in 1usize..40) {
            let assembler = MatchAssembler::new("lobby", "lobby", per_match);
            let input = intents(n);
            let pending = assembler.assemble(&input);

            prop_assert_eq!(pending.len(), n.div_ceil(per_match));

            let counts: Vec<_> = pending.iter().map(|p| p.r#match.ticket_count()).collect();
            prop_assert_eq!(counts.iter().sum::<usize>(), n);
            prop_assert!(counts.iter().all(|c| (1..=per_match).contains(c)));
            prop_assert!(counts.iter().filter(|c| **c != per_match).count() <= 1);

            let unique: HashSet<_> = pending.iter().flat_map(|p| p.r#match.player_ids()).collect();
            prop_assert_eq!(unique.len(), n);

            let ids: HashSet<_> = pending.iter().map(|p| p.r#match.id).collect();
            prop_assert_eq!(ids.len(), pending.len());
        }
    }
}
