//! Round advancement: close the current round and either pair its winners into the next
//! round or crown the champion.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::logic::bracket::advancement_targets;
use crate::logic::load_tournament;
use crate::models::{GameMatch, MatchKey, TournamentError, TournamentId};
use crate::store::{MatchFilter, UnitOfWork};

/// Outcome of a successful [`advance_round`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum Advance {
    /// A new round was generated.
    NextRound { round: u32, matches: Vec<GameMatch> },
    /// The final was decided; no more matches will be created.
    Finished { champion: String },
}

impl fmt::Display for Advance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advance::NextRound { round, matches } => {
                write!(f, "Round {} generated with {} matches.", round, matches.len())
            }
            Advance::Finished { champion } => {
                write!(f, "TOURNAMENT FINISHED! The champion is: {}", champion)
            }
        }
    }
}

/// Next-round match under construction: filled in the order winners are encountered.
#[derive(Debug)]
struct Pairing {
    side_a: String,
    side_b: Option<String>,
}

fn integrity(msg: String) -> TournamentError {
    log::error!("Bracket integrity error: {}", msg);
    TournamentError::BracketIntegrity(msg)
}

/// Advance the tournament past its current (highest) round.
///
/// Fails with [`TournamentError::RoundIncomplete`] while any match of the current round has no
/// winner; that is the normal outcome while results are still coming in. A malformed bracket
/// yields [`TournamentError::BracketIntegrity`] before anything is written.
pub fn advance_round(
    uow: &mut dyn UnitOfWork,
    tournament_id: TournamentId,
) -> Result<Advance, TournamentError> {
    let tournament = load_tournament(uow, tournament_id)?;
    if let Some(champion) = tournament.champion {
        return Err(TournamentError::AlreadyFinished { champion });
    }
    let round = uow
        .latest_round(tournament_id)?
        .ok_or(TournamentError::NoBracket)?;
    let current = uow.matches(tournament_id, MatchFilter::Round(round))?;
    if let Some(pending) = current.iter().find(|m| !m.is_decided()) {
        return Err(TournamentError::RoundIncomplete {
            round,
            pending: pending.key,
        });
    }

    if is_final_round(round, &current)? {
        let Some(champion) = current[0].winner.clone() else {
            return Err(integrity(format!("final {} has no winner", current[0].key)));
        };
        uow.set_champion(tournament_id, &champion)?;
        log::info!(
            "Tournament '{}' finished. Champion: {}",
            tournament.name,
            champion
        );
        return Ok(Advance::Finished { champion });
    }

    let next_round = round + 1;
    let matches = pair_winners(tournament_id, &current, next_round)?;
    uow.insert_matches(&matches)?;
    log::info!(
        "Generated round {} of '{}' with {} matches",
        next_round,
        tournament.name,
        matches.len()
    );
    Ok(Advance::NextRound {
        round: next_round,
        matches,
    })
}

/// A round is the final when it holds exactly one match and that match links nowhere.
/// Any other combination of size and links is a malformed bracket.
fn is_final_round(round: u32, current: &[GameMatch]) -> Result<bool, TournamentError> {
    match current {
        [] => Err(TournamentError::NoBracket),
        [only] => match only.next_match {
            None => Ok(true),
            Some(next) => Err(integrity(format!(
                "single match {} of round {} still links to {}",
                only.key, round, next
            ))),
        },
        _ if current.len() % 2 != 0 => Err(integrity(format!(
            "round {} has an odd number of matches ({})",
            round,
            current.len()
        ))),
        _ => match current.iter().find(|m| m.next_match.is_none()) {
            Some(m) => Err(integrity(format!(
                "match {} has no forward link but round {} has {} matches",
                m.key,
                round,
                current.len()
            ))),
            None => Ok(false),
        },
    }
}

/// Group the current round's winners by their recorded forward link.
///
/// `current` is in position order, so the winner of the lower position lands on side A.
fn pair_winners(
    tournament_id: TournamentId,
    current: &[GameMatch],
    next_round: u32,
) -> Result<Vec<GameMatch>, TournamentError> {
    let next_count = (current.len() / 2) as u32;
    let targets = advancement_targets(next_round, next_count);

    let mut pairings: BTreeMap<MatchKey, Pairing> = BTreeMap::new();
    for m in current {
        let (Some(target), Some(winner)) = (m.next_match, m.winner.clone()) else {
            return Err(integrity(format!("match {} cannot advance", m.key)));
        };
        if target.round() != next_round || target.position() > next_count {
            return Err(integrity(format!(
                "match {} links to {}, outside round {} ({} matches)",
                m.key, target, next_round, next_count
            )));
        }
        match pairings.entry(target) {
            Entry::Vacant(slot) => {
                slot.insert(Pairing {
                    side_a: winner,
                    side_b: None,
                });
            }
            Entry::Occupied(mut slot) => {
                let pairing = slot.get_mut();
                if pairing.side_b.is_some() {
                    return Err(integrity(format!("more than two winners feed {}", target)));
                }
                pairing.side_b = Some(winner);
            }
        }
    }

    if pairings.len() != next_count as usize {
        return Err(integrity(format!(
            "round {} needs {} matches, winners fill {}",
            next_round,
            next_count,
            pairings.len()
        )));
    }

    pairings
        .into_iter()
        .map(|(key, pairing)| {
            let Some(side_b) = pairing.side_b else {
                return Err(integrity(format!(
                    "match {} has only one team ({})",
                    key, pairing.side_a
                )));
            };
            let next = targets[(key.position() - 1) as usize];
            Ok(GameMatch::new(tournament_id, key, pairing.side_a, side_b, next))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn decided(id: TournamentId, key: MatchKey, next: Option<MatchKey>, winner: &str) -> GameMatch {
        let mut m = GameMatch::new(id, key, winner, format!("{winner}-loser"), next);
        m.winner = Some(winner.to_string());
        m
    }

    #[test]
    fn winners_pair_in_position_order() {
        let id = Uuid::new_v4();
        let current = vec![
            decided(id, MatchKey::new(1, 1), Some(MatchKey::new(2, 1)), "A"),
            decided(id, MatchKey::new(1, 2), Some(MatchKey::new(2, 1)), "B"),
            decided(id, MatchKey::new(1, 3), Some(MatchKey::new(2, 2)), "C"),
            decided(id, MatchKey::new(1, 4), Some(MatchKey::new(2, 2)), "D"),
        ];
        let next = pair_winners(id, &current, 2).unwrap();
        assert_eq!(next.len(), 2);
        assert_eq!((next[0].side_a.as_str(), next[0].side_b.as_str()), ("A", "B"));
        assert_eq!((next[1].side_a.as_str(), next[1].side_b.as_str()), ("C", "D"));
        assert_eq!(next[0].key, MatchKey::new(2, 1));
        assert_eq!(next[0].next_match, Some(MatchKey::new(3, 1)));
        assert_eq!(next[1].next_match, Some(MatchKey::new(3, 1)));
        assert_eq!(next[0].round_label, "Round 2");
    }

    #[test]
    fn grouping_follows_recorded_links() {
        let id = Uuid::new_v4();
        // Crossed links: positions 1 and 3 feed R2_P1.
        let current = vec![
            decided(id, MatchKey::new(1, 1), Some(MatchKey::new(2, 1)), "A"),
            decided(id, MatchKey::new(1, 2), Some(MatchKey::new(2, 2)), "B"),
            decided(id, MatchKey::new(1, 3), Some(MatchKey::new(2, 1)), "C"),
            decided(id, MatchKey::new(1, 4), Some(MatchKey::new(2, 2)), "D"),
        ];
        let next = pair_winners(id, &current, 2).unwrap();
        assert_eq!((next[0].side_a.as_str(), next[0].side_b.as_str()), ("A", "C"));
        assert_eq!((next[1].side_a.as_str(), next[1].side_b.as_str()), ("B", "D"));
    }

    #[test]
    fn half_filled_pairing_is_an_integrity_error() {
        let id = Uuid::new_v4();
        let current = vec![
            decided(id, MatchKey::new(1, 1), Some(MatchKey::new(2, 1)), "A"),
            decided(id, MatchKey::new(1, 2), Some(MatchKey::new(2, 1)), "B"),
            decided(id, MatchKey::new(1, 3), Some(MatchKey::new(2, 1)), "C"),
            decided(id, MatchKey::new(1, 4), Some(MatchKey::new(2, 2)), "D"),
        ];
        assert!(matches!(
            pair_winners(id, &current, 2),
            Err(TournamentError::BracketIntegrity(_))
        ));
    }

    #[test]
    fn link_outside_next_round_is_an_integrity_error() {
        let id = Uuid::new_v4();
        let current = vec![
            decided(id, MatchKey::new(1, 1), Some(MatchKey::new(2, 1)), "A"),
            decided(id, MatchKey::new(1, 2), Some(MatchKey::new(3, 1)), "B"),
        ];
        assert!(matches!(
            pair_winners(id, &current, 2),
            Err(TournamentError::BracketIntegrity(_))
        ));
    }

    #[test]
    fn final_detection() {
        let id = Uuid::new_v4();
        let last = [decided(id, MatchKey::new(3, 1), None, "A")];
        assert!(is_final_round(3, &last).unwrap());

        let linked = [decided(id, MatchKey::new(2, 1), Some(MatchKey::new(3, 1)), "A")];
        assert!(matches!(
            is_final_round(2, &linked),
            Err(TournamentError::BracketIntegrity(_))
        ));

        let unlinked_pair = [
            decided(id, MatchKey::new(1, 1), None, "A"),
            decided(id, MatchKey::new(1, 2), None, "B"),
        ];
        assert!(matches!(
            is_final_round(1, &unlinked_pair),
            Err(TournamentError::BracketIntegrity(_))
        ));
    }
}
