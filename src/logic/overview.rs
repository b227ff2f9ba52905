//! Read-only views: derived tournament state and the full dashboard snapshot.

use serde::Serialize;

use crate::logic::load_tournament;
use crate::models::{GameMatch, Team, Tournament, TournamentError, TournamentId, TournamentState};
use crate::store::{MatchFilter, UnitOfWork};

/// Everything a dashboard needs for one tournament.
#[derive(Clone, Debug, Serialize)]
pub struct TournamentOverview {
    pub tournament: Tournament,
    pub state: TournamentState,
    pub teams: Vec<Team>,
    /// All matches, by round then position.
    pub matches: Vec<GameMatch>,
    pub pending: Vec<GameMatch>,
}

/// State of a tournament given all of its matches.
pub fn derive_state(tournament: &Tournament, matches: &[GameMatch]) -> TournamentState {
    if let Some(champion) = &tournament.champion {
        return TournamentState::Finished {
            champion: champion.clone(),
        };
    }
    let Some(round) = matches.iter().map(GameMatch::round).max() else {
        return TournamentState::AwaitingBracket;
    };
    let complete = matches
        .iter()
        .filter(|m| m.round() == round)
        .all(GameMatch::is_decided);
    if complete {
        TournamentState::RoundComplete { round }
    } else {
        TournamentState::RoundInProgress { round }
    }
}

pub fn tournament_overview(
    uow: &dyn UnitOfWork,
    tournament_id: TournamentId,
) -> Result<TournamentOverview, TournamentError> {
    let tournament = load_tournament(uow, tournament_id)?;
    let teams = uow.teams(tournament_id)?;
    let matches = uow.matches(tournament_id, MatchFilter::All)?;
    let pending = matches
        .iter()
        .filter(|m| MatchFilter::Pending.accepts(m))
        .cloned()
        .collect();
    Ok(TournamentOverview {
        state: derive_state(&tournament, &matches),
        tournament,
        teams,
        matches,
        pending,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchKey;

    #[test]
    fn state_follows_matches_and_champion() {
        let mut t = Tournament::new("Cup", 4);
        assert_eq!(derive_state(&t, &[]), TournamentState::AwaitingBracket);

        let mut r1 = vec![
            GameMatch::new(t.id, MatchKey::new(1, 1), "A", "B", Some(MatchKey::new(2, 1))),
            GameMatch::new(t.id, MatchKey::new(1, 2), "C", "D", Some(MatchKey::new(2, 1))),
        ];
        assert_eq!(
            derive_state(&t, &r1),
            TournamentState::RoundInProgress { round: 1 }
        );

        r1[0].winner = Some("A".into());
        r1[1].winner = Some("D".into());
        assert_eq!(
            derive_state(&t, &r1),
            TournamentState::RoundComplete { round: 1 }
        );

        r1.push(GameMatch::new(t.id, MatchKey::new(2, 1), "A", "D", None));
        assert_eq!(
            derive_state(&t, &r1),
            TournamentState::RoundInProgress { round: 2 }
        );

        t.champion = Some("D".into());
        assert_eq!(
            derive_state(&t, &r1),
            TournamentState::Finished {
                champion: "D".into()
            }
        );
    }
}
