//! Result entry for a single match, and the list of matches still to play.

use std::fmt;

use serde::Serialize;

use crate::logic::load_tournament;
use crate::models::{GameMatch, MatchKey, Score, TournamentError, TournamentId};
use crate::store::{MatchFilter, UnitOfWork};

/// A match after its result was stored.
#[derive(Clone, Debug, Serialize)]
pub struct ResultRecorded {
    pub game: GameMatch,
}

impl fmt::Display for ResultRecorded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let g = &self.game;
        write!(f, "Result recorded for {} vs {}.", g.side_a, g.side_b)?;
        if let Some(score) = g.score {
            write!(f, " Score: {}-{}.", score.a, score.b)?;
        }
        if let Some(winner) = &g.winner {
            write!(f, " Winner: {}.", winner)?;
        }
        Ok(())
    }
}

/// Record the score of match `match_id` (`R{round}_P{position}`) and set its winner.
///
/// Checks, in order: the match exists, neither score is negative, the scores differ, and the
/// match's round has not been advanced yet. Re-entering a result before advancement
/// overwrites the previous one.
pub fn record_result(
    uow: &mut dyn UnitOfWork,
    tournament_id: TournamentId,
    match_id: &str,
    score_a: i64,
    score_b: i64,
) -> Result<ResultRecorded, TournamentError> {
    let tournament = load_tournament(uow, tournament_id)?;
    let key: MatchKey = match_id
        .trim()
        .parse()
        .map_err(|_| TournamentError::MatchNotFound(match_id.to_string()))?;
    let mut game = uow
        .find_match(tournament_id, key)?
        .ok_or_else(|| TournamentError::MatchNotFound(key.to_string()))?;

    let (Ok(a), Ok(b)) = (u64::try_from(score_a), u64::try_from(score_b)) else {
        return Err(TournamentError::NegativeScore);
    };
    let score = Score { a, b };
    let side = score.leader().ok_or(TournamentError::TieNotAllowed)?;

    // Once the next round exists its sides were copied from this round's winners.
    let advanced = uow
        .latest_round(tournament_id)?
        .is_some_and(|latest| latest > key.round());
    if tournament.is_finished() || advanced {
        return Err(TournamentError::ResultLocked(key));
    }

    let winner = game.side(side).to_string();
    uow.record_score(tournament_id, key, score, &winner)?;
    log::debug!(
        "{} {}: {} {}-{} {} (winner {})",
        tournament.name,
        key,
        game.side_a,
        a,
        b,
        game.side_b,
        winner
    );
    game.score = Some(score);
    game.winner = Some(winner);
    Ok(ResultRecorded { game })
}

/// Matches without a winner, ordered by round then position.
pub fn pending_matches(
    uow: &dyn UnitOfWork,
    tournament_id: TournamentId,
) -> Result<Vec<GameMatch>, TournamentError> {
    load_tournament(uow, tournament_id)?;
    Ok(uow.matches(tournament_id, MatchFilter::Pending)?)
}
