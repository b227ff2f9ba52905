//! Round 1: random pairings and the forward-link map between rounds.

use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::logic::load_tournament;
use crate::models::{GameMatch, MatchKey, TournamentError, TournamentId};
use crate::store::UnitOfWork;

/// Forward links for every match of `round`, in position order.
///
/// Positions `2k` and `2k+1` (0-indexed) both feed `R{round+1}_P{k+1}`. A round of one match
/// is the final and gets a single `None`.
pub fn advancement_targets(round: u32, match_count: u32) -> Vec<Option<MatchKey>> {
    match match_count {
        0 => Vec::new(),
        1 => vec![None],
        n => (0..n).map(|i| Some(MatchKey::new(round + 1, i / 2 + 1))).collect(),
    }
}

/// Round 1 of a freshly generated bracket.
#[derive(Clone, Debug, Serialize)]
pub struct BracketBuilt {
    pub matches: Vec<GameMatch>,
}

impl fmt::Display for BracketBuilt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Initial bracket ({} matches) generated successfully.",
            self.matches.len()
        )
    }
}

/// Generate and store round 1 with a thread-local RNG. See [`build_bracket_with_rng`].
pub fn build_bracket(
    uow: &mut dyn UnitOfWork,
    tournament_id: TournamentId,
) -> Result<BracketBuilt, TournamentError> {
    build_bracket_with_rng(uow, tournament_id, &mut rand::thread_rng())
}

/// Generate and store round 1.
///
/// 1. Require a full roster and no existing matches.
/// 2. Shuffle the team names.
/// 3. Pair neighbours: `R1_P{i+1}` gets teams `2i` and `2i+1`.
/// 4. Link each match to its round-2 target and insert the batch.
pub fn build_bracket_with_rng<R: Rng + ?Sized>(
    uow: &mut dyn UnitOfWork,
    tournament_id: TournamentId,
    rng: &mut R,
) -> Result<BracketBuilt, TournamentError> {
    let tournament = load_tournament(uow, tournament_id)?;
    let teams = uow.teams(tournament_id)?;
    if teams.len() != tournament.team_count as usize {
        return Err(TournamentError::MissingTeams {
            required: tournament.team_count,
            registered: teams.len() as u32,
        });
    }
    if uow.latest_round(tournament_id)?.is_some() {
        return Err(TournamentError::BracketAlreadyGenerated);
    }

    let mut participants: Vec<String> = teams.into_iter().map(|t| t.name).collect();
    participants.shuffle(rng);

    let targets = advancement_targets(1, tournament.first_round_matches());
    let matches: Vec<GameMatch> = participants
        .chunks_exact(2)
        .zip(targets)
        .enumerate()
        .map(|(i, (pair, next))| {
            GameMatch::new(
                tournament_id,
                MatchKey::new(1, i as u32 + 1),
                pair[0].as_str(),
                pair[1].as_str(),
                next,
            )
        })
        .collect();

    uow.insert_matches(&matches)?;
    log::info!(
        "Generated round 1 of '{}' with {} matches",
        tournament.name,
        matches.len()
    );
    Ok(BracketBuilt { matches })
}
