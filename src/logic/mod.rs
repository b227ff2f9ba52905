//! Tournament business logic: setup, bracket generation, results, advancement.
//!
//! Every operation runs against a caller-supplied unit of work and writes nothing unless it
//! succeeds.

mod advance;
mod bracket;
mod overview;
mod results;
mod setup;

pub use advance::{advance_round, Advance};
pub use bracket::{advancement_targets, build_bracket, build_bracket_with_rng, BracketBuilt};
pub use overview::{derive_state, tournament_overview, TournamentOverview};
pub use results::{pending_matches, record_result, ResultRecorded};
pub use setup::{add_team, create_tournament, delete_tournament, import_teams, list_tournaments};

use crate::models::{Tournament, TournamentError, TournamentId};
use crate::store::UnitOfWork;

fn load_tournament(
    uow: &dyn UnitOfWork,
    tournament_id: TournamentId,
) -> Result<Tournament, TournamentError> {
    uow.tournament(tournament_id)?
        .ok_or(TournamentError::TournamentNotFound(tournament_id))
}
