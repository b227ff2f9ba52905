//! Data structures for the bracket organizer: tournaments, teams, matches.

mod game;
mod team;
mod tournament;

pub use game::{round_label, GameMatch, MatchKey, ParseMatchKeyError, Score, Side};
pub use team::{Team, TeamId};
pub use tournament::{
    is_valid_team_count, ErrorKind, Tournament, TournamentError, TournamentId, TournamentState,
    SINGLE_ELIMINATION,
};
