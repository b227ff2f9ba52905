//! Single-elimination bracket organizer: library with models, storage and business logic.

pub mod config;
pub mod logic;
pub mod models;
pub mod store;

pub use logic::{
    add_team, advance_round, advancement_targets, build_bracket, build_bracket_with_rng,
    create_tournament, delete_tournament, derive_state, import_teams, list_tournaments,
    pending_matches, record_result, tournament_overview, Advance, BracketBuilt, ResultRecorded,
    TournamentOverview,
};
pub use models::{
    ErrorKind, GameMatch, MatchKey, Score, Side, Team, TeamId, Tournament, TournamentError,
    TournamentId, TournamentState,
};
pub use store::{
    with_unit_of_work, EntityStore, MatchFilter, MemoryStore, SqliteStore, StoreError, UnitOfWork,
};
