//! Setup phase: create tournaments, register teams, import rosters, delete.

use std::io::Read;

use serde::Deserialize;

use crate::logic::load_tournament;
use crate::models::{is_valid_team_count, Team, Tournament, TournamentError, TournamentId};
use crate::store::UnitOfWork;

/// Create a tournament for `team_count` teams (a power of two, at least 2).
pub fn create_tournament(
    uow: &mut dyn UnitOfWork,
    name: &str,
    team_count: u32,
) -> Result<Tournament, TournamentError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TournamentError::MissingField("tournament name"));
    }
    if !is_valid_team_count(team_count) {
        return Err(TournamentError::InvalidTeamCount(team_count));
    }
    let tournament = Tournament::new(name, team_count);
    uow.insert_tournament(&tournament)?;
    log::info!(
        "Created tournament '{}' ({}) for {} teams",
        tournament.name,
        tournament.id,
        tournament.team_count
    );
    Ok(tournament)
}

/// Register a team. Names are trimmed and must be unique (case-insensitive) within the
/// tournament; the roster cannot exceed the tournament's team count.
pub fn add_team(
    uow: &mut dyn UnitOfWork,
    tournament_id: TournamentId,
    name: &str,
) -> Result<Team, TournamentError> {
    let tournament = load_tournament(uow, tournament_id)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(TournamentError::MissingField("team name"));
    }
    let teams = uow.teams(tournament_id)?;
    if teams.len() >= tournament.team_count as usize {
        return Err(TournamentError::RosterFull {
            capacity: tournament.team_count,
        });
    }
    if teams.iter().any(|t| t.has_name(name)) {
        return Err(TournamentError::DuplicateTeamName(name.to_string()));
    }
    let team = Team::new(tournament_id, name);
    uow.insert_team(&team)?;
    log::debug!(
        "Team '{}' joined '{}' ({}/{})",
        team.name,
        tournament.name,
        teams.len() + 1,
        tournament.team_count
    );
    Ok(team)
}

#[derive(Deserialize)]
struct TeamRow {
    name: String,
}

/// Register every team listed in a CSV with a `name` column.
///
/// Rows go through [`add_team`] in file order and the first failure is returned, so callers
/// running this inside [`crate::store::with_unit_of_work`] get all-or-nothing semantics.
pub fn import_teams<R: Read>(
    uow: &mut dyn UnitOfWork,
    tournament_id: TournamentId,
    csv_data: R,
) -> Result<Vec<Team>, TournamentError> {
    load_tournament(uow, tournament_id)?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(csv_data);
    let mut added = Vec::new();
    for row in reader.deserialize::<TeamRow>() {
        let row = row.map_err(|e| TournamentError::InvalidCsv(e.to_string()))?;
        added.push(add_team(uow, tournament_id, &row.name)?);
    }
    if added.is_empty() {
        return Err(TournamentError::InvalidCsv("no team rows".to_string()));
    }
    Ok(added)
}

/// All tournaments, oldest first.
pub fn list_tournaments(uow: &dyn UnitOfWork) -> Result<Vec<Tournament>, TournamentError> {
    Ok(uow.tournaments()?)
}

/// Delete a tournament together with its teams and matches. Returns the deleted tournament.
pub fn delete_tournament(
    uow: &mut dyn UnitOfWork,
    tournament_id: TournamentId,
) -> Result<Tournament, TournamentError> {
    let tournament = load_tournament(uow, tournament_id)?;
    if !uow.delete_tournament(tournament_id)? {
        return Err(TournamentError::TournamentNotFound(tournament_id));
    }
    log::info!("Deleted tournament '{}' ({})", tournament.name, tournament.id);
    Ok(tournament)
}
