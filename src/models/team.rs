//! Team registered in a tournament.

use crate::models::tournament::TournamentId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a team.
pub type TeamId = Uuid;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub tournament_id: TournamentId,
    /// Unique within the tournament, compared case-insensitively.
    pub name: String,
}

impl Team {
    /// New team with the name trimmed.
    pub fn new(tournament_id: TournamentId, name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            tournament_id,
            name: name.trim().to_string(),
        }
    }

    /// Case-insensitive name comparison (surrounding whitespace ignored).
    pub fn has_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.trim().to_lowercase()
    }
}
