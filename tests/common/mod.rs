//! Helpers shared by the integration tests.
#![allow(dead_code)]

use bracket_tournament_web::{
    add_team, advance_round, build_bracket_with_rng, create_tournament, pending_matches,
    record_result, with_unit_of_work, Advance, BracketBuilt, EntityStore, GameMatch, MatchFilter,
    ResultRecorded, Tournament, TournamentError, TournamentId,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Tournament for `n` teams named `Team 0` .. `Team {n-1}`, roster full.
pub fn tournament_with_teams(store: &dyn EntityStore, n: u32) -> Tournament {
    with_unit_of_work(store, |uow| {
        let t = create_tournament(uow, "Test Cup", n)?;
        for i in 0..n {
            add_team(uow, t.id, &format!("Team {i}"))?;
        }
        Ok(t)
    })
    .expect("setup tournament")
}

pub fn build(store: &dyn EntityStore, id: TournamentId, seed: u64) -> BracketBuilt {
    with_unit_of_work(store, |uow| {
        build_bracket_with_rng(uow, id, &mut StdRng::seed_from_u64(seed))
    })
    .expect("build bracket")
}

/// Record `score_a`-`score_b` for every pending match.
pub fn decide_pending(
    store: &dyn EntityStore,
    id: TournamentId,
    score_a: i64,
    score_b: i64,
) -> Vec<ResultRecorded> {
    with_unit_of_work(store, |uow| {
        let pending = pending_matches(uow, id)?;
        pending
            .iter()
            .map(|m| record_result(uow, id, &m.key.to_string(), score_a, score_b))
            .collect()
    })
    .expect("record results")
}

pub fn record(
    store: &dyn EntityStore,
    id: TournamentId,
    match_id: &str,
    score_a: i64,
    score_b: i64,
) -> Result<ResultRecorded, TournamentError> {
    with_unit_of_work(store, |uow| record_result(uow, id, match_id, score_a, score_b))
}

pub fn advance(store: &dyn EntityStore, id: TournamentId) -> Result<Advance, TournamentError> {
    with_unit_of_work(store, |uow| advance_round(uow, id))
}

pub fn all_matches(store: &dyn EntityStore, id: TournamentId) -> Vec<GameMatch> {
    let uow = store.begin().expect("begin");
    uow.matches(id, MatchFilter::All).expect("list matches")
}

pub fn tournament(store: &dyn EntityStore, id: TournamentId) -> Option<Tournament> {
    let uow = store.begin().expect("begin");
    uow.tournament(id).expect("load tournament")
}
