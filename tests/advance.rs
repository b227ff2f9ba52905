//! Integration tests for round advancement and tournament completion.

mod common;

use std::collections::BTreeMap;

use bracket_tournament_web::{
    derive_state, with_unit_of_work, Advance, ErrorKind, GameMatch, MatchKey, MemoryStore,
    TournamentError, TournamentState,
};
use common::{advance, all_matches, build, decide_pending, record, tournament, tournament_with_teams};

#[test]
fn advancing_without_bracket_fails() {
    let store = MemoryStore::new();
    let t = tournament_with_teams(&store, 4);
    let err = advance(&store, t.id).unwrap_err();
    assert!(matches!(err, TournamentError::NoBracket));
    assert_eq!(err.kind(), ErrorKind::Precondition);
}

#[test]
fn incomplete_round_names_first_pending_match() {
    let store = MemoryStore::new();
    let t = tournament_with_teams(&store, 4);
    build(&store, t.id, 3);
    record(&store, t.id, "R1_P1", 3, 0).unwrap();

    let err = advance(&store, t.id).unwrap_err();
    assert!(matches!(
        err,
        TournamentError::RoundIncomplete { round: 1, pending } if pending == MatchKey::new(1, 2)
    ));
    assert_eq!(err.kind(), ErrorKind::Precondition);
    assert_eq!(all_matches(&store, t.id).len(), 2);
}

#[test]
fn four_team_tournament_runs_to_a_champion() {
    let store = MemoryStore::new();
    let t = tournament_with_teams(&store, 4);
    let r1 = build(&store, t.id, 21);
    decide_pending(&store, t.id, 2, 1);

    let Advance::NextRound { round, matches } = advance(&store, t.id).unwrap() else {
        panic!("expected a second round");
    };
    assert_eq!(round, 2);
    assert_eq!(matches.len(), 1);
    let final_match = &matches[0];
    assert_eq!(final_match.key, MatchKey::new(2, 1));
    assert_eq!(final_match.round_label, "Round 2");
    assert_eq!(final_match.side_a, r1.matches[0].side_a);
    assert_eq!(final_match.side_b, r1.matches[1].side_a);
    assert_eq!(final_match.next_match, None);

    record(&store, t.id, "R2_P1", 0, 7).unwrap();
    let outcome = advance(&store, t.id).unwrap();
    let champion = r1.matches[1].side_a.clone();
    assert_eq!(outcome, Advance::Finished { champion: champion.clone() });
    assert_eq!(
        outcome.to_string(),
        format!("TOURNAMENT FINISHED! The champion is: {champion}")
    );

    let stored = tournament(&store, t.id).unwrap();
    assert_eq!(stored.champion.as_deref(), Some(champion.as_str()));
    assert!(stored.is_finished());

    let err = advance(&store, t.id).unwrap_err();
    assert!(matches!(err, TournamentError::AlreadyFinished { champion: c } if c == champion));
    assert_eq!(all_matches(&store, t.id).len(), 3);
}

#[test]
fn eight_team_rounds_halve_and_link_up() {
    let store = MemoryStore::new();
    let t = tournament_with_teams(&store, 8);
    build(&store, t.id, 8);

    let mut sizes = vec![4];
    loop {
        decide_pending(&store, t.id, 1, 0);
        match advance(&store, t.id).unwrap() {
            Advance::NextRound { round, matches } => {
                assert_eq!(round as usize, sizes.len() + 1);
                sizes.push(matches.len());
            }
            Advance::Finished { .. } => break,
        }
    }
    assert_eq!(sizes, vec![4, 2, 1]);

    let matches = all_matches(&store, t.id);
    assert_eq!(matches.len(), 7);
    let by_key: BTreeMap<MatchKey, &GameMatch> = matches.iter().map(|m| (m.key, m)).collect();
    for m in &matches {
        match m.next_match {
            Some(next) => {
                let parent = by_key[&next];
                assert_eq!(next.round(), m.round() + 1);
                let winner = m.winner.as_deref().unwrap();
                assert!(parent.side_a == winner || parent.side_b == winner);
            }
            None => assert_eq!(m.key, MatchKey::new(3, 1)),
        }
    }

    let stored = tournament(&store, t.id).unwrap();
    assert!(matches!(
        derive_state(&stored, &matches),
        TournamentState::Finished { .. }
    ));
}

#[test]
fn malformed_bracket_is_reported_and_nothing_written() {
    let store = MemoryStore::new();
    let t = tournament_with_teams(&store, 4);

    // Two decided first-round matches, neither linking forward.
    with_unit_of_work(&store, |uow| {
        let mut a = GameMatch::new(t.id, MatchKey::new(1, 1), "Team 0", "Team 1", None);
        let mut b = GameMatch::new(t.id, MatchKey::new(1, 2), "Team 2", "Team 3", None);
        a.winner = Some("Team 0".into());
        b.winner = Some("Team 3".into());
        uow.insert_matches(&[a, b])?;
        Ok(())
    })
    .unwrap();

    let err = advance(&store, t.id).unwrap_err();
    assert!(matches!(err, TournamentError::BracketIntegrity(_)));
    assert_eq!(err.kind(), ErrorKind::Integrity);
    assert_eq!(all_matches(&store, t.id).len(), 2);
    assert_eq!(tournament(&store, t.id).unwrap().champion, None);
}

#[test]
fn overfed_next_match_is_an_integrity_error() {
    let store = MemoryStore::new();
    let t = tournament_with_teams(&store, 8);

    with_unit_of_work(&store, |uow| {
        let links = [1, 1, 1, 2];
        let batch: Vec<GameMatch> = links
            .iter()
            .enumerate()
            .map(|(i, target)| {
                let position = i as u32 + 1;
                let mut m = GameMatch::new(
                    t.id,
                    MatchKey::new(1, position),
                    format!("Team {}", 2 * i),
                    format!("Team {}", 2 * i + 1),
                    Some(MatchKey::new(2, *target)),
                );
                m.winner = Some(m.side_a.clone());
                m
            })
            .collect();
        uow.insert_matches(&batch)?;
        Ok(())
    })
    .unwrap();

    assert!(matches!(
        advance(&store, t.id),
        Err(TournamentError::BracketIntegrity(_))
    ));
    assert_eq!(all_matches(&store, t.id).len(), 4);
}
