//! Integration tests for result entry and pending matches.

mod common;

use bracket_tournament_web::{
    pending_matches, with_unit_of_work, ErrorKind, MatchKey, MemoryStore, Score, TournamentError,
};
use common::{advance, all_matches, build, decide_pending, record, tournament_with_teams};

#[test]
fn higher_score_wins() {
    let store = MemoryStore::new();
    let t = tournament_with_teams(&store, 4);
    let built = build(&store, t.id, 2);
    let (p1, p2) = (&built.matches[0], &built.matches[1]);

    let recorded = record(&store, t.id, "R1_P1", 3, 1).unwrap();
    assert_eq!(recorded.game.winner.as_deref(), Some(p1.side_a.as_str()));
    assert_eq!(recorded.game.score, Some(Score { a: 3, b: 1 }));
    assert_eq!(
        recorded.to_string(),
        format!(
            "Result recorded for {} vs {}. Score: 3-1. Winner: {}.",
            p1.side_a, p1.side_b, p1.side_a
        )
    );

    let recorded = record(&store, t.id, "R1_P2", 0, 2).unwrap();
    assert_eq!(recorded.game.winner.as_deref(), Some(p2.side_b.as_str()));

    let stored = all_matches(&store, t.id);
    assert_eq!(stored[0].winner.as_deref(), Some(p1.side_a.as_str()));
    assert_eq!(stored[1].winner.as_deref(), Some(p2.side_b.as_str()));
}

#[test]
fn ties_and_negative_scores_are_rejected() {
    let store = MemoryStore::new();
    let t = tournament_with_teams(&store, 4);
    build(&store, t.id, 2);

    let err = record(&store, t.id, "R1_P1", 2, 2).unwrap_err();
    assert!(matches!(err, TournamentError::TieNotAllowed));
    assert_eq!(err.kind(), ErrorKind::Validation);

    for (a, b) in [(-1, 3), (3, -1), (-2, -2)] {
        let err = record(&store, t.id, "R1_P1", a, b).unwrap_err();
        assert!(matches!(err, TournamentError::NegativeScore), "{a}-{b}");
    }

    assert!(all_matches(&store, t.id).iter().all(|m| m.winner.is_none() && m.score.is_none()));
}

#[test]
fn unknown_match_wins_over_bad_scores() {
    let store = MemoryStore::new();
    let t = tournament_with_teams(&store, 4);
    build(&store, t.id, 2);
    for id in ["R9_P9", "R1_P3", "R2_P1", "garbage", ""] {
        let err = record(&store, t.id, id, -1, -1).unwrap_err();
        assert!(matches!(err, TournamentError::MatchNotFound(_)), "{id:?}: {err}");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}

#[test]
fn result_can_be_corrected_before_advancing() {
    let store = MemoryStore::new();
    let t = tournament_with_teams(&store, 4);
    let built = build(&store, t.id, 4);
    record(&store, t.id, "R1_P1", 3, 1).unwrap();
    let corrected = record(&store, t.id, "R1_P1", 1, 5).unwrap();
    assert_eq!(corrected.game.winner.as_deref(), Some(built.matches[0].side_b.as_str()));
    assert_eq!(corrected.game.score, Some(Score { a: 1, b: 5 }));
}

#[test]
fn result_is_locked_once_the_round_is_advanced() {
    let store = MemoryStore::new();
    let t = tournament_with_teams(&store, 4);
    build(&store, t.id, 4);
    decide_pending(&store, t.id, 3, 1);
    advance(&store, t.id).unwrap();

    let err = record(&store, t.id, "R1_P1", 0, 4).unwrap_err();
    assert!(matches!(err, TournamentError::ResultLocked(k) if k == MatchKey::new(1, 1)));
    assert_eq!(err.kind(), ErrorKind::Precondition);

    // The final can still be corrected until the champion is declared.
    record(&store, t.id, "R2_P1", 2, 1).unwrap();
    record(&store, t.id, "R2_P1", 1, 2).unwrap();
    advance(&store, t.id).unwrap();
    assert!(matches!(
        record(&store, t.id, "R2_P1", 5, 0),
        Err(TournamentError::ResultLocked(_))
    ));
}

#[test]
fn pending_lists_undecided_matches_in_order() {
    let store = MemoryStore::new();
    let t = tournament_with_teams(&store, 8);
    build(&store, t.id, 8);
    record(&store, t.id, "R1_P2", 1, 0).unwrap();
    record(&store, t.id, "R1_P4", 0, 1).unwrap();

    let pending = with_unit_of_work(&store, |uow| pending_matches(uow, t.id)).unwrap();
    let keys: Vec<String> = pending.iter().map(|m| m.key.to_string()).collect();
    assert_eq!(keys, vec!["R1_P1", "R1_P3"]);
}
