//! End-to-end bracket runs against a SQLite file
//!
//! Covers the round progression 16 → 8 → 4 → 2 → 1, one durable record per
//! decided matchup, schema idempotence across restarts, and reset leaving
//! stored rows alone.

use bracket_common::bracket::{dispatch, BracketEvent, EntrantList, Phase};
use bracket_common::db::{PersistenceGateway, PredictionDriver, SqliteDriver};
use bracket_common::{BracketSession, BracketView};
use std::path::Path;
use std::sync::Arc;

async fn open_gateway(db_path: &Path) -> PersistenceGateway {
    let driver = SqliteDriver::open(db_path).await.expect("Should open database");
    let gateway = PersistenceGateway::new(Arc::new(driver));
    gateway.ensure_schema().await.expect("Should ensure schema");
    gateway
}

async fn start(gateway: &PersistenceGateway, username: &str) -> BracketSession {
    let mut session = BracketSession::new(EntrantList::default()).unwrap();
    dispatch(
        &mut session,
        gateway,
        BracketEvent::UsernameSubmitted {
            username: username.to_string(),
        },
    )
    .await
    .unwrap();
    session
}

/// Pick the second-listed entrant everywhere, then advance
async fn play_round(session: &mut BracketSession, gateway: &PersistenceGateway) -> BracketView {
    let picks: Vec<(usize, String)> = session
        .view()
        .matchups
        .into_iter()
        .map(|m| (m.index, m.second.to_string()))
        .collect();

    for (matchup, winner) in picks {
        dispatch(session, gateway, BracketEvent::WinnerSelected { matchup, winner })
            .await
            .unwrap();
    }
    dispatch(session, gateway, BracketEvent::AdvanceRequested)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_full_bracket_on_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = open_gateway(&dir.path().join("predictions.db")).await;
    let mut session = start(&gateway, "mia").await;

    let mut matchup_counts = Vec::new();
    while session.phase() == Phase::CollectingRound {
        matchup_counts.push(session.matchups().len());
        play_round(&mut session, &gateway).await;
    }

    assert_eq!(matchup_counts, vec![8, 4, 2, 1]);
    assert_eq!(session.all_predictions().len(), 15);
    // Second-listed picks: 16 beats 1, then 9 beats 16, ...
    assert_eq!(
        session.champion().map(|c| c.as_str()),
        Some("15 - Nancy Kerrigan")
    );

    let rows = gateway.history(Some("mia")).await.unwrap();
    assert_eq!(rows.len(), 15);
    let per_round: Vec<usize> = (1..=4)
        .map(|round| rows.iter().filter(|r| r.round == round).count())
        .collect();
    assert_eq!(per_round, vec![8, 4, 2, 1]);

    for row in &rows {
        let (a, b) = row.match_label.split_once(" vs ").expect("label format");
        assert!(row.winner == a || row.winner == b);
    }
}

#[tokio::test]
async fn test_schema_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("predictions.db");

    {
        let gateway = open_gateway(&db_path).await;
        let mut session = start(&gateway, "ned").await;
        play_round(&mut session, &gateway).await;
    }

    let driver = SqliteDriver::open(&db_path).await.unwrap();
    assert!(driver.table_exists().await.unwrap());

    let gateway = PersistenceGateway::new(Arc::new(driver));
    gateway.ensure_schema().await.unwrap();
    gateway.ensure_schema().await.unwrap();

    assert_eq!(gateway.history(Some("ned")).await.unwrap().len(), 8);
}

#[tokio::test]
async fn test_reset_after_champion_keeps_rows() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = open_gateway(&dir.path().join("predictions.db")).await;
    let mut session = start(&gateway, "ola").await;

    while session.phase() == Phase::CollectingRound {
        play_round(&mut session, &gateway).await;
    }

    let view = dispatch(&mut session, &gateway, BracketEvent::ResetRequested)
        .await
        .unwrap();

    assert_eq!(view.phase, Phase::CollectingRound);
    assert_eq!(view.round, 1);
    assert_eq!(view.matchups.len(), 8);
    assert_eq!(view.matchups[0].first.as_str(), "01 - Tom Brady");
    assert!(view.all_predictions.is_empty());
    assert!(view.champion.is_none());

    assert_eq!(gateway.history(Some("ola")).await.unwrap().len(), 15);
}

#[tokio::test]
async fn test_sessions_for_different_users_do_not_interfere() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = open_gateway(&dir.path().join("predictions.db")).await;

    let mut first = start(&gateway, "pat").await;
    let mut second = start(&gateway, "quinn").await;

    play_round(&mut first, &gateway).await;
    play_round(&mut second, &gateway).await;
    play_round(&mut second, &gateway).await;

    assert_eq!(first.round(), 2);
    assert_eq!(second.round(), 3);
    assert_eq!(gateway.history(Some("pat")).await.unwrap().len(), 8);
    assert_eq!(gateway.history(Some("quinn")).await.unwrap().len(), 12);
}
