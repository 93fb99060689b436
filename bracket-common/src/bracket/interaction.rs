//! Event dispatch for one bracket session
//!
//! The UI sends discrete [`BracketEvent`]s and renders the [`BracketView`]
//! it gets back. Each event runs to completion before the next one for the
//! same session is processed; callers serialize access to the session.

use super::session::{BracketSession, BracketView};
use crate::db::PersistenceGateway;
use crate::{time, Result};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// User actions accepted by a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BracketEvent {
    UsernameSubmitted { username: String },
    WinnerSelected { matchup: usize, winner: String },
    AdvanceRequested,
    ResetRequested,
}

/// Apply one event to a session and return the resulting view
///
/// `AdvanceRequested` persists the complete round before the session moves
/// on. If the write fails the session is left exactly as it was, so the user
/// can retry the advance. An incomplete round makes advance a no-op.
pub async fn dispatch(
    session: &mut BracketSession,
    gateway: &PersistenceGateway,
    event: BracketEvent,
) -> Result<BracketView> {
    match event {
        BracketEvent::UsernameSubmitted { username } => {
            session.submit_username(&username)?;
            info!("Bracket started for '{}'", username.trim());
        }
        BracketEvent::WinnerSelected { matchup, winner } => {
            session.select_winner(matchup, &winner)?;
        }
        BracketEvent::AdvanceRequested => {
            if let Some(decision) = session.pending_round(time::now())? {
                let round = decision.round();
                if let Err(e) = gateway.record(decision.records()).await {
                    error!(
                        "Round {} for '{}' not saved: {}",
                        round,
                        session.username().unwrap_or_default(),
                        e
                    );
                    return Err(e);
                }
                session.apply_decision(decision)?;

                match session.champion() {
                    Some(champion) => info!(
                        "'{}' completed the bracket, champion: {}",
                        session.username().unwrap_or_default(),
                        champion
                    ),
                    None => info!(
                        "'{}' saved round {}, now in round {}",
                        session.username().unwrap_or_default(),
                        round,
                        session.round()
                    ),
                }
            }
        }
        BracketEvent::ResetRequested => {
            session.reset()?;
            info!(
                "Bracket reset to round 1 for '{}'",
                session.username().unwrap_or_default()
            );
        }
    }

    Ok(session.view())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::{EntrantList, Phase};
    use crate::db::MemoryDriver;
    use crate::Error;
    use std::sync::Arc;

    async fn setup() -> (BracketSession, PersistenceGateway, MemoryDriver) {
        let driver = MemoryDriver::new();
        let gateway = PersistenceGateway::new(Arc::new(driver.clone()));
        gateway.ensure_schema().await.unwrap();
        let session = BracketSession::new(EntrantList::default()).unwrap();
        (session, gateway, driver)
    }

    async fn send(
        session: &mut BracketSession,
        gateway: &PersistenceGateway,
        event: BracketEvent,
    ) -> Result<BracketView> {
        dispatch(session, gateway, event).await
    }

    async fn pick_first_and_advance(
        session: &mut BracketSession,
        gateway: &PersistenceGateway,
    ) -> Result<BracketView> {
        let picks: Vec<(usize, String)> = session
            .view()
            .matchups
            .iter()
            .map(|m| (m.index, m.first.to_string()))
            .collect();
        for (matchup, winner) in picks {
            send(session, gateway, BracketEvent::WinnerSelected { matchup, winner }).await?;
        }
        send(session, gateway, BracketEvent::AdvanceRequested).await
    }

    #[test]
    fn test_event_json_shape() {
        let event: BracketEvent = serde_json::from_str(
            r#"{"type":"winner_selected","matchup":3,"winner":"13 - John Cena"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            BracketEvent::WinnerSelected {
                matchup: 3,
                winner: "13 - John Cena".to_string()
            }
        );

        let advance: BracketEvent = serde_json::from_str(r#"{"type":"advance_requested"}"#).unwrap();
        assert_eq!(advance, BracketEvent::AdvanceRequested);
    }

    #[tokio::test]
    async fn test_advance_with_incomplete_round_is_noop() {
        let (mut session, gateway, driver) = setup().await;
        send(&mut session, &gateway, BracketEvent::UsernameSubmitted { username: "dana".into() })
            .await
            .unwrap();
        send(
            &mut session,
            &gateway,
            BracketEvent::WinnerSelected { matchup: 0, winner: "01 - Tom Brady".into() },
        )
        .await
        .unwrap();

        let view = send(&mut session, &gateway, BracketEvent::AdvanceRequested).await.unwrap();
        assert_eq!(view.round, 1);
        assert_eq!(driver.row_count(), 0);
    }

    #[tokio::test]
    async fn test_full_bracket_persists_fifteen_records() {
        let (mut session, gateway, driver) = setup().await;
        send(&mut session, &gateway, BracketEvent::UsernameSubmitted { username: "dana".into() })
            .await
            .unwrap();

        let mut expected_rows = 0;
        for matchups in [8, 4, 2] {
            let view = pick_first_and_advance(&mut session, &gateway).await.unwrap();
            expected_rows += matchups;
            assert_eq!(driver.row_count(), expected_rows);
            assert_eq!(view.phase, Phase::CollectingRound);
        }

        let view = pick_first_and_advance(&mut session, &gateway).await.unwrap();
        assert_eq!(driver.row_count(), 15);
        assert_eq!(view.phase, Phase::Complete);
        assert_eq!(view.champion.as_ref().map(|c| c.as_str()), Some("01 - Tom Brady"));
        assert_eq!(view.all_predictions.len(), 15);

        // The final round is written exactly once
        let finals: Vec<_> = driver.rows().into_iter().filter(|r| r.round == 4).collect();
        assert_eq!(finals.len(), 1);
        assert_eq!(finals[0].match_label, "01 - Tom Brady vs 06 - Emily Dickinson");
    }

    #[tokio::test]
    async fn test_failed_persistence_keeps_round() {
        let (mut session, gateway, driver) = setup().await;
        send(&mut session, &gateway, BracketEvent::UsernameSubmitted { username: "dana".into() })
            .await
            .unwrap();

        driver.fail_commits(true);
        let err = pick_first_and_advance(&mut session, &gateway).await.unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
        assert_eq!(session.round(), 1);
        assert_eq!(session.winners().len(), 8);
        assert!(session.all_predictions().is_empty());
        assert_eq!(driver.row_count(), 0);

        // Retrying the advance succeeds once the store recovers
        driver.fail_commits(false);
        let view = send(&mut session, &gateway, BracketEvent::AdvanceRequested).await.unwrap();
        assert_eq!(view.round, 2);
        assert_eq!(driver.row_count(), 8);
    }

    #[tokio::test]
    async fn test_reset_keeps_durable_records() {
        let (mut session, gateway, driver) = setup().await;
        send(&mut session, &gateway, BracketEvent::UsernameSubmitted { username: "dana".into() })
            .await
            .unwrap();
        pick_first_and_advance(&mut session, &gateway).await.unwrap();

        let view = send(&mut session, &gateway, BracketEvent::ResetRequested).await.unwrap();
        assert_eq!(view.round, 1);
        assert_eq!(view.matchups.len(), 8);
        assert!(view.all_predictions.is_empty());
        assert_eq!(driver.row_count(), 8);
    }

    #[tokio::test]
    async fn test_rejected_selection_surfaces_error() {
        let (mut session, gateway, _driver) = setup().await;
        send(&mut session, &gateway, BracketEvent::UsernameSubmitted { username: "dana".into() })
            .await
            .unwrap();

        let err = send(
            &mut session,
            &gateway,
            BracketEvent::WinnerSelected { matchup: 0, winner: "15 - Nancy Kerrigan".into() },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Selection(_)));
        assert!(session.winners().is_empty());
    }
}
