//! Controller behaviour against the in-process gateway.

use std::sync::Arc;
use std::time::Duration;

use eod_controller::{
    await_load, spawn_controller, ControllerConfig, ControllerError, ControllerEvent,
    ControllerHandle, LoadKind,
};
use eod_core::{Row, SecuritySelection};
use eod_gateway::{GatewayOperation, HistoryQuery, MockGateway, SecurityDefinition};
use rust_decimal_macros::dec;
use tokio::sync::broadcast;

const WAIT: Duration = Duration::from_secs(2);

fn row(pairs: &[(&str, &str)]) -> Row {
    Row::from_pairs(pairs.iter().map(|(k, v)| (*k, Some(*v))))
}

fn engines() -> Vec<Row> {
    vec![
        row(&[("name", "stock"), ("title", "Фондовый рынок")]),
        row(&[("name", "currency"), ("title", "Валютный рынок")]),
    ]
}

fn markets(names: &[&str]) -> Vec<Row> {
    names
        .iter()
        .map(|n| row(&[("NAME", *n), ("title", *n)]))
        .collect()
}

fn stock_gateway() -> Arc<MockGateway> {
    let gateway = Arc::new(MockGateway::new());
    gateway
        .with_engines(engines())
        .with_markets("stock", markets(&["shares", "bonds"]))
        .with_markets("currency", markets(&["selt"]))
        .with_securities(
            "stock",
            "shares",
            vec![
                row(&[("SECID", "SBER"), ("BOARDID", "TQBR")]),
                row(&[("SECID", "SBER"), ("BOARDID", "SMAL")]),
                row(&[("SECID", "GAZP"), ("BOARDID", "TQBR")]),
            ],
        );
    gateway
}

fn spawn(gateway: &Arc<MockGateway>) -> ControllerHandle {
    let (handle, _join) = spawn_controller(gateway.clone(), &ControllerConfig::default());
    handle
}

async fn wait_for(
    events: &mut broadcast::Receiver<ControllerEvent>,
    kind: LoadKind,
) -> Result<usize, ControllerError> {
    tokio::time::timeout(WAIT, await_load(events, kind))
        .await
        .expect("timed out waiting for load")
}

async fn wait_discarded(events: &mut broadcast::Receiver<ControllerEvent>, kind: LoadKind) {
    let discarded = async {
        loop {
            if let Ok(ControllerEvent::Discarded { kind: k }) = events.recv().await {
                if k == kind {
                    break;
                }
            }
        }
    };
    tokio::time::timeout(WAIT, discarded)
        .await
        .expect("timed out waiting for discard");
}

fn codes(options: &[eod_core::SelectOption]) -> Vec<&str> {
    options.iter().map(|o| o.code.as_str()).collect()
}

#[tokio::test]
async fn test_select_engine_clears_downstream_before_fetch_resolves() {
    let gateway = stock_gateway();
    let handle = spawn(&gateway);
    let mut events = handle.events();

    handle.initialize().await.unwrap();
    handle.select_engine("stock").await.unwrap();
    wait_for(&mut events, LoadKind::Markets).await.unwrap();
    handle.select_market("shares").await.unwrap();
    wait_for(&mut events, LoadKind::Securities).await.unwrap();
    assert!(!handle.snapshot().securities.is_empty());

    gateway.hold(GatewayOperation::Markets, "currency");
    handle.select_engine("currency").await.unwrap();

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.selection.engine.as_deref(), Some("currency"));
    assert_eq!(snapshot.selection.market, None);
    assert!(snapshot.markets.is_empty());
    assert!(snapshot.securities.is_empty());
    assert!(snapshot.boards().is_empty());
    assert!(snapshot.history.is_empty());
    assert!(snapshot.description.is_empty());

    gateway.release(GatewayOperation::Markets, "currency");
    assert_eq!(wait_for(&mut events, LoadKind::Markets).await.unwrap(), 1);
    assert_eq!(codes(&handle.snapshot().markets), vec!["selt"]);

    handle.shutdown().await;
}

#[tokio::test]
async fn test_late_market_list_of_previous_engine_is_discarded() {
    let gateway = stock_gateway();
    let handle = spawn(&gateway);
    let mut events = handle.events();

    gateway.hold(GatewayOperation::Markets, "stock");
    handle.select_engine("stock").await.unwrap();
    handle.select_engine("currency").await.unwrap();

    wait_for(&mut events, LoadKind::Markets).await.unwrap();
    assert_eq!(codes(&handle.snapshot().markets), vec!["selt"]);

    gateway.release(GatewayOperation::Markets, "stock");
    wait_discarded(&mut events, LoadKind::Markets).await;

    let snapshot = handle.snapshot();
    assert_eq!(codes(&snapshot.markets), vec!["selt"]);
    assert_eq!(snapshot.selection.engine.as_deref(), Some("currency"));

    handle.shutdown().await;
}

#[tokio::test]
async fn test_refresh_all_is_idempotent() {
    let gateway = stock_gateway();
    let handle = spawn(&gateway);

    handle.initialize().await.unwrap();
    handle.select_engine("stock").await.unwrap();

    handle.refresh_all().await.unwrap();
    let first = handle.snapshot();
    handle.refresh_all().await.unwrap();
    let second = handle.snapshot();

    assert_eq!(first.engines, second.engines);
    assert_eq!(codes(&second.engines), vec!["stock", "currency"]);
    assert_eq!(second.selection.engine, None);
    assert!(second.markets.is_empty());

    handle.shutdown().await;
}

#[tokio::test]
async fn test_security_list_is_deduplicated() {
    let gateway = stock_gateway();
    let handle = spawn(&gateway);
    let mut events = handle.events();

    handle.select_engine("stock").await.unwrap();
    wait_for(&mut events, LoadKind::Markets).await.unwrap();
    handle.select_market("shares").await.unwrap();
    assert_eq!(wait_for(&mut events, LoadKind::Securities).await.unwrap(), 2);

    let snapshot = handle.snapshot();
    let mut identities: Vec<_> = snapshot.securities.iter().map(|o| o.identity()).collect();
    identities.sort();
    identities.dedup();
    assert_eq!(identities.len(), snapshot.securities.len());
    assert_eq!(codes(&snapshot.securities), vec!["SBER", "GAZP"]);

    handle.shutdown().await;
}

#[tokio::test]
async fn test_market_fetch_failure_leaves_list_empty_and_reports() {
    let gateway = stock_gateway();
    gateway.fail(GatewayOperation::Markets, "stock", "HTTP 502");
    let handle = spawn(&gateway);
    let mut events = handle.events();

    handle.select_engine("stock").await.unwrap();
    let err = wait_for(&mut events, LoadKind::Markets).await.unwrap_err();
    assert!(matches!(err, ControllerError::LoadFailed { kind: LoadKind::Markets, .. }));

    let snapshot = handle.snapshot();
    assert!(snapshot.markets.is_empty());
    assert!(snapshot.last_error.as_deref().is_some_and(|e| e.contains("HTTP 502")));

    handle.shutdown().await;
}

#[tokio::test]
async fn test_free_text_security_loads_description_and_boards() {
    let gateway = stock_gateway();
    gateway.with_definition(
        "SBER",
        SecurityDefinition {
            description: vec![
                row(&[("name", "SECID"), ("value", "SBER")]),
                row(&[("name", "NAME"), ("value", "Сбербанк")]),
            ],
            boards: vec![row(&[("boardid", "TQBR")]), row(&[("boardid", "SMAL")])],
        },
    );
    let handle = spawn(&gateway);
    let mut events = handle.events();

    handle
        .select_security(SecuritySelection::FreeText("SBER Сбербанк ао".to_string()))
        .await
        .unwrap();
    assert_eq!(wait_for(&mut events, LoadKind::Description).await.unwrap(), 2);

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.free_text(), Some("SBER Сбербанк ао"));
    assert_eq!(snapshot.description.text, "SECID: SBER\nNAME: Сбербанк");
    assert_eq!(codes(snapshot.boards()), vec!["TQBR", "SMAL"]);
    assert_eq!(gateway.calls(), vec!["definition:SBER"]);

    handle.shutdown().await;
}

#[tokio::test]
async fn test_description_failure_is_silent() {
    let gateway = stock_gateway();
    gateway.fail(GatewayOperation::Definition, "NOPE", "HTTP 404");
    let handle = spawn(&gateway);
    let mut events = handle.events();

    handle
        .select_security(SecuritySelection::FreeText("NOPE".to_string()))
        .await
        .unwrap();
    assert!(wait_for(&mut events, LoadKind::Description).await.is_err());

    let snapshot = handle.snapshot();
    assert!(snapshot.description.is_empty());
    assert_eq!(snapshot.last_error, None);

    handle.shutdown().await;
}

#[tokio::test]
async fn test_blank_free_text_does_not_fetch() {
    let gateway = stock_gateway();
    let handle = spawn(&gateway);

    handle
        .select_security(SecuritySelection::FreeText("   ".to_string()))
        .await
        .unwrap();

    assert!(handle.snapshot().description.is_empty());
    assert_eq!(gateway.call_count(GatewayOperation::Definition), 0);

    handle.shutdown().await;
}

#[tokio::test]
async fn test_fetch_history_values_bonds() {
    let gateway = stock_gateway();
    let query = HistoryQuery {
        engine: "stock".to_string(),
        market: "bonds".to_string(),
        board: Some("TQOB".to_string()),
        symbol: "SU26238RMFS4".to_string(),
    };
    gateway
        .with_securities("stock", "bonds", vec![row(&[("SECID", "SU26238RMFS4")])])
        .with_definition("SU26238RMFS4", SecurityDefinition::default())
        .with_history(
            &query,
            vec![
                row(&[
                    ("TRADEDATE", "2023-01-02"),
                    ("BOARDID", "TQOB"),
                    ("CLOSE", "98.5"),
                    ("FACEVALUE", "1000"),
                    ("ACCINT", "2.3"),
                ]),
                Row::from_pairs([
                    ("TRADEDATE", Some("2023-01-03")),
                    ("BOARDID", Some("TQOB")),
                    ("CLOSE", None),
                ]),
            ],
        );
    let handle = spawn(&gateway);
    let mut events = handle.events();

    handle.select_engine("stock").await.unwrap();
    wait_for(&mut events, LoadKind::Markets).await.unwrap();
    handle.select_market("bonds").await.unwrap();
    wait_for(&mut events, LoadKind::Securities).await.unwrap();
    handle
        .select_security(SecuritySelection::Picked("SU26238RMFS4".to_string()))
        .await
        .unwrap();
    handle.select_board("TQOB").await.unwrap();

    assert_eq!(handle.fetch_history().await.unwrap(), 1);

    let snapshot = handle.snapshot();
    let point = snapshot.history.first().unwrap();
    assert_eq!(point.value, dec!(987.3));
    assert_eq!(point.board_code, "TQOB");
    assert_eq!(point.date_key(), 20230102);

    handle.shutdown().await;
}

#[tokio::test]
async fn test_history_parse_error_fails_whole_fetch_and_clears() {
    let gateway = stock_gateway();
    let good = HistoryQuery {
        engine: "stock".to_string(),
        market: "shares".to_string(),
        board: None,
        symbol: "SBER".to_string(),
    };
    let bad = HistoryQuery {
        board: Some("TQBR".to_string()),
        ..good.clone()
    };
    gateway
        .with_definition("SBER", SecurityDefinition::default())
        .with_history(
            &good,
            vec![row(&[
                ("TRADEDATE", "2023-01-02"),
                ("BOARDID", "TQBR"),
                ("CLOSE", "100.5"),
            ])],
        )
        .with_history(
            &bad,
            vec![
                row(&[("TRADEDATE", "2023-01-02"), ("BOARDID", "TQBR"), ("CLOSE", "100.5")]),
                row(&[("TRADEDATE", "2023-01-03"), ("BOARDID", "TQBR"), ("CLOSE", "1,01")]),
            ],
        );
    let handle = spawn(&gateway);
    let mut events = handle.events();

    handle.select_engine("stock").await.unwrap();
    wait_for(&mut events, LoadKind::Markets).await.unwrap();
    handle.select_market("shares").await.unwrap();
    wait_for(&mut events, LoadKind::Securities).await.unwrap();
    handle
        .select_security(SecuritySelection::Picked("SBER".to_string()))
        .await
        .unwrap();

    assert_eq!(handle.fetch_history().await.unwrap(), 1);
    assert_eq!(handle.snapshot().history.len(), 1);

    handle.select_board("TQBR").await.unwrap();
    // Board selection keeps the displayed history.
    assert_eq!(handle.snapshot().history.len(), 1);

    let err = handle.fetch_history().await.unwrap_err();
    assert!(matches!(err, ControllerError::Core(_)));

    let snapshot = handle.snapshot();
    assert!(snapshot.history.is_empty());
    assert!(snapshot.last_error.is_some());

    handle.shutdown().await;
}

#[tokio::test]
async fn test_fetch_history_requires_engine_market_and_symbol() {
    let gateway = stock_gateway();
    let handle = spawn(&gateway);

    let err = handle.fetch_history().await.unwrap_err();
    assert!(matches!(err, ControllerError::Validation(ref m) if m.contains("engine")));

    handle.select_engine("stock").await.unwrap();
    handle.select_market("shares").await.unwrap();
    let err = handle.fetch_history().await.unwrap_err();
    assert!(matches!(err, ControllerError::Validation(ref m) if m.contains("security")));

    assert_eq!(gateway.call_count(GatewayOperation::History), 0);

    handle.shutdown().await;
}

#[tokio::test]
async fn test_board_change_supersedes_in_flight_history() {
    let gateway = stock_gateway();
    let query = HistoryQuery {
        engine: "stock".to_string(),
        market: "shares".to_string(),
        board: None,
        symbol: "SBER".to_string(),
    };
    gateway
        .with_definition("SBER", SecurityDefinition::default())
        .with_history(
            &query,
            vec![row(&[("TRADEDATE", "2023-01-02"), ("BOARDID", "TQBR"), ("CLOSE", "1")])],
        )
        .hold(GatewayOperation::History, &query.key());
    let handle = spawn(&gateway);

    handle.select_engine("stock").await.unwrap();
    handle.select_market("shares").await.unwrap();
    handle
        .select_security(SecuritySelection::Picked("SBER".to_string()))
        .await
        .unwrap();

    let pending = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.fetch_history().await })
    };

    // Let the history call reach the gateway before changing the board.
    tokio::time::timeout(WAIT, async {
        while gateway.call_count(GatewayOperation::History) == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    handle.select_board("TQBR").await.unwrap();
    gateway.release(GatewayOperation::History, &query.key());

    let outcome = pending.await.unwrap();
    assert!(matches!(outcome, Err(ControllerError::Superseded)));
    assert!(handle.snapshot().history.is_empty());

    handle.shutdown().await;
}

#[tokio::test]
async fn test_late_security_list_of_previous_market_is_discarded() {
    let gateway = stock_gateway();
    gateway.with_securities("stock", "bonds", vec![row(&[("SECID", "SU26238RMFS4")])]);
    let handle = spawn(&gateway);
    let mut events = handle.events();

    handle.select_engine("stock").await.unwrap();
    wait_for(&mut events, LoadKind::Markets).await.unwrap();

    gateway.hold(GatewayOperation::Securities, "stock/shares");
    handle.select_market("shares").await.unwrap();
    handle.select_market("bonds").await.unwrap();

    assert_eq!(wait_for(&mut events, LoadKind::Securities).await.unwrap(), 1);
    assert_eq!(codes(&handle.snapshot().securities), vec!["SU26238RMFS4"]);

    gateway.release(GatewayOperation::Securities, "stock/shares");
    wait_discarded(&mut events, LoadKind::Securities).await;

    let snapshot = handle.snapshot();
    assert_eq!(codes(&snapshot.securities), vec!["SU26238RMFS4"]);
    assert_eq!(snapshot.selection.market.as_deref(), Some("bonds"));

    handle.shutdown().await;
}

#[tokio::test]
async fn test_late_description_of_previous_query_is_discarded() {
    let gateway = stock_gateway();
    gateway
        .with_definition(
            "SBER",
            SecurityDefinition {
                description: vec![row(&[("name", "SECID"), ("value", "SBER")])],
                boards: vec![row(&[("boardid", "TQBR")])],
            },
        )
        .with_definition(
            "GAZP",
            SecurityDefinition {
                description: vec![row(&[("name", "SECID"), ("value", "GAZP")])],
                boards: vec![row(&[("boardid", "SMAL")])],
            },
        )
        .hold(GatewayOperation::Definition, "SBER");
    let handle = spawn(&gateway);
    let mut events = handle.events();

    handle
        .select_security(SecuritySelection::FreeText("SBER".to_string()))
        .await
        .unwrap();
    handle
        .select_security(SecuritySelection::FreeText("GAZP Газпром".to_string()))
        .await
        .unwrap();
    wait_for(&mut events, LoadKind::Description).await.unwrap();

    gateway.release(GatewayOperation::Definition, "SBER");
    wait_discarded(&mut events, LoadKind::Description).await;

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.description.text, "SECID: GAZP");
    assert_eq!(codes(snapshot.boards()), vec!["SMAL"]);
    assert_eq!(snapshot.free_text(), Some("GAZP Газпром"));

    handle.shutdown().await;
}

#[tokio::test]
async fn test_history_overflow_fails_fetch_and_controller_keeps_running() {
    let gateway = stock_gateway();
    let query = HistoryQuery {
        engine: "stock".to_string(),
        market: "bonds".to_string(),
        board: None,
        symbol: "SU26238RMFS4".to_string(),
    };
    gateway
        .with_securities("stock", "bonds", vec![row(&[("SECID", "SU26238RMFS4")])])
        .with_definition("SU26238RMFS4", SecurityDefinition::default())
        .with_history(
            &query,
            vec![row(&[
                ("TRADEDATE", "2023-01-02"),
                ("BOARDID", "TQOB"),
                ("CLOSE", "1000000000000000"),
                ("FACEVALUE", "1000000000000000"),
                ("ACCINT", "0"),
            ])],
        );
    let (handle, join) = spawn_controller(gateway.clone(), &ControllerConfig::default());
    let mut events = handle.events();

    handle.select_engine("stock").await.unwrap();
    wait_for(&mut events, LoadKind::Markets).await.unwrap();
    handle.select_market("bonds").await.unwrap();
    wait_for(&mut events, LoadKind::Securities).await.unwrap();
    handle
        .select_security(SecuritySelection::Picked("SU26238RMFS4".to_string()))
        .await
        .unwrap();

    let err = handle.fetch_history().await.unwrap_err();
    assert!(matches!(
        err,
        ControllerError::Core(eod_core::CoreError::Overflow { .. })
    ));

    let snapshot = handle.snapshot();
    assert!(snapshot.history.is_empty());
    assert!(snapshot.last_error.is_some());

    // The actor is still alive and serving commands.
    handle.select_engine("currency").await.unwrap();
    assert_eq!(wait_for(&mut events, LoadKind::Markets).await.unwrap(), 1);
    assert_eq!(codes(&handle.snapshot().markets), vec!["selt"]);
    assert!(!join.is_finished());

    handle.shutdown().await;
    join.await.unwrap();
}
