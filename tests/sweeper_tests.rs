// Recovery sweeper tests: crash recovery of stuck placements and
// reconciliation of outstanding orders against the venue.

mod common;

use common::{
    backdate_state_change, count_transactions, force_state, get_level, make_service, seed_level,
    set_buy_order_id, test_database, MockAssurance,
};
use rust_decimal_macros::dec;
use std::sync::atomic::Ordering;

use grid_harvester::models::{GridState, OrderState};

#[tokio::test]
async fn test_sweeper_recovers_crash_mid_buy_placement() {
    let db = test_database();
    let assurance = MockAssurance::new();
    let service = make_service(&db, assurance.clone());
    let id = seed_level(&db, "ETHUSDT", dec!(3600), dec!(3800), dec!(1000));

    // The process died after the READY -> PLACING_BUY transition but
    // before the gateway replied: no order id on the row.
    force_state(&db, id, GridState::PlacingBuy, None);
    backdate_state_change(&db, id, 10);

    // The gateway's idempotency hands back the same order on the retry.
    *assurance.fixed_order_id.lock().unwrap() = Some("X".to_string());

    service.sync_orders().await.unwrap();

    let level = get_level(&db, id);
    assert_eq!(level.state, GridState::BuyActive);
    assert_eq!(level.buy_order_id.as_deref(), Some("X"));
    assert_eq!(assurance.placed_count(), 1);

    // A second sweep sees an open BUY_ACTIVE order and leaves it alone.
    service.sync_orders().await.unwrap();
    assert_eq!(get_level(&db, id).state, GridState::BuyActive);
    assert_eq!(assurance.placed_count(), 1);
}

#[tokio::test]
async fn test_sweeper_ignores_fresh_placing_levels() {
    let db = test_database();
    let assurance = MockAssurance::new();
    let service = make_service(&db, assurance.clone());
    let id = seed_level(&db, "ETHUSDT", dec!(3600), dec!(3800), dec!(1000));

    // Entered PLACING_BUY just now: not yet stuck.
    force_state(&db, id, GridState::PlacingBuy, None);

    service.sync_orders().await.unwrap();

    assert_eq!(get_level(&db, id).state, GridState::PlacingBuy);
    assert_eq!(assurance.placed_count(), 0);
}

#[tokio::test]
async fn test_sweeper_recovers_stuck_sell_placement() {
    let db = test_database();
    let assurance = MockAssurance::new();
    let service = make_service(&db, assurance.clone());
    let id = seed_level(&db, "ETHUSDT", dec!(3400), dec!(3600), dec!(1000));

    force_state(&db, id, GridState::PlacingSell, Some(dec!(0.278)));
    backdate_state_change(&db, id, 10);

    service.sync_orders().await.unwrap();

    let level = get_level(&db, id);
    assert_eq!(level.state, GridState::SellActive);
    assert!(level.sell_order_id.is_some());
    let orders = assurance.placed_orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].amount, dec!(0.278), "recovery reuses the exact held amount");
}

#[tokio::test]
async fn test_sweeper_synthesizes_fill_from_venue_status() {
    let db = test_database();
    let assurance = MockAssurance::new();
    let service = make_service(&db, assurance.clone());
    let id = seed_level(&db, "ETHUSDT", dec!(3600), dec!(3800), dec!(1000));

    // A missed webhook: the level still says BUY_ACTIVE but the venue
    // already filled the order.
    service.process_price_trigger("ETHUSDT", dec!(3650)).await.unwrap();
    let order_id = get_level(&db, id).buy_order_id.unwrap();
    assurance.set_status(&order_id, OrderState::Filled, Some((dec!(0.278), dec!(3598))));

    service.sync_orders().await.unwrap();

    // The sweep funnelled into the same fill routine as the webhook path:
    // position booked, audit row written once, eager sell placed.
    let level = get_level(&db, id);
    assert_eq!(level.state, GridState::SellActive);
    assert_eq!(level.filled_amount, Some(dec!(0.278)));
    assert_eq!(count_transactions(&db, "BUY", "FILLED"), 1);

    // Sweeping again must not double-book anything.
    service.sync_orders().await.unwrap();
    assert_eq!(count_transactions(&db, "BUY", "FILLED"), 1);
}

#[tokio::test]
async fn test_sweeper_releases_cancelled_buy() {
    let db = test_database();
    let assurance = MockAssurance::new();
    let service = make_service(&db, assurance.clone());
    let id = seed_level(&db, "ETHUSDT", dec!(3600), dec!(3800), dec!(1000));

    service.process_price_trigger("ETHUSDT", dec!(3650)).await.unwrap();
    let order_id = get_level(&db, id).buy_order_id.unwrap();
    assurance.set_status(&order_id, OrderState::Cancelled, None);

    service.sync_orders().await.unwrap();

    let level = get_level(&db, id);
    assert_eq!(level.state, GridState::Ready);
    assert!(level.buy_order_id.is_none());
    assert_eq!(count_transactions(&db, "BUY", "FILLED"), 0);
}

#[tokio::test]
async fn test_sweeper_releases_unknown_order() {
    let db = test_database();
    let assurance = MockAssurance::new();
    let service = make_service(&db, assurance.clone());
    let id = seed_level(&db, "ETHUSDT", dec!(3600), dec!(3800), dec!(1000));

    // The stored order id is unknown to the venue (e.g. residual from a
    // wiped testnet): the level is released, not errored.
    force_state(&db, id, GridState::BuyActive, None);
    set_buy_order_id(&db, id, "orphan-1");

    service.sync_orders().await.unwrap();

    let level = get_level(&db, id);
    assert_eq!(level.state, GridState::Ready);
    assert!(level.buy_order_id.is_none());
}

#[tokio::test]
async fn test_sweeper_reverts_when_recovery_placement_fails() {
    let db = test_database();
    let assurance = MockAssurance::new();
    let service = make_service(&db, assurance.clone());
    let id = seed_level(&db, "ETHUSDT", dec!(3600), dec!(3800), dec!(1000));

    force_state(&db, id, GridState::PlacingBuy, None);
    backdate_state_change(&db, id, 10);
    assurance.fail_place.store(true, Ordering::SeqCst);

    service.sync_orders().await.unwrap();

    assert_eq!(get_level(&db, id).state, GridState::Ready);
    assert_eq!(count_transactions(&db, "BUY", "ERROR"), 1);
}

#[tokio::test]
async fn test_trigger_path_reconciles_active_orders() {
    let db = test_database();
    let assurance = MockAssurance::new();
    let service = make_service(&db, assurance.clone());
    let id = seed_level(&db, "ETHUSDT", dec!(3600), dec!(3800), dec!(1000));

    service.process_price_trigger("ETHUSDT", dec!(3650)).await.unwrap();
    let order_id = get_level(&db, id).buy_order_id.unwrap();
    assurance.set_status(&order_id, OrderState::Filled, Some((dec!(0.278), dec!(3598))));

    // No webhook arrives; the next tick's best-effort reconciliation picks
    // the fill up on its own.
    service.process_price_trigger("ETHUSDT", dec!(3700)).await.unwrap();

    let level = get_level(&db, id);
    assert_eq!(level.state, GridState::SellActive);
    assert_eq!(count_transactions(&db, "BUY", "FILLED"), 1);
}
