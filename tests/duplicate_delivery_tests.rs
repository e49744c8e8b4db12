use billing_engine::application::engine::CorrelationEngine;
use billing_engine::domain::product::{Product, ProductId, ProductKind};
use billing_engine::domain::transaction::{AttemptId, TransactionEvent, TransactionId};
use billing_engine::infrastructure::simulated::SimulatedStore;
use rand::seq::SliceRandom;
use rust_decimal_macros::dec;

fn product(identifier: &str) -> Product {
    Product {
        identifier: identifier.into(),
        kind: ProductKind::Product,
        title: identifier.to_string(),
        description: identifier.to_string(),
        price: dec!(1.99),
        currency_code: "USD".to_string(),
        formatted_price: "$1.99".to_string(),
        locale_tag: "en_US".to_string(),
    }
}

fn engine_over(catalog: Vec<Product>) -> (CorrelationEngine, SimulatedStore) {
    let store = SimulatedStore::with_catalog(catalog);
    let engine = CorrelationEngine::new(Box::new(store.clone()));
    (engine, store)
}

async fn warm_cache(engine: &CorrelationEngine, store: &SimulatedStore, ids: &[&str]) {
    let identifiers = ids.iter().map(|id| ProductId::from(*id)).collect();
    let receiver = engine.fetch_products(identifiers).await.unwrap();
    let (handle, products) = store.respond_products().await.unwrap();
    engine.on_products_response(handle, products).await;
    receiver.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_redelivered_batch_does_not_double_grant() {
    let (engine, store) = engine_over(vec![product("p1")]);
    warm_cache(&engine, &store, &["p1"]).await;

    let receiver = engine.purchase("p1".into()).await.unwrap();
    let event = store.approve_payment(&"p1".into()).await.unwrap();

    // The store redelivers until acknowledged; three deliveries of the
    // same event must behave like one.
    for _ in 0..3 {
        engine.on_transactions(vec![event.clone()]).await;
    }

    assert_eq!(receiver.await.unwrap().unwrap(), vec![ProductId::from("p1")]);
    assert_eq!(engine.entitlements().await.len(), 1);
    // Every handled delivery is acknowledged, including redeliveries
    assert_eq!(store.acknowledged().await.len(), 3);
}

#[tokio::test]
async fn test_unsolicited_events_are_absorbed_and_acknowledged() {
    let (engine, store) = engine_over(vec![]);

    let events = vec![
        TransactionEvent::purchased(TransactionId(100), AttemptId(77), "alpha".into()),
        TransactionEvent::restored(TransactionId(101), "beta".into()),
        TransactionEvent::failed(TransactionId(102), AttemptId(78), "gamma".into()),
    ];
    engine.on_transactions(events).await;

    // No caller existed for any of these, but all were terminal
    assert_eq!(
        engine.entitlements().await,
        vec![ProductId::from("alpha"), ProductId::from("beta")]
    );
    assert_eq!(store.acknowledged().await.len(), 3);
}

#[tokio::test]
async fn test_delivery_order_does_not_change_final_ledger() {
    let identifiers: Vec<String> = (0..8).map(|i| format!("p{}", i)).collect();

    for _round in 0..4 {
        let catalog: Vec<Product> = identifiers.iter().map(|id| product(id)).collect();
        let (engine, store) = engine_over(catalog);
        let names: Vec<&str> = identifiers.iter().map(String::as_str).collect();
        warm_cache(&engine, &store, &names).await;

        let mut receivers = Vec::new();
        let mut events = Vec::new();
        for identifier in &identifiers {
            let id = ProductId::from(identifier.as_str());
            receivers.push(engine.purchase(id.clone()).await.unwrap());
            events.push(store.approve_payment(&id).await.unwrap());
        }

        // Deliver the terminal events in a random order, one batch each
        events.shuffle(&mut rand::thread_rng());
        for event in events {
            engine.on_transactions(vec![event]).await;
        }

        let expected: Vec<ProductId> = {
            let mut sorted: Vec<ProductId> = identifiers
                .iter()
                .map(|id| ProductId::from(id.as_str()))
                .collect();
            sorted.sort();
            sorted
        };
        assert_eq!(engine.entitlements().await, expected);
        for receiver in receivers {
            // Every caller resolved exactly once with some snapshot
            assert!(receiver.await.unwrap().is_ok());
        }
        assert_eq!(store.acknowledged().await.len(), identifiers.len());
    }
}

#[tokio::test]
async fn test_mixed_batch_with_duplicates_inside() {
    let (engine, store) = engine_over(vec![product("p1")]);
    warm_cache(&engine, &store, &["p1"]).await;

    let receiver = engine.purchase("p1".into()).await.unwrap();
    let event = store.approve_payment(&"p1".into()).await.unwrap();

    // One batch containing the same terminal event twice: the first copy
    // resolves the caller, the second only re-grants and re-acknowledges.
    engine.on_transactions(vec![event.clone(), event]).await;

    assert_eq!(receiver.await.unwrap().unwrap(), vec![ProductId::from("p1")]);
    assert_eq!(engine.entitlements().await.len(), 1);
    assert_eq!(store.acknowledged().await.len(), 2);
}
