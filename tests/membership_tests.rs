mod common;

use common::{assert_conserved, engine, engine_with_memberships, FailingMembershipStore, PLATFORM};
use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use slotbook::domain::membership::{Membership, OrderPaymentStatus};
use slotbook::domain::money::{Amount, Balance};
use slotbook::domain::ports::InstructorDirectory;
use slotbook::error::SettlementError;
use std::sync::Arc;
use uuid::Uuid;

#[tokio::test]
async fn test_plan_name_conflict() {
    let engine = engine();
    engine
        .memberships
        .create_plan("Gold", dec!(1000), 30)
        .await
        .unwrap();
    let result = engine.memberships.create_plan("gold", dec!(500), 90).await;
    assert!(matches!(result, Err(SettlementError::Conflict(_))));
}

#[tokio::test]
async fn test_plan_validation() {
    let engine = engine();
    assert!(matches!(
        engine.memberships.create_plan("  ", dec!(100), 30).await,
        Err(SettlementError::Validation(_))
    ));
    assert!(matches!(
        engine.memberships.create_plan("Gold", dec!(-1), 30).await,
        Err(SettlementError::Validation(_))
    ));
    assert!(matches!(
        engine.memberships.create_plan("Gold", dec!(100), 0).await,
        Err(SettlementError::Validation(_))
    ));
}

#[tokio::test]
async fn test_unexpired_membership_blocks_checkout() {
    let engine = engine();
    let plan = engine
        .memberships
        .create_plan("Gold", dec!(1000), 30)
        .await
        .unwrap();

    engine
        .directory
        .set_membership(
            "instructor-1",
            Membership {
                plan_id: plan.id,
                expires_at: Utc::now() + Duration::days(5),
            },
        )
        .await
        .unwrap();

    let result = engine
        .memberships
        .initiate_checkout("instructor-1", plan.id)
        .await;
    assert!(matches!(result, Err(SettlementError::Conflict(_))));

    // An expired membership does not block.
    engine
        .directory
        .set_membership(
            "instructor-1",
            Membership {
                plan_id: plan.id,
                expires_at: Utc::now() - Duration::days(1),
            },
        )
        .await
        .unwrap();
    engine
        .memberships
        .initiate_checkout("instructor-1", plan.id)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_verify_and_activate() {
    let engine = engine();
    let plan = engine
        .memberships
        .create_plan("Gold", dec!(1000), 30)
        .await
        .unwrap();
    let order = engine
        .memberships
        .initiate_checkout("instructor-1", plan.id)
        .await
        .unwrap();

    let payment_id = "pay_m1";
    let signature = engine.gateway.sign(&order.order_ref, payment_id);
    let settled = engine
        .memberships
        .verify_and_activate(&order.order_ref, payment_id, &signature, "instructor-1", plan.id)
        .await
        .unwrap();

    assert_eq!(settled.payment_status, OrderPaymentStatus::Paid);
    assert_eq!(settled.transaction_id.as_deref(), Some(payment_id));

    let membership = engine
        .directory
        .membership("instructor-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(membership.plan_id, plan.id);
    let expected = Utc::now() + Duration::days(30);
    assert!((membership.expires_at - expected).num_seconds().abs() < 5);

    assert_eq!(
        engine.ledger.balance(PLATFORM).await.unwrap(),
        Balance::new(dec!(1000))
    );
    assert_eq!(engine.sink.membership_notices().await.len(), 1);
    assert_conserved(&engine.ledger, PLATFORM).await;
}

#[tokio::test]
async fn test_paid_order_cannot_be_reverified() {
    let engine = engine();
    let plan = engine
        .memberships
        .create_plan("Gold", dec!(1000), 30)
        .await
        .unwrap();
    let order = engine
        .memberships
        .initiate_checkout("instructor-1", plan.id)
        .await
        .unwrap();

    let payment_id = "pay_m1";
    let signature = engine.gateway.sign(&order.order_ref, payment_id);
    engine
        .memberships
        .verify_and_activate(&order.order_ref, payment_id, &signature, "instructor-1", plan.id)
        .await
        .unwrap();

    let replay = engine
        .memberships
        .verify_and_activate(&order.order_ref, payment_id, &signature, "instructor-1", plan.id)
        .await;
    assert!(matches!(replay, Err(SettlementError::Conflict(_))));

    // The platform was credited exactly once.
    assert_eq!(
        engine.ledger.balance(PLATFORM).await.unwrap(),
        Balance::new(dec!(1000))
    );
}

#[tokio::test]
async fn test_tampered_signature_activates_nothing() {
    let engine = engine();
    let plan = engine
        .memberships
        .create_plan("Gold", dec!(1000), 30)
        .await
        .unwrap();
    let order = engine
        .memberships
        .initiate_checkout("instructor-1", plan.id)
        .await
        .unwrap();

    let result = engine
        .memberships
        .verify_and_activate(&order.order_ref, "pay_m1", "tampered", "instructor-1", plan.id)
        .await;
    assert!(matches!(result, Err(SettlementError::Upstream(_))));

    assert!(engine
        .directory
        .membership("instructor-1")
        .await
        .unwrap()
        .is_none());
    assert!(engine
        .memberships
        .order_history("instructor-1")
        .await
        .unwrap()
        .is_empty());
    assert_eq!(engine.ledger.balance(PLATFORM).await.unwrap(), Balance::ZERO);
}

#[tokio::test]
async fn test_unknown_plan_rejected() {
    let engine = engine();
    let result = engine
        .memberships
        .initiate_checkout("instructor-1", Uuid::new_v4())
        .await;
    assert!(matches!(result, Err(SettlementError::NotFound(_))));
}

#[tokio::test]
async fn test_purchase_with_wallet() {
    let engine = engine();
    let plan = engine
        .memberships
        .create_plan("Gold", dec!(1000), 30)
        .await
        .unwrap();
    engine
        .ledger
        .credit(
            "instructor-1",
            Amount::new(dec!(1500)).unwrap(),
            "top-up",
            "t1",
        )
        .await
        .unwrap();

    let order = engine
        .memberships
        .purchase_with_wallet("instructor-1", plan.id)
        .await
        .unwrap();
    assert_eq!(order.payment_status, OrderPaymentStatus::Paid);
    assert!(order.order_ref.starts_with("wallet-membership-"));

    assert_eq!(
        engine.ledger.balance("instructor-1").await.unwrap(),
        Balance::new(dec!(500))
    );
    assert_eq!(
        engine.ledger.balance(PLATFORM).await.unwrap(),
        Balance::new(dec!(1000))
    );
    assert!(engine
        .directory
        .membership("instructor-1")
        .await
        .unwrap()
        .is_some());

    // A second purchase while the membership is active is rejected with the
    // wallet untouched.
    let result = engine
        .memberships
        .purchase_with_wallet("instructor-1", plan.id)
        .await;
    assert!(matches!(result, Err(SettlementError::Conflict(_))));
    assert_eq!(
        engine.ledger.balance("instructor-1").await.unwrap(),
        Balance::new(dec!(500))
    );
    assert_conserved(&engine.ledger, "instructor-1").await;
    assert_conserved(&engine.ledger, PLATFORM).await;
}

#[tokio::test]
async fn test_wallet_purchase_insufficient_funds() {
    let engine = engine();
    let plan = engine
        .memberships
        .create_plan("Gold", dec!(1000), 30)
        .await
        .unwrap();
    engine
        .ledger
        .credit("instructor-1", Amount::new(dec!(100)).unwrap(), "top-up", "t1")
        .await
        .unwrap();

    let result = engine
        .memberships
        .purchase_with_wallet("instructor-1", plan.id)
        .await;
    assert!(matches!(
        result,
        Err(SettlementError::InsufficientFunds { .. })
    ));
    assert!(engine
        .memberships
        .order_history("instructor-1")
        .await
        .unwrap()
        .is_empty());
    assert!(engine
        .directory
        .membership("instructor-1")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_wallet_purchase_compensated_on_order_write_failure() {
    // The order write fails after both money legs applied: instructor
    // debited, platform credited, then no paid order can be recorded.
    let engine = engine_with_memberships(Arc::new(FailingMembershipStore::new()));
    let plan = engine
        .memberships
        .create_plan("Gold", dec!(1000), 30)
        .await
        .unwrap();
    engine
        .ledger
        .credit(
            "instructor-1",
            Amount::new(dec!(1500)).unwrap(),
            "top-up",
            "t1",
        )
        .await
        .unwrap();

    let result = engine
        .memberships
        .purchase_with_wallet("instructor-1", plan.id)
        .await;
    assert!(matches!(result, Err(SettlementError::Upstream(_))));

    // Both legs reversed: instructor made whole, platform back to zero.
    assert_eq!(
        engine.ledger.balance("instructor-1").await.unwrap(),
        Balance::new(dec!(1500))
    );
    assert_eq!(engine.ledger.balance(PLATFORM).await.unwrap(), Balance::ZERO);
    let history = engine.ledger.history("instructor-1").await.unwrap();
    assert!(history
        .iter()
        .any(|e| e.transaction_id.starts_with("refund_wallet-membership-")));
    assert!(engine
        .directory
        .membership("instructor-1")
        .await
        .unwrap()
        .is_none());
    assert_conserved(&engine.ledger, "instructor-1").await;
    assert_conserved(&engine.ledger, PLATFORM).await;
}

#[tokio::test]
async fn test_inactive_plan_rejected() {
    let engine = engine();
    let mut plan = engine
        .memberships
        .create_plan("Gold", dec!(1000), 30)
        .await
        .unwrap();

    plan.is_active = false;
    engine.membership_store.update_plan(plan.clone()).await.unwrap();

    let result = engine
        .memberships
        .initiate_checkout("instructor-1", plan.id)
        .await;
    assert!(matches!(result, Err(SettlementError::Validation(_))));
}
