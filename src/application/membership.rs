use super::ledger::WalletLedger;
use crate::domain::membership::{Membership, MembershipOrder, MembershipPlan, OrderPaymentStatus};
use crate::domain::money::Amount;
use crate::domain::ports::{
    GatewayOrder, InstructorDirectoryRef, MembershipNotice, MembershipStoreRef,
    NotificationSinkRef, PaymentGatewayRef,
};
use crate::domain::wallet::{refund_txn, wallet_membership_txn};
use crate::error::{Result, SettlementError};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Checkout and settlement of instructor membership purchases.
///
/// Same shape as the booking orchestrator, with the membership order's
/// pending -> paid transition as the conditional primitive: a paid order can
/// never be re-verified, which guards against callback replay.
#[derive(Clone)]
pub struct MembershipOrchestrator {
    store: MembershipStoreRef,
    directory: InstructorDirectoryRef,
    ledger: WalletLedger,
    gateway: PaymentGatewayRef,
    sink: NotificationSinkRef,
    currency: String,
    platform_account: String,
}

impl MembershipOrchestrator {
    pub fn new(
        store: MembershipStoreRef,
        directory: InstructorDirectoryRef,
        ledger: WalletLedger,
        gateway: PaymentGatewayRef,
        sink: NotificationSinkRef,
        currency: impl Into<String>,
        platform_account: impl Into<String>,
    ) -> Self {
        Self {
            store,
            directory,
            ledger,
            gateway,
            sink,
            currency: currency.into(),
            platform_account: platform_account.into(),
        }
    }

    pub async fn create_plan(
        &self,
        name: &str,
        price: Decimal,
        duration_days: i64,
    ) -> Result<MembershipPlan> {
        if name.trim().is_empty() {
            return Err(SettlementError::Validation(
                "plan name must not be empty".to_string(),
            ));
        }
        if price < Decimal::ZERO {
            return Err(SettlementError::Validation(
                "price must not be negative".to_string(),
            ));
        }
        if duration_days <= 0 {
            return Err(SettlementError::Validation(
                "duration must be positive".to_string(),
            ));
        }
        let plan = MembershipPlan::new(name.trim(), price, duration_days);
        self.store.insert_plan(plan.clone()).await?;
        Ok(plan)
    }

    pub async fn list_plans(&self) -> Result<Vec<MembershipPlan>> {
        self.store.list_plans().await
    }

    /// Starts a gateway checkout for a membership plan.
    ///
    /// An instructor holding an unexpired membership is rejected before any
    /// gateway order is created. No local order record is written yet.
    pub async fn initiate_checkout(
        &self,
        instructor_id: &str,
        plan_id: Uuid,
    ) -> Result<GatewayOrder> {
        let plan = self.purchasable_plan(instructor_id, plan_id).await?;
        let amount = plan_amount(&plan)?;

        let receipt = format!("membership_{plan_id}");
        let order = self
            .gateway
            .create_order(amount.minor_units()?, &self.currency, &receipt)
            .await?;
        tracing::info!(instructor_id, plan_id = %plan_id, order_ref = %order.order_ref, "membership checkout initiated");
        Ok(order)
    }

    /// Verifies the gateway callback and activates the membership.
    ///
    /// The order is looked up or created by `order_ref`; a paid order is a
    /// duplicate and mutates nothing. An invalid signature never activates
    /// anything.
    pub async fn verify_and_activate(
        &self,
        order_ref: &str,
        payment_id: &str,
        signature: &str,
        instructor_id: &str,
        plan_id: Uuid,
    ) -> Result<MembershipOrder> {
        if !self.gateway.verify_signature(order_ref, payment_id, signature) {
            return Err(SettlementError::Upstream(
                "payment signature mismatch".to_string(),
            ));
        }

        let plan = self
            .store
            .plan(plan_id)
            .await?
            .ok_or_else(|| SettlementError::NotFound(format!("membership plan {plan_id}")))?;
        let amount = plan_amount(&plan)?;

        match self.store.order_by_ref(order_ref).await? {
            Some(order) if order.payment_status == OrderPaymentStatus::Paid => {
                return Err(SettlementError::Conflict(format!(
                    "order {order_ref} already settled"
                )));
            }
            Some(_) => {}
            None => {
                let order = MembershipOrder::pending(instructor_id, &plan, order_ref);
                self.store.insert_order(order).await?;
            }
        }

        let now = Utc::now();
        let expiry = now + Duration::days(plan.duration_days);
        let order = self
            .store
            .settle_order_if_pending(order_ref, OrderPaymentStatus::Paid, payment_id, now, expiry)
            .await?
            .ok_or_else(|| {
                SettlementError::Conflict(format!("order {order_ref} already settled"))
            })?;

        self.directory
            .set_membership(
                instructor_id,
                Membership {
                    plan_id,
                    expires_at: expiry,
                },
            )
            .await?;

        // Transaction id is the gateway payment id; callback replays fall
        // out on the paid-order guard above or the ledger's idempotency.
        self.ledger
            .credit(&self.platform_account, amount, "membership purchase", payment_id)
            .await?;

        tracing::info!(instructor_id, order_ref, "membership activated via gateway");
        self.notify(instructor_id, &plan, &order).await;
        Ok(order)
    }

    /// Settles a membership purchase against the instructor's wallet.
    ///
    /// Debit instructor -> credit platform -> record paid order -> set
    /// membership, with the platform credit compensated back to the
    /// instructor when a later step fails.
    pub async fn purchase_with_wallet(
        &self,
        instructor_id: &str,
        plan_id: Uuid,
    ) -> Result<MembershipOrder> {
        let plan = self.purchasable_plan(instructor_id, plan_id).await?;
        let amount = plan_amount(&plan)?;
        let txn = wallet_membership_txn();

        self.ledger
            .debit(instructor_id, amount, "membership purchase", &txn)
            .await?;

        if let Err(err) = self
            .ledger
            .credit(&self.platform_account, amount, "membership purchase", &txn)
            .await
        {
            self.ledger
                .refund(instructor_id, amount, &txn, "membership purchase refund")
                .await?;
            return Err(err);
        }

        // Both money legs are applied at this point; any failure to record
        // the paid order or flip the membership reverses them.
        let now = Utc::now();
        let expiry = now + Duration::days(plan.duration_days);
        let order = match self
            .record_paid_order(instructor_id, &plan, &txn, now, expiry)
            .await
        {
            Ok(order) => order,
            Err(err) => {
                self.reverse_wallet_legs(instructor_id, amount, &txn).await?;
                return Err(err);
            }
        };

        tracing::info!(instructor_id, txn, "membership activated via wallet");
        self.notify(instructor_id, &plan, &order).await;
        Ok(order)
    }

    pub async fn order_history(&self, instructor_id: &str) -> Result<Vec<MembershipOrder>> {
        self.store.list_orders(instructor_id).await
    }

    async fn record_paid_order(
        &self,
        instructor_id: &str,
        plan: &MembershipPlan,
        txn: &str,
        now: DateTime<Utc>,
        expiry: DateTime<Utc>,
    ) -> Result<MembershipOrder> {
        let pending = MembershipOrder::pending(instructor_id, plan, txn);
        self.store.insert_order(pending).await?;
        let order = self
            .store
            .settle_order_if_pending(txn, OrderPaymentStatus::Paid, txn, now, expiry)
            .await?
            .ok_or_else(|| SettlementError::Conflict(format!("order {txn} already settled")))?;

        self.directory
            .set_membership(
                instructor_id,
                Membership {
                    plan_id: plan.id,
                    expires_at: expiry,
                },
            )
            .await?;
        Ok(order)
    }

    async fn reverse_wallet_legs(
        &self,
        instructor_id: &str,
        amount: Amount,
        txn: &str,
    ) -> Result<()> {
        let reversal = refund_txn(txn);
        if let Err(err) = self
            .ledger
            .debit(
                &self.platform_account,
                amount,
                "membership purchase reversal",
                &reversal,
            )
            .await
        {
            // The platform leg could not be pulled back; the instructor is
            // still made whole and the stranded credit is recorded.
            tracing::error!(txn, %err, "reversal debit failed, platform leg stranded");
        }
        self.ledger
            .refund(instructor_id, amount, txn, "membership purchase refund")
            .await?;
        Ok(())
    }

    async fn purchasable_plan(&self, instructor_id: &str, plan_id: Uuid) -> Result<MembershipPlan> {
        let plan = self
            .store
            .plan(plan_id)
            .await?
            .ok_or_else(|| SettlementError::NotFound(format!("membership plan {plan_id}")))?;
        if !plan.is_active {
            return Err(SettlementError::Validation(format!(
                "membership plan {} is not active",
                plan.name
            )));
        }
        if let Some(current) = self.directory.membership(instructor_id).await?
            && current.is_active_at(Utc::now())
        {
            return Err(SettlementError::Conflict(
                "an unexpired membership already exists".to_string(),
            ));
        }
        Ok(plan)
    }

    async fn notify(&self, instructor_id: &str, plan: &MembershipPlan, order: &MembershipOrder) {
        let notice = MembershipNotice {
            instructor_id: instructor_id.to_string(),
            plan_name: plan.name.clone(),
            expires_at: order.end_date.unwrap_or_else(Utc::now),
        };
        if let Err(err) = self.sink.send_membership_confirmation(notice).await {
            tracing::warn!(instructor_id, %err, "membership confirmation not delivered");
        }
    }
}

fn plan_amount(plan: &MembershipPlan) -> Result<Amount> {
    Amount::new(plan.price)
        .map_err(|_| SettlementError::Validation("plan has no purchasable price".to_string()))
}
