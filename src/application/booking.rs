use super::ledger::WalletLedger;
use crate::domain::booking::{Booking, BookingDetail};
use crate::domain::money::Amount;
use crate::domain::ports::{
    BookingNotice, BookingStoreRef, GatewayOrder, NotificationSinkRef, PaymentGatewayRef,
    SlotStoreRef,
};
use crate::domain::slot::Slot;
use crate::domain::wallet::{refund_txn, wallet_slot_txn};
use crate::error::{Result, SettlementError};
use uuid::Uuid;

/// Drives the checkout -> payment-verification -> booking-confirmation state
/// machine for slot purchases, across both payment rails.
///
/// No local state is created before verification succeeds: an abandoned
/// checkout leaves nothing behind. Both rails secure the slot through the
/// store's conditional unbooked -> booked transition, so double-booking is
/// impossible regardless of request interleaving.
#[derive(Clone)]
pub struct BookingOrchestrator {
    slots: SlotStoreRef,
    bookings: BookingStoreRef,
    ledger: WalletLedger,
    gateway: PaymentGatewayRef,
    sink: NotificationSinkRef,
    currency: String,
}

impl BookingOrchestrator {
    pub fn new(
        slots: SlotStoreRef,
        bookings: BookingStoreRef,
        ledger: WalletLedger,
        gateway: PaymentGatewayRef,
        sink: NotificationSinkRef,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            slots,
            bookings,
            ledger,
            gateway,
            sink,
            currency: currency.into(),
        }
    }

    /// Starts a gateway checkout for a slot.
    ///
    /// Creates the remote payment order only; neither the slot nor a
    /// booking record is touched, so abandoned checkouts leave no orphans.
    pub async fn initiate_checkout(&self, slot_id: Uuid, student_id: &str) -> Result<GatewayOrder> {
        let slot = self.fetch_slot(slot_id).await?;
        if slot.is_booked {
            return Err(SettlementError::Conflict("slot already booked".to_string()));
        }
        let amount = purchase_amount(&slot)?;

        let receipt = format!("slot_{slot_id}");
        let order = self
            .gateway
            .create_order(amount.minor_units()?, &self.currency, &receipt)
            .await?;
        tracing::info!(slot_id = %slot_id, student_id, order_ref = %order.order_ref, "checkout initiated");
        Ok(order)
    }

    /// Settles a gateway payment into a confirmed booking.
    ///
    /// The slot is re-checked here because the unbooked check at checkout
    /// time proves nothing once the student returns from the gateway. A
    /// conflict discovered at this point is a settlement hazard: the money
    /// has already moved externally, so the student is credited back on
    /// their wallet before the error is surfaced.
    pub async fn verify_payment(
        &self,
        slot_id: Uuid,
        student_id: &str,
        order_ref: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<Booking> {
        if !self.gateway.verify_signature(order_ref, payment_id, signature) {
            return Err(SettlementError::Upstream(
                "payment signature mismatch".to_string(),
            ));
        }

        let slot = self.fetch_slot(slot_id).await?;
        let amount = purchase_amount(&slot)?;

        if !self.slots.book_if_unbooked(slot_id).await? {
            // A booking settled under this payment id means this is a
            // webhook or client retry of a successful verification: return
            // it unchanged, no refund.
            if let Some(existing) = self.bookings.find_by_slot(slot_id).await?
                && existing.transaction_id == payment_id
            {
                tracing::debug!(booking_id = %existing.id, payment_id, "verification replayed, no-op");
                return Ok(existing);
            }
            // The race was lost after the external payment was authorized.
            let refund = refund_txn(payment_id);
            self.ledger
                .refund(student_id, amount, payment_id, "slot booking refund")
                .await?;
            tracing::error!(slot_id = %slot_id, student_id, payment_id, "slot lost after gateway payment");
            return Err(SettlementError::SettlementHazard {
                detail: format!("slot {slot_id} was booked concurrently"),
                refund_txn: refund,
            });
        }

        // Transaction id is the gateway payment id, so webhook or client
        // retries replay into a no-op.
        if let Err(err) = self
            .ledger
            .credit(&slot.owner_id, amount, "slot booking", payment_id)
            .await
        {
            // The slot was secured but the instructor could not be paid:
            // release the slot and credit the student back for the
            // external payment.
            if let Err(release_err) = self.slots.release_booking(slot_id).await {
                tracing::error!(slot_id = %slot_id, %release_err, "slot left booked after failed credit");
            }
            let refund = refund_txn(payment_id);
            self.ledger
                .refund(student_id, amount, payment_id, "slot booking refund")
                .await?;
            tracing::error!(slot_id = %slot_id, payment_id, %err, "instructor credit failed after slot secured");
            return Err(SettlementError::SettlementHazard {
                detail: format!("instructor payout failed for slot {slot_id}"),
                refund_txn: refund,
            });
        }

        let booking = Booking::confirmed(student_id, &slot, payment_id);
        self.bookings.insert(booking.clone()).await?;
        tracing::info!(booking_id = %booking.id, slot_id = %slot_id, "booking confirmed via gateway");

        self.notify(&booking, &slot).await;
        Ok(booking)
    }

    /// Books a slot against the student's internal wallet balance.
    ///
    /// Step order is debit -> credit -> book slot -> insert booking, so an
    /// interruption between any two steps leaves at most a pending
    /// compensation, never a booked-but-unpaid slot.
    pub async fn book_via_wallet(&self, slot_id: Uuid, student_id: &str) -> Result<Booking> {
        let slot = self.fetch_slot(slot_id).await?;
        if slot.is_booked {
            return Err(SettlementError::Conflict("slot already booked".to_string()));
        }
        let amount = purchase_amount(&slot)?;
        let txn = wallet_slot_txn();

        // Insufficient funds fails the whole operation with no side effects.
        self.ledger
            .debit(student_id, amount, "slot booking", &txn)
            .await?;

        if let Err(err) = self
            .ledger
            .credit(&slot.owner_id, amount, "slot booking", &txn)
            .await
        {
            self.ledger
                .refund(student_id, amount, &txn, "slot booking refund")
                .await?;
            return Err(err);
        }

        if !self.slots.book_if_unbooked(slot_id).await? {
            // Both ledger legs are already applied; reverse them.
            self.reverse_wallet_legs(student_id, &slot.owner_id, amount, &txn)
                .await?;
            return Err(SettlementError::Conflict("slot already booked".to_string()));
        }

        let booking = Booking::confirmed(student_id, &slot, &txn);
        self.bookings.insert(booking.clone()).await?;
        tracing::info!(booking_id = %booking.id, slot_id = %slot_id, "booking confirmed via wallet");

        self.notify(&booking, &slot).await;
        Ok(booking)
    }

    /// Access-controlled read of a single booking with its slot loaded.
    pub async fn booking_detail(&self, booking_id: Uuid, principal: &str) -> Result<BookingDetail> {
        let booking = self
            .bookings
            .get(booking_id)
            .await?
            .ok_or_else(|| SettlementError::NotFound(format!("booking {booking_id}")))?;
        if !booking.involves(principal) {
            return Err(SettlementError::Unauthorized(
                "booking belongs to another student or instructor".to_string(),
            ));
        }
        let slot = self.fetch_slot(booking.slot_id).await?;
        Ok(BookingDetail { booking, slot })
    }

    /// All bookings the principal is student or instructor of.
    pub async fn booking_history(&self, principal: &str) -> Result<Vec<Booking>> {
        self.bookings.list_for_principal(principal).await
    }

    async fn fetch_slot(&self, slot_id: Uuid) -> Result<Slot> {
        self.slots
            .get(slot_id)
            .await?
            .ok_or_else(|| SettlementError::NotFound(format!("slot {slot_id}")))
    }

    async fn reverse_wallet_legs(
        &self,
        student_id: &str,
        owner_id: &str,
        amount: Amount,
        txn: &str,
    ) -> Result<()> {
        let reversal = refund_txn(txn);
        if let Err(err) = self
            .ledger
            .debit(owner_id, amount, "slot booking reversal", &reversal)
            .await
        {
            // The instructor leg could not be pulled back; the student is
            // still made whole and the stranded credit is recorded.
            tracing::error!(owner_id, txn, %err, "reversal debit failed, instructor leg stranded");
        }
        self.ledger
            .refund(student_id, amount, txn, "slot booking refund")
            .await?;
        Ok(())
    }

    async fn notify(&self, booking: &Booking, slot: &Slot) {
        let notice = BookingNotice {
            student_id: booking.student_id.clone(),
            owner_id: booking.owner_id.clone(),
            slot_start: slot.start_time,
            slot_end: slot.end_time,
        };
        // Fire-and-forget: a sink failure never rolls back a settlement.
        if let Err(err) = self.sink.send_booking_confirmation(notice).await {
            tracing::warn!(booking_id = %booking.id, %err, "booking confirmation not delivered");
        }
    }
}

fn purchase_amount(slot: &Slot) -> Result<Amount> {
    Amount::new(slot.price)
        .map_err(|_| SettlementError::Validation("slot has no purchasable price".to_string()))
}
