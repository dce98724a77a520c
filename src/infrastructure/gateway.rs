use crate::domain::ports::{GatewayOrder, PaymentGateway};
use crate::error::{Result, SettlementError};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Payment gateway adapter with HMAC-SHA256 callback verification.
///
/// The signature covers `order_ref|payment_id` under the shared secret and
/// is transmitted hex-encoded. Order creation here stands in for the remote
/// call; the verification logic is the real contract.
#[derive(Clone)]
pub struct HmacGateway {
    secret: Vec<u8>,
}

impl HmacGateway {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Produces the signature the gateway would attach to a callback.
    /// Used by tests and webhook simulation.
    pub fn sign(&self, order_ref: &str, payment_id: &str) -> String {
        let mut mac = self.mac();
        mac.update(format!("{order_ref}|{payment_id}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size")
    }
}

#[async_trait]
impl PaymentGateway for HmacGateway {
    async fn create_order(
        &self,
        amount_minor_units: u64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder> {
        if amount_minor_units == 0 {
            return Err(SettlementError::Upstream(format!(
                "gateway rejected zero-amount order for receipt {receipt}"
            )));
        }
        Ok(GatewayOrder {
            order_ref: format!("order_{}", Uuid::new_v4().simple()),
            amount_minor_units,
            currency: currency.to_string(),
        })
    }

    fn verify_signature(&self, order_ref: &str, payment_id: &str, signature: &str) -> bool {
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        let mut mac = self.mac();
        mac.update(format!("{order_ref}|{payment_id}").as_bytes());
        // Constant-time comparison.
        mac.verify_slice(&expected).is_ok()
    }
}
