//! Trade batch source port trait.

use crate::domain::error::TradeAuditError;
use crate::domain::trade::TradeBatch;

/// Something that can hand over whole batches of trade rows.
///
/// Batches are fully materialized before validation starts.
pub trait TradeSourcePort {
    /// Names of the batches this source offers, in a stable order.
    fn list_batches(&self) -> Result<Vec<String>, TradeAuditError>;

    fn load_batch(&self, name: &str) -> Result<TradeBatch, TradeAuditError>;
}
