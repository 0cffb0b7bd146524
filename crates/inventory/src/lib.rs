//! Stock ledger.
//!
//! Quantities of `(item, location, lot)` with per-key serialized mutation, plus a
//! journaled transaction wrapper so a failed resolution can undo its reservations.

pub mod ledger;
pub mod tx;

pub use ledger::{RetryPolicy, StockKey, StockLedger, StockLevel};
pub use tx::LedgerTx;
