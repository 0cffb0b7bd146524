//! Journaled ledger transaction.

use wms_core::{DomainResult, ItemCode, LocationCode};

use crate::ledger::{StockKey, StockLedger, StockLevel};

/// A batch of ledger mutations that is undone on drop unless committed.
///
/// The engine opens one transaction per top-level event. Validation or configuration
/// failures drop the transaction, which reverts every mutation in reverse order, so
/// no partial reservation survives an aborted resolution. Transactions assume they
/// are the only writer of the cells they touch while open.
#[derive(Debug)]
pub struct LedgerTx<'a> {
    ledger: &'a StockLedger,
    journal: Vec<(StockKey, i64, i64)>,
    committed: bool,
}

impl<'a> LedgerTx<'a> {
    pub fn begin(ledger: &'a StockLedger) -> Self {
        Self {
            ledger,
            journal: Vec::new(),
            committed: false,
        }
    }

    pub fn ledger(&self) -> &StockLedger {
        self.ledger
    }

    pub fn level(&self, key: &StockKey) -> StockLevel {
        self.ledger.level(key)
    }

    pub fn cells_at(&self, item: &ItemCode, location: &LocationCode) -> Vec<(StockKey, StockLevel)> {
        self.ledger.cells_at(item, location)
    }

    pub fn adjust(&mut self, key: &StockKey, delta: i64) -> DomainResult<StockLevel> {
        let level = self.ledger.adjust(key, delta)?;
        self.journal.push((key.clone(), delta, 0));
        Ok(level)
    }

    pub fn reserve(&mut self, key: &StockKey, quantity: i64) -> DomainResult<i64> {
        let granted = self.ledger.reserve(key, quantity)?;
        if granted > 0 {
            self.journal.push((key.clone(), 0, granted));
        }
        Ok(granted)
    }

    pub fn release(&mut self, key: &StockKey, quantity: i64) -> DomainResult<StockLevel> {
        let level = self.ledger.release(key, quantity)?;
        self.journal.push((key.clone(), 0, -quantity));
        Ok(level)
    }

    pub fn consume_reserved(&mut self, key: &StockKey, quantity: i64) -> DomainResult<StockLevel> {
        let level = self.ledger.consume_reserved(key, quantity)?;
        self.journal.push((key.clone(), -quantity, -quantity));
        Ok(level)
    }

    pub fn take(&mut self, key: &StockKey, quantity: i64) -> DomainResult<StockLevel> {
        let level = self.ledger.take(key, quantity)?;
        self.journal.push((key.clone(), -quantity, 0));
        Ok(level)
    }

    pub fn receive(&mut self, key: &StockKey, quantity: i64) -> DomainResult<StockLevel> {
        let level = self.ledger.receive(key, quantity)?;
        self.journal.push((key.clone(), quantity, 0));
        Ok(level)
    }

    /// Number of journaled mutations.
    pub fn len(&self) -> usize {
        self.journal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.journal.is_empty()
    }

    pub fn commit(mut self) {
        self.committed = true;
        self.journal.clear();
    }

    fn rollback(&mut self) {
        if !self.journal.is_empty() {
            tracing::debug!(mutations = self.journal.len(), "rolling back ledger transaction");
        }
        while let Some((key, on_hand, reserved)) = self.journal.pop() {
            self.ledger.revert(&key, on_hand, reserved);
        }
    }
}

impl Drop for LedgerTx<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.rollback();
        }
    }
}
