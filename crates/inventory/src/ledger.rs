use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock, TryLockError};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use wms_core::{DomainError, DomainResult, ItemCode, LocationCode, LotCode};

/// Stock cell key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StockKey {
    pub item: ItemCode,
    pub location: LocationCode,
    pub lot: Option<LotCode>,
}

impl StockKey {
    pub fn new(item: ItemCode, location: LocationCode, lot: Option<LotCode>) -> Self {
        Self {
            item,
            location,
            lot,
        }
    }
}

impl core::fmt::Display for StockKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.lot {
            Some(lot) => write!(f, "{}@{}#{}", self.item, self.location, lot),
            None => write!(f, "{}@{}", self.item, self.location),
        }
    }
}

/// Quantity held in one cell. Invariant: `0 <= reserved <= on_hand`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub on_hand: i64,
    pub reserved: i64,
}

impl StockLevel {
    pub fn available(&self) -> i64 {
        self.on_hand - self.reserved
    }

    fn shifted(&self, on_hand: i64, reserved: i64) -> Self {
        Self {
            on_hand: self.on_hand + on_hand,
            reserved: self.reserved + reserved,
        }
    }

    fn is_consistent(&self) -> bool {
        self.reserved >= 0 && self.on_hand >= self.reserved
    }
}

/// Bounded retry for acquiring a contended stock cell.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 64,
            base_backoff: Duration::from_micros(20),
            max_backoff: Duration::from_millis(2),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.base_backoff.saturating_mul(factor).min(self.max_backoff)
    }
}

type Cell = Arc<Mutex<StockLevel>>;

/// Shared stock ledger with single-writer-at-a-time semantics per stock key.
///
/// Every mutation locks only its own `(item, location, lot)` cell, so two callers can
/// never both reserve the same unit. A busy cell is retried with backoff up to
/// [`RetryPolicy::max_attempts`]; exhaustion surfaces as [`DomainError::Concurrency`].
#[derive(Debug, Default)]
pub struct StockLedger {
    cells: RwLock<HashMap<StockKey, Cell>>,
    retry: RetryPolicy,
}

impl StockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retry_policy(retry: RetryPolicy) -> Self {
        Self {
            cells: RwLock::new(HashMap::new()),
            retry,
        }
    }

    pub fn level(&self, key: &StockKey) -> StockLevel {
        let cell = self
            .cells
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(key)
            .cloned();
        match cell {
            Some(cell) => *cell.lock().unwrap_or_else(|p| p.into_inner()),
            None => StockLevel::default(),
        }
    }

    pub fn available(&self, key: &StockKey) -> i64 {
        self.level(key).available()
    }

    /// Manual correction of on-hand quantity.
    ///
    /// Rejected when it would take on-hand below zero or below what is already reserved.
    pub fn adjust(&self, key: &StockKey, delta: i64) -> DomainResult<StockLevel> {
        if delta == 0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }
        self.mutate(key, |level| {
            let next = level.shifted(delta, 0);
            if next.on_hand < 0 {
                return Err(DomainError::validation(format!(
                    "stock cannot go negative for {key} (on hand {}, delta {delta})",
                    level.on_hand
                )));
            }
            if next.on_hand < next.reserved {
                return Err(DomainError::validation(format!(
                    "adjustment would remove reserved stock for {key} (reserved {})",
                    level.reserved
                )));
            }
            Ok((delta, 0))
        })
    }

    /// Reserve up to `quantity` units; returns how many were actually granted.
    pub fn reserve(&self, key: &StockKey, quantity: i64) -> DomainResult<i64> {
        ensure_positive(quantity)?;
        let mut granted = 0;
        self.mutate(key, |level| {
            granted = level.available().clamp(0, quantity);
            Ok((0, granted))
        })?;
        Ok(granted)
    }

    pub fn release(&self, key: &StockKey, quantity: i64) -> DomainResult<StockLevel> {
        ensure_positive(quantity)?;
        self.mutate(key, |level| {
            if level.reserved < quantity {
                return Err(DomainError::invariant(format!(
                    "cannot release {quantity} from {key}: only {} reserved",
                    level.reserved
                )));
            }
            Ok((0, -quantity))
        })
    }

    /// Ship previously reserved units out of the cell.
    pub fn consume_reserved(&self, key: &StockKey, quantity: i64) -> DomainResult<StockLevel> {
        ensure_positive(quantity)?;
        self.mutate(key, |level| {
            if level.reserved < quantity {
                return Err(DomainError::invariant(format!(
                    "cannot consume {quantity} reserved units from {key}: only {} reserved",
                    level.reserved
                )));
            }
            Ok((-quantity, -quantity))
        })
    }

    /// Take unreserved units out of the cell (e.g. manufacturing consumption).
    pub fn take(&self, key: &StockKey, quantity: i64) -> DomainResult<StockLevel> {
        ensure_positive(quantity)?;
        self.mutate(key, |level| {
            if level.available() < quantity {
                return Err(DomainError::validation(format!(
                    "insufficient stock for {key}: {} available, {quantity} required",
                    level.available()
                )));
            }
            Ok((-quantity, 0))
        })
    }

    /// Put units into the cell (completed inbound move, production output).
    pub fn receive(&self, key: &StockKey, quantity: i64) -> DomainResult<StockLevel> {
        ensure_positive(quantity)?;
        self.mutate(key, |_| Ok((quantity, 0)))
    }

    /// All non-empty cells of an item at one location, lot-less cell first.
    pub fn cells_at(&self, item: &ItemCode, location: &LocationCode) -> Vec<(StockKey, StockLevel)> {
        self.collect(|k| &k.item == item && &k.location == location)
    }

    /// All non-empty cells of an item, sorted by location then lot.
    pub fn cells_for_item(&self, item: &ItemCode) -> Vec<(StockKey, StockLevel)> {
        self.collect(|k| &k.item == item)
    }

    pub fn snapshot(&self) -> BTreeMap<StockKey, StockLevel> {
        self.collect(|_| true).into_iter().collect()
    }

    fn collect(&self, filter: impl Fn(&StockKey) -> bool) -> Vec<(StockKey, StockLevel)> {
        let cells: Vec<(StockKey, Cell)> = self
            .cells
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .filter(|(k, _)| filter(k))
            .map(|(k, c)| (k.clone(), Arc::clone(c)))
            .collect();

        let mut out: Vec<(StockKey, StockLevel)> = cells
            .into_iter()
            .map(|(k, c)| (k, *c.lock().unwrap_or_else(|p| p.into_inner())))
            .filter(|(_, level)| level.on_hand != 0 || level.reserved != 0)
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    fn cell(&self, key: &StockKey) -> Cell {
        if let Some(cell) = self
            .cells
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(key)
        {
            return Arc::clone(cell);
        }
        let mut cells = self.cells.write().unwrap_or_else(|p| p.into_inner());
        Arc::clone(cells.entry(key.clone()).or_default())
    }

    /// Run `decide` under the cell lock; it returns `(on_hand delta, reserved delta)`.
    fn mutate(
        &self,
        key: &StockKey,
        mut decide: impl FnMut(&StockLevel) -> DomainResult<(i64, i64)>,
    ) -> DomainResult<StockLevel> {
        let cell = self.cell(key);
        let mut attempt = 0;
        loop {
            match cell.try_lock() {
                Ok(mut level) => {
                    let (on_hand, reserved) = decide(&*level)?;
                    let next = level.shifted(on_hand, reserved);
                    if !next.is_consistent() {
                        return Err(DomainError::invariant(format!(
                            "stock cell {key} would become inconsistent: {next:?}"
                        )));
                    }
                    *level = next;
                    return Ok(next);
                }
                Err(TryLockError::WouldBlock) => {
                    attempt += 1;
                    if attempt >= self.retry.max_attempts {
                        tracing::warn!(key = %key, attempt, "stock cell lock retries exhausted");
                        return Err(DomainError::concurrency(format!(
                            "stock cell {key} busy after {attempt} attempts"
                        )));
                    }
                    std::thread::sleep(self.retry.backoff(attempt));
                }
                Err(TryLockError::Poisoned(_)) => {
                    return Err(DomainError::invariant(format!(
                        "stock cell {key} lock poisoned"
                    )));
                }
            }
        }
    }

    /// Apply raw deltas without business validation. Used to undo journaled mutations.
    pub(crate) fn revert(&self, key: &StockKey, on_hand: i64, reserved: i64) {
        let cell = self.cell(key);
        let mut level = cell.lock().unwrap_or_else(|p| p.into_inner());
        *level = level.shifted(-on_hand, -reserved);
    }
}

fn ensure_positive(quantity: i64) -> DomainResult<()> {
    if quantity <= 0 {
        return Err(DomainError::validation("quantity must be positive"));
    }
    Ok(())
}
