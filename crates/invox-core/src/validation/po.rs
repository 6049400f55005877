//! Purchase order data supplied to the validator.

use std::collections::HashMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{InvoxError, Result};

/// Reference record an invoice is checked against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub po_number: String,

    /// Approved amount.
    pub amount: Decimal,

    /// Approved vendor name; empty skips the vendor check.
    #[serde(default)]
    pub vendor: String,
}

impl PurchaseOrder {
    pub fn new(po_number: impl Into<String>, amount: Decimal, vendor: impl Into<String>) -> Self {
        Self {
            po_number: po_number.into(),
            amount,
            vendor: vendor.into(),
        }
    }
}

/// Looks up purchase orders by number.
///
/// A missing order is a normal outcome, not an error.
pub trait PoProvider: Send + Sync {
    fn lookup(&self, po_number: &str) -> Option<PurchaseOrder>;
}

/// Provider with no purchase orders.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPurchaseOrders;

impl PoProvider for NoPurchaseOrders {
    fn lookup(&self, _po_number: &str) -> Option<PurchaseOrder> {
        None
    }
}

/// Purchase orders held in memory, optionally loaded from a JSON file.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPoProvider {
    orders: HashMap<String, PurchaseOrder>,
}

impl InMemoryPoProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_orders(orders: impl IntoIterator<Item = PurchaseOrder>) -> Self {
        let mut provider = Self::new();
        for order in orders {
            provider.insert(order);
        }
        provider
    }

    /// Load a JSON array of `{"po_number", "amount", "vendor"}` objects.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let orders: Vec<PurchaseOrder> = serde_json::from_str(&content).map_err(|e| {
            InvoxError::Config(format!("invalid purchase order file {}: {}", path.display(), e))
        })?;
        Ok(Self::from_orders(orders))
    }

    pub fn insert(&mut self, order: PurchaseOrder) {
        self.orders.insert(order.po_number.trim().to_string(), order);
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

impl PoProvider for InMemoryPoProvider {
    fn lookup(&self, po_number: &str) -> Option<PurchaseOrder> {
        self.orders.get(po_number.trim()).cloned()
    }
}
