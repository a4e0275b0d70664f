//! Transactional module registry

use std::fmt;
use std::str::FromStr;

/// Transactional document modules that allocate sequential DocNos.
///
/// Each carries the two-or-three letter code that prefixes its DocNos and
/// the module name reported to the sync notifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    Purchase,
    PurchaseOrder,
    PurchaseReturn,
    StockAdjustment,
    StockTransfer,
    StockPickupProduct,
    StockReturnProduct,
    StockReceiveProduct,
}

impl ModuleKind {
    pub const ALL: [ModuleKind; 8] = [
        ModuleKind::Purchase,
        ModuleKind::PurchaseOrder,
        ModuleKind::PurchaseReturn,
        ModuleKind::StockAdjustment,
        ModuleKind::StockTransfer,
        ModuleKind::StockPickupProduct,
        ModuleKind::StockReturnProduct,
        ModuleKind::StockReceiveProduct,
    ];

    /// DocNo prefix code
    pub fn code(&self) -> &'static str {
        match self {
            ModuleKind::Purchase => "PU",
            ModuleKind::PurchaseOrder => "PO",
            ModuleKind::PurchaseReturn => "PT",
            ModuleKind::StockAdjustment => "AJ",
            ModuleKind::StockTransfer => "TF",
            ModuleKind::StockPickupProduct => "IM",
            ModuleKind::StockReturnProduct => "IR",
            ModuleKind::StockReceiveProduct => "IF",
        }
    }

    /// Name used when marking the module dirty
    pub fn name(&self) -> &'static str {
        match self {
            ModuleKind::Purchase => "purchase",
            ModuleKind::PurchaseOrder => "purchaseorder",
            ModuleKind::PurchaseReturn => "purchaseReturn",
            ModuleKind::StockAdjustment => "stockAdjustment",
            ModuleKind::StockTransfer => "stockTransfer",
            ModuleKind::StockPickupProduct => "stockPickupProduct",
            ModuleKind::StockReturnProduct => "stockReturnProduct",
            ModuleKind::StockReceiveProduct => "stockReceiveProduct",
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModuleKind {
    type Err = String;

    /// Accepts the module name (any case) or the DocNo code
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModuleKind::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s) || m.code().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown module: {}", s))
    }
}
