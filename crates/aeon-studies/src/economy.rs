//! Theorem purchasing and the eternity-point multiplier.
//!
//! Both are count-based economies priced by [`CostFunction`]s and bought in
//! bulk through [`bulk_buy`]. Purchased theorems always land in the ledger
//! balance through [`PurchaseLedger::credit`].

use aeon_core::Decimal;
use aeon_core::bulk::{BulkMode, bulk_buy};
use aeon_core::cost::{CostFunction, GeometricCost, PiecewiseCost};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::condition::{Condition, GameFlags};
use crate::ledger::PurchaseLedger;
use crate::standard::flags;

// ---------------------------------------------------------------------------
// Wallet
// ---------------------------------------------------------------------------

/// The three currencies theorems can be bought with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TheoremCurrency {
    Antimatter,
    InfinityPoints,
    EternityPoints,
}

impl TheoremCurrency {
    pub const ALL: [TheoremCurrency; 3] = [
        TheoremCurrency::Antimatter,
        TheoremCurrency::InfinityPoints,
        TheoremCurrency::EternityPoints,
    ];
}

/// Balances of the external currencies. The engine only debits them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub antimatter: Decimal,
    pub infinity_points: Decimal,
    pub eternity_points: Decimal,
}

impl Wallet {
    pub fn balance(&self, currency: TheoremCurrency) -> Decimal {
        match currency {
            TheoremCurrency::Antimatter => self.antimatter,
            TheoremCurrency::InfinityPoints => self.infinity_points,
            TheoremCurrency::EternityPoints => self.eternity_points,
        }
    }

    fn balance_mut(&mut self, currency: TheoremCurrency) -> &mut Decimal {
        match currency {
            TheoremCurrency::Antimatter => &mut self.antimatter,
            TheoremCurrency::InfinityPoints => &mut self.infinity_points,
            TheoremCurrency::EternityPoints => &mut self.eternity_points,
        }
    }
}

// ---------------------------------------------------------------------------
// TheoremShop
// ---------------------------------------------------------------------------

/// How many theorems were bought with each currency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TheoremCounts {
    pub antimatter: u64,
    pub infinity_points: u64,
    pub eternity_points: u64,
}

impl TheoremCounts {
    pub fn get(&self, currency: TheoremCurrency) -> u64 {
        match currency {
            TheoremCurrency::Antimatter => self.antimatter,
            TheoremCurrency::InfinityPoints => self.infinity_points,
            TheoremCurrency::EternityPoints => self.eternity_points,
        }
    }

    fn get_mut(&mut self, currency: TheoremCurrency) -> &mut u64 {
        match currency {
            TheoremCurrency::Antimatter => &mut self.antimatter,
            TheoremCurrency::InfinityPoints => &mut self.infinity_points,
            TheoremCurrency::EternityPoints => &mut self.eternity_points,
        }
    }

    pub fn total(&self) -> u64 {
        self.antimatter + self.infinity_points + self.eternity_points
    }
}

#[derive(Debug, Clone)]
pub struct TheoremShop {
    antimatter_cost: GeometricCost,
    infinity_cost: GeometricCost,
    eternity_cost: GeometricCost,
    /// Must hold before theorems may be bought with eternity points.
    eternity_gate: Condition,
    counts: TheoremCounts,
}

impl Default for TheoremShop {
    fn default() -> Self {
        Self::new()
    }
}

impl TheoremShop {
    pub fn new() -> Self {
        let am: Decimal = Decimal::from_mantissa_exponent(1.0, 20000);
        Self {
            antimatter_cost: GeometricCost::new(am, am),
            infinity_cost: GeometricCost::new(Decimal::ONE, Decimal::from_mantissa_exponent(1.0, 100)),
            eternity_cost: GeometricCost::new(Decimal::ONE, Decimal::from(2u32)),
            eternity_gate: Condition::Any(vec![
                Condition::counter_at_least(flags::TIME_DIMENSIONS_BOUGHT, 1u32),
                Condition::counter_at_least(flags::REALITIES, 1u32),
            ]),
            counts: TheoremCounts::default(),
        }
    }

    /// Restore previously persisted counts.
    pub fn with_counts(mut self, counts: TheoremCounts) -> Self {
        self.counts = counts;
        self
    }

    pub fn with_eternity_gate(mut self, gate: Condition) -> Self {
        self.eternity_gate = gate;
        self
    }

    fn curve(&self, currency: TheoremCurrency) -> &GeometricCost {
        match currency {
            TheoremCurrency::Antimatter => &self.antimatter_cost,
            TheoremCurrency::InfinityPoints => &self.infinity_cost,
            TheoremCurrency::EternityPoints => &self.eternity_cost,
        }
    }

    pub fn counts(&self) -> TheoremCounts {
        self.counts
    }

    /// Price of the next theorem in `currency`.
    pub fn cost(&self, currency: TheoremCurrency) -> Decimal {
        self.curve(currency).cost_after(self.counts.get(currency))
    }

    pub fn total_purchased(&self) -> u64 {
        self.counts.total()
    }

    fn unlocked(&self, currency: TheoremCurrency, flags: &GameFlags, ledger: &PurchaseLedger) -> bool {
        currency != TheoremCurrency::EternityPoints || self.eternity_gate.evaluate(flags, ledger)
    }

    pub fn can_buy(
        &self,
        currency: TheoremCurrency,
        wallet: &Wallet,
        flags: &GameFlags,
        ledger: &PurchaseLedger,
    ) -> bool {
        self.unlocked(currency, flags, ledger) && wallet.balance(currency) >= self.cost(currency)
    }

    /// Buy one theorem.
    pub fn buy(
        &mut self,
        currency: TheoremCurrency,
        wallet: &mut Wallet,
        flags: &GameFlags,
        ledger: &mut PurchaseLedger,
    ) -> bool {
        if !self.can_buy(currency, wallet, flags, ledger) {
            return false;
        }
        let cost = self.cost(currency);
        *wallet.balance_mut(currency) -= cost;
        *self.counts.get_mut(currency) += 1;
        ledger.credit(Decimal::ONE);
        debug!(?currency, %cost, "theorem purchased");
        true
    }

    /// Buy as many theorems as `currency` affords. Returns the quantity.
    pub fn buy_max(
        &mut self,
        currency: TheoremCurrency,
        wallet: &mut Wallet,
        flags: &GameFlags,
        ledger: &mut PurchaseLedger,
    ) -> u64 {
        if !self.unlocked(currency, flags, ledger) {
            return 0;
        }
        let owned = self.counts.get(currency);
        let Some(bulk) = bulk_buy(wallet.balance(currency), self.curve(currency), owned, BulkMode::Cumulative)
        else {
            return 0;
        };
        *wallet.balance_mut(currency) -= bulk.price;
        *self.counts.get_mut(currency) += bulk.quantity;
        ledger.credit(Decimal::from(bulk.quantity));
        debug!(?currency, quantity = bulk.quantity, price = %bulk.price, "theorems bulk purchased");
        bulk.quantity
    }

    /// [`buy_max`](Self::buy_max) over every currency.
    pub fn buy_max_all(&mut self, wallet: &mut Wallet, flags: &GameFlags, ledger: &mut PurchaseLedger) -> u64 {
        TheoremCurrency::ALL
            .into_iter()
            .map(|c| self.buy_max(c, wallet, flags, ledger))
            .sum()
    }

    pub fn reset(&mut self) {
        self.counts = TheoremCounts::default();
    }
}

// ---------------------------------------------------------------------------
// EpMultiplier
// ---------------------------------------------------------------------------

/// Repeatable eternity-point upgrade multiplying EP gain by 5 per level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpMultiplier {
    curve: PiecewiseCost,
    count: u64,
}

impl Default for EpMultiplier {
    fn default() -> Self {
        Self::new()
    }
}

impl EpMultiplier {
    pub fn new() -> Self {
        Self {
            curve: PiecewiseCost::eternity_multiplier(),
            count: 0,
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn cost(&self) -> Decimal {
        self.curve.cost_after(self.count)
    }

    pub fn effect(&self) -> Decimal {
        Decimal::pow(5.0, self.count as f64)
    }

    pub fn is_affordable(&self, eternity_points: Decimal) -> bool {
        eternity_points >= self.cost()
    }

    pub fn purchase(&mut self, eternity_points: &mut Decimal) -> bool {
        let cost = self.cost();
        if *eternity_points < cost {
            return false;
        }
        *eternity_points -= cost;
        self.count += 1;
        true
    }

    /// Buy as many levels as affordable. Returns the quantity.
    pub fn buy_max(&mut self, eternity_points: &mut Decimal) -> u64 {
        let Some(bulk) = bulk_buy(*eternity_points, &self.curve, self.count, BulkMode::Cumulative) else {
            return 0;
        };
        *eternity_points -= bulk.price;
        self.count += bulk.quantity;
        debug!(quantity = bulk.quantity, level = self.count, "ep multiplier bulk purchased");
        bulk.quantity
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeon_core::test_utils::dec;

    fn td_bought() -> GameFlags {
        GameFlags::new().with_counter(flags::TIME_DIMENSIONS_BOUGHT, 1u32)
    }

    #[test]
    fn theorem_prices_start_at_base() {
        let shop = TheoremShop::new();
        assert_eq!(shop.cost(TheoremCurrency::Antimatter).exponent(), 20000);
        assert_eq!(shop.cost(TheoremCurrency::InfinityPoints), Decimal::ONE);
        assert_eq!(shop.cost(TheoremCurrency::EternityPoints), Decimal::ONE);
    }

    #[test]
    fn buying_with_ip_scales_price() {
        let mut shop = TheoremShop::new();
        let mut wallet = Wallet {
            infinity_points: dec("1e150"),
            ..Wallet::default()
        };
        let mut ledger = PurchaseLedger::new();
        let flags = GameFlags::new();
        assert!(shop.buy(TheoremCurrency::InfinityPoints, &mut wallet, &flags, &mut ledger));
        assert!(shop.buy(TheoremCurrency::InfinityPoints, &mut wallet, &flags, &mut ledger));
        assert!(!shop.buy(TheoremCurrency::InfinityPoints, &mut wallet, &flags, &mut ledger));
        assert_eq!(ledger.balance(), Decimal::from(2u32));
        assert_eq!(shop.cost(TheoremCurrency::InfinityPoints).exponent(), 200);
    }

    #[test]
    fn eternity_points_need_a_time_dimension() {
        let mut shop = TheoremShop::new();
        let mut wallet = Wallet {
            eternity_points: Decimal::from(100u32),
            ..Wallet::default()
        };
        let mut ledger = PurchaseLedger::new();
        let none = GameFlags::new();
        assert!(!shop.buy(TheoremCurrency::EternityPoints, &mut wallet, &none, &mut ledger));
        assert_eq!(shop.buy_max(TheoremCurrency::EternityPoints, &mut wallet, &none, &mut ledger), 0);

        let realities = GameFlags::new().with_counter(flags::REALITIES, 1u32);
        assert!(shop.can_buy(TheoremCurrency::EternityPoints, &wallet, &realities, &ledger));
    }

    #[test]
    fn buy_max_with_eternity_points() {
        let mut shop = TheoremShop::new();
        let mut wallet = Wallet {
            eternity_points: Decimal::from(100u32),
            ..Wallet::default()
        };
        let mut ledger = PurchaseLedger::new();
        // 1 + 2 + 4 + 8 + 16 + 32 = 63 <= 100 < 127
        let bought = shop.buy_max(TheoremCurrency::EternityPoints, &mut wallet, &td_bought(), &mut ledger);
        assert_eq!(bought, 6);
        assert_eq!(wallet.eternity_points, Decimal::from(37u32));
        assert_eq!(ledger.balance(), Decimal::from(6u32));
        assert_eq!(shop.total_purchased(), 6);
    }

    #[test]
    fn buy_max_all_spends_every_currency() {
        let mut shop = TheoremShop::new();
        let mut wallet = Wallet {
            antimatter: dec("2e20000"),
            infinity_points: dec("5"),
            eternity_points: Decimal::from(3u32),
        };
        let mut ledger = PurchaseLedger::new();
        let total = shop.buy_max_all(&mut wallet, &td_bought(), &mut ledger);
        assert_eq!(total, 1 + 1 + 2);
        assert_eq!(shop.counts().antimatter, 1);
        shop.reset();
        assert_eq!(shop.total_purchased(), 0);
    }

    #[test]
    fn ep_multiplier_levels() {
        let mut mult = EpMultiplier::new();
        let mut ep = Decimal::from(600u32);
        assert_eq!(mult.cost(), Decimal::from(500u32));
        assert!(mult.purchase(&mut ep));
        assert_eq!(ep, Decimal::from(100u32));
        assert!(!mult.purchase(&mut ep));
        assert_eq!(mult.effect(), Decimal::from(5u32));
        mult.reset();
        assert_eq!(mult.effect(), Decimal::ONE);
    }

    #[test]
    fn ep_multiplier_buy_max_is_cumulative() {
        let mut mult = EpMultiplier::new();
        // 500 + 25_000 + 1_250_000 = 1_275_500
        let mut ep = Decimal::from(1_300_000u32);
        assert_eq!(mult.buy_max(&mut ep), 3);
        assert_eq!(ep, Decimal::from(24_500u32));
        assert_eq!(mult.count(), 3);
        assert_eq!(mult.buy_max(&mut ep), 0);
    }
}
