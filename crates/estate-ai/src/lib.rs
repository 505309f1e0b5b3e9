#![deny(warnings)]

//! Rule-based advisor that turns a snapshot into a suggested command.

use estate_engine::{Command, PropertyView, Snapshot};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Tuning knobs for [`suggest`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdvisorConfig {
    /// Sell a holding once its trend (percent) drops below this.
    pub sell_below_trend_pct: Decimal,
    /// Fraction of cash never spent on a purchase, in [0, 1].
    pub cash_reserve_frac: Decimal,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            sell_below_trend_pct: Decimal::new(-5, 0),
            cash_reserve_frac: Decimal::ZERO,
        }
    }
}

/// Buy preference: higher cap rate (rented listings before unrented), then
/// higher trend, then cheaper.
fn rank(a: &PropertyView, b: &PropertyView) -> Ordering {
    a.cap_rate
        .cmp(&b.cap_rate)
        .then_with(|| a.trend_pct.cmp(&b.trend_pct))
        .then_with(|| b.current_price.cmp(&a.current_price))
}

/// Suggest the next trade, or `None` to just advance time.
///
/// Sells the worst-trending holding when it falls below the configured
/// threshold; otherwise buys the best-yielding affordable, non-declining
/// listing.
pub fn suggest(snapshot: &Snapshot, cfg: &AdvisorConfig) -> Option<Command> {
    if !snapshot.state.is_active() {
        return None;
    }
    let worst_held = snapshot
        .properties
        .iter()
        .filter(|p| p.owned)
        .min_by(|a, b| a.trend_pct.cmp(&b.trend_pct));
    if let Some(p) = worst_held {
        if p.trend_pct < cfg.sell_below_trend_pct {
            debug!(id = %p.id, trend = %p.trend_pct, "advisor suggests sell");
            return Some(Command::Sell(p.id.clone()));
        }
    }

    let budget = snapshot.cash * (Decimal::ONE - cfg.cash_reserve_frac);
    let pick = snapshot
        .properties
        .iter()
        .filter(|p| !p.owned && p.current_price <= budget && p.trend_pct >= Decimal::ZERO)
        .max_by(|a, b| rank(a, b))?;
    debug!(id = %pick.id, price = %pick.current_price, "advisor suggests buy");
    Some(Command::Buy(pick.id.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use estate_core::{Category, PropertyId, Regime};
    use estate_engine::{EndReason, SessionState};
    use estate_market::MarketTemperature;
    use proptest::prelude::*;

    fn view(id: &str, price: i64, trend: i64, owned: bool) -> PropertyView {
        PropertyView {
            id: PropertyId::new(id),
            category: Category::Duplex,
            address: None,
            units: 2,
            base_price: Decimal::new(price, 0),
            current_price: Decimal::new(price, 0),
            owned,
            trend_pct: Decimal::new(trend, 0),
            net_income: None,
            cap_rate: None,
            valuation: None,
        }
    }

    fn rented(id: &str, price: i64, trend: i64, cap_rate: i64) -> PropertyView {
        PropertyView {
            cap_rate: Some(Decimal::new(cap_rate, 1)),
            ..view(id, price, trend, false)
        }
    }

    fn snapshot(cash: i64, properties: Vec<PropertyView>) -> Snapshot {
        Snapshot {
            turn: 1,
            max_turns: 10,
            date: None,
            state: SessionState::Active,
            cash: Decimal::new(cash, 0),
            holdings: properties
                .iter()
                .filter(|p| p.owned)
                .map(|p| p.id.clone())
                .collect(),
            net_worth: Decimal::new(cash, 0),
            roi: Decimal::ZERO,
            regime: Regime::Stable,
            temperature: MarketTemperature::Balanced,
            best_investment: None,
            properties,
        }
    }

    #[test]
    fn buys_best_trend_then_cheapest() {
        let snap = snapshot(
            1000,
            vec![
                view("a", 900, 1, false),
                view("b", 400, 3, false),
                view("c", 300, 3, false),
                view("d", 2000, 9, false),
            ],
        );
        let cmd = suggest(&snap, &AdvisorConfig::default());
        assert_eq!(cmd, Some(Command::Buy(PropertyId::new("c"))));
    }

    #[test]
    fn prefers_higher_cap_rate_over_trend() {
        let snap = snapshot(
            1000,
            vec![
                view("hot", 300, 9, false),
                rented("steady", 800, 0, 55),
                rented("yield", 900, 1, 72),
                rented("falling", 100, -1, 99),
            ],
        );
        let cmd = suggest(&snap, &AdvisorConfig::default());
        assert_eq!(cmd, Some(Command::Buy(PropertyId::new("yield"))));
    }

    #[test]
    fn sells_falling_holding_first() {
        let snap = snapshot(1000, vec![view("a", 500, -8, true), view("b", 100, 5, false)]);
        let cmd = suggest(&snap, &AdvisorConfig::default());
        assert_eq!(cmd, Some(Command::Sell(PropertyId::new("a"))));
    }

    #[test]
    fn skips_declining_and_unaffordable() {
        let snap = snapshot(100, vec![view("a", 50, -1, false), view("b", 500, 5, false)]);
        assert_eq!(suggest(&snap, &AdvisorConfig::default()), None);
    }

    #[test]
    fn respects_cash_reserve() {
        let snap = snapshot(1000, vec![view("a", 800, 1, false)]);
        let cfg = AdvisorConfig {
            cash_reserve_frac: Decimal::new(5, 1),
            ..AdvisorConfig::default()
        };
        assert_eq!(suggest(&snap, &cfg), None);
    }

    #[test]
    fn silent_after_session_end() {
        let mut snap = snapshot(1000, vec![view("a", 100, 1, false)]);
        snap.state = SessionState::Ended(EndReason::TimeLimitReached);
        assert_eq!(suggest(&snap, &AdvisorConfig::default()), None);
    }

    proptest! {
        #[test]
        fn suggested_buys_are_affordable(
            cash in 0i64..5_000,
            rows in proptest::collection::vec((1i64..3_000, -10i64..10, any::<bool>()), 0..12),
        ) {
            let props = rows
                .iter()
                .enumerate()
                .map(|(i, (price, trend, owned))| view(&format!("p{i}"), *price, *trend, *owned))
                .collect();
            let snap = snapshot(cash, props);
            if let Some(Command::Buy(id)) = suggest(&snap, &AdvisorConfig::default()) {
                let p = snap.property(&id).unwrap();
                prop_assert!(!p.owned);
                prop_assert!(p.current_price <= snap.cash);
            }
        }
    }
}
