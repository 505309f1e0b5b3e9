#![deny(warnings)]

//! Market model for Estate Tycoon.
//!
//! Prices follow a bounded random walk:
//! - each tick draws `u ~ U[-1, 1]` per property and scales it by the
//!   property's volatility, plus the drift of the current regime
//! - an optional seasonal term moves prices with the calendar month
//! - the change is clamped to the category's `[-max_decline, +max_gain]`
//! - the new price is rounded to cents and clamped to the configured
//!   floor/ceiling around the base price
//!
//! The random generator is owned by the model and injected at construction,
//! so a fixed seed replays the same price path.

use chrono::Datelike;
use estate_core::{
    Catalog, CatalogEntry, CategoryBounds, GameConfig, Regime, RegimeConfig, ValidationError,
    MIN_PRICE,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

mod generation;

pub use generation::generate_catalog;

/// Average trend (percent) above which the market counts as hot.
pub const HOT_TREND_PCT: Decimal = Decimal::from_parts(2, 0, 0, false, 0);
/// Average trend (percent) below which the market counts as cold.
pub const COLD_TREND_PCT: Decimal = Decimal::from_parts(2, 0, 0, true, 0);

/// Coarse reading of recent price movement across the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketTemperature {
    Hot,
    Balanced,
    Cold,
}

/// Fixed per-slot parameters captured at construction.
#[derive(Clone, Debug)]
struct SlotParams {
    volatility: f32,
    bounds: CategoryBounds,
    floor: Decimal,
    ceiling: Decimal,
}

/// Stochastic price process over a closed catalog.
#[derive(Clone, Debug)]
pub struct MarketModel<R = ChaCha8Rng> {
    rng: R,
    slots: Vec<SlotParams>,
    history: Vec<Vec<Decimal>>,
    tick: u64,
    regime: Regime,
    regime_cfg: Option<RegimeConfig>,
    seasonality: Option<Vec<f32>>,
    /// Calendar month (0 = January) of tick 0.
    start_month: u32,
}

impl MarketModel<ChaCha8Rng> {
    /// Model driven by a ChaCha8 stream seeded from `seed`.
    pub fn seeded(
        cfg: &GameConfig,
        entries: &[CatalogEntry],
        seed: u64,
    ) -> Result<Self, ValidationError> {
        Self::new(cfg, entries, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> MarketModel<R> {
    /// Build a model for `entries`, which must be in catalog slot order.
    pub fn new(
        cfg: &GameConfig,
        entries: &[CatalogEntry],
        rng: R,
    ) -> Result<Self, ValidationError> {
        let floor_ratio =
            Decimal::from_f32(cfg.price_limits.floor_ratio).ok_or(ValidationError::NonFinite)?;
        let ceiling_ratio =
            Decimal::from_f32(cfg.price_limits.ceiling_ratio).ok_or(ValidationError::NonFinite)?;
        let mut slots = Vec::with_capacity(entries.len());
        let mut history = Vec::with_capacity(entries.len());
        for e in entries {
            let bounds = cfg
                .bounds_for(e.category)
                .ok_or(ValidationError::MissingBounds(e.category))?;
            let out_of_range = || ValidationError::AmountOutOfRange(e.id.0.clone());
            let floor = e
                .base_price
                .checked_mul(floor_ratio)
                .ok_or_else(out_of_range)?
                .round_dp(2)
                .max(MIN_PRICE);
            let ceiling = e
                .base_price
                .checked_mul(ceiling_ratio)
                .ok_or_else(out_of_range)?
                .round_dp(2)
                .max(floor);
            slots.push(SlotParams {
                volatility: e.volatility,
                bounds,
                floor,
                ceiling,
            });
            history.push(vec![e.base_price]);
        }
        let regime = cfg.regime.as_ref().map(|r| r.initial).unwrap_or_default();
        Ok(Self {
            rng,
            slots,
            history,
            tick: 0,
            regime,
            regime_cfg: cfg.regime.clone(),
            seasonality: cfg.seasonality.clone(),
            start_month: cfg.start_date.map(|d| d.month0()).unwrap_or(0),
        })
    }

    /// Ticks advanced so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn regime(&self) -> Regime {
        self.regime
    }

    /// Volatility of the property in `slot`.
    pub fn volatility(&self, slot: usize) -> Option<f32> {
        self.slots.get(slot).map(|s| s.volatility)
    }

    /// Prices observed for `slot`, oldest first, starting with the base price.
    pub fn price_history(&self, slot: usize) -> &[Decimal] {
        self.history.get(slot).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Reprice every property in `catalog` and advance the tick counter.
    pub fn advance_tick(&mut self, catalog: &mut Catalog) {
        self.step_regime();
        let drift = self
            .regime_cfg
            .as_ref()
            .map(|r| r.drift(self.regime))
            .unwrap_or(0.0)
            + self.seasonal_drift();
        for ((property, params), history) in catalog
            .iter_mut()
            .zip(&self.slots)
            .zip(self.history.iter_mut())
        {
            let u: f32 = self.rng.gen_range(-1.0f32..=1.0);
            let change = bounded_change(u * params.volatility + drift, &params.bounds);
            // Only a rise can overflow, and that ends at the ceiling anyway.
            let next = Decimal::ONE
                .checked_add(change)
                .and_then(|factor| property.current_price().checked_mul(factor))
                .map_or(params.ceiling, |p| p.round_dp(2))
                .clamp(params.floor, params.ceiling);
            trace!(id = %property.id(), %change, %next, "repriced");
            property.reprice(next);
            history.push(property.current_price());
        }
        self.tick += 1;
        debug!(tick = self.tick, regime = ?self.regime, "market advanced");
    }

    /// Month-over-month percent change for `slot`, blended 70/30 with the
    /// previous change once three observations exist.
    pub fn trend_pct(&self, slot: usize) -> Decimal {
        let h = self.price_history(slot);
        let n = h.len();
        if n < 2 {
            return Decimal::ZERO;
        }
        let current = pct_change(h[n - 2], h[n - 1]);
        if n < 3 {
            return current.round_dp(2);
        }
        let previous = pct_change(h[n - 3], h[n - 2]);
        (current * Decimal::new(7, 1) + previous * Decimal::new(3, 1)).round_dp(2)
    }

    /// Classify the catalog-wide average trend.
    pub fn temperature(&self) -> MarketTemperature {
        if self.slots.is_empty() {
            return MarketTemperature::Balanced;
        }
        let total: Decimal = (0..self.slots.len()).map(|s| self.trend_pct(s)).sum();
        let avg = total / Decimal::from(self.slots.len());
        if avg > HOT_TREND_PCT {
            MarketTemperature::Hot
        } else if avg < COLD_TREND_PCT {
            MarketTemperature::Cold
        } else {
            MarketTemperature::Balanced
        }
    }

    /// Relative move of the seasonal level from this tick's month to the next.
    fn seasonal_drift(&self) -> f32 {
        let Some(factors) = &self.seasonality else {
            return 0.0;
        };
        let month = |tick: u64| ((u64::from(self.start_month) + tick) % 12) as usize;
        match (factors.get(month(self.tick)), factors.get(month(self.tick + 1))) {
            (Some(now), Some(next)) if *now > 0.0 => next / now - 1.0,
            _ => 0.0,
        }
    }

    fn step_regime(&mut self) {
        let Some(cfg) = &self.regime_cfg else {
            return;
        };
        let roll: f32 = self.rng.gen();
        if roll >= cfg.switch_probability {
            return;
        }
        let others = match self.regime {
            Regime::Bull => [Regime::Bear, Regime::Stable],
            Regime::Bear => [Regime::Bull, Regime::Stable],
            Regime::Stable => [Regime::Bull, Regime::Bear],
        };
        self.regime = others[self.rng.gen_range(0..2)];
        debug!(regime = ?self.regime, "market regime changed");
    }
}

fn bounded_change(raw: f32, bounds: &CategoryBounds) -> Decimal {
    let clamped = if raw.is_finite() {
        raw.clamp(-bounds.max_decline, bounds.max_gain)
    } else {
        0.0
    };
    Decimal::from_f32(clamped)
        .unwrap_or(Decimal::ZERO)
        .round_dp(4)
}

fn pct_change(from: Decimal, to: Decimal) -> Decimal {
    if from.is_zero() {
        return Decimal::ZERO;
    }
    (to - from) / from * Decimal::ONE_HUNDRED
}

#[cfg(test)]
mod tests {
    use super::*;
use estate_core::{Category, PriceLimits, PropertyId};
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn config(decline: f32, gain: f32) -> GameConfig {
        let mut bounds = BTreeMap::new();
        for c in Category::ALL {
            bounds.insert(
                c,
                CategoryBounds {
                    max_decline: decline,
                    max_gain: gain,
                },
            );
        }
        GameConfig {
            starting_cash: Decimal::new(1000, 0),
            win_net_worth: Decimal::new(10_000, 0),
            max_turns: 100,
            seed: Some(1),
            volatility_bounds: bounds,
            price_limits: PriceLimits {
                floor_ratio: 0.1,
                ceiling_ratio: 10.0,
            },
            catalog: vec![],
            generate: None,
            regime: None,
            start_date: None,
            seasonality: None,
        }
    }

    fn entries(vol: f32) -> Vec<CatalogEntry> {
        vec![
            CatalogEntry {
                id: PropertyId::new("a"),
                category: Category::Duplex,
                base_price: Decimal::new(500, 0),
                volatility: vol,
                address: None,
                units: 2,
                income: None,
            },
            CatalogEntry {
                id: PropertyId::new("b"),
                category: Category::Commercial,
                base_price: Decimal::new(250_000, 0),
                volatility: vol,
                address: None,
                units: 1,
                income: None,
            },
        ]
    }

    fn run(seed: u64, ticks: usize) -> Vec<Vec<Decimal>> {
        let cfg = config(0.15, 0.15);
        let es = entries(0.1);
        let mut catalog = Catalog::from_entries(&es).unwrap();
        let mut m = MarketModel::seeded(&cfg, &es, seed).unwrap();
        for _ in 0..ticks {
            m.advance_tick(&mut catalog);
        }
        (0..es.len()).map(|s| m.price_history(s).to_vec()).collect()
    }

    #[test]
    fn same_seed_same_path() {
        assert_eq!(run(42, 50), run(42, 50));
        assert_ne!(run(42, 50), run(43, 50));
    }

    #[test]
    fn tick_counts_and_history_grows() {
        let cfg = config(0.15, 0.15);
        let es = entries(0.1);
        let mut catalog = Catalog::from_entries(&es).unwrap();
        let mut m = MarketModel::seeded(&cfg, &es, 9).unwrap();
        assert_eq!(m.tick(), 0);
        assert_eq!(m.trend_pct(0), Decimal::ZERO);
        m.advance_tick(&mut catalog);
        m.advance_tick(&mut catalog);
        assert_eq!(m.tick(), 2);
        assert_eq!(m.price_history(0).len(), 3);
        assert_eq!(
            *m.price_history(1).last().unwrap(),
            catalog.get(&PropertyId::new("b")).unwrap().current_price()
        );
        assert!(m.price_history(7).is_empty());
    }

    #[test]
    fn zero_volatility_keeps_prices() {
        let cfg = config(0.15, 0.15);
        let es = entries(0.0);
        let mut catalog = Catalog::from_entries(&es).unwrap();
        let mut m = MarketModel::seeded(&cfg, &es, 3).unwrap();
        for _ in 0..10 {
            m.advance_tick(&mut catalog);
        }
        assert_eq!(
            catalog.get(&PropertyId::new("a")).unwrap().current_price(),
            Decimal::new(500, 0)
        );
        assert_eq!(m.temperature(), MarketTemperature::Balanced);
    }

    #[test]
    fn trend_blends_momentum() {
        let cfg = config(0.15, 0.15);
        let es = entries(0.1);
        let mut m = MarketModel::seeded(&cfg, &es, 3).unwrap();
        m.history[0] = vec![Decimal::new(100, 0), Decimal::new(110, 0)];
        assert_eq!(m.trend_pct(0), Decimal::new(10, 0));
        m.history[0].push(Decimal::new(121, 0));
        // 0.7 * 10% + 0.3 * 10%
        assert_eq!(m.trend_pct(0), Decimal::new(10, 0));
        m.history[0].push(Decimal::new(121, 0));
        assert_eq!(m.trend_pct(0), Decimal::new(3, 0));
    }

    #[test]
    fn bull_regime_with_full_drift_hits_ceiling_of_bounds() {
        let mut cfg = config(0.05, 0.05);
        cfg.regime = Some(RegimeConfig {
            initial: Regime::Bull,
            switch_probability: 0.0,
            bull_drift: 1.0,
            bear_drift: -1.0,
        });
        let es = entries(0.0);
        let mut catalog = Catalog::from_entries(&es).unwrap();
        let mut m = MarketModel::seeded(&cfg, &es, 5).unwrap();
        m.advance_tick(&mut catalog);
        assert_eq!(m.regime(), Regime::Bull);
        assert_eq!(
            catalog.get(&PropertyId::new("a")).unwrap().current_price(),
            Decimal::new(525, 0)
        );
        assert_eq!(m.temperature(), MarketTemperature::Hot);
    }

    #[test]
    fn regime_always_switches_with_probability_one() {
        let mut cfg = config(0.05, 0.05);
        cfg.regime = Some(RegimeConfig {
            initial: Regime::Stable,
            switch_probability: 1.0,
            bull_drift: 0.01,
            bear_drift: -0.01,
        });
        let es = entries(0.1);
        let mut catalog = Catalog::from_entries(&es).unwrap();
        let mut m = MarketModel::seeded(&cfg, &es, 5).unwrap();
        let mut last = m.regime();
        for _ in 0..20 {
            m.advance_tick(&mut catalog);
            assert_ne!(m.regime(), last);
            last = m.regime();
        }
    }

    #[test]
    fn seasonality_follows_calendar_month() {
        let mut cfg = config(0.15, 0.15);
        let mut factors = vec![1.0; 12];
        factors[5] = 1.1; // June
        cfg.seasonality = Some(factors);
        cfg.start_date = chrono::NaiveDate::from_ymd_opt(2024, 5, 1);
        let es = entries(0.0);
        let mut catalog = Catalog::from_entries(&es).unwrap();
        let mut m = MarketModel::seeded(&cfg, &es, 8).unwrap();
        let a = PropertyId::new("a");
        m.advance_tick(&mut catalog); // May -> June
        assert_eq!(catalog.get(&a).unwrap().current_price(), Decimal::new(550, 0));
        m.advance_tick(&mut catalog); // June -> July
        let back = catalog.get(&a).unwrap().current_price();
        assert!(back > Decimal::new(499, 0) && back < Decimal::new(501, 0));
        m.advance_tick(&mut catalog); // flat months
        assert_eq!(catalog.get(&a).unwrap().current_price(), back);
    }

    #[test]
    fn prices_near_decimal_limit_stop_at_ceiling() {
        let cfg = config(0.15, 1.0);
        let es = vec![CatalogEntry {
            base_price: Decimal::MAX / Decimal::new(20, 0),
            ..entries(1.0).remove(0)
        }];
        let mut catalog = Catalog::from_entries(&es).unwrap();
        let mut m = MarketModel::seeded(&cfg, &es, 2).unwrap();
        for _ in 0..50 {
            m.advance_tick(&mut catalog);
        }
        let p = catalog.get(&PropertyId::new("a")).unwrap().current_price();
        assert!(p <= (es[0].base_price * Decimal::TEN).round_dp(2));
        assert!(p > Decimal::ZERO);
    }

    #[test]
    fn overflowing_limits_are_an_error() {
        let mut cfg = config(0.15, 0.15);
        cfg.price_limits.ceiling_ratio = 4.0;
        let es = vec![CatalogEntry {
            base_price: Decimal::MAX / Decimal::TWO,
            ..entries(0.1).remove(0)
        }];
        assert_eq!(
            MarketModel::seeded(&cfg, &es, 1).unwrap_err(),
            ValidationError::AmountOutOfRange("a".to_string())
        );
    }

    proptest! {
        #[test]
        fn prices_stay_positive_and_bounded(
            seed in any::<u64>(),
            vol in 0.0f32..1.0,
            decline in 0.0f32..0.99,
        ) {
            let cfg = config(decline, 0.5);
            let es = entries(vol);
            let mut catalog = Catalog::from_entries(&es).unwrap();
            let mut m = MarketModel::seeded(&cfg, &es, seed).unwrap();
            for _ in 0..200 {
                let before: Vec<Decimal> = catalog.iter().map(|p| p.current_price()).collect();
                m.advance_tick(&mut catalog);
                for (p, prev) in catalog.iter().zip(before) {
                    prop_assert!(p.current_price() > Decimal::ZERO);
                    let floor = (p.base_price() * Decimal::new(1, 1)).round_dp(2);
                    prop_assert!(p.current_price() >= floor);
                    prop_assert!(p.current_price() <= p.base_price() * Decimal::TEN);
                    // a single tick never rises by more than max_gain (plus rounding)
                    let cap = prev * Decimal::new(15, 1) + Decimal::new(1, 2);
                    prop_assert!(p.current_price() <= cap);
                }
            }
        }
    }
}
