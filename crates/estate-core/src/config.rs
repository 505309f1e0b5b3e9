//! Session configuration: starting conditions, catalog and market bounds.

use crate::{Catalog, CatalogEntry, Category, ValidationError, MAX_AMOUNT};
use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Per-category limits on a single tick's percentage change.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryBounds {
    /// Largest allowed drop as a fraction in [0, 1), e.g. 0.15 = -15%.
    pub max_decline: f32,
    /// Largest allowed rise as a fraction (>= 0), e.g. 0.15 = +15%.
    pub max_gain: f32,
}

/// Absolute price clamp, relative to each property's base price.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceLimits {
    /// Lowest price as a multiple of base price (> 0).
    pub floor_ratio: f32,
    /// Highest price as a multiple of base price (>= floor_ratio).
    pub ceiling_ratio: f32,
}

/// Direction of the overall market.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    Bull,
    Bear,
    #[default]
    Stable,
}

/// Optional market regime process layered over the random walk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegimeConfig {
    /// Regime at tick 0.
    #[serde(default)]
    pub initial: Regime,
    /// Chance per tick of moving to one of the other two regimes.
    pub switch_probability: f32,
    /// Drift added to every change while bullish (fraction, usually > 0).
    pub bull_drift: f32,
    /// Drift added to every change while bearish (fraction, usually < 0).
    pub bear_drift: f32,
}

impl RegimeConfig {
    /// Drift contributed by `regime`.
    pub fn drift(&self, regime: Regime) -> f32 {
        match regime {
            Regime::Bull => self.bull_drift,
            Regime::Bear => self.bear_drift,
            Regime::Stable => 0.0,
        }
    }
}

/// Request to synthesize a catalog instead of listing it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerateSpec {
    /// Listings per category.
    pub per_category: u32,
    /// Volatility assigned to every generated listing.
    pub volatility: f32,
}

/// Everything needed to start a session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameConfig {
    /// Cash at turn 0 (> 0).
    pub starting_cash: Decimal,
    /// Net worth at which the player wins.
    pub win_net_worth: Decimal,
    /// Turn at which the session ends regardless of portfolio.
    pub max_turns: u32,
    /// Seed for the market RNG; a fresh one is drawn when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Per-tick change bounds keyed by category.
    pub volatility_bounds: BTreeMap<Category, CategoryBounds>,
    /// Absolute price clamp.
    pub price_limits: PriceLimits,
    /// Explicit catalog in display order.
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
    /// Generated catalog, appended after the explicit entries.
    #[serde(default)]
    pub generate: Option<GenerateSpec>,
    /// Optional bull/bear regime process.
    #[serde(default)]
    pub regime: Option<RegimeConfig>,
    /// Calendar date of turn 0; one turn is one month.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Relative price level per calendar month, January first. Each tick
    /// adds the month-over-month ratio of these factors to the change.
    #[serde(default)]
    pub seasonality: Option<Vec<f32>>,
}

impl GameConfig {
    /// Parse a YAML scenario and validate it.
    pub fn from_yaml_str(text: &str) -> Result<Self, ValidationError> {
        let cfg: GameConfig =
            serde_yaml::from_str(text).map_err(|e| ValidationError::Parse(e.to_string()))?;
        validate_config(&cfg)?;
        Ok(cfg)
    }

    /// Bounds for `category`, if configured.
    pub fn bounds_for(&self, category: Category) -> Option<CategoryBounds> {
        self.volatility_bounds.get(&category).copied()
    }

    /// Whether `id` has the form the generator assigns (`<category>-<n>`,
    /// `n` within the configured count).
    pub fn is_generated_id(&self, id: &str) -> bool {
        let Some(g) = &self.generate else {
            return false;
        };
        let Some((slug, n)) = id.rsplit_once('-') else {
            return false;
        };
        Category::ALL.iter().any(|c| c.slug() == slug)
            && n.parse::<u32>().is_ok_and(|n| (1..=g.per_category).contains(&n))
    }
}

/// Starting-cash presets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn starting_cash(self) -> Decimal {
        match self {
            Difficulty::Easy => Decimal::new(5_000_000, 0),
            Difficulty::Medium => Decimal::new(2_500_000, 0),
            Difficulty::Hard => Decimal::new(1_000_000, 0),
        }
    }
}

impl FromStr for Difficulty {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(ValidationError::Parse(format!("unknown difficulty: {other}"))),
        }
    }
}

fn validate_fraction(v: f32) -> bool {
    v.is_finite() && (0.0..=1.0).contains(&v)
}

fn validate_bounds(category: Category, b: &CategoryBounds) -> Result<(), ValidationError> {
    if !(b.max_decline.is_finite() && b.max_gain.is_finite()) {
        return Err(ValidationError::NonFinite);
    }
    // A decline of 100% would allow a zero price before clamping.
    if !(0.0..1.0).contains(&b.max_decline) || b.max_gain < 0.0 {
        return Err(ValidationError::InvalidBounds(category));
    }
    Ok(())
}

fn validate_income(e: &CatalogEntry) -> Result<(), ValidationError> {
    let Some(income) = &e.income else {
        return Ok(());
    };
    let invalid = || ValidationError::InvalidIncome(e.id.0.clone());
    if income.rent_per_unit < Decimal::ZERO
        || !(Decimal::ZERO..=Decimal::ONE).contains(&income.expense_ratio)
        || !(Decimal::ZERO..=Decimal::ONE_HUNDRED).contains(&income.management_fee_pct)
    {
        return Err(invalid());
    }
    income
        .rent_per_unit
        .checked_mul(Decimal::from(e.units))
        .and_then(|v| v.checked_mul(Decimal::from(12)))
        .filter(|gross| *gross <= MAX_AMOUNT)
        .ok_or_else(|| ValidationError::AmountOutOfRange(e.id.0.clone()))?;
    Ok(())
}

/// Validate catalog rows against the configured bounds and price limits.
///
/// Every price a row can reach lies in `[floor, max(base, ceiling)]`, so
/// bounding the sum of those maxima plus starting cash keeps all portfolio
/// arithmetic within [`MAX_AMOUNT`].
pub fn validate_entries(
    entries: &[CatalogEntry],
    cfg: &GameConfig,
) -> Result<(), ValidationError> {
    // Duplicate ids and prices are checked by the catalog builder.
    Catalog::from_entries(entries)?;
    let ceiling_ratio =
        Decimal::from_f32(cfg.price_limits.ceiling_ratio).ok_or(ValidationError::NonFinite)?;
    let mut total = cfg.starting_cash;
    for e in entries {
        if !validate_fraction(e.volatility) {
            return Err(ValidationError::InvalidVolatility(e.id.0.clone()));
        }
        if !cfg.volatility_bounds.contains_key(&e.category) {
            return Err(ValidationError::MissingBounds(e.category));
        }
        validate_income(e)?;
        let peak = e
            .base_price
            .checked_mul(ceiling_ratio)
            .map(|ceiling| ceiling.max(e.base_price))
            .filter(|peak| *peak <= MAX_AMOUNT)
            .ok_or_else(|| ValidationError::AmountOutOfRange(e.id.0.clone()))?;
        total = total
            .checked_add(peak)
            .filter(|t| *t <= MAX_AMOUNT)
            .ok_or_else(|| ValidationError::AmountOutOfRange("catalog total".to_string()))?;
    }
    Ok(())
}

/// Validate a configuration, including catalog cross-references.
pub fn validate_config(cfg: &GameConfig) -> Result<(), ValidationError> {
    if cfg.starting_cash <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveCash);
    }
    if cfg.starting_cash > MAX_AMOUNT {
        return Err(ValidationError::AmountOutOfRange("starting_cash".to_string()));
    }
    if cfg.win_net_worth <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveThreshold);
    }
    if cfg.max_turns == 0 {
        return Err(ValidationError::ZeroTurns);
    }
    for (category, b) in &cfg.volatility_bounds {
        validate_bounds(*category, b)?;
    }
    let limits = &cfg.price_limits;
    if !(limits.floor_ratio.is_finite() && limits.ceiling_ratio.is_finite()) {
        return Err(ValidationError::NonFinite);
    }
    if limits.floor_ratio <= 0.0 || limits.ceiling_ratio < limits.floor_ratio {
        return Err(ValidationError::InvalidPriceLimits);
    }
    if let Some(regime) = &cfg.regime {
        if !validate_fraction(regime.switch_probability) {
            return Err(ValidationError::InvalidProbability);
        }
        if !(regime.bull_drift.is_finite() && regime.bear_drift.is_finite()) {
            return Err(ValidationError::NonFinite);
        }
    }
    if let Some(factors) = &cfg.seasonality {
        if factors.len() != 12 || !factors.iter().all(|f| f.is_finite() && *f > 0.0) {
            return Err(ValidationError::InvalidSeasonality);
        }
    }
    // Generated ids are reserved once a generator is configured.
    if let Some(e) = cfg.catalog.iter().find(|e| cfg.is_generated_id(e.id.as_str())) {
        return Err(ValidationError::DuplicateProperty(e.id.0.clone()));
    }
    match &cfg.generate {
        Some(g) => {
            if g.per_category == 0 && cfg.catalog.is_empty() {
                return Err(ValidationError::EmptyCatalog);
            }
            if !validate_fraction(g.volatility) {
                return Err(ValidationError::InvalidVolatility("generated".to_string()));
            }
            for category in Category::ALL {
                if !cfg.volatility_bounds.contains_key(&category) {
                    return Err(ValidationError::MissingBounds(category));
                }
            }
        }
        None if cfg.catalog.is_empty() => return Err(ValidationError::EmptyCatalog),
        None => {}
    }
    validate_entries(&cfg.catalog, cfg)
}
