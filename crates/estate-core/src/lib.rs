#![deny(warnings)]

//! Core domain models and invariants for Estate Tycoon.
//!
//! This crate defines the property catalog, the player portfolio and the
//! session configuration, with validation helpers that guard the basic
//! invariants (positive prices, non-negative cash, unique identifiers).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

mod config;
mod portfolio;

pub use config::{
    validate_config, validate_entries, CategoryBounds, Difficulty, GameConfig, GenerateSpec,
    PriceLimits, Regime, RegimeConfig,
};
pub use portfolio::{Portfolio, TradeError};

/// Smallest representable price (one cent). Prices never fall below this.
pub const MIN_PRICE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Largest money amount a scenario may put in play (10^18 USD), whether as
/// starting cash, a single price or the whole catalog at its ceilings.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA764_0000, 0x0DE0_B6B3, 0, false, 0);

/// Unique identifier for a property, e.g. "oak-duplex-1".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PropertyId(pub String);

impl PropertyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kinds of investable real estate.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Two-unit residential building.
    Duplex,
    /// Three-unit residential building.
    Triplex,
    /// Four-unit residential building.
    Fourplex,
    /// Small apartment building (5-15 units).
    Apartment,
    /// Large apartment complex (16+ units).
    ApartmentComplex,
    /// Single commercial premises.
    Commercial,
}

impl Category {
    /// Every category in catalog order.
    pub const ALL: [Category; 6] = [
        Category::Duplex,
        Category::Triplex,
        Category::Fourplex,
        Category::Apartment,
        Category::ApartmentComplex,
        Category::Commercial,
    ];

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Category::Duplex => "Duplex",
            Category::Triplex => "Triplex",
            Category::Fourplex => "Fourplex",
            Category::Apartment => "Apartment",
            Category::ApartmentComplex => "Apartment Complex",
            Category::Commercial => "Commercial",
        }
    }

    /// Lowercase identifier fragment, matching the serialized name.
    pub fn slug(self) -> &'static str {
        match self {
            Category::Duplex => "duplex",
            Category::Triplex => "triplex",
            Category::Fourplex => "fourplex",
            Category::Apartment => "apartment",
            Category::ApartmentComplex => "apartment_complex",
            Category::Commercial => "commercial",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn one_unit() -> u32 {
    1
}

/// Rental economics of a listing.
///
/// Net income is gross rent less operating expenses; the management fee is
/// reported on its own and already counted inside the expense ratio.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Income {
    /// Monthly rent per unit in USD (>= 0).
    pub rent_per_unit: Decimal,
    /// Operating expenses as a fraction of gross income, in [0, 1].
    pub expense_ratio: Decimal,
    /// Management fee as a percent of gross income, in [0, 100].
    #[serde(default)]
    pub management_fee_pct: Decimal,
}

impl Income {
    /// Annual rent across all `units`.
    pub fn gross_annual(&self, units: u32) -> Decimal {
        self.rent_per_unit * Decimal::from(units) * Decimal::from(12)
    }

    pub fn expenses(&self, units: u32) -> Decimal {
        (self.gross_annual(units) * self.expense_ratio).round_dp(2)
    }

    pub fn management_fee(&self, units: u32) -> Decimal {
        (self.gross_annual(units) * self.management_fee_pct / Decimal::ONE_HUNDRED).round_dp(2)
    }

    pub fn net_annual(&self, units: u32) -> Decimal {
        self.gross_annual(units) - self.expenses(units)
    }
}

/// Rating of a listing by its capitalization rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Valuation {
    MoneyPit,
    BelowAverage,
    Average,
    Solid,
    Premium,
}

impl Valuation {
    /// Bucket a cap rate given in percent.
    pub fn from_cap_rate(pct: Decimal) -> Self {
        if pct >= Decimal::new(7, 0) {
            Valuation::Premium
        } else if pct >= Decimal::new(55, 1) {
            Valuation::Solid
        } else if pct <= Decimal::new(3, 0) {
            Valuation::MoneyPit
        } else if pct <= Decimal::new(4, 0) {
            Valuation::BelowAverage
        } else {
            Valuation::Average
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Valuation::Premium => "Premium Investment",
            Valuation::Solid => "Solid Deal",
            Valuation::Average => "Average",
            Valuation::BelowAverage => "Below Average",
            Valuation::MoneyPit => "Money Pit",
        }
    }
}

/// A catalog row as it appears in configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Property identifier (unique within the catalog).
    pub id: PropertyId,
    /// Property category; selects the per-tick change bounds.
    pub category: Category,
    /// Initial price in USD (> 0).
    pub base_price: Decimal,
    /// Per-tick volatility as a fraction (e.g. 0.08 = up to ±8% before bounds).
    pub volatility: f32,
    /// Optional street address for display.
    #[serde(default)]
    pub address: Option<String>,
    /// Number of rentable units.
    #[serde(default = "one_unit")]
    pub units: u32,
    /// Rental income; listings without it carry no cap rate.
    #[serde(default)]
    pub income: Option<Income>,
}

/// One investable asset.
///
/// The current price is only changed through [`Property::reprice`], which the
/// market model calls once per tick; the owned flag is only toggled by
/// [`Portfolio`] transactions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Property {
    id: PropertyId,
    category: Category,
    address: Option<String>,
    units: u32,
    base_price: Decimal,
    current_price: Decimal,
    owned: bool,
    income: Option<Income>,
}

impl Property {
    /// Build an unowned property priced at its base price.
    pub fn from_entry(entry: &CatalogEntry) -> Self {
        Self {
            id: entry.id.clone(),
            category: entry.category,
            address: entry.address.clone(),
            units: entry.units,
            base_price: entry.base_price,
            current_price: entry.base_price,
            owned: false,
            income: entry.income.clone(),
        }
    }

    pub fn id(&self) -> &PropertyId {
        &self.id
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn units(&self) -> u32 {
        self.units
    }

    pub fn base_price(&self) -> Decimal {
        self.base_price
    }

    pub fn current_price(&self) -> Decimal {
        self.current_price
    }

    pub fn is_owned(&self) -> bool {
        self.owned
    }

    pub fn income(&self) -> Option<&Income> {
        self.income.as_ref()
    }

    /// Annual net operating income, if the listing has rent data.
    pub fn net_income(&self) -> Option<Decimal> {
        self.income.as_ref().map(|i| i.net_annual(self.units))
    }

    /// Net income over the current price, in percent.
    pub fn cap_rate(&self) -> Option<Decimal> {
        self.net_income()
            .map(|net| (net / self.current_price * Decimal::ONE_HUNDRED).round_dp(2))
    }

    pub fn valuation(&self) -> Option<Valuation> {
        self.cap_rate().map(Valuation::from_cap_rate)
    }

    /// Set a new market price, never below [`MIN_PRICE`].
    pub fn reprice(&mut self, price: Decimal) {
        self.current_price = price.max(MIN_PRICE);
    }

    pub(crate) fn set_owned(&mut self, owned: bool) {
        self.owned = owned;
    }
}

/// The fixed, ordered collection of properties in a session.
///
/// Lookups go through an identifier -> slot index; slots never move.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    properties: Vec<Property>,
    index: BTreeMap<PropertyId, usize>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate identifiers and non-positive prices.
    pub fn from_entries(entries: &[CatalogEntry]) -> Result<Self, ValidationError> {
        let mut properties = Vec::with_capacity(entries.len());
        let mut index = BTreeMap::new();
        for (slot, entry) in entries.iter().enumerate() {
            if entry.base_price <= Decimal::ZERO {
                return Err(ValidationError::NonPositivePrice(entry.id.0.clone()));
            }
            if index.insert(entry.id.clone(), slot).is_some() {
                return Err(ValidationError::DuplicateProperty(entry.id.0.clone()));
            }
            properties.push(Property::from_entry(entry));
        }
        Ok(Self { properties, index })
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Slot of a property, if the identifier is known.
    pub fn slot(&self, id: &PropertyId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn get(&self, id: &PropertyId) -> Option<&Property> {
        self.slot(id).map(|slot| &self.properties[slot])
    }

    pub fn get_mut(&mut self, id: &PropertyId) -> Option<&mut Property> {
        let slot = self.slot(id)?;
        self.properties.get_mut(slot)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Property> {
        self.properties.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Property> {
        self.properties.iter_mut()
    }

    /// Unowned listing with the highest cap rate; the earliest slot wins ties.
    pub fn best_investment(&self) -> Option<&Property> {
        let mut best: Option<(&Property, Decimal)> = None;
        for p in self.properties.iter().filter(|p| !p.is_owned()) {
            let Some(rate) = p.cap_rate() else {
                continue;
            };
            if best.map_or(true, |(_, top)| rate > top) {
                best = Some((p, rate));
            }
        }
        best.map(|(p, _)| p)
    }
}

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Starting cash must be strictly positive.
    #[error("starting cash must be > 0")]
    NonPositiveCash,
    /// Win threshold must be strictly positive.
    #[error("win net-worth threshold must be > 0")]
    NonPositiveThreshold,
    /// A session needs at least one turn.
    #[error("max turns must be >= 1")]
    ZeroTurns,
    /// Neither an explicit catalog nor a generator was configured.
    #[error("catalog is empty")]
    EmptyCatalog,
    /// Two catalog entries share an identifier.
    #[error("duplicate property id: {0}")]
    DuplicateProperty(String),
    /// Base price must be strictly positive.
    #[error("base price of {0} must be > 0")]
    NonPositivePrice(String),
    /// Volatility must be finite and within [0, 1].
    #[error("volatility of {0} must be within [0,1]")]
    InvalidVolatility(String),
    /// A catalog category has no configured change bounds.
    #[error("no volatility bounds configured for {0}")]
    MissingBounds(Category),
    /// Change bounds must be finite, non-negative and keep prices positive.
    #[error("invalid volatility bounds for {0}")]
    InvalidBounds(Category),
    /// Price floor must be > 0 and not above the ceiling.
    #[error("price limits must satisfy 0 < floor <= ceiling")]
    InvalidPriceLimits,
    /// Probability outside [0, 1].
    #[error("probability must be within [0,1]")]
    InvalidProbability,
    /// Rent, expense ratio or management fee out of range.
    #[error("invalid income figures for {0}")]
    InvalidIncome(String),
    /// Seasonality needs twelve finite, positive monthly factors.
    #[error("seasonality must list 12 positive factors")]
    InvalidSeasonality,
    /// An amount, or the sum of amounts in play, exceeds [`MAX_AMOUNT`].
    #[error("amount out of range: {0}")]
    AmountOutOfRange(String),
    /// Numeric field must be finite.
    #[error("non-finite numeric value encountered")]
    NonFinite,
    /// Configuration text could not be parsed.
    #[error("invalid configuration: {0}")]
    Parse(String),
}
