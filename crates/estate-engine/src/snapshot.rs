//! Read-only view of a session for rendering and export.

use crate::{Session, SessionState};
use chrono::NaiveDate;
use estate_core::{Category, PropertyId, Regime, Valuation};
use estate_market::MarketTemperature;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One catalog row as seen by the player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyView {
    pub id: PropertyId,
    pub category: Category,
    pub address: Option<String>,
    pub units: u32,
    pub base_price: Decimal,
    pub current_price: Decimal,
    pub owned: bool,
    /// Recent percent change with momentum.
    pub trend_pct: Decimal,
    /// Annual net operating income; absent without rent data.
    pub net_income: Option<Decimal>,
    /// Net income over current price, in percent.
    pub cap_rate: Option<Decimal>,
    pub valuation: Option<Valuation>,
}

/// Everything the presentation layer needs for one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub turn: u32,
    pub max_turns: u32,
    pub date: Option<NaiveDate>,
    pub state: SessionState,
    pub cash: Decimal,
    pub holdings: Vec<PropertyId>,
    pub net_worth: Decimal,
    /// Net worth gain over starting cash, as a fraction.
    pub roi: Decimal,
    pub regime: Regime,
    pub temperature: MarketTemperature,
    /// Unowned listing with the highest cap rate.
    pub best_investment: Option<PropertyId>,
    pub properties: Vec<PropertyView>,
}

impl Snapshot {
    /// Look up a property row by id.
    pub fn property(&self, id: &PropertyId) -> Option<&PropertyView> {
        self.properties.iter().find(|p| &p.id == id)
    }
}

impl Session {
    /// Copy out the current state. No side effects.
    pub fn snapshot(&self) -> Snapshot {
        let market = self.market();
        let properties = self
            .catalog()
            .iter()
            .enumerate()
            .map(|(slot, p)| PropertyView {
                id: p.id().clone(),
                category: p.category(),
                address: p.address().map(str::to_owned),
                units: p.units(),
                base_price: p.base_price(),
                current_price: p.current_price(),
                owned: p.is_owned(),
                trend_pct: market.trend_pct(slot),
                net_income: p.net_income(),
                cap_rate: p.cap_rate(),
                valuation: p.valuation(),
            })
            .collect();
        let portfolio = self.portfolio();
        Snapshot {
            turn: self.turn(),
            max_turns: self.max_turns(),
            date: self.current_date(),
            state: self.state(),
            cash: portfolio.cash(),
            holdings: portfolio.holdings().cloned().collect(),
            net_worth: self.net_worth(),
            roi: portfolio.roi(self.catalog()),
            regime: market.regime(),
            temperature: market.temperature(),
            best_investment: self.catalog().best_investment().map(|p| p.id().clone()),
            properties,
        }
    }
}
