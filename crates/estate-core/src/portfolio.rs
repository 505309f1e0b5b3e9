//! Player cash and holdings.

use crate::{Catalog, Property, PropertyId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Reasons a buy or sell is rejected.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TradeError {
    /// Cash does not cover the current price.
    #[error("insufficient funds: price {price} exceeds cash {cash}")]
    InsufficientFunds { price: Decimal, cash: Decimal },
    /// Property is already held.
    #[error("property {0} is already owned")]
    AlreadyOwned(PropertyId),
    /// Property is not held.
    #[error("property {0} is not owned")]
    NotOwned(PropertyId),
    /// Proceeds would not fit in the cash balance.
    #[error("cash balance overflow selling {0}")]
    CashOverflow(PropertyId),
}

/// Cash balance plus owned properties, keyed by id with the price paid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    starting_cash: Decimal,
    cash: Decimal,
    holdings: BTreeMap<PropertyId, Decimal>,
    realized_gain: Decimal,
}

impl Portfolio {
    pub fn new(starting_cash: Decimal) -> Self {
        Self {
            starting_cash,
            cash: starting_cash,
            holdings: BTreeMap::new(),
            realized_gain: Decimal::ZERO,
        }
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn starting_cash(&self) -> Decimal {
        self.starting_cash
    }

    /// Owned property ids in ascending order.
    pub fn holdings(&self) -> impl Iterator<Item = &PropertyId> + '_ {
        self.holdings.keys()
    }

    pub fn holding_count(&self) -> usize {
        self.holdings.len()
    }

    pub fn holds(&self, id: &PropertyId) -> bool {
        self.holdings.contains_key(id)
    }

    /// Price paid for a holding.
    pub fn cost_basis(&self, id: &PropertyId) -> Option<Decimal> {
        self.holdings.get(id).copied()
    }

    pub fn can_afford(&self, price: Decimal) -> bool {
        self.cash >= price
    }

    /// Buy `property` at its current price.
    ///
    /// All checks run before any mutation, so a rejected buy leaves both the
    /// portfolio and the property untouched. Returns the price paid.
    pub fn buy(&mut self, property: &mut Property) -> Result<Decimal, TradeError> {
        let price = property.current_price();
        if property.is_owned() || self.holds(property.id()) {
            return Err(TradeError::AlreadyOwned(property.id().clone()));
        }
        if !self.can_afford(price) {
            return Err(TradeError::InsufficientFunds {
                price,
                cash: self.cash,
            });
        }
        self.cash -= price;
        self.holdings.insert(property.id().clone(), price);
        property.set_owned(true);
        debug!(id = %property.id(), %price, cash = %self.cash, "bought property");
        Ok(price)
    }

    /// Sell `property` at its current price. Returns the proceeds.
    pub fn sell(&mut self, property: &mut Property) -> Result<Decimal, TradeError> {
        let Some(paid) = self.holdings.get(property.id()).copied() else {
            return Err(TradeError::NotOwned(property.id().clone()));
        };
        let price = property.current_price();
        let (Some(cash), Some(gain)) = (
            self.cash.checked_add(price),
            self.realized_gain.checked_add(price - paid),
        ) else {
            return Err(TradeError::CashOverflow(property.id().clone()));
        };
        self.holdings.remove(property.id());
        self.cash = cash;
        self.realized_gain = gain;
        property.set_owned(false);
        debug!(id = %property.id(), %price, cash = %self.cash, "sold property");
        Ok(price)
    }

    /// Current market value of all holdings, saturating at `Decimal::MAX`.
    pub fn holdings_value(&self, catalog: &Catalog) -> Decimal {
        self.holdings
            .keys()
            .filter_map(|id| catalog.get(id))
            .map(Property::current_price)
            .try_fold(Decimal::ZERO, Decimal::checked_add)
            .unwrap_or(Decimal::MAX)
    }

    /// Cash plus the current price of every holding, saturating at
    /// `Decimal::MAX`.
    pub fn net_worth(&self, catalog: &Catalog) -> Decimal {
        self.cash
            .checked_add(self.holdings_value(catalog))
            .unwrap_or(Decimal::MAX)
    }

    /// Return on investment relative to starting cash, as a fraction.
    pub fn roi(&self, catalog: &Catalog) -> Decimal {
        if self.starting_cash.is_zero() {
            return Decimal::ZERO;
        }
        self.net_worth(catalog)
            .checked_sub(self.starting_cash)
            .and_then(|gain| gain.checked_div(self.starting_cash))
            .unwrap_or(Decimal::ZERO)
    }

    /// Paper gain on current holdings versus their cost basis.
    pub fn unrealized_gain(&self, catalog: &Catalog) -> Decimal {
        let paid = self
            .holdings
            .values()
            .copied()
            .try_fold(Decimal::ZERO, Decimal::checked_add)
            .unwrap_or(Decimal::MAX);
        self.holdings_value(catalog) - paid
    }

    /// Accumulated gain (or loss) from completed sales.
    pub fn realized_gain(&self) -> Decimal {
        self.realized_gain
    }

    /// No cash left and nothing to sell.
    pub fn is_bankrupt(&self) -> bool {
        self.cash.is_zero() && self.holdings.is_empty()
    }

    /// Every holding exists in the catalog with its owned flag set, and no
    /// other property is flagged as owned.
    pub fn is_consistent_with(&self, catalog: &Catalog) -> bool {
        let held_ok = self
            .holdings
            .keys()
            .all(|id| catalog.get(id).is_some_and(Property::is_owned));
        let flags_ok = catalog
            .iter()
            .filter(|p| p.is_owned())
            .all(|p| self.holds(p.id()));
        held_ok && flags_ok && self.cash >= Decimal::ZERO
    }
}
