#![deny(warnings)]

//! Session runtime for Estate Tycoon.
//!
//! A [`Session`] owns the catalog, the market model and the player portfolio
//! and is the only thing allowed to mutate them. Hosts drive it through
//! [`Session::execute`] and read it through [`Session::snapshot`]. Calls are
//! synchronous and must be serialized by the host; the session holds no locks.

use chrono::{Months, NaiveDate};
use estate_core::{
    validate_config, validate_entries, Catalog, GameConfig, Portfolio, PropertyId, TradeError,
    ValidationError,
};
use estate_market::{generate_catalog, MarketModel};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

mod snapshot;

pub use snapshot::{PropertyView, Snapshot};

/// RNG stream used for catalog generation, kept apart from the price stream.
const CATALOG_STREAM: u64 = 1;

/// Why a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    WonByNetWorth,
    LostByBankruptcy,
    TimeLimitReached,
}

/// Lifecycle of a session. There is no transition out of `Ended`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Active,
    Ended(EndReason),
}

impl SessionState {
    pub fn is_active(self) -> bool {
        matches!(self, SessionState::Active)
    }
}

/// Player intent forwarded by the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Buy(PropertyId),
    Sell(PropertyId),
    AdvanceTick,
}

/// Result of an accepted command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandOutcome {
    Bought { id: PropertyId, price: Decimal },
    Sold { id: PropertyId, price: Decimal },
    Advanced(SessionState),
}

/// Errors returned by session operations. None of them alter state.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// The portfolio rejected the trade.
    #[error(transparent)]
    Trade(#[from] TradeError),
    /// The command names a property outside the catalog.
    #[error("unknown property: {0}")]
    UnknownProperty(PropertyId),
    /// The session already reached a terminal state.
    #[error("session has ended: {0:?}")]
    SessionEnded(EndReason),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Buy,
    Sell,
}

/// One executed trade.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub turn: u32,
    pub side: Side,
    pub property: PropertyId,
    pub price: Decimal,
}

/// One game session.
#[derive(Clone, Debug)]
pub struct Session {
    seed: u64,
    win_net_worth: Decimal,
    max_turns: u32,
    start_date: Option<NaiveDate>,
    catalog: Catalog,
    market: MarketModel,
    portfolio: Portfolio,
    turn: u32,
    state: SessionState,
    ledger: Vec<Transaction>,
}

impl Session {
    /// Validate `config` and build the initial state: turn 0, market at
    /// tick 0, portfolio at starting cash.
    ///
    /// Without a configured seed a fresh one is drawn; [`Session::seed`]
    /// reports it so the run can be replayed.
    pub fn new(config: &GameConfig) -> Result<Self, ValidationError> {
        validate_config(config)?;
        let seed = config.seed.unwrap_or_else(rand::random);

        let mut entries = config.catalog.clone();
        if let Some(spec) = &config.generate {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            rng.set_stream(CATALOG_STREAM);
            entries.extend(generate_catalog(&mut rng, spec));
        }
        validate_entries(&entries, config)?;

        let catalog = Catalog::from_entries(&entries)?;
        let market = MarketModel::seeded(config, &entries, seed)?;
        info!(seed, properties = catalog.len(), "session created");
        Ok(Self {
            seed,
            win_net_worth: config.win_net_worth,
            max_turns: config.max_turns,
            start_date: config.start_date,
            catalog,
            market,
            portfolio: Portfolio::new(config.starting_cash),
            turn: 0,
            state: SessionState::Active,
            ledger: Vec::new(),
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn max_turns(&self) -> u32 {
        self.max_turns
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn market(&self) -> &MarketModel {
        &self.market
    }

    /// Executed trades, oldest first.
    pub fn ledger(&self) -> &[Transaction] {
        &self.ledger
    }

    pub fn net_worth(&self) -> Decimal {
        self.portfolio.net_worth(&self.catalog)
    }

    /// In-game date of the current turn, when a start date was configured.
    pub fn current_date(&self) -> Option<NaiveDate> {
        self.start_date?.checked_add_months(Months::new(self.turn))
    }

    /// Apply a command. Trades never consume a turn.
    pub fn execute(&mut self, command: Command) -> Result<CommandOutcome, EngineError> {
        match command {
            Command::Buy(id) => {
                let price = self.buy(&id)?;
                Ok(CommandOutcome::Bought { id, price })
            }
            Command::Sell(id) => {
                let price = self.sell(&id)?;
                Ok(CommandOutcome::Sold { id, price })
            }
            Command::AdvanceTick => self.advance().map(CommandOutcome::Advanced),
        }
    }

    /// Buy at the current price; returns the price paid.
    pub fn buy(&mut self, id: &PropertyId) -> Result<Decimal, EngineError> {
        self.ensure_active()?;
        let property = self
            .catalog
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownProperty(id.clone()))?;
        let price = self.portfolio.buy(property)?;
        self.record(Side::Buy, id, price);
        Ok(price)
    }

    /// Sell at the current price; returns the proceeds.
    pub fn sell(&mut self, id: &PropertyId) -> Result<Decimal, EngineError> {
        self.ensure_active()?;
        let property = self
            .catalog
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownProperty(id.clone()))?;
        let price = self.portfolio.sell(property)?;
        self.record(Side::Sell, id, price);
        Ok(price)
    }

    /// Advance the market one tick and evaluate end conditions, in order:
    /// time limit, win threshold, bankruptcy.
    pub fn advance(&mut self) -> Result<SessionState, EngineError> {
        self.ensure_active()?;
        self.market.advance_tick(&mut self.catalog);
        self.turn += 1;
        self.state = self.evaluate();
        if let SessionState::Ended(reason) = self.state {
            info!(turn = self.turn, ?reason, net_worth = %self.net_worth(), "session ended");
        }
        Ok(self.state)
    }

    /// Advance up to `turns` times, stopping early if the session ends.
    /// Returns the number of turns actually played.
    pub fn run_turns(&mut self, turns: u32) -> u32 {
        let mut played = 0;
        while played < turns && self.advance().is_ok() {
            played += 1;
        }
        played
    }

    fn evaluate(&self) -> SessionState {
        if self.turn >= self.max_turns {
            SessionState::Ended(EndReason::TimeLimitReached)
        } else if self.net_worth() >= self.win_net_worth {
            SessionState::Ended(EndReason::WonByNetWorth)
        } else if self.portfolio.is_bankrupt() {
            SessionState::Ended(EndReason::LostByBankruptcy)
        } else {
            SessionState::Active
        }
    }

    fn ensure_active(&self) -> Result<(), EngineError> {
        match self.state {
            SessionState::Active => Ok(()),
            SessionState::Ended(reason) => Err(EngineError::SessionEnded(reason)),
        }
    }

    fn record(&mut self, side: Side, id: &PropertyId, price: Decimal) {
        debug!(turn = self.turn, ?side, %id, %price, "trade executed");
        self.ledger.push(Transaction {
            turn: self.turn,
            side,
            property: id.clone(),
            price,
        });
    }
}
