//! Vest order canonical encoding and hashing.
//!
//! An order is hashed as the Solidity ABI parameter encoding of
//!
//! ```text
//! (uint256 time, uint256 nonce, string orderType, string symbol,
//!  bool isBuy, string size, string limitPrice, bool reduceOnly)
//! ```
//!
//! The field order is part of the protocol; changing it changes every order
//! hash and is a breaking change.

use alloy_primitives::{keccak256, Address, B256, U256};
use alloy_sol_types::SolValue;
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;

use super::message::wrap_hash;
use crate::{Error, Result};

/// Order type accepted by the Vest matching engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Market,
    Limit,
    StopLoss,
    TakeProfit,
}

impl OrderType {
    /// Wire string, also the hashed value.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "MARKET",
            OrderType::Limit => "LIMIT",
            OrderType::StopLoss => "STOP_LOSS",
            OrderType::TakeProfit => "TAKE_PROFIT",
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "MARKET" => Ok(OrderType::Market),
            "LIMIT" => Ok(OrderType::Limit),
            "STOP_LOSS" => Ok(OrderType::StopLoss),
            "TAKE_PROFIT" => Ok(OrderType::TakeProfit),
            other => Err(Error::encoding(format!("unknown order type '{}'", other))),
        }
    }
}

/// A validated order. Immutable once built so its hash cannot drift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    time: u64,
    nonce: u64,
    order_type: OrderType,
    symbol: String,
    is_buy: bool,
    size: String,
    limit_price: String,
    reduce_only: bool,
}

impl Order {
    /// Order timestamp (unix milliseconds).
    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn is_buy(&self) -> bool {
        self.is_buy
    }

    /// Size exactly as hashed.
    pub fn size(&self) -> &str {
        &self.size
    }

    /// Limit price exactly as hashed.
    pub fn limit_price(&self) -> &str {
        &self.limit_price
    }

    pub fn reduce_only(&self) -> bool {
        self.reduce_only
    }

    /// ABI parameter encoding of the eight order fields.
    pub fn canonical_encoding(&self) -> Vec<u8> {
        (
            U256::from(self.time),
            U256::from(self.nonce),
            self.order_type.as_str().to_string(),
            self.symbol.clone(),
            self.is_buy,
            self.size.clone(),
            self.limit_price.clone(),
            self.reduce_only,
        )
            .abi_encode_params()
    }

    /// keccak256 of the canonical encoding.
    pub fn hash(&self) -> B256 {
        keccak256(self.canonical_encoding())
    }

    /// Personal-message digest of [`hash`](Self::hash); this is what gets signed.
    pub fn signing_digest(&self) -> B256 {
        wrap_hash(self.hash())
    }
}

/// Parse an amount string, requiring a plain non-negative decimal.
fn validate_amount(field: &str, value: &str) -> Result<()> {
    let amount = Decimal::from_str(value).map_err(|_| {
        Error::encoding(format!("{} '{}' is not a decimal number", field, value))
    })?;
    if amount.is_sign_negative() {
        return Err(Error::encoding(format!("{} '{}' is negative", field, value)));
    }
    Ok(())
}

/// Order builder for creating orders with a fluent API.
#[derive(Debug, Clone, Default)]
pub struct OrderBuilder {
    time: Option<u64>,
    nonce: Option<u64>,
    order_type: Option<OrderType>,
    symbol: Option<String>,
    is_buy: Option<bool>,
    size: Option<String>,
    limit_price: Option<String>,
    reduce_only: bool,
}

impl OrderBuilder {
    /// Create a new order builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the order timestamp in unix milliseconds.
    pub fn time(mut self, time_ms: u64) -> Self {
        self.time = Some(time_ms);
        self
    }

    /// Stamp the order with the current wall-clock time.
    pub fn time_now(mut self) -> Self {
        self.time = Some(chrono::Utc::now().timestamp_millis().max(0) as u64);
        self
    }

    /// Set the nonce. Defaults to the order time.
    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn order_type(mut self, order_type: OrderType) -> Self {
        self.order_type = Some(order_type);
        self
    }

    pub fn symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn buy(mut self) -> Self {
        self.is_buy = Some(true);
        self
    }

    pub fn sell(mut self) -> Self {
        self.is_buy = Some(false);
        self
    }

    pub fn is_buy(mut self, is_buy: bool) -> Self {
        self.is_buy = Some(is_buy);
        self
    }

    /// Set the size; the string is hashed verbatim, so "1.0" and "1.0000"
    /// produce different orders.
    pub fn size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn limit_price(mut self, limit_price: impl Into<String>) -> Self {
        self.limit_price = Some(limit_price.into());
        self
    }

    pub fn reduce_only(mut self, reduce_only: bool) -> Self {
        self.reduce_only = reduce_only;
        self
    }

    /// Build the order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encoding`] if a required field is missing, the symbol
    /// is empty, or an amount is not a non-negative decimal.
    pub fn build(self) -> Result<Order> {
        let time = self.time.ok_or_else(|| missing("time"))?;
        let order_type = self.order_type.ok_or_else(|| missing("orderType"))?;
        let symbol = self.symbol.ok_or_else(|| missing("symbol"))?;
        let is_buy = self.is_buy.ok_or_else(|| missing("isBuy"))?;
        let size = self.size.ok_or_else(|| missing("size"))?;
        let limit_price = self.limit_price.ok_or_else(|| missing("limitPrice"))?;

        if symbol.trim().is_empty() {
            return Err(Error::encoding("symbol must not be empty"));
        }
        validate_amount("size", &size)?;
        validate_amount("limitPrice", &limit_price)?;

        Ok(Order {
            time,
            nonce: self.nonce.unwrap_or(time),
            order_type,
            symbol,
            is_buy,
            size,
            limit_price,
            reduce_only: self.reduce_only,
        })
    }
}

fn missing(field: &str) -> Error {
    Error::encoding(format!("missing order field '{}'", field))
}

/// A signed order ready for submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedOrder {
    /// The order as hashed.
    pub order: Order,
    /// keccak256 of the canonical encoding.
    pub order_hash: B256,
    /// Personal-message digest that was signed.
    pub digest: B256,
    /// 65-byte signature as 0x-prefixed hex.
    pub signature: String,
    /// Lowercase 0x-prefixed address of the signing key.
    pub signer: String,
}

impl SignedOrder {
    /// Create from an order and its signature.
    pub fn from_order(order: &Order, signature: String, signer: Address) -> Self {
        Self {
            order: order.clone(),
            order_hash: order.hash(),
            digest: order.signing_digest(),
            signature,
            signer: format!("0x{}", hex::encode(signer)),
        }
    }
}
