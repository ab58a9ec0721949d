// crates/ferry-economics/src/token.rs
//
// Fungible token ledger used for every token on every chain: the canonical
// governance token, the satellite wrapped token, and the revenue token.
//
// All amounts are integers in the smallest unit. 1 token = 10^18 units.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use ferry_core::error::FerryError;
use ferry_core::types::{Address, Amount};

/// Number of decimals every Ferry token uses.
pub const TOKEN_DECIMALS: u32 = 18;

/// Units in one whole token.
pub const ONE_TOKEN: Amount = 1_000_000_000_000_000_000;

/// Balances and total supply of one token on one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLedger {
    symbol: String,
    balances: BTreeMap<Address, Amount>,
    total_supply: Amount,
}

impl TokenLedger {
    /// Create an empty ledger.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            balances: BTreeMap::new(),
            total_supply: 0,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Fail with `InsufficientBalance` unless `account` holds at least `amount`.
    pub fn ensure_balance(&self, account: &Address, amount: Amount) -> Result<(), FerryError> {
        let available = self.balance_of(account);
        if amount > available {
            return Err(FerryError::InsufficientBalance {
                account: *account,
                requested: amount,
                available,
            });
        }
        Ok(())
    }

    /// Create `amount` new units in `to`'s balance.
    ///
    /// # Errors
    /// Returns `FerryError::Overflow` if total supply would overflow.
    pub fn mint(&mut self, to: &Address, amount: Amount) -> Result<(), FerryError> {
        let supply = self.total_supply.checked_add(amount).ok_or_else(|| {
            FerryError::Overflow(format!("{} total supply overflow on mint", self.symbol))
        })?;
        self.total_supply = supply;
        // Balance <= total supply, so this cannot overflow once supply didn't.
        *self.balances.entry(*to).or_insert(0) += amount;
        Ok(())
    }

    /// Destroy `amount` units from `from`'s balance.
    ///
    /// # Errors
    /// Returns `FerryError::InsufficientBalance` if `from` cannot cover it.
    pub fn burn(&mut self, from: &Address, amount: Amount) -> Result<(), FerryError> {
        self.ensure_balance(from, amount)?;
        self.debit(from, amount);
        self.total_supply -= amount;
        Ok(())
    }

    /// Move `amount` from `from` to `to`.
    ///
    /// # Errors
    /// Returns `FerryError::InsufficientBalance` if `from` cannot cover it.
    pub fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), FerryError> {
        self.ensure_balance(from, amount)?;
        if from == to || amount == 0 {
            return Ok(());
        }
        self.debit(from, amount);
        *self.balances.entry(*to).or_insert(0) += amount;
        Ok(())
    }

    /// Every non-zero balance, ordered by address.
    pub fn holders(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.balances.iter().filter(|(_, amount)| **amount > 0)
    }

    /// Display `amount` in whole tokens with this ledger's symbol.
    pub fn display(&self, amount: Amount) -> TokenAmount<'_> {
        TokenAmount {
            amount,
            symbol: &self.symbol,
        }
    }

    fn debit(&mut self, from: &Address, amount: Amount) {
        if let Some(balance) = self.balances.get_mut(from) {
            *balance -= amount;
            if *balance == 0 {
                self.balances.remove(from);
            }
        }
    }
}

/// Human-readable token amount, e.g. `1.5 AURA`.
pub struct TokenAmount<'a> {
    amount: Amount,
    symbol: &'a str,
}

impl fmt::Display for TokenAmount<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.amount / ONE_TOKEN;
        let frac = self.amount % ONE_TOKEN;
        if frac == 0 {
            write!(f, "{} {}", whole, self.symbol)
        } else {
            // Up to 18 decimal places, trailing zeros trimmed
            let frac_str = format!("{:018}", frac);
            let trimmed = frac_str.trim_end_matches('0');
            write!(f, "{}.{} {}", whole, trimmed, self.symbol)
        }
    }
}
