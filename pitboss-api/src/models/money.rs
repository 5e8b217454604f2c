//! Fixed-point monetary amounts.
//!
//! Amounts carry two fractional digits and at most ten significant digits.
//! They are stored as integer cents in `BIGINT` columns and rendered as
//! decimal strings (`"350.00"`) on the wire.

use std::fmt;
use std::str::FromStr;

use diesel::{
    deserialize::{self, FromSql},
    serialize::{self, Output, ToSql},
    sql_types::BigInt,
    sqlite::Sqlite,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A monetary amount in cents.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    diesel::expression::AsExpression,
    diesel::deserialize::FromSqlRow,
)]
#[diesel(sql_type = BigInt)]
pub struct Money(i64);

/// Why a textual amount was rejected. The messages are returned verbatim as
/// field errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoneyError {
    Invalid,
    TooManyDecimalPlaces,
    TooManyDigits,
}

impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            MoneyError::Invalid => "A valid number is required.",
            MoneyError::TooManyDecimalPlaces => {
                "Ensure that there are no more than 2 decimal places."
            }
            MoneyError::TooManyDigits => "Ensure that there are no more than 10 digits in total.",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for MoneyError {}

impl Money {
    pub const ZERO: Money = Money(0);

    /// Largest magnitude representable with ten digits, two of them decimals.
    pub const MAX_CENTS: i64 = 9_999_999_999;

    pub fn from_cents(cents: i64) -> Result<Self, MoneyError> {
        if cents.unsigned_abs() > Self::MAX_CENTS as u64 {
            return Err(MoneyError::TooManyDigits);
        }
        Ok(Money(cents))
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Money) -> Result<Money, MoneyError> {
        Money::from_cents(self.0 + other.0)
    }

    pub fn checked_sub(self, other: Money) -> Result<Money, MoneyError> {
        Money::from_cents(self.0 - other.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (negative, digits) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };

        let (whole, fraction) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(MoneyError::Invalid);
        }
        if !whole.bytes().all(|b| b.is_ascii_digit())
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(MoneyError::Invalid);
        }
        if fraction.len() > 2 {
            return Err(MoneyError::TooManyDecimalPlaces);
        }

        let whole = whole.trim_start_matches('0');
        if whole.len() > 8 {
            return Err(MoneyError::TooManyDigits);
        }

        let whole_cents = if whole.is_empty() {
            0
        } else {
            whole.parse::<i64>().map_err(|_| MoneyError::Invalid)? * 100
        };
        let fraction_cents = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| MoneyError::Invalid)? * 10,
            _ => fraction.parse::<i64>().map_err(|_| MoneyError::Invalid)?,
        };

        let cents = whole_cents + fraction_cents;
        Money::from_cents(if negative { -cents } else { cents })
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        AmountInput::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

impl ToSql<BigInt, Sqlite> for Money {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
        out.set_value(self.0);
        Ok(serialize::IsNull::No)
    }
}

impl FromSql<BigInt, Sqlite> for Money {
    fn from_sql(
        bytes: <Sqlite as diesel::backend::Backend>::RawValue<'_>,
    ) -> deserialize::Result<Self> {
        let cents = <i64 as FromSql<BigInt, Sqlite>>::from_sql(bytes)?;
        Ok(Money(cents))
    }
}

/// An amount as it arrives in a request body: clients send either
/// `"1000.00"` or `1000`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Text(String),
    Number(serde_json::Number),
}

impl AmountInput {
    pub fn parse(&self) -> Result<Money, MoneyError> {
        match self {
            AmountInput::Text(s) => s.parse(),
            AmountInput::Number(n) => n.to_string().parse(),
        }
    }
}
