//! Wire models for the PullPay backend.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};

/// Monetary amount in cents.
///
/// The backend sends decimals either as JSON numbers or as strings
/// (`"25.50"`); both decode. Amounts are sent back as JSON numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount {
    cents: i64,
}

impl Amount {
    pub const ZERO: Amount = Amount { cents: 0 };

    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    pub fn cents(self) -> i64 {
        self.cents
    }

    pub fn is_positive(self) -> bool {
        self.cents > 0
    }

    pub fn to_f64(self) -> f64 {
        self.cents as f64 / 100.0
    }

    fn from_f64(value: f64) -> Result<Self, String> {
        if !value.is_finite() {
            return Err(format!("amount is not a finite number: {value}"));
        }
        let cents = (value * 100.0).round();
        if cents.abs() >= i64::MAX as f64 {
            return Err(format!("amount out of range: {value}"));
        }
        Ok(Self {
            cents: cents as i64,
        })
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.cents.checked_add(other.cents).map(Amount::from_cents)
    }
}

impl FromStr for Amount {
    type Err = String;

    /// Parses `"25"`, `"25.5"`, `"25.50"`, `"-3.10"`. More than two
    /// fractional digits are rejected unless the extra digits are zeros.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };

        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
        let frac = match frac.get(2..) {
            Some(rest) if !rest.is_empty() && rest.bytes().all(|b| b == b'0') => &frac[..2],
            _ => frac,
        };

        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && frac.is_empty()) || !all_digits(whole) || !all_digits(frac) {
            return Err(format!("invalid amount: {trimmed:?}"));
        }
        if frac.len() > 2 {
            return Err(format!("amount has more than two decimal places: {trimmed}"));
        }

        let whole_value: i64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .ok()
                .ok_or_else(|| format!("amount out of range: {trimmed}"))?
        };
        let frac_value: i64 = match frac.len() {
            0 => 0,
            1 => i64::from(frac.as_bytes()[0] - b'0') * 10,
            _ => frac
                .parse()
                .ok()
                .ok_or_else(|| format!("invalid amount: {trimmed:?}"))?,
        };

        let cents = whole_value
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac_value))
            .ok_or_else(|| format!("amount out of range: {trimmed}"))?;

        Ok(Self {
            cents: if negative { -cents } else { cents },
        })
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawAmount {
            Integer(i64),
            Float(f64),
            Text(String),
        }

        match RawAmount::deserialize(deserializer)? {
            RawAmount::Integer(whole) => whole
                .checked_mul(100)
                .map(Amount::from_cents)
                .ok_or_else(|| de::Error::custom(format!("amount out of range: {whole}"))),
            RawAmount::Float(value) => Amount::from_f64(value).map_err(de::Error::custom),
            RawAmount::Text(text) => text.parse().map_err(de::Error::custom),
        }
    }
}

/// A church a donor can give to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Church {
    pub id: u64,
    pub name: String,
}

/// How a transaction refers to its church.
///
/// List endpoints embed `{id, name}`. Create responses may carry only the
/// primary key, and older payloads only the name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChurchRef {
    Full(Church),
    Id(u64),
    Name(String),
}

impl ChurchRef {
    pub fn id(&self) -> Option<u64> {
        match self {
            ChurchRef::Full(church) => Some(church.id),
            ChurchRef::Id(id) => Some(*id),
            ChurchRef::Name(_) => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            ChurchRef::Full(church) => Some(&church.name),
            ChurchRef::Name(name) => Some(name),
            ChurchRef::Id(_) => None,
        }
    }
}

/// The signed-in donor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub churches: Vec<Church>,
}

impl UserProfile {
    pub fn full_name(&self) -> String {
        join_name(&self.first_name, &self.last_name)
    }
}

/// A donation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub amount: Amount,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub user_first_name: String,
    #[serde(default)]
    pub user_last_name: String,
    #[serde(default)]
    pub church: Option<ChurchRef>,
    #[serde(default)]
    pub church_name: Option<String>,
    /// Local-only marker for an entry that the server has not confirmed yet.
    #[serde(skip)]
    pub pending: bool,
}

impl Transaction {
    pub fn submitter_name(&self) -> String {
        join_name(&self.user_first_name, &self.user_last_name)
    }

    /// Church label shown next to the amount.
    pub fn church_label(&self) -> &str {
        self.church_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .or_else(|| self.church.as_ref().and_then(ChurchRef::name))
            .unwrap_or("No Church")
    }
}

/// Sums transaction amounts, saturating rather than overflowing.
pub fn total_amount(transactions: &[Transaction]) -> Amount {
    transactions.iter().fold(Amount::ZERO, |sum, tx| {
        sum.checked_add(tx.amount)
            .unwrap_or(Amount::from_cents(i64::MAX))
    })
}

/// Body of `POST /transactions/create/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewTransaction {
    pub amount: Amount,
    pub church_id: u64,
}

impl Serialize for NewTransaction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // The backend reads the church from either key.
        let mut state = serializer.serialize_struct("NewTransaction", 3)?;
        state.serialize_field("amount", &self.amount)?;
        state.serialize_field("church_id", &self.church_id)?;
        state.serialize_field("church", &self.church_id)?;
        state.end()
    }
}

/// Partial user sent with `PUT /user/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.email.is_none()
    }
}

/// Who is logging in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Email(String),
    Username(String),
}

/// Body of `POST /api/login/`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub identity: Identity,
    pub password: String,
}

impl Credentials {
    pub fn email(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            identity: Identity::Email(email.into()),
            password: password.into(),
        }
    }

    pub fn username(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            identity: Identity::Username(username.into()),
            password: password.into(),
        }
    }
}

impl Serialize for Credentials {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        match &self.identity {
            Identity::Email(email) => map.serialize_entry("email", email)?,
            Identity::Username(username) => map.serialize_entry("username", username)?,
        }
        map.serialize_entry("password", &self.password)?;
        map.end()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identity", &self.identity)
            .field("password", &"***")
            .finish()
    }
}

/// Body of `POST /api/register/`.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl Registration {
    pub fn credentials(&self) -> Credentials {
        Credentials::email(self.email.clone(), self.password.clone())
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

fn join_name(first: &str, last: &str) -> String {
    format!("{} {}", first.trim(), last.trim()).trim().to_string()
}

fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}

/// Accepts RFC 3339 timestamps, naive timestamps (taken as UTC) and bare dates.
fn deserialize_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {raw}")))
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
