use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Key every provider record carries for the company's ticker symbol.
pub const TICKER_FIELD: &str = "ticker";
/// Key every provider record carries for the company's display name.
pub const NAME_FIELD: &str = "name";

/// A single scalar as delivered by a provider: either a number or a string
/// that may or may not hold a number ("1.2B", "$1,234", "N/A", ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Number(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

/// One flat financial record for a company, as produced by a fetch adapter.
///
/// Field names are provider-defined. `ticker` and `name` are always present
/// and always text; every other key is optional. Serializes as a single flat
/// JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, Option<FieldValue>>",
    into = "BTreeMap<String, FieldValue>"
)]
pub struct RawFinancialData {
    fields: BTreeMap<String, FieldValue>,
}

impl RawFinancialData {
    pub fn new(ticker: impl Into<String>, name: impl Into<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(TICKER_FIELD.to_string(), FieldValue::Text(ticker.into()));
        fields.insert(NAME_FIELD.to_string(), FieldValue::Text(name.into()));
        Self { fields }
    }

    /// Builder-style insert, used by adapters while assembling a record.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        let key = key.into();
        let value = value.into();
        // ticker/name stay textual no matter what the provider sent
        let value = if key == TICKER_FIELD || key == NAME_FIELD {
            FieldValue::Text(value.to_string())
        } else {
            value
        };
        self.fields.insert(key, value);
    }

    pub fn ticker(&self) -> &str {
        self.fields
            .get(TICKER_FIELD)
            .and_then(FieldValue::as_text)
            .unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.fields
            .get(NAME_FIELD)
            .and_then(FieldValue::as_text)
            .unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// All fields in key order, `ticker` and `name` included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Fields other than `ticker` and `name`.
    pub fn data_fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.iter()
            .filter(|(k, _)| *k != TICKER_FIELD && *k != NAME_FIELD)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl TryFrom<BTreeMap<String, Option<FieldValue>>> for RawFinancialData {
    type Error = String;

    fn try_from(map: BTreeMap<String, Option<FieldValue>>) -> Result<Self, Self::Error> {
        let mut ticker = None;
        let mut name = None;
        let mut rest = Vec::new();

        for (key, value) in map {
            let Some(value) = value else { continue };
            match key.as_str() {
                TICKER_FIELD => ticker = Some(value.to_string()),
                NAME_FIELD => name = Some(value.to_string()),
                _ => rest.push((key, value)),
            }
        }

        let ticker = ticker.ok_or_else(|| "record is missing required field 'ticker'".to_string())?;
        let name = name.ok_or_else(|| "record is missing required field 'name'".to_string())?;

        let mut record = RawFinancialData::new(ticker, name);
        for (key, value) in rest {
            record.insert(key, value);
        }
        Ok(record)
    }
}

impl From<RawFinancialData> for BTreeMap<String, FieldValue> {
    fn from(record: RawFinancialData) -> Self {
        record.fields
    }
}

/// A company the user is tracking. `data` is `None` until a fetch succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedCompany {
    pub id: String,
    pub ticker: String,
    #[serde(default)]
    pub data: Option<RawFinancialData>,
}

/// A user-defined set of companies compared as a single synthetic item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub company_ids: Vec<String>,
}

/// Outcome of validating user-editable input: a flag plus every reason it
/// failed, in the order found.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}
