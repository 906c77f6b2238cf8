use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub type Traveler = String;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Trip {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_decimal")]
    pub budget: f64,
    #[serde(default)]
    pub travelers: Vec<Traveler>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitType {
    #[default]
    Equal,
    Percentage,
    Fixed,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Expense {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(deserialize_with = "deserialize_decimal")]
    pub amount: f64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub paid_by: Option<Traveler>,
    #[serde(default)]
    pub split_between: Vec<Traveler>,
    #[serde(default)]
    pub split_type: SplitType,
    /// Percentages or fixed amounts per traveler, depending on `split_type`.
    #[serde(default, deserialize_with = "deserialize_split_details")]
    pub split_details: BTreeMap<Traveler, f64>,
}

impl Expense {
    /// The payer, if one was recorded. Blank names count as missing.
    pub fn payer(&self) -> Option<&str> {
        self.paid_by
            .as_deref()
            .filter(|payer| !payer.trim().is_empty())
    }

    pub fn currency(&self) -> Option<&str> {
        self.currency
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}

// Decimals come from the trip backend as strings ("90.00"), older
// documents store plain numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum Decimal {
    Number(f64),
    Text(String),
}

impl Decimal {
    fn into_f64<E: de::Error>(self) -> Result<f64, E> {
        let (value, raw) = match self {
            Decimal::Number(n) => (Some(n), n.to_string()),
            Decimal::Text(text) => (text.trim().parse().ok(), text),
        };
        value
            .filter(|value: &f64| value.is_finite())
            .ok_or_else(|| E::custom(format!("invalid decimal value {raw:?}")))
    }
}

fn deserialize_decimal<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Decimal::deserialize(deserializer)?.into_f64()
}

fn deserialize_split_details<'de, D>(deserializer: D) -> Result<BTreeMap<Traveler, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<Traveler, Decimal>> = Option::deserialize(deserializer)?;
    raw.unwrap_or_default()
        .into_iter()
        .map(|(traveler, value)| value.into_f64().map(|value| (traveler, value)))
        .collect()
}
