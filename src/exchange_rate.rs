use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One row of an HNB exchange-rate list: a single currency on a single day.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ExchangeRateRecord {
    #[serde(rename = "broj_tecajnice")]
    pub list_number: String,
    #[serde(rename = "datum_primjene")]
    pub effective_date: String,
    #[serde(rename = "drzava")]
    pub country: String,
    #[serde(rename = "drzava_iso")]
    pub country_iso: String,
    #[serde(rename = "sifra_valute")]
    pub numeric_code: String,
    #[serde(rename = "valuta")]
    pub currency: String,
    #[serde(rename = "kupovni_tecaj")]
    pub buy_rate: String,
    #[serde(rename = "srednji_tecaj")]
    pub middle_rate: String,
    #[serde(rename = "prodajni_tecaj")]
    pub sell_rate: String,
}

/// Addressable columns of a record, used by search and sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum RateField {
    #[serde(rename = "broj_tecajnice")]
    ListNumber,
    #[serde(rename = "datum_primjene")]
    EffectiveDate,
    #[serde(rename = "drzava")]
    Country,
    #[serde(rename = "drzava_iso")]
    CountryIso,
    #[serde(rename = "sifra_valute")]
    NumericCode,
    #[serde(rename = "valuta")]
    Currency,
    #[serde(rename = "kupovni_tecaj")]
    BuyRate,
    #[serde(rename = "srednji_tecaj")]
    MiddleRate,
    #[serde(rename = "prodajni_tecaj")]
    SellRate,
}

impl RateField {
    pub const ALL: [RateField; 9] = [
        RateField::ListNumber,
        RateField::EffectiveDate,
        RateField::Country,
        RateField::CountryIso,
        RateField::NumericCode,
        RateField::Currency,
        RateField::BuyRate,
        RateField::MiddleRate,
        RateField::SellRate,
    ];

    /// Name of the field in the HNB API, also used in query strings.
    pub fn api_name(self) -> &'static str {
        match self {
            RateField::ListNumber => "broj_tecajnice",
            RateField::EffectiveDate => "datum_primjene",
            RateField::Country => "drzava",
            RateField::CountryIso => "drzava_iso",
            RateField::NumericCode => "sifra_valute",
            RateField::Currency => "valuta",
            RateField::BuyRate => "kupovni_tecaj",
            RateField::MiddleRate => "srednji_tecaj",
            RateField::SellRate => "prodajni_tecaj",
        }
    }

    pub fn from_api_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.api_name() == name)
    }

    /// Column heading shown in rendered tables.
    pub fn label(self) -> &'static str {
        match self {
            RateField::ListNumber => "Broj tečajnice",
            RateField::EffectiveDate => "Datum primjene",
            RateField::Country => "Država",
            RateField::CountryIso => "ISO države",
            RateField::NumericCode => "Šifra valute",
            RateField::Currency => "Valuta",
            RateField::BuyRate => "Kupovni za devize",
            RateField::MiddleRate => "Srednji za devize",
            RateField::SellRate => "Prodajni za devize",
        }
    }

    pub fn is_rate(self) -> bool {
        matches!(
            self,
            RateField::BuyRate | RateField::MiddleRate | RateField::SellRate
        )
    }
}

impl ExchangeRateRecord {
    pub fn field(&self, field: RateField) -> &str {
        match field {
            RateField::ListNumber => &self.list_number,
            RateField::EffectiveDate => &self.effective_date,
            RateField::Country => &self.country,
            RateField::CountryIso => &self.country_iso,
            RateField::NumericCode => &self.numeric_code,
            RateField::Currency => &self.currency,
            RateField::BuyRate => &self.buy_rate,
            RateField::MiddleRate => &self.middle_rate,
            RateField::SellRate => &self.sell_rate,
        }
    }

    /// The effective date as a calendar date, if it is in `YYYY-MM-DD` form.
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.effective_date.trim(), "%Y-%m-%d").ok()
    }
}

pub fn normalize_decimal_string(s: &str) -> String {
    s.trim().replace(',', ".")
}

/// Parses a comma-decimal rate such as `"7,534500"`.
///
/// Every numeric comparison in the crate goes through here so sorting and
/// colouring agree on what a value means.
pub fn parse_rate(s: &str) -> Option<Decimal> {
    let normalized = normalize_decimal_string(s);
    if normalized.is_empty() {
        return None;
    }
    Decimal::from_str(&normalized).ok()
}
