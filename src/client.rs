use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Url};

use crate::error::FetchError;
use crate::exchange_rate::ExchangeRateRecord;

/// A single request against the exchange-rate API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateQuery {
    /// Latest published list, all currencies.
    Current,
    /// List for one day, all currencies.
    ForDate(NaiveDate),
    /// Every published rate for one currency.
    CurrencyHistory(String),
    /// Rates for one currency from `from` onward.
    CurrencyHistoryFrom(String, NaiveDate),
    /// All currencies between two dates, inclusive.
    Range { from: NaiveDate, to: NaiveDate },
}

impl RateQuery {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        match self {
            RateQuery::Current => vec![],
            RateQuery::ForDate(date) => vec![("datum-primjene", format_date(*date))],
            RateQuery::CurrencyHistory(code) => vec![("valuta", code.clone())],
            RateQuery::CurrencyHistoryFrom(code, from) => vec![
                ("valuta", code.clone()),
                ("datum-primjene-od", format_date(*from)),
            ],
            RateQuery::Range { from, to } => vec![
                ("datum-primjene-od", format_date(*from)),
                ("datum-primjene-do", format_date(*to)),
            ],
        }
    }
}

impl RateQuery {
    /// Issues the query through the matching named operation of `source`.
    pub async fn send(
        &self,
        source: &dyn RateSource,
    ) -> Result<Vec<ExchangeRateRecord>, FetchError> {
        match self {
            RateQuery::Current => source.fetch_current().await,
            RateQuery::ForDate(date) => source.fetch_for_date(*date).await,
            RateQuery::CurrencyHistory(code) => source.fetch_history_for_currency(code).await,
            RateQuery::CurrencyHistoryFrom(code, from) => {
                source
                    .fetch_history_for_currency_from_date(code, *from)
                    .await
            }
            RateQuery::Range { from, to } => source.fetch_range_differences(*from, *to).await,
        }
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Source of exchange-rate lists.
///
/// Every call is one request and returns the list exactly as delivered.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch(&self, query: &RateQuery) -> Result<Vec<ExchangeRateRecord>, FetchError>;

    async fn fetch_current(&self) -> Result<Vec<ExchangeRateRecord>, FetchError> {
        self.fetch(&RateQuery::Current).await
    }

    async fn fetch_for_date(&self, date: NaiveDate) -> Result<Vec<ExchangeRateRecord>, FetchError> {
        self.fetch(&RateQuery::ForDate(date)).await
    }

    async fn fetch_history_for_currency(
        &self,
        code: &str,
    ) -> Result<Vec<ExchangeRateRecord>, FetchError> {
        self.fetch(&RateQuery::CurrencyHistory(code.to_string()))
            .await
    }

    async fn fetch_history_for_currency_from_date(
        &self,
        code: &str,
        date: NaiveDate,
    ) -> Result<Vec<ExchangeRateRecord>, FetchError> {
        self.fetch(&RateQuery::CurrencyHistoryFrom(code.to_string(), date))
            .await
    }

    async fn fetch_range_differences(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExchangeRateRecord>, FetchError> {
        self.fetch(&RateQuery::Range { from, to }).await
    }
}

/// HTTP client for the HNB exchange-rate API.
#[derive(Debug, Clone)]
pub struct HnbClient {
    client: Client,
    base_url: Url,
}

impl HnbClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, FetchError> {
        let base_url =
            Url::parse(base_url).map_err(|e| FetchError::InvalidUrl(format!("{base_url}: {e}")))?;
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(HnbClient {
            client: builder.build()?,
            base_url,
        })
    }

    pub fn url_for(&self, query: &RateQuery) -> Url {
        let mut url = self.base_url.clone();
        let pairs = query.query_pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        url
    }

    async fn load_json(&self, url: Url) -> Result<String, FetchError> {
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            log::warn!("API responded with {}", resp.status());
            return Err(FetchError::Status(resp.status().as_u16()));
        }

        Ok(resp.text().await?)
    }
}

#[async_trait]
impl RateSource for HnbClient {
    async fn fetch(&self, query: &RateQuery) -> Result<Vec<ExchangeRateRecord>, FetchError> {
        let url = self.url_for(query);
        log::debug!("GET {url}");

        let text = self.load_json(url).await?;
        let records = decode_records(&text).inspect_err(|e| {
            log::warn!("Can't decode response for {query:?}: {e}");
        })?;

        log::info!("Fetched {} records for {query:?}", records.len());
        Ok(records)
    }
}

pub fn decode_records(text: &str) -> Result<Vec<ExchangeRateRecord>, FetchError> {
    Ok(serde_json::from_str(text)?)
}
