use rust_decimal::Decimal;
use serde::Serialize;

use crate::exchange_rate::{ExchangeRateRecord, parse_rate};

/// How a rate moved relative to the record before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaSignal {
    Increase,
    Decrease,
    Unchanged,
    /// Nothing to compare against.
    NoBaseline,
    Invalid,
}

impl DeltaSignal {
    pub fn css_class(self) -> &'static str {
        match self {
            DeltaSignal::Increase => "delta-up",
            DeltaSignal::Decrease => "delta-down",
            DeltaSignal::Unchanged => "delta-flat",
            DeltaSignal::NoBaseline => "delta-none",
            DeltaSignal::Invalid => "delta-invalid",
        }
    }

    pub fn background(self) -> &'static str {
        match self {
            DeltaSignal::Increase => "#b7e4b0",
            DeltaSignal::Decrease => "#f4b6b6",
            DeltaSignal::Unchanged => "#e4e4e4",
            DeltaSignal::NoBaseline => "transparent",
            DeltaSignal::Invalid => "#fff3a3",
        }
    }
}

pub fn calculate_color(current: &str, previous: Option<&str>) -> DeltaSignal {
    let Some(previous) = previous.filter(|p| !p.trim().is_empty()) else {
        return DeltaSignal::NoBaseline;
    };

    let (Some(current), Some(previous)) = (parse_rate(current), parse_rate(previous)) else {
        log::debug!("Invalid numeric value in rate comparison");
        return DeltaSignal::Invalid;
    };

    match current.cmp(&previous) {
        std::cmp::Ordering::Greater => DeltaSignal::Increase,
        std::cmp::Ordering::Less => DeltaSignal::Decrease,
        std::cmp::Ordering::Equal => DeltaSignal::Unchanged,
    }
}

/// Percent change from `previous` to `current`, two decimal places.
pub fn relative_change(current: &str, previous: Option<&str>) -> Option<Decimal> {
    let current = parse_rate(current)?;
    let previous = parse_rate(previous?)?;
    if previous.is_zero() {
        return None;
    }

    let change = current
        .checked_div(previous)?
        .checked_sub(Decimal::ONE)?
        .checked_mul(Decimal::ONE_HUNDRED)?;
    Some(change.round_dp(2))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeltaRow {
    pub record: ExchangeRateRecord,
    pub buy: DeltaSignal,
    pub middle: DeltaSignal,
    pub sell: DeltaSignal,
    /// Middle-rate change in percent.
    pub change: Option<Decimal>,
}

/// Pairs each record with its predecessor in `records`, in order.
pub fn delta_rows(records: &[ExchangeRateRecord]) -> Vec<DeltaRow> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let prev = i.checked_sub(1).map(|p| &records[p]);
            DeltaRow {
                buy: calculate_color(&record.buy_rate, prev.map(|p| p.buy_rate.as_str())),
                middle: calculate_color(&record.middle_rate, prev.map(|p| p.middle_rate.as_str())),
                sell: calculate_color(&record.sell_rate, prev.map(|p| p.sell_rate.as_str())),
                change: relative_change(&record.middle_rate, prev.map(|p| p.middle_rate.as_str())),
                record: record.clone(),
            }
        })
        .collect()
}
