//! Per-screen view state and its single update function.
//!
//! Handlers feed [`Msg`]s into [`ViewState::update`]; whenever a message
//! requires data, the update returns a [`FetchRequest`] tagged with a
//! sequence number. Results for anything but the newest request are dropped.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::client::RateQuery;
use crate::delta::{DeltaRow, delta_rows};
use crate::error::FetchError;
use crate::exchange_rate::{ExchangeRateRecord, RateField};
use crate::transform::{
    DEFAULT_SEARCH_FIELDS, Keep, SortState, filter_records, group_by_list_number, sort_records,
};

pub const LOOKBACK_CHOICES: [u32; 9] = [1, 2, 3, 4, 5, 6, 7, 14, 30];
pub const MAX_LOOKBACK_DAYS: u32 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Screen {
    CurrentTable,
    CurrencyHistory {
        currency: String,
        from: Option<NaiveDate>,
    },
    RangeDifferences {
        currency: String,
    },
}

impl Screen {
    fn default_sort(&self) -> SortState {
        match self {
            Screen::CurrentTable => SortState::new(RateField::Country),
            Screen::CurrencyHistory { .. } | Screen::RangeDifferences { .. } => {
                SortState::new(RateField::EffectiveDate)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Loading,
    Ready,
    Failed,
}

#[derive(Debug)]
pub enum Msg {
    Mount,
    SetQuery(String),
    SortBy(RateField),
    SetSort(SortState),
    SelectDate(NaiveDate),
    ShiftDate(i64),
    SetLookback(u32),
    Loaded {
        seq: u64,
        result: Result<Vec<ExchangeRateRecord>, FetchError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub seq: u64,
    pub query: RateQuery,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewState {
    pub screen: Screen,
    pub query: String,
    pub sort: SortState,
    pub selected_date: Option<NaiveDate>,
    pub lookback_days: u32,
    pub phase: Phase,
    pub loading: bool,
    pub records: Vec<ExchangeRateRecord>,
    pub error: Option<String>,
    pub latest_request: u64,
    today: NaiveDate,
}

impl ViewState {
    pub fn new(screen: Screen, today: NaiveDate, lookback_days: u32) -> Self {
        ViewState {
            sort: screen.default_sort(),
            screen,
            query: String::new(),
            selected_date: None,
            lookback_days: lookback_days.clamp(1, MAX_LOOKBACK_DAYS),
            phase: Phase::Idle,
            loading: false,
            records: Vec::new(),
            error: None,
            latest_request: 0,
            today,
        }
    }

    pub fn update(&mut self, msg: Msg) -> Option<FetchRequest> {
        match msg {
            Msg::Mount => self.issue(),
            Msg::SetQuery(query) => {
                self.query = query;
                None
            }
            Msg::SortBy(field) => {
                self.sort = self.sort.toggled(field);
                None
            }
            Msg::SetSort(sort) => {
                self.sort = sort;
                None
            }
            Msg::SelectDate(date) => {
                self.selected_date = Some(date);
                self.refetch_if_date_driven()
            }
            Msg::ShiftDate(days) => {
                let Some(date) = shift(self.effective_date(), days) else {
                    log::warn!("Date shift by {days} days is out of range");
                    return None;
                };
                self.selected_date = Some(date);
                self.refetch_if_date_driven()
            }
            Msg::SetLookback(days) => {
                self.lookback_days = days.clamp(1, MAX_LOOKBACK_DAYS);
                match self.screen {
                    Screen::RangeDifferences { .. } if self.phase != Phase::Idle => self.issue(),
                    _ => None,
                }
            }
            Msg::Loaded { seq, result } => {
                self.apply(seq, result);
                None
            }
        }
    }

    fn refetch_if_date_driven(&mut self) -> Option<FetchRequest> {
        if self.phase == Phase::Idle {
            return None;
        }
        match self.screen {
            Screen::CurrentTable | Screen::RangeDifferences { .. } => self.issue(),
            Screen::CurrencyHistory { .. } => None,
        }
    }

    fn issue(&mut self) -> Option<FetchRequest> {
        let query = self.rate_query()?;
        self.latest_request += 1;
        self.phase = Phase::Loading;
        self.loading = true;
        Some(FetchRequest {
            seq: self.latest_request,
            query,
        })
    }

    fn apply(&mut self, seq: u64, result: Result<Vec<ExchangeRateRecord>, FetchError>) {
        if seq != self.latest_request {
            log::debug!(
                "Discarding stale result #{seq}, latest is #{}",
                self.latest_request
            );
            return;
        }

        self.loading = false;
        match result {
            Ok(records) => {
                self.records = records;
                self.error = None;
                self.phase = Phase::Ready;
            }
            Err(e) => {
                log::error!("Fetch #{seq} failed: {e}");
                self.error = Some(e.to_string());
                self.phase = Phase::Failed;
            }
        }
    }

    /// The date the screen is anchored on: the selection, or today.
    pub fn effective_date(&self) -> NaiveDate {
        self.selected_date.unwrap_or(self.today)
    }

    /// First day of the range-difference window.
    pub fn range_start(&self) -> Option<NaiveDate> {
        self.effective_date()
            .checked_sub_days(Days::new(u64::from(self.lookback_days)))
    }

    pub fn rate_query(&self) -> Option<RateQuery> {
        match &self.screen {
            Screen::CurrentTable => Some(match self.selected_date {
                Some(date) => RateQuery::ForDate(date),
                None => RateQuery::Current,
            }),
            Screen::CurrencyHistory { currency, from } => Some(match from {
                Some(from) => RateQuery::CurrencyHistoryFrom(currency.clone(), *from),
                None => RateQuery::CurrencyHistory(currency.clone()),
            }),
            Screen::RangeDifferences { .. } => {
                let from = self.range_start()?;
                Some(RateQuery::Range {
                    from,
                    to: self.effective_date(),
                })
            }
        }
    }

    /// Records as displayed: searched and sorted.
    pub fn rows(&self) -> Vec<ExchangeRateRecord> {
        let mut rows = filter_records(&self.records, &self.query, &DEFAULT_SEARCH_FIELDS);
        sort_records(&mut rows, self.sort);
        rows
    }

    /// Range-difference rows: one per list for the screen's currency, in
    /// date order, each compared against the list before it.
    pub fn delta_rows(&self) -> Vec<DeltaRow> {
        let currency = match &self.screen {
            Screen::RangeDifferences { currency } | Screen::CurrencyHistory { currency, .. } => {
                currency.as_str()
            }
            Screen::CurrentTable => return Vec::new(),
        };

        let mine: Vec<ExchangeRateRecord> = self
            .records
            .iter()
            .filter(|r| r.currency.eq_ignore_ascii_case(currency))
            .cloned()
            .collect();
        let grouped = group_by_list_number(&mine, Keep::Earliest);

        let rows = delta_rows(&grouped);
        let needle = self.query.trim().to_lowercase();
        if needle.is_empty() {
            return rows;
        }

        let visible = filter_records(&grouped, &self.query, &DEFAULT_SEARCH_FIELDS);
        rows.into_iter()
            .filter(|row| visible.contains(&row.record))
            .collect()
    }
}

fn shift(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    let step = Days::new(days.unsigned_abs());
    if days >= 0 {
        date.checked_add_days(step)
    } else {
        date.checked_sub_days(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::delta::DeltaSignal;
    use crate::exchange_rate::tests::record;
    use crate::transform::SortOrder;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn today() -> NaiveDate {
        date("2024-03-10")
    }

    fn usd_history() -> ViewState {
        ViewState::new(
            Screen::CurrencyHistory {
                currency: "USD".to_string(),
                from: None,
            },
            today(),
            4,
        )
    }

    #[test]
    fn mount_issues_screen_query() {
        let mut view = usd_history();

        let request = view.update(Msg::Mount).unwrap();

        assert_eq!(request.seq, 1);
        assert_eq!(request.query, RateQuery::CurrencyHistory("USD".to_string()));
        assert_eq!(view.phase, Phase::Loading);
        assert!(view.loading);
    }

    #[test]
    fn loaded_result_replaces_records() {
        let mut view = usd_history();
        let request = view.update(Msg::Mount).unwrap();

        view.update(Msg::Loaded {
            seq: request.seq,
            result: Ok(vec![record("1", "2024-01-01", "USD")]),
        });

        assert_eq!(view.phase, Phase::Ready);
        assert!(!view.loading);
        assert_eq!(view.records.len(), 1);
    }

    #[test]
    fn stale_result_is_discarded() {
        let mut view = ViewState::new(Screen::CurrentTable, today(), 4);
        view.update(Msg::Mount);
        let first = view.update(Msg::SelectDate(date("2024-03-01"))).unwrap();
        let second = view.update(Msg::SelectDate(date("2024-03-02"))).unwrap();
        assert!(second.seq > first.seq);

        view.update(Msg::Loaded {
            seq: second.seq,
            result: Ok(vec![record("2", "2024-03-02", "USD")]),
        });
        view.update(Msg::Loaded {
            seq: first.seq,
            result: Ok(vec![record("1", "2024-03-01", "USD")]),
        });

        assert_eq!(view.records[0].list_number, "2");
        assert_eq!(view.phase, Phase::Ready);
    }

    #[test]
    fn stale_result_does_not_end_loading() {
        let mut view = ViewState::new(Screen::CurrentTable, today(), 4);
        let first = view.update(Msg::Mount).unwrap();
        view.update(Msg::Mount);

        view.update(Msg::Loaded {
            seq: first.seq,
            result: Ok(vec![]),
        });

        assert!(view.loading);
        assert_eq!(view.phase, Phase::Loading);
    }

    #[test]
    fn failure_is_visible_and_keeps_records() {
        let mut view = usd_history();
        let first = view.update(Msg::Mount).unwrap();
        view.update(Msg::Loaded {
            seq: first.seq,
            result: Ok(vec![record("1", "2024-01-01", "USD")]),
        });

        let second = view.update(Msg::Mount).unwrap();
        view.update(Msg::Loaded {
            seq: second.seq,
            result: Err(FetchError::Status(503)),
        });

        assert_eq!(view.phase, Phase::Failed);
        assert!(!view.loading);
        assert_eq!(view.error.as_deref(), Some("API responded with status 503"));
        assert_eq!(view.records.len(), 1);
    }

    #[test]
    fn date_before_mount_only_sets_state() {
        let mut view = ViewState::new(Screen::CurrentTable, today(), 4);

        assert_eq!(view.update(Msg::SelectDate(date("2024-03-01"))), None);
        let request = view.update(Msg::Mount).unwrap();

        assert_eq!(request.query, RateQuery::ForDate(date("2024-03-01")));
    }

    #[test]
    fn shift_date_moves_from_today() {
        let mut view = ViewState::new(Screen::CurrentTable, today(), 4);
        view.update(Msg::Mount);

        let request = view.update(Msg::ShiftDate(-1)).unwrap();

        assert_eq!(request.query, RateQuery::ForDate(date("2024-03-09")));
    }

    #[test]
    fn range_query_uses_lookback() {
        let mut view = ViewState::new(
            Screen::RangeDifferences {
                currency: "USD".to_string(),
            },
            today(),
            4,
        );
        view.update(Msg::Mount);

        let request = view.update(Msg::SetLookback(7)).unwrap();

        assert_eq!(
            request.query,
            RateQuery::Range {
                from: date("2024-03-03"),
                to: today(),
            }
        );
    }

    #[test]
    fn lookback_is_clamped() {
        let mut view = ViewState::new(Screen::CurrentTable, today(), 0);
        assert_eq!(view.lookback_days, 1);

        view.update(Msg::SetLookback(1000));
        assert_eq!(view.lookback_days, MAX_LOOKBACK_DAYS);
    }

    #[test]
    fn sort_and_query_do_not_fetch() {
        let mut view = ViewState::new(Screen::CurrentTable, today(), 4);
        view.update(Msg::Mount);

        assert_eq!(view.update(Msg::SetQuery("usd".to_string())), None);
        assert_eq!(view.update(Msg::SortBy(RateField::Country)), None);
        assert_eq!(view.sort.order, SortOrder::Desc);
    }

    #[test]
    fn history_rows_sorted_by_date() {
        let mut view = usd_history();
        let request = view.update(Msg::Mount).unwrap();
        view.update(Msg::Loaded {
            seq: request.seq,
            result: Ok(vec![
                record("3", "2024-01-03", "USD"),
                record("1", "2024-01-01", "USD"),
                record("2", "2024-01-02", "USD"),
            ]),
        });

        let lists: Vec<String> = view.rows().into_iter().map(|r| r.list_number).collect();

        assert_eq!(lists, vec!["1", "2", "3"]);
    }

    #[test]
    fn delta_rows_keep_screen_currency() {
        let mut view = ViewState::new(
            Screen::RangeDifferences {
                currency: "USD".to_string(),
            },
            today(),
            4,
        );
        let request = view.update(Msg::Mount).unwrap();
        view.update(Msg::Loaded {
            seq: request.seq,
            result: Ok(vec![
                record("2", "2024-03-08", "USD"),
                record("2", "2024-03-08", "CHF"),
                record("1", "2024-03-07", "USD"),
            ]),
        });

        let rows = view.delta_rows();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].record.list_number, "1");
        assert_eq!(rows[1].record.list_number, "2");
    }

    #[test]
    fn range_search_keeps_comparison_with_hidden_rows() {
        let mut view = ViewState::new(
            Screen::RangeDifferences {
                currency: "USD".to_string(),
            },
            today(),
            4,
        );
        let request = view.update(Msg::Mount).unwrap();
        view.update(Msg::Loaded {
            seq: request.seq,
            result: Ok(vec![
                record("1", "2024-03-07", "USD"),
                ExchangeRateRecord {
                    middle_rate: "1,100000".to_string(),
                    ..record("2", "2024-03-08", "USD")
                },
                record("3", "2024-03-09", "USD"),
            ]),
        });
        view.update(Msg::SetQuery("2024-03-08".to_string()));

        let rows = view.delta_rows();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record.list_number, "2");
        assert_eq!(rows[0].middle, DeltaSignal::Increase);
        assert_eq!(rows[0].change, Some(rust_decimal::Decimal::new(1000, 2)));
    }

    #[test]
    fn state_serializes() {
        let view = usd_history();

        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["screen"]["kind"], "currency_history");
        assert_eq!(json["phase"], "idle");
        assert_eq!(json["sort"]["field"], "datum_primjene");
    }
}
