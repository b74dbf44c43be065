//! Pure list operations over fetched records: search, sort and grouping.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::exchange_rate::{ExchangeRateRecord, RateField, parse_rate};

/// Fields searched when the caller doesn't pick a subset.
pub const DEFAULT_SEARCH_FIELDS: [RateField; 9] = RateField::ALL;

/// Case-insensitive substring search over `fields`.
///
/// A blank query returns every record in its original order.
pub fn filter_records(
    records: &[ExchangeRateRecord],
    query: &str,
    fields: &[RateField],
) -> Vec<ExchangeRateRecord> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return records.to_vec();
    }

    records
        .iter()
        .filter(|record| {
            fields
                .iter()
                .any(|field| record.field(*field).to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn flipped(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Any column can be sorted on. Codes and list numbers sort numerically.
pub type SortField = RateField;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortState {
    pub field: SortField,
    pub order: SortOrder,
}

impl SortState {
    pub fn new(field: SortField) -> Self {
        SortState {
            field,
            order: SortOrder::Asc,
        }
    }

    /// Same field flips direction, a new field starts ascending.
    pub fn toggled(self, field: SortField) -> Self {
        if self.field == field {
            SortState {
                field,
                order: self.order.flipped(),
            }
        } else {
            SortState::new(field)
        }
    }
}

/// Stable sort by `sort.field` in `sort.order`.
pub fn sort_records(records: &mut [ExchangeRateRecord], sort: SortState) {
    records.sort_by(|a, b| {
        let ordering = compare_field(a, b, sort.field);
        match sort.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

fn compare_field(a: &ExchangeRateRecord, b: &ExchangeRateRecord, field: SortField) -> Ordering {
    let (left, right) = (a.field(field), b.field(field));
    match field {
        RateField::BuyRate
        | RateField::MiddleRate
        | RateField::SellRate
        | RateField::ListNumber
        | RateField::NumericCode => compare_numeric(left, right),
        RateField::EffectiveDate => compare_dates(a, b),
        RateField::Country | RateField::CountryIso | RateField::Currency => {
            compare_text(left, right)
        }
    }
}

// Unparseable values go after every number.
fn compare_numeric(left: &str, right: &str) -> Ordering {
    match (parse_rate(left), parse_rate(right)) {
        (Some(l), Some(r)) => l.cmp(&r),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => left.cmp(right),
    }
}

fn compare_dates(a: &ExchangeRateRecord, b: &ExchangeRateRecord) -> Ordering {
    match (a.date(), b.date()) {
        (Some(l), Some(r)) => l.cmp(&r),
        _ => a.effective_date.cmp(&b.effective_date),
    }
}

/// Croatian-alphabet comparison, case-insensitive, raw string as tiebreak.
pub fn compare_text(left: &str, right: &str) -> Ordering {
    let l = left.chars().map(collation_key);
    let r = right.chars().map(collation_key);
    l.cmp(r).then_with(|| left.cmp(right))
}

fn collation_key(c: char) -> (char, u8) {
    let lower = c.to_lowercase().next().unwrap_or(c);
    match lower {
        'č' => ('c', 1),
        'ć' => ('c', 2),
        'đ' => ('d', 1),
        'š' => ('s', 1),
        'ž' => ('z', 1),
        other => (other, 0),
    }
}

/// Which record survives when several share a list number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keep {
    Earliest,
    Latest,
}

/// One record per exchange-list number, ordered by effective date.
pub fn group_by_list_number(records: &[ExchangeRateRecord], keep: Keep) -> Vec<ExchangeRateRecord> {
    let mut groups: HashMap<&str, &ExchangeRateRecord> = HashMap::new();

    for record in records {
        groups
            .entry(record.list_number.as_str())
            .and_modify(|existing| {
                let replace = match keep {
                    Keep::Earliest => compare_dates(record, *existing) == Ordering::Less,
                    Keep::Latest => compare_dates(record, *existing) == Ordering::Greater,
                };
                if replace {
                    *existing = record;
                }
            })
            .or_insert(record);
    }

    let mut unique: Vec<ExchangeRateRecord> = groups.into_values().cloned().collect();
    unique.sort_by(|a, b| {
        compare_dates(a, b).then_with(|| compare_numeric(&a.list_number, &b.list_number))
    });
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    use crate::exchange_rate::tests::record;

    fn with_middle(rate: &str, currency: &str) -> ExchangeRateRecord {
        ExchangeRateRecord {
            middle_rate: rate.to_string(),
            ..record("1", "2024-01-01", currency)
        }
    }

    fn with_country(country: &str) -> ExchangeRateRecord {
        ExchangeRateRecord {
            country: country.to_string(),
            ..record("1", "2024-01-01", "XXX")
        }
    }

    fn currencies(records: &[ExchangeRateRecord]) -> Vec<&str> {
        records.iter().map(|r| r.currency.as_str()).collect()
    }

    #[test]
    fn empty_query_returns_input_unchanged() {
        let records = vec![
            record("1", "2024-01-01", "USD"),
            record("1", "2024-01-01", "CHF"),
        ];

        assert_eq!(filter_records(&records, "", &DEFAULT_SEARCH_FIELDS), records);
        assert_eq!(filter_records(&records, "   ", &DEFAULT_SEARCH_FIELDS), records);
    }

    #[test]
    fn filter_is_case_insensitive() {
        let records = vec![
            record("1", "2024-01-01", "USD"),
            record("1", "2024-01-01", "CHF"),
        ];

        let found = filter_records(&records, "usd", &[RateField::Currency]);

        assert_eq!(currencies(&found), vec!["USD"]);
    }

    #[test]
    fn filter_respects_field_subset() {
        let records = vec![record("196", "2024-01-01", "USD")];

        assert!(filter_records(&records, "196", &[RateField::Currency]).is_empty());
        assert_eq!(
            filter_records(&records, "196", &[RateField::ListNumber]).len(),
            1
        );
    }

    #[test]
    fn numeric_sort_normalizes_commas() {
        let mut records = vec![with_middle("7,50", "A"), with_middle("7,25", "B")];

        sort_records(&mut records, SortState::new(RateField::MiddleRate));

        assert_eq!(currencies(&records), vec!["B", "A"]);
    }

    #[test]
    fn numeric_sort_is_not_lexicographic() {
        let mut records = vec![with_middle("10,0", "A"), with_middle("9,5", "B")];

        sort_records(&mut records, SortState::new(RateField::MiddleRate));

        assert_eq!(currencies(&records), vec!["B", "A"]);
    }

    #[test]
    fn unparseable_rates_sort_last() {
        let mut records = vec![with_middle("n/a", "A"), with_middle("1,0", "B")];

        sort_records(&mut records, SortState::new(RateField::MiddleRate));

        assert_eq!(currencies(&records), vec!["B", "A"]);
    }

    #[test]
    fn unparseable_rates_lead_when_descending() {
        let mut records = vec![
            with_middle("1,0", "A"),
            with_middle("n/a", "B"),
            with_middle("2,0", "C"),
        ];

        sort_records(
            &mut records,
            SortState {
                field: RateField::MiddleRate,
                order: SortOrder::Desc,
            },
        );

        assert_eq!(currencies(&records), vec!["B", "C", "A"]);
    }

    #[test]
    fn toggling_twice_returns_to_ascending() {
        let original = vec![
            with_middle("3,0", "C"),
            with_middle("1,0", "A"),
            with_middle("2,0", "B"),
        ];
        let state = SortState::new(RateField::MiddleRate);
        let mut ascending = original.clone();
        sort_records(&mut ascending, state);

        let flipped = state.toggled(RateField::MiddleRate);
        let mut descending = original.clone();
        sort_records(&mut descending, flipped);
        assert_eq!(currencies(&descending), vec!["C", "B", "A"]);

        let back = flipped.toggled(RateField::MiddleRate);
        let mut again = original;
        sort_records(&mut again, back);
        assert_eq!(back.order, SortOrder::Asc);
        assert_eq!(again, ascending);
    }

    #[test]
    fn new_field_resets_to_ascending() {
        let state = SortState {
            field: RateField::Country,
            order: SortOrder::Desc,
        };

        assert_eq!(
            state.toggled(RateField::Currency),
            SortState::new(RateField::Currency)
        );
    }

    #[test]
    fn sort_is_stable() {
        let mut records = vec![
            with_middle("1,0", "A"),
            with_middle("1,00", "B"),
            with_middle("0,5", "C"),
        ];

        sort_records(&mut records, SortState::new(RateField::MiddleRate));

        assert_eq!(currencies(&records), vec!["C", "A", "B"]);
    }

    #[rstest]
    #[case("Cipar", "Čile", Ordering::Less)]
    #[case("Čile", "Ćuprija", Ordering::Less)]
    #[case("Švicarska", "Turska", Ordering::Less)]
    #[case("Švicarska", "Slovenija", Ordering::Greater)]
    #[case("australija", "Australija", Ordering::Greater)]
    #[case("Danska", "Đakovo", Ordering::Less)]
    fn croatian_collation(#[case] left: &str, #[case] right: &str, #[case] expected: Ordering) {
        assert_eq!(compare_text(left, right), expected);
    }

    #[test]
    fn country_sort_uses_collation() {
        let mut records = vec![
            with_country("Švicarska"),
            with_country("Turska"),
            with_country("Slovenija"),
        ];

        sort_records(&mut records, SortState::new(RateField::Country));

        let countries: Vec<&str> = records.iter().map(|r| r.country.as_str()).collect();
        assert_eq!(countries, vec!["Slovenija", "Švicarska", "Turska"]);
    }

    #[test]
    fn group_keeps_earliest() {
        let records = vec![
            record("1", "2024-01-02", "USD"),
            record("1", "2024-01-01", "USD"),
        ];

        let grouped = group_by_list_number(&records, Keep::Earliest);

        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].effective_date, "2024-01-01");
    }

    #[test]
    fn group_keeps_latest() {
        let records = vec![
            record("1", "2024-01-01", "USD"),
            record("1", "2024-01-02", "USD"),
        ];

        let grouped = group_by_list_number(&records, Keep::Latest);

        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].effective_date, "2024-01-02");
    }

    #[test]
    fn groups_are_ordered_by_date() {
        let records = vec![
            record("3", "2024-01-05", "USD"),
            record("1", "2024-01-03", "USD"),
            record("2", "2024-01-04", "USD"),
            record("1", "2024-01-02", "USD"),
        ];

        let grouped = group_by_list_number(&records, Keep::Earliest);

        let dates: Vec<&str> = grouped.iter().map(|r| r.effective_date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-02", "2024-01-04", "2024-01-05"]);
    }

    #[test]
    fn group_tie_keeps_first_seen() {
        let first = ExchangeRateRecord {
            currency: "FIRST".to_string(),
            ..record("1", "2024-01-01", "USD")
        };
        let records = vec![first.clone(), record("1", "2024-01-01", "USD")];

        assert_eq!(group_by_list_number(&records, Keep::Earliest), vec![first]);
    }
}
