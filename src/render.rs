//! Server-side pages for the home page and the three rate screens.
//!
//! Markup lives in `templates/`; this module only turns a [`ViewState`] into
//! template context. Tera escapes every value because the templates are `.html`.

use serde::Serialize;
use tera::{Context, Tera};
use url::form_urlencoded;

use crate::client::format_date;
use crate::delta::{DeltaRow, DeltaSignal};
use crate::exchange_rate::{ExchangeRateRecord, RateField};
use crate::transform::SortOrder;
use crate::view::{LOOKBACK_CHOICES, Screen, ViewState};

const TEMPLATES: [(&str, &str); 9] = [
    ("base.html", include_str!("../templates/base.html")),
    ("home.html", include_str!("../templates/home.html")),
    ("status.html", include_str!("../templates/status.html")),
    ("date_nav.html", include_str!("../templates/date_nav.html")),
    ("search.html", include_str!("../templates/search.html")),
    ("table.html", include_str!("../templates/table.html")),
    ("current_table.html", include_str!("../templates/current_table.html")),
    ("currency_history.html", include_str!("../templates/currency_history.html")),
    ("range_differences.html", include_str!("../templates/range_differences.html")),
];

const CURRENT_COLUMNS: [RateField; 7] = [
    RateField::Country,
    RateField::CountryIso,
    RateField::NumericCode,
    RateField::Currency,
    RateField::BuyRate,
    RateField::MiddleRate,
    RateField::SellRate,
];

const HISTORY_COLUMNS: [RateField; 7] = [
    RateField::ListNumber,
    RateField::EffectiveDate,
    RateField::Currency,
    RateField::Country,
    RateField::BuyRate,
    RateField::MiddleRate,
    RateField::SellRate,
];

#[derive(Serialize)]
struct Column {
    label: &'static str,
    href: String,
    marker: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum CellKind {
    Text,
    Currency,
    Rate,
}

#[derive(Serialize)]
struct Cell<'a> {
    value: &'a str,
    kind: CellKind,
}

#[derive(Serialize)]
struct Hidden {
    name: &'static str,
    value: String,
}

#[derive(Serialize)]
struct RateCell<'a> {
    value: &'a str,
    class: &'static str,
    background: &'static str,
}

#[derive(Serialize)]
struct RangeRow<'a> {
    list_number: &'a str,
    effective_date: &'a str,
    currency: &'a str,
    country: &'a str,
    rates: [RateCell<'a>; 3],
    change: String,
}

impl<'a> RangeRow<'a> {
    fn new(row: &'a DeltaRow) -> Self {
        let record = &row.record;
        let rate = |value: &'a str, signal: DeltaSignal| RateCell {
            value,
            class: signal.css_class(),
            background: signal.background(),
        };
        RangeRow {
            list_number: &record.list_number,
            effective_date: &record.effective_date,
            currency: &record.currency,
            country: &record.country,
            rates: [
                rate(&record.buy_rate, row.buy),
                rate(&record.middle_rate, row.middle),
                rate(&record.sell_rate, row.sell),
            ],
            change: match row.change {
                Some(change) => format!("{change:.2}%"),
                None => "N/A".to_string(),
            },
        }
    }
}

fn href(path: &str, pairs: &[(&str, String)]) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs.iter().filter(|(_, v)| !v.is_empty()) {
        query.append_pair(key, value);
    }
    let query = query.finish();
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{query}")
    }
}

/// Links back to the same screen; the extra pairs become messages for the
/// view state when the link is followed.
struct Links<'a> {
    path: String,
    view: &'a ViewState,
}

impl Links<'_> {
    fn with(&self, extra: &[(&str, String)]) -> String {
        let view = self.view;
        let mut pairs = vec![
            ("q", view.query.clone()),
            ("sort", view.sort.field.api_name().to_string()),
            ("order", view.sort.order.as_str().to_string()),
        ];
        if !extra.iter().any(|(key, _)| *key == "date") {
            if let Some(date) = view.selected_date {
                pairs.push(("date", format_date(date)));
            }
        }
        if matches!(view.screen, Screen::RangeDifferences { .. }) {
            pairs.push(("days", view.lookback_days.to_string()));
        }
        pairs.extend(extra.iter().cloned());
        href(&self.path, &pairs)
    }

    fn toggle(&self, field: RateField) -> String {
        self.with(&[("toggle", field.api_name().to_string())])
    }

    fn shift(&self, days: i64) -> String {
        self.with(&[
            ("date", format_date(self.view.effective_date())),
            ("shift", days.to_string()),
        ])
    }

    fn columns(&self, fields: &[RateField]) -> Vec<Column> {
        let sort = self.view.sort;
        fields
            .iter()
            .map(|field| Column {
                label: field.label(),
                href: self.toggle(*field),
                marker: match (sort.field == *field, sort.order) {
                    (true, SortOrder::Asc) => " ▲",
                    (true, SortOrder::Desc) => " ▼",
                    (false, _) => "",
                },
            })
            .collect()
    }
}

fn cells<'a>(rows: &'a [ExchangeRateRecord], fields: &[RateField]) -> Vec<Vec<Cell<'a>>> {
    rows.iter()
        .map(|record| {
            fields
                .iter()
                .map(|field| Cell {
                    value: record.field(*field),
                    kind: if *field == RateField::Currency {
                        CellKind::Currency
                    } else if field.is_rate() {
                        CellKind::Rate
                    } else {
                        CellKind::Text
                    },
                })
                .collect()
        })
        .collect()
}

/// Compiled page templates.
pub struct Pages {
    tera: Tera,
}

impl Pages {
    pub fn new() -> tera::Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES)?;
        Ok(Pages { tera })
    }

    pub fn home(&self, default_currency: &str) -> tera::Result<String> {
        let mut context = Context::new();
        context.insert("title", "Tečajna lista HNB");
        context.insert("default_currency", default_currency);
        self.tera.render("home.html", &context)
    }

    fn screen_context(&self, view: &ViewState, links: &Links, title: &str) -> Context {
        let mut context = Context::new();
        context.insert("title", title);
        context.insert("phase", &view.phase);
        context.insert("error", view.error.as_deref().unwrap_or("nepoznata greška"));
        context.insert("query", &view.query);
        context.insert("sort", &view.sort);
        context.insert("date", &format_date(view.effective_date()));
        context.insert("prev_href", &links.shift(-1));
        context.insert("next_href", &links.shift(1));
        context
    }

    pub fn current_table(&self, view: &ViewState) -> tera::Result<String> {
        let links = Links {
            path: "/tecaj".to_string(),
            view,
        };
        let rows = view.rows();
        let hidden: Vec<Hidden> = view
            .selected_date
            .map(|date| Hidden {
                name: "date",
                value: format_date(date),
            })
            .into_iter()
            .collect();

        let mut context = self.screen_context(view, &links, "Tečajna lista");
        context.insert("hidden_fields", &hidden);
        context.insert("columns", &links.columns(&CURRENT_COLUMNS));
        context.insert("rows", &cells(&rows, &CURRENT_COLUMNS));
        self.tera.render("current_table.html", &context)
    }

    pub fn currency_history(&self, view: &ViewState) -> tera::Result<String> {
        let (currency, from) = match &view.screen {
            Screen::CurrencyHistory { currency, from } => (currency.as_str(), *from),
            _ => ("", None),
        };
        let (path, title) = match from {
            Some(from) => (
                format!("/povijest/{currency}/{}", format_date(from)),
                format!("Povijest valute {currency} od {}", format_date(from)),
            ),
            None => (
                format!("/povijest/{currency}"),
                format!("Povijest valute {currency}"),
            ),
        };
        let links = Links { path, view };
        let rows = view.rows();

        let mut context = self.screen_context(view, &links, &title);
        context.insert("currency", currency);
        context.insert("hidden_fields", &Vec::<Hidden>::new());
        context.insert("columns", &links.columns(&HISTORY_COLUMNS));
        context.insert("rows", &cells(&rows, &HISTORY_COLUMNS));
        self.tera.render("currency_history.html", &context)
    }

    pub fn range_differences(&self, view: &ViewState) -> tera::Result<String> {
        let currency = match &view.screen {
            Screen::RangeDifferences { currency } => currency.as_str(),
            _ => "",
        };
        let links = Links {
            path: format!("/povijest/{currency}/razlike"),
            view,
        };
        let delta_rows = view.delta_rows();
        let rows: Vec<RangeRow> = delta_rows.iter().map(RangeRow::new).collect();
        let labels: Vec<&str> = HISTORY_COLUMNS.iter().map(|field| field.label()).collect();

        let mut context =
            self.screen_context(view, &links, &format!("Tečajne razlike {currency}"));
        context.insert("lookback_choices", &LOOKBACK_CHOICES);
        context.insert("lookback_days", &view.lookback_days);
        context.insert("range_start", &view.range_start().map(format_date));
        context.insert("labels", &labels);
        context.insert("delta_rows", &rows);
        self.tera.render("range_differences.html", &context)
    }
}
