use std::sync::Arc;

use actix_web::{HttpResponse, http::StatusCode, web};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Europe::Zagreb;
use serde::Deserialize;

use crate::client::RateSource;
use crate::error::{PageError, RequestError};
use crate::exchange_rate::RateField;
use crate::render::Pages;
use crate::transform::{SortOrder, SortState};
use crate::view::{MAX_LOOKBACK_DAYS, Msg, Phase, Screen, ViewState};

pub struct AppState {
    pub source: Arc<dyn RateSource>,
    pub pages: Pages,
    pub default_currency: String,
    pub lookback_days: u32,
}

/// Screen state carried in the query string.
///
/// `toggle` and `shift` are one-shot actions from sort headers and the
/// prev/next day links; they are applied on top of the other fields.
#[derive(Debug, Default, Deserialize)]
pub struct ViewParams {
    pub q: Option<String>,
    pub sort: Option<RateField>,
    pub order: Option<SortOrder>,
    pub toggle: Option<RateField>,
    pub date: Option<String>,
    pub shift: Option<i64>,
    pub days: Option<u32>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(home))
        .route("/tecaj", web::get().to(current_table))
        .route("/povijest/{currency}", web::get().to(currency_history))
        // must precede the dated history route
        .route("/povijest/{currency}/razlike", web::get().to(range_differences))
        .route("/povijest/{currency}/{date}", web::get().to(currency_history_from));
}

pub fn parse_currency(code: &str) -> Result<String, RequestError> {
    let code = code.trim();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code.to_ascii_uppercase())
    } else {
        Err(RequestError::InvalidCurrency(code.to_string()))
    }
}

pub fn parse_date(date: &str) -> Result<NaiveDate, RequestError> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| RequestError::InvalidDate(date.to_string()))
}

/// Calendar date in Zagreb, where HNB publishes its lists.
pub fn publication_date(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&Zagreb).date_naive()
}

fn build_view(
    state: &AppState,
    screen: Screen,
    params: &ViewParams,
) -> Result<ViewState, RequestError> {
    let mut view = ViewState::new(screen, publication_date(Utc::now()), state.lookback_days);

    if let Some(q) = &params.q {
        view.update(Msg::SetQuery(q.clone()));
    }
    if let Some(field) = params.sort {
        view.update(Msg::SetSort(SortState {
            field,
            order: params.order.unwrap_or_default(),
        }));
    }
    if let Some(field) = params.toggle {
        view.update(Msg::SortBy(field));
    }
    if let Some(date) = params.date.as_deref().filter(|d| !d.trim().is_empty()) {
        view.update(Msg::SelectDate(parse_date(date)?));
    }
    if let Some(days) = params.shift {
        view.update(Msg::ShiftDate(days));
    }
    if let Some(days) = params.days {
        if !(1..=MAX_LOOKBACK_DAYS).contains(&days) {
            return Err(RequestError::InvalidLookback(days));
        }
        view.update(Msg::SetLookback(days));
    }

    Ok(view)
}

async fn load(source: &dyn RateSource, view: &mut ViewState) {
    let Some(request) = view.update(Msg::Mount) else {
        log::warn!("Nothing to fetch for {:?}", view.screen);
        return;
    };

    let result = request.query.send(source).await;
    view.update(Msg::Loaded {
        seq: request.seq,
        result,
    });
}

fn html(view: &ViewState, body: String) -> HttpResponse {
    let status = match view.phase {
        Phase::Failed => StatusCode::BAD_GATEWAY,
        _ => StatusCode::OK,
    };
    HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(body)
}

async fn home(state: web::Data<AppState>) -> Result<HttpResponse, PageError> {
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(state.pages.home(&state.default_currency)?))
}

async fn current_table(
    state: web::Data<AppState>,
    params: web::Query<ViewParams>,
) -> Result<HttpResponse, PageError> {
    let mut view = build_view(&state, Screen::CurrentTable, &params)?;
    load(state.source.as_ref(), &mut view).await;

    Ok(html(&view, state.pages.current_table(&view)?))
}

async fn currency_history(
    state: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<ViewParams>,
) -> Result<HttpResponse, PageError> {
    let currency = parse_currency(&path)?;
    let screen = Screen::CurrencyHistory {
        currency,
        from: None,
    };
    let mut view = build_view(&state, screen, &params)?;
    load(state.source.as_ref(), &mut view).await;

    Ok(html(&view, state.pages.currency_history(&view)?))
}

async fn currency_history_from(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    params: web::Query<ViewParams>,
) -> Result<HttpResponse, PageError> {
    let (currency, date) = path.into_inner();
    let screen = Screen::CurrencyHistory {
        currency: parse_currency(&currency)?,
        from: Some(parse_date(&date)?),
    };
    let mut view = build_view(&state, screen, &params)?;
    load(state.source.as_ref(), &mut view).await;

    Ok(html(&view, state.pages.currency_history(&view)?))
}

async fn range_differences(
    state: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<ViewParams>,
) -> Result<HttpResponse, PageError> {
    let screen = Screen::RangeDifferences {
        currency: parse_currency(&path)?,
    };
    let mut view = build_view(&state, screen, &params)?;
    load(state.source.as_ref(), &mut view).await;

    Ok(html(&view, state.pages.range_differences(&view)?))
}
