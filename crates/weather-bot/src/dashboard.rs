//! Forecast dashboard page: the 5-day temperature series rendered as an
//! inline SVG chart, plus a Telegram share widget.

use crate::commands::CityQuery;
use crate::weather::OpenWeatherClient;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use std::collections::HashMap;

const CHART_WIDTH: f64 = 960.0;
const CHART_HEIGHT: f64 = 320.0;

/// Forecast slots shown on the dashboard (5 days of 3-hour steps).
const DASH_SLOTS: usize = 40;

#[derive(Clone)]
pub struct DashState {
    pub weather: OpenWeatherClient,
    pub public_url: Option<String>,
}

/// Routes served next to the webhook on the same listener.
pub fn routes(state: DashState) -> Router {
    Router::new().route("/dash", get(dash)).with_state(state)
}

async fn dash(
    State(state): State<DashState>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Html<String>) {
    let Some(city) = params.get("city").filter(|c| !c.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Html("Bad parameters - need a city name for a forecast dashboard at a minimum.".to_string()),
        );
    };
    let query = CityQuery {
        city: city.clone(),
        state: params.get("state").cloned().filter(|s| !s.is_empty()),
        country_code: params.get("country_code").cloned().filter(|s| !s.is_empty()),
    };

    let forecast = match state.weather.forecast_by_city(&query).await {
        Ok(forecast) => forecast,
        Err(e) => {
            log::warn!("forecast lookup for dashboard failed: {}", e);
            return (
                StatusCode::BAD_GATEWAY,
                Html("The forecast could not be retrieved. Please check the city spelling and try again.".to_string()),
            );
        }
    };

    let place = forecast.place(query.state.as_deref());
    let series: Vec<(String, f64)> = forecast
        .list
        .iter()
        .take(DASH_SLOTS)
        .map(|slot| (slot.dt_txt.clone(), slot.main.temp))
        .collect();
    let share_url = state.public_url.as_deref().and_then(|base| {
        let mut url =
            reqwest::Url::parse(&format!("{}/dash", base.trim_end_matches('/'))).ok()?;
        url.query_pairs_mut().append_pair("city", city);
        if let Some(s) = &query.state {
            url.query_pairs_mut().append_pair("state", s);
        }
        if let Some(c) = &query.country_code {
            url.query_pairs_mut().append_pair("country_code", c);
        }
        Some(url.to_string())
    });
    (
        StatusCode::OK,
        Html(render_page(&place, &series, share_url.as_deref())),
    )
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Scale a series into SVG polyline points, left to right, higher values up.
fn polyline_points(values: &[f64], width: f64, height: f64) -> String {
    if values.is_empty() {
        return String::new();
    }
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let span = if (max - min).abs() < f64::EPSILON {
        1.0
    } else {
        max - min
    };
    let step = if values.len() > 1 {
        width / (values.len() - 1) as f64
    } else {
        0.0
    };
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let x = i as f64 * step;
            let y = height - (v - min) / span * height;
            format!("{:.1},{:.1}", x, y)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_page(place: &str, series: &[(String, f64)], share_url: Option<&str>) -> String {
    let temps: Vec<f64> = series.iter().map(|(_, temp)| *temp).collect();
    let points = polyline_points(&temps, CHART_WIDTH, CHART_HEIGHT);
    let first_label = series.first().map(|(label, _)| label.as_str()).unwrap_or("");
    let last_label = series.last().map(|(label, _)| label.as_str()).unwrap_or("");
    let place = escape_html(place);

    let share_button = share_url
        .map(|url| {
            format!(
                "<div><script async src=\"https://telegram.org/js/telegram-widget.js?11\" \
                 data-telegram-share-url=\"{}\" data-comment=\"Forecast dashboard: {}\" \
                 data-size=\"large\"></script></div>",
                escape_html(url),
                place
            )
        })
        .unwrap_or_default();

    format!(
        "<html>\
         <head><title>Forecast dashboard: {place}</title></head>\
         <body>\
         {share_button}\
         <h1>{place}</h1>\
         <svg viewBox=\"0 0 {width} {chart_total}\" width=\"{width}\">\
         <polyline fill=\"none\" stroke=\"#990000\" stroke-width=\"4\" points=\"{points}\"/>\
         <text x=\"0\" y=\"{label_y}\" font-size=\"12\">{first_label}</text>\
         <text x=\"{width}\" y=\"{label_y}\" font-size=\"12\" text-anchor=\"end\">{last_label}</text>\
         </svg>\
         </body>\
         </html>",
        place = place,
        share_button = share_button,
        width = CHART_WIDTH,
        chart_total = CHART_HEIGHT + 24.0,
        points = points,
        label_y = CHART_HEIGHT + 16.0,
        first_label = escape_html(first_label),
        last_label = escape_html(last_label),
    )
}
