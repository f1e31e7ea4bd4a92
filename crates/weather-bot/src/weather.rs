//! OpenWeatherMap client: current conditions and the 5-day/3-hour forecast,
//! imperial units.

use crate::commands::{CityQuery, ZipQuery};
use chrono::{FixedOffset, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;

const OPENWEATHER_API_BASE: &str = "https://api.openweathermap.org/data/2.5";

/// Two-letter US state codes; a bare state with no country implies "us" in
/// lookup queries.
const US_STATES: [&str; 50] = [
    "AL", "AK", "AR", "AZ", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "IA", "ID", "IL", "IN",
    "KS", "KY", "LA", "MA", "MD", "ME", "MI", "MN", "MO", "MS", "MT", "NC", "ND", "NE", "NH",
    "NJ", "NM", "NV", "NY", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT",
    "VA", "WA", "WV", "WI", "WY",
];

fn is_us_state(s: &str) -> bool {
    US_STATES.contains(&s.to_ascii_uppercase().as_str())
}

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("openweathermap request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("openweathermap query failed ({status}): {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThermalReadings {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Condition {
    pub main: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SunTimes {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub sunrise: i64,
    #[serde(default)]
    pub sunset: i64,
}

/// `/weather` response.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentWeather {
    pub name: String,
    /// Shift from UTC in seconds at the looked-up location.
    #[serde(default)]
    pub timezone: i32,
    pub main: ThermalReadings,
    #[serde(default)]
    pub weather: Vec<Condition>,
    pub sys: SunTimes,
}

impl CurrentWeather {
    pub fn condition(&self) -> Option<&Condition> {
        self.weather.first()
    }

    /// Display label, e.g. "San Diego, CA - US".
    pub fn place(&self, state: Option<&str>) -> String {
        let country = self.sys.country.as_deref().unwrap_or_default();
        match state {
            Some(s) => format!("{}, {} - {}", self.name, s.to_uppercase(), country),
            None => format!("{} - {}", self.name, country),
        }
    }
}

/// One 3-hour slot of the `/forecast` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastSlot {
    pub dt: i64,
    pub dt_txt: String,
    pub main: ThermalReadings,
    #[serde(default)]
    pub weather: Vec<Condition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastCity {
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub timezone: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Forecast {
    #[serde(default)]
    pub list: Vec<ForecastSlot>,
    pub city: ForecastCity,
}

impl Forecast {
    pub fn place(&self, state: Option<&str>) -> String {
        let country = self.city.country.as_deref().unwrap_or_default();
        match state {
            Some(s) => format!("{}, {} - {}", self.city.name, s.to_uppercase(), country),
            None => format!("{} - {}", self.city.name, country),
        }
    }
}

/// Render a Unix timestamp in the location's local time using the UTC shift
/// reported by the API.
pub fn format_local(ts: i64, offset_secs: i32) -> Option<String> {
    let offset = FixedOffset::east_opt(offset_secs)?;
    match Utc.timestamp_opt(ts, 0) {
        chrono::LocalResult::Single(t) => Some(
            t.with_timezone(&offset)
                .format("%A %B %d, %Y %I:%M:%S %p")
                .to_string(),
        ),
        _ => None,
    }
}

/// The location's current local time.
pub fn format_now(offset_secs: i32) -> Option<String> {
    let offset = FixedOffset::east_opt(offset_secs)?;
    Some(
        Utc::now()
            .with_timezone(&offset)
            .format("%A %B %d, %Y %I:%M:%S %p")
            .to_string(),
    )
}

#[derive(Clone)]
pub struct OpenWeatherClient {
    base_url: String,
    key: String,
    client: reqwest::Client,
}

impl OpenWeatherClient {
    pub fn new(key: impl Into<String>, base_url: Option<String>) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| OPENWEATHER_API_BASE.to_string());
        Self {
            base_url,
            key: key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Compose the `q` parameter: city[,state[,country]], defaulting a bare
    /// US state to country "us".
    fn location_q(query: &CityQuery) -> String {
        match (&query.state, &query.country_code) {
            (Some(state), Some(country)) => format!("{},{},{}", query.city, state, country),
            (Some(state), None) if is_us_state(state) => format!("{},{},us", query.city, state),
            (Some(state), None) => format!("{},{}", query.city, state),
            (None, _) => query.city.clone(),
        }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        location: (&str, String),
    ) -> Result<T, WeatherError> {
        let url = format!("{}/{}", self.base_url, path);
        let res = self
            .client
            .get(&url)
            .query(&[
                location,
                ("units", "imperial".to_string()),
                ("appid", self.key.clone()),
            ])
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let message = res.text().await.unwrap_or_default();
            return Err(WeatherError::Api { status, message });
        }
        Ok(res.json::<T>().await?)
    }

    pub async fn current_by_city(&self, query: &CityQuery) -> Result<CurrentWeather, WeatherError> {
        self.fetch("weather", ("q", Self::location_q(query))).await
    }

    pub async fn current_by_zip(&self, query: &ZipQuery) -> Result<CurrentWeather, WeatherError> {
        let zip = format!(
            "{},{}",
            query.postal_code,
            query.country_code.as_deref().unwrap_or("us")
        );
        self.fetch("weather", ("zip", zip)).await
    }

    pub async fn forecast_by_city(&self, query: &CityQuery) -> Result<Forecast, WeatherError> {
        self.fetch("forecast", ("q", Self::location_q(query))).await
    }
}
