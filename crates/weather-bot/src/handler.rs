//! The bot's update handler: command dispatch and replies.

use crate::commands::{self, parse_city, parse_command, parse_postal_code, CityQuery};
use crate::weather::{format_local, format_now, CurrentWeather, OpenWeatherClient};
use async_trait::async_trait;
use lib::api::BotCommand;
use lib::bot::Bot;
use lib::server::UpdateHandler;
use serde_json::{json, Value};

const START_ANIMATION_URL: &str =
    "https://external-content.duckduckgo.com/iu/?u=https://media.giphy.com/media/5yvoGUhBsuBwY/giphy.gif&f=1&nofb=1";

pub struct WeatherHandler {
    weather: OpenWeatherClient,
    /// Public base URL of this deployment, for /dash links. Usually the
    /// configured webhook URL.
    public_url: Option<String>,
}

impl WeatherHandler {
    pub fn new(weather: OpenWeatherClient, public_url: Option<String>) -> Self {
        Self {
            weather,
            public_url,
        }
    }

    /// A command matches both bare (`/start`) and addressed
    /// (`/start@botname`) forms, using the cached identity for the latter.
    fn matches(keyword: &str, name: &str, bot: &Bot) -> bool {
        if keyword == name {
            return true;
        }
        bot.bot_info()
            .and_then(|i| i.username.as_deref())
            .is_some_and(|username| keyword == format!("{}@{}", name, username))
    }

    async fn send_text(&self, bot: &Bot, chat_id: i64, text: String) {
        bot.api()
            .send_message(json!({"chat_id": chat_id, "text": text}))
            .await;
    }

    async fn start(&self, bot: &Bot, chat_id: i64, first_name: &str) {
        bot.api()
            .send_animation(
                json!({"chat_id": chat_id, "animation": START_ANIMATION_URL}),
                None,
            )
            .await;
        let botname = bot
            .bot_info()
            .and_then(|i| i.username.clone())
            .unwrap_or_else(|| "this bot".to_string());
        bot.api()
            .send_message(json!({
                "chat_id": chat_id,
                "text": format!(
                    "Thanks for using {}, {}!\nIt's always wise to check the weather before you run outside. &#128514;",
                    botname, first_name
                ),
                "parse_mode": "html"
            }))
            .await;
        self.send_text(
            bot,
            chat_id,
            "Just submit a command to get weather information.\nFor example, the command: /cityweather San Diego\nwill return weather information for San Diego.\nUse the /help command for the full list of commands.".to_string(),
        )
        .await;
    }

    async fn help(&self, bot: &Bot, chat_id: i64) {
        let mut listing = String::new();
        for spec in commands::command_table() {
            listing.push_str(&format!(
                "/{} - {}\nExample: {}\n",
                spec.command, spec.description, spec.example
            ));
        }
        bot.api()
            .send_message(json!({
                "chat_id": chat_id,
                "text": format!("The following commands are available: \n{}", listing.trim_end()),
                "parse_mode": "html"
            }))
            .await;
    }

    async fn city_weather(&self, bot: &Bot, chat_id: i64, args: &[String]) {
        let query = parse_city(args);
        if query.city.is_empty() {
            self.send_spelling_apology(bot, chat_id, "city").await;
            return;
        }
        match self.weather.current_by_city(&query).await {
            Ok(current) => {
                self.send_conditions(bot, chat_id, &current, query.state.as_deref())
                    .await
            }
            Err(e) => {
                log::warn!("{}", e);
                self.send_spelling_apology(bot, chat_id, "city").await;
            }
        }
    }

    async fn zip_weather(&self, bot: &Bot, chat_id: i64, args: &[String]) {
        let query = parse_postal_code(args);
        if query.postal_code.is_empty() {
            self.send_spelling_apology(bot, chat_id, "postal code").await;
            return;
        }
        match self.weather.current_by_zip(&query).await {
            Ok(current) => self.send_conditions(bot, chat_id, &current, None).await,
            Err(e) => {
                log::warn!("{}", e);
                self.send_spelling_apology(bot, chat_id, "postal code").await;
            }
        }
    }

    /// Current conditions as a photo of the weather icon with an HTML caption.
    async fn send_conditions(
        &self,
        bot: &Bot,
        chat_id: i64,
        current: &CurrentWeather,
        state: Option<&str>,
    ) {
        let icon = current
            .condition()
            .map(|c| c.icon.as_str())
            .unwrap_or("01d");
        bot.api()
            .send_photo(json!({
                "chat_id": chat_id,
                "photo": format!("http://openweathermap.org/img/wn/{}@4x.png", icon),
                "caption": caption_for(current, state),
                "parse_mode": "html"
            }))
            .await;
    }

    async fn dash_link(&self, bot: &Bot, chat_id: i64, args: &[String]) {
        let query = parse_city(args);
        match self.dash_url(&query) {
            Some(url) if !query.city.is_empty() => {
                self.send_text(
                    bot,
                    chat_id,
                    format!("Your dashboard has been created! Check it out - {}", url),
                )
                .await;
            }
            _ => self.send_spelling_apology(bot, chat_id, "city").await,
        }
    }

    fn dash_url(&self, query: &CityQuery) -> Option<String> {
        let base = self.public_url.as_deref()?.trim_end_matches('/');
        let mut url = reqwest::Url::parse(&format!("{}/dash", base)).ok()?;
        url.query_pairs_mut().append_pair("city", &query.city);
        if let Some(state) = &query.state {
            url.query_pairs_mut().append_pair("state", state);
        }
        if let Some(country) = &query.country_code {
            url.query_pairs_mut().append_pair("country_code", country);
        }
        Some(url.to_string())
    }

    async fn send_spelling_apology(&self, bot: &Bot, chat_id: i64, what: &str) {
        self.send_text(
            bot,
            chat_id,
            format!(
                "There was an error with the {} you entered. Please check the spelling and try again.",
                what
            ),
        )
        .await;
    }
}

/// HTML caption for a current-conditions reply.
fn caption_for(current: &CurrentWeather, state: Option<&str>) -> String {
    let (main, desc) = current
        .condition()
        .map(|c| (c.main.as_str(), c.description.as_str()))
        .unwrap_or(("", ""));
    let timestamp = format_now(current.timezone).unwrap_or_default();
    let sunrise = format_local(current.sys.sunrise, current.timezone).unwrap_or_default();
    let sunset = format_local(current.sys.sunset, current.timezone).unwrap_or_default();
    format!(
        "The current weather for {place} ({timestamp}) :\
         \n--------------------------------\
         \n{main}/{desc}\
         \n<b>Temperature</b>: {temp} °F\
         \n<i>Feels like</i>: {feel} °F\
         \n<b>Low</b>: {low} °F\
         \n<b>High</b>: {high} °F\
         \n--------------------------------\
         \n<i>Pressure</i>: {pressure} hpa\
         \n<i>Humidity</i>: {humidity}%\
         \n--------------------------------\
         \n<i>Sunrise</i>: {sunrise}\
         \n<i>Sunset</i>: {sunset}",
        place = current.place(state),
        timestamp = timestamp,
        main = main,
        desc = desc,
        temp = current.main.temp,
        feel = current.main.feels_like,
        low = current.main.temp_min,
        high = current.main.temp_max,
        pressure = current.main.pressure,
        humidity = current.main.humidity,
        sunrise = sunrise,
        sunset = sunset,
    )
}

#[async_trait]
impl UpdateHandler for WeatherHandler {
    async fn on_init(&self, bot: &Bot) {
        let table: Vec<BotCommand> = commands::command_table()
            .iter()
            .map(|spec| BotCommand {
                command: spec.command.to_string(),
                description: spec.description.to_string(),
            })
            .collect();
        bot.api()
            .set_my_commands(json!({ "commands": table }))
            .await;
        bot.api().get_my_commands().await;
    }

    async fn handle_update(&self, bot: &Bot, update: Value) -> Result<(), String> {
        // Non-message updates (edits, callback queries, ...) are skipped by
        // policy, not by accident.
        let Some(message) = update.get("message") else {
            log::debug!("skipping non-message update");
            return Ok(());
        };
        let Some(chat_id) = message.pointer("/chat/id").and_then(Value::as_i64) else {
            return Err("message carries no chat id".to_string());
        };
        let first_name = message
            .pointer("/from/first_name")
            .and_then(Value::as_str)
            .unwrap_or("there");
        let Some(text) = message.get("text").and_then(Value::as_str) else {
            log::debug!("skipping message without text");
            return Ok(());
        };
        let Some(parsed) = parse_command(text) else {
            return Ok(());
        };

        if Self::matches(&parsed.keyword, "/start", bot) {
            self.start(bot, chat_id, first_name).await;
        } else if Self::matches(&parsed.keyword, "/help", bot) {
            self.help(bot, chat_id).await;
        } else if Self::matches(&parsed.keyword, "/cityweather", bot) {
            self.city_weather(bot, chat_id, &parsed.args).await;
        } else if Self::matches(&parsed.keyword, "/zipweather", bot) {
            self.zip_weather(bot, chat_id, &parsed.args).await;
        } else if Self::matches(&parsed.keyword, "/dash", bot) {
            self.dash_link(bot, chat_id, &parsed.args).await;
        } else {
            self.send_text(
                bot,
                chat_id,
                format!(
                    "I didn't quite get that, {}. Please try a valid command.",
                    first_name
                ),
            )
            .await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_current() -> CurrentWeather {
        serde_json::from_str(
            r#"{
                "name": "San Diego",
                "timezone": 0,
                "main": {"temp": 71.2, "feels_like": 70.9, "temp_min": 66.0, "temp_max": 75.4, "pressure": 1012.0, "humidity": 58.0},
                "weather": [{"main": "Clear", "description": "clear sky", "icon": "01d"}],
                "sys": {"country": "US", "sunrise": 1717264800, "sunset": 1717315200}
            }"#,
        )
        .expect("decode sample")
    }

    #[test]
    fn caption_carries_place_conditions_and_markup() {
        let caption = caption_for(&sample_current(), Some("ca"));
        assert!(caption.contains("San Diego, CA - US"));
        assert!(caption.contains("Clear/clear sky"));
        assert!(caption.contains("<b>Temperature</b>: 71.2 °F"));
        assert!(caption.contains("<i>Humidity</i>: 58%"));
    }

    #[test]
    fn dash_url_carries_query_parameters() {
        let handler = WeatherHandler::new(
            OpenWeatherClient::new("k", None),
            Some("https://bot.example.com".to_string()),
        );
        let url = handler
            .dash_url(&CityQuery {
                city: "San Luis Obispo".to_string(),
                state: Some("CA".to_string()),
                country_code: Some("US".to_string()),
            })
            .expect("dash url");
        assert!(url.starts_with("https://bot.example.com/dash?"));
        assert!(url.contains("city=San+Luis+Obispo"));
        assert!(url.contains("state=CA"));
        assert!(url.contains("country_code=US"));
    }

    #[test]
    fn dash_url_requires_a_public_url() {
        let handler = WeatherHandler::new(OpenWeatherClient::new("k", None), None);
        assert!(handler
            .dash_url(&CityQuery {
                city: "Paris".to_string(),
                state: None,
                country_code: None,
            })
            .is_none());
    }
}
