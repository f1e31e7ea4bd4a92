//! Free-text command parsing.
//!
//! A command message is the first whitespace token (e.g. `/cityweather`)
//! followed by parameters. Parameters split on commas when any are present —
//! "San Luis Obispo, CA, US" stays one city plus state and country — and are
//! otherwise one multi-word value.

/// One entry of the bot's command table; `example` feeds the /help text.
pub struct CommandSpec {
    pub command: &'static str,
    pub description: &'static str,
    pub example: &'static str,
}

pub fn command_table() -> &'static [CommandSpec] {
    &[
        CommandSpec {
            command: "start",
            description: "starts the bot.",
            example: "Just issue /start in the Telegram message box.",
        },
        CommandSpec {
            command: "cityweather",
            description: "Get the current weather for any city available through OpenWeatherMap.org.",
            example: "/cityweather San Diego, Ca, US — the state and country are optional: /cityweather Paris, Fr works too.",
        },
        CommandSpec {
            command: "zipweather",
            description: "Get the current weather by postal code.",
            example: "/zipweather 92101 or /zipweather 92101, us",
        },
        CommandSpec {
            command: "dash",
            description: "Get a link to a forecast dashboard for a city.",
            example: "/dash San Diego, Ca, US",
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub keyword: String,
    pub args: Vec<String>,
}

/// Split a message into keyword + parameters. `None` for empty messages.
pub fn parse_command(text: &str) -> Option<ParsedCommand> {
    let trimmed = text.trim();
    let keyword = trimmed.split_whitespace().next()?.to_string();
    let rest = trimmed[keyword.len()..].trim();
    let args = if rest.is_empty() {
        Vec::new()
    } else if rest.contains(',') {
        rest.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    } else {
        vec![rest.to_string()]
    };
    Some(ParsedCommand { keyword, args })
}

/// A city lookup, optionally narrowed by state and country.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityQuery {
    pub city: String,
    pub state: Option<String>,
    pub country_code: Option<String>,
}

/// A postal-code lookup, optionally narrowed by country.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipQuery {
    pub postal_code: String,
    pub country_code: Option<String>,
}

fn strip_punctuation(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_ascii_punctuation() && *c != '’')
        .collect()
}

/// Interpret comma-split parameters as city[, state[, country]]. With three
/// or more segments the last two are state and country and everything before
/// them is the (possibly multi-word) city.
pub fn parse_city(args: &[String]) -> CityQuery {
    match args.len() {
        0 => CityQuery {
            city: String::new(),
            state: None,
            country_code: None,
        },
        1 => CityQuery {
            city: strip_punctuation(&args[0]),
            state: None,
            country_code: None,
        },
        2 => CityQuery {
            city: strip_punctuation(&args[0]),
            state: Some(args[1].clone()),
            country_code: None,
        },
        n => CityQuery {
            city: strip_punctuation(&args[..n - 2].join(" ")),
            state: Some(args[n - 2].clone()),
            country_code: Some(args[n - 1].clone()),
        },
    }
}

/// Interpret comma-split parameters as postal_code[, country].
pub fn parse_postal_code(args: &[String]) -> ZipQuery {
    match args.len() {
        0 => ZipQuery {
            postal_code: String::new(),
            country_code: None,
        },
        1 => ZipQuery {
            postal_code: args[0].clone(),
            country_code: None,
        },
        n => ZipQuery {
            postal_code: args[..n - 1].join(" "),
            country_code: Some(args[n - 1].clone()),
        },
    }
}
