//! Terminal renderer: a pure function of the controller's view state.
//!
//! Three mutually exclusive views, picked in priority order: the loading
//! skeleton, the populated weather card (live or demo data), and the
//! unavailable notice. Whenever a terminal error stands, the setup
//! instructions panel is appended below the main content.

use chrono::NaiveDateTime;
use compass_core::{LOCALTIME_FORMAT, Notice, ViewState, WeatherSnapshot};

const INNER_WIDTH: usize = 42;
const DISPLAY_TIME_FORMAT: &str = "%d %b %Y, %H:%M";

/// Icon picked from the condition text by case-insensitive keyword match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherGlyph {
    Sun,
    Rain,
    Cloud,
}

impl WeatherGlyph {
    /// First keyword group that matches wins; sun is the default.
    pub fn for_condition(text: &str) -> Self {
        let lower = text.to_lowercase();

        if lower.contains("sunny") || lower.contains("clear") {
            Self::Sun
        } else if lower.contains("rain") || lower.contains("shower") {
            Self::Rain
        } else if lower.contains("cloud") || lower.contains("overcast") {
            Self::Cloud
        } else {
            Self::Sun
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Self::Sun => "\u{2600}",   // ☀
            Self::Rain => "\u{2602}",  // ☂
            Self::Cloud => "\u{2601}", // ☁
        }
    }
}

/// Temperature with a degree mark, rounded half-away-from-zero
/// (29.4 → "29°", 29.5 → "30°").
pub fn rounded_temp(temp_c: f64) -> String {
    format!("{}\u{b0}", temp_c.round() as i64)
}

/// Re-render the provider localtime in the pinned display format; an
/// unparseable string is shown verbatim rather than erroring.
pub fn format_localtime(raw: &str) -> String {
    match NaiveDateTime::parse_from_str(raw, LOCALTIME_FORMAT) {
        Ok(dt) => dt.format(DISPLAY_TIME_FORMAT).to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Application banner, printed above the rendered view.
pub fn header() -> String {
    let mut out = String::new();
    out.push_str(&center("Colombo Weather Compass"));
    out.push('\n');
    out.push_str(&center("Real-time weather updates for Colombo, Sri Lanka"));
    out.push('\n');
    out
}

/// Select and render the current view.
pub fn render(view: &ViewState<'_>) -> String {
    let mut out = if view.is_loading {
        loading_skeleton()
    } else if let Some(snapshot) = view.display_snapshot() {
        populated(snapshot)
    } else {
        unavailable()
    };

    if view.error.is_some() {
        out.push('\n');
        out.push_str(&setup_instructions());
    }

    out
}

/// One-time toast line for a controller notice.
pub fn render_notice(notice: &Notice) -> String {
    format!("! {}: {}", notice.title, notice.detail)
}

fn populated(snapshot: &WeatherSnapshot) -> String {
    let glyph = WeatherGlyph::for_condition(&snapshot.condition);

    let hero = card(&[
        center(glyph.symbol()),
        center(&snapshot.location),
        center(&snapshot.country),
        String::new(),
        center(&rounded_temp(snapshot.temp_c)),
        center(&snapshot.condition),
        String::new(),
        center(&format!("Last updated: {}", format_localtime(&snapshot.localtime))),
    ]);

    let tiles = metric_tiles(&[
        ("Humidity", format!("{}%", snapshot.humidity)),
        ("Wind Speed", format!("{} km/h", snapshot.wind_kph)),
        ("UV Index", snapshot.uv.to_string()),
        ("Visibility", format!("{} km", snapshot.vis_km)),
    ]);

    format!("{hero}\n{tiles}")
}

fn loading_skeleton() -> String {
    let block = "\u{2591}".repeat(14);

    let hero = card(&[
        center("\u{2591}\u{2591}"),
        center(&block),
        center(&block),
        String::new(),
        center(&"\u{2591}".repeat(4)),
        center(&block),
        String::new(),
        center(&block),
    ]);

    let tiles = metric_tiles(&[
        ("Humidity", "\u{2591}".repeat(5)),
        ("Wind Speed", "\u{2591}".repeat(5)),
        ("UV Index", "\u{2591}".repeat(5)),
        ("Visibility", "\u{2591}".repeat(5)),
    ]);

    format!("{hero}\n{tiles}")
}

fn unavailable() -> String {
    card(&[
        center("Weather data unavailable"),
        String::new(),
        center("Unable to fetch weather information"),
        center("at this time."),
        String::new(),
        center("Press 'r' to try again."),
    ])
}

fn setup_instructions() -> String {
    card(&[
        center("Setup Instructions"),
        String::new(),
        pad("To get live weather data, sign up for a"),
        pad("free API key at https://www.weatherapi.com"),
        pad("and store it with `compass configure`."),
    ])
}

fn metric_tiles(metrics: &[(&str, String)]) -> String {
    let mut out = String::new();
    for (label, value) in metrics {
        out.push_str(&card(&[pad(label), pad(value)]));
    }
    out
}

fn card(lines: &[String]) -> String {
    let mut out = String::new();
    out.push('\u{250c}');
    out.push_str(&"\u{2500}".repeat(INNER_WIDTH));
    out.push_str("\u{2510}\n");
    for line in lines {
        let len = line.chars().count();
        out.push('\u{2502}');
        out.push_str(line);
        if len < INNER_WIDTH {
            out.push_str(&" ".repeat(INNER_WIDTH - len));
        }
        out.push_str("\u{2502}\n");
    }
    out.push('\u{2514}');
    out.push_str(&"\u{2500}".repeat(INNER_WIDTH));
    out.push_str("\u{2518}\n");
    out
}

// Overlong text is cut to the inner width so the right border stays aligned.
fn center(text: &str) -> String {
    let text: String = text.chars().take(INNER_WIDTH).collect();
    let len = text.chars().count();
    let left = (INNER_WIDTH - len) / 2;
    let right = INNER_WIDTH - len - left;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(right))
}

fn pad(text: impl AsRef<str>) -> String {
    let text: String = text.as_ref().chars().take(INNER_WIDTH - 1).collect();
    let len = text.chars().count();
    format!(" {}{}", text, " ".repeat(INNER_WIDTH - 1 - len))
}
