//! Text rendering. Everything here is a pure function of its inputs.

use skycast_core::{
    CityCandidate, Explanation, FeatureRecord, NoticeLevel, PredictionResult, Session, WeatherLabel,
};

pub const DISCLAIMER: &str = "Note: this is an academic demo. The model was trained on synthetic data; \
its predictions are illustrative and do not replace an official weather forecast.";

/// Rows shown in the waterfall before the rest are folded into one.
pub const WATERFALL_ROWS: usize = 10;
const BAR_WIDTH: usize = 30;

pub fn status_line(session: &Session) -> String {
    match &session.location {
        Some(loc) => format!(
            "Selected: {} ({:.4}, {:.4}) - data for {}",
            loc.label,
            loc.latitude,
            loc.longitude,
            session.target_date.format("%d/%m/%Y")
        ),
        None => "Please choose a location (map coordinates or city search).".to_string(),
    }
}

pub fn notice(session: &Session) -> Option<String> {
    session.notice.as_ref().map(|n| {
        let tag = match n.level {
            NoticeLevel::Success => "ok",
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        format!("[{tag}] {}", n.message)
    })
}

pub fn form(record: &FeatureRecord) -> String {
    let rows: [(&str, String); 10] = [
        ("Season", record.season.to_string()),
        ("Location", record.location.to_string()),
        ("Temperature (°C)", format!("{:.1}", record.temperature)),
        ("Humidity (%)", record.humidity.to_string()),
        ("Atmospheric Pressure (hPa)", format!("{:.1}", record.pressure)),
        ("Wind Speed (km/h)", format!("{:.1}", record.wind_speed)),
        ("Precipitation (%)", format!("{:.1}", record.precipitation)),
        ("Cloud Cover", record.cloud_cover.to_string()),
        ("UV Index", record.uv_index.to_string()),
        ("Visibility (km)", format!("{:.1}", record.visibility_km)),
    ];

    let mut out = String::from("Environmental parameters\n");
    for (name, value) in rows {
        out.push_str(&format!("  {name:<28}{value}\n"));
    }
    out
}

/// Which query the kept city results belong to, if any.
pub fn last_search(session: &Session) -> Option<String> {
    let query = session.search_query.as_deref()?;
    match session.search_results.len() {
        0 => None,
        1 => Some(format!("Last search '{query}': 1 result")),
        n => Some(format!("Last search '{query}': {n} results")),
    }
}

/// Everything above the menu: status, last notice, last search, current form.
pub fn session(session: &Session) -> String {
    let mut out = status_line(session);
    out.push('\n');
    if let Some(n) = notice(session) {
        out.push_str(&n);
        out.push('\n');
    }
    if let Some(s) = last_search(session) {
        out.push_str(&s);
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&form(&session.form));
    out
}

pub fn search_results(results: &[CityCandidate]) -> String {
    if results.is_empty() {
        return "No matching results.".to_string();
    }
    results
        .iter()
        .enumerate()
        .map(|(i, c)| {
            format!(
                "{:>2}. {}  [{:.4}, {:.4}]",
                i + 1,
                c.display_name(),
                c.latitude,
                c.longitude
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn banner(label: WeatherLabel) -> String {
    let (icon, text) = match label {
        WeatherLabel::Sunny => ("☀", "SUNNY"),
        WeatherLabel::Rainy => ("☂", "RAINY"),
        WeatherLabel::Cloudy => ("☁", "CLOUDY"),
        WeatherLabel::Snowy => ("❄", "SNOWY"),
    };
    let inner = format!("  {icon}  {text}  ");
    let width = inner.chars().count();
    format!("+{0}+\n|{inner}|\n+{0}+", "-".repeat(width))
}

pub fn prediction(result: &PredictionResult) -> String {
    let mut out = banner(result.label);
    out.push_str(&format!("\nConfidence: {:.1}%\n", result.confidence() * 100.0));
    for (label, p) in WeatherLabel::all().iter().zip(&result.probabilities) {
        out.push_str(&format!("  {:<8}{:>6.1}%\n", label.as_str(), p * 100.0));
    }
    out.push('\n');
    out.push_str(&waterfall(&result.explanation, WATERFALL_ROWS));
    out.push('\n');
    out.push_str(DISCLAIMER);
    out
}

struct Row {
    name: String,
    value: f64,
    data: Option<f64>,
}

/// Attribution chart: largest contributions first, the tail folded into a
/// single "other features" row, bracketed by the model output and baseline.
pub fn waterfall(explanation: &Explanation, max_rows: usize) -> String {
    let mut order: Vec<usize> = (0..explanation.values.len()).collect();
    order.sort_by(|&a, &b| {
        explanation.values[b].abs().total_cmp(&explanation.values[a].abs())
    });

    let shown = if order.len() > max_rows { max_rows.saturating_sub(1) } else { order.len() };

    let mut rows: Vec<Row> = order[..shown]
        .iter()
        .map(|&i| Row {
            name: display_feature(&explanation.feature_names[i]).to_string(),
            value: explanation.values[i],
            data: explanation.data.get(i).copied(),
        })
        .collect();

    let rest = &order[shown..];
    if !rest.is_empty() {
        rows.push(Row {
            name: format!("{} other features", rest.len()),
            value: rest.iter().map(|&i| explanation.values[i]).sum(),
            data: None,
        });
    }

    let max_abs = rows.iter().map(|r| r.value.abs()).fold(0.0_f64, f64::max);

    let mut out = format!("f(x) = {:.3}\n", explanation.output());
    for row in &rows {
        let len = if max_abs > 0.0 {
            ((row.value.abs() / max_abs) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        let bar = if row.value >= 0.0 { "+".repeat(len) } else { "-".repeat(len) };
        let name = match row.data {
            Some(d) => format!("{:.3} = {}", d, row.name),
            None => row.name.clone(),
        };
        out.push_str(&format!(
            "  {:>+8.3}  {:<width$}  {}\n",
            row.value,
            bar,
            name,
            width = BAR_WIDTH
        ));
    }
    out.push_str(&format!("E[f(x)] = {:.3}\n", explanation.baseline));
    out
}

/// Strip the transformer prefix from a preprocessed feature name.
fn display_feature(name: &str) -> &str {
    name.split_once("__").map_or(name, |(_, rest)| rest)
}
