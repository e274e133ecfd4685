//! Plain-text rendering of fetch results.

use chrono::Local;
use weatherinfo_core::{
    CachedWeatherRecord, FailureNotice, FetchResult, WeatherReading, WeatherView,
};

pub fn render_result(result: &FetchResult) -> String {
    let mut lines = Vec::new();

    if let Some(notice) = result.notice() {
        lines.extend(notice_lines(notice));
    }

    match result {
        FetchResult::Fresh { reading, icon } => {
            lines.extend(reading_lines(reading, icon.as_deref()));
        }
        FetchResult::Cached { record, .. } => {
            lines.push("Showing the last stored reading.".to_string());
            lines.push(String::new());
            lines.extend(reading_lines(&record.reading, Some(&record.icon)));
        }
        FetchResult::Empty { .. } => {
            lines.push("No weather data available yet.".to_string());
        }
        FetchResult::Failed(_) => {}
    }

    finish(lines)
}

pub fn render_record(record: &CachedWeatherRecord) -> String {
    finish(reading_lines(&record.reading, Some(&record.icon)))
}

fn notice_lines(notice: &FailureNotice) -> Vec<String> {
    vec![
        format!("! {}", notice.headline()),
        format!("  {}", notice.message),
        String::new(),
    ]
}

fn reading_lines(reading: &WeatherReading, icon: Option<&[u8]>) -> Vec<String> {
    let view = WeatherView::new(reading);
    let mut lines = vec![view.title.clone()];

    if view.description.is_empty() {
        lines.push(view.temperature.clone());
    } else {
        lines.push(format!("{}  {}", view.temperature, view.description));
    }
    lines.push(view.feels_like.clone());
    lines.push(view.min_temperature.clone());
    lines.push(view.max_temperature.clone());
    lines.push(String::new());

    let width = view.details.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    for (label, value) in &view.details {
        lines.push(format!("{label:<width$}  {value}"));
    }

    if let Some(icon) = icon {
        lines.push(format!("Icon {} ({} bytes)", reading.icon_id, icon.len()));
    }
    if let Some(observed) = reading.observed_at {
        lines.push(format!(
            "Observed {}",
            observed.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        ));
    }

    lines
}

fn finish(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}
