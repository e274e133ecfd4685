//! Display model shared by fresh and cached results.
//!
//! This is the only place where temperatures are cut to whole degrees.

use crate::model::{CachedWeatherRecord, WeatherReading};

/// Detail table rows, in display order.
pub const DETAIL_ROWS: [DetailRow; 4] = [
    DetailRow::Pressure,
    DetailRow::Humidity,
    DetailRow::Visibility,
    DetailRow::WindSpeed,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailRow {
    Pressure,
    Humidity,
    Visibility,
    WindSpeed,
}

impl DetailRow {
    pub fn label(self) -> &'static str {
        match self {
            Self::Pressure => "Pressure",
            Self::Humidity => "Humidity",
            Self::Visibility => "Visibility",
            Self::WindSpeed => "Wind Speed",
        }
    }

    pub fn value(self, reading: &WeatherReading) -> String {
        match self {
            Self::Pressure => format!("{} Pa", reading.pressure),
            Self::Humidity => format!("{} %", reading.humidity),
            Self::Visibility => format!("{} km", reading.visibility),
            Self::WindSpeed => format!("{} km/h", reading.wind_speed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherView {
    pub title: String,
    pub temperature: String,
    pub feels_like: String,
    pub min_temperature: String,
    pub max_temperature: String,
    /// Empty in minimal info mode.
    pub description: String,
    pub details: Vec<(&'static str, String)>,
}

impl WeatherView {
    pub fn new(reading: &WeatherReading) -> Self {
        Self {
            title: reading.location_name.clone(),
            temperature: degrees(reading.temperature),
            feels_like: format!("Feels like {}", degrees(reading.feels_like)),
            min_temperature: format!("Minimum temperature {}", degrees(reading.min_temperature)),
            max_temperature: format!("Maximum temperature {}", degrees(reading.max_temperature)),
            description: reading.description.clone(),
            details: DETAIL_ROWS
                .iter()
                .map(|row| (row.label(), row.value(reading)))
                .collect(),
        }
    }
}

impl From<&WeatherReading> for WeatherView {
    fn from(reading: &WeatherReading) -> Self {
        Self::new(reading)
    }
}

impl From<&CachedWeatherRecord> for WeatherView {
    fn from(record: &CachedWeatherRecord) -> Self {
        Self::new(&record.reading)
    }
}

/// Whole degrees, truncated toward zero.
pub fn whole_degrees(celsius: f64) -> i64 {
    // `as` saturates and maps NaN to 0.
    celsius.trunc() as i64
}

fn degrees(celsius: f64) -> String {
    format!("{}ºC", whole_degrees(celsius))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dhaka() -> WeatherReading {
        WeatherReading {
            location_name: "Dhaka".into(),
            temperature: 30.2,
            feels_like: 34.1,
            min_temperature: 29.0,
            max_temperature: 31.0,
            description: "haze".into(),
            icon_id: "50d".into(),
            pressure: 1008,
            humidity: 70,
            visibility: 5,
            wind_speed: 8.0,
            observed_at: None,
        }
    }

    #[test]
    fn dhaka_view() {
        let view = WeatherView::new(&dhaka());

        assert_eq!(view.title, "Dhaka");
        assert_eq!(view.temperature, "30ºC");
        assert_eq!(view.feels_like, "Feels like 34ºC");
        assert_eq!(view.min_temperature, "Minimum temperature 29ºC");
        assert_eq!(view.max_temperature, "Maximum temperature 31ºC");
        assert_eq!(view.description, "haze");
    }

    #[test]
    fn detail_rows_keep_fixed_order() {
        let view = WeatherView::new(&dhaka());
        assert_eq!(
            view.details,
            vec![
                ("Pressure", "1008 Pa".to_string()),
                ("Humidity", "70 %".to_string()),
                ("Visibility", "5 km".to_string()),
                ("Wind Speed", "8 km/h".to_string()),
            ]
        );
    }

    #[test]
    fn fractional_wind_speed_is_kept() {
        let mut r = dhaka();
        r.wind_speed = 3.6;
        assert_eq!(DetailRow::WindSpeed.value(&r), "3.6 km/h");
    }

    #[test]
    fn truncation_goes_toward_zero() {
        assert_eq!(whole_degrees(30.9), 30);
        assert_eq!(whole_degrees(-0.5), 0);
        assert_eq!(whole_degrees(-7.9), -7);
        assert_eq!(whole_degrees(f64::NAN), 0);
    }

    #[test]
    fn minimal_reading_has_blank_description() {
        let mut r = dhaka();
        r.description.clear();
        r.icon_id.clear();
        let view = WeatherView::from(&r);
        assert_eq!(view.description, "");
        assert_eq!(view.details.len(), 4);
    }

    #[test]
    fn cached_record_renders_like_reading() {
        let record = CachedWeatherRecord {
            reading: dhaka(),
            icon: vec![1],
        };
        assert_eq!(WeatherView::from(&record), WeatherView::new(&dhaka()));
    }
}
