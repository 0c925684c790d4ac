use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::{build_http_client, required_str, CapabilityError, DataCapability, WEATHER_QUERY};
use crate::core::config::WeatherSettings;

/// Current conditions from OpenWeatherMap (`/data/2.5/weather`).
///
/// Parameters: `city` (required) and `country_code` (optional ISO code).
pub struct OpenWeatherClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    units: String,
}

#[derive(Debug, Deserialize)]
struct WeatherPayload {
    name: String,
    #[serde(default)]
    weather: Vec<Condition>,
    main: Readings,
    #[serde(default)]
    wind: Option<Wind>,
    #[serde(default)]
    coord: Option<Coord>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct Readings {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    humidity: f64,
    pressure: f64,
}

#[derive(Debug, Deserialize)]
struct Wind {
    #[serde(default)]
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct Coord {
    lat: f64,
    lon: f64,
}

impl OpenWeatherClient {
    pub fn new(settings: &WeatherSettings) -> Result<Self, CapabilityError> {
        Ok(Self {
            client: build_http_client(WEATHER_QUERY, settings.timeout_secs)?,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone().filter(|k| !k.trim().is_empty()),
            units: settings.units.clone(),
        })
    }

    fn temperature_unit(&self) -> &'static str {
        match self.units.as_str() {
            "imperial" => "°F",
            "standard" => "K",
            _ => "°C",
        }
    }

    fn speed_unit(&self) -> &'static str {
        if self.units == "imperial" {
            "mph"
        } else {
            "m/s"
        }
    }

    fn render(&self, data: &WeatherPayload) -> String {
        let unit = self.temperature_unit();
        let description = data
            .weather
            .first()
            .map(|c| capitalize(&c.description))
            .unwrap_or_else(|| "Unknown".to_string());
        let wind = data.wind.as_ref().map(|w| w.speed).unwrap_or(0.0);

        let mut report = format!(
            "**Weather in {}**\n\n\
             - Conditions: {}\n\
             - Temperature: {:.1}{}\n\
             - Feels like: {:.1}{}\n\
             - Min / max: {:.1}{} / {:.1}{}\n\
             - Humidity: {}%\n\
             - Pressure: {} hPa\n\
             - Wind: {:.1} {}",
            data.name,
            description,
            data.main.temp,
            unit,
            data.main.feels_like,
            unit,
            data.main.temp_min,
            unit,
            data.main.temp_max,
            unit,
            data.main.humidity,
            data.main.pressure,
            wind,
            self.speed_unit(),
        );
        if let Some(coord) = &data.coord {
            report.push_str(&format!("\n\nCoordinates: {}, {}", coord.lat, coord.lon));
        }
        report
    }
}

#[async_trait]
impl DataCapability for OpenWeatherClient {
    fn name(&self) -> &'static str {
        WEATHER_QUERY
    }

    async fn invoke(&self, parameters: &Value) -> Result<String, CapabilityError> {
        let city = required_str(WEATHER_QUERY, parameters, "city")?;
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            CapabilityError::not_configured(WEATHER_QUERY, "OPENWEATHER_API_KEY is not set")
        })?;

        let location = match parameters.get("country_code").and_then(|v| v.as_str()) {
            Some(code) if !code.trim().is_empty() => format!("{},{}", city, code.trim()),
            _ => city.to_string(),
        };

        let url = format!("{}/data/2.5/weather", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", location.as_str()),
                ("appid", api_key),
                ("units", self.units.as_str()),
            ])
            .send()
            .await
            .map_err(|err| CapabilityError::from_reqwest(WEATHER_QUERY, err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = provider_message(&body).unwrap_or(body);
            return Err(CapabilityError::from_status(WEATHER_QUERY, status, &message));
        }

        let data: WeatherPayload = response
            .json()
            .await
            .map_err(|err| CapabilityError::from_reqwest(WEATHER_QUERY, err))?;

        tracing::debug!("Weather lookup for '{}' resolved to {}", location, data.name);
        Ok(self.render(&data))
    }
}

/// OpenWeatherMap error bodies look like `{"cod":"404","message":"city not found"}`.
fn provider_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityErrorKind;
    use serde_json::json;

    fn sample() -> WeatherPayload {
        serde_json::from_value(json!({
            "name": "São Paulo",
            "weather": [{ "description": "scattered clouds" }],
            "main": {
                "temp": 23.46, "feels_like": 23.9, "temp_min": 21.0,
                "temp_max": 25.2, "humidity": 78, "pressure": 1015
            },
            "wind": { "speed": 3.6 },
            "coord": { "lat": -23.55, "lon": -46.64 }
        }))
        .expect("payload")
    }

    #[test]
    fn report_includes_conditions_and_units() {
        let client = OpenWeatherClient::new(&WeatherSettings::default()).expect("client");
        let report = client.render(&sample());

        assert!(report.starts_with("**Weather in São Paulo**"));
        assert!(report.contains("Conditions: Scattered clouds"));
        assert!(report.contains("Temperature: 23.5°C"));
        assert!(report.contains("Wind: 3.6 m/s"));
        assert!(report.contains("Coordinates: -23.55, -46.64"));
    }

    #[test]
    fn provider_message_is_extracted() {
        assert_eq!(
            provider_message(r#"{"cod":"404","message":"city not found"}"#).as_deref(),
            Some("city not found")
        );
        assert_eq!(provider_message("<html>"), None);
    }

    #[tokio::test]
    async fn missing_api_key_is_not_configured() {
        let client = OpenWeatherClient::new(&WeatherSettings::default()).expect("client");
        let err = client.invoke(&json!({ "city": "Lisboa" })).await.unwrap_err();
        assert_eq!(err.kind, CapabilityErrorKind::NotConfigured);
        assert_eq!(err.capability, WEATHER_QUERY);
    }

    #[tokio::test]
    async fn missing_city_is_rejected() {
        let client = OpenWeatherClient::new(&WeatherSettings {
            api_key: Some("key".to_string()),
            ..WeatherSettings::default()
        })
        .expect("client");
        let err = client.invoke(&json!({ "city": "  " })).await.unwrap_err();
        assert_eq!(err.kind, CapabilityErrorKind::Rejected);
    }
}
