//! Tools offered to the demo assistant.

use conflux_tools::{FunctionTool, ToolError, ToolSet};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `forecast` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ForecastParams {
    /// City name.
    pub city: String,
}

/// Output of the `forecast` tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    /// City the forecast is for.
    pub city: String,
    /// Temperature in degrees Celsius.
    pub celsius: i32,
    /// Sky conditions.
    pub conditions: String,
}

/// Parameters for the `to_fahrenheit` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ConvertParams {
    /// Temperature in degrees Celsius.
    pub celsius: f64,
}

const STATIONS: &[(&str, i32, &str)] = &[
    ("Oslo", 4, "light rain"),
    ("Lisbon", 19, "sunny"),
    ("Nairobi", 23, "scattered clouds"),
    ("Montreal", -6, "snow"),
];

/// Cities with a weather station.
#[must_use]
pub fn known_cities() -> impl Iterator<Item = &'static str> {
    STATIONS.iter().map(|(city, ..)| *city)
}

/// Looks up the current forecast for `city`, ignoring case.
///
/// # Errors
///
/// Returns [`ToolError::Execution`] when the city has no station.
pub fn forecast(city: &str) -> Result<Forecast, ToolError> {
    STATIONS
        .iter()
        .find(|(name, ..)| name.eq_ignore_ascii_case(city.trim()))
        .map(|(name, celsius, conditions)| Forecast {
            city: (*name).to_string(),
            celsius: *celsius,
            conditions: (*conditions).to_string(),
        })
        .ok_or_else(|| ToolError::execution(format!("no weather station in '{city}'")))
}

/// Returns the demo tool set.
#[must_use]
pub fn demo_tools() -> ToolSet {
    ToolSet::new()
        .with(FunctionTool::typed(
            "forecast",
            "Current weather for a city.",
            |params: ForecastParams| async move { forecast(&params.city) },
        ))
        .with(FunctionTool::typed(
            "to_fahrenheit",
            "Convert a Celsius temperature to Fahrenheit.",
            |params: ConvertParams| async move { Ok::<_, ToolError>(params.celsius * 9.0 / 5.0 + 32.0) },
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use conflux_models::llm::ToolCall;
    use serde_json::json;

    #[test]
    fn lookup_ignores_case() {
        assert_eq!(forecast(" lisbon ").unwrap().celsius, 19);
        assert!(forecast("Atlantis").is_err());
    }

    #[tokio::test]
    async fn tools_dispatch_through_the_set() {
        let tools = demo_tools();
        assert_eq!(tools.names(), vec!["forecast", "to_fahrenheit"]);

        let output = tools
            .execute(&ToolCall::new("c1", "to_fahrenheit", json!({ "celsius": 100.0 })))
            .await
            .unwrap();
        assert_eq!(output, json!(212.0));

        let output = tools
            .execute(&ToolCall::new("c2", "forecast", json!({ "city": "Oslo" })))
            .await
            .unwrap();
        assert_eq!(output["conditions"], "light rain");
    }
}
