use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};
use crate::types::{ItemId, ItemUri};

/// An active experiment instance as listed by the test store.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestRecord {
    pub id: ItemId,
    /// Reference to the test definition item.
    pub uri: ItemUri,
    #[serde(default)]
    pub host_item_uri: Option<ItemUri>,
    #[serde(default)]
    pub device_id: Option<ItemId>,
    pub language: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRef {
    pub id: ItemId,
    pub name: String,
}

/// Configuration of a test as authored on its definition item.
///
/// Durations are kept as the stored text and parsed on use, so a malformed
/// value fails only the record that carries it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestDefinition {
    pub id: ItemId,
    pub start_date: DateTime<Utc>,
    pub min_duration: String,
    pub max_duration: String,
    pub traffic_allocation_percentage: f64,
    pub confidence_level_percentage: f64,
    #[serde(default)]
    pub device: Option<DeviceRef>,
    pub language: String,
    #[serde(default)]
    pub page_level_test_variables: Vec<ItemId>,
}

fn parse_days(field: &str, raw: &str, definition: &ItemId) -> Result<i64> {
    let days = raw.trim().parse::<i64>().map_err(|_| {
        ReportError::Configuration(format!(
            "{} '{}' on test definition {} is not an integer",
            field, raw, definition
        ))
    })?;
    if days < 1 {
        return Err(ReportError::Configuration(format!(
            "{} on test definition {} must be positive, got {}",
            field, definition, days
        )));
    }
    Ok(days)
}

fn check_percentage(field: &str, value: f64, definition: &ItemId) -> Result<()> {
    if !(value > 0.0 && value <= 100.0) {
        return Err(ReportError::Configuration(format!(
            "{} on test definition {} must be in (0, 100], got {}",
            field, definition, value
        )));
    }
    Ok(())
}

impl TestDefinition {
    pub fn min_duration_days(&self) -> Result<i64> {
        parse_days("minDuration", &self.min_duration, &self.id)
    }

    pub fn max_duration_days(&self) -> Result<i64> {
        parse_days("maxDuration", &self.max_duration, &self.id)
    }

    /// Parsed `(min, max)` run window in days. Enforces `min <= max`.
    pub fn duration_bounds(&self) -> Result<(i64, i64)> {
        let min = self.min_duration_days()?;
        let max = self.max_duration_days()?;
        if min > max {
            return Err(ReportError::Configuration(format!(
                "minDuration {} exceeds maxDuration {} on test definition {}",
                min, max, self.id
            )));
        }
        Ok((min, max))
    }

    pub fn validate_percentages(&self) -> Result<()> {
        check_percentage(
            "trafficAllocationPercentage",
            self.traffic_allocation_percentage,
            &self.id,
        )?;
        check_percentage(
            "confidenceLevelPercentage",
            self.confidence_level_percentage,
            &self.id,
        )
    }

    /// Device name used to pick an estimator; empty when the test targets no device.
    pub fn device_name(&self) -> &str {
        self.device.as_ref().map_or("", |d| d.name.as_str())
    }
}

/// A content item as returned by the content resolver.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub uri: ItemUri,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub owner: String,
    /// Present when the item is a test definition.
    #[serde(default)]
    pub test_definition: Option<TestDefinition>,
    /// Average eligible visits per day, when traffic data exists for the item.
    #[serde(default)]
    pub daily_visits: Option<f64>,
}

impl Item {
    pub fn id(&self) -> ItemId {
        self.uri.id
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestVariable {
    pub id: ItemId,
    #[serde(default)]
    pub name: String,
    /// Number of values under test for this variable, baseline included.
    pub value_count: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceSet {
    #[serde(default)]
    pub variables: Vec<TestVariable>,
}

impl ExperienceSet {
    /// Number of combinations under test, baseline included. Zero when the set is empty.
    pub fn experience_count(&self) -> u32 {
        if self.variables.is_empty() {
            return 0;
        }
        self.variables
            .iter()
            .fold(1u32, |acc, v| acc.saturating_mul(v.value_count))
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TestType {
    Page,
    Component,
    Personalization,
}

/// Fully loaded test: definition plus the experience set bound to its host.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestConfiguration {
    pub definition_id: ItemId,
    pub host_item_id: ItemId,
    #[serde(default)]
    pub device_id: ItemId,
    #[serde(default)]
    pub device_name: String,
    pub language_name: String,
    pub test_type: TestType,
    #[serde(default)]
    pub test_set: ExperienceSet,
}
