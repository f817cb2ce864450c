use serde::Serialize;

use super::config::TestType;
use super::effect::EffectTrend;
use crate::types::{ItemId, ItemUri};

/// `dd-MMM-yyyy`, e.g. `05-Oct-2026`.
pub const DATE_FORMAT: &str = "%d-%b-%Y";

/// One row of the active-tests report. Field names follow the reporting UI's view model.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ReportRow {
    pub host_page_id: String,
    pub host_page_uri: ItemUri,
    pub host_page_name: String,
    pub device_id: String,
    pub device_name: String,
    pub language: String,
    pub created_by: String,
    pub date: String,
    pub experience_count: u32,
    /// Estimated days remaining; negative for overdue tests.
    pub days: i64,
    pub item_id: String,
    pub content_only: bool,
    pub test_type: TestType,
    pub test_id: ItemId,
    pub site_name: String,
    pub effect: f64,
    pub effect_trend: EffectTrend,
    pub effect_css: &'static str,
}

impl ReportRow {
    pub fn apply_effect(&mut self, effect: f64) {
        let trend = EffectTrend::classify(effect);
        self.effect = effect;
        self.effect_trend = trend;
        self.effect_css = trend.css_class();
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Report {
    pub items: Vec<ReportRow>,
    pub total_results: usize,
}
