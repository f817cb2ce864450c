//! Joins raw active-test records with their host item, definition and
//! configuration into report rows.
//!
//! Records whose test item, definition, host item or configuration cannot be
//! resolved are skipped; they never fail the report. Remaining days are
//! computed here for every surviving row because ranking needs them. The
//! winning effect is left for the page that survives pagination.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::collaborators::Collaborators;
use super::config::{TestConfiguration, TestRecord};
use super::duration::estimate_remaining_days;
use super::effect::EffectTrend;
use super::model::{ReportRow, DATE_FORMAT};
use crate::error::{ReportError, Result};
use crate::settings::ReportSettings;
use crate::types::ItemId;

/// Rows that survived resolution, plus the configuration of each, keyed by
/// test-definition id, for the effect pass. Request scoped.
#[derive(Debug, Default)]
pub struct Assembly {
    pub rows: Vec<ReportRow>,
    pub configurations: HashMap<ItemId, TestConfiguration>,
}

pub fn assemble(
    records: &[TestRecord],
    collaborators: &Collaborators,
    settings: &ReportSettings,
) -> Result<Assembly> {
    let now = collaborators.clock.now();
    let mut assembly = Assembly::default();

    for record in records {
        let Some((row, configuration)) = assemble_record(record, collaborators, settings, now)?
        else {
            continue;
        };

        let key = configuration.definition_id;
        if assembly.configurations.contains_key(&key) {
            if settings.strict_mode {
                return Err(ReportError::DataIntegrity(format!(
                    "test definition {} appears more than once among active tests",
                    key
                )));
            }
            tracing::warn!(
                "duplicate active test definition {}; later configuration replaces earlier one",
                key
            );
        }
        assembly.configurations.insert(key, configuration);
        assembly.rows.push(row);
    }

    tracing::debug!(
        "assembled {} of {} active test records",
        assembly.rows.len(),
        records.len()
    );
    Ok(assembly)
}

fn assemble_record(
    record: &TestRecord,
    collaborators: &Collaborators,
    settings: &ReportSettings,
    now: DateTime<Utc>,
) -> Result<Option<(ReportRow, TestConfiguration)>> {
    let Some(test_item) = collaborators.content.get_item(&record.uri)? else {
        tracing::debug!("skipping test {}: test item {} not found", record.id, record.uri);
        return Ok(None);
    };

    let Some(definition) = test_item.test_definition.as_ref() else {
        tracing::debug!("skipping test {}: {} is not a test definition", record.id, record.uri);
        return Ok(None);
    };

    let Some(host_uri) = record.host_item_uri.as_ref() else {
        tracing::debug!("skipping test {}: no host item reference", record.id);
        return Ok(None);
    };
    let Some(host) = collaborators.content.get_item(host_uri)? else {
        tracing::debug!("skipping test {}: host item {} not found", record.id, host_uri);
        return Ok(None);
    };

    let Some(configuration) = collaborators.configurations.load(&host, definition)? else {
        tracing::debug!("skipping test {}: configuration could not be loaded", record.id);
        return Ok(None);
    };

    let experience_count = configuration.test_set.experience_count();
    let days = match estimate_remaining_days(
        collaborators.estimators.as_ref(),
        &host,
        experience_count,
        settings.required_statistical_power,
        definition,
        now,
    ) {
        Ok(days) => days,
        Err(ReportError::Configuration(msg)) if !settings.strict_mode => {
            tracing::warn!("skipping test {}: {}", record.id, msg);
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    let site = collaborators.sites.site(&test_item)?;
    let date = collaborators
        .clock
        .to_display_time(definition.start_date)
        .format(DATE_FORMAT)
        .to_string();

    let row = ReportRow {
        host_page_id: host.id().to_string(),
        host_page_uri: host.uri.clone(),
        host_page_name: host.display_name().to_string(),
        device_id: configuration.device_id.to_string(),
        device_name: configuration.device_name.clone(),
        language: configuration.language_name.clone(),
        created_by: collaborators.users.friendly_name(&test_item.owner),
        date,
        experience_count,
        days,
        item_id: definition.id.to_string(),
        content_only: configuration.test_set.variable_count()
            == definition.page_level_test_variables.len(),
        test_type: configuration.test_type,
        test_id: configuration.definition_id,
        site_name: site.name,
        effect: 0.0,
        effect_trend: EffectTrend::NoChange,
        effect_css: EffectTrend::NoChange.css_class(),
    };

    Ok(Some((row, configuration)))
}
