//! Reporting facade: the single entry point for the active-tests report.

use serde::Deserialize;

use super::assemble::assemble;
use super::collaborators::Collaborators;
use super::effect::winning_effect;
use super::model::Report;
use super::rank::{rank, Page};
use crate::error::Result;
use crate::settings::ReportSettings;
use crate::types::ItemUri;

/// Query accepted by [`ActiveTestReporter::get_active_tests`]; every field is optional.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTestsQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
    #[serde(default)]
    pub host_item_id: Option<String>,
    #[serde(default)]
    pub search_text: Option<String>,
}

impl ActiveTestsQuery {
    fn host_reference(&self) -> Result<Option<ItemUri>> {
        match self.host_item_id.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => ItemUri::parse(raw).map(Some),
        }
    }
}

/// Stateless between calls; each request builds its own assembly.
#[derive(Clone)]
pub struct ActiveTestReporter {
    collaborators: Collaborators,
    settings: ReportSettings,
}

impl ActiveTestReporter {
    pub fn new(collaborators: Collaborators, settings: ReportSettings) -> Self {
        Self {
            collaborators,
            settings,
        }
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    pub fn get_active_tests(&self, query: &ActiveTestsQuery) -> Result<Report> {
        let host = query.host_reference()?;
        let page = Page::resolve(query.page, query.page_size, &self.settings)?;

        let records = self
            .collaborators
            .tests
            .find_active(host.as_ref(), query.search_text.as_deref())?;

        let assembly = assemble(&records, &self.collaborators, &self.settings)?;
        let (mut items, total_results) = rank(assembly.rows, page);

        for row in items.iter_mut() {
            // host may have been deleted since assembly; the row keeps no-change
            if self.collaborators.content.get_item(&row.host_page_uri)?.is_none() {
                tracing::debug!("host {} gone, effect not computed", row.host_page_uri);
                continue;
            }
            let Some(configuration) = assembly.configurations.get(&row.test_id) else {
                continue;
            };
            let effect = winning_effect(self.collaborators.performance.as_ref(), configuration)?;
            row.apply_effect(effect);
        }

        tracing::debug!(
            "active tests page {} (size {}): {} of {} rows",
            page.number,
            page.size,
            items.len(),
            total_results
        );
        Ok(Report {
            items,
            total_results,
        })
    }
}
