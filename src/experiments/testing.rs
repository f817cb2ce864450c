//! In-memory report fixture shared by unit tests.

use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use dashmap::DashMap;

use super::collaborators::{
    Collaborators, EstimateRequest, EstimatorFactory, FixedClock, RunEstimate, RunEstimator,
};
use super::config::{
    ExperienceSet, Item, TestConfiguration, TestDefinition, TestRecord, TestType, TestVariable,
};
use super::store::ContentRepository;
use crate::error::Result;
use crate::settings::ReportSettings;
use crate::types::{ItemId, ItemUri};

pub const OWNER: &str = "sitecore\\tauthor";

/// Estimates keyed by test-definition id; unknown definitions have none.
#[derive(Default)]
pub struct TableEstimators {
    days: DashMap<ItemId, u32>,
}

struct TableEstimator<'a>(&'a DashMap<ItemId, u32>);

impl RunEstimator for TableEstimator<'_> {
    fn get_estimate(
        &self,
        _host: &Item,
        _request: &EstimateRequest,
        definition: &TestDefinition,
    ) -> Result<RunEstimate> {
        Ok(RunEstimate {
            estimated_day_count: self.0.get(&definition.id).map(|d| *d),
        })
    }
}

impl EstimatorFactory for TableEstimators {
    fn estimator(&self, _language: &str, _device_name: &str) -> Box<dyn RunEstimator + '_> {
        Box::new(TableEstimator(&self.days))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TestHandle {
    pub record_id: ItemId,
    pub test_item_id: ItemId,
    pub host_item_id: ItemId,
    pub definition_id: ItemId,
}

pub struct Fixture {
    pub settings: ReportSettings,
    pub repository: Arc<ContentRepository>,
    pub estimators: Arc<TableEstimators>,
    now: DateTime<Utc>,
    offset: FixedOffset,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_display_offset_hours(0)
    }

    pub fn with_display_offset_hours(hours: i32) -> Self {
        let repository = ContentRepository::in_memory();
        repository.put_user(OWNER, "Test Author");
        Self {
            settings: ReportSettings {
                display_offset_minutes: hours * 60,
                ..ReportSettings::default()
            },
            repository: Arc::new(repository),
            estimators: Arc::new(TableEstimators::default()),
            now: Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap(),
            offset: FixedOffset::east_opt(hours * 3600).unwrap(),
        }
    }

    /// Adds a resolvable active test on a new host page: one variable with two
    /// values, durations 14/30, one page-level variable.
    pub fn add_test(
        &mut self,
        host_name: &str,
        started_days_ago: i64,
        estimate: Option<u32>,
    ) -> TestHandle {
        let host = Item {
            uri: ItemUri::new(ItemId::new()),
            name: host_name.to_lowercase(),
            display_name: Some(host_name.to_string()),
            path: format!("/sitecore/content/home/{}", host_name.to_lowercase()),
            owner: OWNER.to_string(),
            test_definition: None,
            daily_visits: Some(1_000.0),
        };

        let definition = TestDefinition {
            id: ItemId::new(),
            start_date: self.now - Duration::days(started_days_ago),
            min_duration: "14".to_string(),
            max_duration: "30".to_string(),
            traffic_allocation_percentage: 100.0,
            confidence_level_percentage: 95.0,
            device: None,
            language: "en".to_string(),
            page_level_test_variables: vec![ItemId::new()],
        };

        let test_item = Item {
            uri: ItemUri::new(definition.id),
            name: format!("{} test", host_name),
            display_name: None,
            path: format!("{}/_tests/{}", host.path, definition.id),
            owner: OWNER.to_string(),
            test_definition: Some(definition.clone()),
            daily_visits: None,
        };

        let configuration = TestConfiguration {
            definition_id: definition.id,
            host_item_id: host.id(),
            device_id: ItemId::default(),
            device_name: "Default".to_string(),
            language_name: "en".to_string(),
            test_type: TestType::Page,
            test_set: ExperienceSet {
                variables: vec![TestVariable {
                    id: ItemId::new(),
                    name: "Hero".to_string(),
                    value_count: 2,
                }],
            },
        };

        let record = TestRecord {
            id: ItemId::new(),
            uri: test_item.uri.clone(),
            host_item_uri: Some(host.uri.clone()),
            device_id: None,
            language: "en".to_string(),
            name: format!("{} test", host_name),
        };

        if let Some(days) = estimate {
            self.estimators.days.insert(definition.id, days);
        }

        let handle = TestHandle {
            record_id: record.id,
            test_item_id: test_item.id(),
            host_item_id: host.id(),
            definition_id: definition.id,
        };
        self.repository.put_item(host);
        self.repository.put_item(test_item);
        self.repository.put_configuration(configuration);
        self.repository.add_active_test(record);
        handle
    }

    pub fn records(&self) -> Vec<TestRecord> {
        self.repository.active_tests()
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators::from_repository(
            self.repository.clone(),
            self.estimators.clone(),
            Arc::new(FixedClock::new(self.now, self.offset)),
        )
    }

    pub fn remove_item(&mut self, id: ItemId) {
        self.repository.remove_item(&id);
    }

    fn update_definition(&mut self, test_item_id: ItemId, f: impl FnOnce(&mut TestDefinition)) {
        let mut item = self.repository.item(&test_item_id).unwrap();
        f(item.test_definition.as_mut().unwrap());
        self.repository.put_item(item);
    }

    pub fn strip_definition(&mut self, test_item_id: ItemId) {
        let mut item = self.repository.item(&test_item_id).unwrap();
        item.test_definition = None;
        self.repository.put_item(item);
    }

    pub fn set_durations(&mut self, test_item_id: ItemId, min: &str, max: &str) {
        self.update_definition(test_item_id, |def| {
            def.min_duration = min.to_string();
            def.max_duration = max.to_string();
        });
    }

    pub fn set_page_level_variables(&mut self, test: &TestHandle, count: usize) {
        self.update_definition(test.test_item_id, |def| {
            def.page_level_test_variables = (0..count).map(|_| ItemId::new()).collect();
        });
    }

    pub fn clear_host_reference(&mut self, record_id: ItemId) {
        let mut records = self.repository.active_tests();
        for record in records.iter_mut().filter(|r| r.id == record_id) {
            record.host_item_uri = None;
        }
        self.repository.replace_active_tests(records);
    }

    pub fn duplicate_record(&mut self, record_id: ItemId) {
        let records = self.repository.active_tests();
        let original = records.iter().find(|r| r.id == record_id).unwrap().clone();
        self.repository.add_active_test(TestRecord {
            id: ItemId::new(),
            ..original
        });
    }

    pub fn remove_configuration(&mut self, definition_id: ItemId) {
        self.repository.remove_configuration(&definition_id);
    }
}
