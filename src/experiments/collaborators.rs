//! Capability interfaces the reporting core depends on.
//!
//! Each trait is the narrow contract of one external collaborator: the test
//! store, content lookup, configuration loading, run-length estimation,
//! performance statistics, site context, user display names and the clock.
//! [`ContentRepository`](super::store::ContentRepository) implements the
//! storage-backed ones; [`SampleSizeEstimator`](super::stats::SampleSizeEstimator)
//! implements estimation.

use chrono::{DateTime, FixedOffset, Utc};
use std::sync::Arc;

use super::config::{Item, TestConfiguration, TestDefinition, TestRecord};
use super::effect::PerformanceSnapshot;
use crate::error::Result;
use crate::types::ItemUri;

pub trait TestStore: Send + Sync {
    /// Active tests, optionally restricted to a host item and/or matching free text.
    fn find_active(
        &self,
        host: Option<&ItemUri>,
        search_text: Option<&str>,
    ) -> Result<Vec<TestRecord>>;
}

pub trait ContentResolver: Send + Sync {
    fn get_item(&self, uri: &ItemUri) -> Result<Option<Item>>;
}

pub trait ConfigurationLoader: Send + Sync {
    fn load(&self, host: &Item, definition: &TestDefinition)
        -> Result<Option<TestConfiguration>>;
}

/// Inputs handed to a run estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimateRequest {
    pub experience_count: u32,
    pub required_power: f64,
    pub traffic_allocation_pct: f64,
    pub confidence_level_pct: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunEstimate {
    /// Total days the test needs from its start date; `None` when unknown.
    pub estimated_day_count: Option<u32>,
}

pub trait RunEstimator {
    fn get_estimate(
        &self,
        host: &Item,
        request: &EstimateRequest,
        definition: &TestDefinition,
    ) -> Result<RunEstimate>;
}

pub trait EstimatorFactory: Send + Sync {
    /// Estimator for a language/device pair. `device_name` is empty when the
    /// test targets no specific device.
    fn estimator(&self, language: &str, device_name: &str) -> Box<dyn RunEstimator + '_>;
}

pub trait PerformanceProvider: Send + Sync {
    fn performance(&self, test: &TestConfiguration) -> Result<PerformanceSnapshot>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteInfo {
    pub name: String,
}

pub trait SiteResolver: Send + Sync {
    fn site(&self, item: &Item) -> Result<SiteInfo>;
}

pub trait UserFormatter: Send + Sync {
    fn friendly_name(&self, owner: &str) -> String;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    fn to_display_time(&self, utc: DateTime<Utc>) -> DateTime<FixedOffset>;
}

/// Wall clock with a fixed server display offset.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn to_display_time(&self, utc: DateTime<Utc>) -> DateTime<FixedOffset> {
        utc.with_timezone(&self.offset)
    }
}

/// Clock pinned to one instant, for reproducible reports.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
    offset: FixedOffset,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self { now, offset }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn to_display_time(&self, utc: DateTime<Utc>) -> DateTime<FixedOffset> {
        utc.with_timezone(&self.offset)
    }
}

/// Everything one report request talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub tests: Arc<dyn TestStore>,
    pub content: Arc<dyn ContentResolver>,
    pub configurations: Arc<dyn ConfigurationLoader>,
    pub estimators: Arc<dyn EstimatorFactory>,
    pub performance: Arc<dyn PerformanceProvider>,
    pub sites: Arc<dyn SiteResolver>,
    pub users: Arc<dyn UserFormatter>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// Wire every storage-backed collaborator to one repository.
    pub fn from_repository<R>(
        repository: Arc<R>,
        estimators: Arc<dyn EstimatorFactory>,
        clock: Arc<dyn Clock>,
    ) -> Self
    where
        R: TestStore
            + ContentResolver
            + ConfigurationLoader
            + PerformanceProvider
            + SiteResolver
            + UserFormatter
            + 'static,
    {
        Self {
            tests: repository.clone(),
            content: repository.clone(),
            configurations: repository.clone(),
            estimators,
            performance: repository.clone(),
            sites: repository.clone(),
            users: repository,
            clock,
        }
    }
}
