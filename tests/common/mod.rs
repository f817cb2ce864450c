use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tempfile::TempDir;
use testpulse::experiments::store::CONTENT_DIR;
use testpulse::ItemId;
use tower::ServiceExt;

pub const ACTIVE_TESTS_PATH: &str = "/sitecore/shell/api/ct/Tests/GetActiveTests";

#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
pub struct SeededTest {
    pub record_id: ItemId,
    pub host_id: ItemId,
    pub definition_id: ItemId,
}

/// Content-test data written to `{tmp}/.content_tests/*.json` the way an
/// operator would lay it out.
pub struct ContentFixture {
    pub dir: TempDir,
    items: Vec<Value>,
    active_tests: Vec<Value>,
    configurations: Vec<Value>,
    performance: Vec<Value>,
    sites: Vec<Value>,
    users: Vec<Value>,
}

#[allow(dead_code)]
impl ContentFixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            items: Vec::new(),
            active_tests: Vec::new(),
            configurations: Vec::new(),
            performance: Vec::new(),
            sites: Vec::new(),
            users: Vec::new(),
        }
    }

    /// A single-variable, two-experience page test on a new host page. With no
    /// traffic figure the estimator has no estimate, so the row reports
    /// `max_duration` days.
    pub fn add_test(&mut self, host_name: &str, max_duration: &str) -> SeededTest {
        self.add_test_with(host_name, 0, "1", max_duration, None)
    }

    pub fn add_test_with(
        &mut self,
        host_name: &str,
        started_days_ago: i64,
        min_duration: &str,
        max_duration: &str,
        daily_visits: Option<f64>,
    ) -> SeededTest {
        let record_id = ItemId::new();
        let host_id = ItemId::new();
        let definition_id = ItemId::new();
        let host_path = format!("/sitecore/content/home/{}", host_name.to_lowercase());

        self.items.push(json!({
            "uri": host_id.to_string(),
            "name": host_name.to_lowercase(),
            "displayName": host_name,
            "path": host_path,
            "owner": "sitecore\\editor",
            "dailyVisits": daily_visits,
        }));
        self.items.push(json!({
            "uri": format!("sitecore://master/{}?lang=en&ver=1", definition_id),
            "name": format!("{} test", host_name),
            "path": format!("{}/_tests/{}", host_path, host_name.to_lowercase()),
            "owner": "sitecore\\editor",
            "testDefinition": {
                "id": definition_id.to_string(),
                "startDate": (Utc::now() - Duration::days(started_days_ago)).to_rfc3339(),
                "minDuration": min_duration,
                "maxDuration": max_duration,
                "trafficAllocationPercentage": 100.0,
                "confidenceLevelPercentage": 95.0,
                "language": "en",
                "pageLevelTestVariables": [],
            },
        }));
        self.configurations.push(json!({
            "definitionId": definition_id.to_string(),
            "hostItemId": host_id.to_string(),
            "deviceName": "Default",
            "languageName": "en",
            "testType": "Page",
            "testSet": {
                "variables": [{ "id": ItemId::new().to_string(), "name": "Hero", "valueCount": 2 }],
            },
        }));
        self.active_tests.push(json!({
            "id": record_id.to_string(),
            "uri": format!("sitecore://master/{}?lang=en", definition_id),
            "hostItemUri": format!("sitecore://master/{}?lang=en", host_id),
            "language": "en",
            "name": format!("{} test", host_name),
        }));

        SeededTest {
            record_id,
            host_id,
            definition_id,
        }
    }

    /// An active test whose host page no longer exists.
    pub fn add_orphan_test(&mut self, name: &str) {
        let seeded = self.add_test(name, "30");
        let host = seeded.host_id.to_string();
        self.items.retain(|item| item["uri"] != host);
    }

    /// `(value index, visits, total value)` per experience of the single test variable.
    pub fn set_performance(&mut self, definition_id: ItemId, experiences: &[(u8, u64, f64)]) {
        let experiences: Vec<Value> = experiences
            .iter()
            .map(|(index, visits, value)| {
                json!({ "combination": [index], "visits": visits, "value": value })
            })
            .collect();
        self.performance.push(json!({
            "testId": definition_id.to_string(),
            "experiences": experiences,
        }));
    }

    pub fn add_site(&mut self, name: &str, root_path: &str) {
        self.sites.push(json!({ "name": name, "rootPath": root_path }));
    }

    pub fn add_user(&mut self, account: &str, full_name: &str) {
        self.users.push(json!({ "account": account, "fullName": full_name }));
    }

    pub fn write_settings(&self, settings: Value) {
        std::fs::write(
            self.dir.path().join(testpulse::settings::SETTINGS_FILE),
            settings.to_string(),
        )
        .unwrap();
    }

    pub fn write(&self) {
        let dir = self.dir.path().join(CONTENT_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        for (file, values) in [
            ("items.json", &self.items),
            ("active_tests.json", &self.active_tests),
            ("configurations.json", &self.configurations),
            ("performance.json", &self.performance),
            ("sites.json", &self.sites),
            ("users.json", &self.users),
        ] {
            std::fs::write(dir.join(file), serde_json::to_string_pretty(values).unwrap()).unwrap();
        }
    }

    /// Writes the data and builds the full application router over it.
    pub fn app(&self) -> Router {
        self.write();
        testpulse_http::build_app(self.dir.path()).unwrap()
    }
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let resp = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = http_body_util::BodyExt::collect(resp.into_body())
        .await
        .unwrap()
        .to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}
