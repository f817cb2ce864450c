use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::collaborators::{
    ConfigurationLoader, ContentResolver, PerformanceProvider, SiteInfo, SiteResolver, TestStore,
    UserFormatter,
};
use super::config::{Item, TestConfiguration, TestDefinition, TestRecord};
use super::effect::PerformanceSnapshot;
use crate::error::Result;
use crate::types::{ItemId, ItemUri};

pub const CONTENT_DIR: &str = ".content_tests";
const ITEMS_FILE: &str = "items.json";
const ACTIVE_TESTS_FILE: &str = "active_tests.json";
const CONFIGURATIONS_FILE: &str = "configurations.json";
const PERFORMANCE_FILE: &str = "performance.json";
const SITES_FILE: &str = "sites.json";
const USERS_FILE: &str = "users.json";

/// Site used when no configured site root contains the item.
pub const DEFAULT_SITE: &str = "website";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SiteDefinition {
    pub name: String,
    pub root_path: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
struct UserProfile {
    account: String,
    full_name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
struct PerformanceEntry {
    test_id: ItemId,
    #[serde(flatten)]
    snapshot: PerformanceSnapshot,
}

/// Content, active tests and their statistics, held in memory and optionally
/// persisted as JSON under `{data_dir}/.content_tests/`.
///
/// Implements every storage-backed collaborator of the reporting core.
pub struct ContentRepository {
    items: DashMap<ItemId, Item>,
    active_tests: RwLock<Vec<TestRecord>>,
    configurations: DashMap<ItemId, TestConfiguration>,
    performance: DashMap<ItemId, PerformanceSnapshot>,
    sites: RwLock<Vec<SiteDefinition>>,
    users: DashMap<String, String>,
    dir: Option<PathBuf>,
}

fn read_list<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

fn path_under(path: &str, root: &str) -> bool {
    let path = path.to_ascii_lowercase();
    let root = root.trim_end_matches('/').to_ascii_lowercase();
    path == root || path.starts_with(&format!("{}/", root))
}

impl ContentRepository {
    pub fn in_memory() -> Self {
        Self {
            items: DashMap::new(),
            active_tests: RwLock::new(Vec::new()),
            configurations: DashMap::new(),
            performance: DashMap::new(),
            sites: RwLock::new(Vec::new()),
            users: DashMap::new(),
            dir: None,
        }
    }

    pub fn open(data_dir: &Path) -> Result<Self> {
        let dir = data_dir.join(CONTENT_DIR);
        std::fs::create_dir_all(&dir)?;
        let repo = Self {
            dir: Some(dir),
            ..Self::in_memory()
        };
        repo.load_all()?;
        Ok(repo)
    }

    fn load_all(&self) -> Result<()> {
        let Some(ref dir) = self.dir else {
            return Ok(());
        };

        for item in read_list::<Item>(&dir.join(ITEMS_FILE))? {
            self.items.insert(item.id(), item);
        }
        *self
            .active_tests
            .write()
            .unwrap_or_else(PoisonError::into_inner) = read_list(&dir.join(ACTIVE_TESTS_FILE))?;
        for config in read_list::<TestConfiguration>(&dir.join(CONFIGURATIONS_FILE))? {
            self.configurations.insert(config.definition_id, config);
        }
        for entry in read_list::<PerformanceEntry>(&dir.join(PERFORMANCE_FILE))? {
            self.performance.insert(entry.test_id, entry.snapshot);
        }
        *self.sites.write().unwrap_or_else(PoisonError::into_inner) =
            read_list(&dir.join(SITES_FILE))?;
        for user in read_list::<UserProfile>(&dir.join(USERS_FILE))? {
            self.users.insert(user.account, user.full_name);
        }

        tracing::info!(
            "Loaded content repository from {}: {} items, {} active tests, {} configurations",
            dir.display(),
            self.items.len(),
            self.active_tests().len(),
            self.configurations.len()
        );
        Ok(())
    }

    fn atomic_write<T: Serialize + ?Sized>(dir: &Path, file: &str, value: &T) -> Result<()> {
        let tmp_path = dir.join(format!("{}.tmp", file));
        let final_path = dir.join(file);
        let data = serde_json::to_string_pretty(value)?;
        std::fs::write(&tmp_path, data)?;
        std::fs::rename(&tmp_path, &final_path)?;
        Ok(())
    }

    /// Persist the current contents. No-op for in-memory repositories.
    pub fn save(&self) -> Result<()> {
        let Some(ref dir) = self.dir else {
            return Ok(());
        };

        let mut items: Vec<Item> = self.items.iter().map(|e| e.value().clone()).collect();
        items.sort_by_key(|item| item.id());
        Self::atomic_write(dir, ITEMS_FILE, &items)?;

        Self::atomic_write(dir, ACTIVE_TESTS_FILE, &self.active_tests())?;

        let mut configurations: Vec<TestConfiguration> =
            self.configurations.iter().map(|e| e.value().clone()).collect();
        configurations.sort_by_key(|c| c.definition_id);
        Self::atomic_write(dir, CONFIGURATIONS_FILE, &configurations)?;

        let mut performance: Vec<PerformanceEntry> = self
            .performance
            .iter()
            .map(|e| PerformanceEntry {
                test_id: *e.key(),
                snapshot: e.value().clone(),
            })
            .collect();
        performance.sort_by_key(|p| p.test_id);
        Self::atomic_write(dir, PERFORMANCE_FILE, &performance)?;

        Self::atomic_write(dir, SITES_FILE, &self.sites())?;

        let mut users: Vec<UserProfile> = self
            .users
            .iter()
            .map(|e| UserProfile {
                account: e.key().clone(),
                full_name: e.value().clone(),
            })
            .collect();
        users.sort_by(|a, b| a.account.cmp(&b.account));
        Self::atomic_write(dir, USERS_FILE, &users)?;
        Ok(())
    }

    pub fn put_item(&self, item: Item) {
        self.items.insert(item.id(), item);
    }

    pub fn item(&self, id: &ItemId) -> Option<Item> {
        self.items.get(id).map(|e| e.value().clone())
    }

    pub fn remove_item(&self, id: &ItemId) -> Option<Item> {
        self.items.remove(id).map(|(_, item)| item)
    }

    pub fn add_active_test(&self, record: TestRecord) {
        self.active_tests
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    /// Active tests in listing order.
    pub fn active_tests(&self) -> Vec<TestRecord> {
        self.active_tests
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace_active_tests(&self, records: Vec<TestRecord>) {
        *self
            .active_tests
            .write()
            .unwrap_or_else(PoisonError::into_inner) = records;
    }

    pub fn put_configuration(&self, configuration: TestConfiguration) {
        self.configurations
            .insert(configuration.definition_id, configuration);
    }

    pub fn remove_configuration(&self, definition_id: &ItemId) -> Option<TestConfiguration> {
        self.configurations
            .remove(definition_id)
            .map(|(_, configuration)| configuration)
    }

    pub fn put_performance(&self, definition_id: ItemId, snapshot: PerformanceSnapshot) {
        self.performance.insert(definition_id, snapshot);
    }

    pub fn add_site(&self, site: SiteDefinition) {
        self.sites
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(site);
    }

    pub fn sites(&self) -> Vec<SiteDefinition> {
        self.sites
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn put_user(&self, account: &str, full_name: &str) {
        self.users.insert(account.to_string(), full_name.to_string());
    }

    fn host_name_matches(&self, record: &TestRecord, needle: &str) -> bool {
        record
            .host_item_uri
            .as_ref()
            .and_then(|uri| self.items.get(&uri.id))
            .is_some_and(|host| host.display_name().to_lowercase().contains(needle))
    }
}

impl TestStore for ContentRepository {
    fn find_active(
        &self,
        host: Option<&ItemUri>,
        search_text: Option<&str>,
    ) -> Result<Vec<TestRecord>> {
        let needle = search_text
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let tests = self
            .active_tests
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(tests
            .iter()
            .filter(|record| match host {
                Some(filter) => record
                    .host_item_uri
                    .as_ref()
                    .is_some_and(|uri| filter.matches(uri)),
                None => true,
            })
            .filter(|record| match needle {
                Some(ref n) => {
                    record.name.to_lowercase().contains(n.as_str())
                        || self.host_name_matches(record, n)
                }
                None => true,
            })
            .cloned()
            .collect())
    }
}

impl ContentResolver for ContentRepository {
    fn get_item(&self, uri: &ItemUri) -> Result<Option<Item>> {
        Ok(self
            .items
            .get(&uri.id)
            .filter(|item| match (&uri.language, &item.uri.language) {
                (Some(want), Some(have)) => want.eq_ignore_ascii_case(have),
                _ => true,
            })
            .map(|item| item.value().clone()))
    }
}

impl ConfigurationLoader for ContentRepository {
    fn load(
        &self,
        host: &Item,
        definition: &TestDefinition,
    ) -> Result<Option<TestConfiguration>> {
        Ok(self
            .configurations
            .get(&definition.id)
            .filter(|c| c.host_item_id == host.id())
            .map(|c| c.value().clone()))
    }
}

impl PerformanceProvider for ContentRepository {
    fn performance(&self, test: &TestConfiguration) -> Result<PerformanceSnapshot> {
        Ok(self
            .performance
            .get(&test.definition_id)
            .map(|p| p.value().clone())
            .unwrap_or_default())
    }
}

impl SiteResolver for ContentRepository {
    fn site(&self, item: &Item) -> Result<SiteInfo> {
        let sites = self.sites.read().unwrap_or_else(PoisonError::into_inner);
        let name = sites
            .iter()
            .filter(|site| path_under(&item.path, &site.root_path))
            .max_by_key(|site| site.root_path.trim_end_matches('/').len())
            .map_or_else(|| DEFAULT_SITE.to_string(), |site| site.name.clone());
        Ok(SiteInfo { name })
    }
}

impl UserFormatter for ContentRepository {
    fn friendly_name(&self, owner: &str) -> String {
        if let Some(full_name) = self.users.get(owner) {
            if !full_name.is_empty() {
                return full_name.clone();
            }
        }
        owner.rsplit('\\').next().unwrap_or_default().to_string()
    }
}
