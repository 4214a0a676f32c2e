#![allow(dead_code)]

use modhost_core::{
    ConfigSchema, DashboardItem, HookError, HookResult, ModuleDescriptor, ModuleMigration,
    NavigationItem,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Shared, ordered record of callbacks and migration runs.
pub type EventLog = Rc<RefCell<Vec<String>>>;

pub fn event_log() -> EventLog {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn events(log: &EventLog) -> Vec<String> {
    log.borrow().clone()
}

/// Labels written to `scripted_runs` by successful scripted migrations.
pub fn stored_runs(conn: &rusqlite::Connection) -> Vec<String> {
    let mut stmt = match conn.prepare("SELECT label FROM scripted_runs ORDER BY rowid;") {
        Ok(stmt) => stmt,
        Err(_) => return Vec::new(),
    };
    let labels = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<String>, _>>()
        .unwrap();
    labels
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Succeed,
    Fail,
    Panic,
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Items,
    Fail,
    Panic,
}

/// Configurable descriptor that writes every callback into an [`EventLog`].
#[derive(Clone)]
pub struct ScriptedModule {
    pub id: String,
    pub version: String,
    pub requires: Vec<String>,
    pub migrations: Vec<(String, Step)>,
    pub fail_enable: bool,
    pub fail_disable: bool,
    pub dashboard: Vec<DashboardItem>,
    pub navigation: Vec<NavigationItem>,
    pub provider: Provider,
    pub schema: Option<ConfigSchema>,
    pub log: EventLog,
}

impl ScriptedModule {
    pub fn new(id: &str, log: &EventLog) -> Self {
        Self {
            id: id.to_string(),
            version: "1.0.0".to_string(),
            requires: Vec::new(),
            migrations: Vec::new(),
            fail_enable: false,
            fail_disable: false,
            dashboard: Vec::new(),
            navigation: Vec::new(),
            provider: Provider::Items,
            schema: None,
            log: Rc::clone(log),
        }
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn with_requirement(mut self, module_id: &str) -> Self {
        self.requires.push(module_id.to_string());
        self
    }

    pub fn with_migration(mut self, version: &str, step: Step) -> Self {
        self.migrations.push((version.to_string(), step));
        self
    }

    pub fn with_dashboard(mut self, item: DashboardItem) -> Self {
        self.dashboard.push(item);
        self
    }

    pub fn with_navigation(mut self, item: NavigationItem) -> Self {
        self.navigation.push(item);
        self
    }

    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_schema(mut self, schema: ConfigSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn boxed(self) -> Box<dyn ModuleDescriptor> {
        Box::new(self)
    }

    fn record(&self, event: String) {
        self.log.borrow_mut().push(event);
    }

    fn provide<T: Clone>(&self, items: &[T]) -> HookResult<Vec<T>> {
        match self.provider {
            Provider::Items => Ok(items.to_vec()),
            Provider::Fail => Err(HookError::new("provider unavailable")),
            Provider::Panic => panic!("provider crashed"),
        }
    }
}

impl ModuleDescriptor for ScriptedModule {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Scripted"
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn requires(&self) -> Vec<String> {
        self.requires.clone()
    }

    fn on_register(&self) -> HookResult<()> {
        self.record(format!("register:{}", self.id));
        Ok(())
    }

    fn on_enable(&self) -> HookResult<()> {
        if self.fail_enable {
            return Err(HookError::new("enable refused"));
        }
        self.record(format!("enable:{}", self.id));
        Ok(())
    }

    fn on_disable(&self) -> HookResult<()> {
        if self.fail_disable {
            return Err(HookError::new("disable refused"));
        }
        self.record(format!("disable:{}", self.id));
        Ok(())
    }

    fn on_update(&self, previous_version: &str) -> HookResult<()> {
        self.record(format!("update:{}:{}->{}", self.id, previous_version, self.version));
        Ok(())
    }

    fn dashboard_items(&self) -> HookResult<Vec<DashboardItem>> {
        self.provide(&self.dashboard)
    }

    fn navigation_items(&self) -> HookResult<Vec<NavigationItem>> {
        self.provide(&self.navigation)
    }

    fn migrations(&self) -> Vec<ModuleMigration> {
        self.migrations
            .iter()
            .map(|(version, step)| {
                let log = Rc::clone(&self.log);
                let label = format!("migrate:{}:{}", self.id, version);
                let step = *step;
                ModuleMigration::new(version.clone(), format!("step {version}"), move |conn| {
                    match step {
                        Step::Succeed => {
                            conn.execute_batch(
                                "CREATE TABLE IF NOT EXISTS scripted_runs (label TEXT NOT NULL);",
                            )?;
                            conn.execute("INSERT INTO scripted_runs (label) VALUES (?1);", [&label])?;
                            log.borrow_mut().push(label.clone());
                            Ok(())
                        }
                        Step::Fail => Err(HookError::new(format!("{label} refused"))),
                        Step::Panic => panic!("{label} crashed"),
                    }
                })
            })
            .collect()
    }

    fn config_schema(&self) -> Option<ConfigSchema> {
        self.schema.clone()
    }
}
