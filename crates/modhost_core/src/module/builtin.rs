//! Declarative first-party modules.
//!
//! [`StaticModule`] covers modules whose contributions are fixed data:
//! identity, dashboard/navigation items, SQL migrations and a settings schema.
//! It has no lifecycle side effects.

use crate::model::extension::{DashboardItem, NavigationItem};
use crate::module::descriptor::{HookResult, ModuleDescriptor, ModuleMigration};
use crate::module::schema::{ConfigField, ConfigSchema, SettingKind};

#[derive(Debug, Clone)]
struct SqlStep {
    version: String,
    description: String,
    sql: &'static str,
}

/// Module descriptor assembled from static declarations.
#[derive(Debug, Clone, Default)]
pub struct StaticModule {
    id: String,
    name: String,
    version: String,
    description: String,
    author: String,
    requires: Vec<String>,
    permissions: Vec<String>,
    dashboard: Vec<DashboardItem>,
    navigation: Vec<NavigationItem>,
    steps: Vec<SqlStep>,
    schema: Option<ConfigSchema>,
}

impl StaticModule {
    pub fn new(id: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_requirement(mut self, module_id: impl Into<String>) -> Self {
        self.requires.push(module_id.into());
        self
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    pub fn with_dashboard_item(mut self, item: DashboardItem) -> Self {
        self.dashboard.push(item);
        self
    }

    pub fn with_navigation_item(mut self, item: NavigationItem) -> Self {
        self.navigation.push(item);
        self
    }

    /// Appends a SQL migration; declaration order is application order.
    pub fn with_sql_migration(
        mut self,
        version: impl Into<String>,
        description: impl Into<String>,
        sql: &'static str,
    ) -> Self {
        self.steps.push(SqlStep {
            version: version.into(),
            description: description.into(),
            sql,
        });
        self
    }

    pub fn with_config_schema(mut self, schema: ConfigSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn boxed(self) -> Box<dyn ModuleDescriptor> {
        Box::new(self)
    }

    /// Stock tracking module shipped with the host.
    pub fn inventory_baseline() -> Self {
        Self::new("inventory", "Inventory", "1.0.0")
            .with_description("Tracks stock items and low-stock alerts")
            .with_author("modhost")
            .with_permission("storage")
            .with_dashboard_item(
                DashboardItem::new("inventory.low_stock", "Low stock")
                    .with_priority(50)
                    .with_widget("counter"),
            )
            .with_navigation_item(
                NavigationItem::new("inventory.items", "Inventory", "/inventory")
                    .with_order(10)
                    .with_icon("box"),
            )
            .with_sql_migration(
                "1.0.0",
                "create inventory_items",
                "CREATE TABLE IF NOT EXISTS inventory_items (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    quantity INTEGER NOT NULL DEFAULT 0 CHECK (quantity >= 0),
                    updated_at INTEGER NOT NULL
                );",
            )
            .with_config_schema(
                ConfigSchema::new()
                    .field(
                        ConfigField::optional("currency", SettingKind::String)
                            .with_default("USD")
                            .with_description("ISO currency code used for valuations"),
                    )
                    .field(
                        ConfigField::optional("low_stock_threshold", SettingKind::Integer)
                            .with_default(5),
                    ),
            )
    }

    /// Reporting module layered on top of inventory.
    pub fn reports_baseline() -> Self {
        Self::new("reports", "Reports", "1.0.0")
            .with_description("Summaries over inventory data")
            .with_author("modhost")
            .with_requirement("inventory")
            .with_dashboard_item(
                DashboardItem::new("reports.weekly", "Weekly report").with_priority(20),
            )
            .with_navigation_item(
                NavigationItem::new("reports.index", "Reports", "/reports").with_order(20),
            )
    }

    /// Every first-party module, dependencies first.
    pub fn baseline() -> Vec<Box<dyn ModuleDescriptor>> {
        vec![
            Self::inventory_baseline().boxed(),
            Self::reports_baseline().boxed(),
        ]
    }
}

impl ModuleDescriptor for StaticModule {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn author(&self) -> &str {
        &self.author
    }

    fn requires(&self) -> Vec<String> {
        self.requires.clone()
    }

    fn permissions(&self) -> Vec<String> {
        self.permissions.clone()
    }

    fn dashboard_items(&self) -> HookResult<Vec<DashboardItem>> {
        Ok(self.dashboard.clone())
    }

    fn navigation_items(&self) -> HookResult<Vec<NavigationItem>> {
        Ok(self.navigation.clone())
    }

    fn migrations(&self) -> Vec<ModuleMigration> {
        self.steps
            .iter()
            .map(|step| {
                ModuleMigration::sql(step.version.clone(), step.description.clone(), step.sql)
            })
            .collect()
    }

    fn config_schema(&self) -> Option<ConfigSchema> {
        self.schema.clone()
    }
}
