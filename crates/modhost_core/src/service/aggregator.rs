//! Extension aggregation over enabled modules.
//!
//! # Responsibility
//! - Collect dashboard and navigation contributions from enabled modules.
//! - Contain provider failures to the module that caused them.
//!
//! # Invariants
//! - Every `refresh()` recomputes from the registry; nothing is cached.
//! - Dashboard entries are non-increasing by priority; navigation entries are
//!   non-decreasing by order; ties keep registration order, then provider order.
//! - A failing dashboard provider yields exactly one `Unavailable` entry; a
//!   failing navigation provider contributes nothing.

use crate::model::extension::{DashboardEntry, NavigationEntry};
use crate::module::boundary::guard;
use crate::module::registry::ModuleRegistry;

/// Result of one aggregation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionSnapshot {
    pub dashboard: Vec<DashboardEntry>,
    pub navigation: Vec<NavigationEntry>,
}

/// Reads UI contributions from a borrowed registry.
pub struct ExtensionAggregator<'r> {
    registry: &'r ModuleRegistry,
}

impl<'r> ExtensionAggregator<'r> {
    pub fn new(registry: &'r ModuleRegistry) -> Self {
        Self { registry }
    }

    /// Invokes every enabled module's providers and orders the results.
    pub fn refresh(&self) -> ExtensionSnapshot {
        let mut snapshot = ExtensionSnapshot::default();

        for entry in self.registry.iter().filter(|entry| entry.is_enabled()) {
            let module_id = entry.id();
            let descriptor = entry.descriptor();

            match guard(module_id, "dashboard_items", || descriptor.dashboard_items()) {
                Ok(items) => snapshot
                    .dashboard
                    .extend(items.into_iter().map(|item| DashboardEntry::Item {
                        module_id: module_id.to_string(),
                        item,
                    })),
                Err(err) => snapshot.dashboard.push(DashboardEntry::Unavailable {
                    module_id: module_id.to_string(),
                    message: err.to_string(),
                }),
            }

            if let Ok(items) = guard(module_id, "navigation_items", || {
                descriptor.navigation_items()
            }) {
                snapshot
                    .navigation
                    .extend(items.into_iter().map(|item| NavigationEntry {
                        module_id: module_id.to_string(),
                        item,
                    }));
            }
        }

        // `sort_by` is stable, which keeps registration order on ties.
        snapshot
            .dashboard
            .sort_by(|left, right| right.priority().cmp(&left.priority()));
        snapshot.navigation.sort_by_key(|entry| entry.item.order);
        snapshot
    }

    pub fn dashboard(&self) -> Vec<DashboardEntry> {
        self.refresh().dashboard
    }

    pub fn navigation(&self) -> Vec<NavigationEntry> {
        self.refresh().navigation
    }
}
