//! UI extension contributions.
//!
//! Items are produced by module providers and never persisted.

use serde::{Deserialize, Serialize};

/// One dashboard tile contributed by a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardItem {
    pub id: String,
    pub title: String,
    /// Higher renders first. Unspecified means `0`.
    #[serde(default)]
    pub priority: i32,
    /// Host-defined widget key the UI maps to a renderer.
    #[serde(default)]
    pub widget: Option<String>,
}

impl DashboardItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            priority: 0,
            widget: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_widget(mut self, widget: impl Into<String>) -> Self {
        self.widget = Some(widget.into());
        self
    }
}

/// One navigation menu entry contributed by a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationItem {
    pub id: String,
    pub label: String,
    pub route: String,
    /// Lower renders first. Unspecified means `0`.
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub icon: Option<String>,
}

impl NavigationItem {
    pub fn new(id: impl Into<String>, label: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            route: route.into(),
            order: 0,
            icon: None,
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

/// Aggregated dashboard slot.
///
/// A module whose provider failed is represented by one `Unavailable` slot
/// instead of its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DashboardEntry {
    Item {
        module_id: String,
        item: DashboardItem,
    },
    Unavailable {
        module_id: String,
        message: String,
    },
}

impl DashboardEntry {
    pub fn module_id(&self) -> &str {
        match self {
            Self::Item { module_id, .. } | Self::Unavailable { module_id, .. } => module_id,
        }
    }

    /// Sort key; placeholders rank like an item with unspecified priority.
    pub fn priority(&self) -> i32 {
        match self {
            Self::Item { item, .. } => item.priority,
            Self::Unavailable { .. } => 0,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Aggregated navigation entry tagged with its contributing module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationEntry {
    pub module_id: String,
    pub item: NavigationItem,
}
