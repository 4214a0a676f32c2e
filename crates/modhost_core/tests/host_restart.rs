mod support;

use modhost_core::{
    ConfigField, ConfigSchema, HostConfig, ModuleConfiguration, ModuleError, ModuleHost,
    SchemaViolation, SettingKind, Settings, StaticModule,
};
use serde_json::json;
use std::path::Path;
use support::{event_log, events, stored_runs, ScriptedModule, Step};

fn open(path: &Path) -> ModuleHost {
    ModuleHost::open(HostConfig::with_db_path(path)).unwrap()
}

fn settings(value: serde_json::Value) -> Settings {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

#[test]
fn enabled_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("modhost.db");
    let log = event_log();

    {
        let mut host = open(&path);
        assert!(host.register(
            ScriptedModule::new("inv", &log)
                .with_migration("1", Step::Succeed)
                .boxed()
        ));
        assert!(host.register(ScriptedModule::new("idle", &log).boxed()));
        assert!(host.enable("inv"));
    }

    let restarted = event_log();
    let mut host = open(&path);
    assert!(host.register(
        ScriptedModule::new("inv", &restarted)
            .with_migration("1", Step::Succeed)
            .boxed()
    ));
    assert!(host.register(ScriptedModule::new("idle", &restarted).boxed()));

    assert!(host.is_enabled("inv"));
    assert!(!host.is_enabled("idle"));
    assert_eq!(
        events(&restarted),
        vec![
            "register:inv".to_string(),
            "enable:inv".to_string(),
            "register:idle".to_string(),
        ]
    );
    assert_eq!(stored_runs(host.connection()), vec!["migrate:inv:1".to_string()]);
}

#[test]
fn resume_applies_migrations_added_by_an_upgrade() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("modhost.db");
    let log = event_log();

    {
        let mut host = open(&path);
        assert!(host.register(
            ScriptedModule::new("inv", &log)
                .with_version("0.9.0")
                .with_migration("1", Step::Succeed)
                .boxed()
        ));
        assert!(host.enable("inv"));
    }

    let upgraded = event_log();
    let mut host = open(&path);
    assert!(host.register(
        ScriptedModule::new("inv", &upgraded)
            .with_version("1.0.0")
            .with_migration("1", Step::Succeed)
            .with_migration("2", Step::Succeed)
            .boxed()
    ));

    assert!(host.is_enabled("inv"));
    assert_eq!(
        events(&upgraded),
        vec![
            "register:inv".to_string(),
            "update:inv:0.9.0->1.0.0".to_string(),
            "migrate:inv:2".to_string(),
            "enable:inv".to_string(),
        ]
    );
    let versions = host
        .migration_history("inv")
        .unwrap()
        .into_iter()
        .map(|record| record.version)
        .collect::<Vec<_>>();
    assert_eq!(versions, vec!["1".to_string(), "2".to_string()]);

    let manifest = host
        .list_manifests()
        .into_iter()
        .find(|manifest| manifest.id == "inv")
        .unwrap();
    assert_eq!(manifest.version, "1.0.0");
    assert!(manifest.is_enabled);
}

#[test]
fn failed_resume_leaves_module_disabled_without_rewriting_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("modhost.db");
    let log = event_log();

    {
        let mut host = open(&path);
        assert!(host.register(ScriptedModule::new("inv", &log).boxed()));
        assert!(host.enable("inv"));
    }

    {
        let mut host = open(&path);
        let mut broken = ScriptedModule::new("inv", &log);
        broken.fail_enable = true;
        assert!(host.register(broken.boxed()));
        assert!(!host.is_enabled("inv"));
    }

    let mut host = open(&path);
    assert!(host.register(ScriptedModule::new("inv", &log).boxed()));
    assert!(host.is_enabled("inv"));
}

#[test]
fn resume_waits_for_required_modules() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("modhost.db");

    {
        let mut host = open(&path);
        for module in StaticModule::baseline() {
            assert!(host.register(module));
        }
        assert!(host.enable("inventory"));
        assert!(host.enable("reports"));
    }

    let mut host = open(&path);
    assert!(host.register(StaticModule::reports_baseline().boxed()));
    assert!(!host.is_enabled("reports"));

    assert!(host.register(StaticModule::inventory_baseline().boxed()));
    assert!(host.is_enabled("inventory"));
    assert!(host.is_enabled("reports"));
}

#[test]
fn configuration_round_trips_with_schema_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("modhost.db");

    {
        let mut host = open(&path);
        assert!(host.register(StaticModule::inventory_baseline().boxed()));

        let defaults = host.get_configuration("inventory").unwrap();
        assert!(!defaults.is_persisted());
        assert_eq!(defaults.settings.get("currency"), Some(&json!("USD")));
        assert_eq!(defaults.settings.get("low_stock_threshold"), Some(&json!(5)));

        let saved = host
            .save_configuration(&ModuleConfiguration::new(
                "inventory",
                settings(json!({ "currency": "EUR" })),
            ))
            .unwrap();
        assert!(saved.is_persisted());
    }

    let mut host = open(&path);
    assert!(host.register(StaticModule::inventory_baseline().boxed()));
    let stored = host.get_configuration("inventory").unwrap();
    assert!(stored.is_persisted());
    assert_eq!(stored.settings.get("currency"), Some(&json!("EUR")));
    assert_eq!(stored.settings.get("low_stock_threshold"), Some(&json!(5)));
}

#[test]
fn configuration_violating_schema_is_rejected() {
    let log = event_log();
    let mut host = ModuleHost::open(HostConfig::in_memory()).unwrap();
    let schema = ConfigSchema::new()
        .field(ConfigField::required("endpoint", SettingKind::String))
        .field(ConfigField::optional("retries", SettingKind::Integer));
    assert!(host.register(
        ScriptedModule::new("sync", &log)
            .with_schema(schema)
            .boxed()
    ));

    let unknown = host
        .save_configuration(&ModuleConfiguration::new(
            "sync",
            settings(json!({ "endpoint": "https://x", "color": "red" })),
        ))
        .unwrap_err();
    assert!(matches!(
        unknown,
        ModuleError::InvalidConfiguration {
            violation: SchemaViolation::UnknownKey(ref key),
            ..
        } if key == "color"
    ));

    let wrong_type = host
        .save_configuration(&ModuleConfiguration::new(
            "sync",
            settings(json!({ "endpoint": "https://x", "retries": "three" })),
        ))
        .unwrap_err();
    assert_eq!(wrong_type.code(), "invalid_configuration");

    let missing = host
        .save_configuration(&ModuleConfiguration::new("sync", settings(json!({}))))
        .unwrap_err();
    assert_eq!(missing.code(), "invalid_configuration");

    assert!(!host.get_configuration("sync").unwrap().is_persisted());
}

#[test]
fn configuration_of_unregistered_module_cannot_be_saved() {
    let mut host = ModuleHost::open(HostConfig::in_memory()).unwrap();

    let empty = host.get_configuration("ghost").unwrap();
    assert!(empty.settings.is_empty());

    let err = host
        .save_configuration(&ModuleConfiguration::empty("ghost"))
        .unwrap_err();
    assert!(matches!(err, ModuleError::NotFound(_)));
}
