//! Process-wide factory installation.
//!
//! Kept in its own test binary so no other test races the global install.

use std::sync::Arc;

use action_log::clients::store::{self, Collection, MemoryStore};
use action_log::config::parse_config;
use action_log::log::{self, sink::MemorySink, Level, LoggerFactory};
use action_log::ActionLogError;

mod common;

#[test]
fn test_install_once_and_share_loggers() {
    let config = parse_config(
        r#"
        [log]
        default_level = "info"
        redact_keys = ["password"]

        [[log.trace_levels]]
        prefix = "action_log::clients"
        level = "debug"
        "#,
    )
    .unwrap();
    let sink = Arc::new(MemorySink::new());
    let factory = log::init(LoggerFactory::from_config(&config.log, sink.clone())).unwrap();

    assert!(Arc::ptr_eq(&log::get_logger("app::jobs"), &factory.get_logger("app::jobs")));
    assert_eq!(log::get_logger("app::jobs").level(), Level::Info);
    assert_eq!(log::get_logger(store::LOGGER_NAME).level(), Level::Debug);

    let second = LoggerFactory::from_config(&config.log, Arc::new(MemorySink::new()));
    assert!(matches!(log::init(second), Err(ActionLogError::FactoryInitialized)));

    // clients built with `new` log through the installed factory
    let accounts = Collection::new("accounts", MemoryStore::new("accounts"), &config.store);
    let record = log::manager()
        .run("signup", || {
            accounts.insert(common::Account::new("7", "ada"))?;
            action_log::log_info!(log::get_logger("app::jobs"), "created, password=hunter2");
            Ok::<_, store::StoreError>(())
        })
        .unwrap();
    assert!(record.is_ok());

    let actions = sink.actions();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].stat(store::DEPENDENCY_KIND).unwrap().count, 1);

    let messages: Vec<String> = sink.logs().into_iter().map(|log| log.message).collect();
    assert!(messages.iter().any(|m| m.starts_with("insert, collection=accounts, id=7")));
    assert!(messages.contains(&"created, password=******".to_string()));
    assert!(!messages.iter().any(|m| m.contains("hunter2")));
}
