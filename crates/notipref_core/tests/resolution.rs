use notipref_core::db::{open_db, open_db_in_memory};
use notipref_core::{
    Catalog, ChannelConfig, DefaultPreference, GroupConfig, InMemoryPreferenceCache,
    NotificationConfig, PreferenceCache, PreferenceService, Settings, SqlitePreferenceRepository,
    StaticCatalog, UserId, UNGROUPED,
};
use rusqlite::Connection;
use std::num::NonZeroUsize;
use std::sync::Arc;

fn catalog() -> Catalog {
    Catalog::new()
        .with_channel("mail", ChannelConfig::new("Email"))
        .with_channel("database", ChannelConfig::new("In-app"))
        .with_channel("sms", ChannelConfig::new("SMS").disabled())
        .with_group(
            "marketing",
            GroupConfig::default().with_default_preference(DefaultPreference::OptOut),
        )
        .with_notification(
            "billing.invoice_paid",
            NotificationConfig::default().in_group("billing"),
        )
        .with_notification(
            "security.login",
            NotificationConfig::default()
                .in_group("security")
                .forcing(["mail"]),
        )
        .with_notification(
            "marketing.digest",
            NotificationConfig::default().in_group("marketing"),
        )
        .with_notification(
            "marketing.promo",
            NotificationConfig::default()
                .in_group("marketing")
                .defaulting_to(["database"]),
        )
}

fn new_cache() -> Arc<InMemoryPreferenceCache> {
    Arc::new(InMemoryPreferenceCache::new(NonZeroUsize::new(64).unwrap()))
}

fn service_with(
    conn: &Connection,
    cache: Arc<InMemoryPreferenceCache>,
    catalog: Catalog,
) -> PreferenceService<SqlitePreferenceRepository<'_>> {
    let repo = SqlitePreferenceRepository::try_new(conn).unwrap();
    PreferenceService::new(repo, cache, Arc::new(StaticCatalog::new(catalog)))
}

fn insert_raw(
    conn: &Connection,
    user: &str,
    notification_type: &str,
    channel: &str,
    enabled: bool,
) {
    conn.execute(
        "INSERT INTO notification_preferences (user_id, notification_type, channel, enabled)
         VALUES (?1, ?2, ?3, ?4);",
        rusqlite::params![user, notification_type, channel, i64::from(enabled)],
    )
    .unwrap();
}

#[test]
fn unknown_type_and_channel_use_global_default() {
    let conn = open_db_in_memory().unwrap();
    let service = service_with(&conn, new_cache(), catalog());
    let user = UserId::from(1_i64);

    assert!(service
        .is_channel_enabled(&user, "never.declared", "pigeon")
        .unwrap());

    let opt_out = catalog().with_default_preference(DefaultPreference::OptOut);
    let service = service_with(&conn, new_cache(), opt_out);
    assert!(!service
        .is_channel_enabled(&user, "never.declared", "pigeon")
        .unwrap());
}

#[test]
fn default_cascade_applies_without_records() {
    let conn = open_db_in_memory().unwrap();
    let service = service_with(&conn, new_cache(), catalog());
    let user = UserId::from(1_i64);

    assert!(service
        .is_channel_enabled(&user, "billing.invoice_paid", "mail")
        .unwrap());
    assert!(!service
        .is_channel_enabled(&user, "marketing.digest", "mail")
        .unwrap());
    assert!(service
        .is_channel_enabled(&user, "marketing.promo", "database")
        .unwrap());
    assert!(!service
        .is_channel_enabled(&user, "marketing.promo", "mail")
        .unwrap());
}

#[test]
fn explicit_record_overrides_default() {
    let conn = open_db_in_memory().unwrap();
    insert_raw(&conn, "1", "marketing.digest", "mail", true);
    insert_raw(&conn, "1", "billing.invoice_paid", "mail", false);
    let service = service_with(&conn, new_cache(), catalog());
    let user = UserId::from(1_i64);

    assert!(service
        .is_channel_enabled(&user, "marketing.digest", "mail")
        .unwrap());
    assert!(!service
        .is_channel_enabled(&user, "billing.invoice_paid", "mail")
        .unwrap());
}

#[test]
fn forced_channel_wins_over_stored_record_and_skips_cache() {
    let conn = open_db_in_memory().unwrap();
    insert_raw(&conn, "1", "security.login", "mail", false);
    let cache = new_cache();
    let service = service_with(&conn, Arc::clone(&cache), catalog());

    assert!(service
        .is_channel_enabled(&UserId::from(1_i64), "security.login", "mail")
        .unwrap());
    assert!(cache.is_empty());
}

#[test]
fn resolved_value_is_cached() {
    let conn = open_db_in_memory().unwrap();
    let cache = new_cache();
    let service = service_with(&conn, Arc::clone(&cache), catalog());
    let user = UserId::from(1_i64);

    assert!(service
        .is_channel_enabled(&user, "billing.invoice_paid", "mail")
        .unwrap());
    assert_eq!(cache.len(), 1);

    // A write that bypasses the service is invisible until the entry is dropped.
    insert_raw(&conn, "1", "billing.invoice_paid", "mail", false);
    assert!(service
        .is_channel_enabled(&user, "billing.invoice_paid", "mail")
        .unwrap());

    service.clear_user_cache(&user).unwrap();
    assert!(!service
        .is_channel_enabled(&user, "billing.invoice_paid", "mail")
        .unwrap());
}

#[test]
fn set_then_read_is_coherent() {
    let conn = open_db_in_memory().unwrap();
    let service = service_with(&conn, new_cache(), catalog());
    let user = UserId::from(1_i64);

    assert!(service
        .is_channel_enabled(&user, "billing.invoice_paid", "database")
        .unwrap());
    service
        .set_preference(&user, "billing.invoice_paid", "database", false)
        .unwrap();
    assert!(!service
        .is_channel_enabled(&user, "billing.invoice_paid", "database")
        .unwrap());
    service
        .set_preference(&user, "billing.invoice_paid", "database", true)
        .unwrap();
    assert!(service
        .is_channel_enabled(&user, "billing.invoice_paid", "database")
        .unwrap());
}

#[test]
fn filter_channels_keeps_order_forced_and_duplicates() {
    let conn = open_db_in_memory().unwrap();
    insert_raw(&conn, "1", "security.login", "database", false);
    let service = service_with(&conn, new_cache(), catalog());

    let allowed = service
        .filter_channels(
            &UserId::from(1_i64),
            "security.login",
            &["database", "slack", "mail", "slack"],
        )
        .unwrap();
    assert_eq!(allowed, vec!["slack", "mail", "slack"]);
}

#[test]
fn filter_channels_of_empty_list_is_empty() {
    let conn = open_db_in_memory().unwrap();
    let service = service_with(&conn, new_cache(), catalog());

    let allowed = service
        .filter_channels::<&str>(&UserId::from(1_i64), "billing.invoice_paid", &[])
        .unwrap();
    assert!(allowed.is_empty());
}

#[test]
fn get_preferences_for_user_lists_explicit_records_only() {
    let conn = open_db_in_memory().unwrap();
    let service = service_with(&conn, new_cache(), catalog());
    let user = UserId::from(1_i64);
    assert!(service.get_preferences_for_user(&user).unwrap().is_empty());

    service
        .set_preference(&user, "marketing.digest", "mail", true)
        .unwrap();

    let entries = service.get_preferences_for_user(&user).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].notification_type, "marketing.digest");
    assert_eq!(entries[0].channel, "mail");
    assert!(entries[0].enabled);
}

#[test]
fn users_are_isolated() {
    let conn = open_db_in_memory().unwrap();
    let service = service_with(&conn, new_cache(), catalog());

    service
        .for_user(1_i64)
        .set("billing.invoice_paid", "mail", false)
        .unwrap();

    assert!(!service
        .for_user(1_i64)
        .is_channel_enabled("billing.invoice_paid", "mail")
        .unwrap());
    assert!(service
        .for_user(2_i64)
        .is_channel_enabled("billing.invoice_paid", "mail")
        .unwrap());
}

#[test]
fn user_handle_normalizes_numeric_ids() {
    let conn = open_db_in_memory().unwrap();
    let service = service_with(&conn, new_cache(), catalog());

    let handle = service.for_user(42_i64);
    assert_eq!(handle.user_id(), &UserId::from("42"));

    handle.set("billing.invoice_paid", "mail", false).unwrap();
    assert!(!service
        .is_channel_enabled(&UserId::from("42"), "billing.invoice_paid", "mail")
        .unwrap());
}

#[test]
fn notification_without_group_skips_ungrouped_group_policy() {
    let conn = open_db_in_memory().unwrap();
    let catalog = catalog()
        .with_group(
            UNGROUPED,
            GroupConfig::default().with_default_preference(DefaultPreference::OptOut),
        )
        .with_notification("system.alert", NotificationConfig::default());
    let service = service_with(&conn, new_cache(), catalog);

    assert!(service
        .is_channel_enabled(&UserId::from(1_i64), "system.alert", "mail")
        .unwrap());
}

#[test]
fn zero_ttl_from_settings_disables_caching() {
    let conn = open_db_in_memory().unwrap();
    let settings = Settings {
        cache_ttl_secs: 0,
        ..Settings::default()
    };
    let cache = Arc::new(InMemoryPreferenceCache::from_settings(&settings));
    let service = service_with(&conn, cache, catalog()).with_settings(&settings);
    let user = UserId::from(1_i64);

    assert!(service
        .is_channel_enabled(&user, "billing.invoice_paid", "mail")
        .unwrap());

    // Bypasses the service; visible only because nothing stayed cached.
    insert_raw(&conn, "1", "billing.invoice_paid", "mail", false);
    assert!(!service
        .is_channel_enabled(&user, "billing.invoice_paid", "mail")
        .unwrap());
}

#[test]
fn configured_ttl_keeps_entries_cached() {
    let conn = open_db_in_memory().unwrap();
    let settings = Settings {
        cache_ttl_secs: 3_600,
        ..Settings::default()
    };
    let cache = Arc::new(InMemoryPreferenceCache::from_settings(&settings));
    let service = service_with(&conn, Arc::clone(&cache), catalog()).with_settings(&settings);
    let user = UserId::from(1_i64);

    assert!(service
        .is_channel_enabled(&user, "billing.invoice_paid", "mail")
        .unwrap());
    insert_raw(&conn, "1", "billing.invoice_paid", "mail", false);
    assert!(service
        .is_channel_enabled(&user, "billing.invoice_paid", "mail")
        .unwrap());
    assert_eq!(cache.len(), 1);
}

#[test]
fn write_on_one_connection_invalidates_shared_cache() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notipref.db");
    let cache = new_cache();
    let catalog = Arc::new(StaticCatalog::new(catalog()));
    let user = UserId::from(9_i64);

    let reader_conn = open_db(&path).unwrap();
    let reader = PreferenceService::new(
        SqlitePreferenceRepository::try_new(&reader_conn).unwrap(),
        Arc::clone(&cache) as Arc<dyn PreferenceCache>,
        catalog.clone(),
    );
    assert!(reader
        .is_channel_enabled(&user, "billing.invoice_paid", "mail")
        .unwrap());

    std::thread::scope(|scope| {
        for channel in ["mail", "database"] {
            let path = path.clone();
            let cache = Arc::clone(&cache);
            let catalog = catalog.clone();
            let user = user.clone();
            scope.spawn(move || {
                let conn = open_db(&path).unwrap();
                let writer = PreferenceService::new(
                    SqlitePreferenceRepository::try_new(&conn).unwrap(),
                    cache,
                    catalog,
                );
                writer
                    .set_preference(&user, "billing.invoice_paid", channel, false)
                    .unwrap();
            });
        }

        // Reads another tuple of the same user while the writes are running.
        let path = path.clone();
        let cache = Arc::clone(&cache);
        let catalog = catalog.clone();
        let user = user.clone();
        scope.spawn(move || {
            let conn = open_db(&path).unwrap();
            let concurrent_reader = PreferenceService::new(
                SqlitePreferenceRepository::try_new(&conn).unwrap(),
                cache,
                catalog,
            );
            for _ in 0..50 {
                assert!(!concurrent_reader
                    .is_channel_enabled(&user, "marketing.digest", "mail")
                    .unwrap());
                assert!(concurrent_reader
                    .is_channel_enabled(&user, "marketing.promo", "database")
                    .unwrap());
            }
        });
    });

    assert!(!reader
        .is_channel_enabled(&user, "billing.invoice_paid", "mail")
        .unwrap());
    assert!(!reader
        .is_channel_enabled(&user, "billing.invoice_paid", "database")
        .unwrap());
    assert!(!reader
        .is_channel_enabled(&user, "marketing.digest", "mail")
        .unwrap());
}
