//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - Contract snapshots
//! - Config file -> engine wiring
//! - Several consumers sharing one simulated table

#[cfg(test)]
mod contract_tests {
    use contracts::{ChangeEvent, ConnectionStatus, Row};

    #[test]
    fn test_resolve_is_deterministic() {
        assert_eq!(
            config_loader::resolve("production"),
            config_loader::resolve("production")
        );
        assert_eq!(
            config_loader::resolve("PROD"),
            config_loader::resolve("production")
        );
    }

    #[test]
    fn test_change_event_shape() {
        let ts = chrono::Utc::now();
        let json = serde_json::to_value(ChangeEvent::poll(ts, vec![Row::new(1u64, ts)])).unwrap();

        assert_eq!(json["event_type"], "poll_update");
        assert_eq!(json["source"], "poll");
        assert_eq!(json["payload"]["kind"], "snapshot");
        assert_eq!(json["payload"]["data"][0]["id"], "1");
    }

    #[test]
    fn test_status_shape() {
        let json = serde_json::to_value(ConnectionStatus::default()).unwrap();
        assert_eq!(json["connection_type"], "disabled");
        assert_eq!(json["retry_count"], 0);
        assert!(json["last_update"].is_null());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use adapters::{
        AdminRefresh, AdminSync, ConnectionBadge, ConsumerAdapter, LocationsUpdate, LocatorSync,
        RefreshReason, SyncSource,
    };
    use chrono::{TimeZone, Utc};
    use config_loader::{ConfigFormat, ConfigLoader, RuntimeProbe};
    use contracts::{PushStatus, Row, SyncConfig};
    use sync_engine::{EnginePhase, SyncEngineBuilder};
    use transport::MemoryTable;

    fn seeded() -> MemoryTable {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let table = MemoryTable::new("locations");
        for id in 1..=3u64 {
            table.upsert(Row::new(id, t0).with_name(format!("Location {id}")));
        }
        table
    }

    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    fn admin(
        table: &MemoryTable,
        config: &SyncConfig,
    ) -> (AdminSync<MemoryTable>, Arc<Mutex<Vec<AdminRefresh>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let source =
            SyncSource::new(table.clone(), "locations").with_channel(Arc::new(table.channel()));
        let adapter = AdminSync::new(source, config, move |r| sink.lock().unwrap().push(r));
        (adapter, seen)
    }

    fn locator(
        table: &MemoryTable,
        config: &SyncConfig,
    ) -> (LocatorSync<MemoryTable>, Arc<Mutex<Vec<LocationsUpdate>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let source =
            SyncSource::new(table.clone(), "locations").with_channel(Arc::new(table.channel()));
        let adapter = LocatorSync::new(source, config, move |u| sink.lock().unwrap().push(u));
        (adapter, seen)
    }

    /// Config file -> resolve -> engine cadence
    #[tokio::test(start_paused = true)]
    async fn test_override_file_drives_poll_cadence() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(
            br#"
[base]
websocket_enabled = false

[environments.qa]
polling_interval_ms = 2000
debounce_window_ms = 100
"#,
        )
        .unwrap();

        let config = ConfigLoader::load_from_path(file.path())
            .unwrap()
            .resolve("qa");
        assert!(!config.push_allowed());

        let table = seeded();
        let engine = SyncEngineBuilder::new("qa", table.clone(), "locations")
            .config(config)
            .channel(Arc::new(table.channel()))
            .build();

        engine.start();
        settle().await;
        tokio::time::sleep(Duration::from_millis(6_500)).await;

        // t = 0, 2, 4, 6
        assert_eq!(table.query_count(), 4);
        assert_eq!(table.channel().listen_count(), 0);
    }

    /// Edge proxy detection keeps a consumer off the push channel
    #[tokio::test(start_paused = true)]
    async fn test_edge_proxy_forces_polling() {
        let probe = RuntimeProbe {
            hostname: Some("stores.pages.dev".into()),
            cookie_names: vec![],
        };
        let config = config_loader::resolve("test")
            .with_force_polling(config_loader::force_polling_from(false, &probe));

        let table = seeded();
        let (locator, seen) = locator(&table, &config);
        locator.start();
        settle().await;

        assert_eq!(table.channel().listen_count(), 0);
        assert_eq!(locator.badge(), ConnectionBadge::Polling);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].locations.as_ref().map(Vec::len), Some(3));
    }

    /// Two consumers on one table stay independent
    #[tokio::test(start_paused = true)]
    async fn test_consumers_are_independent() {
        let table = seeded();
        let base = ConfigLoader::load_from_str(
            "[environments.test]\npolling_interval_ms = 1000\n",
            ConfigFormat::Toml,
        )
        .unwrap()
        .resolve("test");

        let (admin, admin_seen) = admin(&table, &base.clone().with_force_polling(true));
        let (locator, locator_seen) = locator(&table, &base);

        admin.start();
        locator.start();
        settle().await;
        assert_eq!(admin.badge(), ConnectionBadge::Polling);
        assert_eq!(locator.badge(), ConnectionBadge::Live);

        table.upsert(Row::new(4u64, Utc::now()).with_name("Airport"));
        settle().await;
        assert_eq!(locator_seen.lock().unwrap().len(), 1);

        // Admin polls every 15s (preset)
        tokio::time::sleep(Duration::from_millis(15_500)).await;
        let reasons: Vec<RefreshReason> =
            admin_seen.lock().unwrap().iter().map(|r| r.reason).collect();
        assert_eq!(reasons, vec![RefreshReason::Scheduled, RefreshReason::Scheduled]);

        // Stopping one consumer leaves the other running
        admin.stop();
        table.upsert(Row::new(5u64, Utc::now()));
        settle().await;
        assert_eq!(locator_seen.lock().unwrap().len(), 2);
        assert_eq!(admin_seen.lock().unwrap().len(), 2);
        assert_eq!(locator.badge(), ConnectionBadge::Live);
    }

    /// Push breaks mid-session, consumer keeps working, retry restores it
    #[tokio::test(start_paused = true)]
    async fn test_fallback_then_retry() {
        let table = seeded();
        let channel = table.channel();
        let (locator, seen) = locator(&table, &config_loader::resolve("test"));

        locator.start();
        settle().await;
        assert_eq!(locator.badge(), ConnectionBadge::Live);

        channel.emit_status(PushStatus::TimedOut);
        settle().await;
        assert_eq!(locator.badge(), ConnectionBadge::Polling);
        assert_eq!(locator.engine().phase(), EnginePhase::PollingActive);
        assert_eq!(locator.status().retry_count, 1);
        // The fallback poll hands over a snapshot
        assert!(seen.lock().unwrap().iter().any(|u| !u.refetch_required));

        // No automatic reconnect
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(channel.listen_count(), 1);

        locator.retry();
        settle().await;
        assert_eq!(locator.badge(), ConnectionBadge::Live);
        assert_eq!(channel.listen_count(), 2);
    }

    /// Nothing reaches any consumer after stop
    #[tokio::test(start_paused = true)]
    async fn test_stop_is_quiet() {
        let table = seeded();
        let config = config_loader::resolve("test");
        let (admin, admin_seen) = admin(&table, &config.clone().with_force_polling(true));
        let (locator, locator_seen) = locator(&table, &config);

        admin.start();
        locator.start();
        settle().await;
        admin.stop();
        locator.stop();

        let before = (admin_seen.lock().unwrap().len(), locator_seen.lock().unwrap().len());
        let queries = table.query_count();

        table.upsert(Row::new(9u64, Utc::now()));
        tokio::time::sleep(Duration::from_secs(30)).await;

        let after = (admin_seen.lock().unwrap().len(), locator_seen.lock().unwrap().len());
        assert_eq!(before, after);
        assert_eq!(table.query_count(), queries);
        assert_eq!(table.channel().listener_count(), 0);
        assert_eq!(admin.badge(), ConnectionBadge::Offline { can_retry: true });
    }

    /// Manual refresh debounce across the adapter surface
    #[tokio::test(start_paused = true)]
    async fn test_manual_refresh_debounce() {
        let table = seeded();
        let config = config_loader::resolve("production");
        let (admin, seen) = admin(&table, &config);

        assert!(admin.force_refresh().is_applied());
        assert!(!admin.force_refresh().is_applied());
        tokio::time::sleep(config.debounce_window).await;
        assert!(admin.force_refresh().is_applied());

        let manual = seen
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.reason == RefreshReason::Manual)
            .count();
        assert_eq!(manual, 2);
    }
}
