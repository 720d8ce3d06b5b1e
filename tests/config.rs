#[cfg(test)]
mod tests {
    use pacer::libs::config::{Config, InactivityConfig, NetworkPollingConfig, PollingConfig, MIN_POLL_INTERVAL};
    use pacer::libs::error::PacerError;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;
    use test_context::{test_context, TestContext};

    struct ConfigTestContext {
        temp_dir: TempDir,
    }

    impl ConfigTestContext {
        fn write(&self, name: &str, contents: &str) -> std::path::PathBuf {
            let path = self.temp_dir.path().join(name);
            fs::write(&path, contents).unwrap();
            path
        }
    }

    impl TestContext for ConfigTestContext {
        fn setup() -> Self {
            ConfigTestContext {
                temp_dir: tempfile::tempdir().unwrap(),
            }
        }
    }

    #[test]
    fn test_documented_defaults() {
        let config = Config::default();

        assert_eq!(config.idle_or_default().timeout(), Duration::from_secs(60));

        let inactivity = config.inactivity_or_default();
        assert_eq!(inactivity.timeout, 300_000);
        assert_eq!(inactivity.warning_before, 60_000);

        let polling = config.polling_or_default();
        assert_eq!(polling.interval, 5_000);
        assert!(polling.enabled);

        let network = config.network_or_default();
        assert_eq!(network.slow_multiplier, 3);
        assert!(network.pause_offline);

        assert_eq!(config.battery_or_default().low_threshold, 0.15);
        assert!(config.wake_lock_or_default().auto_reacquire);
    }

    #[test_context(ConfigTestContext)]
    #[test]
    fn test_missing_file_yields_defaults(ctx: &mut ConfigTestContext) {
        let config = Config::read(ctx.temp_dir.path().join("absent.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test_context(ConfigTestContext)]
    #[test]
    fn test_partial_file_fills_in_defaults(ctx: &mut ConfigTestContext) {
        let path = ctx.write(
            "pacer.json",
            r#"{
                "inactivity": { "timeout": 900000 },
                "network": { "interval": 10000, "slow_multiplier": 4 }
            }"#,
        );
        let config = Config::read(&path).unwrap();

        let inactivity = config.inactivity_or_default();
        assert_eq!(inactivity.timeout, 900_000);
        assert_eq!(inactivity.warning_before, 60_000);

        let network = config.network_or_default();
        assert_eq!(network.polling.interval, 10_000);
        assert!(network.polling.enabled);
        assert_eq!(network.slow_multiplier, 4);
        assert!(network.pause_offline);

        assert!(config.polling.is_none());
        assert_eq!(config.polling_or_default(), PollingConfig::default());
    }

    #[test_context(ConfigTestContext)]
    #[test]
    fn test_malformed_file_is_reported(ctx: &mut ConfigTestContext) {
        let path = ctx.write("broken.json", "{ \"polling\": ");
        assert!(matches!(Config::read(&path), Err(PacerError::ConfigParse(_))));
    }

    #[test_context(ConfigTestContext)]
    #[test]
    fn test_directory_is_a_read_error(ctx: &mut ConfigTestContext) {
        let result = Config::read(ctx.temp_dir.path());
        assert!(matches!(result, Err(PacerError::ConfigRead { .. })));
    }

    #[test]
    fn test_from_json_and_back() {
        let config = Config::from_json(r#"{ "polling": { "enabled": false } }"#).unwrap();
        let polling = config.polling_or_default();
        assert!(!polling.enabled);
        assert_eq!(polling.interval, 5_000);

        let serialized = serde_json::to_string(&config).unwrap();
        assert!(!serialized.contains("inactivity"));
        assert_eq!(Config::from_json(&serialized).unwrap(), config);
    }

    #[test]
    fn test_warning_window_is_clamped_to_timeout() {
        let config = InactivityConfig {
            timeout: 3_000,
            warning_before: 10_000,
        };
        assert_eq!(config.warning_window(), Duration::from_millis(3_000));
        assert_eq!(config.idle_threshold(), Duration::ZERO);

        let config = InactivityConfig {
            timeout: 10_000,
            warning_before: 5_000,
        };
        assert_eq!(config.idle_threshold(), Duration::from_millis(5_000));
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = PollingConfig { interval: 0, enabled: true };
        assert_eq!(config.interval(), MIN_POLL_INTERVAL);

        let network = NetworkPollingConfig {
            polling: config,
            ..NetworkPollingConfig::default()
        };
        assert_eq!(network.polling.interval(), MIN_POLL_INTERVAL);
    }
}
