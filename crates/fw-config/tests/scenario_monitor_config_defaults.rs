//! Typed view: defaults, validation and derived values.

use fw_config::{load_layered_yaml_from_strings, MonitorConfig};
use fw_reconcile::FeedType;

#[test]
fn empty_config_takes_every_default() {
    let loaded = load_layered_yaml_from_strings(&[""]).unwrap();
    let cfg = loaded.monitor().unwrap();

    assert_eq!(cfg, MonitorConfig::default());
    assert_eq!(cfg.remote.port, 22);
    assert_eq!(cfg.connect_timeout().as_secs(), 10);
    assert_eq!(cfg.delay_policy().threshold, chrono::Duration::minutes(10));
    assert_eq!(cfg.pass_interval().as_secs(), 60);
    assert_eq!(cfg.daemon_addr().unwrap().to_string(), "127.0.0.1:3000");
    assert_eq!(cfg.base_path(), None);
    assert!(cfg.remote_host().is_err());

    let feeds = cfg.feed_schedules().unwrap();
    let summary: Vec<(FeedType, u32)> = feeds
        .iter()
        .map(|f| (f.feed_type().clone(), f.interval_hours()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (FeedType::Metar, 1),
            (FeedType::Synop, 3),
            (FeedType::Buoy, 1),
            (FeedType::Ship, 1),
        ]
    );
}

#[test]
fn default_regeneration_fires_at_midnight_utc() {
    use chrono::{TimeZone, Timelike, Utc};

    let cfg = MonitorConfig::default();
    let schedule = cfg.regenerate_schedule().unwrap();
    let after = Utc.with_ymd_and_hms(2024, 1, 1, 13, 45, 0).unwrap();
    let next = schedule.after(&after).next().unwrap();
    assert_eq!(next, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
    assert_eq!(next.hour(), 0);
}

#[test]
fn blank_base_path_is_treated_as_unset() {
    let loaded = load_layered_yaml_from_strings(&["remote:\n  base_path: \"   \"\n"]).unwrap();
    assert_eq!(loaded.monitor().unwrap().base_path(), None);
}

#[test]
fn feed_names_are_normalised_and_custom_feeds_allowed() {
    let yaml = r#"
feeds:
  - feed_type: " METAR "
    interval_hours: 1
  - feed_type: "radar"
    interval_hours: 6
"#;
    let cfg = load_layered_yaml_from_strings(&[yaml]).unwrap().monitor().unwrap();
    assert_eq!(
        cfg.feed_types(),
        vec![FeedType::Metar, FeedType::Other("radar".to_string())]
    );
    let radar = &cfg.feed_schedules().unwrap()[1];
    assert_eq!(radar.slot_hours().collect::<Vec<_>>(), vec![0, 6, 12, 18]);
}

#[test]
fn invalid_values_are_rejected() {
    let cases = [
        "feeds:\n  - feed_type: metar\n    interval_hours: 0\n",
        "feeds:\n  - feed_type: metar\n    interval_hours: 25\n",
        "feeds: []\n",
        "feeds:\n  - feed_type: metar\n    interval_hours: 1\n  - feed_type: Metar\n    interval_hours: 2\n",
        "monitor:\n  delay_threshold_minutes: 0\n",
        "monitor:\n  delay_threshold_minutes: 1441\n",
        "monitor:\n  delay_threshold_minutes: 9223372036854775807\n",
        "monitor:\n  pass_interval_secs: 0\n",
        "monitor:\n  regenerate_cron: \"every midnight\"\n",
        "daemon:\n  addr: \"not-an-addr\"\n",
        "remote:\n  port: \"twenty-two\"\n",
        "remote:\n  connect_timeout_secs: 0\n",
    ];
    for yaml in cases {
        let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
        assert!(loaded.monitor().is_err(), "accepted invalid config:\n{yaml}");
    }
}

#[test]
fn delay_threshold_accepts_a_full_day() {
    let loaded = load_layered_yaml_from_strings(&["monitor:\n  delay_threshold_minutes: 1440\n"]).unwrap();
    let cfg = loaded.monitor().unwrap();
    assert_eq!(cfg.delay_policy(), fw_reconcile::DelayPolicy::from_minutes(24 * 60));
}

#[test]
fn delay_policy_on_unvalidated_config_does_not_panic() {
    let mut cfg = MonitorConfig::default();
    cfg.monitor.delay_threshold_minutes = i64::MAX;
    assert!(cfg.validate().is_err());
    assert_eq!(
        cfg.delay_policy(),
        fw_reconcile::DelayPolicy::from_minutes(fw_config::MAX_DELAY_THRESHOLD_MINUTES)
    );
}
