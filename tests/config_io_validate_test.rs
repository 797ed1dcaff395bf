use chrono::NaiveDate;
use metron::config::Config;
use std::fs;

fn populated() -> Config {
    let mut cfg = Config::default();
    cfg.api.client_id = "client".to_string();
    cfg.api.client_secret = "secret".to_string();
    cfg.meter.ean = "859182400100366666".to_string();
    cfg
}

#[test]
fn save_and_load_yaml_roundtrip() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("config.yaml");

    let mut cfg = populated();
    cfg.meter.start_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    cfg.poll_interval_secs = 1800;

    cfg.save_to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.meter.ean, "859182400100366666");
    assert_eq!(
        loaded.meter.start_date,
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    );
    assert_eq!(loaded.poll_interval_secs, 1800);
}

#[test]
fn config_validation_errors() {
    // Missing credentials
    let mut cfg = populated();
    cfg.api.client_id.clear();
    assert!(cfg.validate().is_err());

    let mut cfg = populated();
    cfg.api.client_secret.clear();
    assert!(cfg.validate().is_err());

    // Missing metering point
    let mut cfg = populated();
    cfg.meter.ean.clear();
    assert!(cfg.validate().is_err());

    // Poll interval zero
    let mut cfg = populated();
    cfg.poll_interval_secs = 0;
    assert!(cfg.validate().is_err());

    // Web port zero
    let mut cfg = populated();
    cfg.web.port = 0;
    assert!(cfg.validate().is_err());

    assert!(populated().validate().is_ok());
}

#[test]
fn start_date_accepts_plain_iso_date() {
    let yaml = r#"
api:
  client_id: client
  client_secret: secret
  token_url: https://idm.distribuce24.cz
  data_url: https://data.distribuce24.cz/rest
  timeout_secs: 30
meter:
  ean: "859182400100366666"
  start_date: 2024-02-01
logging:
  level: INFO
  file: /tmp/metron.log
  backup_count: 3
  json_format: false
web:
  host: 127.0.0.1
  port: 8088
poll_interval_secs: 3600
"#;
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), yaml).unwrap();

    let cfg = Config::from_file(tmp.path()).unwrap();
    assert_eq!(
        cfg.meter.start_date,
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
    );
    assert!(cfg.validate().is_ok());
}

#[test]
fn from_file_with_invalid_yaml_fails() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"bad: [unclosed").unwrap();
    let err = Config::from_file(tmp.path()).unwrap_err();
    let msg = format!("{}", err);
    assert!(msg.contains("Serialization error"));
}
