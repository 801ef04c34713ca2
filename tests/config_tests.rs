use reel::config::{Configuration, DeleteMode, LaunchOptions, Settings};
use reel::geometry::Geometry;
use std::path::PathBuf;
use std::time::Duration;

#[test]
fn parse_kebab_case_config() {
    let yaml = r#"
delay: 5s
min-delay: 500ms
delay-step: 250ms
geometry: "1024x768+20+40"
delete-mode: remove
deletion-log: null
watch: true
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.delay, Duration::from_secs(5));
    assert_eq!(cfg.min_delay, Duration::from_millis(500));
    assert_eq!(cfg.delay_step, Duration::from_millis(250));
    assert_eq!(
        cfg.geometry,
        Geometry {
            width: 1024,
            height: 768,
            x: 20,
            y: 40
        }
    );
    assert_eq!(cfg.delete_mode, DeleteMode::Remove);
    assert!(cfg.deletion_log.is_none());
    assert!(cfg.watch);
}

#[test]
fn empty_config_uses_defaults() {
    let cfg: Configuration = serde_yaml::from_str("{}").unwrap();
    let cfg = cfg.validated().unwrap();
    assert_eq!(cfg.delay, Duration::from_secs(10));
    assert_eq!(cfg.min_delay, Duration::from_secs(1));
    assert_eq!(cfg.geometry, Geometry::default());
    assert_eq!(cfg.delete_mode, DeleteMode::Trash);
    assert_eq!(cfg.deletion_log, Some(PathBuf::from("deleted.txt")));
    assert!(cfg.extensions.iter().any(|e| e == "png"));
}

#[test]
fn malformed_geometry_in_config_falls_back() {
    let cfg: Configuration = serde_yaml::from_str("geometry: bogus").unwrap();
    assert_eq!(cfg.geometry, Geometry::default());
}

#[test]
fn zero_min_delay_is_rejected() {
    let cfg: Configuration = serde_yaml::from_str("min-delay: 0s").unwrap();
    assert!(cfg.validated().is_err());
}

#[test]
fn extensions_are_normalized() {
    let yaml = r#"
extensions: [".PNG", " jpg ", ""]
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let cfg = cfg.validated().unwrap();
    assert_eq!(cfg.extensions, ["png", "jpg"]);
}

#[test]
fn delay_below_minimum_is_raised() {
    let launch = LaunchOptions {
        delay_secs: Some(0.2),
        ..LaunchOptions::default()
    };
    let settings = Settings::resolve(Configuration::default(), launch).unwrap();
    assert_eq!(settings.delay, Duration::from_secs(1));
}

#[test]
fn launch_flags_map_onto_settings() {
    let launch = LaunchOptions {
        paths: vec![PathBuf::from("/photos")],
        regex: Some("cat".into()),
        recurse: true,
        random: true,
        fullscreen: true,
        zoomed: true,
        auto: true,
        delay_secs: Some(2.5),
        geometry: Some("910x930+10+0".into()),
        watch: false,
    };
    let settings = Settings::resolve(Configuration::default(), launch).unwrap();
    assert_eq!(settings.scan.roots, [PathBuf::from("/photos")]);
    assert!(settings.scan.recursive);
    let filter = settings.scan.filter.as_ref().unwrap();
    assert!(filter.is_match("/photos/CAT.png"));
    assert!(settings.shuffled);
    assert!(!settings.paused);
    assert!(settings.fullscreen && settings.zoomed);
    assert_eq!(settings.delay, Duration::from_millis(2500));
    assert_eq!(settings.geometry.to_string(), "910x930+10+0");
}

#[test]
fn defaults_start_paused_in_current_directory() {
    let settings = Settings::resolve(Configuration::default(), LaunchOptions::default()).unwrap();
    assert_eq!(settings.scan.roots, [PathBuf::from(".")]);
    assert!(settings.scan.filter.is_none());
    assert!(settings.paused);
    assert!(!settings.shuffled);
    assert_eq!(settings.geometry, Geometry::default());
}

#[test]
fn bogus_cli_geometry_falls_back() {
    let launch = LaunchOptions {
        geometry: Some("bogus".into()),
        ..LaunchOptions::default()
    };
    let settings = Settings::resolve(Configuration::default(), launch).unwrap();
    assert_eq!(settings.geometry.to_string(), "800x600+0+0");
}

#[test]
fn invalid_regex_fails_resolution() {
    let launch = LaunchOptions {
        regex: Some("[".into()),
        ..LaunchOptions::default()
    };
    assert!(Settings::resolve(Configuration::default(), launch).is_err());
}

#[test]
fn negative_delay_is_rejected() {
    let launch = LaunchOptions {
        delay_secs: Some(-3.0),
        ..LaunchOptions::default()
    };
    assert!(Settings::resolve(Configuration::default(), launch).is_err());
}
