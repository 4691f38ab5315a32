use kiosk_slideshow::config::{CanvasSize, Configuration};
use kiosk_slideshow::schedule::AutoSchedule;
use std::path::PathBuf;
use std::time::Duration;

#[test]
fn defaults_match_kiosk_setup() {
    let cfg: Configuration = serde_yaml::from_str("{}").unwrap();
    let cfg = cfg.validated().unwrap();
    assert_eq!(cfg.photo_library_path, PathBuf::from("media"));
    assert_eq!(cfg.extension, "jpg");
    assert_eq!(cfg.display_duration, Duration::from_secs(10));
    assert_eq!(cfg.transition_duration, Duration::from_secs(1));
    assert_eq!(cfg.poll_interval, Duration::from_millis(100));
    assert_eq!(cfg.frame_rate_cap, 60);
    assert_eq!(
        cfg.canvas,
        CanvasSize {
            width: 720,
            height: 720
        }
    );
    assert_eq!(cfg.target_image_size(), 720);
    assert!(cfg.autostart);
    assert!(cfg.schedule.is_none());
}

#[test]
fn parse_kebab_case_config() {
    let yaml = r#"
photo-library-path: "/srv/photos"
extension: ".JPG"
display-duration: 30s
transition-duration: 750ms
poll-interval: 50ms
frame-rate-cap: 30
canvas:
  width: 1024
  height: 600
background: [10, 20, 30]
autostart: false
watch-library: false
snapshot-path: /tmp/frame.png
schedule:
  start-hour: 8
  stop-hour: 20
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let cfg = cfg.validated().unwrap();
    assert_eq!(cfg.photo_library_path, PathBuf::from("/srv/photos"));
    assert_eq!(cfg.extension, "jpg");
    assert_eq!(cfg.display_duration, Duration::from_secs(30));
    assert_eq!(cfg.transition_duration, Duration::from_millis(750));
    assert_eq!(cfg.target_image_size(), 600);
    assert_eq!(cfg.background, [10, 20, 30]);
    assert!(!cfg.autostart);
    assert!(!cfg.watch_library);
    assert_eq!(cfg.snapshot_path, Some(PathBuf::from("/tmp/frame.png")));
    assert_eq!(
        cfg.schedule,
        Some(AutoSchedule {
            start_hour: 8,
            stop_hour: 20
        })
    );

    let playback = cfg.playback();
    assert_eq!(playback.image_size, 600);
    assert_eq!(playback.transition.frame_rate_cap, 30);
    assert_eq!(playback.transition.duration, Duration::from_millis(750));
}

#[test]
fn explicit_image_size_wins() {
    let cfg: Configuration = serde_yaml::from_str("image-size: 512").unwrap();
    assert_eq!(cfg.validated().unwrap().target_image_size(), 512);
}

#[test]
fn schedule_hours_default_individually() {
    let cfg: Configuration = serde_yaml::from_str("schedule:\n  stop-hour: 23\n").unwrap();
    assert_eq!(
        cfg.schedule,
        Some(AutoSchedule {
            start_hour: 7,
            stop_hour: 23
        })
    );
}

#[test]
fn rejects_zero_durations() {
    let cfg: Configuration = serde_yaml::from_str("display-duration: 0s").unwrap();
    assert!(cfg.validated().is_err());
    let cfg: Configuration = serde_yaml::from_str("poll-interval: 0ms").unwrap();
    assert!(cfg.validated().is_err());
    let cfg: Configuration = serde_yaml::from_str("frame-rate-cap: 0").unwrap();
    assert!(cfg.validated().is_err());
}

#[test]
fn rejects_empty_extension_and_bad_hours() {
    let cfg: Configuration = serde_yaml::from_str("extension: '.'").unwrap();
    assert!(cfg.validated().is_err());
    let cfg: Configuration = serde_yaml::from_str("schedule:\n  start-hour: 25\n").unwrap();
    assert!(cfg.validated().is_err());
}

#[test]
fn rejects_unparseable_duration() {
    let res: Result<Configuration, _> = serde_yaml::from_str("display-duration: soon");
    assert!(res.is_err());
}

#[test]
fn loads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "photo-library-path: /media/photos\n").unwrap();
    let cfg = Configuration::from_yaml_file(&path).unwrap();
    assert_eq!(cfg.photo_library_path, PathBuf::from("/media/photos"));
    assert!(Configuration::from_yaml_file(dir.path().join("missing.yaml")).is_err());
}
