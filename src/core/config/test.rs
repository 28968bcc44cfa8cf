use std::{net::Ipv4Addr, time::Duration};

use super::*;
use crate::{core::args::EmitterArgs, monitor::Thresholds};

const EXAMPLE: &str = include_str!("../../../config.example.toml");

#[test]
fn load_example_config() {
    let cfg = emitter_from(&EmitterArgs::default(), Some(EXAMPLE)).unwrap();
    assert_eq!(
        cfg,
        EmitterConfig {
            destination: Destination {
                host: "192.168.1.11".into(),
                port: 4210,
            },
            sensor: Sensor {
                id: 2,
                label: Some("temperature".into()),
            },
            value: ValueMode::Random { low: 20, high: 28 },
            emitter: Timing {
                interval_ms: 2000,
                on_send_error: SendErrorPolicy::Fatal,
                seed: None,
            },
        }
    );
    cfg.settings().unwrap();
}

#[test]
fn load_example_monitor_config() {
    let cfg = monitor_from(&MonitorArgs::default(), Some(EXAMPLE)).unwrap();
    assert_eq!(cfg, MonitorConfig::default());
    let settings = cfg.settings().unwrap();
    assert_eq!(settings, monitor::Settings::default());
}

#[test]
fn presets_match_the_stock_sensors() {
    let cases = [
        (Preset::Humidity, 1, ValueMode::Constant { value: 70.0 }),
        (Preset::Temperature, 2, ValueMode::Random { low: 20, high: 28 }),
        (Preset::Light, 3, ValueMode::Random { low: 10, high: 600 }),
    ];
    for (preset, id, value) in cases {
        let args = EmitterArgs {
            preset: Some(preset),
            ..Default::default()
        };
        let cfg = emitter_from(&args, None).unwrap();
        assert_eq!(cfg.sensor.id, id);
        assert_eq!(cfg.value, value);
        assert_eq!(cfg.destination.host, DEFAULT_HOST);
        assert_eq!(cfg.destination.port, DEFAULT_PORT);
        assert_eq!(cfg.emitter.interval_ms, DEFAULT_INTERVAL_MS);
    }
}

#[test]
fn command_line_beats_file_beats_preset() {
    let file = r#"
        [destination]
        port = 5000

        [sensor]
        id = 7
    "#;
    let args = EmitterArgs {
        preset: Some(Preset::Temperature),
        host: Some("127.0.0.1".into()),
        constant: Some(3.5),
        interval_ms: Some(100),
        on_send_error: Some(SendErrorPolicy::Log),
        seed: Some(u64::MAX),
        ..Default::default()
    };
    let cfg = emitter_from(&args, Some(file)).unwrap();
    assert_eq!(cfg.destination.host, "127.0.0.1");
    assert_eq!(cfg.destination.port, 5000);
    assert_eq!(cfg.sensor.id, 7);
    assert_eq!(cfg.value, ValueMode::Constant { value: 3.5 });
    assert_eq!(
        cfg.emitter,
        Timing {
            interval_ms: 100,
            on_send_error: SendErrorPolicy::Log,
            seed: Some(u64::MAX),
        }
    );

    let settings = cfg.settings().unwrap();
    assert_eq!(settings.sensor, SensorId(7));
    assert_eq!(settings.interval, Duration::from_millis(100));
}

#[test]
fn random_bounds_replace_a_constant_preset() {
    let args = EmitterArgs {
        preset: Some(Preset::Humidity),
        low: Some(60),
        high: Some(90),
        ..Default::default()
    };
    let cfg = emitter_from(&args, None).unwrap();
    assert_eq!(cfg.value, ValueMode::Random { low: 60, high: 90 });
}

#[test]
fn sensor_and_value_are_required() {
    assert!(emitter_from(&EmitterArgs::default(), None).is_err());
    let args = EmitterArgs {
        sensor_id: Some(1),
        ..Default::default()
    };
    assert!(emitter_from(&args, None).is_err());
}

#[test]
fn invalid_settings_are_rejected() {
    let base = EmitterArgs {
        preset: Some(Preset::Light),
        ..Default::default()
    };
    let inverted = EmitterArgs {
        low: Some(600),
        high: Some(10),
        ..base
    };
    assert!(emitter_from(&inverted, None).unwrap().settings().is_err());

    let port_zero = EmitterArgs {
        preset: Some(Preset::Light),
        port: Some(0),
        ..Default::default()
    };
    assert!(emitter_from(&port_zero, None).unwrap().settings().is_err());

    let no_delay = EmitterArgs {
        preset: Some(Preset::Light),
        interval_ms: Some(0),
        ..Default::default()
    };
    assert!(emitter_from(&no_delay, None).unwrap().settings().is_err());

    let not_a_number = EmitterArgs {
        preset: Some(Preset::Light),
        constant: Some(f32::NAN),
        ..Default::default()
    };
    assert!(emitter_from(&not_a_number, None)
        .unwrap()
        .settings()
        .is_err());
}

#[test]
fn unknown_policy_is_a_config_error() {
    let file = r#"
        [emitter]
        on_send_error = "retry"
    "#;
    let args = EmitterArgs {
        preset: Some(Preset::Humidity),
        ..Default::default()
    };
    assert!(emitter_from(&args, Some(file)).is_err());
}

#[test]
fn monitor_overrides() {
    let file = r#"
        [monitor]
        port = 9999
        timeout_ms = 5000

        [monitor.thresholds]
        light = 300.0
    "#;
    let args = MonitorArgs {
        bind: Some(Ipv4Addr::LOCALHOST.into()),
        ..Default::default()
    };
    let cfg = monitor_from(&args, Some(file)).unwrap();
    assert_eq!(
        cfg.listen_addr(),
        SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 9999)
    );
    let settings = cfg.settings().unwrap();
    assert_eq!(settings.timeout, Duration::from_secs(5));
    assert_eq!(
        settings.thresholds,
        Thresholds {
            light: 300.0,
            ..Thresholds::default()
        }
    );

    let defaults = monitor_from(&MonitorArgs::default(), None).unwrap();
    assert_eq!(defaults, MonitorConfig::default());
    assert_eq!(defaults.listen_addr().port(), DEFAULT_PORT);
}

#[test]
fn out_of_range_integers_are_rejected() {
    let preset = EmitterArgs {
        preset: Some(Preset::Temperature),
        ..Default::default()
    };
    for file in [
        "[sensor]\nid = 256",
        "[sensor]\nid = -1",
        "[destination]\nport = 65536",
        "[destination]\nport = 70000",
        "[emitter]\ninterval_ms = -5",
        "[emitter]\nseed = -1",
    ] {
        let err = emitter_from(&preset, Some(file)).unwrap_err();
        assert!(
            format!("{err:#}").contains("out of range"),
            "{file:?} gave {err:#}"
        );
    }
    let edge = emitter_from(
        &preset,
        Some("[sensor]\nid = 255\n[destination]\nport = 65535"),
    )
    .unwrap();
    assert_eq!((edge.sensor.id, edge.destination.port), (255, 65535));

    for file in ["[monitor]\nport = 65536", "[monitor]\ntimeout_ms = -1"] {
        let err = monitor_from(&MonitorArgs::default(), Some(file)).unwrap_err();
        assert!(
            format!("{err:#}").contains("out of range"),
            "{file:?} gave {err:#}"
        );
    }
}
