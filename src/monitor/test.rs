use std::{
    net::{Ipv4Addr, SocketAddr},
    time::{Duration, Instant},
};

use tracing_test::traced_test;

use super::{Alert, Ignored, Ingest, Monitor, MonitorState, Settings};
use crate::{
    core::shutdown::Shutdown,
    emitter::{self, Emitter, SendErrorPolicy},
    reading::Reading,
    sensor::{SensorId, SensorKind},
    source::ValueSource,
};

fn state() -> (MonitorState, Instant) {
    let start = Instant::now();
    (MonitorState::new(Settings::default(), start), start)
}

fn datagram(id: u8, value: f32) -> [u8; 5] {
    Reading::new(id, value).encode()
}

#[test]
fn accepts_known_sensors() {
    let (mut state, now) = state();
    let outcome = state.ingest(&datagram(1, 70.0), now);
    assert_eq!(
        outcome,
        Ingest::Updated {
            reading: Reading::new(SensorKind::Humidity, 70.0),
            alerts: vec![],
        }
    );
    assert_eq!(state.value(SensorKind::Humidity), 70.0);
    assert_eq!(
        state.summary(),
        "humidity: 70.00 % | temperature: 0.00 °C | light: 0.00 lx"
    );
}

#[test]
fn ignores_what_is_not_a_reading() {
    let (mut state, now) = state();
    assert_eq!(
        state.ingest(&[1, 2, 3], now),
        Ingest::Ignored(Ignored::BadLength(3))
    );
    // natively packed C struct, with padding after the id
    assert_eq!(
        state.ingest(&[1, 0, 0, 0, 0, 0, 0x8c, 0x42], now),
        Ingest::Ignored(Ignored::BadLength(8))
    );
    assert_eq!(
        state.ingest(&datagram(4, 10.0), now),
        Ingest::Ignored(Ignored::UnknownSensor(SensorId(4)))
    );
    for value in [-1.0, 1000.5, f32::NAN] {
        assert!(matches!(
            state.ingest(&datagram(2, value), now),
            Ingest::Ignored(Ignored::OutOfRange(_))
        ));
    }
    assert_eq!(state.value(SensorKind::Temperature), 0.0);
}

#[test]
fn small_changes_are_not_updates() {
    let (mut state, now) = state();
    state.ingest(&datagram(2, 22.0), now);
    assert_eq!(
        state.ingest(&datagram(2, 22.05), now),
        Ingest::Unchanged(Reading::new(2u8, 22.05))
    );
    assert_eq!(state.value(SensorKind::Temperature), 22.0);
    assert!(matches!(
        state.ingest(&datagram(2, 22.5), now),
        Ingest::Updated { .. }
    ));
}

#[test]
fn values_over_threshold_alert() {
    let (mut state, now) = state();
    state.ingest(&datagram(3, 400.0), now);
    let Ingest::Updated { alerts, .. } = state.ingest(&datagram(2, 26.0), now) else {
        panic!("temperature update was not applied");
    };
    assert_eq!(
        alerts,
        vec![Alert {
            kind: SensorKind::Temperature,
            value: 26.0,
            threshold: 24.0,
        }]
    );
    let Ingest::Updated { alerts, .. } = state.ingest(&datagram(3, 550.0), now) else {
        panic!("light update was not applied");
    };
    let kinds = alerts.iter().map(|a| a.kind).collect::<Vec<_>>();
    assert_eq!(kinds, vec![SensorKind::Temperature, SensorKind::Light]);
}

#[test]
fn silent_sensors_are_reported_once() {
    let (mut state, start) = state();
    assert!(state.check_timeouts(start + Duration::from_secs(10)).is_empty());

    state.ingest(&datagram(1, 70.0), start + Duration::from_secs(15));
    let later = start + Duration::from_secs(21);
    assert_eq!(
        state.check_timeouts(later),
        vec![SensorKind::Temperature, SensorKind::Light]
    );
    assert!(state.check_timeouts(later).is_empty());

    let much_later = start + Duration::from_secs(40);
    assert_eq!(state.check_timeouts(much_later), vec![SensorKind::Humidity]);

    // hearing from the sensor again re-arms the report
    state.ingest(&datagram(2, 23.0), much_later);
    assert!(state.check_timeouts(much_later).is_empty());
    assert_eq!(
        state.check_timeouts(much_later + Duration::from_secs(21)),
        vec![SensorKind::Temperature]
    );
}

#[test]
fn unchanged_values_do_not_refresh_the_timeout() {
    let (mut state, start) = state();
    state.ingest(&datagram(1, 70.0), start);
    state.ingest(&datagram(1, 70.0), start + Duration::from_secs(15));
    let expired = state.check_timeouts(start + Duration::from_secs(21));
    assert!(expired.contains(&SensorKind::Humidity));
}

#[tokio::test]
#[traced_test]
async fn receives_from_an_emitter() {
    let monitor = Monitor::bind(Settings::default(), (Ipv4Addr::LOCALHOST, 0).into())
        .await
        .unwrap();
    let addr: SocketAddr = monitor.local_addr().unwrap();
    let mut emitter = Emitter::bind(
        emitter::Settings {
            sensor: SensorKind::Light.into(),
            label: None,
            source: ValueSource::constant(550.0),
            interval: Duration::from_secs(2),
            on_send_error: SendErrorPolicy::Fatal,
            seed: None,
        },
        addr,
    )
    .await
    .unwrap();

    let mut shutdown = Shutdown::new();
    let handle = shutdown.handle();
    let (state, ()) = tokio::join!(monitor.run(handle), async {
        emitter.emit_once().await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        shutdown.trigger_shutdown();
    });
    let state = state.unwrap();
    assert_eq!(state.value(SensorKind::Light), 550.0);
    assert!(logs_contain("Sensor 3 updated: 550.00"));
    assert!(logs_contain("High light: 550.00 lx"));
    shutdown.wait_for_completion().await;
}
