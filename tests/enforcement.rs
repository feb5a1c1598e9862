//! Toggle/loop behavior against an in-memory capture device.

use mic_volume_enforcer::{
    AudioError, CaptureProvider, CaptureVolume, ControlSurface, Controller, EnforcerError, Status,
    VolumeRange,
};
use crossbeam_channel::{bounded, Receiver};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Open,
    Range,
    Set(f32),
    Close,
}

#[derive(Default)]
struct DeviceLog {
    calls: Mutex<Vec<(Instant, Call)>>,
    live: AtomicUsize,
    max_live: AtomicUsize,
}

impl DeviceLog {
    fn push(&self, call: Call) {
        self.calls.lock().unwrap().push((Instant::now(), call));
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().iter().map(|(_, c)| c.clone()).collect()
    }

    fn count(&self, wanted: fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| wanted(c)).count()
    }

    fn sets_after(&self, after: Instant) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(at, call)| *at > after && matches!(call, Call::Set(_)))
            .count()
    }
}

struct FakeDevice {
    log: Arc<DeviceLog>,
    range: VolumeRange,
    reject_tick: Option<usize>,
    /// When set, the first level set blocks on this gate and then reports
    /// the device as gone
    lost_after: Option<Receiver<()>>,
    ticks: AtomicUsize,
}

impl CaptureVolume for FakeDevice {
    fn volume_range(&self) -> Result<VolumeRange, AudioError> {
        self.log.push(Call::Range);
        Ok(self.range)
    }

    fn set_level(&self, level_db: f32) -> Result<(), AudioError> {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.push(Call::Set(level_db));
        if let Some(gate) = &self.lost_after {
            let _ = gate.recv();
            return Err(AudioError::DeviceUnavailable("unplugged".into()));
        }
        if Some(tick) == self.reject_tick {
            return Err(AudioError::SetRejected("device busy".into()));
        }
        Ok(())
    }
}

impl Drop for FakeDevice {
    fn drop(&mut self) {
        self.log.live.fetch_sub(1, Ordering::SeqCst);
        self.log.push(Call::Close);
    }
}

struct FakeProvider {
    log: Arc<DeviceLog>,
    range: VolumeRange,
    missing: bool,
    reject_tick: Option<usize>,
    lost_after: Option<Receiver<()>>,
}

impl FakeProvider {
    fn new(log: &Arc<DeviceLog>) -> Self {
        Self {
            log: Arc::clone(log),
            range: VolumeRange::new(-40.0, 0.0),
            missing: false,
            reject_tick: None,
            lost_after: None,
        }
    }
}

impl CaptureProvider for FakeProvider {
    type Handle = FakeDevice;

    fn open_default_capture(&self) -> Result<FakeDevice, AudioError> {
        self.log.push(Call::Open);
        if self.missing {
            return Err(AudioError::DeviceUnavailable("no microphone present".into()));
        }
        let live = self.log.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.max_live.fetch_max(live, Ordering::SeqCst);
        Ok(FakeDevice {
            log: Arc::clone(&self.log),
            range: self.range,
            reject_tick: self.reject_tick,
            lost_after: self.lost_after.clone(),
            ticks: AtomicUsize::new(0),
        })
    }
}

#[derive(Default)]
struct RecordingSurface {
    labels: Vec<String>,
    errors: Vec<String>,
}

impl ControlSurface for RecordingSurface {
    fn show_status(&mut self, status: Status) {
        self.labels.push(status.toggle_label().to_string());
    }

    fn report_error(&mut self, error: &EnforcerError) {
        self.errors.push(error.to_string());
    }
}

fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn sets_level_to_range_maximum() {
    let log = Arc::new(DeviceLog::default());
    let controller = Controller::start(FakeProvider::new(&log), RecordingSurface::default(), TICK);

    wait_until("first tick", || log.count(|c| matches!(c, Call::Set(_))) >= 1);

    let calls = log.calls();
    assert_eq!(calls[..3], [Call::Open, Call::Range, Call::Set(0.0)]);
    assert!(calls
        .iter()
        .all(|c| !matches!(c, Call::Set(level) if *level != 0.0)));
    drop(controller);
}

#[test]
fn rejected_set_is_retried_next_tick() {
    let log = Arc::new(DeviceLog::default());
    let provider = FakeProvider {
        reject_tick: Some(3),
        ..FakeProvider::new(&log)
    };
    let mut controller =
        Controller::start(provider, RecordingSurface::default(), Duration::from_millis(5));

    wait_until("fourth tick", || log.count(|c| matches!(c, Call::Set(_))) >= 4);

    assert_eq!(controller.status(), Status::Running);
    assert!(controller.surface().errors.is_empty());
    assert_eq!(log.count(|c| *c == Call::Open), 1);
}

#[test]
fn missing_device_stops_without_setting_level() {
    let log = Arc::new(DeviceLog::default());
    let provider = FakeProvider {
        missing: true,
        ..FakeProvider::new(&log)
    };
    let mut controller = Controller::start(provider, RecordingSurface::default(), TICK);

    wait_until("activation end", || controller.status() == Status::Stopped);

    assert_eq!(log.calls(), vec![Call::Open]);
    assert_eq!(controller.surface().labels, vec!["Stop", "Start"]);
    assert_eq!(controller.surface().errors.len(), 1);
    assert!(controller.surface().errors[0].contains("no microphone present"));
}

#[test]
fn device_lost_while_stopping_is_still_reported() {
    let log = Arc::new(DeviceLog::default());
    let (release, gate) = bounded(1);
    let provider = FakeProvider {
        lost_after: Some(gate),
        ..FakeProvider::new(&log)
    };
    let mut controller = Controller::start(provider, RecordingSurface::default(), TICK);
    wait_until("first set in flight", || {
        log.count(|c| matches!(c, Call::Set(_))) == 1
    });

    // Stop while the set call is still outstanding, then let it fail.
    assert_eq!(controller.toggle(), Status::Stopped);
    release.send(()).unwrap();

    wait_until("error report", || {
        controller.status();
        !controller.surface().errors.is_empty()
    });
    assert_eq!(controller.status(), Status::Stopped);
    assert_eq!(controller.surface().labels, vec!["Stop", "Start"]);
    assert_eq!(controller.surface().errors.len(), 1);
    assert!(controller.surface().errors[0].contains("unplugged"));
}

#[test]
fn stop_is_observed_within_one_tick() {
    let log = Arc::new(DeviceLog::default());
    let mut controller =
        Controller::start(FakeProvider::new(&log), RecordingSurface::default(), TICK);
    wait_until("two ticks", || log.count(|c| matches!(c, Call::Set(_))) >= 2);

    assert_eq!(controller.toggle(), Status::Stopped);
    let stopped_at = Instant::now();

    wait_until("handle release", || log.count(|c| *c == Call::Close) == 1);
    thread::sleep(TICK * 3);
    assert_eq!(log.sets_after(stopped_at + TICK), 0);
}

#[test]
fn restart_queries_range_before_first_set() {
    let log = Arc::new(DeviceLog::default());
    let mut controller =
        Controller::start(FakeProvider::new(&log), RecordingSurface::default(), TICK);
    wait_until("first tick", || log.count(|c| matches!(c, Call::Set(_))) >= 1);

    controller.toggle();
    assert_eq!(controller.toggle(), Status::Running);
    wait_until("second activation", || log.count(|c| *c == Call::Open) == 2);
    wait_until("second activation tick", || {
        let calls = log.calls();
        let start = calls.iter().rposition(|c| *c == Call::Open).unwrap();
        calls[start..].iter().any(|c| matches!(c, Call::Set(_)))
    });

    let calls = log.calls();
    let start = calls.iter().rposition(|c| *c == Call::Open).unwrap();
    assert_eq!(calls[start + 1], Call::Range);
    assert_eq!(calls[start + 2], Call::Set(0.0));
    // The first activation released its handle before the second opened.
    assert_eq!(calls[start - 1], Call::Close);
}

#[test]
fn rapid_double_toggle_leaves_one_activation() {
    let log = Arc::new(DeviceLog::default());
    let mut controller =
        Controller::start(FakeProvider::new(&log), RecordingSurface::default(), TICK);
    wait_until("first open", || log.count(|c| *c == Call::Open) == 1);

    controller.toggle();
    controller.toggle();

    wait_until("second open", || log.count(|c| *c == Call::Open) == 2);
    thread::sleep(TICK * 2);
    assert_eq!(controller.status(), Status::Running);
    assert_eq!(log.live.load(Ordering::SeqCst), 1);
    assert_eq!(log.max_live.load(Ordering::SeqCst), 1);
}

#[test]
fn toggle_storm_never_overlaps_activations() {
    let log = Arc::new(DeviceLog::default());
    let mut controller = Controller::start(
        FakeProvider::new(&log),
        RecordingSurface::default(),
        Duration::from_millis(1),
    );

    for i in 0..40 {
        controller.toggle();
        if i % 7 == 0 {
            thread::sleep(Duration::from_millis(3));
        }
    }
    controller.quit();

    assert_eq!(log.max_live.load(Ordering::SeqCst), 1);
    assert_eq!(log.live.load(Ordering::SeqCst), 0);
    assert_eq!(
        log.count(|c| *c == Call::Open),
        log.count(|c| *c == Call::Close)
    );
}

#[test]
fn quit_twice_releases_handle_once() {
    let log = Arc::new(DeviceLog::default());
    let mut controller =
        Controller::start(FakeProvider::new(&log), RecordingSurface::default(), TICK);
    wait_until("first tick", || log.count(|c| matches!(c, Call::Set(_))) >= 1);

    controller.quit();
    controller.quit();
    drop(controller);

    assert_eq!(log.count(|c| *c == Call::Open), 1);
    assert_eq!(log.count(|c| *c == Call::Close), 1);
    assert_eq!(log.live.load(Ordering::SeqCst), 0);
}
