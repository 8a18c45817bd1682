//! Cache Worker Integration Tests
//!
//! Runs the batch driver against a temporary sled database: successful
//! renders, fatal per-session errors that store nothing, and a loop that
//! keeps going after a failure.

use std::time::{Duration, Instant};

use sst_analysis::cache::{
    CacheError, CacheWorker, JobSource, QueuedSessions, SessionId, SessionRecord, SessionReport,
    SessionStore, SetupInfo, SledStore, StorageError, TcpJobSource,
};
use sst_analysis::config::AnalysisConfig;
use sst_analysis::types::{Calibration, Geometry, Interval, Strokes, Suspension, Telemetry};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

fn ride(len: usize, amplitude: f64) -> (Vec<f64>, Vec<f64>) {
    let mut travel = vec![0.5; 300];
    travel.extend((0..len).map(|i| 60.0 + amplitude * (i as f64 / 9.0).sin()));
    let velocity: Vec<f64> = travel
        .windows(2)
        .map(|w| (w[1] - w[0]) * 1000.0)
        .chain(std::iter::once(0.0))
        .collect();
    (travel, velocity)
}

fn suspension(travel: Vec<f64>, velocity: Vec<f64>, max_stroke: f64) -> Suspension {
    let n = travel.len();
    let digitized_travel = travel
        .iter()
        .map(|t| (t / max_stroke * 10.0) as i32)
        .collect();
    Suspension {
        present: true,
        calibration: Calibration {
            name: "linear".to_string(),
            max_stroke,
        },
        travel,
        velocity,
        travel_bins: (0..=10).map(|i| f64::from(i) * max_stroke / 10.0).collect(),
        velocity_bins: vec![-2000.0, -1000.0, 0.0, 1000.0, 2000.0],
        digitized_travel,
        digitized_velocity: vec![2; n],
        strokes: Strokes {
            compressions: vec![Interval::new(400, 430), Interval::new(500, 530)],
            rebounds: vec![Interval::new(430, 460), Interval::new(530, 560)],
        },
    }
}

fn record(with_setup: bool) -> SessionRecord {
    let (ft, fv) = ride(900, 30.0);
    let (rt, rv) = ride(900, 25.0);
    SessionRecord {
        name: "lunch loop".to_string(),
        description: "dry, fast".to_string(),
        setup: with_setup.then(|| SetupInfo {
            name: "enduro".to_string(),
            linkage: "horst".to_string(),
            ..SetupInfo::default()
        }),
        telemetry: Telemetry {
            name: "lunch loop".to_string(),
            sample_rate: 1000,
            front: suspension(ft, fv, 170.0),
            rear: suspension(rt, rv, 65.0),
            frame: Geometry {
                max_front_travel: Some(170.0),
                max_rear_travel: 160.0,
                wheel_leverage_ratio: vec![2.9, 2.7, 2.5],
                coeffs_shock_wheel: vec![0.0, 2.6, -0.002],
            },
        },
    }
}

fn open_store(dir: &tempfile::TempDir) -> SledStore {
    SledStore::open(dir.path().join("sst.db")).unwrap()
}

#[test]
fn create_cache_stores_rendered_report() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    store.put_session(1, &record(true)).unwrap();

    let mut config = AnalysisConfig::default();
    config.render.lod = 10;
    let worker = CacheWorker::new(store, config);
    let report = worker.create_cache(1).unwrap();

    assert_eq!(report.session_id, 1);
    assert_eq!(report.traces.time.len(), 120);
    assert_eq!(report.traces.front_travel.as_ref().unwrap().len(), 120);
    let front = report.front.as_ref().unwrap();
    assert_eq!(front.topouts, vec![(0.0, 0.3)]);
    // Statistics are never downsampled
    assert_eq!(front.stats.selected_samples, 900);
    assert_eq!(front.stats.travel_histogram.total(), 900);
    assert_eq!(
        front.spectrum_power.len(),
        front.stats.spectrum.frequencies.len()
    );
    assert!(front
        .spectrum_power
        .iter()
        .zip(&front.stats.spectrum.amplitudes)
        .all(|(p, a)| (p - a * a).abs() < 1e-9));
    assert!(report.compression_balance.is_some());
    assert_eq!(report.leverage.shock_wheel.len(), 50);
    assert_eq!(report.setup.linkage, "horst");

    let bytes = worker.store().cache(1).unwrap().unwrap();
    let stored: SessionReport = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(stored.session_id, 1);
    assert_eq!(stored.name, "lunch loop");
    assert_eq!(stored.generated_at, report.generated_at);
    assert_eq!(stored.front.unwrap().stats.selected_samples, 900);
}

#[test]
fn missing_session_and_setup_store_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    store.put_session(2, &record(false)).unwrap();
    let worker = CacheWorker::new(store, AnalysisConfig::default());

    assert!(matches!(
        worker.create_cache(99),
        Err(CacheError::SessionNotFound(99))
    ));
    assert!(matches!(
        worker.create_cache(2),
        Err(CacheError::MissingSetup(2))
    ));
    assert!(worker.store().cache(2).unwrap().is_none());
    assert_eq!(worker.store().cached_count(), 0);
}

#[test]
fn corrupt_dataset_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let mut bad = record(true);
    bad.telemetry.rear.travel.truncate(500);
    bad.telemetry.rear.velocity.truncate(500);
    store.put_session(3, &bad).unwrap();

    let worker = CacheWorker::new(store, AnalysisConfig::default());
    let err = worker.create_cache(3).unwrap_err();
    assert!(matches!(err, CacheError::Telemetry(_)));
    assert!(err.to_string().contains("Corrupt dataset"));
}

#[tokio::test]
async fn loop_continues_after_failed_session() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    store.put_session(1, &record(true)).unwrap();
    store.put_session(2, &record(false)).unwrap();
    store.put_session(4, &record(true)).unwrap();

    let worker = CacheWorker::new(store, AnalysisConfig::default());
    let mut source = QueuedSessions::new(vec![1, 2, 3, 4]);
    let stats = worker.run(&mut source, CancellationToken::new()).await;

    assert_eq!(stats.processed, 2);
    assert_eq!(stats.failed, 2);
    assert!(worker.store().cache(4).unwrap().is_some());
    assert!(worker.store().cache(2).unwrap().is_none());
}

#[tokio::test]
async fn serve_mode_processes_queue_until_cancelled() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    store.put_session(5, &record(true)).unwrap();
    store.put_session(6, &record(true)).unwrap();

    let mut source = TcpJobSource::bind("127.0.0.1:0").await.unwrap();
    let addr = source.local_addr().unwrap();
    assert_eq!(source.source_name(), "tcp");

    let cancel = CancellationToken::new();
    let stopper = cancel.clone();
    let producer = tokio::spawn(async move {
        let mut conn = tokio::net::TcpStream::connect(addr).await.unwrap();
        for id in [5i32, 77, 6] {
            conn.write_all(&id.to_le_bytes()).await.unwrap();
        }
        conn.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        stopper.cancel();
    });

    let worker = CacheWorker::new(store, AnalysisConfig::default());
    let stats = worker.run(&mut source, cancel).await;
    producer.await.unwrap();

    assert_eq!(stats.processed, 2);
    assert_eq!(stats.failed, 1);
    assert!(worker.store().cache(6).unwrap().is_some());
}

/// Store whose lookups block, standing in for a long render.
struct SlowStore(Duration);

impl SessionStore for SlowStore {
    fn session(&self, _id: SessionId) -> Result<Option<SessionRecord>, StorageError> {
        std::thread::sleep(self.0);
        Ok(None)
    }

    fn put_session(&self, _id: SessionId, _record: &SessionRecord) -> Result<(), StorageError> {
        Ok(())
    }

    fn store_cache(&self, _id: SessionId, _bytes: &[u8]) -> Result<(), StorageError> {
        Ok(())
    }

    fn cache(&self, _id: SessionId) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(None)
    }
}

#[tokio::test]
async fn cancellation_is_seen_while_a_session_renders() {
    let worker = CacheWorker::new(SlowStore(Duration::from_secs(2)), AnalysisConfig::default());
    let mut source = QueuedSessions::new(vec![1, 2]);

    let cancel = CancellationToken::new();
    let stopper = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        stopper.cancel();
    });

    let started = Instant::now();
    let stats = worker.run(&mut source, cancel).await;

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(stats.processed, 0);
    assert_eq!(stats.failed, 0);
}
