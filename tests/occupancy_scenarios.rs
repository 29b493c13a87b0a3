use std::sync::Arc;

use parkwatch::{
    first_available, parse_areas, Area, BackendRegistry, DetectionCapability, DetectorBackend,
    Frame, InMemoryStatusStore, ModePreference, OccupancyError, OccupancyMode, ParkingService,
    RawDetection, ScriptedBackend, ServiceOptions, SlotStatus, SqliteStatusStore, StatusStore,
    UriCapture,
};
use parkwatch::detect::ScriptHandle;

const DEMO_AREAS: &str = r#"{
    "areas": [
        {
            "name": "Demo",
            "camera_index": 0,
            "frame_width": 40,
            "frame_height": 10,
            "slots": [
                { "id": "1", "polygon": [[0,0],[10,0],[10,10],[0,10]] },
                { "id": "2", "polygon": [[20,0],[30,0],[30,10],[20,10]] }
            ]
        }
    ]
}"#;

fn stores() -> Vec<(&'static str, Arc<dyn StatusStore>)> {
    vec![
        ("memory", Arc::new(InMemoryStatusStore::new())),
        (
            "sqlite",
            Arc::new(SqliteStatusStore::open(":memory:").expect("open sqlite")),
        ),
    ]
}

fn scripted_service(
    store: Arc<dyn StatusStore>,
    width: u32,
    height: u32,
) -> (ParkingService, ScriptHandle) {
    let (backend, script) = ScriptedBackend::shared();
    let mut registry = BackendRegistry::new();
    registry.register(backend);
    let capture = move |_: &Area| Frame::filled(width, height, 128);
    let service = ParkingService::new(
        parse_areas(DEMO_AREAS).expect("areas"),
        store,
        registry,
        Box::new(capture),
        ServiceOptions {
            mode: ModePreference::Detector,
            ..ServiceOptions::default()
        },
    )
    .expect("service");
    (service, script)
}

fn statuses(service: &ParkingService) -> Vec<(String, SlotStatus)> {
    let report = service.scan("Demo").expect("scan");
    report
        .slots
        .into_iter()
        .map(|s| (s.slot_id, s.status))
        .collect()
}

fn expect(pairs: &[(&str, SlotStatus)]) -> Vec<(String, SlotStatus)> {
    pairs.iter().map(|(id, s)| (id.to_string(), *s)).collect()
}

#[test]
fn centroid_inside_slot_marks_it_occupied() {
    for (name, store) in stores() {
        let (service, script) = scripted_service(store, 40, 10);
        script.set(vec![RawDetection::labeled(2.0, 2.0, 8.0, 8.0, "car")]);
        assert_eq!(
            statuses(&service),
            expect(&[("1", SlotStatus::Occupied), ("2", SlotStatus::Available)]),
            "{}",
            name
        );
    }
}

#[test]
fn small_overlap_is_not_enough() {
    for (name, store) in stores() {
        let (service, script) = scripted_service(store, 40, 10);
        script.set(vec![RawDetection::labeled(9.0, 2.0, 15.0, 8.0, "car")]);
        assert_eq!(
            statuses(&service),
            expect(&[("1", SlotStatus::Available), ("2", SlotStatus::Available)]),
            "{}",
            name
        );
    }
}

#[test]
fn overlap_above_threshold_marks_slot_occupied() {
    for (name, store) in stores() {
        let (service, script) = scripted_service(store, 40, 10);
        script.set(vec![RawDetection::labeled(9.0, 2.0, 19.0, 8.0, "car")]);
        assert_eq!(
            statuses(&service)[0].1,
            SlotStatus::Available,
            "{}: 0.06 overlap",
            name
        );

        script.set(vec![RawDetection::labeled(8.0, 2.0, 19.0, 8.0, "car")]);
        assert_eq!(
            statuses(&service),
            expect(&[("1", SlotStatus::Occupied), ("2", SlotStatus::Available)]),
            "{}: 0.12 overlap",
            name
        );
    }
}

#[test]
fn booked_slot_survives_empty_scan_and_is_skipped() {
    for (name, store) in stores() {
        let (service, script) = scripted_service(store.clone(), 40, 10);
        script.clear();
        service.scan("Demo").expect("first scan");
        service.book("Demo", "1", "alice").expect("book slot 1");

        assert_eq!(
            statuses(&service),
            expect(&[("1", SlotStatus::Booked), ("2", SlotStatus::Available)]),
            "{}",
            name
        );

        let states = store.list("Demo").expect("list");
        assert_eq!(first_available(&states), Some("2"), "{}", name);
        assert_eq!(first_available(&states), Some("2"), "{}", name);

        let record = service.assign("Demo", "bob").expect("assign");
        assert_eq!(record.slot_id, "2", "{}", name);
        assert!(matches!(
            service.assign("Demo", "carol"),
            Err(OccupancyError::NoCapacity(_))
        ));

        assert!(service.release("Demo", "1").expect("release"), "{}", name);
        let record = service.assign("Demo", "carol").expect("assign after release");
        assert_eq!(record.slot_id, "1", "{}", name);
        assert_eq!(service.bookings("Demo").expect("bookings").len(), 3, "{}", name);
    }
}

#[test]
fn unlisted_classes_do_not_occupy() {
    for (name, store) in stores() {
        let (service, script) = scripted_service(store, 40, 10);
        script.set(vec![
            RawDetection::labeled(2.0, 2.0, 8.0, 8.0, "person"),
            RawDetection::labeled(22.0, 2.0, 28.0, 8.0, "Truck"),
        ]);
        assert_eq!(
            statuses(&service),
            expect(&[("1", SlotStatus::Available), ("2", SlotStatus::Occupied)]),
            "{}",
            name
        );
    }
}

#[test]
fn slots_scale_to_frame_resolution() {
    let (service, script) = scripted_service(Arc::new(InMemoryStatusStore::new()), 80, 20);
    // Calibrated slot 2 spans x 20..30, i.e. 40..60 in an 80-wide frame.
    script.set(vec![RawDetection::labeled(44.0, 4.0, 56.0, 16.0, "car")]);
    assert_eq!(
        statuses(&service),
        expect(&[("1", SlotStatus::Available), ("2", SlotStatus::Occupied)])
    );
}

#[test]
fn unknown_area_and_slot_are_reported() {
    let (service, _script) = scripted_service(Arc::new(InMemoryStatusStore::new()), 40, 10);
    assert!(matches!(
        service.scan("Nowhere"),
        Err(OccupancyError::UnknownArea(_))
    ));
    assert!(matches!(
        service.release("Demo", "9"),
        Err(OccupancyError::UnknownSlot { .. })
    ));
    assert!(matches!(
        service.book("Demo", "1", "alice"),
        Err(OccupancyError::SlotUnavailable { .. })
    ));
}

struct BrokenDetector;

impl DetectorBackend for BrokenDetector {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn supports(&self, capability: DetectionCapability) -> bool {
        matches!(capability, DetectionCapability::ObjectBoxes)
    }

    fn detect(&mut self, _frame: &Frame) -> parkwatch::Result<Vec<RawDetection>> {
        Err(OccupancyError::Detector("model crashed".to_string()))
    }
}

#[test]
fn failed_scan_leaves_store_untouched() {
    let store: Arc<dyn StatusStore> = Arc::new(InMemoryStatusStore::new());
    store
        .upsert("Demo", "1", SlotStatus::Occupied, 1)
        .expect("seed");

    let mut registry = BackendRegistry::new();
    registry.register(BrokenDetector);
    let service = ParkingService::new(
        parse_areas(DEMO_AREAS).expect("areas"),
        store.clone(),
        registry,
        Box::new(|_: &Area| Frame::filled(40, 10, 128)),
        ServiceOptions::default(),
    )
    .expect("service");
    assert_eq!(service.capabilities().mode, OccupancyMode::Detector);

    assert!(matches!(
        service.scan("Demo"),
        Err(OccupancyError::Detector(_))
    ));
    let states = store.list("Demo").expect("list");
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].status, SlotStatus::Occupied);
    assert!(service.latest_snapshot("Demo").expect("snapshot").is_none());

    let failing_capture = ParkingService::new(
        parse_areas(DEMO_AREAS).expect("areas"),
        store.clone(),
        BackendRegistry::new(),
        Box::new(|_: &Area| -> parkwatch::Result<Frame> {
            Err(OccupancyError::Capture("camera unplugged".to_string()))
        }),
        ServiceOptions::default(),
    )
    .expect("service");
    assert!(matches!(
        failing_capture.scan("Demo"),
        Err(OccupancyError::Capture(_))
    ));
    assert_eq!(store.list("Demo").expect("list"), states);
}

#[test]
fn variance_fallback_reads_texture() {
    let build = |source: &str| {
        ParkingService::new(
            parse_areas(DEMO_AREAS).expect("areas"),
            Arc::new(InMemoryStatusStore::new()),
            BackendRegistry::new(),
            Box::new(UriCapture::new(source)),
            ServiceOptions::default(),
        )
        .expect("service")
    };

    let flat = build("stub://40x10");
    assert_eq!(flat.capabilities().mode, OccupancyMode::VarianceFallback);
    let report = flat.scan("Demo").expect("scan");
    assert_eq!(report.summary.available, 2);
    assert_eq!(report.mode, OccupancyMode::VarianceFallback);

    let noisy = build("stub://40x10/noise");
    let report = noisy.scan("Demo").expect("scan");
    assert_eq!(report.summary.occupied, 2);
}

#[test]
fn snapshot_and_diagnostics_follow_latest_scan() {
    let (service, script) = scripted_service(Arc::new(InMemoryStatusStore::new()), 40, 10);
    script.set(vec![RawDetection::labeled(2.0, 2.0, 8.0, 8.0, "car")]);
    let report = service.scan("Demo").expect("scan");

    let snapshot = service
        .latest_snapshot("Demo")
        .expect("snapshot")
        .expect("present");
    assert_eq!(snapshot.report, report);
    assert_eq!(snapshot.evidence.len(), 1);
    assert_eq!(snapshot.decisions.len(), 2);

    let diag = service.diagnostics("Demo").expect("diagnostics");
    assert_eq!((diag.width, diag.height), (40, 10));
    assert_eq!(diag.rows.len(), 2);
    assert_eq!(diag.rows[0].ratio, 0.36);
    assert!(diag.rows[0].centroid_inside);
}
