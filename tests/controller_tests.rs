mod common;

use common::*;
use waymark::{
    geofence::{FenceStatus, GeofenceConfig, Transition},
    progress::{Error, HitMode, Monitoring, Notification, TripProgressController},
    shared::{Coordinate, Timestamp},
    trip::{Stop, StopStatus},
};

type Controller = TripProgressController<MockProvider, MockStore, RecordingSink>;

fn palace_trip() -> Vec<Stop> {
    vec![
        Stop::new("beihai", 3, Some(BEIHAI)).with_name("Beihai Park"),
        Stop::new("forbidden-city", 1, Some(FORBIDDEN_CITY)).with_name("Forbidden City"),
        Stop::new("jingshan", 2, Some(JINGSHAN)).with_name("Jingshan Park"),
    ]
}

fn controller(stops: Vec<Stop>) -> Controller {
    TripProgressController::new(
        "trip-1",
        engine(),
        MockProvider::default(),
        MockStore::new(stops),
        RecordingSink::default(),
    )
}

fn loaded(stops: Vec<Stop>) -> Controller {
    let mut controller = controller(stops);
    controller
        .load(Some(south_of(FORBIDDEN_CITY, 400.0)), None::<&[&str]>)
        .unwrap();
    controller
}

fn ids(stops: &[Stop]) -> Vec<&str> {
    stops.iter().map(|stop| &*stop.id).collect()
}

fn transitions(controller: &Controller) -> Vec<(String, Transition)> {
    controller
        .sink()
        .events()
        .into_iter()
        .filter_map(|event| match event {
            Notification::Transition { stop_id, kind, .. } => Some((stop_id.to_string(), kind)),
            _ => None,
        })
        .collect()
}

/// Feeds samples through the provider the way a real subscription would.
fn feed(controller: &mut Controller, samples: &[(Coordinate, i64)]) -> usize {
    for (coordinate, step) in samples {
        controller.provider().push(sample(*coordinate, *step));
    }
    controller.pump()
}

#[test]
fn load_orders_from_user_position_and_renumbers() {
    let mut controller = controller(palace_trip());
    let stops = controller
        .load(Some(south_of(FORBIDDEN_CITY, 400.0)), None::<&[&str]>)
        .unwrap();
    assert_eq!(ids(stops), vec!["forbidden-city", "jingshan", "beihai"]);
    let sequences: Vec<u32> = stops.iter().map(|stop| stop.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3]);

    let events = controller.sink().events();
    let Some(Notification::RouteOptimized { order, length }) = events.first() else {
        panic!("expected a route notification, got {events:?}");
    };
    assert_eq!(order.len(), 3);
    assert!((length.as_meters() - 2001.5).abs() < 5.0);
}

#[test]
fn load_reapplies_saved_order() {
    let mut controller = controller(palace_trip());
    let stops = controller
        .load(None, Some(&["jingshan", "beihai", "forbidden-city"][..]))
        .unwrap();
    assert_eq!(ids(stops), vec!["jingshan", "beihai", "forbidden-city"]);
    controller.start().unwrap();
    assert_eq!(controller.target().map(|stop| &*stop.id), Some("jingshan"));
}

#[test]
fn stop_without_start_is_a_noop() {
    let mut controller = loaded(palace_trip());
    controller.stop();
    controller.stop();
    assert!(!controller.is_monitoring());
    assert_eq!(controller.provider().unsubscribe_calls, 0);
}

#[test]
fn double_start_subscribes_once() {
    let mut controller = loaded(palace_trip());
    assert_eq!(controller.start(), Ok(Monitoring::Started));
    assert_eq!(controller.start(), Ok(Monitoring::AlreadyRunning));
    assert_eq!(controller.provider().subscribe_calls, 1);
    assert_eq!(
        controller.provider().interval,
        Some(GeofenceConfig::default().sample_interval)
    );
}

#[test]
fn arrival_and_departure_advance_the_target() {
    let mut controller = loaded(palace_trip());
    controller.start().unwrap();
    assert_eq!(controller.target().map(|stop| &*stop.id), Some("forbidden-city"));

    let handled = feed(
        &mut controller,
        &[
            (north_of(FORBIDDEN_CITY, 40.0), 0),
            (north_of(FORBIDDEN_CITY, 20.0), 1),
        ],
    );
    assert_eq!(handled, 2);
    assert_eq!(controller.stops()[0].status, StopStatus::Visiting);
    assert_eq!(controller.snapshot().last_status, Some(FenceStatus::Inside));

    feed(
        &mut controller,
        &[
            (south_of(FORBIDDEN_CITY, 300.0), 2),
            (south_of(FORBIDDEN_CITY, 320.0), 3),
        ],
    );
    assert_eq!(controller.stops()[0].status, StopStatus::Completed);
    assert_eq!(controller.target().map(|stop| &*stop.id), Some("jingshan"));
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.last_status, Some(FenceStatus::Outside));
    assert_eq!(snapshot.arrive_hits, 0);
    assert_eq!(snapshot.leave_hits, 0);

    assert_eq!(
        transitions(&controller),
        vec![
            ("forbidden-city".to_string(), Transition::Arrived),
            ("forbidden-city".to_string(), Transition::Departed),
        ]
    );
    assert_eq!(
        controller.store().writes(),
        vec![
            ("forbidden-city".to_string(), StopStatus::Visiting),
            ("forbidden-city".to_string(), StopStatus::Completed),
        ]
    );
}

#[test]
fn single_hit_never_arrives_in_normal_mode() {
    let mut controller = loaded(palace_trip());
    controller.start().unwrap();
    feed(
        &mut controller,
        &[
            (FORBIDDEN_CITY, 0),
            (north_of(FORBIDDEN_CITY, 125.0), 1),
            (FORBIDDEN_CITY, 2),
        ],
    );
    assert!(transitions(&controller).is_empty());
    assert_eq!(controller.snapshot().arrive_hits, 1);
}

#[test]
fn accelerated_mode_arrives_on_first_hit() {
    let mut controller = loaded(palace_trip()).with_mode(HitMode::Accelerated);
    controller.start().unwrap();
    feed(&mut controller, &[(FORBIDDEN_CITY, 0)]);
    assert_eq!(
        transitions(&controller),
        vec![("forbidden-city".to_string(), Transition::Arrived)]
    );
}

#[test]
fn finishing_the_last_stop_ends_monitoring() {
    let mut controller = loaded(vec![Stop::new("forbidden-city", 1, Some(FORBIDDEN_CITY))]);
    controller.start().unwrap();
    feed(
        &mut controller,
        &[
            (FORBIDDEN_CITY, 0),
            (FORBIDDEN_CITY, 1),
            (south_of(FORBIDDEN_CITY, 500.0), 2),
            (south_of(FORBIDDEN_CITY, 500.0), 3),
            (FORBIDDEN_CITY, 10),
        ],
    );
    assert!(!controller.is_monitoring());
    assert!(controller.target().is_none());
    assert_eq!(controller.provider().unsubscribe_calls, 1);
    assert_eq!(
        controller.sink().events().last(),
        Some(&Notification::TripFinished {
            timestamp: Timestamp::from_millis(START + 3 * 5_000)
        })
    );
    // the late sample was never delivered
    assert!(!controller.provider().push(sample(FORBIDDEN_CITY, 11)));
}

#[test]
fn stops_without_coordinate_are_skipped() {
    let mut stops = palace_trip();
    stops.push(Stop::new("lost", 4, None));
    let mut controller = controller(stops);
    controller
        .load(None, Some(&["lost", "forbidden-city"][..]))
        .unwrap();
    assert_eq!(controller.start(), Ok(Monitoring::Started));
    assert_eq!(controller.target().map(|stop| &*stop.id), Some("forbidden-city"));
    assert_eq!(controller.stops()[0].status, StopStatus::Skipped);
    assert_eq!(
        controller.store().writes(),
        vec![("lost".to_string(), StopStatus::Skipped)]
    );
}

#[test]
fn finished_trip_stays_idle() {
    let stops = palace_trip()
        .into_iter()
        .map(|stop| stop.with_status(StopStatus::Completed))
        .collect();
    let mut controller = loaded(stops);
    assert_eq!(controller.start(), Ok(Monitoring::Idle));
    assert!(!controller.is_monitoring());
    assert_eq!(controller.provider().subscribe_calls, 0);
}

#[test]
fn permission_denied_leaves_controller_idle() {
    let mut controller = TripProgressController::new(
        "trip-1",
        engine(),
        MockProvider::denying(),
        MockStore::new(palace_trip()),
        RecordingSink::default(),
    );
    controller.load(None, None::<&[&str]>).unwrap();
    assert_eq!(controller.start(), Err(Error::PermissionDenied));
    assert!(!controller.is_monitoring());
    assert!(controller.target().is_none());
    assert_eq!(controller.on_sample(sample(FORBIDDEN_CITY, 0)), None);
}

#[test]
fn restart_begins_with_fresh_state() {
    let mut controller = loaded(palace_trip());
    controller.start().unwrap();
    feed(&mut controller, &[(FORBIDDEN_CITY, 0)]);
    assert_eq!(controller.snapshot().arrive_hits, 1);

    controller.stop();
    assert!(!controller.provider().push(sample(FORBIDDEN_CITY, 1)));
    assert_eq!(controller.start(), Ok(Monitoring::Started));
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.arrive_hits, 0);
    assert_eq!(snapshot.last_status, Some(FenceStatus::Outside));
    assert_eq!(controller.provider().subscribe_calls, 2);

    // one more hit is not enough after the reset
    feed(&mut controller, &[(FORBIDDEN_CITY, 2)]);
    assert!(transitions(&controller).is_empty());
}

#[test]
fn samples_are_ignored_while_stopped() {
    let mut controller = loaded(palace_trip());
    assert_eq!(controller.on_sample(sample(FORBIDDEN_CITY, 0)), None);
    assert_eq!(controller.pump(), 0);
    assert!(controller.sink().events().iter().all(|event| {
        !matches!(event, Notification::Transition { .. })
    }));
}

#[test]
fn malformed_samples_are_discarded() {
    let mut controller = loaded(palace_trip());
    controller.start().unwrap();
    let nan = Coordinate::new(f64::NAN, 116.3972);
    feed(&mut controller, &[(FORBIDDEN_CITY, 0), (nan, 1), (FORBIDDEN_CITY, 2)]);
    assert_eq!(
        transitions(&controller),
        vec![("forbidden-city".to_string(), Transition::Arrived)]
    );
}

#[test]
fn inject_targets_the_nearest_open_stop() {
    let mut controller = loaded(palace_trip()).with_mode(HitMode::Accelerated);
    let transition = controller.inject(sample(north_of(BEIHAI, 30.0), 0)).unwrap();
    assert_eq!(transition, Some(Transition::Arrived));
    assert_eq!(controller.target().map(|stop| &*stop.id), Some("beihai"));
    assert_eq!(
        controller.store().writes(),
        vec![("beihai".to_string(), StopStatus::Visiting)]
    );
}

#[test]
fn inject_rejects_non_finite_positions() {
    let mut controller = loaded(palace_trip());
    let nan = Coordinate::new(39.9, f64::NAN);
    assert_eq!(
        controller.inject(sample(nan, 0)),
        Err(Error::MalformedSample(nan))
    );
}

#[test]
fn reload_follows_store_changes() {
    let mut controller = loaded(palace_trip());
    controller.start().unwrap();
    assert_eq!(controller.target().map(|stop| &*stop.id), Some("forbidden-city"));

    controller
        .store()
        .set_status("forbidden-city", StopStatus::Completed);
    controller
        .load(None, Some(&["forbidden-city", "jingshan", "beihai"][..]))
        .unwrap();
    assert!(controller.is_monitoring());
    assert_eq!(controller.target().map(|stop| &*stop.id), Some("jingshan"));

    controller.store().set_status("jingshan", StopStatus::Skipped);
    controller.store().set_status("beihai", StopStatus::Completed);
    controller
        .load(None, Some(&["forbidden-city", "jingshan", "beihai"][..]))
        .unwrap();
    assert!(!controller.is_monitoring());
    assert!(controller.target().is_none());
}

#[test]
fn store_stops_with_unusable_coordinates_are_never_targeted() {
    let stops = vec![
        Stop::new("sentinel", 1, Some(Coordinate::new(0.0, 0.0))),
        Stop::new("forbidden-city", 2, Some(FORBIDDEN_CITY)),
    ];
    let mut optimized = controller(stops.clone());
    let order = optimized.load(None, None::<&[&str]>).unwrap();
    assert_eq!(ids(order), vec!["forbidden-city", "sentinel"]);

    let mut controller = controller(stops);
    controller
        .load(None, Some(&["sentinel", "forbidden-city"][..]))
        .unwrap();
    assert_eq!(controller.start(), Ok(Monitoring::Started));
    assert_eq!(controller.target().map(|stop| &*stop.id), Some("forbidden-city"));
    assert_eq!(
        controller.store().writes(),
        vec![("sentinel".to_string(), StopStatus::Skipped)]
    );
}

#[test]
fn inject_never_picks_an_unusable_stop() {
    let stops = vec![
        Stop::new("nan", 1, Some(Coordinate::new(f64::NAN, 116.3972))),
        Stop::new("forbidden-city", 2, Some(FORBIDDEN_CITY)),
    ];
    let mut controller = controller(stops).with_mode(HitMode::Accelerated);
    controller.load(None, None::<&[&str]>).unwrap();
    let transition = controller.inject(sample(FORBIDDEN_CITY, 0)).unwrap();
    assert_eq!(transition, Some(Transition::Arrived));
    assert_eq!(controller.target().map(|stop| &*stop.id), Some("forbidden-city"));
}
