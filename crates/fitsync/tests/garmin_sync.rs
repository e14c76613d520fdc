//! Garmin source against a mocked Connect API
//!
//! Endpoints without a mock answer 404, which the source treats as "no data".

use std::time::Duration;

use chrono::NaiveDate;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fitsync::config::GarminSettings;
use fitsync::schema::{ActivityCategory, RecordType};
use fitsync::sources::{GarminSource, SourceSlot};
use fitsync::storage::{RunStatus, Storage};
use fitsync::sync::{SyncEngine, SyncOptions};

fn garmin_slot(server: &MockServer) -> SourceSlot {
    let settings = GarminSettings {
        access_token: "test-access-token".to_string(),
        base_url: server.uri(),
        display_name: Some("surfer".to_string()),
    };
    SourceSlot::Enabled(Box::new(
        GarminSource::new(&settings, Duration::from_secs(5), Duration::ZERO).unwrap(),
    ))
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
}

#[tokio::test]
async fn test_garmin_sync_writes_partitions() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/activitylist-service/activities/search/activities"))
        .and(header("Authorization", "Bearer test-access-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(include_str!("fixtures/activities_2024-03.json"))
                .insert_header("content-type", "application/json"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/usersummary-service/usersummary/daily/surfer"))
        .and(query_param("calendarDate", "2024-03-09"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(include_str!("fixtures/usersummary_2024-03-09.json"))
                .insert_header("content-type", "application/json"),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let engine = SyncEngine::new(Storage::open(dir.path()).unwrap(), vec![garmin_slot(&server)]);
    let summary = engine.run(SyncOptions::new(today())).await.unwrap();

    let report = summary.report("garmin").unwrap();
    assert_eq!(report.status, RunStatus::Success, "{report}");
    assert_eq!(report.records_written(), 3);

    let partitions = &engine.storage().partitions;
    let surfing = partitions
        .read(RecordType::Activity(ActivityCategory::Surfing))
        .unwrap();
    assert_eq!(surfing.len(), 1);
    assert_eq!(surfing[0].record.value("activity_id").render(), "14201837465");
    assert_eq!(surfing[0].record.value("avg_hr").as_f64(), Some(118.0));

    let running = partitions
        .read(RecordType::Activity(ActivityCategory::Running))
        .unwrap();
    assert_eq!(running.len(), 1);

    let health = partitions.read(RecordType::DailyHealth).unwrap();
    assert_eq!(health.len(), 1);
    assert_eq!(health[0].record.value("date").render(), "2024-03-09");
    assert_eq!(health[0].record.value("steps").as_f64(), Some(11234.0));

    let log = engine.storage().run_log.read_all().unwrap();
    assert_eq!(log[0].source, "garmin");
    assert_eq!(log[0].status, RunStatus::Success);
    assert_eq!(log[0].records_written, 3);
}

#[tokio::test]
async fn test_rejected_token_fails_garmin_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let engine = SyncEngine::new(Storage::open(dir.path()).unwrap(), vec![garmin_slot(&server)]);
    let summary = engine.run(SyncOptions::new(today())).await.unwrap();

    let report = summary.report("garmin").unwrap();
    assert_eq!(report.status, RunStatus::Failed);
    assert_eq!(report.records_written(), 0);
    assert!(report.error_detail().contains("garmin"));

    assert!(!engine.storage().partitions.exists(RecordType::DailyHealth));
    let derived = summary.report("derived").unwrap();
    assert_ne!(derived.status, RunStatus::Failed);
}

/// Activity list with one breathwork session and one run
async fn mount_activity_list(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/activitylist-service/activities/search/activities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "activityId": 7,
                "activityName": "Breathwork",
                "startTimeLocal": "2024-03-08 06:30:00",
                "activityType": {"typeKey": "breathwork"},
                "duration": 900.0
            },
            {
                "activityId": 8,
                "activityName": "Lisbon Running",
                "startTimeLocal": "2024-03-08 18:30:00",
                "activityType": {"typeKey": "running"},
                "duration": 2710.0
            }
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_failed_detail_keeps_decoded_row() {
    let dir = TempDir::new().unwrap();
    let breathwork = RecordType::Activity(ActivityCategory::Breathwork);

    let first = MockServer::start().await;
    mount_activity_list(&first).await;
    Mock::given(method("GET"))
        .and(path("/activity-service/activity/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "activityId": 7,
            "connectIQMeasurements": [
                {"developerFieldNumber": 0, "value": "4.0"},
                {"developerFieldNumber": 1, "value": "120.0"}
            ]
        })))
        .mount(&first)
        .await;

    let engine = SyncEngine::new(Storage::open(dir.path()).unwrap(), vec![garmin_slot(&first)]);
    let summary = engine.run(SyncOptions::new(today())).await.unwrap();
    assert_eq!(summary.report("garmin").unwrap().status, RunStatus::Success);
    let path = engine.storage().partitions.partition_path(breathwork);
    let decoded = std::fs::read_to_string(&path).unwrap();
    let rows = engine.storage().partitions.read(breathwork).unwrap();
    assert_eq!(rows[0].record.value("whm_rounds_total").as_i64(), Some(4));

    let second = MockServer::start().await;
    mount_activity_list(&second).await;
    Mock::given(method("GET"))
        .and(wiremock::matchers::path("/activity-service/activity/7"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&second)
        .await;

    let engine = SyncEngine::new(Storage::open(dir.path()).unwrap(), vec![garmin_slot(&second)]);
    let summary = engine.run(SyncOptions::new(today())).await.unwrap();

    let report = summary.report("garmin").unwrap();
    assert_eq!(report.status, RunStatus::Partial, "{report}");
    assert!(report.error_detail().contains("activity 7 detail"));
    assert!(report.error_detail().contains("running_activities=1"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), decoded);

    let log = engine.storage().run_log.read_all().unwrap();
    let last_garmin = log.iter().rev().find(|e| e.source == "garmin").unwrap();
    assert_eq!(last_garmin.status, RunStatus::Partial);
}
