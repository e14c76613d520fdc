//! Garmin Connect source
//!
//! Fetches the activity list for the window, activity details where a
//! category decodes developer fields, and per-day wellness and fitness
//! bundles. A failing sub-request is reported without dropping the rest.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use super::{FetchOutput, PacedClient, Source};
use crate::client::ApiClient;
use crate::config::GarminSettings;
use crate::error::{Result, SyncError};
use crate::normalize::activity::{activity_name, type_key};
use crate::normalize::{ItemKind, RawItem};
use crate::schema::{route, DATE_FORMAT};
use crate::sync::{RateLimiter, SyncWindow};

pub const NAME: &str = "garmin";

const PAGE_SIZE: usize = 100;

pub struct GarminSource {
    http: PacedClient,
    display_name: Option<String>,
}

impl GarminSource {
    pub fn new(settings: &GarminSettings, timeout: Duration, min_delay: Duration) -> Result<Self> {
        let client = ApiClient::new(&settings.base_url, &settings.access_token, timeout)?;
        Ok(Self {
            http: PacedClient::new(client, RateLimiter::new(min_delay)),
            display_name: settings.display_name.clone(),
        })
    }

    /// Display name for the wellness endpoints
    async fn display_name(&self) -> Result<String> {
        if let Some(ref name) = self.display_name {
            return Ok(name.clone());
        }
        let profile = self.http.get("/userprofile-service/socialProfile").await?;
        profile
            .get("displayName")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| SyncError::invalid_response("Could not get display name"))
    }

    /// Activities started inside the window, newest first
    async fn fetch_activities(&self, window: &SyncWindow) -> Result<Vec<Value>> {
        let mut activities = Vec::new();
        let mut start = 0;

        loop {
            let path = format!(
                "/activitylist-service/activities/search/activities?limit={}&start={}&startDate={}&endDate={}",
                PAGE_SIZE, start, window.start, window.end
            );
            let page = self.http.get_optional(&path).await?.unwrap_or(Value::Null);
            let Some(page) = page.as_array() else {
                break;
            };

            let mut reached_older = false;
            for activity in page {
                match activity_date(activity) {
                    Some(date) if window.contains(date) => activities.push(activity.clone()),
                    Some(date) if date < window.start => reached_older = true,
                    Some(_) => {}
                    None => warn!("activity without a start time, skipping"),
                }
            }

            if page.len() < PAGE_SIZE || reached_older {
                break;
            }
            start += PAGE_SIZE;
        }

        debug!(count = activities.len(), "fetched activity list");
        Ok(activities)
    }

    /// Merge the detail payload into the summary for developer-field categories.
    ///
    /// A failed detail request fails the activity: emitting the bare summary
    /// would overwrite previously decoded columns.
    async fn with_detail(&self, mut activity: Value) -> Result<Value> {
        let category = route(type_key(&activity), activity_name(&activity));
        if category.variant().decode.is_empty() {
            return Ok(activity);
        }
        let Some(id) = activity.get("activityId").map(render_id) else {
            return Ok(activity);
        };

        let detail = self
            .http
            .get_optional(&format!("/activity-service/activity/{}", id))
            .await?;
        if let (Some(Value::Object(detail)), Value::Object(summary)) = (detail, &mut activity) {
            for (key, value) in detail {
                summary.entry(key).or_insert(value);
            }
        }
        Ok(activity)
    }

    async fn fetch_daily_health(
        &self,
        display_name: &str,
        date: NaiveDate,
    ) -> Result<Option<Value>> {
        let d = date.format(DATE_FORMAT).to_string();
        let parts = [
            (
                "summary",
                format!("/usersummary-service/usersummary/daily/{display_name}?calendarDate={d}"),
            ),
            (
                "sleep",
                format!("/wellness-service/wellness/dailySleepData/{display_name}?date={d}"),
            ),
            ("stress", format!("/wellness-service/wellness/dailyStress/{d}")),
            ("hrv", format!("/hrv-service/hrv/{d}")),
            (
                "body_battery",
                format!("/wellness-service/wellness/bodyBattery/reports/daily?startDate={d}&endDate={d}"),
            ),
            ("respiration", format!("/wellness-service/wellness/daily/respiration/{d}")),
        ];
        self.fetch_bundle(&d, &parts).await
    }

    async fn fetch_physiological(&self, date: NaiveDate) -> Result<Option<Value>> {
        let d = date.format(DATE_FORMAT).to_string();
        let parts = [
            ("max_metrics", format!("/metrics-service/metrics/maxmet/daily/{d}/{d}")),
            (
                "training_status",
                format!("/metrics-service/metrics/trainingstatus/aggregated/{d}"),
            ),
            (
                "training_readiness",
                format!("/metrics-service/metrics/trainingreadiness/{d}"),
            ),
        ];
        self.fetch_bundle(&d, &parts).await
    }

    /// Fetch named parts into `{"date": .., part: ..}`; `None` if every part is empty
    async fn fetch_bundle(&self, date: &str, parts: &[(&str, String)]) -> Result<Option<Value>> {
        let mut bundle = Map::new();
        bundle.insert("date".to_string(), json!(date));
        let mut any = false;
        for (name, path) in parts {
            let value = self.http.get_optional(path).await?;
            any |= value.is_some();
            bundle.insert(name.to_string(), value.unwrap_or(Value::Null));
        }
        Ok(any.then_some(Value::Object(bundle)))
    }
}

#[async_trait]
impl Source for GarminSource {
    fn name(&self) -> &str {
        NAME
    }

    async fn fetch(&self, window: &SyncWindow) -> Result<FetchOutput> {
        let mut output = FetchOutput::default();

        match self.fetch_activities(window).await {
            Ok(activities) => {
                for activity in activities {
                    let id = activity
                        .get("activityId")
                        .map(render_id)
                        .unwrap_or_default();
                    match self.with_detail(activity).await {
                        Ok(activity) => {
                            output.items.push(RawItem::new(ItemKind::Activity, activity))
                        }
                        Err(e) => output.fail(format!("activity {id} detail"), &e),
                    }
                }
            }
            Err(e) => output.fail("activities", &e),
        }

        match self.display_name().await {
            Ok(display_name) => {
                for date in window.days() {
                    match self.fetch_daily_health(&display_name, date).await {
                        Ok(Some(bundle)) => output
                            .items
                            .push(RawItem::new(ItemKind::DailyHealth, bundle)),
                        Ok(None) => debug!(%date, "no daily health data"),
                        Err(e) => output.fail(format!("daily_health {date}"), &e),
                    }
                }
            }
            Err(e) => output.fail("daily_health", &e),
        }

        for date in window.days() {
            match self.fetch_physiological(date).await {
                Ok(Some(bundle)) => output
                    .items
                    .push(RawItem::new(ItemKind::Physiological, bundle)),
                Ok(None) => debug!(%date, "no physiological data"),
                Err(e) => output.fail(format!("physiological {date}"), &e),
            }
        }

        info!(
            items = output.items.len(),
            failures = output.failures.len(),
            "garmin fetch complete"
        );
        output.into_result(NAME)
    }
}

fn activity_date(activity: &Value) -> Option<NaiveDate> {
    let start = activity.get("startTimeLocal")?.as_str()?;
    NaiveDate::parse_from_str(start.get(..10)?, DATE_FORMAT).ok()
}

fn render_id(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::RunMode;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(server: &MockServer) -> GarminSource {
        let settings = GarminSettings {
            access_token: "token".to_string(),
            base_url: server.uri(),
            display_name: Some("TestUser".to_string()),
        };
        GarminSource::new(&settings, Duration::from_secs(5), Duration::ZERO).unwrap()
    }

    fn window() -> SyncWindow {
        let mut window = SyncWindow::new(
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            RunMode::Incremental,
        );
        window.start = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        window
    }

    #[test]
    fn test_activity_date() {
        let activity = json!({"startTimeLocal": "2024-03-09 07:15:00"});
        assert_eq!(activity_date(&activity), NaiveDate::from_ymd_opt(2024, 3, 9));
        assert_eq!(activity_date(&json!({})), None);
    }

    #[tokio::test]
    async fn test_activities_filtered_to_window() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/activitylist-service/activities/search/activities"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"activityId": 2, "startTimeLocal": "2024-03-10 08:00:00",
                 "activityType": {"typeKey": "running"}},
                {"activityId": 1, "startTimeLocal": "2024-03-01 08:00:00",
                 "activityType": {"typeKey": "running"}}
            ])))
            .mount(&server)
            .await;

        let activities = source(&server).fetch_activities(&window()).await.unwrap();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0]["activityId"], 2);
    }

    #[tokio::test]
    async fn test_detail_merged_for_breathwork() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/activity-service/activity/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "activityId": 7,
                "connectIQMeasurements": [{"developerFieldNumber": 0, "value": "4"}]
            })))
            .mount(&server)
            .await;

        let summary = json!({"activityId": 7, "activityType": {"typeKey": "breathwork"}});
        let merged = source(&server).with_detail(summary).await.unwrap();
        assert!(merged["connectIQMeasurements"].is_array());
        assert_eq!(merged["activityType"]["typeKey"], "breathwork");
    }

    #[tokio::test]
    async fn test_failed_detail_fails_activity() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/activity-service/activity/7"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let summary = json!({"activityId": 7, "activityType": {"typeKey": "breathwork"}});
        let result = source(&server).with_detail(summary).await;
        assert!(matches!(result, Err(SyncError::Api { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_missing_day_yields_no_bundle() {
        let server = MockServer::start().await;
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let bundle = source(&server).fetch_physiological(date).await.unwrap();
        assert!(bundle.is_none());
    }
}
