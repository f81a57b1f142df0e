//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use chrono::NaiveDateTime;

use super::AppState;
use super::types::{AllocationQuery, ErrorResponse, IndicesResponse};
use crate::community::{AllocationRecord, MemberSummary};
use crate::io::readings::parse_timestamp;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(error: String) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error }))
}

fn bound(name: &str, raw: Option<&str>) -> Result<Option<NaiveDateTime>, ApiError> {
    raw.map(|s| {
        parse_timestamp(s, None)
            .ok_or_else(|| bad_request(format!("`{name}` is not a valid timestamp: \"{s}\"")))
    })
    .transpose()
}

/// Returns community indices and run context.
///
/// `GET /indices` → 200 + `IndicesResponse` JSON
pub async fn get_indices(State(state): State<Arc<AppState>>) -> Json<IndicesResponse> {
    Json(IndicesResponse {
        tariff: state.tariff,
        groups: state.groups,
        rejected_groups: state.rejected_groups,
        indices: state.indices.clone(),
    })
}

/// Returns member summaries sorted by member.
///
/// `GET /members` → 200 + `Vec<MemberSummary>` JSON
pub async fn get_members(State(state): State<Arc<AppState>>) -> Json<Vec<MemberSummary>> {
    Json(state.members.clone())
}

/// Returns allocation records, optionally filtered by member and time range.
///
/// `GET /allocations` → 200 + `Vec<AllocationRecord>` JSON
/// `GET /allocations?member=A&from=2021-01-01 06:00&to=2021-01-01 18:00` → filtered (inclusive)
/// `GET /allocations?from=…&to=…` with `from > to` → 400 + `ErrorResponse`
pub async fn get_allocations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AllocationQuery>,
) -> Result<Json<Vec<AllocationRecord>>, ApiError> {
    let from = bound("from", query.from.as_deref())?;
    let to = bound("to", query.to.as_deref())?;

    if let Some((f, t)) = from.zip(to).filter(|(f, t)| f > t) {
        return Err(bad_request(format!("`from` ({f}) must be <= `to` ({t})")));
    }

    let records: Vec<AllocationRecord> = state
        .records
        .iter()
        .filter(|r| query.member.as_deref().is_none_or(|m| r.member == m))
        .filter(|r| from.is_none_or(|f| r.timestamp >= f))
        .filter(|r| to.is_none_or(|t| r.timestamp <= t))
        .cloned()
        .collect();

    Ok(Json(records))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    use super::*;
    use crate::api::router;
    use crate::community::{
        CommunityIndices, Reading, Tariff, UndefinedHandling, allocate_batch, summarize_members,
    };
    use chrono::NaiveDate;

    fn make_test_state() -> Arc<AppState> {
        let day = NaiveDate::from_ymd_opt(2021, 1, 1).expect("valid test date");
        let readings: Vec<Reading> = (0..24)
            .flat_map(|h| {
                let t = day.and_hms_opt(h, 0, 0).expect("valid test hour");
                let pv = if (8..16).contains(&h) { 3.0 } else { 0.0 };
                [
                    Reading::new("A", t, 2.0, 0.0, 0.0),
                    Reading::new("B", t, 0.5, pv, 0.0),
                ]
            })
            .collect();
        let tariff = Tariff::default();
        let outcome = allocate_batch(&readings, &tariff).expect("non-empty dataset");
        let records = outcome.records().cloned().collect::<Vec<_>>();
        let members = summarize_members(&records, UndefinedHandling::Skip);
        let indices = CommunityIndices::from_summaries(&members, UndefinedHandling::Skip);
        Arc::new(AppState {
            tariff,
            groups: outcome.groups.len(),
            rejected_groups: outcome.rejected.len(),
            indices,
            members,
            records,
        })
    }

    async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        let app = router(make_test_state());
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn indices_returns_200() {
        let (status, json) = get_json("/indices").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["groups"], 24);
        assert_eq!(json["rejected_groups"], 0);
        assert!(json["indices"].get("self_sufficiency").is_some());
        assert!(json["indices"]["fairness"].get("mc").is_some());
    }

    #[tokio::test]
    async fn members_sorted() {
        let (status, json) = get_json("/members").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json[0]["member"], "A");
        assert_eq!(json[1]["member"], "B");
    }

    #[tokio::test]
    async fn allocations_returns_full_table() {
        let (status, json) = get_json("/allocations").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().map(Vec::len), Some(48));
    }

    #[tokio::test]
    async fn allocations_member_and_range_filter() {
        let (status, json) =
            get_json("/allocations?member=B&from=2021-01-01%2005:00&to=2021-01-01%2010:00").await;
        assert_eq!(status, StatusCode::OK);
        let rows = json.as_array().expect("record array");
        assert_eq!(rows.len(), 6); // hours 5..=10
        assert!(rows.iter().all(|r| r["member"] == "B"));
        assert_eq!(rows[0]["timestamp"], "2021-01-01T05:00:00");
    }

    #[tokio::test]
    async fn allocations_invalid_range_returns_400() {
        let (status, json) =
            get_json("/allocations?from=2021-01-01%2010:00&to=2021-01-01%2005:00").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json.get("error").is_some());
    }

    #[tokio::test]
    async fn allocations_bad_timestamp_returns_400() {
        let (status, json) = get_json("/allocations?from=noon").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap_or("").contains("from"));
    }
}
