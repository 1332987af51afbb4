//! Call history endpoints.

use axum::{extract::Query, response::Json, routing::get, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::error::ApiResult;
use crate::db::{self, calls::CallRepository};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

pub fn router() -> Router {
    Router::new().route("/", get(list_calls))
}

async fn list_calls(Query(query): Query<ListQuery>) -> ApiResult<Json<Value>> {
    let conn = db::init_db()?;
    let records = CallRepository::list(&conn, query.limit)?;

    let calls: Vec<Value> = records
        .into_iter()
        .map(|r| {
            json!({
                "call_id": r.call_id,
                "call_session_id": r.call_session_id,
                "agent_name": r.agent_name,
                "status": r.status,
                "transcript_text": r.transcript_text,
                "error": r.error,
                "started_at": r.started_at,
                "ended_at": r.ended_at,
            })
        })
        .collect();

    Ok(Json(json!({ "calls": calls })))
}
