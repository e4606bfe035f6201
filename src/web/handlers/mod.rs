use std::sync::Arc;

use salvo::prelude::*;
use serde_json::json;
use tracing::error;

use crate::db::DatabaseError;
use crate::web::WebState;

pub mod events;
pub mod gear;
pub mod health;
pub mod members;
pub mod metrics;
pub mod partybuilder;
pub mod posts;
pub mod rsvps;


pub(crate) fn render_error(res: &mut Response, status: StatusCode, message: &str) {
    res.status_code(status);
    res.render(Json(json!({ "error": message })));
}

pub(crate) fn render_db_error(res: &mut Response, err: DatabaseError) {
    match err {
        DatabaseError::NotFound(what) => {
            render_error(res, StatusCode::NOT_FOUND, &format!("{what} not found"))
        }
        DatabaseError::Conflict(message) => render_error(res, StatusCode::CONFLICT, &message),
        other => {
            error!("database error while serving request: {other}");
            render_error(
                res,
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("database error: {}", other),
            );
        }
    }
}

/// Renders a 500 when the state hoop is missing from the router.
pub(crate) fn web_state(depot: &Depot, res: &mut Response) -> Option<Arc<WebState>> {
    match depot.obtain::<Arc<WebState>>() {
        Ok(state) => Some(state.clone()),
        Err(_) => {
            render_error(
                res,
                StatusCode::INTERNAL_SERVER_ERROR,
                "web state is not initialized",
            );
            None
        }
    }
}

pub(crate) fn path_id(req: &mut Request, res: &mut Response, name: &str) -> Option<i64> {
    match req.param::<i64>(name) {
        Some(id) => Some(id),
        None => {
            render_error(
                res,
                StatusCode::BAD_REQUEST,
                &format!("path parameter {name} must be an integer"),
            );
            None
        }
    }
}

pub(crate) async fn json_body<T>(req: &mut Request, res: &mut Response) -> Option<T>
where
    T: serde::de::DeserializeOwned,
{
    match req.parse_json::<T>().await {
        Ok(body) => Some(body),
        Err(err) => {
            render_error(
                res,
                StatusCode::BAD_REQUEST,
                &format!("invalid request body: {err}"),
            );
            None
        }
    }
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
