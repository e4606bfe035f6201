use salvo::prelude::*;
use serde::Deserialize;
use serde_json::json;

use super::{json_body, render_db_error, render_error, web_state};
use crate::db::RsvpStatus;

#[derive(Debug, Deserialize)]
struct RsvpInput {
    event_id: String,
    member_id: i64,
    status: RsvpStatus,
}

fn required_event_id(req: &mut Request, res: &mut Response) -> Option<String> {
    match req.query::<String>("event_id") {
        Some(id) if !id.trim().is_empty() => Some(id.trim().to_string()),
        _ => {
            render_error(res, StatusCode::BAD_REQUEST, "event_id is required");
            None
        }
    }
}

#[handler]
pub async fn list_rsvps(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(state) = web_state(depot, res) else {
        return;
    };
    let Some(event_id) = required_event_id(req, res) else {
        return;
    };

    match state
        .db_manager
        .rsvp_store()
        .list_rsvps_for_event(&event_id)
        .await
    {
        Ok(rsvps) => res.render(Json(rsvps)),
        Err(err) => render_db_error(res, err),
    }
}

/// Same keyed upsert the reaction bridge uses, for changes made on the site.
#[handler]
pub async fn upsert_rsvp(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(state) = web_state(depot, res) else {
        return;
    };
    let Some(input) = json_body::<RsvpInput>(req, res).await else {
        return;
    };

    match state
        .db_manager
        .rsvp_store()
        .upsert_rsvp(&input.event_id, input.member_id, input.status)
        .await
    {
        Ok(rsvp) => res.render(Json(rsvp)),
        Err(err) => render_db_error(res, err),
    }
}

#[handler]
pub async fn delete_rsvp(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(state) = web_state(depot, res) else {
        return;
    };
    let Some(event_id) = required_event_id(req, res) else {
        return;
    };
    let Some(member_id) = req.query::<i64>("member_id") else {
        render_error(res, StatusCode::BAD_REQUEST, "member_id is required");
        return;
    };

    match state
        .db_manager
        .rsvp_store()
        .delete_rsvp(&event_id, member_id)
        .await
    {
        Ok(true) => res.render(Json(json!({ "deleted": true }))),
        Ok(false) => render_error(res, StatusCode::NOT_FOUND, "rsvp not found"),
        Err(err) => render_db_error(res, err),
    }
}
