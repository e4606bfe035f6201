use chrono::{DateTime, Utc};
use salvo::prelude::*;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::{json_body, non_empty, render_db_error, render_error, web_state};
use crate::db::Event;
use crate::parsers::{AnnouncementFormatter, is_valid_event_id};

/// Body of `POST /api/events`. Posting an existing id replaces that event.
#[derive(Debug, Deserialize)]
pub struct EventInput {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub max_participants: Option<i32>,
    #[serde(default)]
    pub party_id: Option<i64>,
}

impl EventInput {
    fn into_event(self) -> Result<Event, String> {
        let id = match non_empty(self.id) {
            Some(id) if is_valid_event_id(&id) => id,
            Some(id) => {
                return Err(format!(
                    "event id {id:?} may only contain letters, digits and hyphens"
                ));
            }
            None => uuid::Uuid::new_v4().to_string(),
        };
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err("title cannot be empty".to_string());
        }
        if self.ends_at < self.starts_at {
            return Err("ends_at must not be before starts_at".to_string());
        }
        if matches!(self.max_participants, Some(max) if max <= 0) {
            return Err("max_participants must be positive".to_string());
        }

        let now = Utc::now();
        Ok(Event {
            id,
            title,
            description: self.description,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            location: non_empty(self.location),
            max_participants: self.max_participants,
            party_id: self.party_id,
            created_at: now,
            updated_at: now,
        })
    }
}

fn path_event_id(req: &mut Request, res: &mut Response) -> Option<String> {
    match req.param::<String>("id") {
        Some(id) if is_valid_event_id(&id) => Some(id),
        _ => {
            render_error(res, StatusCode::BAD_REQUEST, "invalid event id");
            None
        }
    }
}

#[handler]
pub async fn list_events(depot: &mut Depot, res: &mut Response) {
    let Some(state) = web_state(depot, res) else {
        return;
    };

    match state.db_manager.event_store().list_events().await {
        Ok(events) => res.render(Json(events)),
        Err(err) => render_db_error(res, err),
    }
}

#[handler]
pub async fn upsert_event(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(state) = web_state(depot, res) else {
        return;
    };
    let Some(input) = json_body::<EventInput>(req, res).await else {
        return;
    };
    let event = match input.into_event() {
        Ok(event) => event,
        Err(message) => {
            render_error(res, StatusCode::BAD_REQUEST, &message);
            return;
        }
    };

    let store = state.db_manager.event_store();
    if let Err(err) = store.upsert_event(&event).await {
        render_db_error(res, err);
        return;
    }

    // read back so the response carries the stored created_at
    match store.get_event(&event.id).await {
        Ok(Some(stored)) => {
            res.status_code(StatusCode::CREATED);
            res.render(Json(stored));
        }
        Ok(None) => render_error(res, StatusCode::NOT_FOUND, "event not found"),
        Err(err) => render_db_error(res, err),
    }
}

#[handler]
pub async fn get_event(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(state) = web_state(depot, res) else {
        return;
    };
    let Some(id) = path_event_id(req, res) else {
        return;
    };

    match state.db_manager.event_store().get_event(&id).await {
        Ok(Some(event)) => res.render(Json(event)),
        Ok(None) => render_error(res, StatusCode::NOT_FOUND, "event not found"),
        Err(err) => render_db_error(res, err),
    }
}

#[handler]
pub async fn delete_event(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(state) = web_state(depot, res) else {
        return;
    };
    let Some(id) = path_event_id(req, res) else {
        return;
    };

    match state.db_manager.event_store().delete_event(&id).await {
        Ok(true) => res.render(Json(json!({ "deleted": true, "id": id }))),
        Ok(false) => render_error(res, StatusCode::NOT_FOUND, "event not found"),
        Err(err) => render_db_error(res, err),
    }
}

/// Posts the announcement whose reactions become RSVPs.
#[handler]
pub async fn notify_event(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(state) = web_state(depot, res) else {
        return;
    };
    let Some(id) = path_event_id(req, res) else {
        return;
    };

    let event = match state.db_manager.event_store().get_event(&id).await {
        Ok(Some(event)) => event,
        Ok(None) => {
            render_error(res, StatusCode::NOT_FOUND, "event not found");
            return;
        }
        Err(err) => {
            render_db_error(res, err);
            return;
        }
    };

    let Some(notifier) = state.notifier.clone() else {
        render_error(
            res,
            StatusCode::INTERNAL_SERVER_ERROR,
            "no announcement target is configured",
        );
        return;
    };

    let content = AnnouncementFormatter::announcement(&event);
    match notifier.announce(&content).await {
        Ok(message_id) => {
            info!(event_id = %event.id, "event announced on discord");
            res.render(Json(json!({
                "ok": true,
                "event_id": event.id,
                "message_id": message_id,
            })));
        }
        Err(err) => {
            warn!(event_id = %event.id, "failed to announce event: {err}");
            render_error(
                res,
                StatusCode::BAD_GATEWAY,
                &format!("failed to notify discord: {err}"),
            );
        }
    }
}
