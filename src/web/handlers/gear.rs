use std::str::FromStr;

use salvo::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{json_body, path_id, render_db_error, render_error, web_state};
use crate::gear::{
    GearSet, GearSlot, GearStatus, RaidTier, cost_table, highest_cleared_tier, tokens_needed,
    total_cost,
};
use crate::web::WebState;

/// A member's gear snapshot with the derived eligibility fields.
#[derive(Debug, Serialize)]
pub struct GearReport {
    pub member_id: i64,
    pub opt_in: bool,
    pub gear: GearSet,
    pub needed_tiers: Vec<RaidTier>,
    pub cleared_tier: u8,
}

impl From<GearStatus> for GearReport {
    fn from(status: GearStatus) -> Self {
        Self {
            needed_tiers: status.needed_tiers(),
            cleared_tier: highest_cleared_tier(&status.gear),
            member_id: status.member_id,
            opt_in: status.opt_in,
            gear: status.gear.normalized(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GearSnapshot {
    #[serde(default)]
    opt_in: bool,
    #[serde(default)]
    gear: GearSet,
}

/// Stored snapshot, or an empty one for members who never saved gear.
async fn load_status(
    state: &WebState,
    res: &mut Response,
    member_id: i64,
) -> Option<GearStatus> {
    match state.db_manager.member_store().get_member(member_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            render_error(res, StatusCode::NOT_FOUND, "member not found");
            return None;
        }
        Err(err) => {
            render_db_error(res, err);
            return None;
        }
    }

    match state.db_manager.gear_store().get_gear_status(member_id).await {
        Ok(status) => Some(status.unwrap_or_else(|| GearStatus::empty(member_id))),
        Err(err) => {
            render_db_error(res, err);
            None
        }
    }
}

async fn save_and_render(state: &WebState, res: &mut Response, status: GearStatus) {
    match state.db_manager.gear_store().save_gear_status(&status).await {
        Ok(()) => res.render(Json(GearReport::from(status))),
        Err(err) => render_db_error(res, err),
    }
}

#[handler]
pub async fn list_gear(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(state) = web_state(depot, res) else {
        return;
    };
    let opt_in_only = req.query::<bool>("opt_in").unwrap_or(false);

    match state.db_manager.gear_store().list_gear_statuses().await {
        Ok(statuses) => {
            let reports: Vec<GearReport> = statuses
                .into_iter()
                .filter(|status| !opt_in_only || status.opt_in)
                .map(GearReport::from)
                .collect();
            res.render(Json(reports));
        }
        Err(err) => render_db_error(res, err),
    }
}

#[handler]
pub async fn get_gear(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(state) = web_state(depot, res) else {
        return;
    };
    let Some(member_id) = path_id(req, res, "member_id") else {
        return;
    };

    if let Some(status) = load_status(&state, res, member_id).await {
        res.render(Json(GearReport::from(status)));
    }
}

#[handler]
pub async fn replace_gear(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(state) = web_state(depot, res) else {
        return;
    };
    let Some(member_id) = path_id(req, res, "member_id") else {
        return;
    };
    let Some(snapshot) = json_body::<GearSnapshot>(req, res).await else {
        return;
    };

    let status = GearStatus {
        member_id,
        opt_in: snapshot.opt_in,
        gear: snapshot.gear.normalized(),
    };
    save_and_render(&state, res, status).await;
}

#[handler]
pub async fn toggle_slot(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(state) = web_state(depot, res) else {
        return;
    };
    let Some(member_id) = path_id(req, res, "member_id") else {
        return;
    };
    let slot = match req.query::<String>("slot").map(|raw| GearSlot::from_str(&raw)) {
        Some(Ok(slot)) => slot,
        Some(Err(err)) => {
            render_error(res, StatusCode::BAD_REQUEST, &err.to_string());
            return;
        }
        None => {
            render_error(res, StatusCode::BAD_REQUEST, "missing slot query parameter");
            return;
        }
    };

    let Some(mut status) = load_status(&state, res, member_id).await else {
        return;
    };
    status.toggle(slot);
    save_and_render(&state, res, status).await;
}

#[handler]
pub async fn toggle_opt_in(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(state) = web_state(depot, res) else {
        return;
    };
    let Some(member_id) = path_id(req, res, "member_id") else {
        return;
    };

    let Some(mut status) = load_status(&state, res, member_id).await else {
        return;
    };
    status.toggle_opt_in();
    save_and_render(&state, res, status).await;
}

#[handler]
pub async fn token_calculator(req: &mut Request, res: &mut Response) {
    let raw_slots = req.query::<String>("slots").unwrap_or_default();
    let mut slots = Vec::new();
    for raw in raw_slots.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match GearSlot::from_str(raw) {
            Ok(slot) => slots.push(slot),
            Err(err) => {
                render_error(res, StatusCode::BAD_REQUEST, &err.to_string());
                return;
            }
        }
    }
    let owned = req.query::<u32>("owned").unwrap_or(0);

    res.render(Json(json!({
        "slots": slots,
        "owned": owned,
        "total_cost": total_cost(&slots),
        "tokens_needed": tokens_needed(&slots, owned),
        "costs": cost_table(),
    })));
}
