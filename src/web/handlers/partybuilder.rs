use salvo::prelude::*;
use serde::Deserialize;
use serde_json::json;

use super::{json_body, render_db_error, render_error, web_state};

#[derive(Debug, Deserialize)]
struct SaveBoard {
    partybuilder: serde_json::Value,
}

/// Returns the saved board exactly as it was stored.
#[handler]
pub async fn get_board(depot: &mut Depot, res: &mut Response) {
    let Some(state) = web_state(depot, res) else {
        return;
    };

    match state.db_manager.party_store().get_party_snapshot().await {
        Ok(Some(snapshot)) => res.render(Json(snapshot.data)),
        Ok(None) => render_error(res, StatusCode::NOT_FOUND, "party board has not been saved"),
        Err(err) => render_db_error(res, err),
    }
}

#[handler]
pub async fn save_board(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(state) = web_state(depot, res) else {
        return;
    };
    let Some(body) = json_body::<SaveBoard>(req, res).await else {
        return;
    };
    if body.partybuilder.is_null() {
        render_error(res, StatusCode::BAD_REQUEST, "partybuilder cannot be null");
        return;
    }

    match state
        .db_manager
        .party_store()
        .save_party_snapshot(&body.partybuilder)
        .await
    {
        Ok(snapshot) => res.render(Json(json!({
            "success": true,
            "updated_at": snapshot.updated_at,
        }))),
        Err(err) => render_db_error(res, err),
    }
}
