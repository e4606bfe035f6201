use salvo::prelude::*;
use serde_json::json;

use super::web_state;

#[handler]
pub async fn health_check(depot: &mut Depot, res: &mut Response) {
    let Some(state) = web_state(depot, res) else {
        return;
    };

    res.render(Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "database": format!("{:?}", state.db_manager.db_type()).to_lowercase(),
        "notifier": state.notifier.is_some(),
    })));
}
