use salvo::prelude::*;

use super::web_state;

#[handler]
pub async fn metrics(depot: &mut Depot, res: &mut Response) {
    let Some(state) = web_state(depot, res) else {
        return;
    };
    res.render(Text::Plain(state.metrics.format_prometheus()));
}
