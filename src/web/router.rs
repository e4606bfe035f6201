use std::sync::Arc;

use salvo::affix_state;
use salvo::prelude::*;

use super::WebState;
use super::handlers::{events, gear, health, members, metrics, partybuilder, posts, rsvps};

pub fn create_router(state: Arc<WebState>) -> Router {
    Router::new()
        .hoop(affix_state::inject(state))
        .push(Router::with_path("health").get(health::health_check))
        .push(Router::with_path("metrics").get(metrics::metrics))
        .push(
            Router::with_path("api")
                .push(
                    Router::with_path("members")
                        .get(members::list_members)
                        .post(members::create_member),
                )
                .push(
                    Router::with_path("members/{id}")
                        .get(members::get_member)
                        .put(members::update_member)
                        .delete(members::delete_member),
                )
                .push(Router::with_path("gear").get(gear::list_gear))
                .push(Router::with_path("gear/tokens").get(gear::token_calculator))
                .push(
                    Router::with_path("gear/{member_id}")
                        .get(gear::get_gear)
                        .put(gear::replace_gear),
                )
                .push(Router::with_path("gear/{member_id}/toggle").post(gear::toggle_slot))
                .push(Router::with_path("gear/{member_id}/opt-in").post(gear::toggle_opt_in))
                .push(
                    Router::with_path("events")
                        .get(events::list_events)
                        .post(events::upsert_event),
                )
                .push(
                    Router::with_path("events/{id}")
                        .get(events::get_event)
                        .delete(events::delete_event),
                )
                .push(Router::with_path("events/{id}/notify").post(events::notify_event))
                .push(
                    Router::with_path("event-rsvps")
                        .get(rsvps::list_rsvps)
                        .post(rsvps::upsert_rsvp)
                        .delete(rsvps::delete_rsvp),
                )
                .push(
                    Router::with_path("posts")
                        .get(posts::list_posts)
                        .post(posts::create_post),
                )
                .push(
                    Router::with_path("posts/{id}")
                        .get(posts::get_post)
                        .delete(posts::delete_post),
                )
                .push(
                    Router::with_path("posts/{id}/comments")
                        .get(posts::list_comments)
                        .post(posts::create_comment),
                )
                .push(
                    Router::with_path("partybuilder")
                        .get(partybuilder::get_board)
                        .put(partybuilder::save_board),
                ),
        )
}
