use salvo::prelude::*;
use serde_json::json;

use super::{json_body, non_empty, path_id, render_db_error, render_error, web_state};
use crate::db::NewMember;

fn clean_member(input: NewMember) -> Result<NewMember, &'static str> {
    let display_name = input.display_name.trim().to_string();
    if display_name.is_empty() {
        return Err("display_name cannot be empty");
    }
    let discord_id = non_empty(input.discord_id);
    if let Some(id) = discord_id.as_deref() {
        if !id.chars().all(|c| c.is_ascii_digit()) {
            return Err("discord_id must be a numeric Discord user id");
        }
    }
    Ok(NewMember {
        display_name,
        discord_id,
        data_center: non_empty(input.data_center),
    })
}

#[handler]
pub async fn list_members(depot: &mut Depot, res: &mut Response) {
    let Some(state) = web_state(depot, res) else {
        return;
    };

    match state.db_manager.member_store().list_members().await {
        Ok(members) => res.render(Json(members)),
        Err(err) => render_db_error(res, err),
    }
}

#[handler]
pub async fn create_member(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(state) = web_state(depot, res) else {
        return;
    };
    let Some(input) = json_body::<NewMember>(req, res).await else {
        return;
    };
    let member = match clean_member(input) {
        Ok(member) => member,
        Err(message) => {
            render_error(res, StatusCode::BAD_REQUEST, message);
            return;
        }
    };

    match state.db_manager.member_store().create_member(&member).await {
        Ok(created) => {
            res.status_code(StatusCode::CREATED);
            res.render(Json(created));
        }
        Err(err) => render_db_error(res, err),
    }
}

#[handler]
pub async fn get_member(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(state) = web_state(depot, res) else {
        return;
    };
    let Some(id) = path_id(req, res, "id") else {
        return;
    };

    match state.db_manager.member_store().get_member(id).await {
        Ok(Some(member)) => res.render(Json(member)),
        Ok(None) => render_error(res, StatusCode::NOT_FOUND, "member not found"),
        Err(err) => render_db_error(res, err),
    }
}

#[handler]
pub async fn update_member(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(state) = web_state(depot, res) else {
        return;
    };
    let Some(id) = path_id(req, res, "id") else {
        return;
    };
    let Some(input) = json_body::<NewMember>(req, res).await else {
        return;
    };
    let member = match clean_member(input) {
        Ok(member) => member,
        Err(message) => {
            render_error(res, StatusCode::BAD_REQUEST, message);
            return;
        }
    };

    match state.db_manager.member_store().update_member(id, &member).await {
        Ok(updated) => res.render(Json(updated)),
        Err(err) => render_db_error(res, err),
    }
}

#[handler]
pub async fn delete_member(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(state) = web_state(depot, res) else {
        return;
    };
    let Some(id) = path_id(req, res, "id") else {
        return;
    };

    match state.db_manager.member_store().delete_member(id).await {
        Ok(true) => res.render(Json(json!({ "deleted": true, "id": id }))),
        Ok(false) => render_error(res, StatusCode::NOT_FOUND, "member not found"),
        Err(err) => render_db_error(res, err),
    }
}
