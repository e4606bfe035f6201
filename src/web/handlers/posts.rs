use salvo::prelude::*;
use serde_json::json;

use super::{json_body, non_empty, path_id, render_db_error, render_error, web_state};
use crate::db::{NewBlogComment, NewBlogPost};

fn clean_post(input: NewBlogPost) -> Result<NewBlogPost, &'static str> {
    let title = input.title.trim().to_string();
    if title.is_empty() {
        return Err("title cannot be empty");
    }
    if input.content.trim().is_empty() {
        return Err("content cannot be empty");
    }
    let author_name = input.author_name.trim().to_string();
    if author_name.is_empty() {
        return Err("author_name cannot be empty");
    }
    Ok(NewBlogPost {
        title,
        content: input.content,
        category: input.category.trim().to_string(),
        author_name,
        image_url: non_empty(input.image_url),
    })
}

fn clean_comment(input: NewBlogComment) -> Result<NewBlogComment, &'static str> {
    if input.content.trim().is_empty() {
        return Err("content cannot be empty");
    }
    let commenter_name = input.commenter_name.trim().to_string();
    if commenter_name.is_empty() {
        return Err("commenter_name cannot be empty");
    }
    Ok(NewBlogComment {
        content: input.content,
        commenter_name,
    })
}

#[handler]
pub async fn list_posts(depot: &mut Depot, res: &mut Response) {
    let Some(state) = web_state(depot, res) else {
        return;
    };

    match state.db_manager.post_store().list_posts().await {
        Ok(posts) => res.render(Json(posts)),
        Err(err) => render_db_error(res, err),
    }
}

#[handler]
pub async fn create_post(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(state) = web_state(depot, res) else {
        return;
    };
    let Some(input) = json_body::<NewBlogPost>(req, res).await else {
        return;
    };
    let post = match clean_post(input) {
        Ok(post) => post,
        Err(message) => {
            render_error(res, StatusCode::BAD_REQUEST, message);
            return;
        }
    };

    match state.db_manager.post_store().create_post(&post).await {
        Ok(created) => {
            res.status_code(StatusCode::CREATED);
            res.render(Json(created));
        }
        Err(err) => render_db_error(res, err),
    }
}

#[handler]
pub async fn get_post(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(state) = web_state(depot, res) else {
        return;
    };
    let Some(id) = path_id(req, res, "id") else {
        return;
    };

    match state.db_manager.post_store().get_post(id).await {
        Ok(Some(post)) => res.render(Json(post)),
        Ok(None) => render_error(res, StatusCode::NOT_FOUND, "post not found"),
        Err(err) => render_db_error(res, err),
    }
}

#[handler]
pub async fn delete_post(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(state) = web_state(depot, res) else {
        return;
    };
    let Some(id) = path_id(req, res, "id") else {
        return;
    };

    match state.db_manager.post_store().delete_post(id).await {
        Ok(true) => res.render(Json(json!({ "deleted": true, "id": id }))),
        Ok(false) => render_error(res, StatusCode::NOT_FOUND, "post not found"),
        Err(err) => render_db_error(res, err),
    }
}

#[handler]
pub async fn list_comments(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(state) = web_state(depot, res) else {
        return;
    };
    let Some(id) = path_id(req, res, "id") else {
        return;
    };

    // An empty list would hide a mistyped post id.
    match state.db_manager.post_store().get_post(id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            render_error(res, StatusCode::NOT_FOUND, "post not found");
            return;
        }
        Err(err) => {
            render_db_error(res, err);
            return;
        }
    }

    match state.db_manager.comment_store().list_comments(id).await {
        Ok(comments) => res.render(Json(comments)),
        Err(err) => render_db_error(res, err),
    }
}

#[handler]
pub async fn create_comment(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(state) = web_state(depot, res) else {
        return;
    };
    let Some(id) = path_id(req, res, "id") else {
        return;
    };
    let Some(input) = json_body::<NewBlogComment>(req, res).await else {
        return;
    };
    let comment = match clean_comment(input) {
        Ok(comment) => comment,
        Err(message) => {
            render_error(res, StatusCode::BAD_REQUEST, message);
            return;
        }
    };

    match state.db_manager.comment_store().create_comment(id, &comment).await {
        Ok(created) => {
            res.status_code(StatusCode::CREATED);
            res.render(Json(created));
        }
        Err(err) => render_db_error(res, err),
    }
}
