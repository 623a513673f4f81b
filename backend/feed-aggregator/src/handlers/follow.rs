use actix_web::{post, web, HttpRequest, HttpResponse};

use super::bearer_token;
use crate::error::Result;
use crate::models::{FollowRequest, FollowResponse, Session};
use crate::services::FollowService;

#[post("")]
pub async fn set_follow(
    http_req: HttpRequest,
    body: web::Json<FollowRequest>,
    service: web::Data<FollowService>,
) -> Result<HttpResponse> {
    let token = bearer_token(&http_req)?;
    let req = body.into_inner();
    let session = Session::new(req.user_id, Some(token));

    let following = service
        .set_follow_state(&session, &req.target_id, req.follow)
        .await?;

    Ok(HttpResponse::Ok().json(FollowResponse { following }))
}
