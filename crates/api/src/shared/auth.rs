use crate::error::FollowupError;
use actix_web::HttpRequest;
use followup_scheduler_infra::FollowupContext;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Only callers that know the configured api key are let through
pub fn protect_route(req: &HttpRequest, ctx: &FollowupContext) -> Result<(), FollowupError> {
    let api_key = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match api_key {
        Some(api_key) if api_key == ctx.config.api_key => Ok(()),
        Some(_) => Err(FollowupError::Unauthorized(
            "The provided api key is not valid".into(),
        )),
        None => Err(FollowupError::Unauthorized(format!(
            "Missing the `{}` header",
            API_KEY_HEADER
        ))),
    }
}
