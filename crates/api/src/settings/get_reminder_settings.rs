use crate::shared::{
    auth::protect_route,
    guard::Guard,
    usecase::{execute, UseCase},
};
use crate::error::FollowupError;
use actix_web::{web, HttpRequest, HttpResponse};
use followup_scheduler_api_structs::get_reminder_settings::{APIResponse, PathParams};
use followup_scheduler_domain::{ReminderKind, ReminderSettings};
use followup_scheduler_infra::FollowupContext;

pub async fn get_reminder_settings_controller(
    http_req: HttpRequest,
    path: web::Path<PathParams>,
    ctx: web::Data<FollowupContext>,
) -> Result<HttpResponse, FollowupError> {
    protect_route(&http_req, &ctx)?;
    let kind = Guard::against_unknown_kind(&path.kind)?;

    let usecase = GetReminderSettingsUseCase { kind };

    execute(usecase, &ctx)
        .await
        .map(|settings| HttpResponse::Ok().json(APIResponse::new(kind, settings)))
        .map_err(FollowupError::from)
}

#[derive(Debug)]
pub struct GetReminderSettingsUseCase {
    pub kind: ReminderKind,
}

#[derive(Debug)]
pub enum UseCaseError {
    StorageError,
}

impl From<UseCaseError> for FollowupError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for GetReminderSettingsUseCase {
    type Response = ReminderSettings;

    type Errors = UseCaseError;

    const NAME: &'static str = "GetReminderSettings";

    async fn execute(&mut self, ctx: &FollowupContext) -> Result<Self::Response, Self::Errors> {
        ctx.settings
            .get(self.kind, ctx.sys.get_timestamp_millis())
            .await
            .map_err(|_| UseCaseError::StorageError)
    }
}
