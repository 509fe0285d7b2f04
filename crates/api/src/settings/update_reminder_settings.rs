use crate::shared::{
    auth::protect_route,
    guard::Guard,
    usecase::{execute, UseCase},
};
use crate::error::FollowupError;
use actix_web::{web, HttpRequest, HttpResponse};
use followup_scheduler_api_structs::update_reminder_settings::{
    APIResponse, PathParams, RequestBody,
};
use followup_scheduler_domain::{ReminderKind, ReminderSettings};
use followup_scheduler_infra::{FollowupContext, UpdateSettingsError};

pub async fn update_reminder_settings_controller(
    http_req: HttpRequest,
    path: web::Path<PathParams>,
    body: web::Json<RequestBody>,
    ctx: web::Data<FollowupContext>,
) -> Result<HttpResponse, FollowupError> {
    protect_route(&http_req, &ctx)?;
    let kind = Guard::against_unknown_kind(&path.kind)?;

    let usecase = UpdateReminderSettingsUseCase {
        kind,
        settings: body.0,
    };

    execute(usecase, &ctx)
        .await
        .map(|settings| HttpResponse::Ok().json(APIResponse::new(kind, settings)))
        .map_err(FollowupError::from)
}

/// Replaces the settings of a kind. Running campaigns pick them up on their next reminder.
#[derive(Debug)]
pub struct UpdateReminderSettingsUseCase {
    pub kind: ReminderKind,
    pub settings: ReminderSettings,
}

#[derive(Debug)]
pub enum UseCaseError {
    InvalidSettings(String),
    StorageError,
}

impl From<UseCaseError> for FollowupError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::InvalidSettings(msg) => Self::BadClientData(msg),
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for UpdateReminderSettingsUseCase {
    type Response = ReminderSettings;

    type Errors = UseCaseError;

    const NAME: &'static str = "UpdateReminderSettings";

    async fn execute(&mut self, ctx: &FollowupContext) -> Result<Self::Response, Self::Errors> {
        let now = ctx.sys.get_timestamp_millis();
        match ctx.settings.update(self.kind, &self.settings, now).await {
            Ok(_) => Ok(self.settings.clone()),
            Err(UpdateSettingsError::Invalid(e)) => Err(UseCaseError::InvalidSettings(e.to_string())),
            Err(UpdateSettingsError::Storage(_)) => Err(UseCaseError::StorageError),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn it_stores_valid_settings() {
        let ctx = FollowupContext::create_inmemory();
        let mut settings = ReminderSettings::default_for(ReminderKind::Rnr);
        settings.total_days = 5;

        execute(
            UpdateReminderSettingsUseCase {
                kind: ReminderKind::Rnr,
                settings: settings.clone(),
            },
            &ctx,
        )
        .await
        .unwrap();

        let stored = ctx
            .settings
            .get(ReminderKind::Rnr, ctx.sys.get_timestamp_millis())
            .await
            .unwrap();
        assert_eq!(stored, settings);
    }

    #[actix_web::test]
    async fn it_rejects_invalid_settings() {
        let ctx = FollowupContext::create_inmemory();
        let mut settings = ReminderSettings::default_for(ReminderKind::Rnr);
        settings.reminders_per_day = 3;

        let res = execute(
            UpdateReminderSettingsUseCase {
                kind: ReminderKind::Rnr,
                settings,
            },
            &ctx,
        )
        .await;
        assert!(matches!(res, Err(UseCaseError::InvalidSettings(_))));
        assert_eq!(
            ctx.settings
                .get(ReminderKind::Rnr, 0)
                .await
                .unwrap()
                .reminders_per_day,
            2
        );
    }

    #[actix_web::test]
    async fn it_rejects_a_delay_that_would_overflow() {
        let ctx = FollowupContext::create_inmemory();
        let mut settings = ReminderSettings::default_for(ReminderKind::ProcessingStep);
        settings.inter_reminder_delay = i64::MAX / 1000;

        let res = execute(
            UpdateReminderSettingsUseCase {
                kind: ReminderKind::ProcessingStep,
                settings,
            },
            &ctx,
        )
        .await;
        assert!(matches!(res, Err(UseCaseError::InvalidSettings(_))));

        let mut settings = ReminderSettings::default_for(ReminderKind::Rnr);
        settings.escalation.after_days = u32::MAX;
        let res = execute(
            UpdateReminderSettingsUseCase {
                kind: ReminderKind::Rnr,
                settings,
            },
            &ctx,
        )
        .await;
        assert!(matches!(res, Err(UseCaseError::InvalidSettings(_))));
    }
}
