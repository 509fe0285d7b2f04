use followup_scheduler_api::Application;
use followup_scheduler_infra::{Config, FollowupContext, ManualSys};
use followup_scheduler_sdk::FollowupSDK;
use std::sync::Arc;

pub struct TestApp {
    pub config: Config,
    /// Shares the repositories with the running application
    pub ctx: FollowupContext,
    pub sys: Arc<ManualSys>,
}

// Launch the application as a background task
pub async fn spawn_app(now: i64) -> (TestApp, FollowupSDK, String) {
    let sys = Arc::new(ManualSys::new(now));
    let mut ctx = FollowupContext::create_inmemory();
    ctx.sys = sys.clone();
    ctx.config.port = 0; // Random port
    ctx.config.reminder_jobs_poll_interval_millis = 20;

    let config = ctx.config.clone();
    let application = Application::new(ctx.clone())
        .await
        .expect("Failed to build application.");

    let address = format!("http://localhost:{}", application.port());
    actix_web::rt::spawn(async move {
        application
            .start()
            .await
            .expect("Expected application to start");
    });

    let sdk = FollowupSDK::new(address.clone(), config.api_key.clone());
    let app = TestApp { config, ctx, sys };
    (app, sdk, address)
}
