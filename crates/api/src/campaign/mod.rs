mod close_campaigns;
mod list_active_campaigns;
mod notification_sink;
pub mod process_reminder_job;
pub(crate) mod start_campaign;
pub mod strategies;

use actix_web::web;
use close_campaigns::{cancel_campaign_controller, dismiss_campaign_controller};
use list_active_campaigns::list_active_campaigns_controller;
use start_campaign::start_campaign_controller;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/campaigns", web::post().to(start_campaign_controller));
    cfg.route("/campaigns/cancel", web::post().to(cancel_campaign_controller));
    cfg.route(
        "/campaigns/dismiss",
        web::post().to(dismiss_campaign_controller),
    );
    cfg.route(
        "/owners/{owner_id}/campaigns",
        web::get().to(list_active_campaigns_controller),
    );
}
