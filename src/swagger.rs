use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{CancellationPolicy, EntryGroupStatus, LotterySessionStatus, SlotEntryStatus};
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        )
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::lottery::submit_entry,
        handlers::lottery::update_entry,
        handlers::lottery::get_user_entry,
        handlers::lottery::execute_lottery,
        handlers::lottery::materialize_winners,
        handlers::lottery::get_entry_count,
        handlers::lottery::get_lottery_statistics,
        handlers::lottery::get_winners,
    ),
    components(
        schemas(
            SubmitEntryRequest,
            SlotEntryRequest,
            EntryGroupResponse,
            SlotEntryResponse,
            ExecuteLotteryResponse,
            MaterializeWinnersResponse,
            EntryCountResponse,
            SlotEntryCount,
            LotteryStatisticsResponse,
            ModelPreferenceCount,
            ChekiTotals,
            PolicyDistribution,
            WinnersResponse,
            SlotWinners,
            WinnerResponse,
            CancellationPolicy,
            EntryGroupStatus,
            LotterySessionStatus,
            SlotEntryStatus,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "lottery", description = "多时段加权抽选")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    );
}
