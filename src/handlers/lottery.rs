use crate::models::*;
use crate::services::{LotteryEntryService, LotteryExecutionService, LotteryStatsService};
use actix_web::{HttpMessage, HttpRequest, HttpResponse, ResponseError, Result, web};

/// 从请求扩展中获取用户ID（中间件在鉴权后注入）
fn get_user_id_from_request(req: &HttpRequest) -> Option<i64> {
    req.extensions().get::<i64>().copied()
}

#[utoipa::path(
    post,
    path = "/lottery/{session_id}/entries",
    tag = "lottery",
    params(
        ("session_id" = i64, Path, description = "抽选场次ID")
    ),
    request_body = SubmitEntryRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "报名成功", body = EntryGroupResponse),
        (status = 400, description = "窗口已关闭或请求不合法"),
        (status = 404, description = "场次或时段不存在"),
        (status = 409, description = "时段满员或场次已开抽"),
        (status = 422, description = "指定的模特不在名册内")
    )
)]
/// 提交整组报名（可跨多个时段，共用一个取消策略）
/// 已有报名时幂等转入修改路径，不会产生重复的组
pub async fn submit_entry(
    service: web::Data<LotteryEntryService>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<SubmitEntryRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    match service
        .submit_entry(path.into_inner(), user_id, &body.into_inner())
        .await
    {
        Ok(data) => Ok(HttpResponse::Ok().json(ApiResponse::success(data))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/lottery/{session_id}/entries",
    tag = "lottery",
    params(
        ("session_id" = i64, Path, description = "抽选场次ID")
    ),
    request_body = SubmitEntryRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "修改成功", body = EntryGroupResponse),
        (status = 400, description = "窗口已关闭"),
        (status = 404, description = "没有可修改的报名"),
        (status = 409, description = "修改次数用尽 / 时段满员 / 已开抽")
    )
)]
/// 整组替换报名内容（最多 3 次）
pub async fn update_entry(
    service: web::Data<LotteryEntryService>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<SubmitEntryRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    match service
        .update_entry(path.into_inner(), user_id, &body.into_inner())
        .await
    {
        Ok(data) => Ok(HttpResponse::Ok().json(ApiResponse::success(data))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/lottery/{session_id}/entries/me",
    tag = "lottery",
    params(
        ("session_id" = i64, Path, description = "抽选场次ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取本人报名成功", body = EntryGroupResponse),
        (status = 404, description = "尚未报名")
    )
)]
/// 查询本人在该场次的报名组
pub async fn get_user_entry(
    service: web::Data<LotteryEntryService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    match service.get_user_entry(path.into_inner(), user_id).await {
        Ok(data) => Ok(HttpResponse::Ok().json(ApiResponse::success(data))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/lottery/{session_id}/execute",
    tag = "lottery",
    params(
        ("session_id" = i64, Path, description = "抽选场次ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "抽选完成", body = ExecuteLotteryResponse),
        (status = 403, description = "非主办方"),
        (status = 409, description = "已抽选或正在抽选")
    )
)]
/// 执行抽选（主办方专用，整场一次）:
/// 1. open -> drawing 条件更新，并发第二次调用被拒绝
/// 2. 逐时段按权重不放回抽取
/// 3. 全部落库后场次置 completed
pub async fn execute_lottery(
    service: web::Data<LotteryExecutionService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    match service.execute_lottery(path.into_inner(), user_id).await {
        Ok(data) => Ok(HttpResponse::Ok().json(ApiResponse::success(data))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/lottery/{session_id}/materialize",
    tag = "lottery",
    params(
        ("session_id" = i64, Path, description = "抽选场次ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "物化完成", body = MaterializeWinnersResponse),
        (status = 403, description = "非主办方"),
        (status = 409, description = "尚未抽选")
    )
)]
/// 把中签结果物化为预约（主办方专用，可重复调用，幂等）
pub async fn materialize_winners(
    service: web::Data<LotteryExecutionService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    match service.materialize_winners(path.into_inner(), user_id).await {
        Ok(data) => Ok(HttpResponse::Ok().json(ApiResponse::success(data))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/lottery/{session_id}/entry-count",
    tag = "lottery",
    params(
        ("session_id" = i64, Path, description = "抽选场次ID")
    ),
    responses(
        (status = 200, description = "获取报名数成功", body = EntryCountResponse),
        (status = 404, description = "场次不存在")
    )
)]
/// 公开的报名数统计（无需登录，零报名返回空聚合）
pub async fn get_entry_count(
    service: web::Data<LotteryStatsService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.get_entry_count(path.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(ApiResponse::success(data))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/lottery/{session_id}/statistics",
    tag = "lottery",
    params(
        ("session_id" = i64, Path, description = "抽选场次ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取统计成功", body = LotteryStatisticsResponse),
        (status = 403, description = "非主办方")
    )
)]
/// 主办方专用的抽选统计
pub async fn get_lottery_statistics(
    service: web::Data<LotteryStatsService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    match service
        .get_lottery_statistics(path.into_inner(), user_id)
        .await
    {
        Ok(data) => Ok(HttpResponse::Ok().json(ApiResponse::success(data))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/lottery/{session_id}/winners",
    tag = "lottery",
    params(
        ("session_id" = i64, Path, description = "抽选场次ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取中签名单成功", body = WinnersResponse),
        (status = 403, description = "非主办方")
    )
)]
/// 主办方专用的中签名单（每时段按 won_at 升序）
pub async fn get_winners(
    service: web::Data<LotteryStatsService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    match service.get_winners(path.into_inner(), user_id).await {
        Ok(data) => Ok(HttpResponse::Ok().json(ApiResponse::success(data))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn lottery_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/lottery")
            .route("/{session_id}/entries", web::post().to(submit_entry))
            .route("/{session_id}/entries", web::put().to(update_entry))
            .route("/{session_id}/entries/me", web::get().to(get_user_entry))
            .route("/{session_id}/execute", web::post().to(execute_lottery))
            .route(
                "/{session_id}/materialize",
                web::post().to(materialize_winners),
            )
            .route("/{session_id}/entry-count", web::get().to(get_entry_count))
            .route(
                "/{session_id}/statistics",
                web::get().to(get_lottery_statistics),
            )
            .route("/{session_id}/winners", web::get().to(get_winners)),
    );
}
