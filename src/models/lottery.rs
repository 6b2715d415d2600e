use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{
    CancellationPolicy, EntryGroupStatus, SlotEntryStatus, entry_group_entity as group_entity,
    slot_entry_entity as entry_entity,
};

/// 单个时段的报名请求
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SlotEntryRequest {
    /// 时段ID
    pub slot_id: i64,
    /// 希望的模特ID（场次开启模特指定时可填）
    pub preferred_model_id: Option<i64>,
    /// 无签名拍立得张数
    #[serde(default)]
    pub cheki_unsigned_count: i32,
    /// 签名拍立得张数
    #[serde(default)]
    pub cheki_signed_count: i32,
}

/// 报名 / 修改请求（整组提交，取消策略为组级）
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SubmitEntryRequest {
    /// 取消策略
    pub cancellation_policy: CancellationPolicy,
    /// 各时段的报名明细
    pub entries: Vec<SlotEntryRequest>,
}

/// 时段报名响应
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SlotEntryResponse {
    pub id: i64,
    pub slot_id: i64,
    pub preferred_model_id: Option<i64>,
    pub cheki_unsigned_count: i32,
    pub cheki_signed_count: i32,
    pub lottery_weight: f64,
    pub status: SlotEntryStatus,
    pub won_at: Option<DateTime<Utc>>,
}

impl From<entry_entity::Model> for SlotEntryResponse {
    fn from(m: entry_entity::Model) -> Self {
        SlotEntryResponse {
            id: m.id,
            slot_id: m.slot_id,
            preferred_model_id: m.preferred_model_id,
            cheki_unsigned_count: m.cheki_unsigned_count,
            cheki_signed_count: m.cheki_signed_count,
            lottery_weight: m.lottery_weight,
            status: m.status,
            won_at: m.won_at,
        }
    }
}

/// 报名组响应（含全部子条目）
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EntryGroupResponse {
    pub id: i64,
    pub lottery_session_id: i64,
    pub user_id: i64,
    pub cancellation_policy: CancellationPolicy,
    pub total_slots_applied: i32,
    /// 已用修改次数 (上限 3)
    pub update_count: i32,
    pub status: EntryGroupStatus,
    pub entries: Vec<SlotEntryResponse>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl EntryGroupResponse {
    /// 组 + 子条目归一化为一个 DTO（边界处统一 join 结果形状）
    pub fn from_parts(group: group_entity::Model, entries: Vec<entry_entity::Model>) -> Self {
        EntryGroupResponse {
            id: group.id,
            lottery_session_id: group.lottery_session_id,
            user_id: group.user_id,
            cancellation_policy: group.cancellation_policy,
            total_slots_applied: group.total_slots_applied,
            update_count: group.update_count,
            status: group.status,
            entries: entries.into_iter().map(Into::into).collect(),
            created_at: group.created_at,
            updated_at: group.updated_at,
        }
    }
}

/// 抽选执行结果
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExecuteLotteryResponse {
    /// 全部时段中签总数
    pub total_winners: i64,
    /// 参与抽选的报名总数
    pub total_entries: i64,
}

/// 预约物化结果
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MaterializeWinnersResponse {
    pub bookings_created: i64,
}

/// 单时段报名数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SlotEntryCount {
    pub slot_id: i64,
    pub slot_number: i32,
    pub entry_count: i64,
}

/// 公开的报名数统计（零报名时各项为空 / 0，不报错）
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EntryCountResponse {
    pub total_entries: i64,
    pub total_groups: i64,
    pub entries_by_slot: Vec<SlotEntryCount>,
}

/// 模特人气直方图的一项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ModelPreferenceCount {
    pub model_id: i64,
    pub model_name: String,
    pub count: i64,
}

/// 拍立得张数合计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ChekiTotals {
    pub unsigned: i64,
    pub signed: i64,
}

/// 取消策略分布
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct PolicyDistribution {
    pub all_or_nothing: i64,
    pub partial_ok: i64,
}

/// 主办方专用的抽选统计
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LotteryStatisticsResponse {
    pub total_entries: i64,
    pub total_groups: i64,
    pub entries_by_slot: Vec<SlotEntryCount>,
    pub model_preferences: Vec<ModelPreferenceCount>,
    pub cheki_totals: ChekiTotals,
    pub policy_distribution: PolicyDistribution,
}

/// 中签者（含用户与预约关联）
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WinnerResponse {
    pub slot_entry_id: i64,
    pub user_id: i64,
    pub nickname: String,
    /// 已物化则为预约ID
    pub booking_id: Option<i64>,
    pub preferred_model_id: Option<i64>,
    pub preferred_model_name: Option<String>,
    pub won_at: Option<DateTime<Utc>>,
}

/// 单时段的中签名单（won_at 升序，无 won_at 排最后）
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SlotWinners {
    pub slot_id: i64,
    pub slot_number: i32,
    pub winners: Vec<WinnerResponse>,
}

/// 中签名单响应
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WinnersResponse {
    pub slots: Vec<SlotWinners>,
}
