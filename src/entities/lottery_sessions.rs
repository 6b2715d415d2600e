use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 抽选场次状态
/// open -> drawing 由抽选执行的条件更新（CAS）完成，
/// 是并发执行互斥的唯一准入点
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(
    rs_type = "String",
    db_type = "Enum",
    enum_name = "lottery_session_status"
)]
#[serde(rename_all = "snake_case")]
pub enum LotterySessionStatus {
    #[sea_orm(string_value = "open")]
    Open,
    #[sea_orm(string_value = "drawing")]
    Drawing,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "closed")]
    Closed,
}

impl std::fmt::Display for LotterySessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LotterySessionStatus::Open => write!(f, "open"),
            LotterySessionStatus::Drawing => write!(f, "drawing"),
            LotterySessionStatus::Completed => write!(f, "completed"),
            LotterySessionStatus::Closed => write!(f, "closed"),
        }
    }
}

/// 抽选场次实体
/// 说明:
/// - 报名窗口为 [entry_start_time, entry_end_time)，右端开区间
/// - max_entries: 每时段报名上限 (NULL 表示不限)
/// - enable_model_selection: 是否允许报名时指定希望的模特
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lottery_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// 所属摄影会ID
    pub photo_session_id: i64,
    /// 报名开始时间（含）
    pub entry_start_time: DateTime<Utc>,
    /// 报名截止时间（不含）
    pub entry_end_time: DateTime<Utc>,
    /// 每时段报名上限 (NULL=不限)
    pub max_entries: Option<i32>,
    /// 是否开启模特指定
    pub enable_model_selection: bool,
    /// 场次状态
    pub status: LotterySessionStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    /// 报名窗口是否开放（左闭右开）
    pub fn entry_window_open(&self, now: DateTime<Utc>) -> bool {
        now >= self.entry_start_time && now < self.entry_end_time
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session(start_h: u32, end_h: u32, status: LotterySessionStatus) -> Model {
        Model {
            id: 1,
            photo_session_id: 1,
            entry_start_time: Utc.with_ymd_and_hms(2026, 1, 10, start_h, 0, 0).unwrap(),
            entry_end_time: Utc.with_ymd_and_hms(2026, 1, 10, end_h, 0, 0).unwrap(),
            max_entries: None,
            enable_model_selection: false,
            status,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_entry_window_boundaries() {
        let s = session(10, 12, LotterySessionStatus::Open);
        let start = Utc.with_ymd_and_hms(2026, 1, 10, 10, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).unwrap();
        // 左闭
        assert!(s.entry_window_open(start));
        // 右开
        assert!(!s.entry_window_open(end));
        assert!(s.entry_window_open(Utc.with_ymd_and_hms(2026, 1, 10, 11, 30, 0).unwrap()));
        assert!(!s.entry_window_open(Utc.with_ymd_and_hms(2026, 1, 10, 9, 59, 59).unwrap()));
    }
}
