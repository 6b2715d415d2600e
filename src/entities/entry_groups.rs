use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 报名组修改次数上限
pub const MAX_UPDATE_COUNT: i32 = 3;

/// 取消策略
/// - all_or_nothing: 组内任一时段落选则全组不生成预约
/// - partial_ok: 各中签时段各自独立生成预约
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "cancellation_policy")]
#[serde(rename_all = "snake_case")]
pub enum CancellationPolicy {
    #[sea_orm(string_value = "all_or_nothing")]
    AllOrNothing,
    #[sea_orm(string_value = "partial_ok")]
    PartialOk,
}

impl std::fmt::Display for CancellationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CancellationPolicy::AllOrNothing => write!(f, "all_or_nothing"),
            CancellationPolicy::PartialOk => write!(f, "partial_ok"),
        }
    }
}

/// 报名组状态（抽选执行时冻结）
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "entry_group_status")]
#[serde(rename_all = "snake_case")]
pub enum EntryGroupStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "frozen")]
    Frozen,
}

impl std::fmt::Display for EntryGroupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryGroupStatus::Active => write!(f, "active"),
            EntryGroupStatus::Frozen => write!(f, "frozen"),
        }
    }
}

/// 报名组实体
/// 说明:
/// - 一个用户在一个抽选场次下只有一个组 (session, user 唯一)
/// - 修改时整组替换子条目并递增 update_count (上限 3 次)
/// - total_slots_applied 必须等于组内子条目数
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "entry_groups")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub lottery_session_id: i64,
    pub user_id: i64,
    /// 取消策略（组级，覆盖组内全部时段）
    pub cancellation_policy: CancellationPolicy,
    /// 报名时段数（= 子条目数）
    pub total_slots_applied: i32,
    /// 已修改次数 (0..=3)
    pub update_count: i32,
    pub status: EntryGroupStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    /// 是否还有剩余修改次数
    pub fn can_revise(&self) -> bool {
        self.update_count < MAX_UPDATE_COUNT
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "crate::entities::slot_entry_entity::Entity")]
    SlotEntries,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(update_count: i32) -> Model {
        Model {
            id: 1,
            lottery_session_id: 1,
            user_id: 1,
            cancellation_policy: CancellationPolicy::PartialOk,
            total_slots_applied: 1,
            update_count,
            status: EntryGroupStatus::Active,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_can_revise_below_limit() {
        assert!(group(0).can_revise());
        assert!(group(2).can_revise());
    }

    #[test]
    fn test_fourth_revision_rejected() {
        // 已修改 3 次后不再接受第 4 次
        assert!(!group(MAX_UPDATE_COUNT).can_revise());
    }
}

impl Related<crate::entities::slot_entry_entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SlotEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
