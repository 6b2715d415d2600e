use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 时段报名状态
/// entered -> won / lost 由抽选执行一次性迁移，之后不再变化
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "slot_entry_status")]
#[serde(rename_all = "snake_case")]
pub enum SlotEntryStatus {
    #[sea_orm(string_value = "entered")]
    Entered,
    #[sea_orm(string_value = "won")]
    Won,
    #[sea_orm(string_value = "lost")]
    Lost,
}

impl std::fmt::Display for SlotEntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotEntryStatus::Entered => write!(f, "entered"),
            SlotEntryStatus::Won => write!(f, "won"),
            SlotEntryStatus::Lost => write!(f, "lost"),
        }
    }
}

/// 时段报名实体（报名组的子条目）
/// 说明:
/// - lottery_weight: 抽选权重，中签概率与其成正比 (>= 0，默认 1.0)
/// - preferred_model_id: 希望的模特 (场次开启模特指定时才有意义)
/// - cheki_*_count: 报名时申报的拍立得张数（签名 / 无签名）
/// - won_at: 中签时间，用于中签名单排序
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "slot_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub lottery_session_id: i64,
    pub entry_group_id: i64,
    pub slot_id: i64,
    pub user_id: i64,
    /// 希望的模特ID (NULL=不指定)
    pub preferred_model_id: Option<i64>,
    /// 无签名拍立得张数
    pub cheki_unsigned_count: i32,
    /// 签名拍立得张数
    pub cheki_signed_count: i32,
    /// 抽选权重
    pub lottery_weight: f64,
    pub status: SlotEntryStatus,
    /// 中签时间
    pub won_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::entities::entry_group_entity::Entity",
        from = "Column::EntryGroupId",
        to = "crate::entities::entry_group_entity::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    EntryGroup,
}

impl Related<crate::entities::entry_group_entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EntryGroup.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
