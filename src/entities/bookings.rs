use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 预约实体
/// 由中签条目物化而来；slot_entry_id 唯一，
/// 重复物化同一场次时天然幂等
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub lottery_session_id: i64,
    pub slot_id: i64,
    /// 来源的中签条目ID（唯一）
    pub slot_entry_id: i64,
    pub user_id: i64,
    /// 从中签条目快照的拍立得张数
    pub cheki_unsigned_count: i32,
    pub cheki_signed_count: i32,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
