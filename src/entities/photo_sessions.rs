use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 摄影会实体
/// 创建 / 编辑由会务 CRUD 模块负责，抽选核心只读取
/// organizer_id 用于主办方权限校验
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "photo_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// 主办方用户ID
    pub organizer_id: i64,
    pub title: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
