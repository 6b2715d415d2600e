use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 主办方模特名册实体
/// 名册的增删由主办方管理界面负责，抽选核心只做
/// "报名指定的模特是否在册且在职" 的校验
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "organizer_models")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// 所属主办方用户ID
    pub organizer_id: i64,
    pub model_name: String,
    /// 是否在职（离职后报名不可再指定）
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
