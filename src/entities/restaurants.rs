use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 餐厅游戏化配置实体
/// - game_unlock_threshold: 解锁门槛 (最小货币单位)
/// - spinner_slots: 转盘格子 (JSONB 数组，按配置顺序)，概率不在存储层归一化
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "restaurants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub game_unlock_threshold: i64,
    #[sea_orm(column_type = "JsonBinary")]
    pub spinner_slots: Json,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::dining_sessions::Entity")]
    DiningSessions,
}

impl Related<super::dining_sessions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DiningSessions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
