use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 游戏化状态
/// LOCKED -> UNLOCKED -> WON / LOST，只能单向前进
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    ToSchema,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    /// 消费未达门槛
    #[sea_orm(string_value = "LOCKED")]
    Locked,
    /// 已达门槛，顾客可以开始游戏
    #[sea_orm(string_value = "UNLOCKED")]
    Unlocked,
    #[sea_orm(string_value = "PLAYING")]
    Playing,
    /// 顾客完成游戏，可以转一次转盘
    #[sea_orm(string_value = "WON")]
    Won,
    #[sea_orm(string_value = "LOST")]
    Lost,
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameStatus::Locked => write!(f, "LOCKED"),
            GameStatus::Unlocked => write!(f, "UNLOCKED"),
            GameStatus::Playing => write!(f, "PLAYING"),
            GameStatus::Won => write!(f, "WON"),
            GameStatus::Lost => write!(f, "LOST"),
        }
    }
}

/// 会话生命周期（与游戏状态相互独立）
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    ToSchema,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    #[sea_orm(string_value = "OPEN")]
    Open,
    #[sea_orm(string_value = "FOOD_DELIVERED")]
    FoodDelivered,
    #[sea_orm(string_value = "BILLED")]
    Billed,
    #[sea_orm(string_value = "CLOSED")]
    Closed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Open => write!(f, "OPEN"),
            SessionStatus::FoodDelivered => write!(f, "FOOD_DELIVERED"),
            SessionStatus::Billed => write!(f, "BILLED"),
            SessionStatus::Closed => write!(f, "CLOSED"),
        }
    }
}

/// 用餐会话实体
/// 说明:
/// - items: 点单明细 (JSONB 数组)，只追加
/// - total_amount: 最小货币单位，始终等于 items 的 quantity * price_per_item 之和
/// - reward_won: 转盘奖励 (JSONB)，未中奖或未转时为 NULL
/// - spun_at: 成功转盘的时间，非 NULL 表示本会话已用掉唯一一次转盘机会
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dining_sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub restaurant_id: String,
    pub table_id: String,
    pub server_id: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub items: Json,
    pub total_amount: i64,
    pub game_status: GameStatus,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub reward_won: Option<Json>,
    pub spun_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::restaurants::Entity",
        from = "Column::RestaurantId",
        to = "super::restaurants::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Restaurant,
}

impl Related<super::restaurants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Restaurant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
