use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{GameStatus, SessionStatus, dining_session_entity};
use crate::error::{AppError, AppResult};

use super::SpinnerSlot;

/// 奖励类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferType {
    /// 百分比折扣，value 为百分数
    PercentageDiscount,
    /// 固定金额减免，value 为最小货币单位
    FlatDiscount,
    /// 赠送菜品，item_name 为菜名
    FreeItem,
}

/// 转盘奖励 (不可变值对象)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Reward {
    pub offer_type: OfferType,
    /// PERCENTAGE_DISCOUNT: 百分数，可带小数 (12.5)
    /// FLAT_DISCOUNT: 最小货币单位
    /// FREE_ITEM: 不使用，通常为 0
    pub value: f64,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
}

impl Reward {
    pub fn validate(&self) -> AppResult<()> {
        if !self.value.is_finite() || self.value < 0.0 {
            return Err(AppError::ValidationError(format!(
                "Reward value of '{}' must be a non-negative number",
                self.description
            )));
        }
        if self.offer_type == OfferType::PercentageDiscount && self.value > 100.0 {
            return Err(AppError::ValidationError(format!(
                "Percentage discount of '{}' cannot exceed 100",
                self.description
            )));
        }
        Ok(())
    }
}

/// 点单明细
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderLine {
    pub menu_item_id: String,
    /// 菜名，如 "Parotta"
    pub name: String,
    pub quantity: i32,
    /// 单价 (最小货币单位)
    pub price_per_item: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl OrderLine {
    /// 行金额，溢出返回 None
    pub fn line_total(&self) -> Option<i64> {
        i64::from(self.quantity).checked_mul(self.price_per_item)
    }
}

/// 校验新增明细并返回本次增量金额
pub fn validate_order_lines(lines: &[OrderLine]) -> AppResult<i64> {
    if lines.is_empty() {
        return Err(AppError::ValidationError(
            "At least one order line is required".into(),
        ));
    }

    let mut delta: i64 = 0;
    for line in lines {
        if line.quantity <= 0 {
            return Err(AppError::ValidationError(format!(
                "Quantity of '{}' must be positive",
                line.name
            )));
        }
        if line.price_per_item < 0 {
            return Err(AppError::ValidationError(format!(
                "Price of '{}' must not be negative",
                line.name
            )));
        }
        delta = line
            .line_total()
            .and_then(|total| delta.checked_add(total))
            .ok_or_else(|| AppError::ValidationError("Order amount is too large".into()))?;
    }
    Ok(delta)
}

/// 用餐会话
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DiningSession {
    pub id: String,
    pub restaurant_id: String,
    pub table_id: String,
    pub server_id: String,
    pub items: Vec<OrderLine>,
    /// 累计金额 (最小货币单位)
    pub total_amount: i64,
    pub game_status: GameStatus,
    pub reward_won: Option<Reward>,
    /// 转盘时间，非空表示已转过
    pub spun_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl DiningSession {
    /// 新开会话：空明细、LOCKED、OPEN
    pub fn open(restaurant_id: String, table_id: String, server_id: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            restaurant_id,
            table_id,
            server_id,
            items: Vec::new(),
            total_amount: 0,
            game_status: GameStatus::Locked,
            reward_won: None,
            spun_at: None,
            status: SessionStatus::Open,
            created_at: Utc::now(),
            closed_at: None,
        }
    }

    /// 是否还能转盘：已赢且未转过
    pub fn can_spin(&self) -> bool {
        self.game_status == GameStatus::Won && self.spun_at.is_none() && self.reward_won.is_none()
    }
}

impl TryFrom<dining_session_entity::Model> for DiningSession {
    type Error = AppError;

    fn try_from(m: dining_session_entity::Model) -> Result<Self, Self::Error> {
        let reward_won = match m.reward_won {
            Some(v) if !v.is_null() => Some(serde_json::from_value(v)?),
            _ => None,
        };
        Ok(DiningSession {
            id: m.id,
            restaurant_id: m.restaurant_id,
            table_id: m.table_id,
            server_id: m.server_id,
            items: serde_json::from_value(m.items)?,
            total_amount: m.total_amount,
            game_status: m.game_status,
            reward_won,
            spun_at: m.spun_at,
            status: m.status,
            created_at: m.created_at,
            closed_at: m.closed_at,
        })
    }
}

/// 开台请求
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct OpenSessionRequest {
    pub restaurant_id: String,
    pub table_id: String,
    pub server_id: String,
}

/// 服务员加菜请求
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct AddItemsRequest {
    pub items: Vec<OrderLine>,
}

/// 会话生命周期推进请求
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct AdvanceStatusRequest {
    pub status: SessionStatus,
}

/// 进行中会话查询参数
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SessionListQuery {
    pub restaurant_id: String,
}

/// 转盘结果
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SpinResponse {
    /// 命中的格子
    pub won_slot: SpinnerSlot,
    pub session: DiningSession,
}
