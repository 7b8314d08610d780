use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::restaurant_entity;
use crate::error::{AppError, AppResult};

use super::Reward;

/// 转盘总概率 (百分比)
pub const WHEEL_TOTAL: f64 = 100.0;

/// 概率合计允许的浮点误差
const PROBABILITY_EPSILON: f64 = 1e-6;

/// 转盘格子
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SpinnerSlot {
    /// 展示文字，如 "1 Plate Biriyani" / "Next Spin"
    pub label: String,
    /// 中奖概率 (0 ~ 100)
    pub probability: f64,
    /// 奖励内容；None 表示本格无奖励
    #[serde(default)]
    pub reward: Option<Reward>,
}

/// 餐厅游戏化配置（引擎只读视图）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RestaurantConfig {
    pub id: String,
    pub name: String,
    /// 解锁门槛 (最小货币单位)
    pub game_unlock_threshold: i64,
    pub spinner_slots: Vec<SpinnerSlot>,
}

impl TryFrom<restaurant_entity::Model> for RestaurantConfig {
    type Error = AppError;

    fn try_from(m: restaurant_entity::Model) -> Result<Self, Self::Error> {
        Ok(RestaurantConfig {
            id: m.id,
            name: m.name,
            game_unlock_threshold: m.game_unlock_threshold,
            spinner_slots: serde_json::from_value(m.spinner_slots)?,
        })
    }
}

/// 管理端更新转盘配置
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct UpdateSpinnerConfigRequest {
    /// 新的解锁门槛 (可选，最小货币单位)
    pub game_unlock_threshold: Option<i64>,
    pub spinner_slots: Vec<SpinnerSlot>,
}

impl UpdateSpinnerConfigRequest {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(threshold) = self.game_unlock_threshold
            && threshold < 0
        {
            return Err(AppError::ValidationError(
                "Unlock threshold must not be negative".into(),
            ));
        }
        validate_spinner_slots(&self.spinner_slots)
    }
}

/// 校验转盘格子:
/// - 至少一个格子，标签非空
/// - 每个概率为 [0, 100] 内的有限数
/// - 合计不超过 100（不足 100 时由抽取逻辑回退到最后一格）
pub fn validate_spinner_slots(slots: &[SpinnerSlot]) -> AppResult<()> {
    if slots.is_empty() {
        return Err(AppError::ValidationError(
            "At least one spinner slot is required".into(),
        ));
    }

    let mut total = 0.0;
    for slot in slots {
        if slot.label.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Spinner slot label must not be empty".into(),
            ));
        }
        if !slot.probability.is_finite() || !(0.0..=WHEEL_TOTAL).contains(&slot.probability) {
            return Err(AppError::ValidationError(format!(
                "Probability of slot '{}' must be between 0 and 100",
                slot.label
            )));
        }
        if let Some(reward) = &slot.reward {
            reward.validate()?;
        }
        total += slot.probability;
    }

    if total > WHEEL_TOTAL + PROBABILITY_EPSILON {
        return Err(AppError::ValidationError(format!(
            "Total probability cannot exceed 100% (got {total})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(label: &str, probability: f64) -> SpinnerSlot {
        SpinnerSlot {
            label: label.into(),
            probability,
            reward: None,
        }
    }

    #[test]
    fn test_accepts_full_wheel() {
        let slots = vec![slot("A", 33.3), slot("B", 33.3), slot("C", 33.4)];
        assert!(validate_spinner_slots(&slots).is_ok());
    }

    #[test]
    fn test_accepts_partial_wheel() {
        assert!(validate_spinner_slots(&[slot("A", 50.0)]).is_ok());
    }

    #[test]
    fn test_rejects_overfull_wheel() {
        let slots = vec![slot("A", 60.0), slot("B", 50.0)];
        assert!(matches!(
            validate_spinner_slots(&slots),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_rejects_bad_slots() {
        assert!(validate_spinner_slots(&[]).is_err());
        assert!(validate_spinner_slots(&[slot("  ", 10.0)]).is_err());
        assert!(validate_spinner_slots(&[slot("A", -1.0)]).is_err());
        assert!(validate_spinner_slots(&[slot("A", f64::NAN)]).is_err());
    }

    #[test]
    fn test_rejects_negative_threshold() {
        let req = UpdateSpinnerConfigRequest {
            game_unlock_threshold: Some(-1),
            spinner_slots: vec![slot("A", 100.0)],
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_fractional_percentage_reward() {
        let s: SpinnerSlot = serde_json::from_str(
            r#"{"label": "12.5% Off", "probability": 50.0,
                "reward": {"offer_type": "PERCENTAGE_DISCOUNT", "value": 12.5,
                           "description": "12.5% Off"}}"#,
        )
        .unwrap();
        assert_eq!(s.reward.as_ref().map(|r| r.value), Some(12.5));
        assert!(validate_spinner_slots(&[s.clone()]).is_ok());

        let mut too_much = s;
        if let Some(reward) = too_much.reward.as_mut() {
            reward.value = 150.0;
        }
        assert!(matches!(
            validate_spinner_slots(&[too_much]),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_slot_without_reward_deserializes() {
        let s: SpinnerSlot =
            serde_json::from_str(r#"{"label": "Next Spin", "probability": 20.0}"#).unwrap();
        assert!(s.reward.is_none());
    }
}
