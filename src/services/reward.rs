use std::sync::Arc;

use rand::Rng;

use crate::error::{AppError, AppResult};
use crate::models::{SpinnerSlot, WHEEL_TOTAL};

/// 随机数来源，返回 [0, 100) 内的均匀随机数
pub type DrawFn = Arc<dyn Fn() -> f64 + Send + Sync>;

pub fn uniform_draw() -> f64 {
    rand::rng().random_range(0.0..WHEEL_TOTAL)
}

pub fn default_draw() -> DrawFn {
    Arc::new(uniform_draw)
}

/// 按配置顺序累加概率，返回第一个满足 r <= 累计值 的格子。
///
/// 累计值不足 100 (配置错误或浮点误差) 时回退到最后一个格子，
/// 因此非空列表总能选中一个格子。给定 r 时结果确定。
pub fn select_slot<'a>(
    slots: &'a [SpinnerSlot],
    r: f64,
    restaurant_id: &str,
) -> AppResult<&'a SpinnerSlot> {
    let last = slots
        .last()
        .ok_or_else(|| AppError::NoRewardsConfigured(restaurant_id.to_string()))?;

    let mut cumulative = 0.0;
    for slot in slots {
        cumulative += slot.probability;
        if r <= cumulative {
            return Ok(slot);
        }
    }

    log::debug!(
        "Draw {r} exceeded cumulative probability {cumulative} for restaurant {restaurant_id}, using last slot"
    );
    Ok(last)
}
