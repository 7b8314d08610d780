//! 游戏状态机与会话生命周期
//!
//! 允许的游戏状态迁移:
//!
//! ```text
//! LOCKED   -> UNLOCKED  消费达到餐厅门槛
//! UNLOCKED -> WON       顾客完成游戏
//! UNLOCKED -> LOST      顾客失败 / 超时
//! ```
//!
//! WON 之后的转盘不改变 game_status，只写入 reward_won / spun_at。
//! 所有迁移都由持久层的条件更新 (compare-and-set) 落地，这里只定义规则。

use sea_orm::Iterable;

use crate::entities::{GameStatus, SessionStatus};
use crate::error::{AppError, AppResult};

/// 触发游戏状态迁移的事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    ThresholdReached,
    PuzzleWon,
    PuzzleLost,
}

impl GameEvent {
    /// 事件生效所要求的当前状态（即 CAS 的前置条件）
    pub fn required_state(self) -> GameStatus {
        match self {
            GameEvent::ThresholdReached => GameStatus::Locked,
            GameEvent::PuzzleWon | GameEvent::PuzzleLost => GameStatus::Unlocked,
        }
    }

    pub fn target_state(self) -> GameStatus {
        match self {
            GameEvent::ThresholdReached => GameStatus::Unlocked,
            GameEvent::PuzzleWon => GameStatus::Won,
            GameEvent::PuzzleLost => GameStatus::Lost,
        }
    }

    /// 对当前状态应用事件，迁移必须是状态机中的一条边
    pub fn apply(self, current: GameStatus) -> AppResult<GameStatus> {
        let next = self.target_state();
        if current == self.required_state() && current.can_transition_to(next) {
            Ok(next)
        } else {
            Err(self.rejection(current))
        }
    }

    pub fn rejection(self, current: GameStatus) -> AppError {
        let reason = match (self, current) {
            (_, GameStatus::Locked) => "game is not unlocked yet",
            (GameEvent::ThresholdReached, _) => "game is already unlocked",
            (_, GameStatus::Won) | (_, GameStatus::Lost) => "game is already finished",
            _ => "game cannot be completed from its current state",
        };
        AppError::InvalidTransition(format!(
            "{reason} (current: {current}, requested: {})",
            self.target_state()
        ))
    }
}

impl GameStatus {
    pub fn can_transition_to(self, next: GameStatus) -> bool {
        matches!(
            (self, next),
            (GameStatus::Locked, GameStatus::Unlocked)
                | (GameStatus::Unlocked, GameStatus::Won)
                | (GameStatus::Unlocked, GameStatus::Lost)
        )
    }
}

impl SessionStatus {
    /// 生命周期的下一步，CLOSED 为终态
    pub fn next(self) -> Option<SessionStatus> {
        match self {
            SessionStatus::Open => Some(SessionStatus::FoodDelivered),
            SessionStatus::FoodDelivered => Some(SessionStatus::Billed),
            SessionStatus::Billed => Some(SessionStatus::Closed),
            SessionStatus::Closed => None,
        }
    }

    /// 出账前都可以继续加菜
    pub fn accepts_orders(self) -> bool {
        matches!(self, SessionStatus::Open | SessionStatus::FoodDelivered)
    }

    pub fn order_accepting() -> Vec<SessionStatus> {
        SessionStatus::iter().filter(|s| s.accepts_orders()).collect()
    }
}
