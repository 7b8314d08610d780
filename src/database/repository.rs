use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{GameStatus, SessionStatus};
use crate::error::{AppError, AppResult};
use crate::models::{DiningSession, OrderLine, RestaurantConfig, Reward, SpinnerSlot};
use crate::services::game_state::GameEvent;

/// 条件更新的前置条件，所有已设置的条件需同时满足
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionPredicate {
    pub game_status: Option<GameStatus>,
    pub status_in: Option<Vec<SessionStatus>>,
    /// 要求尚未转盘 (spun_at / reward_won 均为空)
    pub not_spun: bool,
}

impl SessionPredicate {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn game_status(mut self, status: GameStatus) -> Self {
        self.game_status = Some(status);
        self
    }

    pub fn status_in(mut self, statuses: Vec<SessionStatus>) -> Self {
        self.status_in = Some(statuses);
        self
    }

    pub fn not_spun(mut self) -> Self {
        self.not_spun = true;
        self
    }

    pub fn matches(&self, session: &DiningSession) -> bool {
        if let Some(status) = self.game_status
            && session.game_status != status
        {
            return false;
        }
        if let Some(statuses) = &self.status_in
            && !statuses.contains(&session.status)
        {
            return false;
        }
        if self.not_spun && (session.spun_at.is_some() || session.reward_won.is_some()) {
            return false;
        }
        true
    }
}

/// 一次原子写入要做的修改
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionMutation {
    /// 追加到 items 末尾
    pub append_items: Vec<OrderLine>,
    /// total_amount 原子自增
    pub increment_total: i64,
    /// 自增后 total_amount >= 门槛且仍为 LOCKED 时，同一次写入内转为 UNLOCKED
    pub unlock_threshold: Option<i64>,
    /// 游戏事件，按状态机从 required_state 迁移到 target_state
    pub game_event: Option<GameEvent>,
    /// 记录转盘结果 (奖励可为空)
    pub record_spin: Option<SpinRecord>,
    pub set_status: Option<SessionStatus>,
    pub set_closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpinRecord {
    pub reward: Option<Reward>,
    pub spun_at: DateTime<Utc>,
}

impl SessionMutation {
    pub fn append_items(items: Vec<OrderLine>, delta: i64) -> Self {
        Self {
            append_items: items,
            increment_total: delta,
            ..Default::default()
        }
    }

    pub fn unlock_at(mut self, threshold: i64) -> Self {
        self.unlock_threshold = Some(threshold);
        self
    }

    pub fn game_event(event: GameEvent) -> Self {
        Self {
            game_event: Some(event),
            ..Default::default()
        }
    }

    pub fn spin(reward: Option<Reward>, spun_at: DateTime<Utc>) -> Self {
        Self {
            record_spin: Some(SpinRecord { reward, spun_at }),
            ..Default::default()
        }
    }

    pub fn status(status: SessionStatus, closed_at: Option<DateTime<Utc>>) -> Self {
        Self {
            set_status: Some(status),
            set_closed_at: closed_at,
            ..Default::default()
        }
    }

    /// 本次写入对应的前置条件（游戏事件要求的当前状态）
    pub fn event_predicate(&self) -> SessionPredicate {
        match self.game_event {
            Some(event) => SessionPredicate::any().game_status(event.required_state()),
            None => SessionPredicate::any(),
        }
    }

    /// 金额自增不能超出 i64 范围，两种存储返回同样的校验错误
    pub fn check_headroom(&self, session: &DiningSession) -> AppResult<i64> {
        session
            .total_amount
            .checked_add(self.increment_total)
            .ok_or_else(|| AppError::ValidationError("Order amount is too large".into()))
    }

    /// 在内存中的会话上应用修改 (与 SQL 版本的语义一致)
    pub fn apply(&self, session: &mut DiningSession) -> AppResult<()> {
        if self.increment_total != 0 || !self.append_items.is_empty() {
            session.total_amount = self.check_headroom(session)?;
            session.items.extend(self.append_items.iter().cloned());
        }
        if let Some(threshold) = self.unlock_threshold
            && session.total_amount >= threshold
        {
            // 已解锁或已结束时不重复迁移
            if let Ok(next) = GameEvent::ThresholdReached.apply(session.game_status) {
                session.game_status = next;
            }
        }
        if let Some(event) = self.game_event {
            session.game_status = event.apply(session.game_status)?;
        }
        if let Some(spin) = &self.record_spin {
            session.reward_won = spin.reward.clone();
            session.spun_at = Some(spin.spun_at);
        }
        if let Some(status) = self.set_status {
            session.status = status;
        }
        if let Some(closed_at) = self.set_closed_at {
            session.closed_at = Some(closed_at);
        }
        Ok(())
    }
}

/// 条件更新结果
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Applied(DiningSession),
    PredicateFailed,
    NotFound,
}

/// 会话存储：每个 conditional_update 必须是一次原子写入
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<DiningSession>>;

    async fn insert(&self, session: &DiningSession) -> AppResult<()>;

    /// 指定餐厅下 OPEN 状态的会话，按创建时间倒序
    async fn list_open(&self, restaurant_id: &str, limit: u64) -> AppResult<Vec<DiningSession>>;

    async fn conditional_update(
        &self,
        id: &str,
        predicate: SessionPredicate,
        mutation: SessionMutation,
    ) -> AppResult<UpdateOutcome>;
}

/// 餐厅配置存储 (对引擎只读，管理端可更新转盘)
#[async_trait]
pub trait RestaurantConfigStore: Send + Sync {
    async fn get_config(&self, restaurant_id: &str) -> AppResult<Option<RestaurantConfig>>;

    async fn update_spinner_config(
        &self,
        restaurant_id: &str,
        game_unlock_threshold: Option<i64>,
        spinner_slots: &[SpinnerSlot],
    ) -> AppResult<Option<RestaurantConfig>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parotta(quantity: i32) -> OrderLine {
        OrderLine {
            menu_item_id: "item_001".into(),
            name: "Parotta".into(),
            quantity,
            price_per_item: 2000,
            notes: None,
        }
    }

    #[test]
    fn test_unlock_exactly_at_threshold() {
        let mut s = DiningSession::open("r".into(), "t".into(), "s".into());
        SessionMutation::append_items(vec![parotta(10)], 20000)
            .unlock_at(20000)
            .apply(&mut s)
            .unwrap();
        assert_eq!(s.total_amount, 20000);
        assert_eq!(s.game_status, GameStatus::Unlocked);
    }

    #[test]
    fn test_unlock_does_not_touch_finished_games() {
        let mut s = DiningSession::open("r".into(), "t".into(), "s".into());
        s.game_status = GameStatus::Won;
        SessionMutation::append_items(vec![parotta(1)], 2000)
            .unlock_at(0)
            .apply(&mut s)
            .unwrap();
        assert_eq!(s.game_status, GameStatus::Won);
        assert_eq!(s.items.len(), 1);
    }

    #[test]
    fn test_game_event_follows_state_machine() {
        let mut s = DiningSession::open("r".into(), "t".into(), "s".into());
        let won = SessionMutation::game_event(GameEvent::PuzzleWon);
        assert!(matches!(
            won.apply(&mut s),
            Err(AppError::InvalidTransition(_))
        ));
        assert_eq!(s.game_status, GameStatus::Locked);

        s.game_status = GameStatus::Unlocked;
        won.apply(&mut s).unwrap();
        assert_eq!(s.game_status, GameStatus::Won);
        assert_eq!(
            won.event_predicate(),
            SessionPredicate::any().game_status(GameStatus::Unlocked)
        );
    }

    #[test]
    fn test_headroom_overflow_is_validation_error() {
        let mut s = DiningSession::open("r".into(), "t".into(), "s".into());
        s.total_amount = i64::MAX / 2 + 1;
        let add = SessionMutation::append_items(vec![parotta(1)], i64::MAX / 2 + 1);
        assert!(matches!(
            add.check_headroom(&s),
            Err(AppError::ValidationError(_))
        ));
        assert!(add.apply(&mut s).is_err());
        assert_eq!(s.total_amount, i64::MAX / 2 + 1);
        assert!(s.items.is_empty());
    }

    #[test]
    fn test_predicate_matching() {
        let mut s = DiningSession::open("r".into(), "t".into(), "s".into());
        s.game_status = GameStatus::Won;
        let spin = SessionPredicate::any()
            .game_status(GameStatus::Won)
            .not_spun();
        assert!(spin.matches(&s));

        s.spun_at = Some(Utc::now());
        assert!(!spin.matches(&s));

        let ordering = SessionPredicate::any().status_in(SessionStatus::order_accepting());
        assert!(ordering.matches(&s));
        s.status = SessionStatus::Billed;
        assert!(!ordering.matches(&s));
    }
}
