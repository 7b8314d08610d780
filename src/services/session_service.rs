use chrono::Utc;

use crate::database::{
    Repositories, RestaurantConfigStore, SessionMutation, SessionPredicate, SessionRepository,
    UpdateOutcome,
};
use crate::entities::{GameStatus, SessionStatus};
use crate::error::{AppError, AppResult};
use crate::models::{
    DiningSession, OpenSessionRequest, OrderLine, RestaurantConfig, SpinResponse,
    validate_order_lines,
};
use crate::services::game_state::GameEvent;
use crate::services::reward::{DrawFn, default_draw, select_slot};
use std::sync::Arc;

/// 进行中会话列表上限
const OPEN_SESSION_LIMIT: u64 = 100;

/// 用餐会话 + 游戏化状态引擎
///
/// 无状态：所有并发正确性依赖存储层的条件更新，可以多实例部署
#[derive(Clone)]
pub struct SessionService {
    sessions: Arc<dyn SessionRepository>,
    restaurants: Arc<dyn RestaurantConfigStore>,
    draw: DrawFn,
}

impl SessionService {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            sessions: repos.sessions.clone(),
            restaurants: repos.restaurants.clone(),
            draw: default_draw(),
        }
    }

    /// 替换随机数来源（测试中固定抽奖结果）
    pub fn with_draw(mut self, draw: DrawFn) -> Self {
        self.draw = draw;
        self
    }

    /// 开台：新会话为空单、LOCKED、OPEN
    pub async fn open_session(&self, request: OpenSessionRequest) -> AppResult<DiningSession> {
        if request.table_id.trim().is_empty() || request.server_id.trim().is_empty() {
            return Err(AppError::ValidationError(
                "table_id and server_id are required".into(),
            ));
        }
        self.restaurant_config(&request.restaurant_id).await?;

        let session =
            DiningSession::open(request.restaurant_id, request.table_id, request.server_id);
        self.sessions.insert(&session).await?;

        log::info!(
            "Opened session {} for table {} (restaurant {})",
            session.id,
            session.table_id,
            session.restaurant_id
        );
        Ok(session)
    }

    pub async fn get_session(&self, session_id: &str) -> AppResult<DiningSession> {
        self.sessions
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| AppError::SessionNotFound(session_id.to_string()))
    }

    /// 餐厅下所有 OPEN 会话（服务员 / 收银视图）
    pub async fn list_open_sessions(&self, restaurant_id: &str) -> AppResult<Vec<DiningSession>> {
        self.sessions
            .list_open(restaurant_id, OPEN_SESSION_LIMIT)
            .await
    }

    /// 服务员加菜
    ///
    /// 一次写入内完成：追加明细、total_amount 自增、达到门槛时 LOCKED -> UNLOCKED。
    /// 多台设备同时加菜时各自的增量都会生效，解锁只会发生一次。
    pub async fn add_items(
        &self,
        session_id: &str,
        lines: Vec<OrderLine>,
    ) -> AppResult<DiningSession> {
        let delta = validate_order_lines(&lines)?;

        // restaurant_id 不可变，读取只用于定位门槛
        let session = self.get_session(session_id).await?;
        let restaurant = self
            .restaurant_config(&session.restaurant_id)
            .await
            .inspect_err(|e| {
                log::error!("Session {session_id} references a missing restaurant: {e}")
            })?;

        let line_count = lines.len();
        let predicate = SessionPredicate::any().status_in(SessionStatus::order_accepting());
        let mutation = SessionMutation::append_items(lines, delta)
            .unlock_at(restaurant.game_unlock_threshold);

        match self
            .sessions
            .conditional_update(session_id, predicate, mutation)
            .await?
        {
            UpdateOutcome::Applied(updated) => {
                log::info!(
                    "Added {line_count} line(s) to session {session_id}: +{delta}, total {}",
                    updated.total_amount
                );
                if session.game_status == GameStatus::Locked
                    && updated.game_status == GameStatus::Unlocked
                {
                    log::info!(
                        "Game unlocked for session {session_id} (threshold {})",
                        restaurant.game_unlock_threshold
                    );
                }
                Ok(updated)
            }
            UpdateOutcome::PredicateFailed => Err(AppError::InvalidTransition(format!(
                "session {session_id} no longer accepts orders"
            ))),
            UpdateOutcome::NotFound => Err(AppError::SessionNotFound(session_id.to_string())),
        }
    }

    /// 顾客完成游戏：UNLOCKED -> WON
    pub async fn mark_won(&self, session_id: &str) -> AppResult<DiningSession> {
        self.apply_game_event(session_id, GameEvent::PuzzleWon).await
    }

    /// 顾客游戏失败：UNLOCKED -> LOST
    pub async fn mark_lost(&self, session_id: &str) -> AppResult<DiningSession> {
        self.apply_game_event(session_id, GameEvent::PuzzleLost).await
    }

    /// 转盘：仅 WON 且未转过时可用，每个会话最多成功一次
    pub async fn spin(&self, session_id: &str) -> AppResult<SpinResponse> {
        let session = self.get_session(session_id).await?;
        if !session.can_spin() {
            return Err(spin_rejection(&session));
        }

        let restaurant = self.restaurant_config(&session.restaurant_id).await?;
        let r = (self.draw)();
        let won_slot = select_slot(&restaurant.spinner_slots, r, &restaurant.id)?.clone();

        // 以 (WON, 未转过) 为前置条件写入，并发请求中只有一个能命中
        let predicate = SessionPredicate::any()
            .game_status(GameStatus::Won)
            .not_spun();
        let mutation = SessionMutation::spin(won_slot.reward.clone(), Utc::now());

        match self
            .sessions
            .conditional_update(session_id, predicate, mutation)
            .await?
        {
            UpdateOutcome::Applied(updated) => {
                log::info!(
                    "Session {session_id} spun the wheel: '{}' (draw {r:.3})",
                    won_slot.label
                );
                Ok(SpinResponse {
                    won_slot,
                    session: updated,
                })
            }
            UpdateOutcome::PredicateFailed => {
                log::debug!("Concurrent spin on session {session_id} lost the race");
                Err(AppError::SpinNotEligible(format!(
                    "session {session_id} has already been spun"
                )))
            }
            UpdateOutcome::NotFound => Err(AppError::SessionNotFound(session_id.to_string())),
        }
    }

    /// 会话生命周期前进一步：OPEN -> FOOD_DELIVERED -> BILLED -> CLOSED
    pub async fn advance_status(
        &self,
        session_id: &str,
        target: SessionStatus,
    ) -> AppResult<DiningSession> {
        let session = self.get_session(session_id).await?;
        if session.status.next() != Some(target) {
            return Err(AppError::InvalidTransition(format!(
                "cannot move session from {} to {target}",
                session.status
            )));
        }

        let closed_at = (target == SessionStatus::Closed).then(Utc::now);
        let predicate = SessionPredicate::any().status_in(vec![session.status]);
        let mutation = SessionMutation::status(target, closed_at);

        match self
            .sessions
            .conditional_update(session_id, predicate, mutation)
            .await?
        {
            UpdateOutcome::Applied(updated) => {
                log::info!("Session {session_id} moved to {target}");
                Ok(updated)
            }
            UpdateOutcome::PredicateFailed => Err(AppError::InvalidTransition(format!(
                "session {session_id} status changed concurrently, expected {}",
                session.status
            ))),
            UpdateOutcome::NotFound => Err(AppError::SessionNotFound(session_id.to_string())),
        }
    }

    // -----------------------------
    // 内部辅助方法
    // -----------------------------

    async fn restaurant_config(&self, restaurant_id: &str) -> AppResult<RestaurantConfig> {
        self.restaurants
            .get_config(restaurant_id)
            .await?
            .ok_or_else(|| AppError::RestaurantNotFound(restaurant_id.to_string()))
    }

    async fn apply_game_event(
        &self,
        session_id: &str,
        event: GameEvent,
    ) -> AppResult<DiningSession> {
        let mutation = SessionMutation::game_event(event);
        let predicate = mutation.event_predicate();

        match self
            .sessions
            .conditional_update(session_id, predicate, mutation)
            .await?
        {
            UpdateOutcome::Applied(updated) => {
                log::info!(
                    "Session {session_id} game status {} -> {}",
                    event.required_state(),
                    event.target_state()
                );
                Ok(updated)
            }
            UpdateOutcome::PredicateFailed => {
                // 仅用于组织错误信息
                let current = self.get_session(session_id).await?;
                Err(event.rejection(current.game_status))
            }
            UpdateOutcome::NotFound => Err(AppError::SessionNotFound(session_id.to_string())),
        }
    }
}

fn spin_rejection(session: &DiningSession) -> AppError {
    if session.game_status == GameStatus::Won {
        AppError::SpinNotEligible(format!("session {} has already been spun", session.id))
    } else {
        AppError::SpinNotEligible(format!(
            "game must be won before spinning (current: {})",
            session.game_status
        ))
    }
}
