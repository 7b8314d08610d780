use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::entities::{
    SessionStatus, dining_session_entity as sessions, restaurant_entity as restaurants,
};
use crate::error::AppResult;
use crate::models::{DiningSession, RestaurantConfig, SpinnerSlot};
use crate::services::game_state::GameEvent;

use super::repository::{
    RestaurantConfigStore, SessionMutation, SessionPredicate, SessionRepository, UpdateOutcome,
};

/// Postgres 会话存储
/// 每次状态变更都是一条 `UPDATE ... WHERE <前置条件> RETURNING *`，
/// 不做先读后写，多实例并发时由数据库保证只有一个写入生效
#[derive(Clone)]
pub struct PgSessionRepository {
    pool: DatabaseConnection,
}

impl PgSessionRepository {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<DiningSession>> {
        sessions::Entity::find_by_id(id.to_string())
            .one(&self.pool)
            .await?
            .map(DiningSession::try_from)
            .transpose()
    }

    async fn insert(&self, session: &DiningSession) -> AppResult<()> {
        sessions::ActiveModel {
            id: Set(session.id.clone()),
            restaurant_id: Set(session.restaurant_id.clone()),
            table_id: Set(session.table_id.clone()),
            server_id: Set(session.server_id.clone()),
            items: Set(serde_json::to_value(&session.items)?),
            total_amount: Set(session.total_amount),
            game_status: Set(session.game_status),
            reward_won: Set(session
                .reward_won
                .as_ref()
                .map(serde_json::to_value)
                .transpose()?),
            spun_at: Set(session.spun_at),
            status: Set(session.status),
            created_at: Set(session.created_at),
            closed_at: Set(session.closed_at),
        }
        .insert(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_open(&self, restaurant_id: &str, limit: u64) -> AppResult<Vec<DiningSession>> {
        sessions::Entity::find()
            .filter(sessions::Column::RestaurantId.eq(restaurant_id))
            .filter(sessions::Column::Status.eq(SessionStatus::Open))
            .order_by_desc(sessions::Column::CreatedAt)
            .limit(limit)
            .all(&self.pool)
            .await?
            .into_iter()
            .map(DiningSession::try_from)
            .collect()
    }

    async fn conditional_update(
        &self,
        id: &str,
        predicate: SessionPredicate,
        mutation: SessionMutation,
    ) -> AppResult<UpdateOutcome> {
        let mut update = sessions::Entity::update_many().filter(sessions::Column::Id.eq(id));

        // 前置条件
        if let Some(status) = predicate.game_status {
            update = update.filter(sessions::Column::GameStatus.eq(status));
        }
        if let Some(statuses) = &predicate.status_in {
            update = update.filter(sessions::Column::Status.is_in(statuses.clone()));
        }
        if predicate.not_spun {
            update = update
                .filter(sessions::Column::SpunAt.is_null())
                .filter(sessions::Column::RewardWon.is_null());
        }

        // 追加明细 + 金额自增，同一条语句内完成
        if !mutation.append_items.is_empty() || mutation.increment_total != 0 {
            // 自增后不能超出 bigint
            if mutation.increment_total > 0 {
                update = update.filter(
                    sessions::Column::TotalAmount.lte(i64::MAX - mutation.increment_total),
                );
            }
            update = update
                .col_expr(
                    sessions::Column::Items,
                    Expr::cust_with_values(
                        "\"items\" || $1",
                        [serde_json::to_value(&mutation.append_items)?],
                    ),
                )
                .col_expr(
                    sessions::Column::TotalAmount,
                    Expr::col(sessions::Column::TotalAmount).add(mutation.increment_total),
                );
        }

        if let Some(event) = mutation.game_event {
            update = update.col_expr(
                sessions::Column::GameStatus,
                Expr::val(event.apply(event.required_state())?).into(),
            );
        } else if let Some(threshold) = mutation.unlock_threshold {
            // SET 右侧读取的是更新前的行，因此用 total_amount + delta 判断门槛
            let unlock = GameEvent::ThresholdReached;
            let reached = sessions::Column::GameStatus.eq(unlock.required_state()).and(
                Expr::expr(
                    Expr::col(sessions::Column::TotalAmount).add(mutation.increment_total),
                )
                .gte(threshold),
            );
            update = update.col_expr(
                sessions::Column::GameStatus,
                Expr::case(reached, Expr::val(unlock.apply(unlock.required_state())?))
                    .finally(Expr::col(sessions::Column::GameStatus))
                    .into(),
            );
        }

        if let Some(spin) = &mutation.record_spin {
            let reward = spin.reward.as_ref().map(serde_json::to_value).transpose()?;
            update = update
                .col_expr(sessions::Column::RewardWon, Expr::val(reward).into())
                .col_expr(sessions::Column::SpunAt, Expr::val(spin.spun_at).into());
        }

        if let Some(status) = mutation.set_status {
            update = update.col_expr(sessions::Column::Status, Expr::val(status).into());
        }
        if let Some(closed_at) = mutation.set_closed_at {
            update = update.col_expr(sessions::Column::ClosedAt, Expr::val(closed_at).into());
        }

        let updated = update.exec_with_returning(&self.pool).await?;
        if let Some(model) = updated.into_iter().next() {
            return Ok(UpdateOutcome::Applied(DiningSession::try_from(model)?));
        }

        // 未命中：按与内存存储相同的顺序区分原因（仅用于返回错误，不再写入）
        let Some(current) = self.find_by_id(id).await? else {
            return Ok(UpdateOutcome::NotFound);
        };
        if predicate.matches(&current) {
            mutation.check_headroom(&current)?;
        }
        Ok(UpdateOutcome::PredicateFailed)
    }
}

/// Postgres 餐厅配置存储
#[derive(Clone)]
pub struct PgRestaurantStore {
    pool: DatabaseConnection,
}

impl PgRestaurantStore {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RestaurantConfigStore for PgRestaurantStore {
    async fn get_config(&self, restaurant_id: &str) -> AppResult<Option<RestaurantConfig>> {
        restaurants::Entity::find_by_id(restaurant_id.to_string())
            .one(&self.pool)
            .await?
            .map(RestaurantConfig::try_from)
            .transpose()
    }

    async fn update_spinner_config(
        &self,
        restaurant_id: &str,
        game_unlock_threshold: Option<i64>,
        spinner_slots: &[SpinnerSlot],
    ) -> AppResult<Option<RestaurantConfig>> {
        let mut update = restaurants::Entity::update_many()
            .col_expr(
                restaurants::Column::SpinnerSlots,
                Expr::val(serde_json::to_value(spinner_slots)?).into(),
            )
            .col_expr(restaurants::Column::UpdatedAt, Expr::val(Utc::now()).into())
            .filter(restaurants::Column::Id.eq(restaurant_id));
        if let Some(threshold) = game_unlock_threshold {
            update = update.col_expr(
                restaurants::Column::GameUnlockThreshold,
                Expr::val(threshold).into(),
            );
        }

        let updated = update.exec_with_returning(&self.pool).await?;
        match updated.into_iter().next() {
            Some(model) => Ok(Some(RestaurantConfig::try_from(model)?)),
            None => Ok(None),
        }
    }
}

/// 需要真实 Postgres：`DATABASE_URL=postgres://... cargo test -- --ignored`
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::database::{Repositories, create_pool, run_migrations};
    use crate::entities::GameStatus;
    use crate::error::AppError;
    use crate::models::{OfferType, OpenSessionRequest, OrderLine, Reward};
    use crate::services::SessionService;
    use std::sync::Arc;

    async fn connect() -> Option<DatabaseConnection> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let pool = create_pool(&DatabaseConfig {
            url,
            max_connections: 20,
            seed_demo: false,
        })
        .await
        .unwrap();
        run_migrations(&pool).await.unwrap();
        Some(pool)
    }

    fn wheel() -> Vec<SpinnerSlot> {
        vec![
            SpinnerSlot {
                label: "A".into(),
                probability: 20.0,
                reward: Some(Reward {
                    offer_type: OfferType::FlatDiscount,
                    value: 5000.0,
                    description: "A".into(),
                    item_name: None,
                }),
            },
            SpinnerSlot {
                label: "Try Again".into(),
                probability: 80.0,
                reward: None,
            },
        ]
    }

    /// 每个用例使用独立餐厅，互不干扰
    async fn service(pool: &DatabaseConnection) -> (SessionService, String) {
        let restaurant_id = format!("rest_{}", uuid::Uuid::new_v4());
        restaurants::ActiveModel {
            id: Set(restaurant_id.clone()),
            name: Set("Test kitchen".into()),
            game_unlock_threshold: Set(20000),
            spinner_slots: Set(serde_json::to_value(wheel()).unwrap()),
            created_at: Set(Some(Utc::now())),
            updated_at: Set(Some(Utc::now())),
        }
        .insert(pool)
        .await
        .unwrap();

        let service = SessionService::new(&Repositories::postgres(pool.clone()))
            .with_draw(Arc::new(|| 5.0));
        (service, restaurant_id)
    }

    async fn open(service: &SessionService, restaurant_id: &str) -> String {
        service
            .open_session(OpenSessionRequest {
                restaurant_id: restaurant_id.into(),
                table_id: "table_001".into(),
                server_id: "srv".into(),
            })
            .await
            .unwrap()
            .id
    }

    fn parotta(quantity: i32, price_per_item: i64) -> OrderLine {
        OrderLine {
            menu_item_id: "item_001".into(),
            name: "Parotta".into(),
            quantity,
            price_per_item,
            notes: None,
        }
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_pg_unlocks_exactly_at_threshold() {
        let Some(pool) = connect().await else { return };
        let (service, restaurant_id) = service(&pool).await;
        let id = open(&service, &restaurant_id).await;

        let s = service.add_items(&id, vec![parotta(9, 2000)]).await.unwrap();
        assert_eq!(s.game_status, GameStatus::Locked);
        let s = service.add_items(&id, vec![parotta(1, 2000)]).await.unwrap();
        assert_eq!(s.total_amount, 20000);
        assert_eq!(s.items.len(), 2);
        assert_eq!(s.game_status, GameStatus::Unlocked);

        service.mark_won(&id).await.unwrap();
        let s = service.add_items(&id, vec![parotta(1, 2000)]).await.unwrap();
        assert_eq!(s.game_status, GameStatus::Won);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "requires DATABASE_URL"]
    async fn test_pg_concurrent_add_items_keep_total() {
        let Some(pool) = connect().await else { return };
        let (service, restaurant_id) = service(&pool).await;
        let id = open(&service, &restaurant_id).await;

        let mut handles = Vec::new();
        for q in 1..=20 {
            let service = service.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                service.add_items(&id, vec![parotta(q, 2000)]).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let s = service.get_session(&id).await.unwrap();
        assert_eq!(s.items.len(), 20);
        assert_eq!(s.total_amount, 420000);
        let recomputed: i64 = s.items.iter().map(|l| l.line_total().unwrap()).sum();
        assert_eq!(s.total_amount, recomputed);
        assert_eq!(s.game_status, GameStatus::Unlocked);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "requires DATABASE_URL"]
    async fn test_pg_concurrent_mark_won_succeeds_once() {
        let Some(pool) = connect().await else { return };
        let (service, restaurant_id) = service(&pool).await;
        let id = open(&service, &restaurant_id).await;
        service.add_items(&id, vec![parotta(10, 2000)]).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move { service.mark_won(&id).await }));
        }
        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(AppError::InvalidTransition(_)) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(succeeded, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "requires DATABASE_URL"]
    async fn test_pg_concurrent_spins_succeed_once() {
        let Some(pool) = connect().await else { return };
        let (service, restaurant_id) = service(&pool).await;
        let id = open(&service, &restaurant_id).await;
        service.add_items(&id, vec![parotta(10, 2000)]).await.unwrap();
        service.mark_won(&id).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let service = service.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move { service.spin(&id).await }));
        }
        let (mut succeeded, mut rejected) = (0, 0);
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(AppError::SpinNotEligible(_)) => rejected += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!((succeeded, rejected), (1, 15));

        let s = service.get_session(&id).await.unwrap();
        assert_eq!(s.reward_won.map(|r| r.description), Some("A".to_string()));
        assert!(s.spun_at.is_some());
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_pg_overflow_is_validation_error() {
        let Some(pool) = connect().await else { return };
        let (service, restaurant_id) = service(&pool).await;
        let id = open(&service, &restaurant_id).await;

        let half = i64::MAX / 2;
        service.add_items(&id, vec![parotta(1, half)]).await.unwrap();
        assert!(matches!(
            service.add_items(&id, vec![parotta(1, half + 2)]).await,
            Err(AppError::ValidationError(_))
        ));

        let s = service.get_session(&id).await.unwrap();
        assert_eq!(s.total_amount, half);
        assert_eq!(s.items.len(), 1);
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_pg_update_spinner_config() {
        let Some(pool) = connect().await else { return };
        let (_, restaurant_id) = service(&pool).await;
        let store = PgRestaurantStore::new(pool.clone());

        let slots = vec![SpinnerSlot {
            label: "Everyone wins".into(),
            probability: 100.0,
            reward: None,
        }];
        let updated = store
            .update_spinner_config(&restaurant_id, Some(5000), &slots)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.game_unlock_threshold, 5000);
        assert_eq!(store.get_config(&restaurant_id).await.unwrap(), Some(updated));
        assert!(
            store
                .update_spinner_config("rest_missing", None, &slots)
                .await
                .unwrap()
                .is_none()
        );
    }
}
