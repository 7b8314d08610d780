use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::entities::SessionStatus;
use crate::error::AppResult;
use crate::models::{DiningSession, OfferType, RestaurantConfig, Reward, SpinnerSlot};

use super::repository::{
    RestaurantConfigStore, SessionMutation, SessionPredicate, SessionRepository, UpdateOutcome,
};

/// 进程内会话存储
/// 写锁覆盖 "判断前置条件 + 应用修改"，因此每次条件更新都是原子的；
/// 只适合单实例部署（开发 / 演示 / 测试）
#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<String, DiningSession>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<DiningSession>> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn insert(&self, session: &DiningSession) -> AppResult<()> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn list_open(&self, restaurant_id: &str, limit: u64) -> AppResult<Vec<DiningSession>> {
        let sessions = self.sessions.read().await;
        let mut open: Vec<DiningSession> = sessions
            .values()
            .filter(|s| s.restaurant_id == restaurant_id && s.status == SessionStatus::Open)
            .cloned()
            .collect();
        open.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        open.truncate(limit as usize);
        Ok(open)
    }

    async fn conditional_update(
        &self,
        id: &str,
        predicate: SessionPredicate,
        mutation: SessionMutation,
    ) -> AppResult<UpdateOutcome> {
        let mut sessions = self.sessions.write().await;
        let Some(current) = sessions.get_mut(id) else {
            return Ok(UpdateOutcome::NotFound);
        };
        if !predicate.matches(current) {
            return Ok(UpdateOutcome::PredicateFailed);
        }

        // 先在副本上修改，失败时原记录保持不变
        let mut updated = current.clone();
        mutation.apply(&mut updated)?;
        *current = updated.clone();
        Ok(UpdateOutcome::Applied(updated))
    }
}

/// 进程内餐厅配置
#[derive(Default)]
pub struct InMemoryRestaurantStore {
    restaurants: RwLock<HashMap<String, RestaurantConfig>>,
}

impl InMemoryRestaurantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_restaurants(restaurants: impl IntoIterator<Item = RestaurantConfig>) -> Self {
        Self {
            restaurants: RwLock::new(
                restaurants
                    .into_iter()
                    .map(|r| (r.id.clone(), r))
                    .collect(),
            ),
        }
    }

    /// 演示餐厅，与数据库迁移中的初始化数据一致
    pub fn with_demo_data() -> Self {
        Self::with_restaurants([demo_restaurant()])
    }
}

pub fn demo_restaurant() -> RestaurantConfig {
    RestaurantConfig {
        id: "rest_001".into(),
        name: "Spicy Chettinad".into(),
        game_unlock_threshold: 20000,
        spinner_slots: vec![
            SpinnerSlot {
                label: "1 Plate Biriyani".into(),
                probability: 10.0,
                reward: Some(Reward {
                    offer_type: OfferType::FreeItem,
                    value: 0.0,
                    description: "1 Plate Biriyani".into(),
                    item_name: Some("Biriyani".into()),
                }),
            },
            SpinnerSlot {
                label: "10% Discount".into(),
                probability: 40.0,
                reward: Some(Reward {
                    offer_type: OfferType::PercentageDiscount,
                    value: 10.0,
                    description: "10% Off via SpinWheel".into(),
                    item_name: None,
                }),
            },
            SpinnerSlot {
                label: "1 Idly".into(),
                probability: 30.0,
                reward: Some(Reward {
                    offer_type: OfferType::FreeItem,
                    value: 0.0,
                    description: "1 Piece Idly".into(),
                    item_name: Some("Idly".into()),
                }),
            },
            SpinnerSlot {
                label: "Next Spin".into(),
                probability: 20.0,
                reward: None,
            },
        ],
    }
}

#[async_trait]
impl RestaurantConfigStore for InMemoryRestaurantStore {
    async fn get_config(&self, restaurant_id: &str) -> AppResult<Option<RestaurantConfig>> {
        Ok(self.restaurants.read().await.get(restaurant_id).cloned())
    }

    async fn update_spinner_config(
        &self,
        restaurant_id: &str,
        game_unlock_threshold: Option<i64>,
        spinner_slots: &[SpinnerSlot],
    ) -> AppResult<Option<RestaurantConfig>> {
        let mut restaurants = self.restaurants.write().await;
        let Some(config) = restaurants.get_mut(restaurant_id) else {
            return Ok(None);
        };
        if let Some(threshold) = game_unlock_threshold {
            config.game_unlock_threshold = threshold;
        }
        config.spinner_slots = spinner_slots.to_vec();
        Ok(Some(config.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::GameStatus;
    use crate::models::validate_spinner_slots;
    use crate::services::game_state::GameEvent;

    #[test]
    fn test_demo_restaurant_is_valid() {
        let demo = demo_restaurant();
        assert!(validate_spinner_slots(&demo.spinner_slots).is_ok());
        let total: f64 = demo.spinner_slots.iter().map(|s| s.probability).sum();
        assert_eq!(total, 100.0);
    }

    #[tokio::test]
    async fn test_conditional_update_outcomes() {
        let repo = InMemorySessionRepository::new();
        let session = DiningSession::open("rest_001".into(), "table_001".into(), "srv".into());
        repo.insert(&session).await.unwrap();

        let outcome = repo
            .conditional_update(
                "missing",
                SessionPredicate::any(),
                SessionMutation::game_event(GameEvent::PuzzleWon),
            )
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::NotFound);

        let outcome = repo
            .conditional_update(
                &session.id,
                SessionPredicate::any().game_status(GameStatus::Unlocked),
                SessionMutation::game_event(GameEvent::PuzzleWon),
            )
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::PredicateFailed);

        let stored = repo.find_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.game_status, GameStatus::Locked);
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_record_untouched() {
        let repo = InMemorySessionRepository::new();
        let mut session = DiningSession::open("rest_001".into(), "table_001".into(), "srv".into());
        session.total_amount = i64::MAX - 1;
        repo.insert(&session).await.unwrap();

        let result = repo
            .conditional_update(
                &session.id,
                SessionPredicate::any(),
                SessionMutation::append_items(Vec::new(), 10),
            )
            .await;
        assert!(result.is_err());

        let stored = repo.find_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.total_amount, i64::MAX - 1);
    }

    #[tokio::test]
    async fn test_list_open_filters_restaurant_and_status() {
        let repo = InMemorySessionRepository::new();
        let open = DiningSession::open("rest_001".into(), "table_001".into(), "srv".into());
        let mut billed = DiningSession::open("rest_001".into(), "table_002".into(), "srv".into());
        billed.status = SessionStatus::Billed;
        let other = DiningSession::open("rest_002".into(), "table_001".into(), "srv".into());
        for s in [&open, &billed, &other] {
            repo.insert(s).await.unwrap();
        }

        let listed = repo.list_open("rest_001", 100).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, open.id);
    }

    #[tokio::test]
    async fn test_update_spinner_config() {
        let store = InMemoryRestaurantStore::with_demo_data();
        let slots = vec![SpinnerSlot {
            label: "Everyone wins".into(),
            probability: 100.0,
            reward: None,
        }];
        let updated = store
            .update_spinner_config("rest_001", Some(5000), &slots)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.game_unlock_threshold, 5000);
        assert_eq!(updated.spinner_slots, slots);

        assert!(
            store
                .update_spinner_config("rest_404", None, &slots)
                .await
                .unwrap()
                .is_none()
        );
    }
}
