use std::sync::Arc;

use crate::database::{Repositories, RestaurantConfigStore};
use crate::error::{AppError, AppResult};
use crate::models::{RestaurantConfig, UpdateSpinnerConfigRequest};

/// 餐厅游戏化配置（门槛 + 转盘）
#[derive(Clone)]
pub struct RestaurantService {
    restaurants: Arc<dyn RestaurantConfigStore>,
}

impl RestaurantService {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            restaurants: repos.restaurants.clone(),
        }
    }

    pub async fn get_config(&self, restaurant_id: &str) -> AppResult<RestaurantConfig> {
        self.restaurants
            .get_config(restaurant_id)
            .await?
            .ok_or_else(|| AppError::RestaurantNotFound(restaurant_id.to_string()))
    }

    /// 替换转盘配置；进行中的会话在下一次转盘时读取新配置
    pub async fn update_spinner_config(
        &self,
        restaurant_id: &str,
        request: UpdateSpinnerConfigRequest,
    ) -> AppResult<RestaurantConfig> {
        request.validate()?;

        let updated = self
            .restaurants
            .update_spinner_config(
                restaurant_id,
                request.game_unlock_threshold,
                &request.spinner_slots,
            )
            .await?
            .ok_or_else(|| AppError::RestaurantNotFound(restaurant_id.to_string()))?;

        log::info!(
            "Updated spinner config for restaurant {restaurant_id}: {} slot(s), threshold {}",
            updated.spinner_slots.len(),
            updated.game_unlock_threshold
        );
        Ok(updated)
    }
}
