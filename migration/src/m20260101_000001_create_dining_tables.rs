use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Statement;

/// Restaurants (游戏化配置视图)
#[derive(DeriveIden)]
enum Restaurants {
    Table,
    Id,
    Name,
    GameUnlockThreshold,
    SpinnerSlots,
    CreatedAt,
    UpdatedAt,
}

/// Dining Sessions (桌台用餐会话)
#[derive(DeriveIden)]
enum DiningSessions {
    Table,
    Id,
    RestaurantId,
    TableId,
    ServerId,
    Items,
    TotalAmount,
    GameStatus,
    RewardWon,
    SpunAt,
    Status,
    CreatedAt,
    ClosedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

/// 金额统一使用最小货币单位 (paise)，概率使用百分比浮点 (0 ~ 100)
/// 初始化演示餐厅 rest_001:
/// - 解锁门槛 200.00 -> 20000
/// - 1 Plate Biriyani 10% / 10% Discount 40% / 1 Idly 30% / Next Spin 20%
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 餐厅表
        manager
            .create_table(
                Table::create()
                    .table(Restaurants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Restaurants::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Restaurants::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Restaurants::GameUnlockThreshold)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Restaurants::SpinnerSlots)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(Restaurants::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(Restaurants::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        // 用餐会话表
        manager
            .create_table(
                Table::create()
                    .table(DiningSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DiningSessions::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DiningSessions::RestaurantId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DiningSessions::TableId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DiningSessions::ServerId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DiningSessions::Items)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(DiningSessions::TotalAmount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DiningSessions::GameStatus)
                            .string_len(16)
                            .not_null()
                            .default("LOCKED"),
                    )
                    .col(ColumnDef::new(DiningSessions::RewardWon).json_binary().null())
                    .col(
                        ColumnDef::new(DiningSessions::SpunAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(DiningSessions::Status)
                            .string_len(16)
                            .not_null()
                            .default("OPEN"),
                    )
                    .col(
                        ColumnDef::new(DiningSessions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(DiningSessions::ClosedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_dining_sessions_restaurant")
                            .from(DiningSessions::Table, DiningSessions::RestaurantId)
                            .to(Restaurants::Table, Restaurants::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // 按餐厅 + 状态查询进行中的会话
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_dining_sessions_restaurant_status")
                    .table(DiningSessions::Table)
                    .col(DiningSessions::RestaurantId)
                    .col(DiningSessions::Status)
                    .to_owned(),
            )
            .await?;

        let conn = manager.get_connection();
        let insert_sql = r#"
INSERT INTO restaurants (id, name, game_unlock_threshold, spinner_slots)
VALUES (
 'rest_001',
 'Spicy Chettinad',
 20000,
 '[
   {"label": "1 Plate Biriyani", "probability": 10.0,
    "reward": {"offer_type": "FREE_ITEM", "value": 0, "description": "1 Plate Biriyani", "item_name": "Biriyani"}},
   {"label": "10% Discount", "probability": 40.0,
    "reward": {"offer_type": "PERCENTAGE_DISCOUNT", "value": 10, "description": "10% Off via SpinWheel"}},
   {"label": "1 Idly", "probability": 30.0,
    "reward": {"offer_type": "FREE_ITEM", "value": 0, "description": "1 Piece Idly", "item_name": "Idly"}},
   {"label": "Next Spin", "probability": 20.0, "reward": null}
 ]'::jsonb
)
ON CONFLICT (id) DO NOTHING;
"#;
        conn.execute(Statement::from_string(
            manager.get_database_backend(),
            insert_sql.to_string(),
        ))
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 删除顺序：会话 -> 餐厅
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(DiningSessions::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().if_exists().table(Restaurants::Table).to_owned())
            .await?;

        Ok(())
    }
}
