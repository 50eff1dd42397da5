use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Brands {
    Table,
    Id,
    Name,
    WalletBalance,
    DailySpendLimit,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    Email,
    FullName,
    IsActive,
    LastPlayedAt,
    CreatedAt,
    UpdatedAt,
}

/// Games (活动场次): fixed budget + time window, status machine
/// SCHEDULED -> ACTIVE -> COMPLETED / CANCELLED / BUDGET_EXHAUSTED
#[derive(DeriveIden)]
enum Games {
    Table,
    Id,
    GameCode,
    StartTime,
    EndTime,
    TotalBudget,
    RemainingBudget,
    Status,
    WinProbability,
    VolatilityFactor,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Vouchers {
    Table,
    Id,
    VoucherCode,
    BrandId,
    Description,
    Cost,
    InitialQuantity,
    CurrentQuantity,
    ExpiresAt,
    IsActive,
    Version,
    CreatedAt,
    UpdatedAt,
}

/// 游戏与品牌出资关联 (锁定出资额, 创建后不可变)
#[derive(DeriveIden)]
enum GameBrandLinks {
    Table,
    Id,
    GameId,
    BrandId,
    ContributionAmount,
    IsLocked,
    CreatedAt,
}

#[derive(DeriveIden)]
enum RewardTransactions {
    Table,
    Id,
    UserId,
    GameId,
    VoucherId,
    BatchId,
    Status,
    Amount,
    RewardMessage,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // brands
        manager
            .create_table(
                Table::create()
                    .table(Brands::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Brands::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Brands::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Brands::WalletBalance)
                            .decimal_len(19, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Brands::DailySpendLimit)
                            .decimal_len(19, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Brands::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Brands::CreatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Brands::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_brands_name_unique")
                    .table(Brands::Table)
                    .col(Brands::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // users
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Username).string_len(100).not_null())
                    .col(ColumnDef::new(Users::Email).string_len(255).null())
                    .col(ColumnDef::new(Users::FullName).string_len(255).null())
                    .col(
                        ColumnDef::new(Users::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Users::LastPlayedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Users::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_users_username_unique")
                    .table(Users::Table)
                    .col(Users::Username)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // games
        manager
            .create_table(
                Table::create()
                    .table(Games::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Games::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Games::GameCode).string_len(50).not_null())
                    .col(
                        ColumnDef::new(Games::StartTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Games::EndTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Games::TotalBudget)
                            .decimal_len(19, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Games::RemainingBudget)
                            .decimal_len(19, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Games::Status)
                            .string_len(20)
                            .not_null()
                            .default("SCHEDULED"),
                    )
                    .col(
                        ColumnDef::new(Games::WinProbability)
                            .double()
                            .not_null()
                            .default(0.15),
                    )
                    .col(
                        ColumnDef::new(Games::VolatilityFactor)
                            .double()
                            .not_null()
                            .default(1.2),
                    )
                    .col(
                        ColumnDef::new(Games::Version)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Games::CreatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Games::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_games_game_code_unique")
                    .table(Games::Table)
                    .col(Games::GameCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 生命周期扫描按状态查询
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_games_status")
                    .table(Games::Table)
                    .col(Games::Status)
                    .to_owned(),
            )
            .await?;

        // vouchers
        manager
            .create_table(
                Table::create()
                    .table(Vouchers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Vouchers::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Vouchers::VoucherCode)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Vouchers::BrandId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Vouchers::Description)
                            .string_len(500)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Vouchers::Cost).decimal_len(19, 2).not_null())
                    .col(
                        ColumnDef::new(Vouchers::InitialQuantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Vouchers::CurrentQuantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Vouchers::ExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Vouchers::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Vouchers::Version)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Vouchers::CreatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Vouchers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vouchers_brand")
                            .from(Vouchers::Table, Vouchers::BrandId)
                            .to(Brands::Table, Brands::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_vouchers_code_unique")
                    .table(Vouchers::Table)
                    .col(Vouchers::VoucherCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 批处理候选券查询: brand_id + is_active / current_quantity
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_vouchers_brand_active")
                    .table(Vouchers::Table)
                    .col(Vouchers::BrandId)
                    .col(Vouchers::IsActive)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_vouchers_current_quantity")
                    .table(Vouchers::Table)
                    .col(Vouchers::CurrentQuantity)
                    .to_owned(),
            )
            .await?;

        // game_brand_links
        manager
            .create_table(
                Table::create()
                    .table(GameBrandLinks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GameBrandLinks::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(GameBrandLinks::GameId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GameBrandLinks::BrandId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GameBrandLinks::ContributionAmount)
                            .decimal_len(19, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GameBrandLinks::IsLocked)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(GameBrandLinks::CreatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_game_brand_links_game")
                            .from(GameBrandLinks::Table, GameBrandLinks::GameId)
                            .to(Games::Table, Games::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_game_brand_links_brand")
                            .from(GameBrandLinks::Table, GameBrandLinks::BrandId)
                            .to(Brands::Table, Brands::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_game_brand_links_pair_unique")
                    .table(GameBrandLinks::Table)
                    .col(GameBrandLinks::GameId)
                    .col(GameBrandLinks::BrandId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // reward_transactions (append-only)
        manager
            .create_table(
                Table::create()
                    .table(RewardTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RewardTransactions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RewardTransactions::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RewardTransactions::GameId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RewardTransactions::VoucherId)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(RewardTransactions::BatchId)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RewardTransactions::Status)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RewardTransactions::Amount)
                            .decimal_len(19, 2)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(RewardTransactions::RewardMessage)
                            .string_len(500)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RewardTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reward_transactions_user")
                            .from(RewardTransactions::Table, RewardTransactions::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reward_transactions_game")
                            .from(RewardTransactions::Table, RewardTransactions::GameId)
                            .to(Games::Table, Games::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reward_transactions_voucher")
                            .from(RewardTransactions::Table, RewardTransactions::VoucherId)
                            .to(Vouchers::Table, Vouchers::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // 幂等探测 (batch_id)
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_reward_transactions_batch")
                    .table(RewardTransactions::Table)
                    .col(RewardTransactions::BatchId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_reward_transactions_user_game")
                    .table(RewardTransactions::Table)
                    .col(RewardTransactions::UserId)
                    .col(RewardTransactions::GameId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 删除顺序: 先子表后父表
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(RewardTransactions::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(GameBrandLinks::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Vouchers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Games::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Users::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Brands::Table).to_owned())
            .await?;

        Ok(())
    }
}
