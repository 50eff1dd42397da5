use crate::models::GameStatus;
use crate::utils::money;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

/// 活动场次实体
/// 概念说明:
/// - remaining_budget: 剩余预算, 只能由批处理提交单调递减
/// - win_probability: 每次 roll 独立生效 (0 < p <= 1)
/// - volatility_factor: tick 预算放大系数, 允许突发流量略超均匀速率
/// - version: 乐观锁版本号
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "games")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub game_code: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_budget: Decimal,
    pub remaining_budget: Decimal,
    pub status: GameStatus,
    pub win_probability: f64,
    pub volatility_factor: f64,
    pub version: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    /// Whole seconds until the end of the game window (0 once past it).
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        if now >= self.end_time {
            return 0;
        }
        (self.end_time - now).num_seconds()
    }

    /// A game accepts spend only while ACTIVE, funded, and inside its window.
    pub fn is_active_and_funded(&self, now: DateTime<Utc>) -> bool {
        self.status == GameStatus::Active
            && self.remaining_budget > Decimal::ZERO
            && now < self.end_time
    }

    /// Budget a single tick may authorize:
    /// `(remaining_budget / remaining_seconds) * volatility_factor`,
    /// division HALF_UP at scale 2, capped at `remaining_budget`.
    ///
    /// Sub-second remainders release the whole remaining budget; inactive,
    /// unfunded, or ended games get zero.
    pub fn tick_budget(&self, now: DateTime<Utc>) -> Decimal {
        if self.status != GameStatus::Active
            || self.remaining_budget <= Decimal::ZERO
            || now >= self.end_time
        {
            return Decimal::ZERO;
        }

        let seconds_left = self.remaining_seconds(now);
        if seconds_left <= 0 {
            return self.remaining_budget;
        }

        let per_second = money::div_money(self.remaining_budget, Decimal::from(seconds_left));
        let tick = per_second * money::factor_to_decimal(self.volatility_factor);
        tick.min(self.remaining_budget)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn game_with(remaining: Decimal, seconds_left: i64, volatility: f64) -> Model {
        let now = fixed_now();
        Model {
            id: 1,
            game_code: "GAME_TEST".to_string(),
            start_time: now - Duration::minutes(5),
            end_time: now + Duration::seconds(seconds_left),
            total_budget: remaining,
            remaining_budget: remaining,
            status: GameStatus::Active,
            win_probability: 0.15,
            volatility_factor: volatility,
            version: 0,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_tick_budget_pacing() {
        // 10000 / 900s = 11.11 per second, * 1.2 = 13.332
        let game = game_with(dec!(10000.00), 900, 1.2);
        assert_eq!(game.tick_budget(fixed_now()), dec!(13.332));
    }

    #[test]
    fn test_tick_budget_capped_at_remaining() {
        let game = game_with(dec!(5.00), 10, 50.0);
        assert_eq!(game.tick_budget(fixed_now()), dec!(5.00));
    }

    #[test]
    fn test_tick_budget_zero_when_not_active() {
        let mut game = game_with(dec!(100.00), 60, 1.2);
        game.status = GameStatus::Completed;
        assert_eq!(game.tick_budget(fixed_now()), Decimal::ZERO);
    }

    #[test]
    fn test_tick_budget_zero_when_unfunded() {
        let game = game_with(Decimal::ZERO, 60, 1.2);
        assert_eq!(game.tick_budget(fixed_now()), Decimal::ZERO);
    }

    #[test]
    fn test_tick_budget_zero_after_end_time() {
        let game = game_with(dec!(100.00), 60, 1.2);
        let late = fixed_now() + Duration::seconds(61);
        assert_eq!(game.tick_budget(late), Decimal::ZERO);
    }

    #[test]
    fn test_tick_budget_releases_remainder_in_final_second() {
        let game = game_with(dec!(100.00), 60, 1.2);
        // 600ms before the end: floor(seconds_until) == 0
        let almost_over = game.end_time - Duration::milliseconds(600);
        assert_eq!(game.tick_budget(almost_over), dec!(100.00));
    }

    #[test]
    fn test_is_active_and_funded() {
        let now = fixed_now();
        let game = game_with(dec!(10.00), 60, 1.2);
        assert!(game.is_active_and_funded(now));

        let mut completed = game.clone();
        completed.status = GameStatus::Completed;
        assert!(!completed.is_active_and_funded(now));

        let mut drained = game.clone();
        drained.remaining_budget = Decimal::ZERO;
        assert!(!drained.is_active_and_funded(now));

        assert!(!game.is_active_and_funded(game.end_time));
    }

    #[test]
    fn test_remaining_seconds_floors() {
        let game = game_with(dec!(10.00), 90, 1.2);
        let now = fixed_now() + Duration::milliseconds(500);
        assert_eq!(game.remaining_seconds(now), 89);
        assert_eq!(game.remaining_seconds(game.end_time), 0);
        assert_eq!(game.remaining_seconds(game.end_time + Duration::seconds(5)), 0);
    }
}
