use crate::entities::{brand_entity as brands, voucher_entity as vouchers};
use crate::error::{AppError, AppResult};
use crate::models::{CreateVoucherRequest, VoucherResponse};
use crate::utils::money;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

#[derive(Clone)]
pub struct VoucherService {
    db: DatabaseConnection,
}

impl VoucherService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// 创建奖券: 只校验品牌钱包能覆盖 cost × quantity, 不实际扣款
    /// (扣款发生在创建游戏锁定出资时)
    pub async fn create_voucher(&self, request: CreateVoucherRequest) -> AppResult<VoucherResponse> {
        if request.voucher_code.trim().is_empty() {
            return Err(AppError::ValidationError("Voucher code is required".into()));
        }
        if request.cost <= Decimal::ZERO {
            return Err(AppError::ValidationError("Cost must be positive".into()));
        }
        if request.quantity < 0 {
            return Err(AppError::ValidationError(
                "Quantity cannot be negative".into(),
            ));
        }

        let txn = self.db.begin().await?;

        let exists = vouchers::Entity::find()
            .filter(vouchers::Column::VoucherCode.eq(request.voucher_code.clone()))
            .one(&txn)
            .await?;
        if exists.is_some() {
            return Err(AppError::ValidationError(format!(
                "Voucher code already exists: {}",
                request.voucher_code
            )));
        }

        let brand = brands::Entity::find_by_id(request.brand_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Brand not found: {}", request.brand_id)))?;

        let total_value = money::round_money(request.cost) * Decimal::from(request.quantity);
        if !brand.can_afford(total_value) {
            return Err(AppError::InsufficientFunds(format!(
                "Brand cannot afford voucher inventory. Total value: {}, Available: {}",
                total_value, brand.wallet_balance
            )));
        }

        log::info!(
            "Creating voucher: {} for brand: {}",
            request.voucher_code,
            request.brand_id
        );

        let now = chrono::Utc::now();
        let created = vouchers::ActiveModel {
            voucher_code: Set(request.voucher_code),
            brand_id: Set(request.brand_id),
            description: Set(request.description),
            cost: Set(money::round_money(request.cost)),
            initial_quantity: Set(request.quantity),
            current_quantity: Set(request.quantity),
            expires_at: Set(request.expires_at),
            is_active: Set(true),
            version: Set(0),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(created.into())
    }

    pub async fn get_voucher(&self, id: i64) -> AppResult<VoucherResponse> {
        let voucher = vouchers::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Voucher not found: {id}")))?;
        Ok(voucher.into())
    }

    pub async fn list_by_brand(&self, brand_id: i64) -> AppResult<Vec<VoucherResponse>> {
        let list = vouchers::Entity::find()
            .filter(vouchers::Column::BrandId.eq(brand_id))
            .order_by_asc(vouchers::Column::Id)
            .all(&self.db)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    /// 补货: initial 与 current 同步增加, 保持 current <= initial 不变量
    pub async fn restock(&self, id: i64, quantity: i32) -> AppResult<VoucherResponse> {
        if quantity <= 0 {
            return Err(AppError::ValidationError(
                "Restock quantity must be positive".into(),
            ));
        }

        let txn = self.db.begin().await?;
        let voucher = vouchers::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Voucher not found: {id}")))?;

        let result = vouchers::Entity::update_many()
            .col_expr(
                vouchers::Column::InitialQuantity,
                Expr::value(voucher.initial_quantity + quantity),
            )
            .col_expr(
                vouchers::Column::CurrentQuantity,
                Expr::value(voucher.current_quantity + quantity),
            )
            .col_expr(vouchers::Column::Version, Expr::value(voucher.version + 1))
            .col_expr(vouchers::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
            .filter(vouchers::Column::Id.eq(voucher.id))
            .filter(vouchers::Column::Version.eq(voucher.version))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::Conflict(format!(
                "Voucher {id} was modified concurrently"
            )));
        }

        let updated = vouchers::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Voucher not found: {id}")))?;
        txn.commit().await?;

        log::info!("Added {quantity} inventory to voucher {id}");
        Ok(updated.into())
    }

    pub async fn set_status(&self, id: i64, is_active: bool) -> AppResult<VoucherResponse> {
        let txn = self.db.begin().await?;
        let voucher = vouchers::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Voucher not found: {id}")))?;

        let result = vouchers::Entity::update_many()
            .col_expr(vouchers::Column::IsActive, Expr::value(is_active))
            .col_expr(vouchers::Column::Version, Expr::value(voucher.version + 1))
            .col_expr(vouchers::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
            .filter(vouchers::Column::Id.eq(voucher.id))
            .filter(vouchers::Column::Version.eq(voucher.version))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::Conflict(format!(
                "Voucher {id} was modified concurrently"
            )));
        }

        let updated = vouchers::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Voucher not found: {id}")))?;
        txn.commit().await?;
        Ok(updated.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use rust_decimal_macros::dec;

    async fn setup() -> (DatabaseConnection, VoucherService, i64) {
        let db = test_support::db().await;
        let brand = test_support::insert_brand(&db, "Nike", dec!(1000.00)).await;
        let service = VoucherService::new(db.clone());
        (db, service, brand.id)
    }

    fn create_request(brand_id: i64, code: &str, cost: Decimal, quantity: i32) -> CreateVoucherRequest {
        CreateVoucherRequest {
            brand_id,
            voucher_code: code.to_string(),
            description: format!("{code} voucher"),
            cost,
            quantity,
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_voucher_within_wallet() {
        let (_db, service, brand_id) = setup().await;
        let voucher = service
            .create_voucher(create_request(brand_id, "NIKE10", dec!(10.00), 100))
            .await
            .unwrap();
        assert_eq!(voucher.cost, dec!(10.00));
        assert_eq!(voucher.initial_quantity, 100);
        assert_eq!(voucher.current_quantity, 100);
    }

    #[tokio::test]
    async fn test_create_voucher_exceeding_wallet_rejected() {
        let (_db, service, brand_id) = setup().await;
        let err = service
            .create_voucher(create_request(brand_id, "NIKE50", dec!(50.00), 100))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientFunds(_)));
    }

    #[tokio::test]
    async fn test_restock_raises_both_quantities() {
        let (_db, service, brand_id) = setup().await;
        let voucher = service
            .create_voucher(create_request(brand_id, "NIKE5", dec!(5.00), 10))
            .await
            .unwrap();

        let restocked = service.restock(voucher.id, 15).await.unwrap();
        assert_eq!(restocked.initial_quantity, 25);
        assert_eq!(restocked.current_quantity, 25);
    }

    #[tokio::test]
    async fn test_deactivate_voucher() {
        let (_db, service, brand_id) = setup().await;
        let voucher = service
            .create_voucher(create_request(brand_id, "NIKE1", dec!(1.00), 10))
            .await
            .unwrap();

        let updated = service.set_status(voucher.id, false).await.unwrap();
        assert!(!updated.is_active);
    }
}
