use crate::entities::brand_entity as brands;
use crate::error::{AppError, AppResult};
use crate::models::{BrandResponse, CreateBrandRequest};
use crate::utils::money;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};

#[derive(Clone)]
pub struct BrandService {
    db: DatabaseConnection,
}

impl BrandService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create_brand(&self, request: CreateBrandRequest) -> AppResult<BrandResponse> {
        if request.name.trim().is_empty() {
            return Err(AppError::ValidationError("Brand name is required".into()));
        }
        if request.initial_balance < Decimal::ZERO {
            return Err(AppError::ValidationError(
                "Initial balance cannot be negative".into(),
            ));
        }

        let exists = brands::Entity::find()
            .filter(brands::Column::Name.eq(request.name.clone()))
            .one(&self.db)
            .await?;
        if exists.is_some() {
            return Err(AppError::ValidationError(format!(
                "Brand with name already exists: {}",
                request.name
            )));
        }

        log::info!(
            "Creating brand: {} with initial balance: {}",
            request.name,
            request.initial_balance
        );

        let now = chrono::Utc::now();
        let created = brands::ActiveModel {
            name: Set(request.name),
            wallet_balance: Set(money::round_money(request.initial_balance)),
            daily_spend_limit: Set(request
                .daily_spend_limit
                .map(money::round_money)
                .unwrap_or(Decimal::ZERO)),
            is_active: Set(true),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        Ok(created.into())
    }

    pub async fn get_brand(&self, id: i64) -> AppResult<BrandResponse> {
        let brand = brands::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Brand not found: {id}")))?;
        Ok(brand.into())
    }

    pub async fn list_active_brands(&self) -> AppResult<Vec<BrandResponse>> {
        let list = brands::Entity::find()
            .filter(brands::Column::IsActive.eq(true))
            .order_by_asc(brands::Column::Id)
            .all(&self.db)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    /// 管理端充值
    pub async fn deposit_funds(&self, id: i64, amount: Decimal) -> AppResult<BrandResponse> {
        if amount <= Decimal::ZERO {
            return Err(AppError::ValidationError(
                "Deposit amount must be positive".into(),
            ));
        }

        let txn = self.db.begin().await?;
        let brand = brands::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Brand not found: {id}")))?;

        let new_balance = brand.wallet_balance + money::round_money(amount);
        let mut am = brand.into_active_model();
        am.wallet_balance = Set(new_balance);
        am.updated_at = Set(Some(chrono::Utc::now()));
        let updated = am.update(&txn).await?;
        txn.commit().await?;

        log::info!("Deposited {amount} to brand {id}");
        Ok(updated.into())
    }

    /// 启用/停用品牌 (停用后不再出现在启用品牌列表中)
    pub async fn set_status(&self, id: i64, is_active: bool) -> AppResult<BrandResponse> {
        let txn = self.db.begin().await?;
        let brand = brands::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Brand not found: {id}")))?;

        let mut am = brand.into_active_model();
        am.is_active = Set(is_active);
        am.updated_at = Set(Some(chrono::Utc::now()));
        let updated = am.update(&txn).await?;
        txn.commit().await?;

        log::info!("Brand {id} active status set to {is_active}");
        Ok(updated.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use rust_decimal_macros::dec;

    fn create_request(name: &str) -> CreateBrandRequest {
        CreateBrandRequest {
            name: name.to_string(),
            initial_balance: dec!(500.00),
            daily_spend_limit: None,
        }
    }

    #[tokio::test]
    async fn test_create_brand_and_deposit() {
        let db = test_support::db().await;
        let service = BrandService::new(db);

        let brand = service.create_brand(create_request("Nike")).await.unwrap();
        assert_eq!(brand.wallet_balance, dec!(500.00));
        assert!(brand.is_active);

        let topped_up = service.deposit_funds(brand.id, dec!(250.50)).await.unwrap();
        assert_eq!(topped_up.wallet_balance, dec!(750.50));
    }

    #[tokio::test]
    async fn test_duplicate_brand_name_rejected() {
        let db = test_support::db().await;
        let service = BrandService::new(db);

        service.create_brand(create_request("Nike")).await.unwrap();
        let err = service.create_brand(create_request("Nike")).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_deactivate_brand() {
        let db = test_support::db().await;
        let service = BrandService::new(db);
        let brand = service.create_brand(create_request("Puma")).await.unwrap();

        let updated = service.set_status(brand.id, false).await.unwrap();
        assert!(!updated.is_active);

        // 停用后不再出现在启用品牌列表中
        let listed = service.list_active_brands().await.unwrap();
        assert!(listed.iter().all(|b| b.id != brand.id));

        let restored = service.set_status(brand.id, true).await.unwrap();
        assert!(restored.is_active);
    }

    #[tokio::test]
    async fn test_deposit_must_be_positive() {
        let db = test_support::db().await;
        let service = BrandService::new(db);
        let brand = service.create_brand(create_request("Adidas")).await.unwrap();

        let err = service.deposit_funds(brand.id, dec!(0.00)).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }
}
