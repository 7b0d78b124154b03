// ==========================================
// 工厂设备维护管理 - 资产台账 API
// ==========================================
// 红线: 资产类型必须存在于画像注册表
// ==========================================

use std::sync::Arc;

use tracing::info;

use crate::api::access_guard::AccessGuard;
use crate::api::error::{ApiError, ApiResult};
use crate::config::asset_profiles::ProfileRegistry;
use crate::domain::access::{pages, RequestContext};
use crate::domain::asset::Asset;
use crate::repository::asset_repo::AssetRepository;
use crate::repository::error::RepositoryError;

pub struct AssetApi {
    asset_repo: Arc<AssetRepository>,
    registry: Arc<ProfileRegistry>,
    guard: Arc<AccessGuard>,
}

impl AssetApi {
    pub fn new(
        asset_repo: Arc<AssetRepository>,
        registry: Arc<ProfileRegistry>,
        guard: Arc<AccessGuard>,
    ) -> Self {
        Self {
            asset_repo,
            registry,
            guard,
        }
    }

    /// 登记资产
    ///
    /// # 错误
    /// - InvalidInput: 编号/类型/位置为空，或类型未注册
    /// - DuplicateKey: 编号已存在
    pub fn register(&self, ctx: &RequestContext, asset: Asset) -> ApiResult<Asset> {
        self.guard.require(ctx, pages::ASSET_MANAGEMENT)?;

        let asset = Asset {
            asset_id: asset.asset_id.trim().to_string(),
            asset_type: asset.asset_type.trim().to_string(),
            location: asset.location.trim().to_string(),
            description: asset.description.trim().to_string(),
            install_date: asset.install_date,
        };
        if asset.asset_id.is_empty() || asset.asset_type.is_empty() || asset.location.is_empty() {
            return Err(ApiError::InvalidInput(
                "资产编号、类型、位置均为必填".to_string(),
            ));
        }
        if !self.registry.contains(&asset.asset_type) {
            return Err(ApiError::InvalidInput(format!(
                "未知资产类型: {}",
                asset.asset_type
            )));
        }

        self.asset_repo.create(&asset).map_err(|e| match e {
            RepositoryError::UniqueConstraintViolation(_) => {
                ApiError::DuplicateKey(format!("资产已存在: {}", asset.asset_id))
            }
            other => ApiError::from(other),
        })?;
        info!(user_id = %ctx.user_id, asset_id = %asset.asset_id, asset_type = %asset.asset_type, "资产已登记");
        Ok(asset)
    }

    pub fn list_assets(&self, ctx: &RequestContext) -> ApiResult<Vec<Asset>> {
        self.guard.require(ctx, pages::ASSET_MANAGEMENT)?;
        Ok(self.asset_repo.list()?)
    }

    pub fn get_asset(&self, ctx: &RequestContext, asset_id: &str) -> ApiResult<Asset> {
        self.guard.require(ctx, pages::ASSET_MANAGEMENT)?;
        self.asset_repo
            .get(asset_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Asset(id={})不存在", asset_id)))
    }

    /// 已注册的资产类型
    pub fn asset_types(&self) -> Vec<String> {
        self.registry.asset_types().map(str::to_string).collect()
    }
}
