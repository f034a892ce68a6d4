// ==========================================
// 建材商品目录系统 - 目录 API
// ==========================================
// 职责: 品牌/商品/导入格式的增删改查 + 数据导出
// 约束: 每个操作先按当前会话角色做权限检查
// ==========================================

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::auth::{permissions, AuthService};
use crate::domain::brand::{Brand, BrandUpdate, NewBrand};
use crate::domain::format::{ExcelFormat, NewFormat, NewFormatField};
use crate::domain::product::{NewProduct, NewProductParameter, Product, ProductPage, ProductUpdate};
use crate::domain::types::{Action, Resource};
use crate::domain::user::User;
use crate::i18n;
use crate::importer::FormatRegistry;
use crate::repository::{BrandRepository, ProductRepository, UserRepository};

/// 全量导出快照
#[derive(Debug, Clone, Serialize)]
pub struct CatalogExport {
    pub brands: Vec<Brand>,
    pub products: Vec<Product>,
    pub formats: Vec<ExcelFormat>,
    pub users: Vec<User>,
    pub exported_at: DateTime<Utc>,
}

// ==========================================
// CatalogApi - 目录 API
// ==========================================
pub struct CatalogApi {
    auth: Arc<AuthService>,
    brand_repo: Arc<BrandRepository>,
    product_repo: Arc<ProductRepository>,
    user_repo: Arc<UserRepository>,
    formats: Arc<FormatRegistry>,
}

impl CatalogApi {
    pub fn new(
        auth: Arc<AuthService>,
        brand_repo: Arc<BrandRepository>,
        product_repo: Arc<ProductRepository>,
        user_repo: Arc<UserRepository>,
        formats: Arc<FormatRegistry>,
    ) -> Self {
        Self {
            auth,
            brand_repo,
            product_repo,
            user_repo,
            formats,
        }
    }

    /// 权限检查（未登录 → Unauthenticated，角色不允许 → PermissionDenied）
    fn authorize(&self, resource: Resource, action: Action) -> ApiResult<User> {
        let user = self.auth.current_user().ok_or(ApiError::Unauthenticated)?;
        if !permissions::has_permission(user.role, resource, action) {
            warn!(user_id = %user.id, role = %user.role, %resource, %action, "权限不足");
            return Err(ApiError::PermissionDenied { resource, action });
        }
        Ok(user)
    }

    // ==========================================
    // 品牌
    // ==========================================

    pub fn list_brands(&self) -> ApiResult<Vec<Brand>> {
        self.authorize(Resource::Brands, Action::Read)?;
        Ok(self.brand_repo.list_brands()?)
    }

    pub fn get_brand(&self, id: &str) -> ApiResult<Brand> {
        self.authorize(Resource::Brands, Action::Read)?;
        self.brand_repo
            .get_brand(id)?
            .ok_or_else(|| ApiError::NotFound(format!("Brand(id={})不存在", id)))
    }

    pub fn create_brand(&self, new_brand: &NewBrand) -> ApiResult<Brand> {
        self.authorize(Resource::Brands, Action::Create)?;
        if new_brand.name.trim().is_empty() {
            return Err(ApiError::InvalidInput("品牌名称不能为空".to_string()));
        }
        let brand = self.brand_repo.create_brand(new_brand)?;
        info!(brand_id = %brand.id, name = %brand.name, "品牌已创建");
        Ok(brand)
    }

    pub fn update_brand(&self, id: &str, update: &BrandUpdate) -> ApiResult<Brand> {
        self.authorize(Resource::Brands, Action::Update)?;
        self.brand_repo
            .update_brand(id, update)?
            .ok_or_else(|| ApiError::NotFound(format!("Brand(id={})不存在", id)))
    }

    /// 删除品牌（级联删除其商品与导入格式）
    pub fn delete_brand(&self, id: &str) -> ApiResult<()> {
        self.authorize(Resource::Brands, Action::Delete)?;
        if !self.brand_repo.delete_brand(id)? {
            return Err(ApiError::NotFound(format!("Brand(id={})不存在", id)));
        }
        info!(brand_id = %id, "品牌已删除");
        Ok(())
    }

    // ==========================================
    // 商品
    // ==========================================

    pub fn list_products(
        &self,
        brand_id: &str,
        page: usize,
        limit: usize,
        search: &str,
    ) -> ApiResult<ProductPage> {
        self.authorize(Resource::Products, Action::Read)?;
        Ok(self
            .product_repo
            .list_products_by_brand(brand_id, page, limit, search)?)
    }

    pub fn get_product(&self, id: &str) -> ApiResult<Product> {
        self.authorize(Resource::Products, Action::Read)?;
        self.product_repo
            .get_product(id)?
            .ok_or_else(|| ApiError::NotFound(format!("Product(id={})不存在", id)))
    }

    pub fn create_product(
        &self,
        product: &NewProduct,
        parameters: &[NewProductParameter],
    ) -> ApiResult<Product> {
        self.authorize(Resource::Products, Action::Create)?;
        if product.name.trim().is_empty() {
            return Err(ApiError::InvalidInput("商品名称不能为空".to_string()));
        }
        Ok(self.product_repo.create_product(product, parameters)?)
    }

    pub fn update_product(&self, id: &str, update: &ProductUpdate) -> ApiResult<Product> {
        self.authorize(Resource::Products, Action::Update)?;
        self.product_repo
            .update_product(id, update)?
            .ok_or_else(|| ApiError::NotFound(format!("Product(id={})不存在", id)))
    }

    pub fn delete_product(&self, id: &str) -> ApiResult<()> {
        self.authorize(Resource::Products, Action::Delete)?;
        if !self.product_repo.delete_product(id)? {
            return Err(ApiError::NotFound(format!("Product(id={})不存在", id)));
        }
        Ok(())
    }

    /// 清空品牌下全部商品，返回提示文本
    pub fn clear_brand_products(&self, brand_id: &str) -> ApiResult<String> {
        self.authorize(Resource::Products, Action::Delete)?;
        let removed = self.product_repo.clear_brand_products(brand_id)?;
        info!(brand_id = %brand_id, removed = removed, "品牌商品已清空");
        let count = removed.to_string();
        Ok(i18n::t_with_args(
            "catalog.products_cleared",
            &[("count", count.as_str())],
        ))
    }

    // ==========================================
    // 导入格式
    // ==========================================

    pub fn formats_for_brand(&self, brand_id: &str) -> ApiResult<Vec<ExcelFormat>> {
        self.authorize(Resource::ExcelFormats, Action::Read)?;
        Ok(self.formats.formats_for_brand(brand_id)?)
    }

    pub fn create_format(
        &self,
        new_format: &NewFormat,
        fields: &[NewFormatField],
    ) -> ApiResult<ExcelFormat> {
        self.authorize(Resource::ExcelFormats, Action::Create)?;
        Ok(self.formats.create_format(new_format, fields)?)
    }

    pub fn delete_format(&self, id: &str) -> ApiResult<()> {
        self.authorize(Resource::ExcelFormats, Action::Delete)?;
        if !self.formats.delete_format(id)? {
            return Err(ApiError::NotFound(format!("ExcelFormat(id={})不存在", id)));
        }
        Ok(())
    }

    // ==========================================
    // 用户 / 导出
    // ==========================================

    pub fn list_users(&self) -> ApiResult<Vec<User>> {
        self.authorize(Resource::Users, Action::Read)?;
        Ok(self.user_repo.list_users()?)
    }

    /// 导出全部数据（格式化 JSON）
    pub fn export_data(&self) -> ApiResult<String> {
        self.authorize(Resource::Users, Action::Read)?;
        let export = CatalogExport {
            brands: self.brand_repo.list_brands()?,
            products: self.product_repo.list_products()?,
            formats: self.formats.list_formats()?,
            users: self.user_repo.list_users()?,
            exported_at: Utc::now(),
        };
        serde_json::to_string_pretty(&export)
            .map_err(|e| ApiError::InternalError(format!("导出序列化失败: {}", e)))
    }
}
