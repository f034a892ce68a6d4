// ==========================================
// 建材商品目录系统 - 商品数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 约束: barcode / product_key 全库唯一
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::product::{
    NewProduct, NewProductParameter, Product, ProductDraft, ProductPage, ProductParameter,
    ProductUpdate,
};
use crate::i18n;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::product_import_repo::{BatchInsertOutcome, ProductImportRepository};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

const PRODUCT_COLUMNS: &str = "id, brand_id, name, description, price, unit, image, department, \
     barcode, product_key, created_at, updated_at";

// ==========================================
// ProductRepository - 商品仓储
// ==========================================
pub struct ProductRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductRepository {
    /// 创建新的 ProductRepository 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建单个商品（条码/编码重复时报错）
    pub fn create_product(
        &self,
        product: &NewProduct,
        parameters: &[NewProductParameter],
    ) -> RepositoryResult<Product> {
        let mut conn = self.get_conn()?;
        if let Some(reason) = find_duplicate(&conn, &product.barcode, &product.key, None)? {
            return Err(RepositoryError::UniqueConstraintViolation(reason));
        }

        let tx = conn.transaction()?;
        let created = insert_product(&tx, product, parameters)?;
        tx.commit()?;
        Ok(created)
    }

    /// 批量写入（单事务）
    ///
    /// 与库内或本批前序行条码/编码冲突的行被跳过，并在 skipped 中说明；
    /// 任一 SQL 失败则整批回滚并返回错误。
    pub fn insert_batch(&self, drafts: &[ProductDraft]) -> RepositoryResult<BatchInsertOutcome> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let mut outcome = BatchInsertOutcome::default();
        for draft in drafts {
            let product = &draft.product;
            if let Some(reason) = find_duplicate(&tx, &product.barcode, &product.key, None)? {
                warn!(barcode = %product.barcode, key = %product.key, "跳过重复商品");
                outcome.skipped.push(reason);
                continue;
            }
            outcome
                .created
                .push(insert_product(&tx, product, &draft.parameters)?);
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        debug!(
            created = outcome.created.len(),
            skipped = outcome.skipped.len(),
            "批量写入完成"
        );
        Ok(outcome)
    }

    /// 按 ID 查询（含参数）
    pub fn get_product(&self, id: &str) -> RepositoryResult<Option<Product>> {
        let conn = self.get_conn()?;
        let product = conn
            .query_row(
                &format!("SELECT {} FROM product WHERE id = ?1", PRODUCT_COLUMNS),
                params![id],
                map_product_row,
            )
            .optional()?;

        match product {
            Some(mut p) => {
                p.parameters = load_parameters(&conn, &p.id)?;
                Ok(Some(p))
            }
            None => Ok(None),
        }
    }

    /// 部分更新商品；parameters 非空时整体替换参数
    ///
    /// # 返回
    /// - Ok(None): 商品不存在
    pub fn update_product(
        &self,
        id: &str,
        update: &ProductUpdate,
    ) -> RepositoryResult<Option<Product>> {
        let mut product = match self.get_product(id)? {
            Some(p) => p,
            None => return Ok(None),
        };

        if let Some(v) = &update.name {
            product.name = v.clone();
        }
        if let Some(v) = &update.description {
            product.description = v.clone();
        }
        if let Some(v) = update.price {
            product.price = v;
        }
        if let Some(v) = &update.unit {
            product.unit = v.clone();
        }
        if let Some(v) = &update.image {
            product.image = v.clone();
        }
        if let Some(v) = &update.department {
            product.department = v.clone();
        }
        if let Some(v) = &update.barcode {
            product.barcode = v.clone();
        }
        if let Some(v) = &update.key {
            product.key = v.clone();
        }
        product.updated_at = Utc::now();

        let mut conn = self.get_conn()?;
        if let Some(reason) = find_duplicate(&conn, &product.barcode, &product.key, Some(id))? {
            return Err(RepositoryError::UniqueConstraintViolation(reason));
        }

        let tx = conn.transaction()?;
        tx.execute(
            "UPDATE product SET name = ?2, description = ?3, price = ?4, unit = ?5, image = ?6,
                 department = ?7, barcode = ?8, product_key = ?9, updated_at = ?10
             WHERE id = ?1",
            params![
                product.id,
                product.name,
                product.description,
                product.price,
                product.unit,
                product.image,
                product.department,
                product.barcode,
                product.key,
                product.updated_at,
            ],
        )?;

        if let Some(parameters) = update.parameters.as_ref().filter(|p| !p.is_empty()) {
            tx.execute(
                "DELETE FROM product_parameter WHERE product_id = ?1",
                params![product.id],
            )?;
            product.parameters = insert_parameters(&tx, &product.id, parameters)?;
        }
        tx.commit()?;

        Ok(Some(product))
    }

    /// 删除商品
    ///
    /// # 返回
    /// - Ok(false): 商品不存在
    pub fn delete_product(&self, id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM product WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    /// 品牌下商品分页查询
    ///
    /// # 参数
    /// - page: 从 1 开始
    /// - search: 名称/描述/编码/条码的包含匹配（大小写不敏感）
    pub fn list_products_by_brand(
        &self,
        brand_id: &str,
        page: usize,
        limit: usize,
        search: &str,
    ) -> RepositoryResult<ProductPage> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM product WHERE brand_id = ?1 ORDER BY created_at ASC, rowid ASC",
            PRODUCT_COLUMNS
        ))?;
        let all = stmt
            .query_map(params![brand_id], map_product_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let needle = search.trim().to_lowercase();
        let filtered: Vec<Product> = if needle.is_empty() {
            all
        } else {
            all.into_iter()
                .filter(|p| {
                    p.name.to_lowercase().contains(&needle)
                        || p.description.to_lowercase().contains(&needle)
                        || p.key.to_lowercase().contains(&needle)
                        || p.barcode.to_lowercase().contains(&needle)
                })
                .collect()
        };

        let total = filtered.len();
        let start = page.max(1).saturating_sub(1).saturating_mul(limit);
        let mut products: Vec<Product> = filtered.into_iter().skip(start).take(limit).collect();
        for p in products.iter_mut() {
            p.parameters = load_parameters(&conn, &p.id)?;
        }

        Ok(ProductPage { products, total })
    }

    /// 全部商品（含参数，导出用）
    pub fn list_products(&self) -> RepositoryResult<Vec<Product>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM product ORDER BY created_at ASC, rowid ASC",
            PRODUCT_COLUMNS
        ))?;
        let mut products = stmt
            .query_map([], map_product_row)?
            .collect::<Result<Vec<_>, _>>()?;
        for p in products.iter_mut() {
            p.parameters = load_parameters(&conn, &p.id)?;
        }
        Ok(products)
    }

    /// 清空品牌下所有商品
    ///
    /// # 返回
    /// - 删除的商品数
    pub fn clear_brand_products(&self, brand_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM product WHERE brand_id = ?1", params![brand_id])?;
        Ok(affected)
    }

    /// 品牌下商品数
    pub fn count_by_brand(&self, brand_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM product WHERE brand_id = ?1",
            params![brand_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

// ==========================================
// ProductImportRepository Trait 实现
// ==========================================
#[async_trait]
impl ProductImportRepository for ProductRepository {
    async fn create_products_batch(
        &self,
        drafts: Vec<ProductDraft>,
    ) -> RepositoryResult<BatchInsertOutcome> {
        self.insert_batch(&drafts)
    }
}

/// 检查条码/编码冲突，返回本地化说明
fn find_duplicate(
    conn: &Connection,
    barcode: &str,
    key: &str,
    exclude_id: Option<&str>,
) -> RepositoryResult<Option<String>> {
    let exclude = exclude_id.unwrap_or("");

    let barcode_taken = conn
        .query_row(
            "SELECT 1 FROM product WHERE barcode = ?1 AND id <> ?2 LIMIT 1",
            params![barcode, exclude],
            |_row| Ok(()),
        )
        .optional()?
        .is_some();
    if barcode_taken {
        return Ok(Some(i18n::t_with_args(
            "catalog.barcode_exists",
            &[("barcode", barcode)],
        )));
    }

    let key_taken = conn
        .query_row(
            "SELECT 1 FROM product WHERE product_key = ?1 AND id <> ?2 LIMIT 1",
            params![key, exclude],
            |_row| Ok(()),
        )
        .optional()?
        .is_some();
    if key_taken {
        return Ok(Some(i18n::t_with_args("catalog.key_exists", &[("key", key)])));
    }

    Ok(None)
}

fn insert_product(
    conn: &Connection,
    new_product: &NewProduct,
    parameters: &[NewProductParameter],
) -> RepositoryResult<Product> {
    let now = Utc::now();
    let id = Uuid::new_v4().to_string();

    conn.execute(
        "INSERT INTO product (id, brand_id, name, description, price, unit, image, department,
             barcode, product_key, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
        params![
            id,
            new_product.brand_id,
            new_product.name,
            new_product.description,
            new_product.price,
            new_product.unit,
            new_product.image,
            new_product.department,
            new_product.barcode,
            new_product.key,
            now,
        ],
    )?;
    let parameters = insert_parameters(conn, &id, parameters)?;

    Ok(Product {
        id,
        brand_id: new_product.brand_id.clone(),
        name: new_product.name.clone(),
        description: new_product.description.clone(),
        price: new_product.price,
        unit: new_product.unit.clone(),
        image: new_product.image.clone(),
        department: new_product.department.clone(),
        barcode: new_product.barcode.clone(),
        key: new_product.key.clone(),
        created_at: now,
        updated_at: now,
        parameters,
    })
}

fn insert_parameters(
    conn: &Connection,
    product_id: &str,
    parameters: &[NewProductParameter],
) -> RepositoryResult<Vec<ProductParameter>> {
    let mut stmt = conn.prepare(
        "INSERT INTO product_parameter (id, product_id, name, value, param_type, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;

    let now = Utc::now();
    let mut stored = Vec::with_capacity(parameters.len());
    for param in parameters {
        let record = ProductParameter {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            name: param.name.clone(),
            value: param.value.clone(),
            param_type: param.param_type.clone(),
            created_at: now,
        };
        stmt.execute(params![
            record.id,
            record.product_id,
            record.name,
            record.value,
            record.param_type,
            record.created_at,
        ])?;
        stored.push(record);
    }
    Ok(stored)
}

fn load_parameters(conn: &Connection, product_id: &str) -> RepositoryResult<Vec<ProductParameter>> {
    let mut stmt = conn.prepare(
        "SELECT id, product_id, name, value, param_type, created_at
         FROM product_parameter WHERE product_id = ?1 ORDER BY rowid ASC",
    )?;
    let parameters = stmt
        .query_map(params![product_id], |row| {
            Ok(ProductParameter {
                id: row.get(0)?,
                product_id: row.get(1)?,
                name: row.get(2)?,
                value: row.get(3)?,
                param_type: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(parameters)
}

fn map_product_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        brand_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        price: row.get(4)?,
        unit: row.get(5)?,
        image: row.get(6)?,
        department: row.get(7)?,
        barcode: row.get(8)?,
        key: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
        parameters: Vec::new(),
    })
}
