// ==========================================
// 建材商品目录系统 - 品牌数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 级联: 删除品牌时由外键删除其商品/参数/导入格式
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::brand::{Brand, BrandUpdate, NewBrand};
use crate::i18n;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const BRAND_COLUMNS: &str =
    "id, name, image, description, is_management, created_at, updated_at";

// ==========================================
// BrandRepository - 品牌仓储
// ==========================================
pub struct BrandRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BrandRepository {
    /// 创建新的 BrandRepository 实例
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

    /// 全部品牌（按创建时间升序）
    pub fn list_brands(&self) -> RepositoryResult<Vec<Brand>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM brand ORDER BY created_at ASC, rowid ASC",
            BRAND_COLUMNS
        ))?;
        let brands = stmt
            .query_map([], map_brand_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(brands)
    }

    /// 按 ID 查询
    pub fn get_brand(&self, id: &str) -> RepositoryResult<Option<Brand>> {
        let conn = self.get_conn()?;
        let brand = conn
            .query_row(
                &format!("SELECT {} FROM brand WHERE id = ?1", BRAND_COLUMNS),
                params![id],
                map_brand_row,
            )
            .optional()?;
        Ok(brand)
    }

    /// 创建品牌（名称大小写不敏感唯一）
    pub fn create_brand(&self, new_brand: &NewBrand) -> RepositoryResult<Brand> {
        let conn = self.get_conn()?;
        let name = new_brand.name.trim();
        ensure_name_available(&conn, name, None)?;

        let now = Utc::now();
        let brand = Brand {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            image: new_brand.image.clone(),
            description: new_brand.description.clone(),
            is_management: new_brand.is_management,
            created_at: now,
            updated_at: now,
        };

        conn.execute(
            "INSERT INTO brand (id, name, image, description, is_management, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                brand.id,
                brand.name,
                brand.image,
                brand.description,
                brand.is_management,
                brand.created_at,
                brand.updated_at,
            ],
        )?;
        Ok(brand)
    }

    /// 部分更新品牌
    ///
    /// # 返回
    /// - Ok(None): 品牌不存在
    pub fn update_brand(&self, id: &str, update: &BrandUpdate) -> RepositoryResult<Option<Brand>> {
        let mut brand = match self.get_brand(id)? {
            Some(b) => b,
            None => return Ok(None),
        };

        let conn = self.get_conn()?;
        if let Some(name) = &update.name {
            let name = name.trim();
            ensure_name_available(&conn, name, Some(id))?;
            brand.name = name.to_string();
        }
        if let Some(image) = &update.image {
            brand.image = image.clone();
        }
        if let Some(description) = &update.description {
            brand.description = description.clone();
        }
        if let Some(is_management) = update.is_management {
            brand.is_management = is_management;
        }
        brand.updated_at = Utc::now();

        conn.execute(
            "UPDATE brand SET name = ?2, image = ?3, description = ?4, is_management = ?5, updated_at = ?6
             WHERE id = ?1",
            params![
                brand.id,
                brand.name,
                brand.image,
                brand.description,
                brand.is_management,
                brand.updated_at,
            ],
        )?;
        Ok(Some(brand))
    }

    /// 删除品牌（级联删除商品与导入格式）
    ///
    /// # 返回
    /// - Ok(false): 品牌不存在
    pub fn delete_brand(&self, id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM brand WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }
}

fn ensure_name_available(
    conn: &Connection,
    name: &str,
    exclude_id: Option<&str>,
) -> RepositoryResult<()> {
    let mut stmt = conn.prepare("SELECT id, name FROM brand")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let wanted = name.to_lowercase();
    for row in rows {
        let (id, existing) = row?;
        if Some(id.as_str()) == exclude_id {
            continue;
        }
        if existing.to_lowercase() == wanted {
            return Err(RepositoryError::UniqueConstraintViolation(
                i18n::t_with_args("catalog.brand_exists", &[("name", name)]),
            ));
        }
    }
    Ok(())
}

fn map_brand_row(row: &Row<'_>) -> rusqlite::Result<Brand> {
    Ok(Brand {
        id: row.get(0)?,
        name: row.get(1)?,
        image: row.get(2)?,
        description: row.get(3)?,
        is_management: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}
