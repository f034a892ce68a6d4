// ==========================================
// 建材商品目录系统 - 导入格式数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑（格式合法性由 FormatRegistry 校验）
// 排序: 格式按创建时间倒序；字段按 order_index 升序
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::format::{ExcelFormat, FormatField, NewFormat, NewFormatField};
use crate::domain::types::FieldType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const FORMAT_COLUMNS: &str = "id, brand_id, name, description, color, created_at, updated_at";

// ==========================================
// FormatRepository - 导入格式仓储
// ==========================================
pub struct FormatRepository {
    conn: Arc<Mutex<Connection>>,
}

impl FormatRepository {
    /// 创建新的 FormatRepository 实例
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

    /// 写入格式及字段（order_index 取字段在列表中的位置）
    pub fn insert_format(
        &self,
        new_format: &NewFormat,
        fields: &[NewFormatField],
    ) -> RepositoryResult<ExcelFormat> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let now = Utc::now();
        let format_id = Uuid::new_v4().to_string();
        tx.execute(
            "INSERT INTO excel_format (id, brand_id, name, description, color, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                format_id,
                new_format.brand_id,
                new_format.name,
                new_format.description,
                new_format.color,
                now,
            ],
        )?;

        let mut stored_fields = Vec::with_capacity(fields.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO excel_format_field (id, format_id, internal_name, excel_label, field_type,
                     required, options_json, order_index, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for (index, field) in fields.iter().enumerate() {
                let options = if field.field_type == FieldType::Selection {
                    field.options.clone()
                } else {
                    Vec::new()
                };
                let record = FormatField {
                    id: Uuid::new_v4().to_string(),
                    format_id: format_id.clone(),
                    internal_name: field.internal_name.clone(),
                    excel_label: field.excel_label.clone(),
                    field_type: field.field_type,
                    required: field.required,
                    options,
                    order_index: index,
                    created_at: now,
                };
                stmt.execute(params![
                    record.id,
                    record.format_id,
                    record.internal_name,
                    record.excel_label,
                    record.field_type.as_str(),
                    record.required,
                    serde_json::to_string(&record.options)?,
                    record.order_index as i64,
                    record.created_at,
                ])?;
                stored_fields.push(record);
            }
        }
        tx.commit()?;

        Ok(ExcelFormat {
            id: format_id,
            brand_id: new_format.brand_id.clone(),
            name: new_format.name.clone(),
            description: new_format.description.clone(),
            color: new_format.color.clone(),
            created_at: now,
            updated_at: now,
            fields: stored_fields,
        })
    }

    /// 品牌下所有格式（最新在前）
    pub fn list_formats_by_brand(&self, brand_id: &str) -> RepositoryResult<Vec<ExcelFormat>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM excel_format WHERE brand_id = ?1 ORDER BY created_at DESC, rowid DESC",
            FORMAT_COLUMNS
        ))?;
        let mut formats = stmt
            .query_map(params![brand_id], map_format_row)?
            .collect::<Result<Vec<_>, _>>()?;
        for format in formats.iter_mut() {
            format.fields = load_fields(&conn, &format.id)?;
        }
        Ok(formats)
    }

    /// 全部格式（导出用）
    pub fn list_formats(&self) -> RepositoryResult<Vec<ExcelFormat>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM excel_format ORDER BY created_at DESC, rowid DESC",
            FORMAT_COLUMNS
        ))?;
        let mut formats = stmt
            .query_map([], map_format_row)?
            .collect::<Result<Vec<_>, _>>()?;
        for format in formats.iter_mut() {
            format.fields = load_fields(&conn, &format.id)?;
        }
        Ok(formats)
    }

    /// 按 ID 查询（含字段）
    pub fn get_format(&self, id: &str) -> RepositoryResult<Option<ExcelFormat>> {
        let conn = self.get_conn()?;
        let format = conn
            .query_row(
                &format!("SELECT {} FROM excel_format WHERE id = ?1", FORMAT_COLUMNS),
                params![id],
                map_format_row,
            )
            .optional()?;

        match format {
            Some(mut f) => {
                f.fields = load_fields(&conn, &f.id)?;
                Ok(Some(f))
            }
            None => Ok(None),
        }
    }

    /// 删除格式（字段级联删除）
    pub fn delete_format(&self, id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM excel_format WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }
}

fn load_fields(conn: &Connection, format_id: &str) -> RepositoryResult<Vec<FormatField>> {
    let mut stmt = conn.prepare(
        "SELECT id, format_id, internal_name, excel_label, field_type, required, options_json,
                order_index, created_at
         FROM excel_format_field WHERE format_id = ?1 ORDER BY order_index ASC",
    )?;

    let rows = stmt
        .query_map(params![format_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, bool>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, i64>(7)?,
                row.get::<_, DateTime<Utc>>(8)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut fields = Vec::with_capacity(rows.len());
    for (id, format_id, internal_name, excel_label, raw_type, required, options_json, order, created_at) in
        rows
    {
        let field_type = raw_type
            .parse::<FieldType>()
            .map_err(|message| RepositoryError::FieldValueError {
                field: "field_type".to_string(),
                message,
            })?;
        fields.push(FormatField {
            id,
            format_id,
            internal_name,
            excel_label,
            field_type,
            required,
            options: serde_json::from_str(&options_json)?,
            order_index: order.max(0) as usize,
            created_at,
        });
    }
    Ok(fields)
}

fn map_format_row(row: &Row<'_>) -> rusqlite::Result<ExcelFormat> {
    Ok(ExcelFormat {
        id: row.get(0)?,
        brand_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        color: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
        fields: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::brand::NewBrand;
    use crate::repository::brand_repo::BrandRepository;

    fn setup() -> (FormatRepository, BrandRepository, String) {
        let conn = Arc::new(Mutex::new(crate::db::open_in_memory().unwrap()));
        let brands = BrandRepository::from_connection(conn.clone());
        let brand = brands
            .create_brand(&NewBrand {
                name: "Condumex".to_string(),
                ..Default::default()
            })
            .unwrap();
        (FormatRepository::from_connection(conn), brands, brand.id)
    }

    fn new_format(brand_id: &str, name: &str) -> NewFormat {
        NewFormat {
            brand_id: brand_id.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_insert_assigns_order_and_clears_options() {
        let (repo, _, brand_id) = setup();
        let mut precio = NewFormatField::number("precio", "PRECIO", true);
        precio.options = vec!["ignored".to_string()];
        let fields = vec![
            NewFormatField::text("nombre", "NOMBRE", true),
            precio,
            NewFormatField::selection("color", "COLOR", false, &["Rojo", "Azul"]),
        ];

        let format = repo.insert_format(&new_format(&brand_id, "Cables"), &fields).unwrap();
        let loaded = repo.get_format(&format.id).unwrap().unwrap();

        assert_eq!(loaded.fields.len(), 3);
        assert_eq!(loaded.fields[1].order_index, 1);
        assert!(loaded.fields[1].options.is_empty());
        assert_eq!(loaded.fields[2].options, vec!["Rojo", "Azul"]);
        assert_eq!(loaded.fields[2].field_type, FieldType::Selection);
    }

    #[test]
    fn test_list_most_recent_first() {
        let (repo, _, brand_id) = setup();
        let field = [NewFormatField::text("nombre", "NOMBRE", true)];
        repo.insert_format(&new_format(&brand_id, "Primero"), &field).unwrap();
        repo.insert_format(&new_format(&brand_id, "Segundo"), &field).unwrap();

        let names: Vec<String> = repo
            .list_formats_by_brand(&brand_id)
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["Segundo", "Primero"]);
    }

    #[test]
    fn test_brand_delete_cascades_formats() {
        let (repo, brands, brand_id) = setup();
        let field = [NewFormatField::text("nombre", "NOMBRE", true)];
        repo.insert_format(&new_format(&brand_id, "Cables"), &field).unwrap();

        assert!(brands.delete_brand(&brand_id).unwrap());
        assert!(repo.list_formats().unwrap().is_empty());
    }
}
