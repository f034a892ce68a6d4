// ==========================================
// 建材商品目录系统 - 字段映射器实现
// ==========================================
// 职责: 导入行 → 商品草稿
// 规则: 内部键按关键字（小写 + 去重音）映射到商品属性，
//       其余字段作为自定义参数；身份字段缺失时补默认值
// ==========================================

use crate::domain::format::FormatField;
use crate::domain::import::{CellValue, ImportRow};
use crate::domain::product::{NewProduct, NewProductParameter, ProductDraft};
use crate::importer::data_cleaner::{fold_accents, parse_number};
use crate::importer::product_importer_trait::FieldMapper;
use chrono::Utc;
use rand::Rng;

pub const DEFAULT_UNIT: &str = "Pieza";
pub const DEFAULT_DEPARTMENT: &str = "General";

/// 商品标准属性
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductAttribute {
    Name,
    Description,
    Price,
    Unit,
    Department,
    Barcode,
    Key,
    Image,
}

impl ProductAttribute {
    /// 按内部键识别标准属性（大小写/重音不敏感）
    pub fn from_internal_name(internal_name: &str) -> Option<Self> {
        let normalized = fold_accents(&internal_name.trim().to_lowercase());
        match normalized.as_str() {
            "nombre" | "name" => Some(Self::Name),
            "descripcion" | "description" => Some(Self::Description),
            "precio" | "price" => Some(Self::Price),
            "unidad" | "unit" => Some(Self::Unit),
            "departamento" | "department" => Some(Self::Department),
            "codigo_barras" | "barcode" => Some(Self::Barcode),
            "clave" | "key" => Some(Self::Key),
            "imagen" | "image" => Some(Self::Image),
            _ => None,
        }
    }
}

// ==========================================
// ProductFieldMapper
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct ProductFieldMapper;

impl ProductFieldMapper {
    fn cell_text(value: &CellValue) -> String {
        value.to_string().trim().to_string()
    }

    fn cell_price(value: &CellValue) -> f64 {
        match value {
            CellValue::Number(n) if n.is_finite() => *n,
            CellValue::Text(s) => parse_number(s).unwrap_or(0.0),
            _ => 0.0,
        }
    }

    /// 补齐身份字段默认值
    fn apply_defaults(product: &mut NewProduct) {
        let millis = Utc::now().timestamp_millis();
        let mut rng = rand::thread_rng();

        if product.name.is_empty() {
            product.name = format!("Producto {}", millis);
        }
        if product.unit.is_empty() {
            product.unit = DEFAULT_UNIT.to_string();
        }
        if product.department.is_empty() {
            product.department = DEFAULT_DEPARTMENT.to_string();
        }
        if product.barcode.is_empty() {
            product.barcode = format!("{}{}", millis, rng.gen_range(0..1000));
        }
        if product.key.is_empty() {
            let letter = char::from(b'A' + rng.gen_range(0..26u8));
            let millis_text = millis.to_string();
            let suffix = &millis_text[millis_text.len().saturating_sub(6)..];
            product.key = format!("{}-{}", letter, suffix);
        }
    }
}

impl FieldMapper for ProductFieldMapper {
    fn map_row(&self, brand_id: &str, fields: &[FormatField], row: &ImportRow) -> ProductDraft {
        let mut product = NewProduct {
            brand_id: brand_id.to_string(),
            ..Default::default()
        };
        let mut parameters = Vec::new();

        for field in fields {
            let value = match row.get(&field.internal_name) {
                Some(v) if !v.is_null() && !v.to_string().is_empty() => v,
                _ => continue,
            };

            match ProductAttribute::from_internal_name(&field.internal_name) {
                Some(ProductAttribute::Name) => product.name = Self::cell_text(value),
                Some(ProductAttribute::Description) => {
                    product.description = Self::cell_text(value)
                }
                Some(ProductAttribute::Price) => product.price = Self::cell_price(value),
                Some(ProductAttribute::Unit) => product.unit = Self::cell_text(value),
                Some(ProductAttribute::Department) => product.department = Self::cell_text(value),
                Some(ProductAttribute::Barcode) => product.barcode = Self::cell_text(value),
                Some(ProductAttribute::Key) => product.key = Self::cell_text(value),
                Some(ProductAttribute::Image) => product.image = Self::cell_text(value),
                None => parameters.push(NewProductParameter {
                    name: field.excel_label.clone(),
                    value: Self::cell_text(value),
                    param_type: field.field_type.as_str().to_string(),
                }),
            }
        }

        Self::apply_defaults(&mut product);
        ProductDraft {
            product,
            parameters,
        }
    }
}
