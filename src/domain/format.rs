// ==========================================
// 建材商品目录系统 - 导入格式领域模型
// ==========================================
// 用途: 品牌级的 Excel 列定义（格式 = 有序字段集合）
// 红线: 同一格式内 excel_label 规范化后唯一
// 红线: selection 类型字段 options 非空
// 生命周期: 创建后只读，导入过程中不变
// ==========================================

use crate::domain::types::FieldType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ExcelFormat - 导入格式
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcelFormat {
    pub id: String,
    pub brand_id: String,
    pub name: String,
    pub description: String,
    pub color: String, // 颜色标签（列表展示用）
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub fields: Vec<FormatField>, // 按 order_index 升序
}

// ==========================================
// FormatField - 格式字段（一列）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatField {
    pub id: String,
    pub format_id: String,
    pub internal_name: String, // 内部键（映射商品属性或自定义参数）
    pub excel_label: String,   // 期望的表头文字
    pub field_type: FieldType,
    pub required: bool,
    pub options: Vec<String>, // 仅 selection 非空
    pub order_index: usize,   // 创建时的位置
    pub created_at: DateTime<Utc>,
}

/// 新建格式入参（不含字段）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewFormat {
    pub brand_id: String,
    pub name: String,
    pub description: String,
    pub color: String,
}

/// 新建字段入参
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFormatField {
    pub internal_name: String,
    pub excel_label: String,
    pub field_type: FieldType,
    pub required: bool,
    #[serde(default)]
    pub options: Vec<String>,
}

impl NewFormatField {
    pub fn text(internal_name: &str, excel_label: &str, required: bool) -> Self {
        Self {
            internal_name: internal_name.to_string(),
            excel_label: excel_label.to_string(),
            field_type: FieldType::Text,
            required,
            options: Vec::new(),
        }
    }

    pub fn number(internal_name: &str, excel_label: &str, required: bool) -> Self {
        Self {
            field_type: FieldType::Number,
            ..Self::text(internal_name, excel_label, required)
        }
    }

    pub fn selection(
        internal_name: &str,
        excel_label: &str,
        required: bool,
        options: &[&str],
    ) -> Self {
        Self {
            field_type: FieldType::Selection,
            options: options.iter().map(|o| o.to_string()).collect(),
            ..Self::text(internal_name, excel_label, required)
        }
    }
}
