// ==========================================
// 建材商品目录系统 - 商品领域模型
// ==========================================
// 红线: barcode / key 全局唯一（由存储层约束）
// 用途: 手工录入 + Excel 导入共用
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Product - 商品
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub brand_id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub unit: String,
    pub image: String,
    pub department: String,
    pub barcode: String,
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub parameters: Vec<ProductParameter>,
}

// ==========================================
// ProductParameter - 自定义参数
// ==========================================
// 来源: 导入格式中无法映射到固定商品属性的字段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductParameter {
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub value: String,
    pub param_type: String,
    pub created_at: DateTime<Utc>,
}

/// 新建参数入参
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProductParameter {
    pub name: String,
    pub value: String,
    pub param_type: String,
}

// ==========================================
// NewProduct - 新建商品入参
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub brand_id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub unit: String,
    pub image: String,
    pub department: String,
    pub barcode: String,
    pub key: String,
}

// ==========================================
// ProductDraft - 导入草稿
// ==========================================
// 生命周期: 校验 → 映射 → 提交，提交后丢弃
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub product: NewProduct,
    pub parameters: Vec<NewProductParameter>,
}

/// 商品部分更新（None 表示不修改）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub unit: Option<String>,
    pub image: Option<String>,
    pub department: Option<String>,
    pub barcode: Option<String>,
    pub key: Option<String>,
    /// 非空时整体替换参数列表
    pub parameters: Option<Vec<NewProductParameter>>,
}

/// 分页查询结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: usize,
}
