// ==========================================
// 建材商品目录系统 - 品牌领域模型
// ==========================================
// 用途: 商品归属的品牌（含"管理类"品牌）
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brand {
    pub id: String,
    pub name: String,
    pub image: String,
    pub description: String,
    pub is_management: bool, // 管理类品牌（工具/后台入口）
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 新建品牌入参
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewBrand {
    pub name: String,
    pub image: String,
    pub description: String,
    pub is_management: bool,
}

/// 品牌部分更新（None 表示不修改）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrandUpdate {
    pub name: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub is_management: Option<bool>,
}
