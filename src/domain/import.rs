// ==========================================
// 建材商品目录系统 - 导入流程领域模型
// ==========================================
// 用途: 上传文件 / 单元格值 / 校验结果 / 批次结果 / 会话状态
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 允许的上传 MIME 类型
pub const ALLOWED_MIME_TYPES: [&str; 4] = [
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-excel",
    "text/csv",
    "application/csv",
];

// ==========================================
// SpreadsheetFile - 已读入内存的上传文件
// ==========================================
#[derive(Debug, Clone)]
pub struct SpreadsheetFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl SpreadsheetFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// 小写扩展名（无扩展名返回空串）
    pub fn extension(&self) -> String {
        std::path::Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase()
    }
}

// ==========================================
// CellValue - 解析后的单元格值
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Null,
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Null => Ok(()),
        }
    }
}

/// 一行导入数据: internal_name → 值
pub type ImportRow = BTreeMap<String, CellValue>;

// ==========================================
// ValidationResult - 文件校验结果
// ==========================================
// 红线: is_valid == errors.is_empty()
// 红线: 表头缺失时 data/summary 均为 None
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub data: Option<Vec<ImportRow>>,
    pub summary: Option<ValidationSummary>,
}

impl ValidationResult {
    /// 致命错误（不进行行级校验）
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            errors: vec![message.into()],
            warnings: Vec::new(),
            data: None,
            summary: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub invalid_rows: usize,
}

// ==========================================
// BatchResult - 分批提交累计结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchResult {
    pub success_count: usize,
    pub errors: Vec<String>,             // 每个失败批次一条
    pub skipped_duplicates: Vec<String>, // 存储层跳过的重复行
    pub batches_attempted: usize,
    pub cancelled: bool,
}

/// 结果面板最多直接展示的错误条数
pub const VISIBLE_BATCH_ERRORS: usize = 10;

impl BatchResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// 前 10 条错误 + 剩余数量汇总
    pub fn visible_errors(&self) -> Vec<String> {
        let mut visible: Vec<String> = self
            .errors
            .iter()
            .take(VISIBLE_BATCH_ERRORS)
            .cloned()
            .collect();
        if self.errors.len() > VISIBLE_BATCH_ERRORS {
            let remaining = (self.errors.len() - VISIBLE_BATCH_ERRORS).to_string();
            visible.push(crate::i18n::t_with_args(
                "import.more_errors",
                &[("count", remaining.as_str())],
            ));
        }
        visible
    }
}

/// 批次进度（每批完成后回调）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportProgress {
    pub batch: usize,
    pub total_batches: usize,
    pub processed_rows: usize,
    pub total_rows: usize,
}

impl ImportProgress {
    pub fn percent(&self) -> u8 {
        if self.total_rows == 0 {
            return 100;
        }
        ((self.processed_rows * 100) / self.total_rows).min(100) as u8
    }
}

// ==========================================
// ImportPhase - 导入会话状态机
// ==========================================
// idle → validating → {valid, invalid} → importing → {completed, failed}
// 任一终态在重新选择文件/格式后回到 idle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportPhase {
    Idle,
    Validating,
    Valid,
    Invalid,
    Importing,
    Completed,
    Failed,
}

impl ImportPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ImportPhase::Invalid | ImportPhase::Completed | ImportPhase::Failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_errors_caps_at_ten() {
        let result = BatchResult {
            errors: (1..=13).map(|n| format!("Batch {}: boom", n)).collect(),
            ..Default::default()
        };
        let visible = result.visible_errors();
        assert_eq!(visible.len(), 11);
        assert_eq!(visible[0], "Batch 1: boom");
        assert!(visible[10].contains('3'));
    }

    #[test]
    fn test_visible_errors_no_summary_when_few() {
        let result = BatchResult {
            errors: vec!["Batch 2: x".to_string()],
            ..Default::default()
        };
        assert_eq!(result.visible_errors(), vec!["Batch 2: x".to_string()]);
    }

    #[test]
    fn test_progress_percent() {
        let p = ImportProgress {
            batch: 1,
            total_batches: 4,
            processed_rows: 25,
            total_rows: 100,
        };
        assert_eq!(p.percent(), 25);
    }

    #[test]
    fn test_spreadsheet_extension_lowercase() {
        let file = SpreadsheetFile::new("Datos.XLSX", "", vec![]);
        assert_eq!(file.extension(), "xlsx");
    }
}
