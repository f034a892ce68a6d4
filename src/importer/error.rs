// ==========================================
// 建材商品目录系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 校验结论（行级错误/警告）不是 Rust 错误，见 ValidationResult
// ==========================================

use crate::i18n;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("工作簿不包含工作表")]
    NoWorksheets,

    // ===== 模板相关错误 =====
    #[error("导入格式未配置字段")]
    EmptyTemplate,

    #[error("模板生成失败: {0}")]
    TemplateError(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 面向用户的本地化说明（作为校验结果中的唯一致命错误）
    pub fn user_message(&self) -> String {
        let reason = match self {
            ImportError::NoWorksheets => return i18n::t("validation.no_sheets"),
            ImportError::FileReadError(_) => return i18n::t("validation.read_failed"),
            ImportError::UnsupportedFormat(_) => return i18n::t("validation.invalid_file_type"),
            ImportError::EmptyTemplate => return i18n::t("template.no_fields"),
            ImportError::ExcelParseError(msg)
            | ImportError::CsvParseError(msg)
            | ImportError::TemplateError(msg)
            | ImportError::InternalError(msg) => msg.clone(),
            ImportError::Other(e) => e.to_string(),
        };
        i18n::t_with_args("validation.processing_failed", &[("reason", reason.as_str())])
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for ImportError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        ImportError::TemplateError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_wraps_parse_reason() {
        let err = ImportError::CsvParseError("bad quote".to_string());
        assert_eq!(err.user_message(), "Error processing file: bad quote");
    }

    #[test]
    fn test_user_message_no_sheets() {
        assert_eq!(
            ImportError::NoWorksheets.user_message(),
            "The workbook contains no worksheets"
        );
    }
}
