// ==========================================
// 建材商品目录系统 - 导入格式校验器
// ==========================================
// 职责: 上传文件 × 导入格式 → ValidationResult
// 约束: 纯函数（同一输入多次校验结果一致）
// 流程: 文件级拒绝 → 表头核对 → 逐行校验（错误数封顶）→ 生成 data
// ==========================================

use crate::config::ImportLimits;
use crate::domain::format::FormatField;
use crate::domain::import::{
    CellValue, ImportRow, SpreadsheetFile, ValidationResult, ValidationSummary,
    ALLOWED_MIME_TYPES,
};
use crate::domain::types::FieldType;
use crate::i18n;
use crate::importer::data_cleaner::{is_blank, label_sort_key, normalize_header, parse_number};
use crate::importer::file_parser::{RawGrid, UniversalFileParser};
use tracing::{debug, warn};

// ==========================================
// FormatValidator
// ==========================================
pub struct FormatValidator {
    limits: ImportLimits,
    parser: UniversalFileParser,
}

/// 字段与其所在列
struct BoundField<'a> {
    field: &'a FormatField,
    column: Option<usize>,
}

impl FormatValidator {
    pub fn new(limits: ImportLimits) -> Self {
        Self {
            limits,
            parser: UniversalFileParser,
        }
    }

    pub fn limits(&self) -> &ImportLimits {
        &self.limits
    }

    /// 校验上传文件（类型/大小 → 解析 → 网格校验）
    pub fn validate_file(&self, file: &SpreadsheetFile, fields: &[FormatField]) -> ValidationResult {
        if !ALLOWED_MIME_TYPES.contains(&file.mime_type.as_str()) {
            return ValidationResult::fatal(i18n::t("validation.invalid_file_type"));
        }

        if file.size() > self.limits.max_file_size_bytes() {
            let max = self.limits.max_file_size_mb.to_string();
            return ValidationResult::fatal(i18n::t_with_args(
                "validation.file_too_large",
                &[("max", max.as_str())],
            ));
        }

        let grid = match self.parser.parse(file) {
            Ok(grid) => grid,
            Err(e) => {
                warn!(file = %file.name, error = %e, "文件解析失败");
                return ValidationResult::fatal(e.user_message());
            }
        };

        self.validate_grid(&grid, fields)
    }

    /// 校验原始网格（首行为表头）
    pub fn validate_grid(&self, grid: &RawGrid, fields: &[FormatField]) -> ValidationResult {
        let Some((headers, rest)) = grid.split_first() else {
            return ValidationResult::fatal(i18n::t("validation.empty_sheet"));
        };

        let data_rows: Vec<&Vec<Option<String>>> = rest
            .iter()
            .filter(|row| row.iter().any(|c| c.as_deref().map_or(false, |v| !v.is_empty())))
            .collect();
        if data_rows.is_empty() {
            return ValidationResult::fatal(i18n::t("validation.no_data_rows"));
        }

        let total_rows = data_rows.len();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // ===== 规模提示 =====
        let rows_text = total_rows.to_string();
        if total_rows > self.limits.large_file_rows {
            warnings.push(i18n::t_with_args(
                "validation.large_file",
                &[("rows", rows_text.as_str())],
            ));
        }
        if total_rows > self.limits.very_large_file_rows {
            warnings.push(i18n::t_with_args(
                "validation.very_large_file",
                &[("rows", rows_text.as_str())],
            ));
        }

        // ===== 表头核对 =====
        let mut sorted_fields: Vec<&FormatField> = fields.iter().collect();
        sorted_fields.sort_by_cached_key(|f| label_sort_key(&f.excel_label));

        let normalized_headers: Vec<String> = headers
            .iter()
            .map(|h| normalize_header(h.as_deref().unwrap_or("")))
            .collect();
        let normalized_expected: Vec<String> = sorted_fields
            .iter()
            .map(|f| normalize_header(&f.excel_label))
            .collect();

        let missing: Vec<&str> = sorted_fields
            .iter()
            .zip(&normalized_expected)
            .filter(|(_, expected)| !normalized_headers.contains(expected))
            .map(|(f, _)| f.excel_label.as_str())
            .collect();

        let extra: Vec<&str> = headers
            .iter()
            .zip(&normalized_headers)
            .filter_map(|(raw, normalized)| match raw.as_deref() {
                Some(h) if !h.is_empty() && !normalized_expected.contains(normalized) => Some(h),
                _ => None,
            })
            .collect();

        if !missing.is_empty() {
            let columns = missing.join(", ");
            errors.push(i18n::t_with_args(
                "validation.missing_columns",
                &[("columns", columns.as_str())],
            ));
        }
        if !extra.is_empty() {
            let columns = extra.join(", ");
            warnings.push(i18n::t_with_args(
                "validation.extra_columns",
                &[("columns", columns.as_str())],
            ));
        }
        if !errors.is_empty() {
            debug!(missing = missing.len(), "表头缺失，跳过逐行校验");
            return ValidationResult {
                is_valid: false,
                errors,
                warnings,
                data: None,
                summary: None,
            };
        }

        let bound: Vec<BoundField<'_>> = sorted_fields
            .iter()
            .zip(&normalized_expected)
            .map(|(field, expected)| BoundField {
                field,
                column: normalized_headers.iter().position(|h| h == expected),
            })
            .collect();

        // ===== 逐行校验 =====
        let cap = self.limits.max_reported_errors;
        let mut valid_rows = 0;
        let mut invalid_rows = 0;
        let mut unreported_rows = 0;

        for (index, row) in data_rows.iter().enumerate() {
            if errors.len() >= cap {
                invalid_rows += 1;
                unreported_rows += 1;
                continue;
            }

            let row_number = (index + 2).to_string();
            let mut row_has_errors = false;
            for b in &bound {
                let cell = b.column.and_then(|c| row.get(c)).and_then(|v| v.as_deref());
                if let Some(message) = check_cell(b.field, cell, &row_number) {
                    errors.extend(message);
                    row_has_errors = true;
                }
            }

            if row_has_errors {
                invalid_rows += 1;
            } else {
                valid_rows += 1;
            }
        }

        if errors.len() >= cap && unreported_rows > 0 {
            let rows = unreported_rows.to_string();
            let max = cap.to_string();
            errors.push(i18n::t_with_args(
                "validation.truncated",
                &[("rows", rows.as_str()), ("max", max.as_str())],
            ));
        }

        // ===== 生成 data（最多 max_processed_rows 行）=====
        let data: Vec<ImportRow> = data_rows
            .iter()
            .take(self.limits.max_processed_rows)
            .map(|row| build_row(&bound, row))
            .collect();

        debug!(
            total_rows = total_rows,
            valid_rows = valid_rows,
            invalid_rows = invalid_rows,
            "逐行校验完成"
        );

        ValidationResult {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            data: Some(data),
            summary: Some(ValidationSummary {
                total_rows,
                valid_rows,
                invalid_rows,
            }),
        }
    }
}

/// 单元格校验，返回该单元格产生的错误（可能为必填 + 类型两条）
fn check_cell(field: &FormatField, cell: Option<&str>, row_number: &str) -> Option<Vec<String>> {
    let mut messages = Vec::new();
    let label = field.excel_label.as_str();

    if field.required && is_blank(cell) {
        messages.push(i18n::t_with_args(
            "validation.required",
            &[("row", row_number), ("field", label)],
        ));
    }

    if let Some(value) = cell.filter(|v| !v.trim().is_empty()) {
        match field.field_type {
            FieldType::Number if parse_number(value).is_none() => {
                messages.push(i18n::t_with_args(
                    "validation.invalid_number",
                    &[("row", row_number), ("field", label), ("value", value)],
                ));
            }
            FieldType::Selection if !field.options.is_empty() => {
                let wanted = value.trim().to_lowercase();
                let allowed = field
                    .options
                    .iter()
                    .any(|opt| opt.trim().to_lowercase() == wanted);
                if !allowed {
                    let options = field.options.join(", ");
                    messages.push(i18n::t_with_args(
                        "validation.invalid_option",
                        &[
                            ("row", row_number),
                            ("field", label),
                            ("options", options.as_str()),
                            ("value", value),
                        ],
                    ));
                }
            }
            _ => {}
        }
    }

    if messages.is_empty() {
        None
    } else {
        Some(messages)
    }
}

/// 按字段类型构造一行 data
fn build_row(bound: &[BoundField<'_>], row: &[Option<String>]) -> ImportRow {
    let mut data = ImportRow::new();
    for b in bound {
        let Some(column) = b.column else {
            continue;
        };
        let cell = row.get(column).and_then(|v| v.as_deref());
        let value = match cell {
            Some(v) if !v.trim().is_empty() => match b.field.field_type {
                FieldType::Number => parse_number(v).map_or(CellValue::Null, CellValue::Number),
                FieldType::Text | FieldType::Selection => CellValue::Text(v.trim().to_string()),
            },
            _ => CellValue::Null,
        };
        data.insert(b.field.internal_name.clone(), value);
    }
    data
}
