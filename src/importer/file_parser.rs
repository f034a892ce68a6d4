// ==========================================
// 建材商品目录系统 - 文件解析器实现
// ==========================================
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// 输出: 原始网格（首行为表头），完全空白的行已剔除
// ==========================================

use crate::domain::import::SpreadsheetFile;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::product_importer_trait::FileParser;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use csv::ReaderBuilder;
use std::io::Cursor;
use tracing::debug;

/// 原始网格: 行 × 单元格（空单元格为 None）
pub type RawGrid = Vec<Vec<Option<String>>>;

/// 优先读取的数据表名（名称包含即可，大小写不敏感）
pub const PREFERRED_SHEET_NAMES: [&str; 4] = ["Datos", "Plantilla", "Data", "Template"];

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

fn is_blank_row(row: &[Option<String>]) -> bool {
    row.iter().all(|cell| cell.as_deref().map_or(true, str::is_empty))
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_grid(&self, bytes: &[u8]) -> ImportResult<RawGrid> {
        let content = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .from_reader(content);

        let mut grid = Vec::new();
        for result in reader.records() {
            let record = result?;
            let row: Vec<Option<String>> = record
                .iter()
                .map(|value| {
                    if value.is_empty() {
                        None
                    } else {
                        Some(value.to_string())
                    }
                })
                .collect();

            if is_blank_row(&row) {
                continue;
            }
            grid.push(row);
        }

        Ok(grid)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl ExcelParser {
    /// 选择数据表: 名称含 Datos/Plantilla/Data/Template 的第一张，否则第一张
    pub fn pick_sheet(sheet_names: &[String]) -> Option<String> {
        sheet_names
            .iter()
            .find(|name| {
                let lower = name.to_lowercase();
                PREFERRED_SHEET_NAMES
                    .iter()
                    .any(|wanted| lower.contains(&wanted.to_lowercase()))
            })
            .or_else(|| sheet_names.first())
            .cloned()
    }
}

impl FileParser for ExcelParser {
    fn parse_grid(&self, bytes: &[u8]) -> ImportResult<RawGrid> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

        let sheet_names = workbook.sheet_names();
        let sheet_name = Self::pick_sheet(&sheet_names).ok_or(ImportError::NoWorksheets)?;
        debug!(sheet = %sheet_name, "读取工作表");

        let range = workbook.worksheet_range(&sheet_name)?;

        let mut grid = Vec::new();
        for data_row in range.rows() {
            let row: Vec<Option<String>> = data_row
                .iter()
                .map(|cell| match cell {
                    Data::Empty => None,
                    Data::String(s) if s.is_empty() => None,
                    other => Some(other.to_string()),
                })
                .collect();

            if is_blank_row(&row) {
                continue;
            }
            grid.push(row);
        }

        Ok(grid)
    }
}

// ==========================================
// 通用文件解析器（扩展名优先，其次 MIME）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    fn parser_for(file: &SpreadsheetFile) -> ImportResult<Box<dyn FileParser>> {
        match file.extension().as_str() {
            "csv" => return Ok(Box::new(CsvParser)),
            "xlsx" | "xls" => return Ok(Box::new(ExcelParser)),
            _ => {}
        }

        match file.mime_type.as_str() {
            "text/csv" | "application/csv" => Ok(Box::new(CsvParser)),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            | "application/vnd.ms-excel" => Ok(Box::new(ExcelParser)),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn parse(&self, file: &SpreadsheetFile) -> ImportResult<RawGrid> {
        Self::parser_for(file)?.parse_grid(&file.bytes)
    }
}
