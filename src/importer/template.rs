// ==========================================
// 建材商品目录系统 - 导入模板生成
// ==========================================
// 工具: rust_xlsxwriter
// 输出: "Plantilla"（表头 + 3 行示例）+ "Instrucciones"（填写说明）
// 约束: 列按 excel_label 字母序排列，与校验器的字段顺序一致
// ==========================================

use crate::domain::format::{ExcelFormat, FormatField};
use crate::domain::types::FieldType;
use crate::i18n;
use crate::importer::data_cleaner::{label_sort_key, sanitize_file_name};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::{ProductAttribute, DEFAULT_UNIT};
use rust_xlsxwriter::{Workbook, Worksheet};
use serde::Serialize;
use tracing::info;

pub const TEMPLATE_SHEET: &str = "Plantilla";
pub const INSTRUCTIONS_SHEET: &str = "Instrucciones";
pub const EXAMPLE_ROWS: usize = 3;

const TEMPLATE_COLUMN_WIDTH: f64 = 20.0;
const INSTRUCTION_COLUMN_WIDTHS: [f64; 4] = [30.0, 15.0, 15.0, 50.0];

/// 生成好的模板文件
#[derive(Debug, Clone, Serialize)]
pub struct TemplateFile {
    pub file_name: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

/// 示例单元格
#[derive(Debug, Clone, PartialEq)]
enum ExampleValue {
    Text(String),
    Number(f64),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateGenerator;

impl TemplateGenerator {
    /// 生成导入模板
    ///
    /// # 错误
    /// - EmptyTemplate: 格式没有任何字段
    pub fn generate(&self, format: &ExcelFormat, brand_name: &str) -> ImportResult<TemplateFile> {
        if format.fields.is_empty() {
            return Err(ImportError::EmptyTemplate);
        }

        let mut fields: Vec<&FormatField> = format.fields.iter().collect();
        fields.sort_by_cached_key(|f| label_sort_key(&f.excel_label));

        let mut workbook = Workbook::new();

        let sheet = workbook.add_worksheet();
        sheet.set_name(TEMPLATE_SHEET)?;
        for (col, field) in fields.iter().enumerate() {
            let col = col as u16;
            sheet.write_string(0, col, &field.excel_label)?;
            sheet.set_column_width(col, TEMPLATE_COLUMN_WIDTH)?;
            for index in 1..=EXAMPLE_ROWS {
                let row = index as u32;
                match example_value(field, index) {
                    ExampleValue::Text(text) => sheet.write_string(row, col, text)?,
                    ExampleValue::Number(n) => sheet.write_number(row, col, n)?,
                };
            }
        }

        let sheet = workbook.add_worksheet();
        sheet.set_name(INSTRUCTIONS_SHEET)?;
        for (col, width) in INSTRUCTION_COLUMN_WIDTHS.iter().enumerate() {
            sheet.set_column_width(col as u16, *width)?;
        }
        write_rows(sheet, &instruction_rows(&format.name, brand_name, &fields))?;

        let bytes = workbook.save_to_buffer()?;
        let file_name = format!(
            "Plantilla_{}_{}.xlsx",
            sanitize_file_name(&format.name),
            sanitize_file_name(brand_name)
        );

        info!(format_id = %format.id, file = %file_name, size = bytes.len(), "导入模板已生成");
        Ok(TemplateFile { file_name, bytes })
    }
}

fn write_rows(sheet: &mut Worksheet, rows: &[Vec<String>]) -> ImportResult<()> {
    for (r, row) in rows.iter().enumerate() {
        for (c, text) in row.iter().enumerate() {
            if !text.is_empty() {
                sheet.write_string(r as u32, c as u16, text)?;
            }
        }
    }
    Ok(())
}

/// 示例值: 标准属性用固定示例，其余按字段类型生成
fn example_value(field: &FormatField, index: usize) -> ExampleValue {
    let n = index.to_string();
    let args = [("n", n.as_str())];

    match ProductAttribute::from_internal_name(&field.internal_name) {
        Some(ProductAttribute::Name) => {
            ExampleValue::Text(i18n::t_with_args("template.example_name", &args))
        }
        Some(ProductAttribute::Description) => {
            ExampleValue::Text(i18n::t_with_args("template.example_description", &args))
        }
        Some(ProductAttribute::Price) => ExampleValue::Number(299.99 + index as f64 * 50.0),
        Some(ProductAttribute::Department) => {
            ExampleValue::Text(i18n::t("template.example_department"))
        }
        Some(ProductAttribute::Unit) => ExampleValue::Text(DEFAULT_UNIT.to_string()),
        Some(ProductAttribute::Barcode) => ExampleValue::Text(format!("123456789012{}", index)),
        Some(ProductAttribute::Key) => ExampleValue::Text(format!("A-{}", n.repeat(3))),
        Some(ProductAttribute::Image) | None => match field.field_type {
            FieldType::Number => ExampleValue::Number((index * 10) as f64),
            FieldType::Selection if !field.options.is_empty() => {
                ExampleValue::Text(field.options[index % field.options.len()].clone())
            }
            _ => ExampleValue::Text(i18n::t_with_args("template.example_text", &args)),
        },
    }
}

fn type_label(field_type: FieldType) -> String {
    match field_type {
        FieldType::Text => i18n::t("template.type_text"),
        FieldType::Number => i18n::t("template.type_number"),
        FieldType::Selection => i18n::t("template.type_selection"),
    }
}

fn field_description(field: &FormatField) -> String {
    match field.field_type {
        FieldType::Selection if !field.options.is_empty() => {
            let options = field.options.join(", ");
            i18n::t_with_args("template.valid_options", &[("options", options.as_str())])
        }
        FieldType::Number => format!(
            "{}{}",
            i18n::t_with_args("template.maps_to", &[("field", field.internal_name.as_str())]),
            i18n::t("template.numbers_only")
        ),
        _ => i18n::t_with_args("template.maps_to", &[("field", field.internal_name.as_str())]),
    }
}

fn instruction_rows(format_name: &str, brand_name: &str, fields: &[&FormatField]) -> Vec<Vec<String>> {
    let line = |key: &str| vec![i18n::t(key)];
    let mut rows = vec![
        vec![i18n::t_with_args("template.title", &[("format", format_name)])],
        vec![i18n::t_with_args("template.brand", &[("brand", brand_name)])],
        vec![String::new()],
        line("template.important"),
        line("template.step_1"),
        line("template.step_2"),
        line("template.step_3"),
        line("template.step_4"),
        line("template.step_5"),
        vec![String::new()],
        line("template.configured_fields"),
        vec![
            i18n::t("template.col_label"),
            i18n::t("template.col_type"),
            i18n::t("template.col_required"),
            i18n::t("template.col_description"),
        ],
    ];

    for field in fields {
        rows.push(vec![
            field.excel_label.clone(),
            type_label(field.field_type),
            if field.required {
                i18n::t("template.required_yes")
            } else {
                i18n::t("template.required_no")
            },
            field_description(field),
        ]);
    }

    rows.push(vec![String::new()]);
    rows.push(line("template.tips"));
    rows.push(line("template.tip_1"));
    rows.push(line("template.tip_2"));
    rows.push(line("template.tip_3"));
    rows.push(line("template.tip_4"));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::file_parser::ExcelParser;
    use crate::importer::product_importer_trait::FileParser;
    use calamine::{open_workbook_auto_from_rs, Reader};
    use chrono::Utc;
    use std::io::Cursor;

    fn field(label: &str, key: &str, field_type: FieldType, options: &[&str]) -> FormatField {
        FormatField {
            id: format!("f-{}", key),
            format_id: "fmt-1".to_string(),
            internal_name: key.to_string(),
            excel_label: label.to_string(),
            field_type,
            required: true,
            options: options.iter().map(|s| s.to_string()).collect(),
            order_index: 0,
            created_at: Utc::now(),
        }
    }

    fn format_with(fields: Vec<FormatField>) -> ExcelFormat {
        ExcelFormat {
            id: "fmt-1".to_string(),
            brand_id: "2".to_string(),
            name: "Lista Precios".to_string(),
            description: String::new(),
            color: "blue".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            fields,
        }
    }

    #[test]
    fn test_template_layout() {
        let format = format_with(vec![
            field("PRECIO", "precio", FieldType::Number, &[]),
            field("COLOR", "color", FieldType::Selection, &["Rojo", "Azul"]),
            field("CLAVE", "clave", FieldType::Text, &[]),
        ]);

        let template = TemplateGenerator.generate(&format, "Interceramic").unwrap();
        assert_eq!(template.file_name, "Plantilla_Lista_Precios_Interceramic.xlsx");

        let workbook = open_workbook_auto_from_rs(Cursor::new(template.bytes.clone())).unwrap();
        assert_eq!(
            workbook.sheet_names(),
            vec![TEMPLATE_SHEET.to_string(), INSTRUCTIONS_SHEET.to_string()]
        );

        let grid = ExcelParser.parse_grid(&template.bytes).unwrap();
        assert_eq!(grid.len(), 1 + EXAMPLE_ROWS);
        let header: Vec<_> = grid[0].iter().map(|c| c.clone().unwrap_or_default()).collect();
        assert_eq!(header, vec!["CLAVE", "COLOR", "PRECIO"]);
        assert_eq!(grid[1][0].as_deref(), Some("A-111"));
        assert_eq!(grid[1][1].as_deref(), Some("Azul"));
        assert_eq!(grid[2][1].as_deref(), Some("Rojo"));
        let price: f64 = grid[1][2].as_deref().unwrap().parse().unwrap();
        assert!((price - 349.99).abs() < 1e-9);
    }

    #[test]
    fn test_template_columns_ignore_case_and_accents() {
        let format = format_with(vec![
            field("Zona", "zona", FieldType::Text, &[]),
            field("apellido", "apellido", FieldType::Text, &[]),
            field("Área", "area", FieldType::Number, &[]),
        ]);

        let template = TemplateGenerator.generate(&format, "Interceramic").unwrap();
        let grid = ExcelParser.parse_grid(&template.bytes).unwrap();
        let header: Vec<_> = grid[0].iter().map(|c| c.clone().unwrap_or_default()).collect();
        assert_eq!(header, vec!["apellido", "Área", "Zona"]);
    }

    #[test]
    fn test_template_file_name_is_sanitized() {
        let mut format = format_with(vec![field("NOMBRE", "nombre", FieldType::Text, &[])]);
        format.name = "Básico / 2024".to_string();
        let template = TemplateGenerator.generate(&format, "Marca  X").unwrap();
        assert_eq!(template.file_name, "Plantilla_B_sico_2024_Marca_X.xlsx");
    }

    #[test]
    fn test_template_without_fields_is_rejected() {
        let err = TemplateGenerator.generate(&format_with(Vec::new()), "X").unwrap_err();
        assert!(matches!(err, ImportError::EmptyTemplate));
        assert_eq!(err.user_message(), "This format has no configured fields");
    }

    #[test]
    fn test_field_descriptions() {
        let number = field("ANCHO", "ancho", FieldType::Number, &[]);
        assert_eq!(field_description(&number), "Maps to field: ancho (numbers only)");

        let selection = field("COLOR", "color", FieldType::Selection, &["Rojo", "Azul"]);
        assert_eq!(field_description(&selection), "Valid options: Rojo, Azul");
    }
}
