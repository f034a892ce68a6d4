// ==========================================
// 建材商品目录系统 - 数据清洗
// ==========================================
// 职责: 表头归一化 / 空值判断 / 数值清洗 / 文件名清洗
// ==========================================

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static NON_NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9.,\-]").unwrap());
static NUMBER_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)").unwrap());
static UNSAFE_FILE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9.\-]").unwrap());
static UNDERSCORE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"_{2,}").unwrap());

/// 文件名最大长度
pub const MAX_FILE_NAME_LEN: usize = 255;

/// 表头归一化: trim + 小写 + 连续空白合并为一个空格
pub fn normalize_header(header: &str) -> String {
    WHITESPACE_RUN
        .replace_all(header.trim(), " ")
        .to_lowercase()
}

/// 空值: 缺失或仅含空白
pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// 数值解析
///
/// 规则: 去掉数字/逗号/句点/负号以外的字符，第一个逗号视为小数点，
/// 取最长的合法数值前缀；无合法前缀返回 None。
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = NON_NUMERIC.replace_all(raw, "").replacen(',', ".", 1);
    NUMBER_PREFIX
        .find(&cleaned)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// 去重音（仅处理西语常见字符），用于关键字匹配
pub fn fold_accents(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            'Á' | 'À' | 'Ä' | 'Â' => 'A',
            'É' | 'È' | 'Ë' | 'Ê' => 'E',
            'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
            'Ó' | 'Ò' | 'Ö' | 'Ô' => 'O',
            'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
            'Ñ' => 'N',
            other => other,
        })
        .collect()
}

/// 标签排序键: 先按小写去重音比较，相同时按原文区分
pub fn label_sort_key(label: &str) -> (String, String) {
    (fold_accents(&label.trim().to_lowercase()), label.to_string())
}

/// 文件名清洗: [A-Za-z0-9.-] 以外替换为 `_`，合并连续 `_`，截断到 255
pub fn sanitize_file_name(name: &str) -> String {
    let replaced = UNSAFE_FILE_CHARS.replace_all(name, "_");
    let collapsed = UNDERSCORE_RUN.replace_all(&replaced, "_");
    collapsed.chars().take(MAX_FILE_NAME_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  Código   de\tBarras "), "código de barras");
        assert_eq!(normalize_header("PRECIO"), "precio");
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(None));
        assert!(is_blank(Some("   ")));
        assert!(!is_blank(Some(" x ")));
    }

    #[test]
    fn test_parse_number_cleansing() {
        assert_eq!(parse_number("199.99"), Some(199.99));
        assert_eq!(parse_number("$ 250"), Some(250.0));
        assert_eq!(parse_number("12,5"), Some(12.5));
        assert_eq!(parse_number("-3"), Some(-3.0));
        // 第一个逗号变小数点后取合法前缀
        assert_eq!(parse_number("1,234.50"), Some(1.234));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("-"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_fold_accents() {
        assert_eq!(fold_accents("descripción"), "descripcion");
        assert_eq!(fold_accents("CÓDIGO"), "CODIGO");
    }

    #[test]
    fn test_label_sort_key_ignores_case_and_accents() {
        let mut labels = vec!["Zona", "apellido", "Área", "CALIBRE", "área"];
        labels.sort_by_key(|l| label_sort_key(l));
        assert_eq!(labels, vec!["apellido", "Área", "área", "CALIBRE", "Zona"]);
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("Pisos  & Muros"), "Pisos_Muros");
        assert_eq!(sanitize_file_name("Plantilla_v1.2-final"), "Plantilla_v1.2-final");
        assert_eq!(sanitize_file_name(&"a".repeat(300)).len(), 255);
    }
}
