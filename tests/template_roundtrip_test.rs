// ==========================================
// 导入模板往返测试
// ==========================================
// 测试目标: 下载的模板（含示例行）可直接通过同一格式的校验并导入
// ==========================================


use calamine::{open_workbook_auto_from_rs, Reader};
use product_catalog::config::config_keys;
use product_catalog::domain::import::{ImportPhase, SpreadsheetFile};
use std::io::Cursor;
use test_helpers::{
    number_field, selection_field, signed_in_state, text_field, XLSX_MIME,
};
use tokio_util::sync::CancellationToken;

const CONDUMEX: &str = "3";

#[tokio::test]
async fn test_template_validates_against_its_format() {
    let (_db, state) = signed_in_state(&[(config_keys::BATCH_DELAY_MS, "0")])
        .await
        .unwrap();
    let fields = vec![
        text_field("Nombre", "nombre", true),
        text_field("Descripción", "descripcion", false),
        number_field("Precio", "precio", true),
        text_field("Unidad", "unidad", false),
        text_field("Código de barras", "codigo_barras", true),
        text_field("Clave", "clave", true),
        number_field("Largo (m)", "largo", false),
        selection_field("Calibre", "calibre", &["10 AWG", "12 AWG", "14 AWG"]),
        text_field("Marca comercial", "marca", false),
    ];
    let format = state
        .catalog_api
        .create_format(&test_helpers::new_format(CONDUMEX, "Cable Residencial"), &fields)
        .unwrap();

    let template = state.import_api.download_template(&format.id).unwrap();
    assert_eq!(template.file_name, "Plantilla_Cable_Residencial_Condumex.xlsx");

    let workbook = open_workbook_auto_from_rs(Cursor::new(template.bytes.clone())).unwrap();
    assert_eq!(workbook.sheet_names(), vec!["Plantilla", "Instrucciones"]);

    let import = &state.import_api;
    import.select_format(CONDUMEX, &format.id).unwrap();
    import
        .select_file(SpreadsheetFile::new(
            template.file_name.clone(),
            XLSX_MIME,
            template.bytes,
        ))
        .unwrap();

    let validation = import.validate().await.unwrap();
    assert!(validation.is_valid, "{:?}", validation.errors);
    assert!(validation.warnings.is_empty());
    assert_eq!(validation.data.as_ref().unwrap().len(), 3);

    let result = import
        .confirm_import(false, &CancellationToken::new(), |_| {})
        .await
        .unwrap();
    assert_eq!(result.success_count, 3);
    assert_eq!(import.phase().unwrap(), ImportPhase::Completed);

    let page = state
        .catalog_api
        .list_products(CONDUMEX, 1, 10, "example product")
        .unwrap();
    assert_eq!(page.total, 3);
    let first = page
        .products
        .iter()
        .find(|p| p.key == "A-111")
        .unwrap();
    assert_eq!(first.name, "Example Product 1");
    assert_eq!(first.barcode, "1234567890121");
    assert!((first.price - 349.99).abs() < 1e-6);

    let calibre = first
        .parameters
        .iter()
        .find(|p| p.name == "Calibre")
        .unwrap();
    assert_eq!(calibre.value, "12 AWG");
    let largo = first.parameters.iter().find(|p| p.name == "Largo (m)").unwrap();
    assert_eq!(largo.value, "10");
}
