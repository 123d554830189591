use super::*;
use crate::domain::layer::{Customer, Glass, Invoice, ProductLayer};
use crate::domain::reference::Ref;
use crate::domain::treatment::{Treatment, TreatmentApplication};
use crate::domain::types::LayerKind;
use chrono::{NaiveDate, NaiveDateTime};

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 5)
        .unwrap()
        .and_hms_milli_opt(14, 7, 9, 45)
        .unwrap()
}

fn wednesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 5).unwrap()
}

fn glass() -> Ref<Glass> {
    Ref::Resolved(Glass {
        id: "g1".to_string(),
        code: "CLR6".to_string(),
        name: "Clear 6mm".to_string(),
        thickness_mm: Some(6.0),
    })
}

fn invoice(code: Option<&str>) -> Ref<Invoice> {
    Ref::Resolved(Invoice {
        id: "inv-1".to_string(),
        code: code.map(str::to_string),
        customer: Some(Ref::Resolved(Customer {
            id: "c1".to_string(),
            code: Some("C042".to_string()),
            name: Some("Acme Glass".to_string()),
        })),
    })
}

fn treated(code: &str) -> TreatmentApplication {
    TreatmentApplication::new(Treatment::new(&format!("t-{}", code), code, code), 1)
}

fn layer(code: &str, width: f64, height: f64) -> ProductLayer {
    let mut l = ProductLayer::new(&format!("id-{}", code), code, width, height);
    l.production_date = Some(wednesday());
    l
}

// ==========================================
// 尺寸补偿
// ==========================================

#[test]
fn test_dimension_bump_rule() {
    assert_eq!(scaled_dimension(1100.0, LayerKind::Normal), "11000");
    assert_eq!(scaled_dimension(1101.0, LayerKind::Normal), "11020");
    assert_eq!(scaled_dimension(1101.0, LayerKind::Ojrati), "11010");
    assert_eq!(scaled_dimension(1101.0, LayerKind::Waterjet), "11020");
    assert_eq!(scaled_dimension(3210.0, LayerKind::Waterjet), "32100");
}

#[test]
fn test_whitelist_is_exact() {
    assert_eq!(STANDARD_SHEET_SIZES_MM.len(), 18);
    assert!(is_standard_size(2250.0));
    assert!(!is_standard_size(2250.5));
    assert!(!is_standard_size(1000.0));
}

// ==========================================
// 星期颜色
// ==========================================

#[test]
fn test_weekday_color_mapping() {
    // 2025-03-01 周六 ... 2025-03-07 周五
    let ids: Vec<u32> = (1..=7)
        .map(|d| weekday_color_id(NaiveDate::from_ymd_opt(2025, 3, d).unwrap()))
        .collect();
    assert_eq!(ids, vec![7, 2, 2, 3, 4, 5, 6]);
    assert!(!ids.contains(&1));

    assert_eq!(legacy_date_field(wednesday()), "04/01/2009");
    assert_eq!(color_name(weekday_color_id(wednesday())), "TUESDAY");
    assert_eq!(color_name(2), "SUNDAY");
    assert_eq!(color_name(0), "");
    assert_eq!(color_name(99), "");
}

#[test]
fn test_weekday_color_is_stable() {
    for _ in 0..3 {
        assert_eq!(legacy_date_field(wednesday()), "04/01/2009");
        assert_eq!(color_name(weekday_color_id(wednesday())), "TUESDAY");
    }
}

// ==========================================
// 分组键与分类
// ==========================================

#[test]
fn test_grouping_key_fallback_chain() {
    let mut by_code = layer("P1", 1000.0, 1000.0);
    by_code.invoice = Some(invoice(Some("INV-77")));
    assert_eq!(grouping_key(&by_code), "INV-77");

    let mut by_id = layer("P2", 1000.0, 1000.0);
    by_id.invoice = Some(invoice(None));
    assert_eq!(grouping_key(&by_id), "inv-1");

    let mut bare_id = layer("P3", 1000.0, 1000.0);
    bare_id.invoice = Some(Ref::Id("inv-9".to_string()));
    assert_eq!(grouping_key(&bare_id), "inv-9");

    let mut composite = layer("P4", 1000.0, 1000.0);
    composite.product_id = Some("prod-5".to_string());
    assert_eq!(grouping_key(&composite), "grp-prod-5-20250305");
}

#[test]
fn test_composite_key_groups_together() {
    let layers: Vec<ProductLayer> = ["P3", "P1", "P2"]
        .iter()
        .map(|code| {
            let mut l = layer(code, 1000.0, 1000.0);
            l.product_id = Some("prod-5".to_string());
            l
        })
        .collect();

    let doc = TrfEncoder::new().encode(&layers, now()).unwrap();
    assert_eq!(doc.order_count, 1);
    assert_eq!(doc.content.matches("<ORD>").count(), 1);
    assert!(doc.content.contains("grp-prod-5-20250305"));

    // 组内按 production_code 排序，订单号取首个
    let barcodes: Vec<&str> = doc
        .content
        .split("\r\n")
        .filter(|line| line.starts_with("<POS>"))
        .map(|line| line[5 + 5 + 12 + 5 + 6 + 6 + 10..].trim_end())
        .collect();
    assert_eq!(barcodes, vec!["P1", "P2", "P3"]);
    assert!(doc.content.contains("<ORD>P1          "));
}

#[test]
fn test_layer_classification() {
    let mut jet = layer("P1", 1000.0, 1000.0);
    jet.treatments = vec![treated("ojrati"), treated("Waterjet")];
    assert_eq!(classify_layer(&jet), LayerKind::Waterjet);

    let mut oj = layer("P2", 1000.0, 1000.0);
    oj.treatments = vec![treated("OJRATI")];
    assert_eq!(classify_layer(&oj), LayerKind::Ojrati);

    let mut unresolved = layer("P3", 1000.0, 1000.0);
    unresolved.treatments = vec![TreatmentApplication {
        treatment: Ref::Id("WATERJET".to_string()),
        count: 1,
        measurement: None,
    }];
    assert_eq!(classify_layer(&unresolved), LayerKind::Normal);

    assert_eq!(group_kind(&[LayerKind::Normal, LayerKind::Ojrati]), "OJRATI");
    assert_eq!(group_kind(&[LayerKind::Ojrati, LayerKind::Waterjet]), "WATERJET");
    assert_eq!(group_kind(&[LayerKind::Normal]), "");
}

// ==========================================
// 文档结构
// ==========================================

#[test]
fn test_full_document_layout() {
    let mut l = layer("P-0001", 1100.0, 1101.0);
    l.glass = Some(glass());
    l.invoice = Some(invoice(Some("INV-1")));
    l.design_number = Some("D-12".to_string());
    l.production_notes = Some("edge polish".to_string());

    let doc = TrfEncoder::new().encode(&[l], now()).unwrap();

    let expected = [
        format!("<REL>{:<8}", "2.10"),
        format!(
            "<ORD>{:<12}{:<10}{:<30}{:<30}{:<10}{:<10}{:<10}{:<12}",
            "P-0001", "C042", "Acme Glass", "INV-1", "", "04/01/2009", "04/01/2009", "TUESDAY"
        ),
        format!(
            "<POS>{:<5}{:<12}{:<5}{:<6}{:<6}{:<10}{:<20}",
            "1", "CLR6", "1", "11000", "11020", "NORMAL", "P-0001"
        ),
        format!("<TXT>{:<40}{:<60}", "edge polish", ""),
        format!("<SHP>{:<20}", "D-12"),
        format!("<GL1>{:<12}{:<30}{:<6}", "CLR6", "Clear 6mm", "6"),
    ]
    .iter()
    .map(|line| format!("{}\r\n", line))
    .collect::<String>();

    assert_eq!(doc.content, expected);
    assert_eq!(doc.file_name, "LISEC-20250305-140709-045.TRF");
    assert_eq!(doc.layer_count, 1);
}

#[test]
fn test_optional_records_omitted() {
    let doc = TrfEncoder::new()
        .encode(&[layer("P1", 1000.0, 1000.0)], now())
        .unwrap();
    assert!(!doc.content.contains("<SHP>"));
    assert!(!doc.content.contains("<GL1>"));
    assert!(doc.content.contains("<TXT>"));
    // 无玻璃时 ID 占位
    assert!(doc.content.contains("<POS>1    ID          "));
}

#[test]
fn test_group_kind_and_per_layer_bump() {
    let mut jet = layer("P1", 1101.0, 1100.0);
    jet.invoice = Some(invoice(Some("INV-1")));
    jet.treatments = vec![treated("WATERJET")];

    let mut oj = layer("P2", 1101.0, 1100.0);
    oj.invoice = Some(invoice(Some("INV-1")));
    oj.treatments = vec![treated("OJRATI")];

    let doc = TrfEncoder::new().encode(&[oj, jet], now()).unwrap();
    let lines: Vec<&str> = doc.content.split("\r\n").collect();

    assert!(lines[1].starts_with("<ORD>"));
    assert_eq!(&lines[1][5 + 12 + 10 + 30 + 30..5 + 12 + 10 + 30 + 30 + 10], "WATERJET  ");

    let positions: Vec<&str> = lines.iter().copied().filter(|l| l.starts_with("<POS>")).collect();
    assert!(positions[0].contains("11020 11000 WATERJET"));
    assert!(positions[1].contains("11010 11000 OJRATI"));
    assert!(doc.content.contains("WATERJET:1"));
}

#[test]
fn test_missing_relations_degrade_gracefully() {
    let mut bare = ProductLayer::new("x", "P9", 500.0, 400.0);
    bare.invoice = Some(Ref::Resolved(Invoice {
        id: String::new(),
        code: None,
        customer: None,
    }));

    let doc = TrfEncoder::new().encode(&[bare], now()).unwrap();
    assert!(doc.content.contains("CUST001   Unknown"));
    // 无投产日期时按生成日期
    assert!(doc.content.contains("04/01/2009"));
    assert!(doc.content.contains("grp--"));
    assert!(doc.content.ends_with("\r\n"));
}

#[test]
fn test_groups_keep_first_appearance_order() {
    let mut a = layer("A1", 1000.0, 1000.0);
    a.invoice = Some(invoice(Some("INV-B")));
    let mut b = layer("B1", 1000.0, 1000.0);
    b.invoice = Some(invoice(Some("INV-A")));

    let doc = TrfEncoder::new().encode(&[a, b], now()).unwrap();
    let first_b = doc.content.find("INV-B").unwrap();
    let first_a = doc.content.find("INV-A").unwrap();
    assert!(first_b < first_a);
    assert_eq!(doc.order_count, 2);
}

#[test]
fn test_encoding_is_deterministic() {
    let mut l1 = layer("P2", 1234.0, 2000.0);
    l1.glass = Some(glass());
    l1.treatments = vec![treated("TEMPER"), treated("WATERJET")];
    let mut l2 = layer("P1", 3210.0, 1605.0);
    l2.design_number = Some("SHAPE-7".to_string());

    let encoder = TrfEncoder::new();
    let first = encoder.encode(&[l1.clone(), l2.clone()], now()).unwrap();
    let second = encoder.encode(&[l1, l2], now()).unwrap();
    assert_eq!(first.content.as_bytes(), second.content.as_bytes());
    assert_eq!(first.file_name, second.file_name);
}

#[test]
fn test_empty_and_missing_batch_rejected() {
    let encoder = TrfEncoder::new();
    assert_eq!(encoder.encode(&[], now()).unwrap_err(), TrfError::EmptyBatch);
    assert_eq!(
        encoder.encode_selection(None, now()).unwrap_err(),
        TrfError::MissingBatch
    );
    assert_eq!(
        encoder.encode_selection(Some(&[]), now()).unwrap_err(),
        TrfError::EmptyBatch
    );
}
