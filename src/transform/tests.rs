//! Tests for the transform stages

use super::*;
use crate::record::{RawRecord, RawTable, RawValue};
use chrono::{NaiveDate, Timelike};
use pretty_assertions::assert_eq;
use test_case::test_case;

const X: &str = "State Plane X Coordinate";
const Y: &str = "State Plane Y Coordinate";
const CREATED: &str = "Created Date";

fn table(columns: &[&str], rows: &[&[&str]]) -> RawTable {
    let mut table = RawTable::new(columns.iter().map(|c| (*c).to_string()).collect());
    for row in rows {
        table
            .push_row(row.iter().map(|v| RawValue::from(*v)).collect())
            .unwrap();
    }
    table
}

fn spatial_profile() -> TransformProfile {
    let mapping = FieldMapping::new([("location", "location"), (CREATED, "created_date")]).unwrap();
    TransformProfile::mapping_only("test", mapping)
        .with_spatial(SpatialColumns::new(X, Y))
        .with_timestamps([CREATED])
        .with_fiscal(FiscalSource::Column(CREATED.to_string()))
}

fn csr_columns() -> Vec<&'static str> {
    CsrField::ALL
        .iter()
        .map(|f| f.source_column())
        .filter(|c| DerivedField::from_column(c).is_none())
        .collect()
}

fn csr_row<'a>(overrides: &[(&'a str, &'a str)]) -> Vec<&'a str> {
    csr_columns()
        .into_iter()
        .map(|c| {
            overrides
                .iter()
                .find(|(name, _)| *name == c)
                .map_or("", |(_, v)| *v)
        })
        .collect()
}

fn ts(s: &str) -> CanonicalValue {
    CanonicalValue::Timestamp(NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap())
}

// ============================================================================
// Fiscal Tests
// ============================================================================

#[test_case(1, 2023, 4 ; "january")]
#[test_case(2, 2023, 5 ; "february")]
#[test_case(3, 2023, 6 ; "march")]
#[test_case(4, 2023, 7 ; "april")]
#[test_case(5, 2023, 8 ; "may")]
#[test_case(6, 2023, 9 ; "june")]
#[test_case(7, 2023, 10 ; "july")]
#[test_case(8, 2023, 11 ; "august")]
#[test_case(9, 2023, 12 ; "september")]
#[test_case(10, 2024, 1 ; "october")]
#[test_case(11, 2024, 2 ; "november")]
#[test_case(12, 2024, 3 ; "december")]
fn test_fiscal_period(month: u32, expected_year: i32, expected_month: u32) {
    let fiscal = CalendarPeriod::new(2023, month).unwrap().fiscal();
    assert_eq!(fiscal.fiscal_year, expected_year);
    assert_eq!(fiscal.fiscal_month, expected_month);
}

#[test]
fn test_fiscal_year_boundaries() {
    assert_eq!(FiscalPeriod::from_calendar(1999, 9), FiscalPeriod { fiscal_year: 1999, fiscal_month: 12 });
    assert_eq!(FiscalPeriod::from_calendar(1999, 10), FiscalPeriod { fiscal_year: 2000, fiscal_month: 1 });
    assert_eq!(FiscalPeriod::from_calendar(2023, 12), FiscalPeriod { fiscal_year: 2024, fiscal_month: 3 });
    assert_eq!(FiscalPeriod::from_calendar(2024, 1), FiscalPeriod { fiscal_year: 2024, fiscal_month: 4 });
}

#[test]
fn test_calendar_period() {
    assert!(CalendarPeriod::new(2023, 0).is_none());
    assert!(CalendarPeriod::new(2023, 13).is_none());

    let period = CalendarPeriod::from_date(NaiveDate::from_ymd_opt(2022, 11, 30).unwrap());
    assert_eq!(period.year(), 2022);
    assert_eq!(period.month(), 11);
    assert_eq!(period.month_name(), "November");
}

// ============================================================================
// Spatial Tests
// ============================================================================

#[test]
fn test_projection_origin_inverts_to_central_meridian() {
    let params = StatePlaneZone::TexasCentralFeet.parameters();
    let projection = LambertConformalConic::new(&params);

    let (lon, lat) = projection.inverse(params.false_easting, params.false_northing);
    assert!((lon - params.central_meridian).abs() < 1e-9);
    assert!((lat - params.latitude_of_origin).abs() < 1e-9);
}

#[test]
fn test_projection_known_point() {
    let projection = StatePlaneZone::TexasCentralFeet.projection();
    let (lon, lat) = projection.inverse(3_115_000.0, 10_070_000.0);
    assert!((lon - -97.740_681_786_250_99).abs() < 1e-8, "lon = {lon}");
    assert!((lat - 30.265_951_581_407_77).abs() < 1e-8, "lat = {lat}");
}

#[test]
fn test_projection_round_trip() {
    let projection = StatePlaneZone::TexasCentralFeet.projection();
    for (x, y) in [(3_114_000.5, 10_070_000.25), (2_900_000.0, 9_900_000.0), (3_300_000.0, 10_300_000.0)] {
        let (lon, lat) = projection.inverse(x, y);
        let (x2, y2) = projection.forward(lon, lat);
        assert!((x - x2).abs() < 1e-6, "x {x} -> {x2}");
        assert!((y - y2).abs() < 1e-6, "y {y} -> {y2}");
    }
}

#[test]
fn test_reproject_blank_is_null() {
    let reprojector = Reprojector::new(StatePlaneZone::default());
    assert_eq!(reprojector.reproject(&RawValue::from(""), &RawValue::from("10070000")), Ok(None));
    assert_eq!(reprojector.reproject(&RawValue::from("3115000"), &RawValue::Null), Ok(None));
    assert_eq!(reprojector.reproject(&RawValue::from("  "), &RawValue::from(" ")), Ok(None));
}

#[test]
fn test_reproject_blank_wins_over_garbage_partner() {
    let reprojector = Reprojector::new(StatePlaneZone::default());
    assert_eq!(reprojector.reproject(&RawValue::from(""), &RawValue::from("n/a")), Ok(None));
    assert_eq!(reprojector.reproject(&RawValue::from("n/a"), &RawValue::Null), Ok(None));
}

#[test]
fn test_reproject_rejects_non_numeric() {
    let reprojector = Reprojector::new(StatePlaneZone::default());
    let err = reprojector
        .reproject(&RawValue::from("east"), &RawValue::from("10070000"))
        .unwrap_err();
    assert!(err.contains("east"));
}

#[test]
fn test_reproject_accepts_numbers_and_text() {
    let reprojector = Reprojector::new(StatePlaneZone::default());
    let from_text = reprojector
        .reproject(&RawValue::from("3115000"), &RawValue::from("10070000"))
        .unwrap();
    let from_float = reprojector
        .reproject(&RawValue::Float(3_115_000.0), &RawValue::Integer(10_070_000))
        .unwrap();
    assert!(from_text.is_some());
    assert_eq!(from_text, from_float);
}

// ============================================================================
// Timestamp Tests
// ============================================================================

#[test]
fn test_parse_datetime_formats() {
    let expected = NaiveDate::from_ymd_opt(2023, 1, 15)
        .unwrap()
        .and_hms_opt(13, 5, 9)
        .unwrap();

    for input in [
        "2023-01-15 13:05:09",
        "2023-01-15T13:05:09",
        "2023-01-15 13:05:09.250",
        "01/15/2023 01:05:09 PM",
        "01/15/2023 13:05:09",
        "2023-01-15T13:05:09-06:00",
    ] {
        let parsed = parse_datetime(input).map(|ts| ts.with_nanosecond(0).unwrap());
        assert_eq!(parsed, Some(expected), "input {input}");
    }

    assert_eq!(
        parse_datetime("2023-01-15"),
        NaiveDate::from_ymd_opt(2023, 1, 15).unwrap().and_hms_opt(0, 0, 0)
    );
}

#[test]
fn test_normalize_timestamp() {
    assert_eq!(normalize_timestamp(&RawValue::from("")), Ok(None));
    assert_eq!(normalize_timestamp(&RawValue::Null), Ok(None));

    let ts = normalize_timestamp(&RawValue::from("2023-01-15 08:30:00.999"))
        .unwrap()
        .unwrap();
    assert_eq!(ts.format(crate::record::TIMESTAMP_FORMAT).to_string(), "2023-01-15T08:30:00");

    assert!(normalize_timestamp(&RawValue::from("yesterday")).is_err());
    assert!(normalize_timestamp(&RawValue::Integer(20230115)).is_err());
}

// ============================================================================
// Mapping Tests
// ============================================================================

#[test]
fn test_mapping_rejects_duplicate_destination() {
    let err = FieldMapping::new([("a", "x"), ("b", "x")]).unwrap_err();
    assert!(matches!(err, crate::Error::InvalidConfigValue { ref field, .. } if field == "x"));
}

#[test]
fn test_mapping_rejects_duplicate_source() {
    assert!(FieldMapping::new([("a", "x"), ("a", "y")]).is_err());
}

#[test]
fn test_mapping_numeric_must_be_destination() {
    let mapping = FieldMapping::new([("A", "a")]).unwrap();
    assert!(mapping.clone().with_numeric(["A"]).is_err());
    assert!(mapping.with_numeric(["a"]).unwrap().is_numeric("a"));
}

#[test]
fn test_csr_field_set() {
    let mapping = FieldMapping::for_fields::<CsrField>().unwrap();
    assert_eq!(mapping.len(), 25);
    assert_eq!(mapping.destination_of("# of Days Late"), Some("of_days_late"));
    assert!(mapping.is_numeric("state_plane_x_coordinate"));
    assert!(!mapping.is_numeric("sr_location"));
}

// ============================================================================
// Transformer Tests
// ============================================================================

#[test]
fn test_scenario_blank_coordinates() {
    let raw = table(&[X, Y, CREATED], &[&["", "", "2023-01-15 00:00:00"]]);
    let records = Transformer::new(spatial_profile())
        .transform(&raw, &TransformContext::default())
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("location"), Some(&CanonicalValue::Null));
    assert_eq!(records[0].get("created_date"), Some(&ts("2023-01-15T00:00:00")));
    assert_eq!(
        records[0].get("created_date").and_then(CanonicalValue::render),
        Some("2023-01-15T00:00:00".to_string())
    );
}

#[test]
fn test_reprojection_is_deterministic() {
    let raw = table(
        &[X, Y, CREATED],
        &[
            &["3115000", "10070000", "2023-01-15 00:00:00"],
            &["3115000", "10070000", "2023-02-15 00:00:00"],
        ],
    );
    let transformer = Transformer::new(spatial_profile());

    let render = || {
        transformer
            .transform(&raw, &TransformContext::default())
            .unwrap()
            .iter()
            .map(|r| r.get("location").and_then(CanonicalValue::render).unwrap())
            .collect::<Vec<_>>()
    };

    let first = render();
    assert_eq!(first[0], first[1]);
    assert_eq!(first, render());
    assert!(first[0].starts_with("POINT (-97.7406"));
}

#[test]
fn test_mapping_is_strict_projection() {
    let raw = table(
        &[X, Y, CREATED, "Unmapped", "Also Unmapped"],
        &[&["", "", "2023-01-15 00:00:00", "a", "b"]],
    );
    let records = Transformer::new(spatial_profile())
        .transform(&raw, &TransformContext::default())
        .unwrap();

    let keys: Vec<&str> = records[0].field_names().collect();
    assert_eq!(keys, vec!["location", "created_date"]);
}

#[test]
fn test_derived_columns_dropped_unless_mapped() {
    // fiscal source configured, but fiscal_year is not in the mapping
    let raw = table(&[X, Y, CREATED], &[&["", "", "2023-10-01 00:00:00"]]);
    let records = Transformer::new(spatial_profile())
        .transform(&raw, &TransformContext::default())
        .unwrap();
    assert!(records[0].get("fiscal_year").is_none());
}

#[test]
fn test_numeric_empty_becomes_null() {
    let mapping = FieldMapping::new([("Amount", "amount"), ("Note", "note")])
        .unwrap()
        .with_numeric(["amount"])
        .unwrap();
    let raw = table(&["Amount", "Note"], &[&["", ""], &["12.50", "x"]]);

    let records = transform(&raw, &mapping).unwrap();

    assert_eq!(records[0].get("amount"), Some(&CanonicalValue::Null));
    assert_eq!(records[0].get("note"), Some(&CanonicalValue::Text(String::new())));
    assert_eq!(records[1].get("amount"), Some(&CanonicalValue::Text("12.50".to_string())));
}

#[test]
fn test_numeric_whitespace_is_not_empty() {
    let mapping = FieldMapping::new([("Amount", "amount")])
        .unwrap()
        .with_numeric(["amount"])
        .unwrap();
    let raw = table(&["Amount"], &[&[" "]]);

    let records = transform(&raw, &mapping).unwrap();
    assert_eq!(records[0].get("amount"), Some(&CanonicalValue::Text(" ".to_string())));
}

#[test]
fn test_missing_mapped_field() {
    let mapping = FieldMapping::new([("A", "a"), ("B", "b")]).unwrap();
    let raw = table(&["A"], &[&["1"]]);

    let err = transform(&raw, &mapping).unwrap_err();
    assert!(matches!(err, crate::Error::MissingMappedField { ref field } if field == "B"));
}

#[test]
fn test_missing_coordinate_column() {
    let raw = table(&[X, CREATED], &[&["1", "2023-01-15 00:00:00"]]);
    let err = Transformer::new(spatial_profile())
        .transform(&raw, &TransformContext::default())
        .unwrap_err();
    assert!(matches!(err, crate::Error::MissingMappedField { ref field } if field == Y));
}

#[test]
fn test_differing_keys_never_reach_transform() {
    let a: RawRecord = [("A".to_string(), RawValue::from("1"))].into_iter().collect();
    let b: RawRecord = [("B".to_string(), RawValue::from("2"))].into_iter().collect();
    assert!(matches!(
        RawTable::from_records(vec![a, b]),
        Err(crate::Error::MalformedRow { row: 1, .. })
    ));
}

#[test]
fn test_unparseable_timestamp_is_malformed_row() {
    let raw = table(
        &[X, Y, CREATED],
        &[&["", "", "2023-01-15 00:00:00"], &["", "", "not a date"]],
    );
    let err = Transformer::new(spatial_profile())
        .transform(&raw, &TransformContext::default())
        .unwrap_err();

    match err {
        crate::Error::MalformedRow { row, column, .. } => {
            assert_eq!(row, 1);
            assert_eq!(column, CREATED);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_empty_table() {
    let mapping = FieldMapping::new([("A", "a")]).unwrap();
    assert!(transform(&RawTable::new(Vec::new()), &mapping).unwrap().is_empty());
    assert!(transform(&table(&["A"], &[]), &mapping).unwrap().is_empty());
}

#[test]
fn test_csr_profile() {
    let columns = csr_columns();
    let row = csr_row(&[
        ("Service Request (SR) Number", "23-00012345"),
        ("Department", "Austin Resource Recovery"),
        ("Created Date", "10/02/2022 08:15:00 AM"),
        ("Close Date", ""),
        ("SR Age (days)", "3"),
        ("# of Days Late", ""),
        ("State Plane X Coordinate", "3115000"),
        ("State Plane Y Coordinate", "10070000"),
    ]);
    let raw = table(&columns, &[row.as_slice()]);
    let profile = ProfileKind::Csr.build(&raw).unwrap();

    let records = Transformer::new(profile)
        .transform(&raw, &TransformContext::default())
        .unwrap();
    let record = &records[0];

    assert_eq!(record.len(), 25);
    assert_eq!(
        record.get("department"),
        Some(&CanonicalValue::Text("Austin Resource Recovery".to_string()))
    );
    assert_eq!(record.get("created_date"), Some(&ts("2022-10-02T08:15:00")));
    assert_eq!(record.get("close_date"), Some(&CanonicalValue::Null));
    assert_eq!(record.get("fiscal_year"), Some(&CanonicalValue::Integer(2023)));
    assert_eq!(record.get("of_days_late"), Some(&CanonicalValue::Null));
    assert_eq!(record.get("sr_location"), Some(&CanonicalValue::Text(String::new())));
    assert!(matches!(record.get("location"), Some(CanonicalValue::Point(_))));
}

#[test]
fn test_csr_blank_created_date_has_null_fiscal_year() {
    let raw = table(&csr_columns(), &[csr_row(&[]).as_slice()]);
    let profile = ProfileKind::Csr.build(&raw).unwrap();

    let records = Transformer::new(profile)
        .transform(&raw, &TransformContext::default())
        .unwrap();
    assert_eq!(records[0].get("fiscal_year"), Some(&CanonicalValue::Null));
    assert_eq!(records[0].get("location"), Some(&CanonicalValue::Null));
}

#[test]
fn test_expense_partition_fields() {
    let columns: Vec<&str> = ExpenseField::ALL
        .iter()
        .map(|f| f.source_column())
        .filter(|c| DerivedField::from_column(c).is_none())
        .collect();
    let row: Vec<&str> = columns
        .iter()
        .map(|c| if *c == "Expense Amount" { "1500.25" } else { "" })
        .collect();
    let raw = table(&columns, &[row.as_slice()]);

    let context = TransformContext {
        period: CalendarPeriod::new(2023, 1),
        department: Some(2400),
        origin: Some("expenses/2023/01/dept_2400.csv".to_string()),
    };
    let profile = ProfileKind::Expenses.build(&raw).unwrap();
    let records = Transformer::new(profile).transform(&raw, &context).unwrap();
    let record = &records[0];

    assert_eq!(record.get("fiscal_year"), Some(&CanonicalValue::Integer(2023)));
    assert_eq!(record.get("fiscal_month"), Some(&CanonicalValue::Integer(4)));
    assert_eq!(record.get("year"), Some(&CanonicalValue::Integer(2023)));
    assert_eq!(record.get("month"), Some(&CanonicalValue::Integer(1)));
    assert_eq!(record.get("month_name"), Some(&CanonicalValue::Text("January".to_string())));
    assert_eq!(record.get("department"), Some(&CanonicalValue::Integer(2400)));
    assert_eq!(record.get("expense_amount"), Some(&CanonicalValue::Text("1500.25".to_string())));
    assert_eq!(record.get("encumbrance_amount"), Some(&CanonicalValue::Null));
}

#[test]
fn test_context_fiscal_requires_period() {
    let raw = table(&["Metric"], &[&["1"]]);
    let profile = ProfileKind::Report.build(&raw).unwrap();
    let err = Transformer::new(profile)
        .transform(&raw, &TransformContext::default())
        .unwrap_err();
    assert!(matches!(err, crate::Error::Config { .. }));
}

#[test]
fn test_report_profile_keeps_columns() {
    let raw = table(&["Department", "Amount"], &[&["2400", "10"]]);
    let profile = ProfileKind::Report.build(&raw).unwrap();
    let context = TransformContext::with_period(CalendarPeriod::new(2024, 10).unwrap());

    let records = Transformer::new(profile).transform(&raw, &context).unwrap();
    let keys: Vec<&str> = records[0].field_names().collect();
    assert_eq!(keys, vec!["Department", "Amount", "fiscal_year", "fiscal_month"]);
    assert_eq!(records[0].get("fiscal_year"), Some(&CanonicalValue::Integer(2025)));
    assert_eq!(records[0].get("fiscal_month"), Some(&CanonicalValue::Integer(1)));
}

#[test]
fn test_derived_field_wins_over_raw_column() {
    let raw = table(&["Amount", "fiscal_year"], &[&["1", "1999"]]);
    let profile = ProfileKind::Report.build(&raw).unwrap();
    let context = TransformContext::with_period(CalendarPeriod::new(2023, 3).unwrap());

    let records = Transformer::new(profile).transform(&raw, &context).unwrap();
    assert_eq!(records[0].get("fiscal_year"), Some(&CanonicalValue::Integer(2023)));
}

#[test]
fn test_report_columns_named_like_period_fields_are_kept() {
    let raw = table(
        &["month", "year", "department", "Amount"],
        &[&["March", "FY23", "Parks", "10"]],
    );
    let profile = ProfileKind::Report.build(&raw).unwrap();
    let context = TransformContext {
        period: CalendarPeriod::new(2023, 10),
        department: Some(2400),
        origin: None,
    };

    let records = Transformer::new(profile).transform(&raw, &context).unwrap();
    let record = &records[0];
    assert_eq!(record.get("month"), Some(&CanonicalValue::Text("March".to_string())));
    assert_eq!(record.get("year"), Some(&CanonicalValue::Text("FY23".to_string())));
    assert_eq!(record.get("department"), Some(&CanonicalValue::Text("Parks".to_string())));
    assert_eq!(record.get("fiscal_year"), Some(&CanonicalValue::Integer(2024)));
    assert_eq!(record.get("fiscal_month"), Some(&CanonicalValue::Integer(1)));
}

#[test]
fn test_passthrough_profile_never_derives() {
    let raw = table(&["location", "department"], &[&["Main St", "Parks"]]);
    let profile = ProfileKind::Passthrough.build(&raw).unwrap();
    let context = TransformContext {
        period: None,
        department: Some(2400),
        origin: None,
    };

    let records = Transformer::new(profile).transform(&raw, &context).unwrap();
    assert_eq!(records[0].get("location"), Some(&CanonicalValue::Text("Main St".to_string())));
    assert_eq!(records[0].get("department"), Some(&CanonicalValue::Text("Parks".to_string())));
}

#[test]
fn test_passthrough_profile() {
    let raw = table(&["FOLDERTYPE", "COUNT"], &[&["RW", "4"]]);
    let profile = ProfileKind::Passthrough.build(&raw).unwrap();
    let records = Transformer::new(profile)
        .transform(&raw, &TransformContext::default())
        .unwrap();

    assert_eq!(records[0].get("FOLDERTYPE"), Some(&CanonicalValue::Text("RW".to_string())));
    assert_eq!(records[0].len(), 2);
}
