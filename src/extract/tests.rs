//! Tests for extraction

use super::*;
use crate::config::ReportServerConfig;
use crate::database::DatabaseEngine;
use crate::decode::{DecoderConfig, TextEncoding};
use crate::error::Error;
use crate::http::HttpClient;
use crate::output::ObjectStorage;
use crate::record::RawValue;
use crate::transform::CalendarPeriod;
use bytes::Bytes;
use chrono::NaiveDate;
use object_store::memory::InMemory;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn text(s: &str) -> RawValue {
    RawValue::from(s)
}

fn int(i: i64) -> RawValue {
    RawValue::Integer(i)
}

// ============================================================================
// Partition Keys
// ============================================================================

#[test]
fn test_partition_key_expenses() {
    let key = PartitionKey::parse("expenses/2023/01/dept_2400.csv", "expenses/").unwrap();
    assert_eq!(key.period, CalendarPeriod::new(2023, 1).unwrap());
    assert_eq!(key.department, 2400);

    let fiscal = key.period.fiscal();
    assert_eq!(fiscal.fiscal_year, 2023);
    assert_eq!(fiscal.fiscal_month, 4);
}

#[test]
fn test_partition_key_revenue() {
    let key = PartitionKey::parse("revenue/2022/11/dept_6800.csv", "revenue/").unwrap();
    assert_eq!(key.period.year(), 2022);
    assert_eq!(key.period.month(), 11);
    assert_eq!(key.department, 6800);

    let fiscal = key.period.fiscal();
    assert_eq!(fiscal.fiscal_year, 2023);
    assert_eq!(fiscal.fiscal_month, 2);
}

#[test]
fn test_partition_key_context() {
    let key = PartitionKey::parse("expenses/2023/01/dept_2400.csv", "expenses/").unwrap();
    let context = key.context("expenses/2023/01/dept_2400.csv");
    assert_eq!(context.period, CalendarPeriod::new(2023, 1));
    assert_eq!(context.department, Some(2400));
    assert_eq!(
        context.origin.as_deref(),
        Some("expenses/2023/01/dept_2400.csv")
    );
}

#[test]
fn test_partition_key_rejects_renamed_layout() {
    for key in [
        "expenses/23/01/dept_2400.csv",
        "expenses/2023-01/dept_2400.csv",
        "expenses/2023/13/dept_2400.csv",
        "expenses/2023/01/dept_24.csv",
        "expenses/2023",
        "expenses/2023/01/dept_+240.csv",
        "expenses/2023/+1/dept_2400.csv",
        "expenses/2023/01_dept_2400.csv",
        "expenses/2023/01/2400",
    ] {
        let err = PartitionKey::parse(key, "expenses/").unwrap_err();
        assert!(
            matches!(err, Error::MalformedRow { ref column, .. } if column == key),
            "{key}: {err}"
        );
    }
}

#[test]
fn test_partition_key_outside_prefix() {
    assert!(PartitionKey::parse("revenue/2023/01/dept_2400.csv", "expenses/").is_err());
}

// ============================================================================
// Partition Extractor
// ============================================================================

#[tokio::test]
async fn test_partition_extractor_in_key_order() {
    let storage = ObjectStorage::with_store(Arc::new(InMemory::new()), "");
    storage
        .put(
            "expenses/2023/02/dept_2400.csv",
            Bytes::from_static(b"Fund ID,Expense Amount\n1000,5\n"),
        )
        .await
        .unwrap();
    storage
        .put(
            "expenses/2023/01/dept_2400.csv",
            Bytes::from_static(b"Fund ID,Expense Amount\n1000,\"1,250.00\"\n2000,\n"),
        )
        .await
        .unwrap();
    storage
        .put("revenue/2023/01/dept_2400.csv", Bytes::from_static(b"x\n1\n"))
        .await
        .unwrap();

    let extractor = PartitionExtractor::new("expenses", "expenses/", storage);
    assert_eq!(extractor.source_name(), "expenses");

    let extracts = extractor.extract().await.unwrap();
    assert_eq!(extracts.len(), 2);

    let january = &extracts[0];
    assert_eq!(january.context.period, CalendarPeriod::new(2023, 1));
    assert_eq!(january.context.department, Some(2400));
    assert_eq!(january.len(), 2);
    assert_eq!(
        january.table.row(0).unwrap().get("Expense Amount"),
        Some(&RawValue::from("1,250.00"))
    );
    assert_eq!(
        january.table.row(1).unwrap().get("Expense Amount"),
        Some(&RawValue::from(""))
    );

    assert_eq!(extracts[1].context.period, CalendarPeriod::new(2023, 2));
}

#[tokio::test]
async fn test_partition_extractor_empty_prefix() {
    let storage = ObjectStorage::with_store(Arc::new(InMemory::new()), "");
    let extracts = PartitionExtractor::new("revenue", "revenue/", storage)
        .extract()
        .await
        .unwrap();
    assert!(extracts.is_empty());
}

#[tokio::test]
async fn test_partition_extractor_bad_key_fails() {
    let storage = ObjectStorage::with_store(Arc::new(InMemory::new()), "");
    storage
        .put("expenses/latest.csv", Bytes::from_static(b"a\n1\n"))
        .await
        .unwrap();

    let err = PartitionExtractor::new("expenses", "expenses/", storage)
        .extract()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MalformedRow { .. }));
}

// ============================================================================
// SQL Extractor
// ============================================================================

fn permit_engine() -> DatabaseEngine {
    let engine = DatabaseEngine::in_memory().unwrap();
    engine
        .execute_batch(
            "CREATE TABLE source_db.folder (
                folderrsn INTEGER,
                foldertype VARCHAR,
                subcode INTEGER,
                statuscode INTEGER,
                indate TIMESTAMP,
                issuedate TIMESTAMP,
                foldername VARCHAR
            );
            INSERT INTO source_db.folder VALUES
                (1, 'RW', 50500, 50010, TIMESTAMP '2023-01-15 08:00:00', TIMESTAMP '2023-01-20 09:00:00', 'RW-1'),
                (2, 'RW', 50500, 50010, TIMESTAMP '2023-01-15 13:00:00', NULL, 'LA-2'),
                (3, 'RW', 50510, 50010, TIMESTAMP '2023-01-15 08:00:00', NULL, 'RW-3'),
                (4, 'DS', 50600, 50005, TIMESTAMP '2023-01-15 08:00:00', NULL, 'DS-4'),
                (5, 'EX', 50700, 50010, TIMESTAMP '2017-01-01 08:00:00', NULL, 'EX-5'),
                (6, 'DS', 50600, 50010, TIMESTAMP '2023-02-01 00:00:00', NULL, 'DS-6');",
        )
        .unwrap();
    engine
}

#[tokio::test]
async fn test_sql_applications_received() {
    let sql = builtin_query("applications_received").unwrap();
    let extractor = SqlExtractor::new("applications_received", sql, permit_engine());

    let extracts = extractor.extract().await.unwrap();
    assert_eq!(extracts.len(), 1);

    let table = &extracts[0].table;
    assert_eq!(
        table.columns(),
        &["FOLDERTYPE", "SUBCODE", "INDATE_DAY", "ISSUEDROWPERMITS"]
    );

    let rows: Vec<Vec<RawValue>> = table
        .rows()
        .map(|r| r.iter().map(|(_, v)| v.clone()).collect())
        .collect();
    let expected = vec![
        vec![text("DS"), int(50600), text("2023-02-01"), int(1)],
        vec![text("RW"), int(50500), text("2023-01-15"), int(1)],
        vec![text("RW"), int(50500), text("2023-01-16"), int(1)],
    ];
    assert_eq!(rows, expected);
}

#[tokio::test]
async fn test_sql_active_permits() {
    let sql = builtin_query("active_permits").unwrap();
    let extracts = SqlExtractor::new("active_permits", sql, permit_engine())
        .extract()
        .await
        .unwrap();

    let table = &extracts[0].table;
    let counts: Vec<(RawValue, RawValue)> = table
        .rows()
        .map(|r| {
            (
                r.get("FOLDERTYPE").unwrap().clone(),
                r.get("ACTIVEPERMITS").unwrap().clone(),
            )
        })
        .collect();
    let expected = vec![
        (text("DS"), int(1)),
        (text("EX"), int(1)),
        (text("RW"), int(2)),
    ];
    assert_eq!(counts, expected);
}

#[tokio::test]
async fn test_sql_empty_result_is_not_an_error() {
    let engine = permit_engine();
    let extracts = SqlExtractor::new(
        "nothing",
        "SELECT foldertype FROM source_db.folder WHERE folderrsn < 0",
        engine,
    )
    .extract()
    .await
    .unwrap();
    assert!(extracts[0].is_empty());
}

#[tokio::test]
async fn test_sql_failure_is_source_unavailable() {
    let err = SqlExtractor::new("broken", "SELECT * FROM source_db.nope", permit_engine())
        .extract()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SourceUnavailable { ref source_name, .. } if source_name == "broken"));
}

#[test]
fn test_builtin_queries_registered() {
    let names: Vec<&str> = BUILTIN_QUERIES.iter().map(|(n, _)| *n).collect();
    assert_eq!(
        names,
        vec!["applications_received", "active_permits", "issued_permits"]
    );
    assert!(builtin_query("unknown").is_none());
}

// ============================================================================
// Delimited Extractor
// ============================================================================

fn delimited(server: &MockServer, decoder: DecoderConfig) -> DelimitedExtractor {
    DelimitedExtractor::new(
        "csr",
        format!("{}/export.tsv", server.uri()),
        decoder,
        HttpClient::new().unwrap(),
    )
}

#[tokio::test]
async fn test_delimited_extractor_tsv() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/export.tsv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "Service Request (SR) Number\tStatus Description\n22-001\tClosed\n22-002\t\n",
        ))
        .mount(&server)
        .await;

    let extracts = delimited(&server, DecoderConfig::tsv())
        .extract()
        .await
        .unwrap();
    let table = &extracts[0].table;
    assert_eq!(table.len(), 2);
    assert_eq!(
        table.row(1).unwrap().get("Status Description"),
        Some(&RawValue::from(""))
    );
}

#[tokio::test]
async fn test_delimited_extractor_utf16_payload() {
    let server = MockServer::start().await;
    let mut body = vec![0xFF, 0xFE];
    for unit in "a\tb\n1\t2\n".encode_utf16() {
        body.extend_from_slice(&unit.to_le_bytes());
    }
    Mock::given(method("GET"))
        .and(path("/export.tsv"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(&server)
        .await;

    let extracts = delimited(
        &server,
        DecoderConfig::tsv().with_encoding(TextEncoding::Utf16),
    )
    .extract()
    .await
    .unwrap();
    assert_eq!(extracts[0].table.columns(), &["a", "b"]);
    assert_eq!(
        extracts[0].table.row(0).unwrap().get("b"),
        Some(&RawValue::from("2"))
    );
}

#[tokio::test]
async fn test_delimited_extractor_column_mismatch_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/export.tsv"))
        .respond_with(ResponseTemplate::new(200).set_body_string("a\tb\n1\t2\t3\n"))
        .mount(&server)
        .await;

    let err = delimited(&server, DecoderConfig::tsv())
        .extract()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MalformedRow { .. }));
}

#[tokio::test]
async fn test_delimited_extractor_http_error_is_source_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/export.tsv"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .expect(1)
        .mount(&server)
        .await;

    let err = delimited(&server, DecoderConfig::tsv())
        .extract()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SourceUnavailable { ref message, .. } if message.contains("down")));
}

// ============================================================================
// Report Prompts
// ============================================================================

fn declared_prompts(count: usize) -> Vec<Prompt> {
    (0..count)
        .map(|i| Prompt {
            id: format!("P{i}"),
            source: (i % 2 == 1 || i == 4).then(|| PromptSource {
                id: format!("S{i}"),
            }),
        })
        .collect()
}

#[test]
fn test_bindings_use_fiscal_year_of_as_of_date() {
    let bindings = ReportKind::Expenses.bindings("2400", date(2022, 10, 5));
    assert_eq!(
        bindings,
        vec![
            PromptBinding::new(0, PromptAnswer::Value("2400".to_string())),
            PromptBinding::new(1, PromptAnswer::FiscalYearElement(2023)),
            PromptBinding::new(2, PromptAnswer::AsOfDate(date(2022, 10, 5))),
            PromptBinding::new(3, PromptAnswer::FiscalYearElement(2023)),
        ]
    );

    let revenue = ReportKind::Revenue.bindings("2400", date(2023, 6, 30));
    let positions: Vec<usize> = revenue.iter().map(|b| b.position).collect();
    assert_eq!(positions, vec![0, 1, 2, 4]);
}

#[test]
fn test_answer_prompts_expenses_body() {
    let body = answer_prompts(
        &declared_prompts(4),
        &ReportKind::Expenses.bindings("2400", date(2023, 6, 30)),
    )
    .unwrap();

    assert_eq!(
        body,
        json!({"prompts": [
            {"id": "P0", "type": "VALUE", "answers": "2400"},
            {"id": "P1", "type": "ELEMENTS", "answers": [{"id": "h2023;S1", "name": "2023"}]},
            {"id": "P2", "type": "VALUE", "answers": "2023-06-30T05:00:00.000+0000"},
            {"id": "P3", "type": "ELEMENTS", "answers": [{"id": "h2023;S3", "name": "2023"}]},
        ]})
    );
}

#[test]
fn test_answer_prompts_position_out_of_range() {
    let err = answer_prompts(
        &declared_prompts(4),
        &ReportKind::Revenue.bindings("2400", date(2023, 6, 30)),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Prompt { .. }));
}

#[test]
fn test_answer_prompts_element_without_source() {
    let prompts = vec![Prompt {
        id: "P0".to_string(),
        source: None,
    }];
    let err = answer_prompts(
        &prompts,
        &[PromptBinding::new(0, PromptAnswer::FiscalYearElement(2023))],
    )
    .unwrap_err();
    assert!(matches!(err, Error::Prompt { .. }));
}

#[test]
fn test_report_id_override() {
    let mut config = ReportServerConfig::new("http://bi", "u", "p", "proj");
    assert_eq!(ReportKind::Expenses.report_id(&config), EXPENSE_REPORT_ID);

    config
        .reports
        .insert("revenue".to_string(), "ABC".to_string());
    assert_eq!(ReportKind::Revenue.report_id(&config), "ABC");
    assert_eq!(ReportKind::Revenue.default_report_id(), REVENUE_REPORT_ID);
}

// ============================================================================
// Report Extractor
// ============================================================================

fn report_page(rows: serde_json::Value, raw: serde_json::Value) -> serde_json::Value {
    json!({
        "instanceId": "I1",
        "definition": {"grid": {
            "rows": [
                {"name": "Fund", "type": "attribute",
                 "forms": [{"name": "ID"}, {"name": "DESC"}],
                 "elements": [
                    {"formValues": ["1000", "General Fund"]},
                    {"formValues": ["5000", "Enterprise"]}
                 ]},
                {"name": "Month", "type": "attribute",
                 "forms": [{"name": "DESC"}],
                 "elements": [{"formValues": ["June 2023"]}]}
            ],
            "columns": [
                {"name": "Metrics", "type": "templateMetrics",
                 "elements": [{"name": "Revenue Amount"}, {"name": "Budget Amount"}]}
            ]
        }},
        "data": {
            "paging": {"total": 3, "current": 2, "offset": 0, "limit": 2},
            "headers": {"rows": rows},
            "metricValues": {"raw": raw}
        }
    })
}

async fn mount_report_server(server: &MockServer, logout_status: u16) {
    let report = REVENUE_REPORT_ID;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({"username": "bi-user", "password": "bi-pass", "loginMode": 1})))
        .respond_with(ResponseTemplate::new(204).insert_header(AUTH_TOKEN_HEADER, "tok"))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/api/v2/reports/{report}/instances")))
        .and(header(AUTH_TOKEN_HEADER, "tok"))
        .and(header(PROJECT_HEADER, "proj"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"instanceId": "I1", "status": 2})))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/api/reports/{report}/instances/I1/prompts")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "P0", "type": "VALUE"},
            {"id": "P1", "type": "ELEMENTS", "source": {"id": "S1"}},
            {"id": "P2", "type": "VALUE"},
            {"id": "P3", "type": "VALUE"},
            {"id": "P4", "type": "ELEMENTS", "source": {"id": "S4"}}
        ])))
        .mount(server)
        .await;

    Mock::given(method("PUT"))
        .and(path(format!("/api/reports/{report}/instances/I1/prompts/answers")))
        .and(body_json(json!({"prompts": [
            {"id": "P0", "type": "VALUE", "answers": "2400"},
            {"id": "P1", "type": "ELEMENTS", "answers": [{"id": "h2023;S1", "name": "2023"}]},
            {"id": "P2", "type": "VALUE", "answers": "2023-06-30T05:00:00.000+0000"},
            {"id": "P4", "type": "ELEMENTS", "answers": [{"id": "h2023;S4", "name": "2023"}]}
        ]})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/api/v2/reports/{report}/instances/I1")))
        .and(query_param("offset", "0"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(report_page(
            json!([[0, 0], [1, 0]]),
            json!([[125.5, 1000], [null, 2000]]),
        )))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/api/v2/reports/{report}/instances/I1")))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(report_page(
            json!([[0, 0]]),
            json!([[7, 70]]),
        )))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .respond_with(ResponseTemplate::new(logout_status))
        .expect(1)
        .mount(server)
        .await;
}

fn report_extractor(server: &MockServer) -> ReportExtractor {
    let mut config = ReportServerConfig::new(server.uri(), "bi-user", "bi-pass", "proj");
    config.page_size = 2;
    ReportExtractor::new(
        "revenue_report",
        ReportKind::Revenue,
        date(2023, 6, 30),
        config,
        Duration::from_secs(30),
    )
    .unwrap()
}

#[tokio::test]
async fn test_report_extractor_full_session() {
    let server = MockServer::start().await;
    mount_report_server(&server, 204).await;

    let extracts = report_extractor(&server).extract().await.unwrap();
    assert_eq!(extracts.len(), 1);

    let extract = &extracts[0];
    assert_eq!(extract.context.period, CalendarPeriod::new(2023, 6));
    assert_eq!(extract.context.origin.as_deref(), Some(REVENUE_REPORT_ID));

    let table = &extract.table;
    assert_eq!(
        table.columns(),
        &["Fund@ID", "Fund@DESC", "Month", "Revenue Amount", "Budget Amount"]
    );
    assert_eq!(table.len(), 3);

    let second = table.row(1).unwrap();
    assert_eq!(second.get("Fund@DESC"), Some(&RawValue::from("Enterprise")));
    assert_eq!(second.get("Revenue Amount"), Some(&RawValue::Null));
    assert_eq!(second.get("Budget Amount"), Some(&RawValue::Integer(2000)));

    let first = table.row(0).unwrap();
    assert_eq!(first.get("Revenue Amount"), Some(&RawValue::Float(125.5)));

    let third = table.row(2).unwrap();
    assert_eq!(third.get("Fund@ID"), Some(&RawValue::from("1000")));
    assert_eq!(third.get("Budget Amount"), Some(&RawValue::Integer(70)));
}

#[tokio::test]
async fn test_report_logout_failure_is_only_logged() {
    let server = MockServer::start().await;
    mount_report_server(&server, 500).await;

    let extracts = report_extractor(&server).extract().await.unwrap();
    assert_eq!(extracts[0].len(), 3);
}

#[tokio::test]
async fn test_report_login_failure_is_source_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&server)
        .await;

    let err = report_extractor(&server).extract().await.unwrap_err();
    assert!(matches!(err, Error::SourceUnavailable { .. }));
}

#[tokio::test]
async fn test_report_prompt_mismatch_still_logs_out() {
    let server = MockServer::start().await;
    let report = REVENUE_REPORT_ID;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(204).insert_header(AUTH_TOKEN_HEADER, "tok"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/api/v2/reports/{report}/instances")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"instanceId": "I1"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/reports/{report}/instances/I1/prompts")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "P0"}])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let err = report_extractor(&server).extract().await.unwrap_err();
    assert!(matches!(err, Error::Prompt { .. }));
}
