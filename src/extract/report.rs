//! Prompted BI report extraction
//!
//! A report run is a short session against the report server's REST API:
//!
//! 1. log in and keep the auth token (plus the session cookie)
//! 2. open a report instance
//! 3. read the instance's prompt specification
//! 4. answer the prompts, each answer bound to a prompt by position
//! 5. page through the instance result
//!
//! Logout is attempted afterwards whatever happened; its own failure is
//! only logged.

use super::types::{Extract, Extractor};
use crate::config::ReportServerConfig;
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RequestConfig};
use crate::record::{RawTable, RawValue};
use crate::transform::{CalendarPeriod, TransformContext};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Session token header
pub const AUTH_TOKEN_HEADER: &str = "X-MSTR-AuthToken";

/// Project scope header
pub const PROJECT_HEADER: &str = "X-MSTR-ProjectID";

/// Default id of the expense report
pub const EXPENSE_REPORT_ID: &str = "1C804F8891479811944EF68F99835649";

/// Default id of the revenue report
pub const REVENUE_REPORT_ID: &str = "FBC5E5F30744717D7079ADADB956C3BC";

// ============================================================================
// Report kinds and prompt answers
// ============================================================================

/// Which finance report to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// Expenses by department and fiscal year
    Expenses,
    /// Revenue by department and fiscal year
    Revenue,
}

impl ReportKind {
    /// Name used to override the report id under `report_server.reports`
    pub fn name(self) -> &'static str {
        match self {
            ReportKind::Expenses => "expenses",
            ReportKind::Revenue => "revenue",
        }
    }

    /// Report id shipped with the pipeline
    pub fn default_report_id(self) -> &'static str {
        match self {
            ReportKind::Expenses => EXPENSE_REPORT_ID,
            ReportKind::Revenue => REVENUE_REPORT_ID,
        }
    }

    /// Report id, honoring a configured override
    pub fn report_id(self, config: &ReportServerConfig) -> String {
        config
            .reports
            .get(self.name())
            .cloned()
            .unwrap_or_else(|| self.default_report_id().to_string())
    }

    /// Answers for this report's prompt layout
    ///
    /// Both reports ask for department, fiscal year, as-of date and budget
    /// fiscal year; the revenue report has an extra prompt before the
    /// budget year that is left unanswered.
    pub fn bindings(self, department: &str, as_of: NaiveDate) -> Vec<PromptBinding> {
        let fiscal_year = CalendarPeriod::from_date(as_of).fiscal().fiscal_year;
        let budget_position = match self {
            ReportKind::Expenses => 3,
            ReportKind::Revenue => 4,
        };

        vec![
            PromptBinding::new(0, PromptAnswer::Value(department.to_string())),
            PromptBinding::new(1, PromptAnswer::FiscalYearElement(fiscal_year)),
            PromptBinding::new(2, PromptAnswer::AsOfDate(as_of)),
            PromptBinding::new(budget_position, PromptAnswer::FiscalYearElement(fiscal_year)),
        ]
    }
}

/// A prompt declared by a report instance
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Prompt {
    /// Prompt id
    pub id: String,
    /// Element source for element prompts
    #[serde(default)]
    pub source: Option<PromptSource>,
}

/// The attribute an element prompt draws from
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PromptSource {
    /// Attribute id
    pub id: String,
}

/// An answer value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptAnswer {
    /// A literal value prompt answer
    Value(String),
    /// A date value prompt answer
    AsOfDate(NaiveDate),
    /// A fiscal-year element of the prompt's source attribute
    FiscalYearElement(i32),
}

impl PromptAnswer {
    fn to_json(&self, prompt: &Prompt) -> Result<Value> {
        let answer = match self {
            PromptAnswer::Value(text) => json!({
                "id": prompt.id,
                "type": "VALUE",
                "answers": text,
            }),
            PromptAnswer::AsOfDate(date) => json!({
                "id": prompt.id,
                "type": "VALUE",
                "answers": format!("{}T05:00:00.000+0000", date.format("%Y-%m-%d")),
            }),
            PromptAnswer::FiscalYearElement(fiscal_year) => {
                let source = prompt.source.as_ref().ok_or_else(|| {
                    Error::prompt(format!("prompt {} has no element source", prompt.id))
                })?;
                json!({
                    "id": prompt.id,
                    "type": "ELEMENTS",
                    "answers": [{
                        "id": format!("h{fiscal_year};{}", source.id),
                        "name": fiscal_year.to_string(),
                    }],
                })
            }
        };
        Ok(answer)
    }
}

/// An answer bound to a prompt position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBinding {
    /// Index into the instance's prompt specification
    pub position: usize,
    /// The answer
    pub answer: PromptAnswer,
}

impl PromptBinding {
    /// Bind an answer to a position
    pub fn new(position: usize, answer: PromptAnswer) -> Self {
        Self { position, answer }
    }
}

/// Build the answers body for a prompt specification
pub fn answer_prompts(prompts: &[Prompt], bindings: &[PromptBinding]) -> Result<Value> {
    let answers = bindings
        .iter()
        .map(|binding| {
            let prompt = prompts.get(binding.position).ok_or_else(|| {
                Error::prompt(format!(
                    "answer bound to prompt {} but the report declares {}",
                    binding.position,
                    prompts.len()
                ))
            })?;
            binding.answer.to_json(prompt)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(json!({ "prompts": answers }))
}

// ============================================================================
// Result pages
// ============================================================================

#[derive(Debug, Deserialize)]
struct ReportPage {
    definition: Definition,
    data: PageData,
}

#[derive(Debug, Deserialize)]
struct Definition {
    grid: Grid,
}

#[derive(Debug, Deserialize)]
struct Grid {
    #[serde(default)]
    rows: Vec<GridAttribute>,
    #[serde(default)]
    columns: Vec<GridHeader>,
}

#[derive(Debug, Deserialize)]
struct GridAttribute {
    name: String,
    #[serde(default)]
    forms: Vec<Named>,
    #[serde(default)]
    elements: Vec<AttributeElement>,
}

#[derive(Debug, Deserialize)]
struct GridHeader {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    elements: Vec<Named>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AttributeElement {
    #[serde(rename = "formValues", default)]
    form_values: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct PageData {
    paging: Paging,
    #[serde(default)]
    headers: Headers,
    #[serde(rename = "metricValues", default)]
    metric_values: MetricValues,
}

#[derive(Debug, Deserialize)]
struct Paging {
    total: usize,
}

#[derive(Debug, Default, Deserialize)]
struct Headers {
    #[serde(default)]
    rows: Vec<Vec<usize>>,
}

#[derive(Debug, Default, Deserialize)]
struct MetricValues {
    #[serde(default)]
    raw: Vec<Vec<Value>>,
}

impl ReportPage {
    /// Attribute forms, then metrics
    fn columns(&self) -> Vec<String> {
        let mut columns = Vec::new();
        for attribute in &self.definition.grid.rows {
            if attribute.forms.len() > 1 {
                columns.extend(
                    attribute
                        .forms
                        .iter()
                        .map(|form| format!("{}@{}", attribute.name, form.name)),
                );
            } else {
                columns.push(attribute.name.clone());
            }
        }
        columns.extend(self.metric_names());
        columns
    }

    fn metric_names(&self) -> impl Iterator<Item = String> + '_ {
        self.definition
            .grid
            .columns
            .iter()
            .filter(|header| header.kind == "templateMetrics")
            .flat_map(|header| header.elements.iter().map(|m| m.name.clone()))
    }

    /// Rows of this page, offset by `first_row` for error messages
    fn rows(&self, first_row: usize) -> Result<Vec<Vec<RawValue>>> {
        let grid = &self.definition.grid;
        let metric_count = self.metric_names().count();
        let mut rows = Vec::with_capacity(self.data.headers.rows.len());

        for (i, header) in self.data.headers.rows.iter().enumerate() {
            let row_number = first_row + i;
            let mut values = Vec::new();

            for (attribute, element_index) in grid.rows.iter().zip(header) {
                let element = attribute.elements.get(*element_index).ok_or_else(|| {
                    Error::malformed_row(row_number, &attribute.name, "element index out of range")
                })?;
                let forms = attribute.forms.len().max(1);
                for form in 0..forms {
                    values.push(json_to_raw(element.form_values.get(form)));
                }
            }

            let metrics = self.data.metric_values.raw.get(i);
            if metric_count > 0 && metrics.is_none() {
                return Err(Error::malformed_row(row_number, "*", "row has no metric values"));
            }
            for m in 0..metric_count {
                values.push(json_to_raw(metrics.and_then(|row| row.get(m))));
            }

            rows.push(values);
        }

        Ok(rows)
    }
}

fn json_to_raw(value: Option<&Value>) -> RawValue {
    match value {
        None | Some(Value::Null) => RawValue::Null,
        Some(Value::String(s)) => RawValue::Text(s.clone()),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(RawValue::Integer)
            .or_else(|| n.as_f64().map(RawValue::Float))
            .unwrap_or(RawValue::Null),
        Some(Value::Bool(b)) => RawValue::Integer(i64::from(*b)),
        Some(other) => RawValue::Text(other.to_string()),
    }
}

// ============================================================================
// Extractor
// ============================================================================

/// Runs one prompted report for an as-of date
#[derive(Debug, Clone)]
pub struct ReportExtractor {
    name: String,
    kind: ReportKind,
    as_of: NaiveDate,
    config: ReportServerConfig,
    client: HttpClient,
}

impl ReportExtractor {
    /// Create an extractor with a session-keeping client
    pub fn new(
        name: impl Into<String>,
        kind: ReportKind,
        as_of: NaiveDate,
        config: ReportServerConfig,
        timeout: Duration,
    ) -> Result<Self> {
        let client = HttpClient::with_config(
            HttpClientConfig::builder()
                .base_url(config.base_url.clone())
                .timeout(timeout)
                .cookie_store(true)
                .build(),
        )?;

        Ok(Self {
            name: name.into(),
            kind,
            as_of,
            config,
            client,
        })
    }

    fn session(&self, token: &str) -> RequestConfig {
        RequestConfig::new()
            .header(AUTH_TOKEN_HEADER, token)
            .header(PROJECT_HEADER, self.config.project_id.clone())
    }

    async fn login(&self) -> Result<String> {
        let body = json!({
            "username": self.config.username,
            "password": self.config.password,
            "loginMode": self.config.login_mode,
        });
        let response = self.client.post("/api/auth/login", body).await?;

        response
            .headers()
            .get(AUTH_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| Error::source_unavailable(&self.name, "login returned no auth token"))
    }

    async fn logout(&self, token: &str) -> Result<()> {
        self.client
            .post_with_config("/api/auth/logout", self.session(token))
            .await?;
        Ok(())
    }

    async fn open_instance(&self, token: &str, report_id: &str) -> Result<String> {
        let created: Value = self
            .client
            .request_json(
                reqwest::Method::POST,
                &format!("/api/v2/reports/{report_id}/instances"),
                self.session(token),
            )
            .await?;

        created
            .get("instanceId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::prompt(format!("report {report_id} returned no instanceId")))
    }

    async fn answer(&self, token: &str, report_id: &str, instance_id: &str) -> Result<()> {
        let prompts: Vec<Prompt> = self
            .client
            .request_json(
                reqwest::Method::GET,
                &format!("/api/reports/{report_id}/instances/{instance_id}/prompts"),
                self.session(token),
            )
            .await?;
        debug!("Report {} declares {} prompts", report_id, prompts.len());

        let bindings = self.kind.bindings(&self.config.department, self.as_of);
        let body = answer_prompts(&prompts, &bindings)?;

        self.client
            .put_with_config(
                &format!("/api/reports/{report_id}/instances/{instance_id}/prompts/answers"),
                self.session(token).json(body),
            )
            .await?;
        Ok(())
    }

    async fn materialize(
        &self,
        token: &str,
        report_id: &str,
        instance_id: &str,
    ) -> Result<RawTable> {
        let limit = self.config.page_size.max(1);
        let path = format!("/api/v2/reports/{report_id}/instances/{instance_id}");
        let mut table: Option<RawTable> = None;
        let mut offset = 0;

        loop {
            let page: ReportPage = self
                .client
                .request_json(
                    reqwest::Method::GET,
                    &path,
                    self.session(token).query("offset", offset).query("limit", limit),
                )
                .await?;

            let target = table.get_or_insert_with(|| RawTable::new(page.columns()));
            let rows = page.rows(offset)?;
            let fetched = rows.len();
            for row in rows {
                target.push_row(row)?;
            }

            offset += fetched;
            debug!("Fetched {}/{} report rows", offset, page.data.paging.total);
            if fetched == 0 || offset >= page.data.paging.total {
                break;
            }
        }

        Ok(table.unwrap_or_default())
    }

    async fn run(&self, token: &str) -> Result<RawTable> {
        let report_id = self.kind.report_id(&self.config);
        let instance_id = self.open_instance(token, &report_id).await?;
        self.answer(token, &report_id, &instance_id).await?;
        self.materialize(token, &report_id, &instance_id).await
    }
}

#[async_trait]
impl Extractor for ReportExtractor {
    fn source_name(&self) -> &str {
        &self.name
    }

    async fn extract(&self) -> Result<Vec<Extract>> {
        let token = self
            .login()
            .await
            .map_err(|e| e.into_source_unavailable(&self.name))?;

        let result = self.run(&token).await;

        if let Err(e) = self.logout(&token).await {
            warn!("Report server logout failed: {}", e);
        }

        let table = result.map_err(|e| e.into_source_unavailable(&self.name))?;
        info!("Extracted {} rows from '{}'", table.len(), self.name);

        let context = TransformContext {
            period: Some(CalendarPeriod::from_date(self.as_of)),
            department: None,
            origin: Some(self.kind.report_id(&self.config)),
        };
        Ok(vec![Extract::with_context(table, context)])
    }
}
