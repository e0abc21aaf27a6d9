use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use super::api_types::{ApiCsrf, ApiCurrentUser, ApiSubmitResponse};
use super::RemoteSource;
use crate::domain::{Collection, Invoice};
use crate::error::FetchError;

const CSRF_ENDPOINT: &str = "/set-csrf/";
const DASHBOARD_ENDPOINT: &str = "/api/dashboard/";
const USER_ENDPOINT: &str = "/api/user/";
const INVOICE_FORM_ENDPOINT: &str = "/factures/new/";

/// HTTP client for the back-office API, authenticated by session cookie.
#[derive(Clone)]
pub struct HttpRemote {
  http: reqwest::Client,
  base: Url,
  /// Fetched on first mutating call and reused for the client's lifetime
  csrf: Arc<Mutex<Option<String>>>,
}

impl HttpRemote {
  pub fn new(
    base_url: &str,
    timeout: Duration,
    session_id: Option<&str>,
  ) -> Result<Self, FetchError> {
    let base = normalize_base(base_url)?;

    let jar = Jar::default();
    if let Some(id) = session_id {
      jar.add_cookie_str(&format!("sessionid={}", id), &base);
    }

    let mut headers = HeaderMap::new();
    headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));

    let http = reqwest::Client::builder()
      .cookie_provider(Arc::new(jar))
      .default_headers(headers)
      .timeout(timeout)
      .build()?;

    Ok(Self {
      http,
      base,
      csrf: Arc::new(Mutex::new(None)),
    })
  }

  fn url(&self, path: &str) -> Result<Url, FetchError> {
    Ok(self.base.join(path.trim_start_matches('/'))?)
  }

  async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
    let url = self.url(path)?;
    debug!(%url, "GET");

    let response = self.http.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
      return Err(FetchError::Status(status.as_u16()));
    }

    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
  }

  /// CSRF token for mutating calls, requested once then cached.
  async fn csrf_token(&self) -> Result<String, FetchError> {
    let mut cached = self.csrf.lock().await;
    if let Some(token) = cached.as_ref() {
      return Ok(token.clone());
    }

    let ApiCsrf { csrftoken } = self.get_json(CSRF_ENDPOINT).await?;
    *cached = Some(csrftoken.clone());
    Ok(csrftoken)
  }
}

impl RemoteSource for HttpRemote {
  async fn fetch_collection(&self, collection: Collection) -> Result<Value, FetchError> {
    self.get_json(&collection.endpoint()).await
  }

  async fn fetch_dashboard(&self) -> Result<Value, FetchError> {
    self.get_json(DASHBOARD_ENDPOINT).await
  }

  async fn submit_invoice(&self, invoice: &Invoice) -> Result<(), FetchError> {
    let token = self.csrf_token().await?;
    let url = self.url(INVOICE_FORM_ENDPOINT)?;
    let form = invoice_form(invoice)?;
    debug!(%url, number = %invoice.number, "POST invoice");

    let response = self
      .http
      .post(url)
      .header("X-CSRFToken", token)
      .form(&form)
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      return Err(FetchError::Status(status.as_u16()));
    }

    let body = response.text().await?;
    let reply: ApiSubmitResponse = serde_json::from_str(&body)?;
    if reply.success {
      Ok(())
    } else {
      Err(FetchError::Rejected(
        reply.error.unwrap_or_else(|| "invoice refused".to_string()),
      ))
    }
  }

  async fn fetch_identity(&self) -> Result<ApiCurrentUser, FetchError> {
    self.get_json(USER_ENDPOINT).await
  }
}

/// Base URLs always end in `/` so joined paths keep any prefix.
fn normalize_base(raw: &str) -> Result<Url, FetchError> {
  let trimmed = raw.trim();
  if trimmed.ends_with('/') {
    Ok(Url::parse(trimmed)?)
  } else {
    Ok(Url::parse(&format!("{}/", trimmed))?)
  }
}

/// Form fields of the invoice creation endpoint.
fn invoice_form(invoice: &Invoice) -> Result<Vec<(&'static str, String)>, FetchError> {
  let lines: Vec<Value> = invoice
    .lines
    .iter()
    .map(|line| {
      serde_json::json!({
        "description": line.description,
        "quantite": line.quantity.to_string(),
        "prix_unitaire": line.unit_price.to_string(),
        "total": line.total().to_string(),
      })
    })
    .collect();

  Ok(vec![
    ("numero", invoice.number.clone()),
    ("client_id", invoice.client_id.clone()),
    (
      "client_nom",
      invoice.client_name.clone().unwrap_or_default(),
    ),
    ("chantier_id", invoice.worksite_id.clone().unwrap_or_default()),
    ("date", invoice.date.format("%Y-%m-%d").to_string()),
    ("subtotal", invoice.subtotal().to_string()),
    ("tva_pct", invoice.tax_pct.to_string()),
    ("tva_amount", invoice.tax_amount().to_string()),
    ("total", invoice.total().to_string()),
    ("statut", invoice.status.as_str().to_string()),
    ("lines_json", serde_json::to_string(&lines)?),
  ])
}
