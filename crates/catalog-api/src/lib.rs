// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use catalog_app::{
    Brand, Category, FetchCompletion, FetchTicket, Product, ProductId, ProductPage,
    ProductPayload, ProductQuery, ProductsService, Rating,
};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Blocking client for the product admin REST resource.
#[derive(Debug, Clone)]
pub struct Client {
    base: Url,
    base_url: String,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            bail!("api.base_url must not be empty");
        }
        let base = Url::parse(trimmed).with_context(|| format!("parse base URL {trimmed:?}"))?;
        if !matches!(base.scheme(), "http" | "https") {
            bail!(
                "api.base_url must use http or https, got {:?}",
                base.scheme()
            );
        }
        if base.cannot_be_a_base() {
            bail!("api.base_url {trimmed:?} cannot carry a path");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base,
            base_url: trimmed.to_owned(),
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn fetch_products(&self, query: &ProductQuery) -> Result<ProductPage> {
        let url = self.endpoint(&["products"])?;
        let request = self.http.get(url).query(&[
            ("includeDeleted", query.include_deleted.to_string()),
            ("page", query.page.to_string()),
            ("pageSize", query.page_size.to_string()),
        ]);
        self.send_json(request, "decode product page")
    }

    pub fn create(&self, payload: &ProductPayload) -> Result<Product> {
        let url = self.endpoint(&["products"])?;
        self.send_json(self.http.post(url).json(payload), "decode created product")
    }

    pub fn update(&self, id: &ProductId, payload: &ProductPayload) -> Result<Product> {
        let url = self.endpoint(&["products", id.as_str()])?;
        self.send_json(self.http.put(url).json(payload), "decode updated product")
    }

    pub fn soft_delete(&self, id: &ProductId) -> Result<()> {
        let url = self.endpoint(&["products", id.as_str()])?;
        self.send(self.http.delete(url)).map(drop)
    }

    pub fn hard_delete(&self, id: &ProductId) -> Result<()> {
        let url = self.endpoint(&["products", id.as_str(), "hard"])?;
        self.send(self.http.delete(url)).map(drop)
    }

    pub fn restore(&self, id: &ProductId) -> Result<()> {
        let url = self.endpoint(&["products", id.as_str(), "restore"])?;
        self.send(self.http.patch(url)).map(drop)
    }

    pub fn feature(&self, id: &ProductId) -> Result<()> {
        let url = self.endpoint(&["products", id.as_str(), "feature"])?;
        self.send(self.http.patch(url)).map(drop)
    }

    pub fn unfeature(&self, id: &ProductId) -> Result<()> {
        let url = self.endpoint(&["products", id.as_str(), "unfeature"])?;
        self.send(self.http.patch(url)).map(drop)
    }

    pub fn ratings(&self, id: &ProductId) -> Result<Vec<Rating>> {
        let url = self.endpoint(&["products", id.as_str(), "ratings"])?;
        self.send_json(self.http.get(url), "decode ratings")
    }

    pub fn categories(&self) -> Result<Vec<Category>> {
        let url = self.endpoint(&["categories"])?;
        self.send_json(self.http.get(url), "decode categories")
    }

    pub fn brands(&self) -> Result<Vec<Brand>> {
        let url = self.endpoint(&["brands"])?;
        self.send_json(self.http.get(url), "decode brands")
    }

    /// Joins path segments onto the base URL, escaping each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("base URL {} cannot carry a path", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let request = request.build().context("build request")?;
        debug!(method = %request.method(), url = %request.url(), "api request");
        let response = self
            .http
            .execute(request)
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        Ok(response)
    }

    fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let response = self.send(request)?;
        response.json().with_context(|| what.to_owned())
    }
}

impl ProductsService for Client {
    fn list_products(&mut self, query: &ProductQuery) -> Result<ProductPage> {
        self.fetch_products(query)
    }

    fn create_product(&mut self, payload: &ProductPayload) -> Result<Product> {
        self.create(payload)
    }

    fn update_product(&mut self, id: &ProductId, payload: &ProductPayload) -> Result<Product> {
        self.update(id, payload)
    }

    fn soft_delete_product(&mut self, id: &ProductId) -> Result<()> {
        self.soft_delete(id)
    }

    fn hard_delete_product(&mut self, id: &ProductId) -> Result<()> {
        self.hard_delete(id)
    }

    fn restore_product(&mut self, id: &ProductId) -> Result<()> {
        self.restore(id)
    }

    fn feature_product(&mut self, id: &ProductId) -> Result<()> {
        self.feature(id)
    }

    fn unfeature_product(&mut self, id: &ProductId) -> Result<()> {
        self.unfeature(id)
    }

    fn list_ratings(&mut self, id: &ProductId) -> Result<Vec<Rating>> {
        self.ratings(id)
    }

    fn list_categories(&mut self) -> Result<Vec<Category>> {
        self.categories()
    }

    fn list_brands(&mut self) -> Result<Vec<Brand>> {
        self.brands()
    }

    fn spawn_list_products(
        &mut self,
        ticket: FetchTicket,
        tx: Sender<FetchCompletion>,
    ) -> Result<()> {
        let client = self.clone();
        thread::Builder::new()
            .name("catalog-fetch".to_owned())
            .spawn(move || {
                let result = client.fetch_products(&ticket.query);
                let _ = tx.send(FetchCompletion { ticket, result });
            })
            .context("spawn product fetch worker")?;
        Ok(())
    }
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- start the API or fix [api].base_url ({})",
        base_url,
        error
    )
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    message: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorEnvelope {
    fn text(self) -> Option<String> {
        let message = match self.message {
            Some(serde_json::Value::String(text)) => Some(text),
            Some(serde_json::Value::Array(items)) => {
                let parts: Vec<String> = items
                    .into_iter()
                    .filter_map(|item| item.as_str().map(str::to_owned))
                    .collect();
                (!parts.is_empty()).then(|| parts.join("; "))
            }
            _ => None,
        };
        message
            .filter(|text| !text.is_empty())
            .or(self.error.filter(|text| !text.is_empty()))
    }
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(message) = parsed.text()
    {
        return anyhow!("server error ({}): {}", status.as_u16(), message);
    }

    let body = body.trim();
    if !body.is_empty() && body.len() < 100 && !body.contains('{') {
        return anyhow!("server error ({}): {}", status.as_u16(), body);
    }

    anyhow!("server returned {}", status.as_u16())
}
