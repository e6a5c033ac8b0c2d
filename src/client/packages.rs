//! Package list and detail operations.

use crate::client::core::{BookingClient, RequestOptions};
use crate::telemetry::Metadata;
use crate::types::{Package, PackageFilter};
use crate::{AppError, Error, Result};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct ListEnvelope {
    #[serde(default)]
    result: Option<ListResult>,
}

#[derive(Debug, Deserialize)]
struct ListResult {
    #[serde(default)]
    docs: Option<Vec<Package>>,
}

impl BookingClient {
    /// Fetch every package, optionally narrowed by a free-text `search`.
    ///
    /// Pages are requested `page_size` at a time until a page comes back short
    /// (including empty). No total count is consulted.
    pub async fn get_packages(&self, search: Option<&str>) -> Result<Vec<Package>> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        let mut context = self.operation_context("get_packages");
        if let Some(term) = search {
            context = context.with_detail("search", term);
        }
        self.fetch_all(search, &context)
            .await
            .map_err(|e| self.surface(e, &context))
    }

    async fn fetch_all(
        &self,
        search: Option<&str>,
        context: &crate::ErrorContext,
    ) -> Result<Vec<Package>> {
        let label = format!(
            "booking_api.get_packages:{}",
            context.correlation_id.as_deref().unwrap_or("-")
        );
        self.logger.time(label.as_str());
        let result = self.fetch_pages(search, context).await;
        let elapsed = self.logger.time_end(&label);

        let (packages, pages) = result?;
        self.logger.info(
            format!("fetched {} packages", packages.len()),
            &Metadata::new()
                .with("pages", pages)
                .with("count", packages.len() as u64)
                .with(
                    "elapsed_ms",
                    elapsed.map(|d| d.as_millis() as u64).unwrap_or_default(),
                ),
        );
        Ok(packages)
    }

    async fn fetch_pages(
        &self,
        search: Option<&str>,
        context: &crate::ErrorContext,
    ) -> Result<(Vec<Package>, u32)> {
        let page_size = self.config.page_size.max(1);
        let mut packages = Vec::new();
        let mut offset = 0usize;
        let mut pages = 0u32;
        loop {
            let mut options = RequestOptions::get()
                .with_query("limit", page_size)
                .with_query("offset", offset);
            if let Some(term) = search {
                options = options.with_query("search", term);
            }

            let page_context = context.clone().with_detail("offset", offset);
            let payload = self
                .send_authenticated(&self.config.packages_path, &options, &page_context)
                .await?;
            let page = parse_page(payload)?;
            pages += 1;

            let received = page.len();
            packages.extend(page);
            self.logger.debug(
                "fetched package page",
                &Metadata::new()
                    .with("offset", offset as u64)
                    .with("received", received as u64),
            );

            if received < page_size {
                break;
            }
            offset += page_size;
        }
        Ok((packages, pages))
    }

    /// Fetch one package. `Ok(None)` when the API has no such package.
    pub async fn get_package_by_id(&self, id: &str) -> Result<Option<Package>> {
        let context = self
            .operation_context("get_package_by_id")
            .with_detail("package_id", id);
        let id = id.trim();
        if id.is_empty() {
            return Err(self.surface(
                AppError::validation("package id must not be empty", "id")
                    .with_context(context.clone())
                    .into(),
                &context,
            ));
        }

        let path = self
            .detail_url(id)
            .map_err(|e| self.surface(e, &context))?;

        match self
            .send_authenticated(&path, &RequestOptions::get(), &context)
            .await
        {
            Ok(payload) => parse_single(payload).map_err(|e| self.surface(e, &context)),
            Err(e) if e.http_status() == Some(404) && e.as_app().is_none() => {
                self.logger.debug(
                    "package not found",
                    &Metadata::new().with("package_id", id),
                );
                Ok(None)
            }
            Err(e) => Err(self.surface(e, &context)),
        }
    }

    /// Absolute detail URL with `id` escaped as a single path segment.
    fn detail_url(&self, id: &str) -> Result<String> {
        let list = self.transport.resolve(&self.config.packages_path);
        let mut url = url::Url::parse(&list).map_err(|e| {
            AppError::configuration(format!("invalid packages URL: {}", e)).with_detail("url", &list)
        })?;
        url.path_segments_mut()
            .map_err(|_| AppError::configuration("packages URL cannot take path segments"))?
            .pop_if_empty()
            .push(id);
        Ok(url.into())
    }

    /// Fetch packages using the filter's destination as the search term and
    /// keep those matching every criterion.
    pub async fn search_packages(&self, filter: &PackageFilter) -> Result<Vec<Package>> {
        if filter.days == Some(0) {
            let context = self.operation_context("search_packages");
            return Err(self.surface(
                AppError::validation("trip length must be at least one day", "days")
                    .with_context(context.clone())
                    .into(),
                &context,
            ));
        }
        if filter.max_price.map_or(false, |p| !p.is_finite() || p < 0.0) {
            let context = self.operation_context("search_packages");
            return Err(self.surface(
                AppError::validation("maximum price must be a non-negative number", "max_price")
                    .with_context(context.clone())
                    .into(),
                &context,
            ));
        }

        let packages = self.get_packages(filter.search_term()).await?;
        Ok(filter.apply(packages))
    }
}

fn parse_page(payload: Value) -> Result<Vec<Package>> {
    if payload.is_null() {
        return Ok(Vec::new());
    }
    let envelope: ListEnvelope = serde_json::from_value(payload)?;
    Ok(envelope
        .result
        .and_then(|r| r.docs)
        .unwrap_or_default())
}

fn parse_single(payload: Value) -> Result<Option<Package>> {
    let result = match payload {
        Value::Object(mut map) => map.remove("result").unwrap_or(Value::Null),
        Value::Null => Value::Null,
        other => {
            return Err(Error::Serialization(serde::de::Error::custom(format!(
                "unexpected package payload: {}",
                other
            ))))
        }
    };
    match result {
        Value::Null => Ok(None),
        Value::Object(ref map) if map.is_empty() => Ok(None),
        value => Ok(Some(serde_json::from_value(value)?)),
    }
}
