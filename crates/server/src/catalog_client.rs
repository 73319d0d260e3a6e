use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, error};

use xsell_core::config::CatalogConfig;
use xsell_core::cross_sell::ports::{ProductCatalog, ProductPage};
use xsell_core::domain::product::Product;
use xsell_core::errors::ApplicationError;

/// Reads the product pool from the store's product API.
pub struct HttpProductCatalog {
    client: Client,
    base_url: String,
    api_token: Option<SecretString>,
}

/// The product API either wraps a page with its total or returns a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProductPageBody {
    Paged {
        products: Vec<Product>,
        #[serde(default)]
        total: Option<usize>,
    },
    Bare(Vec<Product>),
}

impl From<ProductPageBody> for ProductPage {
    fn from(body: ProductPageBody) -> Self {
        match body {
            ProductPageBody::Paged { products, total } => ProductPage { products, total },
            ProductPageBody::Bare(products) => ProductPage { products, total: None },
        }
    }
}

impl HttpProductCatalog {
    pub fn from_config(config: &CatalogConfig) -> Result<Self, ApplicationError> {
        let base_url = config
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                ApplicationError::Configuration(
                    "catalog.base_url is required for the http product catalog".to_owned(),
                )
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|error| {
                ApplicationError::Configuration(format!("could not build catalog client: {error}"))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_token: config.api_token.clone(),
        })
    }
}

#[async_trait]
impl ProductCatalog for HttpProductCatalog {
    async fn list_page(&self, offset: usize, limit: usize) -> Result<ProductPage, ApplicationError> {
        let url = format!("{}/products?offset={offset}&limit={limit}", self.base_url);
        debug!(event_name = "catalog.http.request", url = %url, "requesting product page");

        let mut request = self.client.get(&url);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await.map_err(|error| {
            error!(event_name = "catalog.http.unreachable", error = %error, "product API request failed");
            ApplicationError::Integration(format!("product API request failed: {error}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApplicationError::Integration(format!("product API returned {status}")));
        }

        let body: ProductPageBody = response.json().await.map_err(|error| {
            ApplicationError::Integration(format!("failed to decode product page: {error}"))
        })?;

        Ok(body.into())
    }
}
