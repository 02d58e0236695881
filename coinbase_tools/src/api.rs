use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::{
    config::CoinbaseConfig,
    data_objects::{Charge, NewCharge},
    CoinbaseApiError,
};

#[derive(Clone)]
pub struct CoinbaseApi {
    config: CoinbaseConfig,
    client: Arc<Client>,
}

#[derive(Deserialize)]
struct DataResponse<T> {
    data: T,
}

impl CoinbaseApi {
    /// Builds a client for the configured account. Fails with [`CoinbaseApiError::NotConfigured`] if no API key is set.
    pub fn new(config: CoinbaseConfig) -> Result<Self, CoinbaseApiError> {
        if !config.is_configured() {
            return Err(CoinbaseApiError::NotConfigured);
        }
        let mut headers = HeaderMap::with_capacity(3);
        let val = HeaderValue::from_str(config.api_key.reveal().as_str())
            .map_err(|e| CoinbaseApiError::Initialization(e.to_string()))?;
        headers.insert("X-CC-Api-Key", val);
        let version = HeaderValue::from_str(config.api_version.as_str())
            .map_err(|e| CoinbaseApiError::Initialization(e.to_string()))?;
        headers.insert("X-CC-Version", version);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| CoinbaseApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &CoinbaseConfig {
        &self.config
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<B>,
    ) -> Result<T, CoinbaseApiError> {
        let url = self.url(path);
        trace!("Sending REST query: {method} {url}");
        let mut req = self.client.request(method, url);
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                CoinbaseApiError::Timeout(e.to_string())
            } else {
                CoinbaseApiError::Transport(e.to_string())
            }
        })?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| CoinbaseApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| CoinbaseApiError::Transport(e.to_string()))?;
            Err(CoinbaseApiError::QueryError { status, message })
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url.trim_end_matches('/'))
    }

    pub async fn create_charge(&self, charge: &NewCharge) -> Result<Charge, CoinbaseApiError> {
        debug!("Creating charge '{}' for {} {}", charge.name, charge.local_price.amount, charge.local_price.currency);
        let result = self.rest_query::<DataResponse<Charge>, _>(Method::POST, "/charges", &[], Some(charge)).await?;
        info!("Created charge {} ({})", result.data.id, result.data.code);
        Ok(result.data)
    }

    pub async fn get_charge(&self, charge_id: &str) -> Result<Charge, CoinbaseApiError> {
        let path = format!("/charges/{charge_id}");
        debug!("Fetching charge {charge_id}");
        let result = self.rest_query::<DataResponse<Charge>, ()>(Method::GET, &path, &[], None).await?;
        Ok(result.data)
    }

    /// Lists charges on the account. Charges are returned verbatim, as Coinbase sends them.
    pub async fn list_charges(&self) -> Result<Vec<Value>, CoinbaseApiError> {
        debug!("Listing charges");
        let result = self.rest_query::<DataResponse<Vec<Value>>, ()>(Method::GET, "/charges", &[], None).await?;
        debug!("Fetched {} charges", result.data.len());
        Ok(result.data)
    }
}
