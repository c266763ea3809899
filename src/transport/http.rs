// JSON-over-HTTP transport
// This file implements the HTTP client remote venues and the price oracle are
// reached through, with per-call latency and error metrics
//
// Numan Thabit 2025 Nov

use crate::errors::TransportError;
use crate::metrics::{REQ_ERRORS, REQ_LATENCY};
use anyhow::Context;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct JsonHttp {
    http: Client,
    base: Url,
    service: &'static str,
}

impl JsonHttp {
    pub fn new(base: Url, service: &'static str, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            http,
            base,
            service,
        })
    }

    fn url(&self, path: &str) -> Result<Url, TransportError> {
        self.base
            .join(path)
            .map_err(|e| TransportError::Send(format!("bad path {path}: {e}")))
    }

    pub async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, TransportError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = self.url(path)?;
        let request = self.http.post(url).json(body);
        self.send(path, request).await
    }

    pub async fn get<Resp>(&self, path: &str, query: &[(&str, String)]) -> Result<Resp, TransportError>
    where
        Resp: DeserializeOwned,
    {
        let url = self.url(path)?;
        let request = self.http.get(url).query(query);
        self.send(path, request).await
    }

    async fn send<Resp>(
        &self,
        method: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<Resp, TransportError>
    where
        Resp: DeserializeOwned,
    {
        let _timer = REQ_LATENCY
            .with_label_values(&[self.service, method])
            .start_timer();

        let result = async {
            let resp = request
                .send()
                .await
                .map_err(|e| TransportError::Send(e.to_string()))?;
            if !resp.status().is_success() {
                return Err(TransportError::Status(resp.status().as_u16()));
            }
            resp.json::<Resp>()
                .await
                .map_err(|e| TransportError::Decode(e.to_string()))
        }
        .await;

        if result.is_err() {
            REQ_ERRORS.with_label_values(&[self.service, method]).inc();
        }
        result
    }
}
