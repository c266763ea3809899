// Remote venue adapter
// This file implements a venue reached over JSON/HTTP. Quotes are retried with
// backoff and degrade to an empty quote; execution errors always propagate.
//
// Numan Thabit 2025 Nov

use crate::errors::{TransportError, VenueError};
use crate::ledger::Settlement;
use crate::transport::JsonHttp;
use crate::venues::adapter::{ExecuteRequest, Hint, VenueAdapter, VenueId, VenueQuote};
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

#[derive(Serialize)]
struct QuoteBody<'a> {
    token_in: Address,
    token_out: Address,
    amount_in: U256,
    hint: &'a Hint,
}

#[derive(Deserialize)]
struct ExecuteReply {
    amount_out: U256,
}

pub struct HttpVenue {
    id: VenueId,
    client: JsonHttp,
    default_gas: u64,
    quote_budget: Duration,
}

impl HttpVenue {
    pub fn new(
        id: VenueId,
        endpoint: Url,
        default_gas: u64,
        quote_budget: Duration,
    ) -> anyhow::Result<Self> {
        // execute gets a longer deadline than quoting
        let client = JsonHttp::new(endpoint, "venue", quote_budget.max(Duration::from_secs(10)))?;
        Ok(Self {
            id,
            client,
            default_gas,
            quote_budget,
        })
    }

    async fn fetch_quote(&self, body: &QuoteBody<'_>) -> Result<VenueQuote, TransportError> {
        let backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(50),
            max_interval: Duration::from_millis(500),
            max_elapsed_time: Some(self.quote_budget),
            multiplier: 2.0,
            ..Default::default()
        };

        let client = &self.client;
        retry(backoff, move || async move {
            client
                .post::<_, VenueQuote>("quote", body)
                .await
                .map_err(|err| {
                    // 4xx will not get better by asking again
                    if matches!(err, TransportError::Status(code) if (400..500).contains(&code)) {
                        backoff::Error::permanent(err)
                    } else {
                        backoff::Error::transient(err)
                    }
                })
        })
        .await
    }
}

#[async_trait]
impl VenueAdapter for HttpVenue {
    async fn quote(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        hint: &Hint,
    ) -> VenueQuote {
        let body = QuoteBody {
            token_in,
            token_out,
            amount_in,
            hint,
        };
        match self.fetch_quote(&body).await {
            Ok(quote) => {
                debug!(venue = %self.id, amount_out = %quote.amount_out, "remote quote");
                quote
            }
            Err(err) => {
                warn!(venue = %self.id, error = %err, "remote quote failed");
                VenueQuote::unavailable(self.default_gas)
            }
        }
    }

    async fn execute(
        &self,
        settlement: &mut Settlement<'_>,
        req: &ExecuteRequest,
    ) -> Result<U256, VenueError> {
        settlement.pull_input(req.amount_in)?;
        let reply: ExecuteReply = self.client.post("execute", req).await?;
        if reply.amount_out < req.min_amount_out {
            return Err(VenueError::BelowMinimum {
                delivered: reply.amount_out,
                minimum: req.min_amount_out,
            });
        }
        settlement.deliver_output(reply.amount_out)?;
        Ok(reply.amount_out)
    }
}
