mod cli;
mod oai;
mod request;
mod response;
mod sink;
mod token;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::TryStreamExt;
use reqwest::Client;
use tokio_util::io::StreamReader;
use tracing::{debug, info};
use url::Url;

pub use cli::HarvesterArgs;
pub use oai::{
    DEFAULT_FROM, DEFAULT_METADATA_PREFIX, FromDate, HarvestParameters, OaiConfig, ResumeStyle,
    UntilDate, Verb, parse_datestamp,
};
pub use request::{HarvestRequest, RequestBuilder};
pub use response::{OaiError, OaiResponse, parse_response};
pub use sink::{PageSink, WriterSink};
pub use token::extract_resumption_token;

use crate::error::{HarvestError, Result};

const USER_AGENT: &str = concat!("pmharvest/", env!("CARGO_PKG_VERSION"));

/// Position of the harvest between requests.
///
/// A failed harvest has no state: the loop returns the error instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestState {
    Init,
    Continuing(String),
    Done,
}

impl HarvestState {
    /// The next request to issue, or `None` once the harvest is done.
    pub fn request<'a>(&'a self, params: &'a HarvestParameters) -> Option<HarvestRequest<'a>> {
        match self {
            HarvestState::Init => Some(HarvestRequest::Initial(params)),
            HarvestState::Continuing(token) => Some(HarvestRequest::Continuation(token)),
            HarvestState::Done => None,
        }
    }

    /// Transition after a page was emitted.
    pub fn advance(self, token: Option<String>) -> HarvestState {
        match (self, token) {
            (HarvestState::Done, _) | (_, None) => HarvestState::Done,
            (_, Some(token)) => HarvestState::Continuing(token),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarvestSummary {
    pub pages: usize,
}

pub struct Harvester {
    config: OaiConfig,
    client: Client,
    requests: RequestBuilder,
    shutdown: Arc<AtomicBool>,
}

impl Harvester {
    pub fn new(config: OaiConfig, shutdown: Arc<AtomicBool>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        let requests =
            RequestBuilder::new(config.endpoint.clone(), config.verb, config.resume_style);

        Ok(Self {
            config,
            client,
            requests,
            shutdown,
        })
    }

    /// Request pages until the provider stops returning a resumption token,
    /// handing each payload to `sink` as it arrives.
    pub async fn run<S: PageSink>(&self, sink: &mut S) -> Result<HarvestSummary> {
        info!(
            endpoint = %self.config.endpoint,
            verb = %self.config.verb,
            "Starting harvest"
        );

        let mut state = HarvestState::Init;
        let mut pages = 0usize;

        while let Some(request) = state.request(&self.config.parameters) {
            if self.shutdown.load(Ordering::Relaxed) {
                info!(pages, "Shutdown requested, stopping harvest");
                return Err(HarvestError::Interrupted { pages });
            }

            let url = self.requests.build(request);
            let payload = self.fetch_page(url).await?.into_payload()?;
            sink.emit(&payload)?;
            pages += 1;

            let token = extract_resumption_token(&payload)?;
            debug!(
                page = pages,
                bytes = payload.len(),
                resumption_token = token.as_deref().unwrap_or(""),
                "Emitted page"
            );
            state = state.advance(token);
        }

        info!("Harvested {} page(s)", pages);
        Ok(HarvestSummary { pages })
    }

    async fn fetch_page(&self, url: Url) -> Result<OaiResponse> {
        if self.config.verbose {
            info!("{}", url);
        } else {
            debug!(%url, "Requesting");
        }

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Status {
                status,
                url: url.to_string(),
            });
        }

        let body = response.bytes_stream().map_err(std::io::Error::other);
        parse_response(StreamReader::new(Box::pin(body))).await
    }
}
