#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use pmharvest::{
    HarvestError, HarvestParameters, HarvestSummary, Harvester, OaiConfig, PageSink, ResumeStyle,
    Verb,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};
use url::Url;

pub const METADATA_PREFIX: &str = "oai_dc";
pub const FROM: &str = "2020-01-01";
pub const UNTIL: &str = "2020-01-02";

/// What the mock provider answers for one resumption token.
#[derive(Clone)]
pub enum PageSpec {
    Records {
        identifiers: Vec<String>,
        token: Option<String>,
    },
    Error {
        code: String,
        message: String,
    },
    Raw(String),
    Status(u16),
}

#[derive(Clone, Default)]
pub struct MockOaiConfig {
    /// Keyed by the `resumptionToken` query value; the initial request uses "".
    pub pages: HashMap<String, PageSpec>,
}

impl MockOaiConfig {
    pub fn page(mut self, token: &str, spec: PageSpec) -> Self {
        self.pages.insert(token.to_string(), spec);
        self
    }
}

pub struct MockOaiServer {
    pub endpoint: String,
    requests: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl MockOaiServer {
    /// Request targets received so far, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Decoded query pairs of the `index`th request.
    pub fn request_params(&self, index: usize) -> Vec<(String, String)> {
        parse_query_params(&self.requests()[index])
    }

    /// Query keys of the `index`th request, sorted.
    pub fn request_keys(&self, index: usize) -> Vec<String> {
        let mut keys: Vec<_> = self
            .request_params(index)
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        keys.sort();
        keys
    }
}

impl Drop for MockOaiServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn records(identifiers: &[&str], token: Option<&str>) -> PageSpec {
    PageSpec::Records {
        identifiers: identifiers.iter().map(ToString::to_string).collect(),
        token: token.map(ToString::to_string),
    }
}

pub fn oai_error(code: &str, message: &str) -> PageSpec {
    PageSpec::Error {
        code: code.to_string(),
        message: message.to_string(),
    }
}

pub fn test_config(endpoint: &str, resume_style: ResumeStyle) -> OaiConfig {
    OaiConfig {
        endpoint: Url::parse(endpoint).unwrap(),
        verb: Verb::ListRecords,
        parameters: HarvestParameters {
            from: Some(FROM.to_string()),
            until: Some(UNTIL.to_string()),
            metadata_prefix: Some(METADATA_PREFIX.to_string()),
            set: None,
        },
        resume_style,
        timeout: Some(std::time::Duration::from_secs(10)),
        verbose: true,
    }
}

pub async fn run_harvest<S: PageSink>(
    config: OaiConfig,
    sink: &mut S,
) -> Result<HarvestSummary, HarvestError> {
    let harvester = Harvester::new(config, Arc::new(AtomicBool::new(false)))?;
    harvester.run(sink).await
}

pub async fn run_interrupted_harvest<S: PageSink>(
    config: OaiConfig,
    sink: &mut S,
) -> Result<HarvestSummary, HarvestError> {
    let shutdown = Arc::new(AtomicBool::new(false));
    shutdown.store(true, Ordering::Relaxed);
    let harvester = Harvester::new(config, shutdown)?;
    harvester.run(sink).await
}

pub async fn start_mock_oai_server(config: MockOaiConfig) -> anyhow::Result<MockOaiServer> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?;
    let endpoint = format!("http://{}/oai", address);
    let endpoint_for_task = endpoint.clone();
    let shared_config = Arc::new(config);
    let requests = Arc::new(Mutex::new(Vec::new()));
    let requests_for_task = requests.clone();

    let handle = tokio::spawn(async move {
        loop {
            let (mut socket, _) = match listener.accept().await {
                Ok(value) => value,
                Err(_) => break,
            };
            let endpoint = endpoint_for_task.clone();
            let config = shared_config.clone();
            let requests = requests_for_task.clone();
            tokio::spawn(async move {
                if let Err(error) =
                    handle_connection(&mut socket, &endpoint, &config, &requests).await
                {
                    eprintln!("mock OAI server request handling failed: {}", error);
                }
            });
        }
    });

    Ok(MockOaiServer {
        endpoint,
        requests,
        handle,
    })
}

/// An endpoint nothing is listening on.
pub async fn closed_endpoint() -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{}/oai", address))
}

async fn handle_connection(
    socket: &mut TcpStream,
    endpoint: &str,
    config: &MockOaiConfig,
    requests: &Mutex<Vec<String>>,
) -> anyhow::Result<()> {
    let mut buf = vec![0u8; 8192];
    let mut total = 0usize;

    loop {
        let bytes_read = socket.read(&mut buf[total..]).await?;
        if bytes_read == 0 {
            return Ok(());
        }
        total += bytes_read;
        if buf[..total].windows(4).any(|window| window == b"\r\n\r\n") {
            break;
        }
        if total == buf.len() {
            break;
        }
    }

    let request = String::from_utf8_lossy(&buf[..total]);
    let request_line = request.lines().next().unwrap_or_default();
    let target = request_line.split_whitespace().nth(1).unwrap_or("/");
    requests.lock().unwrap().push(target.to_string());

    let params: HashMap<_, _> = parse_query_params(target).into_iter().collect();
    let token = params
        .get("resumptionToken")
        .map(String::as_str)
        .unwrap_or("");
    let (status, body) = match config.pages.get(token) {
        Some(spec) => build_page(endpoint, &params, spec),
        None => (
            200,
            error_response(endpoint, &params, "badResumptionToken", "Unknown token"),
        ),
    };
    let status_text = if status == 200 { "OK" } else { "ERROR" };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/xml; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );

    socket.write_all(response.as_bytes()).await?;
    Ok(())
}

fn parse_query_params(target: &str) -> Vec<(String, String)> {
    let url = Url::parse(&format!("http://mock{target}")).unwrap();
    url.query_pairs()
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

fn build_page(endpoint: &str, params: &HashMap<String, String>, spec: &PageSpec) -> (u16, String) {
    match spec {
        PageSpec::Records { identifiers, token } => {
            (200, list_records_response(endpoint, identifiers, token.as_deref()))
        }
        PageSpec::Error { code, message } => (200, error_response(endpoint, params, code, message)),
        PageSpec::Raw(body) => (200, body.clone()),
        PageSpec::Status(status) => (*status, "unavailable".to_string()),
    }
}

fn list_records_response(endpoint: &str, identifiers: &[String], token: Option<&str>) -> String {
    let records = identifiers
        .iter()
        .map(|identifier| {
            format!(
                "<record><header><identifier>{identifier}</identifier><datestamp>2020-01-01</datestamp></header><metadata><oai_dc:dc xmlns:oai_dc=\"http://www.openarchives.org/OAI/2.0/oai_dc/\" xmlns:dc=\"http://purl.org/dc/elements/1.1/\"><dc:title>Title of {identifier}</dc:title></oai_dc:dc></metadata></record>"
            )
        })
        .collect::<Vec<_>>()
        .join("");
    let token_xml = match token {
        Some(token) => format!("<resumptionToken cursor=\"0\">{token}</resumptionToken>"),
        None => "<resumptionToken/>".to_string(),
    };

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/">
  <responseDate>2026-02-07T00:00:00Z</responseDate>
  <request verb="ListRecords">{endpoint}</request>
  <ListRecords>{records}{token_xml}</ListRecords>
</OAI-PMH>"#
    )
}

fn error_response(
    endpoint: &str,
    params: &HashMap<String, String>,
    code: &str,
    message: &str,
) -> String {
    let verb = params.get("verb").map(String::as_str).unwrap_or("Unknown");
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/">
  <responseDate>2026-02-07T00:00:00Z</responseDate>
  <request verb="{verb}">{endpoint}</request>
  <error code="{code}">{message}</error>
</OAI-PMH>"#
    )
}
