mod error;
mod harvester;

pub use error::{ErrorKind, HarvestError, Result};
pub use harvester::{
    DEFAULT_FROM, DEFAULT_METADATA_PREFIX, FromDate, HarvestParameters, HarvestRequest,
    HarvestState, HarvestSummary, Harvester, HarvesterArgs, OaiConfig, OaiError, OaiResponse,
    PageSink, RequestBuilder, ResumeStyle, UntilDate, Verb, WriterSink, extract_resumption_token,
    parse_datestamp, parse_response,
};
