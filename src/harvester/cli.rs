use std::time::Duration;

use clap::Args;
use url::Url;

use crate::error::HarvestError;

use super::oai::{
    DEFAULT_FROM, DEFAULT_METADATA_PREFIX, FromDate, HarvestParameters, OaiConfig, ResumeStyle,
    UntilDate, Verb,
};

#[derive(Debug, Args)]
pub struct HarvesterArgs {
    /// OAI provider base url
    pub endpoint: String,

    /// Lower bound datestamp (YYYY-MM-DD or YYYY-MM-DDThh:mm:ssZ), or `none` to omit it
    #[arg(short, long, default_value = DEFAULT_FROM)]
    pub from: FromDate,

    /// Upper bound datestamp, `today` for the current UTC date, or `none` to omit it
    #[arg(short, long, default_value = "today")]
    pub until: UntilDate,

    /// OAI metadata prefix
    #[arg(short, long, default_value = DEFAULT_METADATA_PREFIX, env = "METADATA_PREFIX")]
    pub metadata_prefix: String,

    /// OAI set name
    #[arg(short, long, env = "OAI_SET")]
    pub set: Option<String>,

    /// OAI verb
    #[arg(long, value_enum, default_value_t = Verb::ListRecords)]
    pub verb: Verb,

    /// Send only the resumption token on continuation requests
    #[arg(long, default_value_t = false)]
    pub omit_verb_on_resume: bool,

    /// Request timeout in seconds
    #[arg(long, env = "OAI_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Log each request url at info level, even when RUST_LOG is stricter
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl HarvesterArgs {
    /// Resolve the arguments into a harvest configuration.
    ///
    /// `until` is fixed here, so a long harvest keeps the window it started with.
    pub fn into_config(self) -> Result<OaiConfig, HarvestError> {
        let endpoint = Url::parse(&self.endpoint).map_err(|source| HarvestError::InvalidUrl {
            url: self.endpoint.clone(),
            source,
        })?;

        let parameters = HarvestParameters {
            from: self.from.resolve(),
            until: self.until.resolve(),
            metadata_prefix: Some(self.metadata_prefix),
            set: self.set,
        };

        let resume_style = if self.omit_verb_on_resume {
            ResumeStyle::TokenOnly
        } else {
            ResumeStyle::WithVerb
        };

        Ok(OaiConfig {
            endpoint,
            verb: self.verb,
            parameters,
            resume_style,
            timeout: self.timeout.map(Duration::from_secs),
            verbose: self.verbose,
        })
    }
}
