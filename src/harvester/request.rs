use url::Url;

use super::oai::{HarvestParameters, ResumeStyle, Verb};

/// One request of a harvest: the first one carries the selective harvesting
/// parameters, every later one carries only the provider's token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestRequest<'a> {
    Initial(&'a HarvestParameters),
    Continuation(&'a str),
}

#[derive(Debug, Clone)]
pub struct RequestBuilder {
    base_url: Url,
    verb: Verb,
    resume_style: ResumeStyle,
}

impl RequestBuilder {
    pub fn new(base_url: Url, verb: Verb, resume_style: ResumeStyle) -> Self {
        Self {
            base_url,
            verb,
            resume_style,
        }
    }

    /// Build the query URL for `request`.
    ///
    /// OAI arguments are appended sorted by key after any query the base URL
    /// already carries. Empty parameters are never sent.
    pub fn build(&self, request: HarvestRequest<'_>) -> Url {
        let mut pairs: Vec<(&str, &str)> = match request {
            HarvestRequest::Initial(params) => {
                let mut pairs: Vec<_> = params.pairs().collect();
                pairs.push(("verb", self.verb.as_str()));
                pairs
            }
            HarvestRequest::Continuation(token) => {
                let mut pairs = vec![("resumptionToken", token)];
                if self.resume_style == ResumeStyle::WithVerb {
                    pairs.push(("verb", self.verb.as_str()));
                }
                pairs
            }
        };
        pairs.sort_by_key(|(key, _)| *key);

        let mut url = self.base_url.clone();
        url.query_pairs_mut().extend_pairs(pairs);
        url
    }
}
