use std::time::Duration;

use reqwest::Client;
use url::Url;
use wikiroster_core::error::AppError;
use wikiroster_core::models::Section;
use wikiroster_core::traits::WikiFetcher;

/// Configuration for the MediaWiki client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Full `api.php` endpoint URL.
    pub base_url: String,
    /// Identifying User-Agent. The wiki's API terms require one that
    /// names the tool; anonymous agents get blocked.
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://liquipedia.net/rocketleague/api.php".to_string(),
            user_agent: concat!("wikiroster/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Wiki content fetcher over the MediaWiki action API.
///
/// Speaks `action=parse` only: section listings
/// (`prop=sections`) and per-section wikitext (`prop=wikitext`).
/// Responses that lack the expected structure fail with a page-scoped
/// error so one odd page cannot take down a whole batch.
#[derive(Debug, Clone)]
pub struct MediaWikiClient {
    client: Client,
    base_url: Url,
    timeout_secs: u64,
}

impl MediaWikiClient {
    pub fn new() -> Result<Self, AppError> {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Result<Self, AppError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| AppError::ConfigError(format!("invalid API base URL: {e}")))?;
        let timeout_secs = config.timeout.as_secs();
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            timeout_secs,
        })
    }

    /// GET request builder carrying the fixed `action=parse` parameter
    /// set plus `params`.
    fn request(&self, params: &[(&str, &str)]) -> reqwest::RequestBuilder {
        self.client
            .get(self.base_url.clone())
            .query(&[("action", "parse"), ("format", "json"), ("origin", "*")])
            .query(params)
    }

    /// One `action=parse` request. `page` is only used for error
    /// attribution.
    async fn call(&self, page: &str, params: &[(&str, &str)]) -> Result<ParseResponse, AppError> {
        let response = self.request(params).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                AppError::NetworkError(format!("Connection failed: {e}"))
            } else {
                AppError::HttpError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {}",
                status.as_u16(),
                page
            )));
        }

        response
            .json::<ParseResponse>()
            .await
            .map_err(|e| AppError::ApiFormat {
                page: page.to_string(),
                message: format!("undecodable response: {e}"),
            })
    }
}

impl WikiFetcher for MediaWikiClient {
    async fn fetch_sections(&self, page: &str) -> Result<Vec<Section>, AppError> {
        tracing::debug!(%page, "Listing sections");
        let response = self
            .call(page, &[("prop", "sections"), ("page", page)])
            .await?;
        let payload = response.into_parse(page)?;
        let sections = payload.sections.ok_or_else(|| AppError::ApiFormat {
            page: page.to_string(),
            message: "response carried no section listing".to_string(),
        })?;
        Ok(collect_sections(sections))
    }

    async fn fetch_section_text(&self, page: &str, section: i64) -> Result<String, AppError> {
        tracing::debug!(%page, %section, "Fetching section wikitext");
        let section_param = section.to_string();
        let response = self
            .call(
                page,
                &[
                    ("prop", "wikitext"),
                    ("page", page),
                    ("section", &section_param),
                ],
            )
            .await?;
        let payload = response.into_parse(page)?;
        payload
            .wikitext
            .map(|w| w.content)
            .ok_or_else(|| AppError::ApiFormat {
                page: page.to_string(),
                message: "response carried no wikitext".to_string(),
            })
    }
}

/// Normalize raw listing entries, dropping the ones whose index is
/// not numeric (transcluded sections report indexes like `T-1` and
/// cannot be fetched by position).
fn collect_sections(raw: Vec<RawSection>) -> Vec<Section> {
    raw.into_iter()
        .filter_map(|s| match s.index.parse::<i64>() {
            Ok(index) => Some(Section {
                index,
                title: s.line,
                anchor: s.anchor,
            }),
            Err(_) => {
                tracing::debug!(
                    index = %s.index,
                    title = %s.line,
                    "Skipping section with non-numeric index"
                );
                None
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, serde::Deserialize)]
struct ParseResponse {
    parse: Option<ParsePayload>,
    error: Option<ApiErrorPayload>,
}

impl ParseResponse {
    fn into_parse(self, page: &str) -> Result<ParsePayload, AppError> {
        self.parse.ok_or_else(|| {
            let message = match self.error {
                Some(err) => format!("API error {}: {}", err.code, err.info),
                None => "response carried no parse object".to_string(),
            };
            AppError::ApiFormat {
                page: page.to_string(),
                message,
            }
        })
    }
}

#[derive(Debug, serde::Deserialize)]
struct ParsePayload {
    sections: Option<Vec<RawSection>>,
    wikitext: Option<WikitextPayload>,
}

/// One entry of the listing. The API reports `index` as a string and
/// the heading text under `line`.
#[derive(Debug, serde::Deserialize)]
struct RawSection {
    index: String,
    line: String,
    anchor: String,
}

#[derive(Debug, serde::Deserialize)]
struct WikitextPayload {
    #[serde(rename = "*")]
    content: String,
}

#[derive(Debug, serde::Deserialize)]
struct ApiErrorPayload {
    code: String,
    info: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_section_listing() {
        let raw = r#"{
            "parse": {
                "title": "Some Page",
                "sections": [
                    {"toclevel": 1, "level": "2", "line": "Overview", "number": "1",
                     "index": "1", "fromtitle": "Some_Page", "byteoffset": 10, "anchor": "Overview"},
                    {"toclevel": 1, "level": "2", "line": "Participants", "number": "2",
                     "index": "4", "fromtitle": "Some_Page", "byteoffset": 90, "anchor": "Participants"}
                ]
            }
        }"#;
        let response: ParseResponse = serde_json::from_str(raw).unwrap();
        let sections = collect_sections(response.into_parse("Some Page").unwrap().sections.unwrap());

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].index, 1);
        assert_eq!(sections[1].title, "Participants");
        assert_eq!(sections[1].anchor, "Participants");
    }

    #[test]
    fn test_transcluded_sections_are_dropped() {
        let raw = vec![
            RawSection {
                index: "T-1".into(),
                line: "Transcluded".into(),
                anchor: "Transcluded".into(),
            },
            RawSection {
                index: "2".into(),
                line: "Real".into(),
                anchor: "Real".into(),
            },
        ];
        let sections = collect_sections(raw);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].index, 2);
    }

    #[test]
    fn test_decode_wikitext_star_key() {
        let raw = r#"{"parse": {"title": "P", "wikitext": {"*": "|team=NRG\n|p1=GarrettG"}}}"#;
        let response: ParseResponse = serde_json::from_str(raw).unwrap();
        let payload = response.into_parse("P").unwrap();
        assert_eq!(payload.wikitext.unwrap().content, "|team=NRG\n|p1=GarrettG");
    }

    #[test]
    fn test_api_error_becomes_page_scoped_format_error() {
        let raw = r#"{"error": {"code": "missingtitle", "info": "The page you specified doesn't exist.", "*": "docs"}}"#;
        let response: ParseResponse = serde_json::from_str(raw).unwrap();
        let err = response.into_parse("Ghost Page").unwrap_err();

        match err {
            AppError::ApiFormat { page, message } => {
                assert_eq!(page, "Ghost Page");
                assert!(message.contains("missingtitle"));
            }
            other => panic!("expected ApiFormat, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_parse_without_error_payload() {
        let response: ParseResponse = serde_json::from_str("{}").unwrap();
        let err = response.into_parse("P").unwrap_err();
        assert!(matches!(err, AppError::ApiFormat { .. }));
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let config = ClientConfig {
            base_url: "not a url".into(),
            ..ClientConfig::default()
        };
        let err = MediaWikiClient::with_config(config).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert!(Url::parse(&config.base_url).is_ok());
        assert!(config.user_agent.starts_with("wikiroster/"));
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_every_request_carries_the_fixed_parameters() {
        let client = MediaWikiClient::new().unwrap();
        let request = client
            .request(&[("prop", "sections"), ("page", "RLCS Season 1")])
            .build()
            .unwrap();

        let query = request.url().query().unwrap();
        assert!(query.contains("action=parse"));
        assert!(query.contains("format=json"));
        assert!(query.contains("origin=*"));
        assert!(query.contains("prop=sections"));
        assert!(query.contains("page=RLCS+Season+1"));
    }
}
