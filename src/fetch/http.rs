//! HTTP implementation of [`TitleFetcher`].

use super::{FetchedTitle, TitleFetcher, build_client, clean, html, pdf, read_limited, truncate};
use crate::error::FetchError;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::debug;

/// Bytes of an HTML document searched for the title.
const HTML_READ_LIMIT: usize = 100 * 1024;
/// Bytes of a PDF searched for the information dictionary.
const PDF_READ_LIMIT: usize = 3 * 1024 * 1024;

/// Fetches titles over HTTP(S) with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpTitleFetcher {
    client: reqwest::Client,
    max_title_len: usize,
}

impl HttpTitleFetcher {
    pub fn new(timeout: Duration, max_title_len: usize) -> Result<Self, FetchError> {
        let client = build_client(timeout)?;
        Ok(Self {
            client,
            max_title_len,
        })
    }
}

#[async_trait]
impl TitleFetcher for HttpTitleFetcher {
    async fn fetch_title(&self, url: &str) -> Result<FetchedTitle, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let is_pdf = url.to_lowercase().ends_with(".pdf");
        let limit = if is_pdf { PDF_READ_LIMIT } else { HTML_READ_LIMIT };
        let body = read_limited(response, limit).await?;

        let raw = if is_pdf {
            pdf::title_from_pdf(&body)
        } else {
            html::extract_title(&html::decode_body(&body, content_type.as_deref()))
        };
        let title = truncate(&clean(&raw.unwrap_or_default()), self.max_title_len).to_string();

        if status != reqwest::StatusCode::OK {
            return Err(FetchError::Status {
                status: status.as_u16(),
                title,
            });
        }

        debug!(url = %url, title = %title, "Fetched title");
        Ok(FetchedTitle { title, final_url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::USER_AGENT;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpTitleFetcher {
        HttpTitleFetcher::new(Duration::from_secs(5), 500).unwrap()
    }

    #[tokio::test]
    async fn test_html_title() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                "<html><head><title>Hello\n  World &amp; more</title></head></html>",
                "text/html; charset=utf-8",
            ))
            .mount(&server)
            .await;

        let got = fetcher()
            .fetch_title(&format!("{}/page", server.uri()))
            .await
            .unwrap();
        assert_eq!(got.title, "Hello World & more");
        assert_eq!(got.final_url, format!("{}/page", server.uri()));
    }

    #[tokio::test]
    async fn test_non_200_is_error_with_title() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_raw("<title>Not Found</title>", "text/html"),
            )
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch_title(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FetchError::Status { status: 404, ref title } if title == "Not Found"
        ));
    }

    #[tokio::test]
    async fn test_pdf_info_dictionary() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/paper.PDF"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                b"%PDF-1.4\n<< /Title(Ring Buffers)\n/Author(A. Person) >>\n".to_vec(),
                "application/pdf",
            ))
            .mount(&server)
            .await;

        let got = fetcher()
            .fetch_title(&format!("{}/paper.PDF", server.uri()))
            .await
            .unwrap();
        assert_eq!(got.title, "Ring Buffers by A. Person");
    }

    #[tokio::test]
    async fn test_long_title_is_truncated() {
        let server = MockServer::start().await;
        let long = "x".repeat(600);
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(format!("<title>{long}</title>"), "text/html"),
            )
            .mount(&server)
            .await;

        let got = fetcher().fetch_title(&server.uri()).await.unwrap();
        assert_eq!(got.title.len(), 500);
    }

    #[tokio::test]
    async fn test_missing_title_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<p>hi</p>", "text/html"))
            .mount(&server)
            .await;

        let got = fetcher().fetch_title(&server.uri()).await.unwrap();
        assert_eq!(got.title, "");
    }
}
