use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use reqwest::{Client, ClientBuilder, StatusCode};
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::extractor::{is_disambiguation, page_title};
use crate::models::{ArticleReference, FetchedPage};

static SEARCH_RESULT_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".mw-search-result-heading a").expect("Failed to parse search result selector")
});

/// Resolves a keyword to an article page.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    async fn fetch(&self, keyword: &str) -> Result<FetchedPage>;
}

/// Fetches articles over HTTP from a MediaWiki site.
pub struct WikipediaClient {
    client: Client,
    base_url: Url,
    max_retries: u32,
    retry_delay: Duration,
}

#[derive(Debug)]
struct Response {
    url: Url,
    status: StatusCode,
    body: String,
}

impl WikipediaClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = ClientBuilder::new()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
        })
    }

    /// `{base}/wiki/{Title}` with spaces turned into underscores.
    pub fn article_url(&self, title: &str) -> Result<Url> {
        let title = title.split_whitespace().collect::<Vec<_>>().join("_");
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|_| AppError::ConfigError(format!("Base url {} cannot hold a path", self.base_url)))?
            .clear()
            .push("wiki")
            .push(&title);
        Ok(url)
    }

    pub fn search_url(&self, keyword: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path("/w/index.php");
        url.set_fragment(None);
        url.query_pairs_mut()
            .clear()
            .append_pair("search", keyword)
            .append_pair("title", "Special:Search")
            .append_pair("ns0", "1");
        url
    }

    async fn get_once(&self, url: &Url) -> std::result::Result<Response, reqwest::Error> {
        let response = self.client.get(url.clone()).send().await?;
        let url = response.url().clone();
        let status = response.status();
        let body = response.text().await?;
        Ok(Response { url, status, body })
    }

    /// GET with retries on transport errors and 5xx responses.
    async fn get(&self, url: &Url) -> Result<Response> {
        let mut attempt = 0;
        loop {
            let outcome = self.get_once(url).await;
            let retryable = match &outcome {
                Ok(response) => response.status.is_server_error(),
                Err(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            };
            if !retryable || attempt >= self.max_retries {
                return outcome.map_err(|e| AppError::NetworkError(format!("GET {} failed: {}", url, e)));
            }
            attempt += 1;
            debug!("Retrying {} ({}/{})", url, attempt, self.max_retries);
            tokio::time::sleep(self.retry_delay * attempt).await;
        }
    }

    fn page_from(&self, keyword: &str, response: Response) -> Result<FetchedPage> {
        let title = {
            let document = Html::parse_document(&response.body);
            if is_disambiguation(&document) {
                return Err(AppError::NotFoundError(format!(
                    "{:?} resolves to a disambiguation page ({})",
                    keyword, response.url
                )));
            }
            page_title(&document).unwrap_or_else(|| keyword.to_string())
        };

        Ok(FetchedPage {
            article: ArticleReference {
                title,
                url: response.url.to_string(),
                fetched_at: Utc::now(),
            },
            markup: response.body,
        })
    }
}

#[async_trait]
impl ArticleSource for WikipediaClient {
    async fn fetch(&self, keyword: &str) -> Result<FetchedPage> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(AppError::InvalidKeyword("keyword is empty".to_string()));
        }

        let direct = self.get(&self.article_url(keyword)?).await?;
        if direct.status.is_success() {
            info!("Direct match found: {}", direct.url);
            return self.page_from(keyword, direct);
        }
        if direct.status != StatusCode::NOT_FOUND {
            return Err(status_error(&direct));
        }

        info!("Searching for: {}", keyword);
        let search = self.get(&self.search_url(keyword)).await?;
        if !search.status.is_success() {
            return Err(status_error(&search));
        }
        if is_article_url(&search.url) {
            info!("Search went straight to: {}", search.url);
            return self.page_from(keyword, search);
        }

        let target = first_search_result(&search.body, &self.base_url)
            .ok_or_else(|| AppError::NotFoundError(format!("no search results for {:?}", keyword)))?;
        info!("Best match found: {}", target);

        let article = self.get(&target).await?;
        if article.status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFoundError(format!("search result {} does not exist", target)));
        }
        if !article.status.is_success() {
            return Err(status_error(&article));
        }
        self.page_from(keyword, article)
    }
}

fn status_error(response: &Response) -> AppError {
    AppError::NetworkError(format!("GET {} returned {}", response.url, response.status))
}

fn is_article_url(url: &Url) -> bool {
    let path = url.path();
    path.starts_with("/wiki/") && !path.starts_with("/wiki/Special:")
}

fn first_search_result(body: &str, base_url: &Url) -> Option<Url> {
    let document = Html::parse_document(body);
    let href = document
        .select(&SEARCH_RESULT_SELECTOR)
        .next()?
        .value()
        .attr("href")?;
    base_url.join(href).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn client() -> WikipediaClient {
        WikipediaClient::new(&Config::default()).unwrap()
    }

    fn response(url: &str, body: &str) -> Response {
        Response {
            url: Url::parse(url).unwrap(),
            status: StatusCode::OK,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_article_url() {
        let url = client().article_url("Python (programming language)").unwrap();
        assert_eq!(url.as_str(), "https://en.wikipedia.org/wiki/Python_(programming_language)");

        let url = client().article_url("AC/DC  band?").unwrap();
        assert_eq!(url.as_str(), "https://en.wikipedia.org/wiki/AC%2FDC_band%3F");
    }

    #[test]
    fn test_search_url() {
        let url = client().search_url("rust lang");
        assert_eq!(url.path(), "/w/index.php");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("search".to_string(), "rust lang".to_string()));
        assert!(pairs.contains(&("title".to_string(), "Special:Search".to_string())));
    }

    #[test]
    fn test_is_article_url() {
        assert!(is_article_url(&Url::parse("https://en.wikipedia.org/wiki/Rust").unwrap()));
        assert!(!is_article_url(&Url::parse("https://en.wikipedia.org/wiki/Special:Search?search=x").unwrap()));
        assert!(!is_article_url(&Url::parse("https://en.wikipedia.org/w/index.php?search=x").unwrap()));
    }

    #[test]
    fn test_first_search_result() {
        let base = Url::parse("https://en.wikipedia.org").unwrap();
        let body = r#"<ul class="mw-search-results">
            <li><div class="mw-search-result-heading"><a href="/wiki/Rust_(programming_language)">Rust (programming language)</a></div></li>
            <li><div class="mw-search-result-heading"><a href="/wiki/Rust">Rust</a></div></li>
        </ul>"#;
        assert_eq!(
            first_search_result(body, &base).unwrap().as_str(),
            "https://en.wikipedia.org/wiki/Rust_(programming_language)"
        );
        assert!(first_search_result("<p>There were no results matching the query.</p>", &base).is_none());
    }

    #[test]
    fn test_page_from_uses_heading_title() {
        let body = r#"<h1 id="firstHeading">Mercury (planet)</h1><div id="mw-content-text"><p>Planet.</p></div>"#;
        let page = client()
            .page_from("mercury planet", response("https://en.wikipedia.org/wiki/Mercury_(planet)", body))
            .unwrap();
        assert_eq!(page.article.title, "Mercury (planet)");
        assert_eq!(page.article.url, "https://en.wikipedia.org/wiki/Mercury_(planet)");
        assert_eq!(page.markup, body);
    }

    #[test]
    fn test_disambiguation_page_is_not_found() {
        let body = r#"<h1 id="firstHeading">Mercury</h1><div id="mw-content-text"><div id="disambigbox"></div></div>"#;
        let err = client()
            .page_from("mercury", response("https://en.wikipedia.org/wiki/Mercury", body))
            .unwrap_err();
        assert!(matches!(err, AppError::NotFoundError(msg) if msg.contains("disambiguation")));
    }

    type Route = fn(&str) -> (u16, Option<&'static str>, String);

    fn article_page(title: &str) -> String {
        format!(
            r#"<html><body><h1 id="firstHeading">{}</h1><div id="mw-content-text"><div class="mw-parser-output"><p>{} body.</p></div></div></body></html>"#,
            title, title
        )
    }

    fn search_page(href: &str) -> String {
        format!(
            r#"<ul class="mw-search-results"><li><div class="mw-search-result-heading"><a href="{}">Hit</a></div></li></ul>"#,
            href
        )
    }

    /// Canned wiki: `/wiki/Known` exists, everything else is routed by keyword.
    fn wiki(target: &str) -> (u16, Option<&'static str>, String) {
        match target {
            "/wiki/Known" => (200, None, article_page("Known")),
            "/wiki/Known_thing" => (200, None, article_page("Known thing")),
            "/wiki/Forbidden" => (403, None, String::new()),
            "/wiki/Flaky" => (503, None, String::new()),
            t if t.starts_with("/w/index.php?search=Fuzzy&") => (200, None, search_page("/wiki/Known_thing")),
            t if t.starts_with("/w/index.php?search=Jump&") => (302, Some("/wiki/Known"), String::new()),
            t if t.starts_with("/w/index.php?search=Gone&") => (200, None, search_page("/wiki/Missing_hit")),
            t if t.starts_with("/w/index.php?search=Broken&") => (500, None, String::new()),
            t if t.starts_with("/w/index.php?") => {
                (200, None, "<p>There were no results matching the query.</p>".to_string())
            }
            _ => (404, None, "<p>Wikipedia does not have an article with this exact name.</p>".to_string()),
        }
    }

    /// Serves `route` on a local port and records every request target.
    async fn serve(route: Route) -> (Url, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(Mutex::new(Vec::new()));
        let seen = hits.clone();

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut request = Vec::new();
                let mut chunk = [0u8; 1024];
                loop {
                    let n = stream.read(&mut chunk).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&chunk[..n]);
                    if request.windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                let target = String::from_utf8_lossy(&request)
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or("/")
                    .to_string();
                seen.lock().unwrap().push(target.clone());

                let (status, location, body) = route(&target);
                let location = location
                    .map(|l| format!("Location: {}\r\n", l))
                    .unwrap_or_default();
                let response = format!(
                    "HTTP/1.1 {} Canned\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n{}",
                    status,
                    body.len(),
                    location,
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (Url::parse(&format!("http://{}", addr)).unwrap(), hits)
    }

    async fn local_client(route: Route) -> (WikipediaClient, Arc<Mutex<Vec<String>>>) {
        let (base_url, hits) = serve(route).await;
        let config = Config {
            base_url,
            timeout: Duration::from_secs(5),
            max_retries: 2,
            retry_delay: Duration::ZERO,
            ..Config::default()
        };
        (WikipediaClient::new(&config).unwrap(), hits)
    }

    fn count(hits: &Arc<Mutex<Vec<String>>>, prefix: &str) -> usize {
        hits.lock().unwrap().iter().filter(|t| t.starts_with(prefix)).count()
    }

    #[tokio::test]
    async fn test_exact_title_is_fetched_directly() {
        let (client, hits) = local_client(wiki).await;
        let page = client.fetch("Known").await.unwrap();
        assert_eq!(page.article.title, "Known");
        assert!(page.article.url.ends_with("/wiki/Known"));
        assert!(page.markup.contains("Known body."));
        assert_eq!(count(&hits, "/w/index.php"), 0);
    }

    #[tokio::test]
    async fn test_missing_title_falls_back_to_first_search_hit() {
        let (client, hits) = local_client(wiki).await;
        let page = client.fetch("Fuzzy").await.unwrap();
        assert_eq!(page.article.title, "Known thing");
        assert!(page.article.url.ends_with("/wiki/Known_thing"));
        assert_eq!(*hits.lock().unwrap(), vec![
            "/wiki/Fuzzy".to_string(),
            "/w/index.php?search=Fuzzy&title=Special%3ASearch&ns0=1".to_string(),
            "/wiki/Known_thing".to_string(),
        ]);
    }

    #[tokio::test]
    async fn test_search_redirect_to_article_is_used() {
        let (client, hits) = local_client(wiki).await;
        let page = client.fetch("Jump").await.unwrap();
        assert_eq!(page.article.title, "Known");
        assert!(page.article.url.ends_with("/wiki/Known"));
        assert_eq!(count(&hits, "/wiki/Known"), 1);
    }

    #[tokio::test]
    async fn test_empty_search_results_are_not_found() {
        let (client, _) = local_client(wiki).await;
        let err = client.fetch("zzzz").await.unwrap_err();
        assert!(matches!(err, AppError::NotFoundError(msg) if msg.contains("no search results")));
    }

    #[tokio::test]
    async fn test_search_hit_that_does_not_exist_is_not_found() {
        let (client, hits) = local_client(wiki).await;
        let err = client.fetch("Gone").await.unwrap_err();
        assert!(matches!(err, AppError::NotFoundError(msg) if msg.contains("Missing_hit")));
        assert_eq!(count(&hits, "/wiki/Missing_hit"), 1);
    }

    #[tokio::test]
    async fn test_client_error_is_network_error_without_retry() {
        let (client, hits) = local_client(wiki).await;
        let err = client.fetch("Forbidden").await.unwrap_err();
        assert!(matches!(err, AppError::NetworkError(msg) if msg.contains("403")));
        assert_eq!(count(&hits, "/wiki/Forbidden"), 1);
        assert_eq!(count(&hits, "/w/index.php"), 0);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let (client, hits) = local_client(wiki).await;
        client.fetch("zzzz").await.unwrap_err();
        assert_eq!(count(&hits, "/wiki/zzzz"), 1);
    }

    #[tokio::test]
    async fn test_server_error_is_retried_then_network_error() {
        let (client, hits) = local_client(wiki).await;
        let err = client.fetch("Flaky").await.unwrap_err();
        assert!(matches!(err, AppError::NetworkError(msg) if msg.contains("503")));
        // One attempt plus max_retries.
        assert_eq!(count(&hits, "/wiki/Flaky"), 3);
    }

    #[tokio::test]
    async fn test_failing_search_is_network_error() {
        let (client, hits) = local_client(wiki).await;
        let err = client.fetch("Broken").await.unwrap_err();
        assert!(matches!(err, AppError::NetworkError(msg) if msg.contains("500")));
        assert_eq!(count(&hits, "/w/index.php?search=Broken"), 3);
    }

    #[tokio::test]
    async fn test_empty_keyword_is_rejected_without_network() {
        let err = client().fetch("   ").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidKeyword(_)));
    }
}
