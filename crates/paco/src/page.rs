//! A fetched page: raw response, lazily parsed document, and the queries
//! tests assert on.
//!
//! Selector queries use CSS via `scraper`. A query that matches nothing
//! also dumps the body to `<root>/not-found/<test>.html` for debugging.

use std::borrow::Cow;
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use scraper::{ElementRef, Html, Selector};

use crate::error::{PacoError, PacoResult};
use crate::fetcher::{Exchange, OutboundRequest, RawResponse};
use crate::identity::TestIdentity;
use crate::spec::{Device, RequestSpec};
use crate::storage::{BodyStore, NOT_FOUND_FOLDER, STORED_FOLDER};
use crate::xml::{XmlValidationOptions, XmlValidator, XmllintValidator};

/// One fetched page, owned by the registry of the test that requested it.
pub struct Page {
    test: TestIdentity,
    device: Device,
    request: OutboundRequest,
    response: RawResponse,
    attempts: u32,
    store: BodyStore,
    validator: Arc<dyn XmlValidator>,
    document: OnceCell<Html>,
}

impl Page {
    pub fn new(test: TestIdentity, spec: &RequestSpec, exchange: Exchange, store: BodyStore) -> Self {
        Self {
            test,
            device: spec.device(),
            request: exchange.request,
            response: exchange.response,
            attempts: exchange.attempts,
            store,
            validator: Arc::new(XmllintValidator::new()),
            document: OnceCell::new(),
        }
    }

    /// Replace the schema validator used by the `validate_xml*` methods.
    pub fn with_validator(mut self, validator: Arc<dyn XmlValidator>) -> Self {
        self.validator = validator;
        self
    }

    // ── identity ──

    /// `method(fully.qualified.Class)` of the requesting test.
    pub fn test_name(&self) -> String {
        self.test.to_string()
    }

    pub fn test_identity(&self) -> &TestIdentity {
        &self.test
    }

    /// Requested URL. Not updated by redirects.
    pub fn url(&self) -> &str {
        &self.request.url
    }

    /// URL of the last request after redirects.
    pub fn final_url(&self) -> &str {
        &self.response.final_url
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Network attempts it took to fetch this page.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn request(&self) -> &OutboundRequest {
        &self.request
    }

    pub fn response(&self) -> &RawResponse {
        &self.response
    }

    // ── document queries ──

    /// Parsed document, built on first use.
    pub fn document(&self) -> &Html {
        self.document
            .get_or_init(|| Html::parse_document(&self.page_body()))
    }

    /// First element matching `css`.
    pub fn element(&self, css: &str) -> PacoResult<Option<ElementRef<'_>>> {
        Ok(self.elements(css)?.into_iter().next())
    }

    /// Element matching `css` at `index`, counting from 0 in document order.
    pub fn element_at(&self, css: &str, index: usize) -> PacoResult<Option<ElementRef<'_>>> {
        Ok(self.elements(css)?.into_iter().nth(index))
    }

    /// Last element matching `css`.
    pub fn element_last_of(&self, css: &str) -> PacoResult<Option<ElementRef<'_>>> {
        Ok(self.elements(css)?.into_iter().last())
    }

    /// All elements matching `css`, in document order.
    pub fn elements(&self, css: &str) -> PacoResult<Vec<ElementRef<'_>>> {
        let selector = parse_selector(css)?;
        let found: Vec<ElementRef<'_>> = self.document().select(&selector).collect();
        if found.is_empty() {
            self.dump_not_found(css);
        }
        Ok(found)
    }

    pub fn element_count(&self, css: &str) -> PacoResult<usize> {
        Ok(self.elements(css)?.len())
    }

    pub fn is_element_present(&self, css: &str) -> PacoResult<bool> {
        Ok(!self.elements(css)?.is_empty())
    }

    /// True when `css` matches exactly `occurrences` elements.
    pub fn is_element_present_times(&self, css: &str, occurrences: usize) -> PacoResult<bool> {
        Ok(self.element_count(css)? == occurrences)
    }

    /// Text content of the first element matching `css`.
    pub fn element_text(&self, css: &str) -> PacoResult<Option<String>> {
        Ok(self.element(css)?.map(|el| el.text().collect::<String>()))
    }

    /// Trimmed text of the `<title>` element; empty when there is none.
    pub fn title(&self) -> String {
        let selector = match Selector::parse("title") {
            Ok(sel) => sel,
            Err(_) => return String::new(),
        };
        self.document()
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default()
    }

    fn dump_not_found(&self, css: &str) {
        match self
            .store
            .write(NOT_FOUND_FOLDER, &self.test, &self.response.body)
        {
            Ok(path) => tracing::debug!(
                "no match for {css:?} on {}, body dumped to {}",
                self.url(),
                path.display()
            ),
            Err(e) => tracing::warn!("failed to dump body of {} for {css:?}: {e}", self.url()),
        }
    }

    // ── headers and cookies ──

    /// Case-insensitive response header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.response.header(name)
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }

    pub fn has_header_with_value(&self, name: &str, value: &str) -> bool {
        self.header(name) == Some(value)
    }

    /// All response headers, keyed by lowercased name.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.response.headers
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.response.cookies.get(name).map(String::as_str)
    }

    pub fn has_cookie(&self, name: &str) -> bool {
        self.response.cookies.contains_key(name)
    }

    pub fn cookies(&self) -> &BTreeMap<String, String> {
        &self.response.cookies
    }

    // ── status and content ──

    pub fn status_code(&self) -> u16 {
        self.response.status
    }

    pub fn status_message(&self) -> &str {
        &self.response.status_message
    }

    pub fn content_type(&self) -> Option<&str> {
        self.response.content_type.as_deref()
    }

    /// Body decoded as UTF-8, invalid sequences replaced.
    pub fn page_body(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.response.body)
    }

    pub fn body_bytes(&self) -> &[u8] {
        &self.response.body
    }

    /// Body parsed as JSON.
    pub fn json(&self) -> PacoResult<serde_json::Value> {
        Ok(serde_json::from_slice(&self.response.body)?)
    }

    /// `Location` response header, if any.
    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }

    /// Referrer that was sent with the request.
    pub fn referrer(&self) -> Option<&str> {
        self.request.referrer()
    }

    /// User agent that was sent with the request.
    pub fn user_agent(&self) -> Option<&str> {
        self.request.user_agent()
    }

    // ── persistence ──

    /// Store the body at `<root>/stored/<test>.html`.
    pub fn store_page_body(&self) -> PacoResult<PathBuf> {
        self.store(STORED_FOLDER)
    }

    /// Store the body at `<root>/<folder>/<test>.html`.
    pub fn store(&self, folder: &str) -> PacoResult<PathBuf> {
        Ok(self.store.write(folder, &self.test, &self.response.body)?)
    }

    // ── XML ──

    /// Validate the body against a W3C XML Schema, namespace aware.
    pub fn validate_xml(&self, xsd: impl AsRef<Path>) -> PacoResult<()> {
        self.validate_xml_with(xsd, XmlValidationOptions::default())
    }

    pub fn validate_xml_namespace_aware(
        &self,
        xsd: impl AsRef<Path>,
        namespace_aware: bool,
    ) -> PacoResult<()> {
        self.validate_xml_with(
            xsd,
            XmlValidationOptions {
                namespace_aware,
                ..XmlValidationOptions::default()
            },
        )
    }

    pub fn validate_xml_with(
        &self,
        schema: impl AsRef<Path>,
        options: XmlValidationOptions,
    ) -> PacoResult<()> {
        self.validator
            .validate(&self.response.body, schema.as_ref(), &options)
            .map_err(PacoError::from)
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("test", &self.test.to_string())
            .field("url", &self.request.url)
            .field("device", &self.device)
            .field("status", &self.response.status)
            .finish()
    }
}

fn parse_selector(css: &str) -> PacoResult<Selector> {
    Selector::parse(css).map_err(|e| PacoError::Selector {
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::ValidationError;
    use crate::spec::FetchDeclaration;
    use std::sync::Mutex;

    pub(crate) const EXAMPLE_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title> i'm the title </title></head>
<body>
  <h1>headline</h1>
  <p>i'm a paragraph</p>
  <p>i'm the second paragraph</p>
</body>
</html>"#;

    /// Build a page the way the loader would, without touching the network.
    pub(crate) fn page_from(
        decl: FetchDeclaration,
        test: TestIdentity,
        body: &str,
        headers: Vec<(&str, &str)>,
        root: &Path,
    ) -> Page {
        let config = Config::default();
        let spec = decl.resolve(&config);
        let fetcher = crate::fetcher::Fetcher::new(Arc::new(config));
        let request = fetcher.assemble(&spec).unwrap();
        let response = RawResponse::from_parts(
            200,
            "OK",
            headers,
            body.as_bytes().to_vec(),
            request.url.clone(),
        );
        Page::new(
            test,
            &spec,
            Exchange {
                request,
                response,
                attempts: 1,
            },
            BodyStore::new(root),
        )
    }

    fn example(root: &Path) -> Page {
        page_from(
            FetchDeclaration::new("localhost/example").referrer("my.custom.referrer"),
            TestIdentity::new("get_name_of_test", "paco.fetcher.FetchedPageTest"),
            EXAMPLE_HTML,
            vec![
                ("Content-Type", "text/html; charset=utf-8"),
                ("Custom-Header", "custom value"),
                ("Set-Cookie", "logged_in=no; Path=/"),
            ],
            root,
        )
    }

    #[test]
    fn test_selector_queries() {
        let dir = tempfile::tempdir().unwrap();
        let page = example(dir.path());

        let h1 = page.element("h1").unwrap().unwrap();
        assert_eq!(h1.text().collect::<String>(), "headline");

        let first = page.element_at("p", 0).unwrap().unwrap();
        assert_eq!(first.text().collect::<String>(), "i'm a paragraph");
        assert!(page.element_at("p", 2).unwrap().is_none());

        let last = page.element_last_of("p").unwrap().unwrap();
        assert!(last.text().collect::<String>().contains("second paragraph"));

        assert_eq!(page.elements("h1").unwrap().len(), 1);
        assert_eq!(page.element_count("p").unwrap(), 2);
        assert!(page.is_element_present("h1").unwrap());
        assert!(page.is_element_present_times("h1", 1).unwrap());
        assert!(!page.is_element_present_times("h1", 100).unwrap());
        assert_eq!(page.element_text("h1").unwrap().as_deref(), Some("headline"));
    }

    #[test]
    fn test_matching_query_does_not_dump() {
        let dir = tempfile::tempdir().unwrap();
        let page = example(dir.path());

        page.elements("p").unwrap();
        assert!(!dir.path().join(NOT_FOUND_FOLDER).exists());
    }

    #[test]
    fn test_missing_element_dumps_body() {
        let dir = tempfile::tempdir().unwrap();
        let page = example(dir.path());

        assert!(!page.is_element_present("dgfhkdgs").unwrap());
        let dumped = dir
            .path()
            .join("not-found")
            .join("get_name_of_test(paco.fetcher.FetchedPageTest).html");
        let content = std::fs::read_to_string(dumped).unwrap();
        assert!(content.contains("<title> i'm the title </title>"));
    }

    #[test]
    fn test_invalid_selector_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let page = example(dir.path());
        assert!(matches!(
            page.elements("p[["),
            Err(PacoError::Selector { .. })
        ));
    }

    #[test]
    fn test_headers_cookies_and_status() {
        let dir = tempfile::tempdir().unwrap();
        let page = example(dir.path());

        assert_eq!(page.header("custom-header"), Some("custom value"));
        assert_eq!(page.header("CUSTOM-HEADER"), Some("custom value"));
        assert!(page.has_header("Custom-Header"));
        assert!(page.has_header_with_value("Custom-Header", "custom value"));
        assert!(!page.has_header_with_value("Custom-Header", "other"));
        assert!(page.header("X-Missing").is_none());
        assert_eq!(
            page.headers().get("custom-header").map(String::as_str),
            Some("custom value")
        );

        assert_eq!(page.cookie("logged_in"), Some("no"));
        assert!(page.has_cookie("logged_in"));
        assert_eq!(page.cookies().len(), 1);

        assert_eq!(page.status_code(), 200);
        assert_eq!(page.status_message(), "OK");
        assert!(page.content_type().unwrap().contains("text/html"));
        assert!(page.location().is_none());
    }

    #[test]
    fn test_request_side_accessors() {
        let dir = tempfile::tempdir().unwrap();
        let page = example(dir.path());

        assert_eq!(page.url(), "http://localhost/example");
        assert_eq!(page.referrer(), Some("my.custom.referrer"));
        assert_eq!(page.user_agent(), Some(Device::Desktop.user_agent()));
        assert_eq!(page.device(), Device::Desktop);
        assert_eq!(page.test_name(), "get_name_of_test(paco.fetcher.FetchedPageTest)");
        assert_eq!(page.title(), "i'm the title");
        assert!(page.page_body().contains("<!DOCTYPE html>"));
    }

    #[test]
    fn test_title_empty_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let page = page_from(
            FetchDeclaration::new("localhost/plain"),
            TestIdentity::new("t", "c.T"),
            "<p>no head</p>",
            Vec::new(),
            dir.path(),
        );
        assert_eq!(page.title(), "");
    }

    #[test]
    fn test_json_body() {
        let dir = tempfile::tempdir().unwrap();
        let page = page_from(
            FetchDeclaration::new("localhost/api"),
            TestIdentity::new("t", "c.T"),
            r#"{"data":"some value"}"#,
            vec![("Content-Type", "application/json")],
            dir.path(),
        );
        assert_eq!(page.json().unwrap()["data"], "some value");

        let html = example(dir.path());
        assert!(matches!(html.json(), Err(PacoError::Json(_))));
    }

    #[test]
    fn test_store_page_body_writes_exact_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let page = example(dir.path());

        let path = page.store_page_body().unwrap();
        assert_eq!(
            path,
            dir.path()
                .join("stored")
                .join("get_name_of_test(paco.fetcher.FetchedPageTest).html")
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), EXAMPLE_HTML);

        let custom = page.store("my-folder").unwrap();
        assert!(custom.starts_with(dir.path().join("my-folder")));
        assert_eq!(std::fs::read(&custom).unwrap(), EXAMPLE_HTML.as_bytes());
    }

    /// Records what it was asked to validate.
    struct RecordingValidator {
        seen: Mutex<Vec<(PathBuf, XmlValidationOptions)>>,
        fail: bool,
    }

    impl XmlValidator for RecordingValidator {
        fn validate(
            &self,
            _xml: &[u8],
            schema: &Path,
            options: &XmlValidationOptions,
        ) -> Result<(), ValidationError> {
            self.seen
                .lock()
                .unwrap()
                .push((schema.to_path_buf(), options.clone()));
            if self.fail {
                Err(ValidationError::SchemaMismatch {
                    xsd: schema.display().to_string(),
                    details: "element 'note' missing".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_validate_xml_delegates_with_options() {
        let dir = tempfile::tempdir().unwrap();
        let validator = Arc::new(RecordingValidator {
            seen: Mutex::new(Vec::new()),
            fail: false,
        });
        let page = example(dir.path()).with_validator(validator.clone());

        page.validate_xml("schema/note.xsd").unwrap();
        page.validate_xml_namespace_aware("schema/note.xsd", false).unwrap();

        let seen = validator.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, PathBuf::from("schema/note.xsd"));
        assert!(seen[0].1.namespace_aware);
        assert!(!seen[1].1.namespace_aware);
        assert_eq!(seen[1].1.schema_language, crate::xml::W3C_XML_SCHEMA_NS_URI);
    }

    #[test]
    fn test_validate_xml_propagates_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let page = example(dir.path()).with_validator(Arc::new(RecordingValidator {
            seen: Mutex::new(Vec::new()),
            fail: true,
        }));
        assert!(matches!(
            page.validate_xml("note.xsd"),
            Err(PacoError::Validation(ValidationError::SchemaMismatch { .. }))
        ));
    }
}
