//! Turn a test's fetch declarations into its page registry.
//!
//! Fetches run one after another in declaration order. The first failure
//! aborts loading; nothing is retried here beyond the fetcher's own
//! timeout policy.

use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::error::PacoResult;
use crate::fetcher::{Fetcher, Transport};
use crate::identity::TestIdentity;
use crate::page::Page;
use crate::registry::PageRegistry;
use crate::resolver::SpecResolver;
use crate::spec::{FetchDeclaration, RequestSpec};
use crate::storage::BodyStore;
use crate::xml::{XmlValidator, XmllintValidator};

/// Fetches pages for tests.
#[derive(Clone)]
pub struct PageLoader {
    config: Arc<Config>,
    fetcher: Fetcher,
    store: BodyStore,
    validator: Arc<dyn XmlValidator>,
}

impl PageLoader {
    /// Loader over the default HTTP transport.
    pub fn new(config: Arc<Config>) -> Self {
        let fetcher = Fetcher::new(config.clone());
        Self::from_fetcher(config, fetcher)
    }

    pub fn with_transport(config: Arc<Config>, transport: Arc<dyn Transport>) -> Self {
        let fetcher = Fetcher::with_transport(config.clone(), transport);
        Self::from_fetcher(config, fetcher)
    }

    fn from_fetcher(config: Arc<Config>, fetcher: Fetcher) -> Self {
        Self {
            store: BodyStore::new(config.output_dir.clone()),
            config,
            fetcher,
            validator: Arc::new(XmllintValidator::new()),
        }
    }

    /// Schema validator handed to every loaded page.
    pub fn with_validator(mut self, validator: Arc<dyn XmlValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Resolve the declarations for `test` and fetch them all.
    pub async fn load<R>(&self, resolver: &R, test: &TestIdentity) -> PacoResult<PageRegistry>
    where
        R: SpecResolver + ?Sized,
    {
        let declarations = resolver.resolve(test);
        info!("resolved {} fetch declaration(s) for {test}", declarations.len());
        self.load_declarations(&declarations, test).await
    }

    /// Fetch `declarations` in order into a fresh registry.
    pub async fn load_declarations(
        &self,
        declarations: &[FetchDeclaration],
        test: &TestIdentity,
    ) -> PacoResult<PageRegistry> {
        let mut registry = PageRegistry::new();
        for declaration in declarations {
            let spec = declaration.resolve(&self.config);
            let page = self.fetch_one(&spec, test).await?;
            registry.push(page);
        }
        Ok(registry)
    }

    /// Fetch a single spec on behalf of `test`.
    pub async fn fetch_one(&self, spec: &RequestSpec, test: &TestIdentity) -> PacoResult<Page> {
        let exchange = self.fetcher.execute(spec).await?;
        info!(
            url = %exchange.request.url,
            status = exchange.response.status,
            attempts = exchange.attempts,
            "fetched page for {test}"
        );
        Ok(Page::new(test.clone(), spec, exchange, self.store.clone())
            .with_validator(self.validator.clone()))
    }
}

impl std::fmt::Debug for PageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageLoader")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish()
    }
}
