// Copyright 2026 Paco Contributors
// SPDX-License-Identifier: MIT

//! paco — page content tester.
//!
//! Fetches the pages a test declares, retrying timed-out attempts within a
//! fixed budget, and exposes them through a per-test [`PageRegistry`] that
//! can be queried by position, URL snippet, device, or both.
//!
//! ```no_run
//! use std::sync::Arc;
//! use paco::{Config, Device, FetchDeclaration, PageLoader, StaticResolver, TestIdentity};
//!
//! # async fn run() -> paco::PacoResult<()> {
//! let resolver = StaticResolver::new().method_fetches(
//!     "shop.HomePageTest",
//!     "renders_on_all_devices",
//!     vec![
//!         FetchDeclaration::new("shop.example/"),
//!         FetchDeclaration::new("shop.example/").device(Device::Mobile),
//!     ],
//! );
//! let loader = PageLoader::new(Arc::new(Config::from_env()));
//! let test = TestIdentity::new("renders_on_all_devices", "shop.HomePageTest");
//!
//! let pages = loader.load(&resolver, &test).await?;
//! assert!(pages.by_device(Device::Mobile)?.is_element_present("nav")?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod fetcher;
pub mod identity;
pub mod loader;
pub mod page;
pub mod registry;
pub mod resolver;
pub mod spec;
pub mod storage;
pub mod url_builder;
pub mod xml;

pub use config::Config;
pub use error::{ConfigError, LookupError, PacoError, PacoResult, TransportError, ValidationError};
pub use fetcher::{Attempt, Exchange, FetchOutcome, Fetcher, HttpTransport, OutboundRequest, RawResponse, Transport};
pub use identity::TestIdentity;
pub use loader::PageLoader;
pub use page::Page;
pub use registry::PageRegistry;
pub use resolver::{select_scope, DeclarationScopes, SpecResolver, StaticResolver};
pub use spec::{Device, FetchDeclaration, Method, NameValue, Protocol, ProxySpec, RequestSpec};
pub use storage::BodyStore;
pub use xml::{XmlValidationOptions, XmlValidator, XmllintValidator};
