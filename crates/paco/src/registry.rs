//! Ordered, per-test collection of fetched pages.
//!
//! Insertion order is fetch order, which is declaration order. Lookups
//! return the first match in that order; several matching pages are not
//! an error. Only the loader appends, so test code sees a read-only view.

use crate::error::LookupError;
use crate::page::Page;
use crate::spec::Device;

#[derive(Debug, Default)]
pub struct PageRegistry {
    pages: Vec<Page>,
}

impl PageRegistry {
    pub(crate) fn new() -> Self {
        Self { pages: Vec::new() }
    }

    pub(crate) fn push(&mut self, page: Page) {
        self.pages.push(page);
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Page> {
        self.pages.iter()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Page at `index` in fetch order.
    pub fn by_index(&self, index: usize) -> Result<&Page, LookupError> {
        self.pages.get(index).ok_or(LookupError::IndexOutOfRange {
            index,
            len: self.pages.len(),
        })
    }

    /// First page whose requested URL contains `snippet`.
    pub fn by_url_snippet(&self, snippet: &str) -> Result<&Page, LookupError> {
        self.first(|p| p.url().contains(snippet))
            .ok_or_else(|| LookupError::UrlSnippet(snippet.to_string()))
    }

    /// First page fetched as `device`.
    pub fn by_device(&self, device: Device) -> Result<&Page, LookupError> {
        self.first(|p| p.device() == device)
            .ok_or(LookupError::Device(device))
    }

    /// First page matching both `snippet` and `device`.
    pub fn by_url_snippet_and_device(
        &self,
        snippet: &str,
        device: Device,
    ) -> Result<&Page, LookupError> {
        self.first(|p| p.device() == device && p.url().contains(snippet))
            .ok_or_else(|| LookupError::UrlSnippetAndDevice {
                snippet: snippet.to_string(),
                device,
            })
    }

    /// The only page, for tests that declare a single fetch.
    pub fn single(&self) -> Result<&Page, LookupError> {
        match self.pages.as_slice() {
            [page] => Ok(page),
            pages => Err(LookupError::NotSingle(pages.len())),
        }
    }

    fn first(&self, predicate: impl Fn(&Page) -> bool) -> Option<&Page> {
        self.pages.iter().find(|&p| predicate(p))
    }
}

impl<'a> IntoIterator for &'a PageRegistry {
    type Item = &'a Page;
    type IntoIter = std::slice::Iter<'a, Page>;

    fn into_iter(self) -> Self::IntoIter {
        self.pages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::TestIdentity;
    use crate::page::tests::page_from;
    use crate::spec::FetchDeclaration;
    use std::path::Path;

    fn registry(decls: Vec<FetchDeclaration>, root: &Path) -> PageRegistry {
        let mut registry = PageRegistry::new();
        for (i, decl) in decls.into_iter().enumerate() {
            registry.push(page_from(
                decl,
                TestIdentity::new("multi", "paco.RegistryTest"),
                &format!("<title>page {i}</title>"),
                Vec::new(),
                root,
            ));
        }
        registry
    }

    fn abc(root: &Path) -> PageRegistry {
        registry(
            vec![
                FetchDeclaration::new("localhost/A"),
                FetchDeclaration::new("localhost/B").device(Device::Mobile),
                FetchDeclaration::new("localhost/C"),
            ],
            root,
        )
    }

    #[test]
    fn test_by_index_follows_declaration_order() {
        let dir = tempfile::tempdir().unwrap();
        let reg = abc(dir.path());

        assert_eq!(reg.len(), 3);
        for (i, suffix) in ["A", "B", "C"].iter().enumerate() {
            assert!(reg.by_index(i).unwrap().url().ends_with(suffix));
        }
        assert_eq!(
            reg.by_index(3).unwrap_err(),
            LookupError::IndexOutOfRange { index: 3, len: 3 }
        );
    }

    #[test]
    fn test_three_page_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let reg = abc(dir.path());

        assert_eq!(reg.by_index(1).unwrap().title(), "page 1");
        assert_eq!(reg.by_device(Device::Mobile).unwrap().title(), "page 1");
        assert_eq!(reg.by_url_snippet("C").unwrap().title(), "page 2");
        assert_eq!(
            reg.by_url_snippet("zzz").unwrap_err(),
            LookupError::UrlSnippet("zzz".into())
        );
    }

    #[test]
    fn test_url_snippet_first_match_wins() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(
            vec![
                FetchDeclaration::new("localhost/example"),
                FetchDeclaration::new("localhost/example").device(Device::Mobile),
            ],
            dir.path(),
        );

        let page = reg.by_url_snippet("example").unwrap();
        assert_eq!(page.user_agent(), Some(Device::Desktop.user_agent()));
    }

    #[test]
    fn test_same_url_different_devices() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(
            vec![
                FetchDeclaration::new("localhost/example2"),
                FetchDeclaration::new("localhost/example2").device(Device::Mobile),
            ],
            dir.path(),
        );

        assert_eq!(reg.len(), 2);
        let desktop = reg.by_url_snippet_and_device("example2", Device::Desktop).unwrap();
        let mobile = reg.by_url_snippet_and_device("example2", Device::Mobile).unwrap();
        assert_eq!(desktop.user_agent(), Some(Device::Desktop.user_agent()));
        assert_eq!(mobile.user_agent(), Some(Device::Mobile.user_agent()));
        assert_ne!(desktop.user_agent(), mobile.user_agent());

        assert_eq!(reg.by_device(Device::Mobile).unwrap().title(), "page 1");
        assert!(matches!(
            reg.by_url_snippet_and_device("wrong-url", Device::Desktop),
            Err(LookupError::UrlSnippetAndDevice { .. })
        ));
    }

    #[test]
    fn test_joint_predicate_not_sequential_filter() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(
            vec![
                FetchDeclaration::new("localhost/shop"),
                FetchDeclaration::new("localhost/blog").device(Device::Mobile),
                FetchDeclaration::new("localhost/shop").device(Device::Mobile),
            ],
            dir.path(),
        );

        let page = reg.by_url_snippet_and_device("shop", Device::Mobile).unwrap();
        assert_eq!(page.title(), "page 2");
    }

    #[test]
    fn test_by_device_misses() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(vec![FetchDeclaration::new("localhost/A")], dir.path());
        assert_eq!(
            reg.by_device(Device::Mobile).unwrap_err(),
            LookupError::Device(Device::Mobile)
        );
    }

    #[test]
    fn test_single() {
        let dir = tempfile::tempdir().unwrap();
        let one = registry(vec![FetchDeclaration::new("localhost/A")], dir.path());
        assert!(one.single().unwrap().url().ends_with("/A"));

        assert_eq!(abc(dir.path()).single().unwrap_err(), LookupError::NotSingle(3));
        assert_eq!(PageRegistry::new().single().unwrap_err(), LookupError::NotSingle(0));
    }

    #[test]
    fn test_iteration_order() {
        let dir = tempfile::tempdir().unwrap();
        let reg = abc(dir.path());
        let urls: Vec<&str> = reg.iter().map(|p| p.url()).collect();
        assert_eq!(
            urls,
            vec!["http://localhost/A", "http://localhost/B", "http://localhost/C"]
        );
        assert_eq!((&reg).into_iter().count(), 3);
    }
}
