//! Which fetch declarations apply to a test.
//!
//! Declarations can sit on the test method or on its class, as a single
//! fetch or as a list. Exactly one scope is used per test, never a merge:
//! method list > method single > class list > class single.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::PacoResult;
use crate::identity::TestIdentity;
use crate::spec::FetchDeclaration;

/// Declarations visible to one test, grouped by where they were declared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeclarationScopes {
    pub method_multiple: Option<Vec<FetchDeclaration>>,
    pub method_single: Option<FetchDeclaration>,
    pub class_multiple: Option<Vec<FetchDeclaration>>,
    pub class_single: Option<FetchDeclaration>,
}

/// Pick the declarations of the highest-precedence scope that is present.
pub fn select_scope(scopes: &DeclarationScopes) -> Vec<FetchDeclaration> {
    if let Some(multiple) = &scopes.method_multiple {
        multiple.clone()
    } else if let Some(single) = &scopes.method_single {
        vec![single.clone()]
    } else if let Some(multiple) = &scopes.class_multiple {
        multiple.clone()
    } else if let Some(single) = &scopes.class_single {
        vec![single.clone()]
    } else {
        Vec::new()
    }
}

/// Supplies the ordered fetch declarations for a test.
pub trait SpecResolver {
    fn resolve(&self, test: &TestIdentity) -> Vec<FetchDeclaration>;
}

impl<F> SpecResolver for F
where
    F: Fn(&TestIdentity) -> Vec<FetchDeclaration>,
{
    fn resolve(&self, test: &TestIdentity) -> Vec<FetchDeclaration> {
        self(test)
    }
}

/// Declarations attached to a test method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodDeclarations {
    pub fetch: Option<FetchDeclaration>,
    pub fetches: Option<Vec<FetchDeclaration>>,
}

/// Declarations attached to a test class and its methods.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassDeclarations {
    pub fetch: Option<FetchDeclaration>,
    pub fetches: Option<Vec<FetchDeclaration>>,
    pub methods: HashMap<String, MethodDeclarations>,
}

/// In-memory resolver keyed by fully qualified class name.
///
/// JSON form:
///
/// ```json
/// {
///   "paco.fetcher.FetchedPageTest": {
///     "fetch": { "url": "localhost/example" },
///     "methods": {
///       "fetch_as_mobile": { "fetch": { "url": "localhost/example2", "device": "MOBILE" } }
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticResolver {
    classes: HashMap<String, ClassDeclarations>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> PacoResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn class_fetch(mut self, class: &str, decl: FetchDeclaration) -> Self {
        self.class_entry(class).fetch = Some(decl);
        self
    }

    pub fn class_fetches(mut self, class: &str, decls: Vec<FetchDeclaration>) -> Self {
        self.class_entry(class).fetches = Some(decls);
        self
    }

    pub fn method_fetch(mut self, class: &str, method: &str, decl: FetchDeclaration) -> Self {
        self.method_entry(class, method).fetch = Some(decl);
        self
    }

    pub fn method_fetches(mut self, class: &str, method: &str, decls: Vec<FetchDeclaration>) -> Self {
        self.method_entry(class, method).fetches = Some(decls);
        self
    }

    /// Every scope that applies to `test`.
    pub fn scopes_for(&self, test: &TestIdentity) -> DeclarationScopes {
        let Some(class) = self.classes.get(&test.class) else {
            return DeclarationScopes::default();
        };
        let method = class.methods.get(&test.method);

        DeclarationScopes {
            method_multiple: method.and_then(|m| m.fetches.clone()),
            method_single: method.and_then(|m| m.fetch.clone()),
            class_multiple: class.fetches.clone(),
            class_single: class.fetch.clone(),
        }
    }

    fn class_entry(&mut self, class: &str) -> &mut ClassDeclarations {
        self.classes.entry(class.to_string()).or_default()
    }

    fn method_entry(&mut self, class: &str, method: &str) -> &mut MethodDeclarations {
        self.class_entry(class)
            .methods
            .entry(method.to_string())
            .or_default()
    }
}

impl SpecResolver for StaticResolver {
    fn resolve(&self, test: &TestIdentity) -> Vec<FetchDeclaration> {
        select_scope(&self.scopes_for(test))
    }
}
