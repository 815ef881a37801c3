//! XML response validation.
//!
//! Well-formedness is checked in-process with `quick-xml`; schema
//! conformance is delegated to an [`XmlValidator`], by default `xmllint`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::{NsReader, Reader};

use crate::error::ValidationError;

/// Schema language URI of W3C XML Schema.
pub const W3C_XML_SCHEMA_NS_URI: &str = "http://www.w3.org/2001/XMLSchema";

/// Schema language URI of RELAX NG.
pub const RELAXNG_NS_URI: &str = "http://relaxng.org/ns/structure/1.0";

/// How a document is checked against its schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlValidationOptions {
    /// Reject element prefixes that are not bound to a namespace.
    pub namespace_aware: bool,
    pub schema_language: String,
}

impl Default for XmlValidationOptions {
    fn default() -> Self {
        Self {
            namespace_aware: true,
            schema_language: W3C_XML_SCHEMA_NS_URI.to_string(),
        }
    }
}

/// Validates a document against a schema file.
pub trait XmlValidator: Send + Sync {
    fn validate(
        &self,
        xml: &[u8],
        schema: &Path,
        options: &XmlValidationOptions,
    ) -> Result<(), ValidationError>;
}

/// Check that `xml` is well formed: one root, balanced tags, and with
/// `namespace_aware`, no unbound element prefixes.
pub fn check_well_formed(xml: &[u8], namespace_aware: bool) -> Result<(), ValidationError> {
    if namespace_aware {
        check_namespaced(xml)
    } else {
        check_plain(xml)
    }
}

#[derive(Default)]
struct Balance {
    depth: usize,
    roots: usize,
}

impl Balance {
    fn open(&mut self) {
        if self.depth == 0 {
            self.roots += 1;
        }
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn empty(&mut self) {
        if self.depth == 0 {
            self.roots += 1;
        }
    }

    fn finish(&self, position: u64) -> Result<(), ValidationError> {
        if self.depth != 0 {
            return Err(ValidationError::Malformed {
                position,
                reason: format!("{} unclosed element(s)", self.depth),
            });
        }
        match self.roots {
            1 => Ok(()),
            0 => Err(ValidationError::Malformed {
                position,
                reason: "no root element".into(),
            }),
            n => Err(ValidationError::Malformed {
                position,
                reason: format!("{n} root elements"),
            }),
        }
    }
}

fn check_plain(xml: &[u8]) -> Result<(), ValidationError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut balance = Balance::default();

    loop {
        let event = match reader.read_event_into(&mut buf) {
            Ok(event) => event,
            Err(e) => {
                return Err(ValidationError::Malformed {
                    position: reader.error_position() as u64,
                    reason: e.to_string(),
                })
            }
        };
        match event {
            Event::Start(_) => balance.open(),
            Event::End(_) => balance.close(),
            Event::Empty(_) => balance.empty(),
            Event::Eof => return balance.finish(reader.buffer_position() as u64),
            _ => {}
        }
        buf.clear();
    }
}

fn check_namespaced(xml: &[u8]) -> Result<(), ValidationError> {
    let mut reader = NsReader::from_reader(xml);
    let mut buf = Vec::new();
    let mut balance = Balance::default();

    loop {
        let (resolved, event) = match reader.read_resolved_event_into(&mut buf) {
            Ok(pair) => pair,
            Err(e) => {
                return Err(ValidationError::Malformed {
                    position: reader.error_position() as u64,
                    reason: e.to_string(),
                })
            }
        };
        if let ResolveResult::Unknown(prefix) = resolved {
            return Err(ValidationError::UnboundPrefix(
                String::from_utf8_lossy(&prefix).into_owned(),
            ));
        }
        match event {
            Event::Start(_) => balance.open(),
            Event::End(_) => balance.close(),
            Event::Empty(_) => balance.empty(),
            Event::Eof => return balance.finish(reader.buffer_position() as u64),
            _ => {}
        }
        buf.clear();
    }
}

/// Validator backed by the `xmllint` binary from libxml2.
#[derive(Debug, Clone, Default)]
pub struct XmllintValidator {
    binary: Option<PathBuf>,
}

impl XmllintValidator {
    /// Look `xmllint` up on `PATH` at validation time.
    pub fn new() -> Self {
        Self { binary: None }
    }

    /// Use an explicit `xmllint` binary.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: Some(binary.into()),
        }
    }

    /// Whether an `xmllint` binary can be found.
    pub fn is_available(&self) -> bool {
        self.locate().is_ok()
    }

    fn locate(&self) -> Result<PathBuf, ValidationError> {
        match &self.binary {
            Some(path) => Ok(path.clone()),
            None => which::which("xmllint")
                .map_err(|e| ValidationError::ValidatorUnavailable(format!("xmllint: {e}"))),
        }
    }
}

impl XmlValidator for XmllintValidator {
    fn validate(
        &self,
        xml: &[u8],
        schema: &Path,
        options: &XmlValidationOptions,
    ) -> Result<(), ValidationError> {
        let flag = match options.schema_language.as_str() {
            W3C_XML_SCHEMA_NS_URI => "--schema",
            RELAXNG_NS_URI => "--relaxng",
            other => return Err(ValidationError::UnsupportedSchemaLanguage(other.to_string())),
        };

        check_well_formed(xml, options.namespace_aware)?;

        let binary = self.locate()?;
        let mut child = Command::new(&binary)
            .arg("--noout")
            .arg(flag)
            .arg(schema)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ValidationError::ValidatorUnavailable(format!("{}: {e}", binary.display())))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(xml)
                .map_err(|e| ValidationError::ValidatorUnavailable(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| ValidationError::ValidatorUnavailable(e.to_string()))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(ValidationError::SchemaMismatch {
                xsd: schema.display().to_string(),
                details: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOTE_XSD: &str = r#"<?xml version="1.0"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="note">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="to" type="xs:string"/>
        <xs:element name="body" type="xs:string"/>
      </xs:sequence>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;

    #[test]
    fn test_well_formed_documents_pass() {
        let xml = br#"<?xml version="1.0"?><note><to>Tove</to><body>hi</body></note>"#;
        assert!(check_well_formed(xml, true).is_ok());
        assert!(check_well_formed(xml, false).is_ok());

        let ns = br#"<a:root xmlns:a="urn:a"><a:child/></a:root>"#;
        assert!(check_well_formed(ns, true).is_ok());
    }

    #[test]
    fn test_mismatched_tags_fail() {
        let xml = b"<note><to>Tove</note>";
        assert!(matches!(
            check_well_formed(xml, false),
            Err(ValidationError::Malformed { .. })
        ));
    }

    #[test]
    fn test_unclosed_and_rootless_documents_fail() {
        assert!(check_well_formed(b"<note><to>x</to>", false).is_err());
        assert!(check_well_formed(b"just text", false).is_err());
        assert!(check_well_formed(b"<a/><b/>", false).is_err());
    }

    #[test]
    fn test_unbound_prefix_only_fails_when_namespace_aware() {
        let xml = b"<x:root><x:child/></x:root>";
        assert!(matches!(
            check_well_formed(xml, true),
            Err(ValidationError::UnboundPrefix(p)) if p == "x"
        ));
        assert!(check_well_formed(xml, false).is_ok());
    }

    #[test]
    fn test_unknown_schema_language_rejected() {
        let validator = XmllintValidator::with_binary("/nonexistent/xmllint");
        let options = XmlValidationOptions {
            namespace_aware: true,
            schema_language: "urn:schematron".into(),
        };
        assert!(matches!(
            validator.validate(b"<a/>", Path::new("a.xsd"), &options),
            Err(ValidationError::UnsupportedSchemaLanguage(_))
        ));
    }

    #[test]
    fn test_missing_binary_is_reported() {
        let validator = XmllintValidator::with_binary("/nonexistent/xmllint");
        assert!(matches!(
            validator.validate(b"<a/>", Path::new("a.xsd"), &XmlValidationOptions::default()),
            Err(ValidationError::ValidatorUnavailable(_))
        ));
    }

    #[test]
    fn test_schema_validation_with_xmllint() {
        let validator = XmllintValidator::new();
        if !validator.is_available() {
            eprintln!("xmllint not installed, skipping");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let xsd = dir.path().join("note.xsd");
        std::fs::write(&xsd, NOTE_XSD).unwrap();

        let valid = b"<note><to>Tove</to><body>hi</body></note>";
        assert!(validator
            .validate(valid, &xsd, &XmlValidationOptions::default())
            .is_ok());

        let invalid = b"<note><body>hi</body></note>";
        assert!(matches!(
            validator.validate(invalid, &xsd, &XmlValidationOptions::default()),
            Err(ValidationError::SchemaMismatch { .. })
        ));
    }
}
