//! Credential synthesis for link registration
//!
//! Production deployments plug in a synthesizer that returns the end user's
//! real credentials. The sandbox synthesizer fabricates values that satisfy
//! the institution's declared form schema.

use crate::aggregator::types::Credentials;
use crate::db::sqlite::models::{FormField, InstitutionRecord};
use crate::error::Result;
use rand::Rng;
use regex_syntax::hir::{Class, ClassBytes, ClassBytesRange, ClassUnicode, ClassUnicodeRange, Hir, HirKind};
use tracing::warn;

/// Produces the credential payload submitted when creating a link
pub trait CredentialSynthesizer: Send + Sync {
    fn synthesize(&self, institution: &InstitutionRecord) -> Result<Credentials>;
}

/// A fixed value forced for one field of one institution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialOverride {
    pub institution: &'static str,
    pub field: &'static str,
    pub value: &'static str,
}

/// Known sandbox institutions that reject generated values
pub const SANDBOX_OVERRIDES: &[CredentialOverride] = &[CredentialOverride {
    institution: "ofmockbank_br_retail",
    field: "username_type",
    value: "103",
}];

/// Fabricates credentials from an institution's form fields
pub struct SandboxCredentialSynthesizer {
    placeholder: String,
    fallback_select_code: String,
    max_repeat: u32,
    overrides: Vec<CredentialOverride>,
}

impl Default for SandboxCredentialSynthesizer {
    fn default() -> Self {
        Self {
            placeholder: "test123".to_string(),
            fallback_select_code: "003".to_string(),
            max_repeat: 12,
            overrides: SANDBOX_OVERRIDES.to_vec(),
        }
    }
}

impl SandboxCredentialSynthesizer {
    pub fn with_overrides(mut self, overrides: Vec<CredentialOverride>) -> Self {
        self.overrides = overrides;
        self
    }

    fn value_for(&self, field: &FormField) -> String {
        if field.is_select() {
            let index = field
                .selected_index
                .filter(|i| *i < field.values.len())
                .unwrap_or(0);
            return field
                .values
                .get(index)
                .map(|v| v.code.clone())
                .unwrap_or_else(|| self.fallback_select_code.clone());
        }

        field
            .validation
            .as_deref()
            .and_then(|pattern| self.matching_string(&field.name, pattern))
            .unwrap_or_else(|| self.placeholder.clone())
    }

    fn matching_string(&self, field: &str, pattern: &str) -> Option<String> {
        match self.generator(pattern) {
            Ok(generator) => Some(rand::thread_rng().sample::<String, _>(&generator)),
            Err(e) => {
                warn!(
                    "Cannot generate a value for field '{}' from /{}/: {}; using placeholder",
                    field, pattern, e
                );
                None
            }
        }
    }

    fn generator(&self, pattern: &str) -> std::result::Result<rand_regex::Regex, String> {
        let hir = regex_syntax::Parser::new()
            .parse(strip_anchors(pattern))
            .map_err(|e| e.to_string())?;

        rand_regex::Regex::with_hir(printable_ascii(hir), self.max_repeat).map_err(|e| e.to_string())
    }
}

/// Narrow every character class to printable ASCII (`\d` -> `[0-9]`, `.` -> `[ -~]`)
fn printable_ascii(hir: Hir) -> Hir {
    match hir.into_kind() {
        HirKind::Class(Class::Unicode(mut class)) => {
            class.intersect(&ClassUnicode::new([ClassUnicodeRange::new(' ', '~')]));
            Hir::class(Class::Unicode(class))
        }
        HirKind::Class(Class::Bytes(mut class)) => {
            class.intersect(&ClassBytes::new([ClassBytesRange::new(b' ', b'~')]));
            Hir::class(Class::Bytes(class))
        }
        HirKind::Repetition(mut repetition) => {
            repetition.sub = Box::new(printable_ascii(*repetition.sub));
            Hir::repetition(repetition)
        }
        HirKind::Capture(mut capture) => {
            capture.sub = Box::new(printable_ascii(*capture.sub));
            Hir::capture(capture)
        }
        HirKind::Concat(subs) => Hir::concat(subs.into_iter().map(printable_ascii).collect()),
        HirKind::Alternation(subs) => {
            Hir::alternation(subs.into_iter().map(printable_ascii).collect())
        }
        HirKind::Literal(literal) => Hir::literal(literal.0),
        HirKind::Look(look) => Hir::look(look),
        HirKind::Empty => Hir::empty(),
    }
}

impl CredentialSynthesizer for SandboxCredentialSynthesizer {
    fn synthesize(&self, institution: &InstitutionRecord) -> Result<Credentials> {
        let mut credentials: Credentials = institution
            .form_fields()?
            .iter()
            .map(|field| (field.name.clone(), self.value_for(field)))
            .collect();

        for rule in self
            .overrides
            .iter()
            .filter(|rule| rule.institution == institution.name)
        {
            credentials.insert(rule.field.to_string(), rule.value.to_string());
        }

        Ok(credentials)
    }
}

/// Drop a leading `^` and an unescaped trailing `$`
fn strip_anchors(pattern: &str) -> &str {
    let pattern = pattern.strip_prefix('^').unwrap_or(pattern);
    match pattern.strip_suffix('$') {
        Some(rest) if !rest.ends_with('\\') => rest,
        _ => pattern,
    }
}
