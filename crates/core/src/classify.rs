//! Request classification.
//!
//! Classification is an ordered rule table: each [`Rule`] pairs a
//! [`Predicate`] with the [`RequestClass`] it assigns, and the first matching
//! rule wins. Requests no rule matches are [`RequestClass::Navigable`].

use http::Method;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::request::Request;

/// Handling category of an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestClass {
    /// Any method other than GET.
    NonIdempotent,
    /// Non-http(s) or explicitly excluded scheme.
    ExtensionScheme,
    ApiCall,
    StaticAsset,
    /// Shell and navigation content.
    Navigable,
}

/// Condition evaluated against a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    MethodIsNot(Method),
    /// Scheme is outside `http`/`https`, or listed as excluded.
    SchemeExcluded(Vec<String>),
    PathPrefix(Vec<String>),
    /// Case-insensitive path suffix, e.g. `.woff2`.
    PathSuffix(Vec<String>),
    Always,
}

impl Predicate {
    pub fn matches(&self, request: &Request) -> bool {
        match self {
            Predicate::MethodIsNot(method) => request.method != *method,
            Predicate::SchemeExcluded(excluded) => {
                let scheme = request.scheme();
                !matches!(scheme, "http" | "https") || excluded.iter().any(|s| s.eq_ignore_ascii_case(scheme))
            }
            Predicate::PathPrefix(prefixes) => {
                let path = request.path();
                prefixes.iter().any(|p| path.starts_with(p.as_str()))
            }
            Predicate::PathSuffix(suffixes) => {
                let path = request.path().to_ascii_lowercase();
                suffixes.iter().any(|s| path.ends_with(&s.to_ascii_lowercase()))
            }
            Predicate::Always => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub predicate: Predicate,
    pub class: RequestClass,
}

impl Rule {
    pub fn new(predicate: Predicate, class: RequestClass) -> Self {
        Self { predicate, class }
    }
}

/// Ordered, first-match-wins classifier.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<Rule>,
}

impl Classifier {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// The standard five-rule table.
    pub fn standard(excluded_schemes: &[String], api_prefixes: &[String], static_suffixes: &[String]) -> Self {
        Self::new(vec![
            Rule::new(Predicate::MethodIsNot(Method::GET), RequestClass::NonIdempotent),
            Rule::new(Predicate::SchemeExcluded(excluded_schemes.to_vec()), RequestClass::ExtensionScheme),
            Rule::new(Predicate::PathPrefix(api_prefixes.to_vec()), RequestClass::ApiCall),
            Rule::new(Predicate::PathSuffix(static_suffixes.to_vec()), RequestClass::StaticAsset),
            Rule::new(Predicate::Always, RequestClass::Navigable),
        ])
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::standard(&config.excluded_schemes, &config.api_prefixes, &config.static_suffixes)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn classify(&self, request: &Request) -> RequestClass {
        self.rules
            .iter()
            .find(|rule| rule.predicate.matches(request))
            .map(|rule| rule.class)
            .unwrap_or(RequestClass::Navigable)
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}
