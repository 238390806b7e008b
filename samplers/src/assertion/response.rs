//! Pattern assertion against one field of a sample result

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use planbench_core::{Assertion, AssertionResult, SampleContext, SampleResult};

use super::AssertionConfigError;

/// Which part of the result is tested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseField {
    /// Response code
    Code,
    /// Response message
    Message,
    /// Response payload
    Data,
    /// Sample label
    Label,
}

impl ResponseField {
    fn extract<'r>(&self, result: &'r SampleResult) -> &'r str {
        match self {
            ResponseField::Code => &result.response_code,
            ResponseField::Message => &result.response_message,
            ResponseField::Data => &result.response_data,
            ResponseField::Label => &result.label,
        }
    }
}

impl fmt::Display for ResponseField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResponseField::Code => "code",
            ResponseField::Message => "message",
            ResponseField::Data => "text",
            ResponseField::Label => "label",
        };
        f.write_str(name)
    }
}

/// How a pattern is compared with the field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRule {
    /// Field equals the pattern exactly
    Equals,
    /// Regex matches somewhere in the field
    Contains,
    /// Regex matches the whole field
    Matches,
    /// Field contains the pattern as plain text
    Substring,
}

impl MatchRule {
    fn is_regex(&self) -> bool {
        matches!(self, MatchRule::Contains | MatchRule::Matches)
    }

    fn verb(&self) -> &'static str {
        match self {
            MatchRule::Equals => "equal",
            MatchRule::Contains => "contain",
            MatchRule::Matches => "match",
            MatchRule::Substring => "contain substring",
        }
    }
}

#[derive(Debug, Clone)]
struct Pattern {
    text: String,
    regex: Option<Regex>,
}

impl Pattern {
    fn test(&self, rule: MatchRule, value: &str) -> bool {
        match (rule, &self.regex) {
            (MatchRule::Equals, _) => value == self.text,
            (MatchRule::Substring, _) => value.contains(&self.text),
            (_, Some(regex)) => regex.is_match(value),
            (_, None) => false,
        }
    }
}

/// Tests a result field against one or more patterns
///
/// By default every pattern must hold (`AND`); [`ResponseAssertion::any`]
/// switches to `OR`. [`ResponseAssertion::negate`] inverts each pattern test.
///
/// # Example
///
/// ```ignore
/// let ok = ResponseAssertion::new(ResponseField::Code, MatchRule::Equals, ["200"])?;
/// let no_errors = ResponseAssertion::new(ResponseField::Data, MatchRule::Contains, ["(?i)error"])?
///     .negate();
/// ```
#[derive(Debug, Clone)]
pub struct ResponseAssertion {
    field: ResponseField,
    rule: MatchRule,
    patterns: Vec<Pattern>,
    negate: bool,
    any: bool,
}

impl ResponseAssertion {
    /// Build an assertion; regex rules compile their patterns here
    pub fn new<I, S>(field: ResponseField, rule: MatchRule, patterns: I) -> Result<Self, AssertionConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns = patterns
            .into_iter()
            .map(|text| {
                let text = text.into();
                let regex = if rule.is_regex() {
                    let source = match rule {
                        MatchRule::Matches => format!("^(?:{text})$"),
                        _ => text.clone(),
                    };
                    let compiled = Regex::new(&source).map_err(|source| {
                        AssertionConfigError::InvalidPattern {
                            pattern: text.clone(),
                            source,
                        }
                    })?;
                    Some(compiled)
                } else {
                    None
                };
                Ok(Pattern { text, regex })
            })
            .collect::<Result<Vec<_>, AssertionConfigError>>()?;

        if patterns.is_empty() {
            return Err(AssertionConfigError::NoPatterns);
        }

        Ok(Self {
            field,
            rule,
            patterns,
            negate: false,
            any: false,
        })
    }

    /// Shorthand for an exact response code check
    pub fn code(expected: impl Into<String>) -> Self {
        Self {
            field: ResponseField::Code,
            rule: MatchRule::Equals,
            patterns: vec![Pattern {
                text: expected.into(),
                regex: None,
            }],
            negate: false,
            any: false,
        }
    }

    /// Invert every pattern test
    pub fn negate(mut self) -> Self {
        self.negate = true;
        self
    }

    /// Pass when any pattern holds instead of all
    pub fn any(mut self) -> Self {
        self.any = true;
        self
    }

    fn failure_message(&self, pattern: &Pattern, value: &str) -> String {
        let not = if self.negate { "not " } else { "" };
        format!(
            "Test failed: {} expected {}to {} /{}/ but was /{}/",
            self.field,
            not,
            self.rule.verb(),
            pattern.text,
            value
        )
    }
}

impl Assertion for ResponseAssertion {
    fn check(&self, result: &SampleResult, _ctx: &SampleContext<'_>) -> AssertionResult {
        let value = self.field.extract(result);
        let holds = |pattern: &Pattern| pattern.test(self.rule, value) != self.negate;

        if self.any {
            if self.patterns.iter().any(holds) {
                return AssertionResult::pass();
            }
            let expected: Vec<_> = self.patterns.iter().map(|p| p.text.as_str()).collect();
            let not = if self.negate { "not " } else { "" };
            return AssertionResult::fail(format!(
                "Test failed: {} expected {}to {} any of /{}/ but was /{}/",
                self.field,
                not,
                self.rule.verb(),
                expected.join("/ OR /"),
                value
            ));
        }

        match self.patterns.iter().find(|p| !holds(*p)) {
            Some(pattern) => AssertionResult::fail(self.failure_message(pattern, value)),
            None => AssertionResult::pass(),
        }
    }
}
