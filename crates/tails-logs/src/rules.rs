use regex::{Regex, RegexBuilder};
use thiserror::Error;

use tails_types::{PLAIN, RuleSpec};

/// Inputs the final rule must match (non-empty) to count as a catch-all
const CATCH_ALL_PROBES: &[&str] = &[
    "a", "Z", "7", " ", "\t", "\n", "\r", "-", "é", "日志", "!FORCE_SHUTDOWN!",
];

/// Errors raised while building a rule set
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule set is empty - a catch-all rule is required")]
    Empty,

    #[error("rule '{tag}' has an invalid pattern: {source}")]
    InvalidPattern {
        tag: String,
        #[source]
        source: regex::Error,
    },

    #[error("last rule '{tag}' is not a catch-all: it does not match {probe:?}")]
    MissingCatchAll { tag: String, probe: String },
}

/// A compiled highlighting rule
#[derive(Clone, Debug)]
pub struct Rule {
    tag: String,
    regex: Regex,
}

impl Rule {
    /// Compile a rule; patterns are always case-insensitive
    pub fn new(spec: &RuleSpec) -> Result<Self, RuleError> {
        let regex = RegexBuilder::new(&spec.pattern)
            .case_insensitive(true)
            .multi_line(true)
            .build()
            .map_err(|source| RuleError::InvalidPattern {
                tag: spec.tag.clone(),
                source,
            })?;

        Ok(Self {
            tag: spec.tag.clone(),
            regex,
        })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Byte range of the first non-empty match.
    ///
    /// `Regex::find` keeps no scan position between calls, so the same rule
    /// can be applied to any slice in any order. Zero-width matches count as
    /// no match.
    pub fn find(&self, text: &str) -> Option<(usize, usize)> {
        self.regex
            .find(text)
            .filter(|m| !m.is_empty())
            .map(|m| (m.start(), m.end()))
    }
}

/// Ordered rules, highest priority first, ending in a catch-all
#[derive(Clone, Debug)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Build and validate a rule set
    pub fn new<I>(specs: I) -> Result<Self, RuleError>
    where
        I: IntoIterator<Item = RuleSpec>,
    {
        let rules = specs
            .into_iter()
            .map(|spec| Rule::new(&spec))
            .collect::<Result<Vec<_>, _>>()?;

        let last = rules.last().ok_or(RuleError::Empty)?;
        if let Some(probe) = CATCH_ALL_PROBES
            .iter()
            .find(|probe| last.find(probe).is_none())
        {
            return Err(RuleError::MissingCatchAll {
                tag: last.tag.clone(),
                probe: probe.to_string(),
            });
        }

        Ok(Self { rules })
    }

    /// The default severity colouring
    pub fn builtin() -> Self {
        Self::new(Self::builtin_specs()).expect("built-in rules are valid")
    }

    /// Rule specs behind [`RuleSet::builtin`], highest priority first
    pub fn builtin_specs() -> Vec<RuleSpec> {
        let octet = r"(25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9]?[0-9])";
        vec![
            RuleSpec::new(
                "info",
                r"(\d+[-|/]\d+[-|/]\d+\s\d\d?:\d\d?:\d\d?)|info",
            ),
            RuleSpec::new("notice", "notice"),
            RuleSpec::new("success", "running|success|sucess|starting|ok|completed?"),
            RuleSpec::new("notification", "notification"),
            RuleSpec::new("address", format!(r"{o}\.{o}\.{o}\.{o}", o = octet)),
            RuleSpec::new("warning", "warning"),
            RuleSpec::new("error", "error|fail|problem|issue"),
            RuleSpec::new(PLAIN, r"(?s).+"),
        ]
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule (by priority, not by position) matching anywhere in `text`
    pub fn first_match(&self, text: &str) -> Option<(&Rule, usize, usize)> {
        self.rules
            .iter()
            .find_map(|rule| rule.find(text).map(|(start, end)| (rule, start, end)))
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::builtin()
    }
}
