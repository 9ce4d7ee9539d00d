//! Pattern matcher: categorized spans for vital signs and dosages.
//!
//! The registry holds built-in token-sequence rules plus regular-expression
//! rules that can be loaded from configuration. Every rule runs independently
//! and all matches are returned in document order; overlapping matches are
//! resolved later by the normalizer.

use mediscribe_core::{Category, TextSpan};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

use crate::tokens::{Token, tokenize};

/// Error type for rule building.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid regex in rule {id}: {source}")]
    Regex {
        id: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid category in rule {id}: {category}")]
    Category { id: String, category: String },

    #[error("invalid field in rule {id}: {field}")]
    Field { id: String, field: String },
}

/// Definition of a regular-expression matcher rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatternDef {
    /// Unique identifier for this rule.
    pub id: String,

    /// `vital_sign` or `dosage`.
    pub category: String,

    /// Regex; the whole match becomes the span.
    pub pattern: String,
}

impl PatternDef {
    /// Compile into a matcher rule.
    ///
    /// # Errors
    /// Returns an error if the regex or the category is invalid.
    pub fn build(&self) -> Result<PatternRule, BuildError> {
        let category = Category::from_str(&self.category).map_err(|_| BuildError::Category {
            id: self.id.clone(),
            category: self.category.clone(),
        })?;
        let regex = Regex::new(&self.pattern).map_err(|source| BuildError::Regex {
            id: self.id.clone(),
            source,
        })?;

        Ok(PatternRule {
            id: self.id.clone(),
            category,
            regex,
        })
    }
}

/// A compiled regular-expression rule.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub id: String,
    pub category: Category,
    regex: Regex,
}

/// Default regular-expression rules.
#[must_use]
pub fn default_pattern_rules() -> Vec<PatternDef> {
    vec![
        PatternDef {
            id: "oxygen_saturation".to_string(),
            category: "vital_sign".to_string(),
            pattern: r"(?i)\b(?:spo2|oxygen saturation)\s*(?:of|is|:)?\s*\d{2,3}\s*%".to_string(),
        },
        PatternDef {
            id: "interval_dosing".to_string(),
            category: "dosage".to_string(),
            pattern: r"(?i)\bevery\s+\d+\s+hours?\b".to_string(),
        },
    ]
}

#[derive(Debug, Clone, Copy)]
enum TokenTest {
    LikeNum,
    Punct,
    AnyOf(&'static [&'static str]),
}

impl TokenTest {
    fn accepts(self, token: &Token) -> bool {
        match self {
            Self::LikeNum => token.like_num(),
            Self::Punct => token.is_punct(),
            Self::AnyOf(words) => words.contains(&token.lower.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Step {
    test: TokenTest,
    optional: bool,
}

const fn req(test: TokenTest) -> Step {
    Step {
        test,
        optional: false,
    }
}

const fn opt(test: TokenTest) -> Step {
    Step {
        test,
        optional: true,
    }
}

/// A token-sequence template.
#[derive(Debug, Clone, Copy)]
pub struct TokenRule {
    pub id: &'static str,
    pub category: Category,
    steps: &'static [Step],
}

const NUM: TokenTest = TokenTest::LikeNum;
const PUNCT: TokenTest = TokenTest::Punct;

const TOKEN_RULES: &[TokenRule] = &[
    TokenRule {
        id: "temperature_unit",
        category: Category::VitalSign,
        steps: &[
            req(NUM),
            req(TokenTest::AnyOf(&["fahrenheit", "f", "celsius", "c"])),
        ],
    },
    TokenRule {
        id: "temperature_reading",
        category: Category::VitalSign,
        steps: &[
            req(TokenTest::AnyOf(&["temperature"])),
            opt(PUNCT),
            req(NUM),
        ],
    },
    TokenRule {
        id: "bp_reading",
        category: Category::VitalSign,
        steps: &[req(TokenTest::AnyOf(&["bp"])), opt(PUNCT), req(NUM)],
    },
    TokenRule {
        id: "blood_pressure_reading",
        category: Category::VitalSign,
        steps: &[
            req(TokenTest::AnyOf(&["blood", "pressure"])),
            opt(PUNCT),
            req(NUM),
        ],
    },
    TokenRule {
        id: "pressure_ratio",
        category: Category::VitalSign,
        steps: &[req(NUM), req(TokenTest::AnyOf(&["/"])), req(NUM)],
    },
    TokenRule {
        id: "rate_mention",
        category: Category::VitalSign,
        steps: &[
            req(TokenTest::AnyOf(&["heart", "pulse"])),
            req(TokenTest::AnyOf(&["rate"])),
        ],
    },
    TokenRule {
        id: "amount_unit",
        category: Category::Dosage,
        steps: &[req(NUM), req(TokenTest::AnyOf(&["mg", "mcg", "g", "ml"]))],
    },
    TokenRule {
        id: "daily_frequency",
        category: Category::Dosage,
        steps: &[
            req(TokenTest::AnyOf(&["twice", "three", "once"])),
            req(TokenTest::AnyOf(&["daily", "day"])),
        ],
    },
    TokenRule {
        id: "times_frequency",
        category: Category::Dosage,
        steps: &[
            req(NUM),
            req(TokenTest::AnyOf(&["times"])),
            req(TokenTest::AnyOf(&["daily", "day", "per"])),
        ],
    },
];

/// Longest match of `steps` starting at token `at`; returns the end index.
fn match_steps(steps: &[Step], tokens: &[Token], at: usize) -> Option<usize> {
    let Some((step, rest)) = steps.split_first() else {
        return Some(at);
    };
    let consumed = tokens
        .get(at)
        .filter(|t| step.test.accepts(t))
        .and_then(|_| match_steps(rest, tokens, at + 1));
    if consumed.is_some() || !step.optional {
        return consumed;
    }
    match_steps(rest, tokens, at)
}

impl TokenRule {
    fn find(&self, text: &str, tokens: &[Token]) -> Vec<TextSpan> {
        (0..tokens.len())
            .filter_map(|i| {
                let end = match_steps(self.steps, tokens, i)?;
                let last = tokens.get(end.checked_sub(1)?)?;
                TextSpan::trimmed(text, tokens[i].start, last.end)
            })
            .collect()
    }
}

/// One categorized span emitted by the matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    pub category: Category,
    pub rule: String,
    pub span: TextSpan,
}

#[derive(Debug, Clone)]
enum Rule {
    Tokens(TokenRule),
    Regex(PatternRule),
}

/// Stateless registry of categorized rules.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    rules: Vec<Rule>,
}

impl PatternMatcher {
    /// Built-in token rules followed by `defs`. Rules that fail to build are
    /// logged and skipped.
    #[must_use]
    pub fn new(defs: &[PatternDef]) -> Self {
        let mut rules: Vec<Rule> = TOKEN_RULES.iter().copied().map(Rule::Tokens).collect();
        for def in defs {
            match def.build() {
                Ok(rule) => rules.push(Rule::Regex(rule)),
                Err(e) => warn!("Skipping pattern rule: {e}"),
            }
        }
        debug!("Pattern matcher registered {} rules", rules.len());

        Self { rules }
    }

    /// Matcher with the default regular-expression rules.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(&default_pattern_rules())
    }

    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// All matches ordered by position (start, then end). Matches at the same
    /// position keep rule registration order.
    #[must_use]
    pub fn find(&self, text: &str) -> Vec<PatternMatch> {
        let tokens = tokenize(text);
        let mut matches = Vec::new();

        for rule in &self.rules {
            match rule {
                Rule::Tokens(rule) => {
                    matches.extend(rule.find(text, &tokens).into_iter().map(|span| {
                        PatternMatch {
                            category: rule.category,
                            rule: rule.id.to_string(),
                            span,
                        }
                    }));
                }
                Rule::Regex(rule) => {
                    matches.extend(rule.regex.find_iter(text).filter_map(|m| {
                        TextSpan::trimmed(text, m.start(), m.end()).map(|span| PatternMatch {
                            category: rule.category,
                            rule: rule.id.clone(),
                            span,
                        })
                    }));
                }
            }
        }
        matches.sort_by_key(|m| (m.span.start, m.span.end));

        matches
    }

    /// Texts of matches in one category.
    #[must_use]
    pub fn find_texts(&self, text: &str, category: Category) -> Vec<String> {
        self.find(text)
            .into_iter()
            .filter(|m| m.category == category)
            .map(|m| m.span.text)
            .collect()
    }
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self::with_defaults()
    }
}
