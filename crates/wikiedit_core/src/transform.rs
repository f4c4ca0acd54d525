//! Content transformations applied to each fetched page.
//!
//! The driver accepts any `FnMut(&str) -> Result<String, TransformError>`.
//! [`Pipeline`] is the configurable one: an ordered list of steps compiled from
//! `[[transform]]` config entries or command-line flags.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{SetupError, TransformError};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformStep {
    /// Literal substring replacement, every occurrence.
    Replace { find: String, replace: String },
    /// Regex replacement; `$1`/`${name}` expand capture groups. `limit`
    /// caps the number of replacements, counted from the start of the page.
    RegexReplace {
        pattern: String,
        replacement: String,
        #[serde(default)]
        limit: Option<usize>,
    },
    Prepend { text: String },
    Append { text: String },
    /// Fails the page when `pattern` does not match.
    Require {
        pattern: String,
        #[serde(default)]
        message: Option<String>,
    },
    /// Leaves the page untouched when `pattern` matches.
    SkipIf { pattern: String },
}

#[derive(Debug)]
enum CompiledStep {
    Replace {
        find: String,
        replace: String,
    },
    RegexReplace {
        regex: Regex,
        replacement: String,
        limit: usize,
    },
    Prepend(String),
    Append(String),
    Require {
        regex: Regex,
        message: String,
    },
    SkipIf(Regex),
}

#[derive(Debug, Default)]
pub struct Pipeline {
    steps: Vec<CompiledStep>,
}

impl Pipeline {
    pub fn compile(steps: &[TransformStep]) -> Result<Self, SetupError> {
        let mut compiled = Vec::with_capacity(steps.len());
        for step in steps {
            compiled.push(match step {
                TransformStep::Replace { find, replace } => {
                    if find.is_empty() {
                        return Err(SetupError::Transform(
                            "replace requires a non-empty `find`".to_string(),
                        ));
                    }
                    CompiledStep::Replace {
                        find: find.clone(),
                        replace: replace.clone(),
                    }
                }
                TransformStep::RegexReplace {
                    pattern,
                    replacement,
                    limit,
                } => CompiledStep::RegexReplace {
                    regex: compile_regex(pattern)?,
                    replacement: replacement.clone(),
                    limit: limit.unwrap_or(0),
                },
                TransformStep::Prepend { text } => CompiledStep::Prepend(text.clone()),
                TransformStep::Append { text } => CompiledStep::Append(text.clone()),
                TransformStep::Require { pattern, message } => CompiledStep::Require {
                    regex: compile_regex(pattern)?,
                    message: message
                        .clone()
                        .unwrap_or_else(|| format!("required pattern not found: {pattern}")),
                },
                TransformStep::SkipIf { pattern } => CompiledStep::SkipIf(compile_regex(pattern)?),
            });
        }
        Ok(Self { steps: compiled })
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn apply(&self, content: &str) -> Result<String, TransformError> {
        let mut current = content.to_string();
        for step in &self.steps {
            current = match step {
                CompiledStep::Replace { find, replace } => current.replace(find, replace),
                CompiledStep::RegexReplace {
                    regex,
                    replacement,
                    limit,
                } => regex
                    .replacen(&current, *limit, replacement.as_str())
                    .into_owned(),
                CompiledStep::Prepend(text) => format!("{text}{current}"),
                CompiledStep::Append(text) => format!("{current}{text}"),
                CompiledStep::Require { regex, message } => {
                    if !regex.is_match(&current) {
                        return Err(TransformError::new(message.clone()));
                    }
                    current
                }
                CompiledStep::SkipIf(regex) => {
                    if regex.is_match(&current) {
                        return Ok(content.to_string());
                    }
                    current
                }
            };
        }
        Ok(current)
    }
}

fn compile_regex(pattern: &str) -> Result<Regex, SetupError> {
    Regex::new(pattern).map_err(|error| SetupError::Transform(format!("{pattern}: {error}")))
}

#[cfg(test)]
mod tests {
    use super::{Pipeline, TransformStep};
    use crate::error::SetupError;

    fn regex_replace(pattern: &str, replacement: &str, limit: Option<usize>) -> TransformStep {
        TransformStep::RegexReplace {
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
            limit,
        }
    }

    #[test]
    fn empty_pipeline_is_identity() {
        let pipeline = Pipeline::compile(&[]).expect("compile");
        assert!(pipeline.is_empty());
        assert_eq!(pipeline.apply("{{Ship infobox}}").expect("apply"), "{{Ship infobox}}");
    }

    #[test]
    fn steps_apply_in_order() {
        let pipeline = Pipeline::compile(&[
            TransformStep::Replace {
                find: "Crew".to_string(),
                replace: "crew".to_string(),
            },
            regex_replace(r"\|crew = (\d+) \(Suggested: (\d+)\)", "|crew = $1\n|suggested_crew = $2", None),
            TransformStep::Append {
                text: "\n[[Category:Ships]]".to_string(),
            },
        ])
        .expect("compile");
        assert_eq!(pipeline.len(), 3);

        let output = pipeline
            .apply("{{Ship infobox\n|Crew = 12 (Suggested: 16)\n}}")
            .expect("apply");
        assert_eq!(
            output,
            "{{Ship infobox\n|crew = 12\n|suggested_crew = 16\n}}\n[[Category:Ships]]"
        );
    }

    #[test]
    fn regex_limit_caps_replacements() {
        let pipeline = Pipeline::compile(&[regex_replace("a", "b", Some(2))]).expect("compile");
        assert_eq!(pipeline.apply("aaaa").expect("apply"), "bbaa");
    }

    #[test]
    fn skip_if_returns_original_content() {
        let pipeline = Pipeline::compile(&[
            TransformStep::Prepend {
                text: "changed ".to_string(),
            },
            TransformStep::SkipIf {
                pattern: "suggested_crew".to_string(),
            },
        ])
        .expect("compile");

        let original = "|suggested_crew = 4";
        assert_eq!(pipeline.apply(original).expect("apply"), original);
        assert_eq!(pipeline.apply("|crew = 4").expect("apply"), "changed |crew = 4");
    }

    #[test]
    fn require_fails_when_pattern_is_absent() {
        let pipeline = Pipeline::compile(&[TransformStep::Require {
            pattern: r"\|crew\s*=".to_string(),
            message: Some("param is not present: crew".to_string()),
        }])
        .expect("compile");

        let error = pipeline.apply("{{Ship infobox}}").expect_err("missing param");
        assert_eq!(error.reason, "param is not present: crew");
        assert!(pipeline.apply("|crew = 1").is_ok());
    }

    #[test]
    fn require_has_default_message() {
        let pipeline = Pipeline::compile(&[TransformStep::Require {
            pattern: "needle".to_string(),
            message: None,
        }])
        .expect("compile");
        let error = pipeline.apply("haystack").expect_err("missing");
        assert_eq!(error.reason, "required pattern not found: needle");
    }

    #[test]
    fn invalid_regex_is_a_setup_error() {
        let error = Pipeline::compile(&[regex_replace("(unclosed", "", None)]).expect_err("bad regex");
        assert!(matches!(error, SetupError::Transform(message) if message.starts_with("(unclosed")));
    }

    #[test]
    fn empty_literal_find_is_rejected() {
        let error = Pipeline::compile(&[TransformStep::Replace {
            find: String::new(),
            replace: "x".to_string(),
        }])
        .expect_err("empty find");
        assert!(matches!(error, SetupError::Transform(_)));
    }
}
