//! URL templates with named `{placeholder}` substitution.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::config::Alignment;
use crate::error::SpecError;
use crate::types::{AxisValue, Scalar};

use super::align::{aligned_len, fill_forward_get};

// `{{` and `}}` are literal braces; anything else in braces is a name.
// The pattern is a literal and always compiles.
#[allow(clippy::expect_used)]
fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{|\}\}|\{([^{}]*)\}").expect("placeholder pattern"))
}

/// A URL template plus per-placeholder arguments
///
/// Each argument is a scalar or a flat list; all arguments are aligned by
/// fill-forward before substitution, so `{a}` with one value and `{b}` with
/// two values produce two URLs.
///
/// # Examples
///
/// ```
/// use reqsweep::expand::UrlTemplate;
/// use reqsweep::types::AxisValue;
///
/// let urls = UrlTemplate::new("http://h/{a}/{b}")
///     .arg("a", "x")
///     .arg("b", AxisValue::list(["p", "q"]))
///     .expand()
///     .unwrap();
/// assert_eq!(urls, vec!["http://h/x/p", "http://h/x/q"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UrlTemplate {
    template: String,
    args: BTreeMap<String, AxisValue>,
    alignment: Alignment,
}

impl UrlTemplate {
    /// Template without arguments
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            args: BTreeMap::new(),
            alignment: Alignment::FillForward,
        }
    }

    /// Template with a prepared argument map
    pub fn with_args(template: impl Into<String>, args: BTreeMap<String, AxisValue>) -> Self {
        Self {
            template: template.into(),
            args,
            alignment: Alignment::FillForward,
        }
    }

    /// Add or replace one argument
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<AxisValue>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    /// Choose how arguments of different lengths are combined
    pub fn alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// The raw template
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Placeholder names in order of appearance (escaped braces excluded)
    pub fn placeholders(&self) -> Vec<String> {
        placeholder_pattern()
            .captures_iter(&self.template)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
            .collect()
    }

    /// Substitute every aligned argument tuple into the template
    ///
    /// With no arguments at all the template is returned untouched.
    ///
    /// # Errors
    ///
    /// - [`SpecError::UnresolvedPlaceholder`] if a placeholder has no argument
    /// - [`SpecError::NestedSequence`] if an argument list contains a list
    /// - [`SpecError::MismatchedAxisLengths`] under strict alignment
    pub fn expand(&self) -> Result<Vec<String>, SpecError> {
        if self.args.is_empty() {
            return Ok(vec![self.template.clone()]);
        }

        if let Some(name) = self
            .placeholders()
            .into_iter()
            .find(|name| !self.args.contains_key(name))
        {
            return Err(SpecError::UnresolvedPlaceholder {
                name,
                template: self.template.clone(),
            });
        }

        let columns = self
            .args
            .iter()
            .map(|(name, value)| Ok((name.as_str(), value.flatten("url", name)?)))
            .collect::<Result<Vec<(&str, Vec<Scalar>)>, SpecError>>()?;

        let lengths: Vec<usize> = columns.iter().map(|(_, values)| values.len()).collect();
        let len = aligned_len(&lengths, self.alignment)?;

        Ok((0..len)
            .map(|i| {
                let row: BTreeMap<&str, Scalar> = columns
                    .iter()
                    .map(|(name, values)| (*name, fill_forward_get(values, i)))
                    .collect();
                self.render(&row)
            })
            .collect())
    }

    fn render(&self, row: &BTreeMap<&str, Scalar>) -> String {
        placeholder_pattern()
            .replace_all(&self.template, |caps: &Captures<'_>| match caps.get(1) {
                Some(name) => row
                    .get(name.as_str())
                    .map(ToString::to_string)
                    .unwrap_or_default(),
                None if &caps[0] == "{{" => "{".to_string(),
                None => "}".to_string(),
            })
            .into_owned()
    }
}
