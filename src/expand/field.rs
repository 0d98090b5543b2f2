//! Static/dynamic field specifications (params, headers, data, cookies).

use std::collections::BTreeMap;

use crate::error::SpecError;
use crate::types::{AxisValue, Fields, Scalar};

/// One request field with fixed values and at most one varying key
///
/// Static values appear in every expanded mapping; the dynamic key takes each
/// of its values in turn, producing one mapping per value.
///
/// # Examples
///
/// ```
/// use reqsweep::expand::FieldSpec;
/// use reqsweep::types::{AxisValue, Scalar};
///
/// let param = FieldSpec::builder("param")
///     .fixed("param_a", "a")
///     .varying("b", AxisValue::list([1, 2]))
///     .build()
///     .unwrap();
///
/// let expanded = param.expand();
/// assert_eq!(expanded.len(), 2);
/// assert_eq!(expanded[1]["b"], Scalar::Int(2));
/// assert_eq!(expanded[1]["param_a"], Scalar::from("a"));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldSpec {
    fixed: Fields,
    dynamic: Option<(String, Vec<Scalar>)>,
}

impl FieldSpec {
    /// A spec with no values; expands to a single empty mapping
    pub fn empty() -> Self {
        Self::default()
    }

    /// Start building a spec for the named axis (used in error messages)
    pub fn builder(field: impl Into<String>) -> FieldSpecBuilder {
        FieldSpecBuilder {
            field: field.into(),
            fixed: BTreeMap::new(),
            dynamic: BTreeMap::new(),
        }
    }

    /// Validate raw static/dynamic mappings
    ///
    /// # Errors
    ///
    /// - [`SpecError::TooManyDynamicAxes`] if `dynamic` has more than one key
    /// - [`SpecError::DynamicValueMustBeSequence`] if a dynamic value is a scalar
    /// - [`SpecError::StaticValueMustBeScalar`] if a static value is a list
    /// - [`SpecError::NestedSequence`] if a dynamic list contains a list
    pub fn new(
        field: &str,
        fixed: BTreeMap<String, AxisValue>,
        dynamic: BTreeMap<String, AxisValue>,
    ) -> Result<Self, SpecError> {
        let fixed = fixed
            .into_iter()
            .map(|(key, value)| match value {
                AxisValue::Scalar(s) => Ok((key, s)),
                AxisValue::List(_) => Err(SpecError::StaticValueMustBeScalar {
                    field: field.to_string(),
                    key,
                }),
            })
            .collect::<Result<Fields, _>>()?;

        for (key, value) in &dynamic {
            if matches!(value, AxisValue::Scalar(_)) {
                return Err(SpecError::DynamicValueMustBeSequence {
                    field: field.to_string(),
                    key: key.clone(),
                });
            }
        }

        if dynamic.len() > 1 {
            return Err(SpecError::TooManyDynamicAxes {
                field: field.to_string(),
                count: dynamic.len(),
            });
        }

        let dynamic = match dynamic.into_iter().next() {
            Some((key, value)) => {
                let values = value.flatten(field, &key)?;
                Some((key, values))
            }
            None => None,
        };

        Ok(Self { fixed, dynamic })
    }

    /// Values shared by every expanded mapping
    pub fn fixed(&self) -> &Fields {
        &self.fixed
    }

    /// The varying key and its values, if any
    pub fn dynamic(&self) -> Option<(&str, &[Scalar])> {
        self.dynamic
            .as_ref()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    /// Number of mappings [`expand`](Self::expand) produces (never zero)
    pub fn mapping_count(&self) -> usize {
        self.dynamic
            .as_ref()
            .map_or(1, |(_, values)| values.len().max(1))
    }

    /// One mapping per dynamic value, in order; a single static-only mapping
    /// when there is no dynamic key or its list is empty.
    pub fn expand(&self) -> Vec<Fields> {
        match &self.dynamic {
            Some((key, values)) if !values.is_empty() => values
                .iter()
                .map(|value| {
                    let mut fields = self.fixed.clone();
                    fields.insert(key.clone(), value.clone());
                    fields
                })
                .collect(),
            _ => vec![self.fixed.clone()],
        }
    }
}

/// Builder for [`FieldSpec`]; validation happens in [`build`](Self::build)
#[derive(Debug)]
pub struct FieldSpecBuilder {
    field: String,
    fixed: BTreeMap<String, AxisValue>,
    dynamic: BTreeMap<String, AxisValue>,
}

impl FieldSpecBuilder {
    /// Add a value present in every mapping
    pub fn fixed(mut self, key: impl Into<String>, value: impl Into<AxisValue>) -> Self {
        self.fixed.insert(key.into(), value.into());
        self
    }

    /// Add a varying key
    pub fn varying(mut self, key: impl Into<String>, values: impl Into<AxisValue>) -> Self {
        self.dynamic.insert(key.into(), values.into());
        self
    }

    /// Validate and produce the spec
    pub fn build(self) -> Result<FieldSpec, SpecError> {
        FieldSpec::new(&self.field, self.fixed, self.dynamic)
    }
}
