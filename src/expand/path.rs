//! Delimiter-joined path segments with one varying position.

use crate::error::SpecError;
use crate::types::{AxisValue, Scalar};

#[derive(Clone, Debug, PartialEq)]
enum Segment {
    Fixed(Scalar),
    Varying(Vec<Scalar>),
}

/// An ordered list of path segments, at most one of which varies
///
/// Expands to one joined string per value of the varying segment. Empty
/// segments are skipped while joining, so an empty varying list simply drops
/// out of the path.
///
/// # Examples
///
/// ```
/// use reqsweep::expand::PathSpec;
/// use reqsweep::types::AxisValue;
///
/// let folders = PathSpec::from_segments(
///     vec![AxisValue::from("1"), AxisValue::list(["2", "3"])],
///     "/",
/// )
/// .unwrap();
/// assert_eq!(folders.expand(), vec!["1/2", "1/3"]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PathSpec {
    segments: Vec<Segment>,
    delimiter: String,
}

impl PathSpec {
    /// Fixed leading segments followed by one varying segment
    ///
    /// `fixed` may be a scalar (one segment) or a flat list; `dynamic` must be
    /// a flat list, possibly empty.
    pub fn new(
        fixed: impl Into<AxisValue>,
        dynamic: Vec<AxisValue>,
        delimiter: impl Into<String>,
    ) -> Result<Self, SpecError> {
        let fixed = fixed.into();
        let mut segments = Vec::new();
        match fixed {
            AxisValue::Scalar(s) => segments.push(Segment::Fixed(s)),
            AxisValue::List(items) => {
                for (position, item) in items.into_iter().enumerate() {
                    match item {
                        AxisValue::Scalar(s) => segments.push(Segment::Fixed(s)),
                        AxisValue::List(_) => {
                            return Err(SpecError::NestedSequence {
                                field: "path".into(),
                                key: format!("static[{position}]"),
                            });
                        }
                    }
                }
            }
        }
        let dynamic = AxisValue::List(dynamic).flatten("path", "dynamic")?;
        segments.push(Segment::Varying(dynamic));

        Ok(Self {
            segments,
            delimiter: delimiter.into(),
        })
    }

    /// Free-form segments; any one of them may be a flat list
    ///
    /// # Errors
    ///
    /// - [`SpecError::TooManyDynamicAxes`] if more than one segment is a list
    /// - [`SpecError::NestedSequence`] if a list segment contains a list
    pub fn from_segments(
        segments: Vec<AxisValue>,
        delimiter: impl Into<String>,
    ) -> Result<Self, SpecError> {
        let varying = segments
            .iter()
            .filter(|s| matches!(s, AxisValue::List(_)))
            .count();
        if varying > 1 {
            return Err(SpecError::TooManyDynamicAxes {
                field: "path".into(),
                count: varying,
            });
        }

        let segments = segments
            .into_iter()
            .enumerate()
            .map(|(position, segment)| match segment {
                AxisValue::Scalar(s) => Ok(Segment::Fixed(s)),
                list @ AxisValue::List(_) => list
                    .flatten("path", &format!("segment[{position}]"))
                    .map(Segment::Varying),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            segments,
            delimiter: delimiter.into(),
        })
    }

    /// The join delimiter
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// One joined path per varying value, or a single path when nothing varies
    pub fn expand(&self) -> Vec<String> {
        let varying = self.segments.iter().enumerate().find_map(|(i, s)| match s {
            Segment::Varying(values) if !values.is_empty() => Some((i, values)),
            _ => None,
        });

        match varying {
            Some((position, values)) => values
                .iter()
                .map(|value| self.join(Some((position, value))))
                .collect(),
            None => vec![self.join(None)],
        }
    }

    fn join(&self, substitute: Option<(usize, &Scalar)>) -> String {
        self.segments
            .iter()
            .enumerate()
            .filter_map(|(i, segment)| match (segment, substitute) {
                (_, Some((position, value))) if position == i => Some(value.to_string()),
                (Segment::Fixed(s), _) => Some(s.to_string()),
                (Segment::Varying(_), _) => None,
            })
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(&self.delimiter)
    }
}
