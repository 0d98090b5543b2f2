//! Basic-auth credential axis.

use crate::config::Alignment;
use crate::error::SpecError;
use crate::types::{AxisValue, Credentials, Scalar};

use super::align::{aligned_len, fill_forward_get};

/// User names and passwords, each a scalar or a list
///
/// Lists are paired positionally with fill-forward, so one password can serve
/// many user names. The default (both empty) expands to one empty pair, which
/// the request factory treats as "no auth".
///
/// # Examples
///
/// ```
/// use reqsweep::expand::AuthSpec;
/// use reqsweep::types::{AxisValue, Credentials};
///
/// let auth = AuthSpec::new(AxisValue::list(["u1", "u2"]), "shared").expand().unwrap();
/// assert_eq!(auth, vec![Credentials::new("u1", "shared"), Credentials::new("u2", "shared")]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct AuthSpec {
    username: AxisValue,
    password: AxisValue,
    alignment: Alignment,
}

impl Default for AuthSpec {
    fn default() -> Self {
        Self::new("", "")
    }
}

impl AuthSpec {
    /// Credentials from user name and password values
    pub fn new(username: impl Into<AxisValue>, password: impl Into<AxisValue>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            alignment: Alignment::FillForward,
        }
    }

    /// Choose how user name and password lists are paired
    pub fn alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// One credential pair per aligned position
    pub fn expand(&self) -> Result<Vec<Credentials>, SpecError> {
        let usernames = self.username.flatten("auth", "username")?;
        let passwords = self.password.flatten("auth", "password")?;
        let len = aligned_len(&[usernames.len(), passwords.len()], self.alignment)?;

        Ok((0..len)
            .map(|i| {
                let username: Scalar = fill_forward_get(&usernames, i);
                let password: Scalar = fill_forward_get(&passwords, i);
                Credentials::new(username.to_string(), password.to_string())
            })
            .collect())
    }
}
