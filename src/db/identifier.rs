//! Validated, quoted SQL identifiers for DDL statements.
//!
//! PostgreSQL cannot bind identifiers as parameters, so database and table
//! names are rendered with `quote_ident` rules: wrap in double quotes and
//! double every embedded quote. The text can then never terminate the
//! identifier early.

use std::fmt;

use crate::error::DemoError;

/// `NAMEDATALEN - 1`; longer names are silently truncated by the server.
pub const MAX_IDENTIFIER_LEN: usize = 63;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(name: impl Into<String>) -> Result<Self, DemoError> {
        let name = name.into();
        let reason = if name.is_empty() {
            Some("identifier is empty")
        } else if name.contains('\0') {
            Some("identifier contains a NUL byte")
        } else if name.len() > MAX_IDENTIFIER_LEN {
            Some("identifier is longer than 63 bytes")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(DemoError::InvalidIdentifier { name, reason }),
            None => Ok(Self(name)),
        }
    }

    /// The raw name, suitable for binding as a catalog lookup parameter.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The double-quoted form for splicing into DDL.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0.replace('"', "\"\""))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
