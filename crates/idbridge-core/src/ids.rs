//! Directory Identifiers
//!
//! Groups and users are keyed by opaque strings that stay stable when a
//! group or account moves from one directory backend to another. The
//! newtypes below keep the two apart at compile time.
//!
//! # Example
//!
//! ```
//! use idbridge_core::{GroupId, UserId};
//!
//! let gid = GroupId::new("sales").unwrap();
//! let uid: UserId = "alice".parse().unwrap();
//!
//! assert_eq!(gid.as_str(), "sales");
//! assert_eq!(uid.to_string(), "alice");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// Error returned when an identifier cannot be built from a string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to parse {id_type}: {message}")]
pub struct ParseIdError {
    /// The type of ID that failed to parse
    pub id_type: &'static str,
    /// Why the value was rejected
    pub message: String,
}

/// Defines a string-backed identifier type.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier, rejecting empty values.
            pub fn new(value: impl Into<String>) -> Result<Self, ParseIdError> {
                let value = value.into();
                if value.is_empty() {
                    return Err(ParseIdError {
                        id_type: stringify!($name),
                        message: "identifier must not be empty".to_string(),
                    });
                }
                Ok(Self(value))
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the identifier, returning the owned string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ParseIdError;

            fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Identifier of a directory group.
    ///
    /// Unique within the directory and unchanged when the group is handed
    /// over from the local database backend to the federated backend.
    ///
    /// # Example
    ///
    /// ```
    /// use idbridge_core::GroupId;
    ///
    /// let gid: GroupId = "finance".parse().unwrap();
    /// assert!("".parse::<GroupId>().is_err());
    /// ```
    GroupId
);

define_id!(
    /// Identifier of a directory user (the login name).
    UserId
);
