//! Newtype wrappers for entity identifiers.
//!
//! Users and transactions are both keyed by `i64` row ids on the server;
//! the wrappers keep them from being swapped at call sites.

use core::num::ParseIntError;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Defines a server-issued `i64` identifier, serialized as a bare JSON
/// number and parsed from its decimal form (as given on the command line).
macro_rules! server_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a row id received from the server.
            #[inline]
            #[must_use]
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Row id as sent in paths and query strings.
            #[inline]
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            #[inline]
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }
    };
}

server_id! {
    /// Identifier of a signed-in user, issued by the auth exchange and
    /// sent as the `user_id` query parameter.
    UserId
}

server_id! {
    /// Server-assigned identifier of a transaction; absent until the
    /// create request has been confirmed.
    TransactionId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_serializes_as_number() {
        let id = UserId::new(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "42");
        let deserialized: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, id);
    }

    #[test]
    fn transaction_id_from_server_json() {
        let id: TransactionId = serde_json::from_str("1017").unwrap();
        assert_eq!(id.get(), 1017);
        assert_eq!(id.to_string(), "1017");
    }

    #[test]
    fn transaction_id_parses_command_line_text() {
        assert_eq!(" 12 ".parse::<TransactionId>(), Ok(TransactionId::new(12)));
        assert!("twelve".parse::<TransactionId>().is_err());
    }
}
