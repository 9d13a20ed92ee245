//! Types exchanged with the custody service and with browser clients.

pub mod activity;
pub mod operations;
pub mod stamp;
pub mod sub_organization;

/// Implements an opaque, string-backed identifier issued by the custody
/// service. The service owns the format, so no validation happens here.
macro_rules! custody_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
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

        impl std::str::FromStr for $name {
            type Err = std::convert::Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_string()))
            }
        }
    };
}

custody_id!(
    /// Organization or sub-organization id.
    OrganizationId
);
custody_id!(ActivityId);
custody_id!(UserId);
custody_id!(
    /// Id of an HD wallet. Wallets are the signing keys of a sub-organization;
    /// `sign_with` accepts either a wallet account address or a private key id.
    WalletId
);
custody_id!(ApiKeyId);
custody_id!(AuthenticatorId);
