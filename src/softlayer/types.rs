//! Newtypes for provider identifiers to avoid stringly-typed code.

use std::fmt;
use std::ops::Deref;

macro_rules! newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Eq, Hash, PartialEq)]
        pub struct $name(String);

        impl $name {
            /// Wraps a provider identifier.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub const fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &Self::Target {
                self.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

newtype!(
    /// Identifier of a virtual guest.
    InstanceId
);
newtype!(
    /// Global identifier of a captured image (block-device template group).
    ImageId
);

/// Numeric identifier of an uploaded SSH key.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SshKeyId(u64);

impl SshKeyId {
    /// Wraps a provider key identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SshKeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of resource removed by a delete call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResourceKind {
    /// Virtual guest.
    Instance,
    /// Uploaded SSH key.
    SshKey,
    /// Captured image.
    Image,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Instance => "instance",
            Self::SshKey => "ssh key",
            Self::Image => "image",
        };
        f.write_str(label)
    }
}

/// Acknowledgement of a best-effort delete.
///
/// The provider answered without a transport failure. Its response is kept
/// verbatim but is not interpreted, so this is a weak guarantee that the
/// resource is gone.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Deletion {
    /// Kind of resource the delete targeted.
    pub kind: ResourceKind,
    /// Identifier passed to the delete call.
    pub id: String,
    /// Raw response body as text.
    pub response: String,
}
