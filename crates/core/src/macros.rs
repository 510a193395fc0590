// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative macros for reducing boilerplate.

/// Generate `Display` and `as_str()` for a fieldless enum from a table of
/// wire names.
///
/// ```ignore
/// crate::wire_name! {
///     JobOutcome {
///         Completed => "completed",
///         Failed => "failed",
///     }
/// }
/// ```
#[macro_export]
macro_rules! wire_name {
    ($enum:ty { $( $variant:ident => $str:expr ),+ $(,)? }) => {
        impl $enum {
            /// Name used in status blobs and coordination-store scripts
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $str, )+
                }
            }
        }

        impl std::fmt::Display for $enum {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}
