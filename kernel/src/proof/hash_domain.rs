//! Domain prefixes for archival digests.
//!
//! A commitment, a manifest digest and an artifact hash must never collide
//! even over identical bytes, so each digest kind hashes under its own
//! `ARCHIVAL::<KIND>::V1\0` prefix. The prefixes are declared once below;
//! nothing else in the workspace spells them out.

/// Expands one domain list into the enum, its prefix table, and `Display`.
macro_rules! define_hash_domains {
    (
        $(
            $(#[$meta:meta])*
            $variant:ident => $bytes:expr
        ),+ $(,)?
    ) => {
        /// Typed domain separator for [`super::hash::canonical_hash`].
        ///
        /// Every variant maps to a unique, null-terminated byte string used as
        /// a SHA-256 prefix.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum HashDomain {
            $(
                $(#[$meta])*
                $variant,
            )+
        }

        impl HashDomain {
            /// The raw domain-separator bytes (null-terminated).
            #[must_use]
            pub const fn as_bytes(&self) -> &'static [u8] {
                match self {
                    $( Self::$variant => $bytes, )+
                }
            }

            /// All domain variants in declaration order.
            pub const ALL: &[HashDomain] = &[
                $( Self::$variant, )+
            ];
        }

        impl core::fmt::Display for HashDomain {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                match self {
                    $( Self::$variant => write!(f, stringify!($variant)), )+
                }
            }
        }
    };
}

define_hash_domains! {
    // -----------------------------------------------------------------------
    // Preconditions
    // -----------------------------------------------------------------------

    /// Preregistered parameter set commitment.
    ParameterCommitment => b"ARCHIVAL::PARAMETER_COMMITMENT::V1\0",

    /// Dependency manifest digest (canonical manifest bytes).
    DependencyManifest => b"ARCHIVAL::DEPENDENCY_MANIFEST::V1\0",

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    /// Input series identity (canonical input bytes).
    InputSeries => b"ARCHIVAL::INPUT_SERIES::V1\0",

    /// Run fingerprint (manifest + commitment + input + engine identity).
    RunFingerprint => b"ARCHIVAL::RUN_FINGERPRINT::V1\0",

    // -----------------------------------------------------------------------
    // Artifacts
    // -----------------------------------------------------------------------

    /// Forensic artifact content hashing (recorded in the audit record).
    ForensicArtifact => b"ARCHIVAL::FORENSIC_ARTIFACT::V1\0",
}
