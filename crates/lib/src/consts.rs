/// Application name, used for default store locations and env var prefixes.
pub const APP_NAME: &str = "cairn";

/// Number of hex characters kept from the SHA-256 digest for unit hashes.
///
/// 40 hex characters is 160 bits, the size of a SHA-1 style store hash.
pub const OBJ_HASH_PREFIX_LEN: usize = 40;

/// Rune framing every interpolation marker.
pub const MARKER_SIGIL: char = 'ᛈ';

/// Opening half of an interpolation marker: `ᛈ>`.
pub const MARKER_OPEN: &str = "ᛈ>";

/// Closing half of an interpolation marker: `<ᛈ`.
pub const MARKER_CLOSE: &str = "<ᛈ";

/// Placeholder written in the `integrity` field of fetch specifications.
///
/// Fetch identity is derived from the URL string only. Verifying the fetched
/// bytes against a recorded digest is not implemented yet.
pub const INTEGRITY_PENDING: &str = "pending";
