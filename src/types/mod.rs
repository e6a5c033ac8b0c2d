//! Data types exchanged with the booking API.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Package`] | One travel package as returned by the API, unknown fields kept |
//! | [`PackageFilter`] | Client-side narrowing of fetched packages |

pub mod filter;
pub mod package;

pub use filter::PackageFilter;
pub use package::Package;
