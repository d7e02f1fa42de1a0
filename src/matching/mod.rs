//! Watchlist matching: name normalization, string similarity, and the
//! OFAC / PEP checkers built on them.

pub mod normalize;
pub mod ofac;
pub mod pep;
pub mod similarity;

pub use normalize::normalize_name;
pub use ofac::{OfacChecker, OfacEntry};
pub use pep::{PepChecker, PepEntry};
pub use similarity::jaro_winkler;
