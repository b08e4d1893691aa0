pub mod citation;
pub mod turn;

pub use citation::{normalize, normalize_many, Citation, RawCitation};
pub use turn::{Role, Turn};
