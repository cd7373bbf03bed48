//! Identity machinery: stable UIDs, qualified names, and ordered member
//! tables with a case-folding policy.

pub mod name;
pub mod table;
pub mod uid;

pub use name::QualifiedName;
pub use table::{CaseMode, TraitTable};
pub use uid::Uid;
