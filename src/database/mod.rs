mod creation;
mod doc_repr;
mod quering;
pub use creation::*;
pub use doc_repr::*;
pub use quering::*;
