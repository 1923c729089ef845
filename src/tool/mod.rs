//! The canonical tool definition model: input form, logic pipeline and
//! output view. These are the serde shapes drafts persist as; the engine
//! never executes them directly, they compile first.

pub mod convert;
pub mod draft;
pub mod form;
pub mod output;
pub mod step;

pub use convert::*;
pub use draft::*;
pub use form::*;
pub use output::*;
pub use step::*;
