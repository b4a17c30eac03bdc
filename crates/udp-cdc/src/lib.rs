mod ident;
mod join;
mod merge;
mod select;

pub use ident::{unquote, Ident, InvalidIdent};
pub use join::format_join;
pub use merge::render_merge;
pub use select::{render_select, RenderError};
