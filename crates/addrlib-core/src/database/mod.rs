//! Address Library databases: file formats, discovery and id resolution.

mod blacklist;
mod codec;
mod csv;
mod format;
pub mod layout;
mod loader;
mod resolver;
mod store;
mod stream;

pub use blacklist::*;
pub use codec::*;
pub use csv::*;
pub use format::*;
pub use loader::*;
pub use resolver::*;
pub use store::*;
pub use stream::*;
