mod discriminator;
mod error;
pub mod index;
mod query;
pub mod set;

pub use self::discriminator::{Discriminator, IndexableValue};
pub use self::error::Error;
pub use self::index::field::{FieldIndex, FieldQuery};
pub use self::index::intfield::{IntFieldIndex, IntQuery};
pub use self::index::keyword::KeywordIndex;
pub use self::index::path::{PathIndex, PathQuery};
pub use self::index::sort::SortedDocids;
pub use self::index::{CatalogIndex, Length};
pub use self::query::{Operator, Range};
pub use self::set::adapt::{DocSet, EstimateLength, MergeAdapter, SetModule};
pub use self::set::bitmap::BitmapSet;
pub use self::set::Collection;

pub type Result<T> = std::result::Result<T, Error>;

/// A document identifier, chosen by the caller.
pub type DocumentId = u32;

/// The per-key value carried by the mapping-shaped collections.
pub type Weight = i32;
