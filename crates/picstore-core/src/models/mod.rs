pub mod outcome;
pub mod pending;
pub mod picture;

pub use outcome::RequestOutcome;
pub use pending::{scoped_transform_id, PendingWrite, CACHE_CONTROL_LONG};
pub use picture::{PictureEntry, PictureMap, SizeLabel, SizeSpec, UploadedOriginal};
