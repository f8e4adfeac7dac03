//! Domain models

pub mod media;
pub mod micropub;
pub mod post;
pub mod syndication;

pub use media::UploadedFile;
pub use micropub::{Action, CreateRequest, MicropubRequest, MutateRequest, PostChanges, Properties};
pub use post::Post;
pub use syndication::SyndicationTarget;
