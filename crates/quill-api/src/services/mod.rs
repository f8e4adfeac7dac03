pub mod micropub;
pub mod notifier;
pub mod posts;
pub mod query;
pub mod syndication;
pub mod webmention;

pub use micropub::{AttachedFile, MicropubOutcome, MicropubService};
pub use notifier::{create_notifier, EmailNotifier, LogNotifier, Notifier};
pub use posts::{CanonicalPostRepository, PostRepository};
pub use query::{QueryResponder, QueryResponse};
pub use syndication::{load_syndication_targets, HttpSyndicator, Syndicator};
pub use webmention::{HttpWebmentionVerifier, WebmentionIntake, WebmentionVerifier};
