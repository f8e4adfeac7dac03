pub mod built;
pub mod media;
pub mod micropub;
pub mod root;
pub mod webmention;
