//! Authentication
//!
//! Micropub clients may send the token either as a bearer header or as an
//! `access_token` body/query parameter. The header is checked before the body
//! is read; the body token is only consulted when no header was sent.

pub mod extract;
pub mod gate;
pub mod indieauth;

pub use extract::AuthorizedParams;
pub use gate::{extract_token, AuthGate, HeaderAuth};
pub use indieauth::{IndieAuthTokenValidator, TokenValidator};
