//! Bearer-token authentication. Tokens are issued by the identity service;
//! this crate only verifies them.

mod claims;
mod extractors;

#[cfg(test)]
pub use claims::Claims;
pub use extractors::{AuthUser, MaybeAuthUser};
