//! Authentication for the management surface.
//!
//! Two methods are supported, tried in order:
//!
//! 1. **Session cookie** - a signed, expiring JWT issued at login/registration
//!    and carried in an HTTP-only cookie ([`session`]).
//! 2. **Identity header** - a trusted upstream identity provider asserts the
//!    user's email in a request header; unknown emails can be auto-created
//!    and profile fields are backfilled without ever overwriting what the
//!    user set ([`current_user`]).
//!
//! Passwords are hashed with Argon2id ([`password`]); plaintext never leaves
//! the login/registration handlers. Authentication failures are uniform: a
//! wrong password and an unknown email are indistinguishable to the caller.

pub mod current_user;
pub mod password;
pub mod session;
