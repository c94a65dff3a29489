//! Auth handlers and supporting modules.
//!
//! ## Cookies
//!
//! Login and refresh return the token pair in the JSON body and also set both tokens as
//! `HttpOnly; SameSite=Lax` cookies, marked `Secure` when the frontend base URL is
//! https. Logout expires both cookies; it does not touch the store.

mod cookies;
pub(crate) mod login;
pub(crate) mod logout;
pub(crate) mod me;
pub(crate) mod principal;
pub(crate) mod refresh;
mod state;
pub(crate) mod types;

pub use principal::{authenticate_request, require_access_token, Principal};
pub use state::AuthState;
