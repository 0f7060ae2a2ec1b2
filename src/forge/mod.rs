//! forge
//!
//! Abstraction for source hosting platforms (GitHub, GitLab, and a stub).
//!
//! # Architecture
//!
//! The `Forge` trait defines one capability set for every platform.
//! Callers normally reach it through [`crate::scm::Scm`], which selects the
//! implementation once with [`create_forge`] and validates it.
//!
//! Platform status codes are translated into [`ForgeError`] inside each
//! implementation and never leak past it.
//!
//! # Modules
//!
//! - `traits`: Core `Forge` trait and the error taxonomy
//! - `url`: Repository URL parsing
//! - `resolve`: Branch/commit/tag classification of a ref
//! - [`github`]: GitHub implementation using REST and GraphQL APIs
//! - [`gitlab`]: GitLab implementation using REST v4
//! - [`stub`]: Forge for unknown platforms
//! - [`mock`]: Mock implementation for deterministic testing
//! - `factory`: Forge selection and creation
//!
//! # Example
//!
//! ```ignore
//! use scmkit::core::config::ScmConfig;
//! use scmkit::forge::{create_forge, scm_kind_from_url, Forge};
//!
//! let url = "https://github.com/facebook/react";
//! let forge = create_forge(
//!     scm_kind_from_url(Some(url)),
//!     Some(url.to_string()),
//!     token,
//!     &ScmConfig::from_env(),
//! );
//! let head = forge.reference_data("v18.2.0").await?;
//! println!("{} {}", head.kind, head.sha);
//! ```

mod factory;
pub mod github;
pub mod gitlab;
pub mod mock;
mod resolve;
pub mod stub;
mod traits;
mod url;

pub use factory::{create_forge, scm_kind_from_url, ScmKind};
pub use resolve::{resolve_reference, RefLookup, RefTarget, ResolveOrder};
pub use traits::{Forge, ForgeError};
pub use url::{parse_gitlab_locator, parse_locator};

pub(crate) use url::strip_http_scheme;
