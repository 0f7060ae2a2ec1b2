//! scmkit - A uniform client for source hosting platforms
//!
//! scmkit gives callers one contract for GitHub, GitLab, and "no known
//! platform": repository validation, branch and pull/merge request
//! operations, blame ranges, and classification of a ref string as a
//! branch, tag, or commit.
//!
//! # Architecture
//!
//! - [`scm`] - The `Scm` facade callers hold
//! - [`forge`] - The `Forge` trait, its platform implementations, URL
//!   parsing, and reference resolution
//! - [`core`] - Domain types and configuration
//!
//! # Logging
//!
//! The library emits `tracing` events and never installs a subscriber.
//!
//! # Example
//!
//! ```ignore
//! use scmkit::core::config::ScmConfig;
//! use scmkit::forge::scm_kind_from_url;
//! use scmkit::scm::Scm;
//!
//! let url = "https://github.com/facebook/react";
//! let kind = scm_kind_from_url(Some(url));
//! let scm = Scm::init(Some(url), None, kind, &ScmConfig::from_env()).await?;
//! let tag = scm.reference_data("v18.2.0").await?;
//! assert_eq!(tag.kind.to_string(), "TAG");
//! ```

pub mod core;
pub mod forge;
pub mod scm;
