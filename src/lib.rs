//! Vetrina keeps a Confluence design inventory in step with Figma.
//!
//! Each tracked object is described by a JSON schema document naming its
//! view slots; the pipeline exports every referenced frame to a PNG,
//! uploads the renders as page attachments, rewrites the object's page
//! body, and rolls status up into overview and summary pages.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
pub mod util;
