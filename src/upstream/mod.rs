//! GitHub upstream
//!
//! Fetches raw gists and renders Markdown through the GitHub API.

mod github;
mod provider;
mod types;

pub use github::GitHubClient;
pub use provider::{GistSource, MarkdownService};
pub use types::{FetchError, RawFile, RawGist, RawOwner};

#[cfg(test)]
pub(crate) use provider::mock;
#[cfg(test)]
pub(crate) use types::tests::sample_gist_json;
