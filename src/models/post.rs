//! Post data structure.

use serde::{Deserialize, Serialize};

/// A single post discovered on a profile page.
///
/// Identity is the numeric `id`; `author` and `url` are carried for display
/// and linking. Two posts with the same id are the same post, no matter which
/// mirror they were discovered through.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    /// Platform-assigned post id (numeric string)
    pub id: String,

    /// Author handle, without the leading `@`
    pub author: String,

    /// Canonical deep link to the post
    pub url: String,
}

impl Post {
    /// Format the post for display using a template.
    ///
    /// Supported placeholders: `{id}`, `{author}`, `{url}`
    pub fn format(&self, template: &str) -> String {
        template
            .replace("{id}", &self.id)
            .replace("{author}", &self.author)
            .replace("{url}", &self.url)
    }
}
