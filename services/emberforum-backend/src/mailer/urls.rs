use std::fmt;

/// Builds absolute, publicly dereferenceable links into the forum.
///
/// Composers and handlers never assemble URLs themselves; they ask this
/// collaborator so that every link shares the configured base URL.
#[derive(Debug, Clone)]
pub struct UrlGenerator {
    base_url: String,
}

impl UrlGenerator {
    pub fn new(base_url: impl Into<String>) -> UrlGenerator {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        UrlGenerator { base_url }
    }

    /// Link to the confirm-email endpoint, parameterized by the token.
    pub fn confirm_email(&self, token: &str) -> String {
        format!("{}/api/v1/users/confirmation?token={}", self.base_url, token)
    }
}

impl fmt::Display for UrlGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_url)
    }
}
