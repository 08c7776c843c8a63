/// Path segment that marks a source as routable through the dev proxy
const PROXY_MARKER: &str = "genomeark/";

/// Same-origin path the dev proxy serves `genomeark/` content under
const PROXY_PREFIX: &str = "/dev-proxy/genomeark/";

/// Strategy for turning a source URL into the URL actually fetched
pub trait SourceRewrite: Send + Sync {
    fn rewrite(&self, url: &str) -> String;
}

impl<F> SourceRewrite for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn rewrite(&self, url: &str) -> String {
        self(url)
    }
}

/// Fetch sources exactly as given
#[derive(Debug, Clone, Default)]
pub struct PassThrough;

impl SourceRewrite for PassThrough {
    fn rewrite(&self, url: &str) -> String {
        url.to_string()
    }
}

/// Route `.../genomeark/<rest>` to `<origin>/dev-proxy/genomeark/<rest>`.
///
/// Sources without the marker are left alone.
#[derive(Debug, Clone)]
pub struct DevProxyRewrite {
    origin: String,
}

impl DevProxyRewrite {
    pub fn new<S: Into<String>>(origin: S) -> Self {
        let origin = origin.into();
        Self {
            origin: origin.trim_end_matches('/').to_string(),
        }
    }

    /// Produce relative `/dev-proxy/...` paths
    pub fn same_origin() -> Self {
        Self::new("")
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }
}

impl SourceRewrite for DevProxyRewrite {
    fn rewrite(&self, url: &str) -> String {
        match url.find(PROXY_MARKER) {
            Some(at) => format!(
                "{}{}{}",
                self.origin,
                PROXY_PREFIX,
                &url[at + PROXY_MARKER.len()..]
            ),
            None => url.to_string(),
        }
    }
}
