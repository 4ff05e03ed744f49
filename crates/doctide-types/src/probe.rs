use crate::error::DocResult;
use url::Url;

/// A parser turns a fetched artifact's body into a list of absolute URLs,
/// resolved against `base_url`. Implemented as a plain `fn` pointer so the
/// probe catalog in `doctide-discovery` can be a `&'static [DiscoveryProbe]`
/// constant with no process-wide mutable state, per spec §9.
pub type ProbeParser = fn(&[u8], &Url) -> DocResult<Vec<Url>>;

/// A `{path, name, parser}` descriptor, per spec §3/§4.7/§9.
#[derive(Clone, Copy)]
pub struct DiscoveryProbe {
    pub path: &'static str,
    pub name: &'static str,
    pub parser: ProbeParser,
}

impl std::fmt::Debug for DiscoveryProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryProbe")
            .field("path", &self.path)
            .field("name", &self.name)
            .finish()
    }
}
