//! Upstream URL construction

use url::Url;

/// Builds the upstream URLs the stages request
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        let mut base = Url::parse(base_url)?;
        // `Url::join` replaces the last segment unless the path ends in '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base })
    }

    /// One page of the band listing for `bucket`
    pub fn listing(
        &self,
        bucket: &str,
        offset: usize,
        page_size: usize,
    ) -> Result<Url, url::ParseError> {
        let mut url = self
            .base
            .join(&format!("browse/ajax-letter/l/{}/json", bucket))?;
        url.query_pairs_mut()
            .append_pair("sEcho", "1")
            .append_pair("iDisplayStart", &offset.to_string())
            .append_pair("iDisplayLength", &page_size.to_string());
        Ok(url)
    }

    /// The complete discography tab of a band
    pub fn discography(&self, band_id: &str) -> Result<Url, url::ParseError> {
        self.base.join(&format!("band/discography/id/{}/tab/all", band_id))
    }
}
