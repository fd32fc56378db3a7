use super::{parse_items, parse_one, politician_ref, Fetchers};
use crate::cache::CacheKey;
use crate::models::{Politician, RawPolitician};
use crate::services::FetchError;

impl Fetchers {
    /// All current members
    pub async fn politician_list(&self) -> Result<Vec<Politician>, FetchError> {
        let key = CacheKey::PoliticianList;
        if let Some(hit) = self.fresh(&key)? {
            return Ok(hit);
        }

        let items = self
            .client
            .paginate("/politicians/", &[("current", "True")])
            .await?;
        let raw: Vec<RawPolitician> = parse_items(items)?;
        let politicians: Vec<Politician> = raw
            .into_iter()
            .map(Politician::from_raw)
            .filter(|p| !p.slug.is_empty())
            .collect();

        tracing::info!(count = politicians.len(), "Fetched politician list");
        let ttl = self.seasonal_ttl(self.settings.ttl_politician_list);
        self.store_quietly(&key, &politicians, ttl, "/politicians/?current=True");
        Ok(politicians)
    }

    /// One politician's detail record
    ///
    /// Returns [`FetchError::NotFound`] when the source has no such politician.
    pub async fn politician_detail(&self, slug: &str) -> Result<Politician, FetchError> {
        let key = CacheKey::PoliticianDetail {
            slug: slug.to_string(),
        };
        if let Some(hit) = self.fresh(&key)? {
            return Ok(hit);
        }

        let path = politician_ref(slug);
        let raw: RawPolitician = parse_one(self.client.get(&path, &[]).await?)?;
        let politician = Politician::from_raw(raw);

        let ttl = self.seasonal_ttl(self.settings.ttl_politician_detail);
        self.store_quietly(&key, &politician, ttl, &path);
        Ok(politician)
    }
}
