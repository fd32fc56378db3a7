use super::{parse_items, politician_ref, Fetchers};
use crate::cache::CacheKey;
use crate::models::Bill;
use crate::services::FetchError;

impl Fetchers {
    /// Bills sponsored by a politician in `session`
    pub async fn sponsored_bills(&self, slug: &str, session: &str) -> Result<Vec<Bill>, FetchError> {
        let key = CacheKey::Bills {
            slug: slug.to_string(),
            session: session.to_string(),
        };
        if let Some(hit) = self.fresh(&key)? {
            return Ok(hit);
        }

        let sponsor = politician_ref(slug);
        let items = self
            .client
            .paginate(
                "/bills/",
                &[("sponsor_politician", sponsor.as_str()), ("session", session)],
            )
            .await?;
        let bills: Vec<Bill> = parse_items(items)?;

        let ttl = self.seasonal_ttl(self.settings.ttl_bills);
        let source = format!("/bills/?sponsor_politician={}&session={}", slug, session);
        self.store_quietly(&key, &bills, ttl, &source);
        Ok(bills)
    }
}
