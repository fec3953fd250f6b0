use async_trait::async_trait;

use super::types::ElementSetRecord;

/// An upstream provider of element sets.
///
/// `fetch` never fails: per-item and whole-source problems are logged and
/// show up as fewer (or zero) records.
#[async_trait]
pub trait ElementSetSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self) -> Vec<ElementSetRecord>;
}
