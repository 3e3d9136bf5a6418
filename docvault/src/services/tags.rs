//! Tag suggestions from the remote tag listing

use crate::error::{AppError, Result};
use crate::models::Tag;
use crate::remote::DocumentApi;
use std::sync::Arc;

#[derive(Clone)]
pub struct TagService {
    api: Arc<dyn DocumentApi>,
}

impl TagService {
    pub fn new(api: Arc<dyn DocumentApi>) -> Self {
        Self { api }
    }

    /// Known tags matching `term`
    pub async fn suggestions(&self, term: &str) -> Result<Vec<Tag>> {
        let response = self.api.list_tags(term.trim()).await?;

        if !response.status {
            return Err(AppError::Remote("Failed to fetch tags".to_string()));
        }

        let tags: Vec<Tag> = response
            .data
            .into_iter()
            .map(|label| Tag {
                id: label.id,
                name: label.label,
            })
            .collect();

        tracing::debug!("{} tag suggestions for {:?}", tags.len(), term);
        Ok(tags)
    }
}
