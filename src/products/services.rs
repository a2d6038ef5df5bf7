use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::lookup::ProductLookup;
use super::repo::ProductRepository;
use super::repo_types::Product;
use crate::error::RepoError;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("product not found")]
    NotFound,

    #[error(transparent)]
    Repo(RepoError),

    #[error("external lookup failed: {0:#}")]
    External(anyhow::Error),
}

/// Barcode resolution: the local table acts as a cache in front of the
/// external catalog.
#[derive(Clone)]
pub struct ProductCatalog {
    repo: Arc<dyn ProductRepository>,
    lookup: Arc<dyn ProductLookup>,
}

impl ProductCatalog {
    pub fn new(repo: Arc<dyn ProductRepository>, lookup: Arc<dyn ProductLookup>) -> Self {
        Self { repo, lookup }
    }

    #[instrument(skip(self))]
    pub async fn get_by_barcode(&self, barcode: &str) -> Result<Product, LookupError> {
        match self.repo.find_by_barcode(barcode).await {
            Ok(product) => {
                debug!(product_id = %product.id, "barcode served from local catalog");
                return Ok(product);
            }
            Err(RepoError::NotFound) => {}
            Err(e) => return Err(LookupError::Repo(e)),
        }

        let product = self
            .lookup
            .by_barcode(barcode)
            .await
            .map_err(LookupError::External)?
            .ok_or(LookupError::NotFound)?;

        match self.repo.create(&product).await {
            Ok(()) => {
                info!(product_id = %product.id, "cached external product");
                Ok(product)
            }
            // A concurrent lookup may have cached the same barcode first.
            Err(e) => match self.repo.find_by_barcode(barcode).await {
                Ok(stored) => {
                    debug!(product_id = %stored.id, "barcode cached concurrently");
                    Ok(stored)
                }
                Err(_) => {
                    warn!(error = %e, "failed to cache external product");
                    Err(LookupError::Repo(e))
                }
            },
        }
    }
}
