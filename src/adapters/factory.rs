//! Collaborator factory
//!
//! Builds the production collaborators from configuration.

use crate::adapters::archive::{Archiver, ZipArchiver};
use crate::adapters::discovery::{DiscoveryStore, MetadataDiscoveryStore};
use crate::adapters::documents::{DocumentStore, ElasticDocumentStore};
use crate::adapters::elastic::ElasticClient;
use crate::adapters::graph::{GraphStore, SheepdogGraphStore};
use crate::adapters::http::HttpClient;
use crate::adapters::identity::{ArboristIdentity, IdentityProvider};
use crate::adapters::object_store::{FenceObjectStore, ObjectStore};
use crate::adapters::search::{ElasticSearchIndex, SearchIndex};
use crate::config::EtlConfig;
use crate::domain::{Result, StoreKind};
use std::sync::Arc;

/// Every external collaborator a job needs
#[derive(Clone)]
pub struct Collaborators {
    pub identity: Arc<dyn IdentityProvider + Send + Sync>,
    pub object_store: Arc<dyn ObjectStore + Send + Sync>,
    pub graph: Arc<dyn GraphStore + Send + Sync>,
    pub search: Arc<dyn SearchIndex + Send + Sync>,
    pub documents: Arc<dyn DocumentStore + Send + Sync>,
    pub discovery: Arc<dyn DiscoveryStore + Send + Sync>,
    pub archiver: Arc<dyn Archiver + Send + Sync>,
}

/// Creates the HTTP-backed collaborators described by `config`
///
/// # Errors
///
/// Returns an error if an HTTP client cannot be built.
pub fn create_collaborators(config: &EtlConfig) -> Result<Collaborators> {
    let commons = HttpClient::for_commons(&config.commons)?;
    let elastic = HttpClient::for_elastic(&config.elastic)?;

    tracing::info!(
        commons = %config.commons.endpoint,
        elastic = %config.elastic.url,
        "Creating collaborators"
    );

    Ok(Collaborators {
        identity: Arc::new(ArboristIdentity::new(commons.clone())),
        object_store: Arc::new(FenceObjectStore::new(commons.clone())),
        graph: Arc::new(SheepdogGraphStore::new(commons.clone())),
        search: Arc::new(ElasticSearchIndex::new(
            ElasticClient::new(elastic.clone(), StoreKind::Search),
            config.elastic.clone(),
        )),
        documents: Arc::new(ElasticDocumentStore::new(
            ElasticClient::new(elastic, StoreKind::Documents),
            config.elastic.fhir_index.clone(),
        )),
        discovery: Arc::new(MetadataDiscoveryStore::new(commons)),
        archiver: Arc::new(ZipArchiver::new()),
    })
}
