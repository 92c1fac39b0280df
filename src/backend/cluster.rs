// Direct cluster catalog source with custom user-agent support for kube 2.x
use super::CatalogSource;
use crate::error::{Error, Result};
use crate::inventory::data::{ResourceDetail, ResourceTypeName};
use async_trait::async_trait;
use kube::api::{Api, DynamicObject, ListParams};
use kube::core::TypeMeta;
use kube::discovery::{ApiResource, Discovery, verbs};
use kube::{Client, Config};
use reqwest::header::{HeaderName, HeaderValue};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Default)]
struct DiscoveredTypes {
    order: Vec<String>,
    by_type: HashMap<ResourceTypeName, ApiResource>,
}

/// Reads the inventory straight from the Kubernetes API instead of the REST backend.
///
/// Discovery runs once, on first use, and is reused afterwards.
pub struct ClusterCatalog {
    client: Client,
    discovered: RwLock<Option<DiscoveredTypes>>,
}

/// Add the user-agent header to a kube config, ignoring invalid values
pub fn add_user_agent_header(config: &mut Config, user_agent: &str) {
    // Identifies kubeview API calls in audit logs
    if let Ok(header_value) = HeaderValue::from_str(user_agent) {
        config
            .headers
            .push((HeaderName::from_static("user-agent"), header_value));
    }
}

impl ClusterCatalog {
    /// Create a client from the inferred kube config (kubeconfig or in-cluster)
    ///
    /// # Errors
    ///
    /// Will return `Err` if no kube config can be inferred or the client cannot be built
    pub async fn new(user_agent: &str) -> Result<Self> {
        let mut config = Config::infer().await.map_err(|e| {
            error!("❌ Failed to infer Kubernetes configuration: {}", e);
            e
        })?;
        add_user_agent_header(&mut config, user_agent);

        let client = Client::try_from(config)?;
        debug!("✅ Created Kubernetes client");
        Ok(Self::with_client(client))
    }

    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            discovered: RwLock::new(None),
        }
    }

    async fn discovered(&self) -> Result<DiscoveredTypes> {
        {
            let guard = self.discovered.read().await;
            if let Some(ref discovered) = *guard {
                return Ok(discovered.clone());
            }
        }

        let discovery = Discovery::new(self.client.clone()).run().await?;
        let mut discovered = DiscoveredTypes::default();
        for group in discovery.groups() {
            for (ar, caps) in group.recommended_resources() {
                if !caps.supports_operation(verbs::LIST) {
                    continue;
                }
                let key = ResourceTypeName::new(&ar.plural);
                if discovered.by_type.contains_key(&key) {
                    continue;
                }
                discovered.order.push(ar.plural.clone());
                discovered.by_type.insert(key, ar);
            }
        }
        info!("🔍 Discovered {} listable resource types", discovered.order.len());

        let mut guard = self.discovered.write().await;
        *guard = Some(discovered.clone());
        Ok(discovered)
    }

    async fn api_for(&self, resource_type: &ResourceTypeName) -> Result<(Api<DynamicObject>, ApiResource)> {
        let discovered = self.discovered().await?;
        let ar = discovered
            .by_type
            .get(resource_type)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("resource type {resource_type}")))?;
        Ok((Api::all_with(self.client.clone(), &ar), ar))
    }
}

#[async_trait]
impl CatalogSource for ClusterCatalog {
    async fn resource_types(&self) -> Result<Vec<String>> {
        Ok(self.discovered().await?.order)
    }

    async fn list_names(&self, resource_type: &ResourceTypeName) -> Result<Vec<String>> {
        let (api, _) = self.api_for(resource_type).await?;
        let list = api.list(&ListParams::default()).await?;
        Ok(list
            .items
            .into_iter()
            .filter_map(|object| object.metadata.name)
            .collect())
    }

    async fn details(&self, resource_type: &ResourceTypeName, name: &str) -> Result<ResourceDetail> {
        let (api, ar) = self.api_for(resource_type).await?;
        let params = ListParams::default().fields(&format!("metadata.name={name}"));
        let mut object = api
            .list(&params)
            .await?
            .items
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(format!("{resource_type}/{name}")))?;

        // List items come back without apiVersion/kind
        if object.types.is_none() {
            object.types = Some(TypeMeta {
                api_version: ar.api_version.clone(),
                kind: ar.kind.clone(),
            });
        }
        ResourceDetail::from_value(&format!("{resource_type}/{name}"), serde_json::to_value(&object)?)
    }

    fn describe(&self) -> String {
        "cluster".to_string()
    }
}
