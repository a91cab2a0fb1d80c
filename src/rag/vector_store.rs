use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, Distance, VectorParamsBuilder,
    PointStruct, SearchPointsBuilder, ScrollPointsBuilder, UpsertPointsBuilder,
    DeletePointsBuilder, Condition, Filter, FieldType, PointId, Value,
    point_id::PointIdOptions,
};
use serde_json::{Map as JsonMap, Value as JsonValue};
use uuid::Uuid;

use super::embeddings::EmbeddingGenerator;
use super::{Document, DocumentStore, MetadataFilter, SOURCE_KEY};

const TEXT_KEY: &str = "text";
const SCROLL_PAGE: u32 = 100;

/// Fields filtered on by the preference store and the recommender.
const INDEXED_FIELDS: [&str; 2] = [SOURCE_KEY, "preference_type"];

pub struct QdrantDocumentStore {
    client: Qdrant,
    collection_name: String,
    embeddings: EmbeddingGenerator,
}

impl QdrantDocumentStore {
    pub async fn new(
        url: &str,
        collection_name: &str,
        vector_size: u64,
        embeddings: EmbeddingGenerator,
    ) -> Result<Self> {
        tracing::info!("Building Qdrant client for URL: {}", url);
        let client = match Qdrant::from_url(url).build() {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("Qdrant client build failed: {:?}", e);
                anyhow::bail!("Qdrant client build failed: {}", e);
            }
        };

        let store = Self {
            client,
            collection_name: collection_name.to_string(),
            embeddings,
        };

        if let Err(e) = store.ensure_collection(vector_size).await {
            tracing::error!("Qdrant ensure_collection failed: {:?}", e);
            return Err(e);
        }
        tracing::info!(collection = %store.collection_name, "Qdrant collection ready");

        Ok(store)
    }

    async fn ensure_collection(&self, vector_size: u64) -> Result<()> {
        if self.client.collection_exists(&self.collection_name).await? {
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection_name)
                    .vectors_config(VectorParamsBuilder::new(vector_size, Distance::Cosine)),
            )
            .await?;

        for field in INDEXED_FIELDS {
            self.client
                .create_field_index(CreateFieldIndexCollectionBuilder::new(
                    &self.collection_name,
                    field,
                    FieldType::Keyword,
                ))
                .await?;
        }
        Ok(())
    }

    fn to_filter(filter: &MetadataFilter) -> Filter {
        Filter::must([Condition::matches(filter.key.as_str(), filter.value.clone())])
    }

    fn to_document(id: Option<PointId>, payload: HashMap<String, Value>) -> Option<Document> {
        let mut content = None;
        let mut metadata = BTreeMap::new();
        for (key, value) in payload {
            let Some(text) = value.as_str().map(|s| s.to_string()) else {
                continue;
            };
            if key == TEXT_KEY {
                content = Some(text);
            } else {
                metadata.insert(key, text);
            }
        }

        let id = id.and_then(|id| id.point_id_options).map(|options| match options {
            PointIdOptions::Uuid(uuid) => uuid,
            PointIdOptions::Num(num) => num.to_string(),
        });

        Some(Document {
            id,
            content: content?,
            metadata,
        })
    }
}

#[async_trait]
impl DocumentStore for QdrantDocumentStore {
    async fn add(&self, documents: Vec<Document>) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let vectors = self.embeddings.generate(texts)?;

        let points: Vec<PointStruct> = documents
            .into_iter()
            .zip(vectors)
            .map(|(doc, embedding)| {
                let mut payload_map = JsonMap::new();
                payload_map.insert(TEXT_KEY.to_string(), JsonValue::String(doc.content));
                for (key, value) in doc.metadata {
                    payload_map.insert(key, JsonValue::String(value));
                }
                let id = doc.id.unwrap_or_else(|| Uuid::new_v4().to_string());
                PointStruct::new(id, embedding, payload_map)
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection_name, points).wait(true))
            .await?;

        Ok(())
    }

    async fn get(&self, filter: &MetadataFilter) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        let mut offset: Option<PointId> = None;

        loop {
            let mut builder = ScrollPointsBuilder::new(&self.collection_name)
                .filter(Self::to_filter(filter))
                .limit(SCROLL_PAGE)
                .with_payload(true);

            if let Some(ref off) = offset {
                builder = builder.offset(off.clone());
            }

            let result = self.client.scroll(builder).await?;
            documents.extend(
                result
                    .result
                    .into_iter()
                    .filter_map(|point| Self::to_document(point.id, point.payload)),
            );

            offset = result.next_page_offset;
            if offset.is_none() {
                break;
            }
        }

        Ok(documents)
    }

    async fn delete(&self, filter: &MetadataFilter) -> Result<()> {
        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection_name)
                    .points(Self::to_filter(filter))
                    .wait(true),
            )
            .await?;

        Ok(())
    }

    async fn similarity_search(
        &self,
        query: &str,
        k: u64,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Document>> {
        let query_vector = self.embeddings.embed(query)?;

        let mut builder = SearchPointsBuilder::new(&self.collection_name, query_vector, k)
            .with_payload(true);
        if let Some(filter) = filter {
            builder = builder.filter(Self::to_filter(filter));
        }

        let search_result = self.client.search_points(builder).await?;

        Ok(search_result
            .result
            .into_iter()
            .filter_map(|point| Self::to_document(point.id, point.payload))
            .collect())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.client.collection_exists(&self.collection_name).await?)
    }
}
