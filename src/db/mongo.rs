use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use mongodb::{
    bson::{doc, DateTime as BsonDateTime, Document},
    options::{ClientOptions, FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Client, Collection, Database, IndexModel,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use super::{Lifespan, ProductStore};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::*;

const DEFAULT_DATABASE: &str = "store";
const PRODUCTS: &str = "products";

// ── Connection lifecycle ─────────────────────────────────────────────────────

/// Open client plus the database the service works in.
pub struct MongoConnection {
    client: Client,
    database: Database,
}

/// Connect, verify the server answers, and ensure the product indexes exist.
pub async fn connect_to_mongo(config: &Config) -> AppResult<MongoConnection> {
    info!("Connecting to MongoDB...");
    let mut options = ClientOptions::parse(&config.database_url).await?;
    options.app_name = Some(env!("CARGO_PKG_NAME").to_string());

    let name = config
        .database_name
        .clone()
        .or_else(|| options.default_database.clone())
        .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

    let client = Client::with_options(options)?;
    let database = client.database(&name);
    database.run_command(doc! { "ping": 1 }, None).await?;

    // Price range is the only secondary lookup the router does
    database
        .collection::<ProductDocument>(PRODUCTS)
        .create_index(
            IndexModel::builder().keys(doc! { "price_cents": 1 }).build(),
            None,
        )
        .await?;

    info!(database = %name, "MongoDB connection established.");
    Ok(MongoConnection { client, database })
}

/// Shut the client down, waiting for in-flight operations to finish.
pub async fn close_mongo_connection(connection: MongoConnection) -> AppResult<()> {
    info!("Closing MongoDB connection...");
    connection.client.shutdown().await;
    info!("MongoDB connection closed.");
    Ok(())
}

/// Runs [`connect_to_mongo`] on startup and [`close_mongo_connection`] on shutdown.
pub struct MongoLifespan {
    config: Config,
    connection: Mutex<Option<MongoConnection>>,
}

impl MongoLifespan {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            connection: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Lifespan for MongoLifespan {
    async fn startup(&self) -> AppResult<Arc<dyn ProductStore>> {
        let connection = connect_to_mongo(&self.config).await?;
        let store = MongoProductStore::new(&connection.database);
        *self.connection.lock().await = Some(connection);
        Ok(Arc::new(store))
    }

    async fn shutdown(&self) -> AppResult<()> {
        match self.connection.lock().await.take() {
            Some(connection) => close_mongo_connection(connection).await,
            None => Ok(()),
        }
    }
}

// ── Documents ─────────────────────────────────────────────────────────────────

/// Stored shape of a product: the UUID doubles as `_id` and timestamps are
/// native BSON datetimes so they sort server-side.
#[derive(Debug, Serialize, Deserialize)]
struct ProductDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    quantity: i32,
    price_cents: i64,
    status: bool,
    created_at: BsonDateTime,
    updated_at: BsonDateTime,
}

fn to_bson_datetime(at: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(at.timestamp_millis())
}

fn from_bson_datetime(at: BsonDateTime, id: &str) -> AppResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(at.timestamp_millis())
        .single()
        .ok_or_else(|| AppError::Corrupt(format!("timestamp out of range in product {}", id)))
}

impl From<&Product> for ProductDocument {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            quantity: product.quantity,
            price_cents: product.price_cents,
            status: product.status,
            created_at: to_bson_datetime(product.created_at),
            updated_at: to_bson_datetime(product.updated_at),
        }
    }
}

impl TryFrom<ProductDocument> for Product {
    type Error = AppError;

    fn try_from(doc: ProductDocument) -> AppResult<Self> {
        let id = Uuid::parse_str(&doc.id)
            .map_err(|e| AppError::Corrupt(format!("invalid _id {:?}: {}", doc.id, e)))?;
        Ok(Product {
            id,
            created_at: from_bson_datetime(doc.created_at, &doc.id)?,
            updated_at: from_bson_datetime(doc.updated_at, &doc.id)?,
            name: doc.name,
            quantity: doc.quantity,
            price_cents: doc.price_cents,
            status: doc.status,
        })
    }
}

fn id_filter(id: Uuid) -> Document {
    doc! { "_id": id.to_string() }
}

fn filter_document(filters: &ProductFilters) -> Document {
    let mut filter = Document::new();

    let mut price = Document::new();
    if let Some(min) = filters.min_price_cents {
        price.insert("$gte", min);
    }
    if let Some(max) = filters.max_price_cents {
        price.insert("$lte", max);
    }
    if !price.is_empty() {
        filter.insert("price_cents", price);
    }

    if let Some(status) = filters.status {
        filter.insert("status", status);
    }

    filter
}

/// `$set` body for a partial update; `updated_at` is always refreshed.
fn update_document(changes: &UpdateProduct) -> Document {
    let mut set = doc! { "updated_at": to_bson_datetime(changes.updated_at()) };
    if let Some(name) = &changes.name {
        set.insert("name", name.trim());
    }
    if let Some(quantity) = changes.quantity {
        set.insert("quantity", quantity);
    }
    if let Some(price_cents) = changes.price_cents {
        set.insert("price_cents", price_cents);
    }
    if let Some(status) = changes.status {
        set.insert("status", status);
    }
    set
}

// ── Products ──────────────────────────────────────────────────────────────────

pub struct MongoProductStore {
    collection: Collection<ProductDocument>,
}

impl MongoProductStore {
    pub fn new(database: &Database) -> Self {
        Self {
            collection: database.collection(PRODUCTS),
        }
    }
}

#[async_trait]
impl ProductStore for MongoProductStore {
    async fn insert(&self, product: &Product) -> AppResult<()> {
        self.collection
            .insert_one(ProductDocument::from(product), None)
            .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Product>> {
        self.collection
            .find_one(id_filter(id), None)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    async fn find_all(&self, filters: &ProductFilters) -> AppResult<Vec<Product>> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1, "_id": 1 })
            .skip(filters.offset())
            .limit(filters.limit())
            .build();

        let mut cursor = self
            .collection
            .find(filter_document(filters), options)
            .await?;

        let mut products = Vec::new();
        while cursor.advance().await? {
            products.push(Product::try_from(cursor.deserialize_current()?)?);
        }
        Ok(products)
    }

    async fn update(&self, id: Uuid, changes: &UpdateProduct) -> AppResult<Option<Product>> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        self.collection
            .find_one_and_update(id_filter(id), doc! { "$set": update_document(changes) }, options)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = self.collection.delete_one(id_filter(id), None).await?;
        Ok(result.deleted_count > 0)
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(self.collection.count_documents(doc! {}, None).await?)
    }
}
