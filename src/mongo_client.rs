//! Execution client (X). Runs a translated `Request` against MongoDB and
//! shapes the reply back into a MySQL-client-style result set (column
//! order, row-of-`Bson`-values). Grounded on `database_mongodb.rs`'s driver
//! call patterns (`mongodb::Client`, `futures_util::TryStreamExt` cursor
//! draining) and the original implementation's `mongodb_client.py` for the
//! exact MySQL-style error strings, including the supplemented `ERROR
//! 1142` for a role-denied command.

use crate::error::{MongoSqlError, Result};
use crate::request::Request;
use bson::{Bson, Document};
use futures_util::TryStreamExt;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use tracing::{debug, info};

/// A MySQL-client-shaped result: an ordered column list and rows carrying
/// one `Bson` value per column, in that order.
#[derive(Debug, Clone)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Bson>>,
}

impl ResultSet {
    fn from_documents(docs: Vec<Document>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for d in &docs {
            for k in d.keys() {
                if !columns.contains(k) {
                    columns.push(k.clone());
                }
            }
        }
        let rows = docs
            .into_iter()
            .map(|d| {
                columns
                    .iter()
                    .map(|c| d.get(c).cloned().unwrap_or(Bson::Null))
                    .collect()
            })
            .collect();
        ResultSet { columns, rows }
    }

    fn scalar(label: &str, value: Bson) -> Self {
        ResultSet {
            columns: vec![label.to_string()],
            rows: vec![vec![value]],
        }
    }
}

pub struct MongoDbClient {
    client: Client,
    database: Database,
    host: String,
}

impl MongoDbClient {
    /// Build `mongodb+srv://` for managed Atlas hosts (`*.mongodb.net`,
    /// per spec.md §6) and plain `mongodb://` otherwise.
    pub fn connection_string(
        host: &str,
        port: Option<u16>,
        user: &str,
        password: &str,
        database: &str,
    ) -> String {
        let scheme = if host.ends_with("mongodb.net") {
            "mongodb+srv"
        } else {
            "mongodb"
        };
        let encoded_user = percent_encoding::utf8_percent_encode(
            user,
            percent_encoding::NON_ALPHANUMERIC,
        );
        let encoded_pass = percent_encoding::utf8_percent_encode(
            password,
            percent_encoding::NON_ALPHANUMERIC,
        );
        let auth = if user.is_empty() {
            String::new()
        } else {
            format!("{encoded_user}:{encoded_pass}@")
        };
        match (scheme, port) {
            ("mongodb+srv", _) => format!("mongodb+srv://{auth}{host}/{database}"),
            (_, Some(p)) => format!("mongodb://{auth}{host}:{p}/{database}"),
            (_, None) => format!("mongodb://{auth}{host}:27017/{database}"),
        }
    }

    pub async fn connect(uri: &str, database: &str, host_for_errors: &str) -> Result<Self> {
        let options = ClientOptions::parse(uri)
            .await
            .map_err(|e| MongoSqlError::connect_failure(host_for_errors, e))?;
        let client = Client::with_options(options)
            .map_err(|e| MongoSqlError::connect_failure(host_for_errors, e))?;

        client
            .database(database)
            .run_command(bson::doc! { "ping": 1 })
            .await
            .map_err(|e| classify_connect_error(host_for_errors, e))?;

        info!(database, "connected to MongoDB");
        Ok(MongoDbClient {
            database: client.database(database),
            client,
            host: host_for_errors.to_string(),
        })
    }

    pub async fn execute(&self, request: &Request) -> Result<ResultSet> {
        debug!(?request, "executing translated request");
        match request {
            Request::Find {
                collection,
                filter,
                projection,
                sort,
                skip,
                limit,
            } => {
                let coll = self.database.collection::<Document>(collection);
                let mut opts = mongodb::options::FindOptions::default();
                opts.projection = projection.clone();
                opts.sort = sort.clone();
                opts.skip = skip.map(|v| v as u64);
                opts.limit = *limit;
                let cursor = coll
                    .find(filter.clone())
                    .with_options(opts)
                    .await
                    .map_err(|e| self.classify(e))?;
                let docs: Vec<Document> = cursor.try_collect().await.map_err(|e| self.classify(e))?;
                Ok(ResultSet::from_documents(docs))
            }
            Request::Count { collection, filter } => {
                let coll = self.database.collection::<Document>(collection);
                let n = coll
                    .count_documents(filter.clone())
                    .await
                    .map_err(|e| self.classify(e))?;
                Ok(ResultSet::scalar("COUNT(*)", Bson::Int64(n as i64)))
            }
            Request::Distinct {
                collection,
                field,
                filter,
            } => {
                let coll = self.database.collection::<Document>(collection);
                let values = coll
                    .distinct(field, filter.clone())
                    .await
                    .map_err(|e| self.classify(e))?;
                Ok(ResultSet {
                    columns: vec![field.clone()],
                    rows: values.into_iter().map(|v| vec![v]).collect(),
                })
            }
            Request::Aggregate {
                collection,
                pipeline,
            } => {
                let coll = self.database.collection::<Document>(collection);
                let cursor = coll
                    .aggregate(pipeline.clone())
                    .await
                    .map_err(|e| self.classify(e))?;
                let docs: Vec<Document> = cursor.try_collect().await.map_err(|e| self.classify(e))?;
                Ok(ResultSet::from_documents(docs))
            }
            Request::Eval { columns } => {
                let evaluated = crate::eval::evaluate(columns);
                Ok(ResultSet {
                    columns: evaluated.iter().map(|(l, _)| l.clone()).collect(),
                    rows: vec![evaluated.into_iter().map(|(_, v)| v).collect()],
                })
            }
            Request::InsertOne { collection, document } => {
                let coll = self.database.collection::<Document>(collection);
                let result = coll
                    .insert_one(document.clone())
                    .await
                    .map_err(|e| self.classify(e))?;
                Ok(ResultSet::scalar("insertedId", result.inserted_id))
            }
            Request::InsertMany {
                collection,
                documents,
            } => {
                let coll = self.database.collection::<Document>(collection);
                let result = coll
                    .insert_many(documents.clone())
                    .await
                    .map_err(|e| self.classify(e))?;
                Ok(ResultSet::scalar(
                    "insertedCount",
                    Bson::Int64(result.inserted_ids.len() as i64),
                ))
            }
            Request::UpdateMany {
                collection,
                filter,
                update,
            } => {
                let coll = self.database.collection::<Document>(collection);
                let result = coll
                    .update_many(filter.clone(), update.clone())
                    .await
                    .map_err(|e| self.classify(e))?;
                Ok(ResultSet::scalar(
                    "matchedCount",
                    Bson::Int64(result.matched_count as i64),
                ))
            }
            Request::DeleteMany { collection, filter } => {
                let coll = self.database.collection::<Document>(collection);
                let result = coll
                    .delete_many(filter.clone())
                    .await
                    .map_err(|e| self.classify(e))?;
                Ok(ResultSet::scalar(
                    "deletedCount",
                    Bson::Int64(result.deleted_count as i64),
                ))
            }
            Request::ShowCollections => {
                let names = self
                    .database
                    .list_collection_names()
                    .await
                    .map_err(|e| self.classify(e))?;
                Ok(ResultSet {
                    columns: vec!["Tables".to_string()],
                    rows: names.into_iter().map(|n| vec![Bson::String(n)]).collect(),
                })
            }
            Request::ShowDatabases => {
                let names = self
                    .client
                    .list_database_names()
                    .await
                    .map_err(|e| self.classify(e))?;
                Ok(ResultSet {
                    columns: vec!["Database".to_string()],
                    rows: names.into_iter().map(|n| vec![Bson::String(n)]).collect(),
                })
            }
            Request::UseDatabase { name } => {
                if self
                    .client
                    .list_database_names()
                    .await
                    .map_err(|e| self.classify(e))?
                    .contains(name)
                {
                    Ok(ResultSet {
                        columns: vec![],
                        rows: vec![],
                    })
                } else {
                    Err(MongoSqlError::unknown_database(name))
                }
            }
        }
    }

    fn classify(&self, e: mongodb::error::Error) -> MongoSqlError {
        classify_connect_error(&self.host, e)
    }
}

fn classify_connect_error(host: &str, e: mongodb::error::Error) -> MongoSqlError {
    use mongodb::error::ErrorKind;
    match e.kind.as_ref() {
        ErrorKind::Authentication { .. } => {
            MongoSqlError::auth_denied("unknown", host)
        }
        ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) => {
            MongoSqlError::connect_failure(host, e)
        }
        ErrorKind::Command(cmd_err) if cmd_err.code == 13 => {
            MongoSqlError::command_denied(cmd_err.message.clone())
        }
        _ => MongoSqlError::server_gone(e.to_string()),
    }
}
