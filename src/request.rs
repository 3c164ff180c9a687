//! The translated-query currency (X's input contract). A `Request` is the
//! fully-compiled MongoDB operation a `Query` translates to; the execution
//! client's job is solely to run one of these and shape the reply back
//! into a MySQL-style result set, never to make further translation
//! decisions.

use bson::{Bson, Document};

#[derive(Debug, Clone)]
pub enum Request {
    Find {
        collection: String,
        filter: Document,
        projection: Option<Document>,
        sort: Option<Document>,
        skip: Option<i64>,
        limit: Option<i64>,
    },
    Count {
        collection: String,
        filter: Document,
    },
    Distinct {
        collection: String,
        field: String,
        filter: Document,
    },
    Aggregate {
        collection: String,
        pipeline: Vec<Document>,
    },
    /// A FROM-less expression query, evaluated locally rather than sent to
    /// MongoDB at all. Each column carries its output label and the
    /// already-compiled expression tree to fold.
    Eval { columns: Vec<(String, Bson)> },
    InsertOne {
        collection: String,
        document: Document,
    },
    InsertMany {
        collection: String,
        documents: Vec<Document>,
    },
    UpdateMany {
        collection: String,
        filter: Document,
        update: Document,
    },
    DeleteMany {
        collection: String,
        filter: Document,
    },
    ShowCollections,
    ShowDatabases,
    UseDatabase { name: String },
}
