//! Full-text relevance over stores using Tantivy.
//!
//! Only `name` and `description` are indexed, and only the store id is
//! stored; hits are resolved back to stores by the caller.

use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{
    Field, INDEXED, IndexRecordOption, STORED, Schema, TextFieldIndexing, TextOptions, Value,
};
use tantivy::tokenizer::{
    Language, LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer, TextAnalyzer,
};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::debug;

use raving_reviews_core::StoreId;

use crate::models::Store;
use crate::ports::RepositoryError;

/// Writer heap; tantivy's per-thread minimum.
const WRITER_HEAP_BYTES: usize = 15_000_000;

/// Name matches weigh more than description matches.
const NAME_BOOST: f32 = 2.0;

#[derive(Clone, Copy)]
struct StoreFields {
    store_id: Field,
    name: Field,
    description: Field,
}

/// In-RAM relevance index over store names and descriptions.
pub struct StoreIndex {
    index: Index,
    reader: IndexReader,
    writer: IndexWriter,
    fields: StoreFields,
}

impl StoreIndex {
    /// Create an empty index with the English stemming analyzer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the writer or reader cannot be created.
    pub fn new() -> Result<Self, RepositoryError> {
        let (schema, fields) = build_schema();
        let index = Index::create_in_ram(schema);

        index.tokenizers().register(
            "en_stem",
            TextAnalyzer::builder(SimpleTokenizer::default())
                .filter(RemoveLongFilter::limit(40))
                .filter(LowerCaser)
                .filter(Stemmer::new(Language::English))
                .build(),
        );

        let writer = index
            .writer_with_num_threads(1, WRITER_HEAP_BYTES)
            .map_err(|e| backend("Failed to create writer", &e))?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| backend("Failed to create reader", &e))?;

        Ok(Self {
            index,
            reader,
            writer,
            fields,
        })
    }

    /// Add or replace a store's document and make it searchable.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if indexing or commit fails.
    pub fn upsert(&mut self, store: &Store) -> Result<(), RepositoryError> {
        let id = store.id.as_i64();
        self.writer
            .delete_term(Term::from_field_i64(self.fields.store_id, id));
        self.writer
            .add_document(tantivy::doc!(
                self.fields.store_id => id,
                self.fields.name => store.name.clone(),
                self.fields.description => store.description.clone().unwrap_or_default()
            ))
            .map_err(|e| backend("Failed to index store", &e))?;
        self.writer
            .commit()
            .map_err(|e| backend("Failed to commit index", &e))?;
        self.reader
            .reload()
            .map_err(|e| backend("Failed to reload reader", &e))?;

        debug!(store_id = id, "Indexed store");
        Ok(())
    }

    /// Store ids matching `query`, best first, with their scores.
    ///
    /// Query syntax errors are tolerated; whatever parses is searched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the search or a document fetch fails.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<(StoreId, f32)>, RepositoryError> {
        let mut parser =
            QueryParser::for_index(&self.index, vec![self.fields.name, self.fields.description]);
        parser.set_field_boost(self.fields.name, NAME_BOOST);
        let (query, errors) = parser.parse_query_lenient(query);
        if !errors.is_empty() {
            debug!(errors = errors.len(), "Ignored unparsable parts of search query");
        }

        let searcher = self.reader.searcher();
        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(limit))
            .map_err(|e| backend("Search failed", &e))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let doc = searcher
                .doc::<TantivyDocument>(address)
                .map_err(|e| backend("Failed to retrieve doc", &e))?;
            let id = doc
                .get_first(self.fields.store_id)
                .and_then(|v| v.as_i64())
                .ok_or_else(|| {
                    RepositoryError::DataCorruption("indexed store without an id".to_owned())
                })?;
            hits.push((StoreId::new(id), score));
        }
        Ok(hits)
    }
}

fn build_schema() -> (Schema, StoreFields) {
    let mut schema_builder = Schema::builder();

    let store_id = schema_builder.add_i64_field("store_id", INDEXED | STORED);

    let text_indexing = TextFieldIndexing::default()
        .set_tokenizer("en_stem")
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
    let text_options = TextOptions::default().set_indexing_options(text_indexing);

    let name = schema_builder.add_text_field("name", text_options.clone());
    let description = schema_builder.add_text_field("description", text_options);

    (
        schema_builder.build(),
        StoreFields {
            store_id,
            name,
            description,
        },
    )
}

fn backend(context: &str, e: &tantivy::TantivyError) -> RepositoryError {
    RepositoryError::Backend(format!("{context}: {e}"))
}
