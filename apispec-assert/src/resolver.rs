use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use reqwest::Url;
use serde_json::{Map, Value, json};
use slog::{Logger, debug, o};

use crate::StdResult;
use crate::document::ApiDocument;
use crate::schema_source::SchemaSource;

/// Where a specification document lives, used to resolve its relative references.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentLocation {
    /// A document given in memory, its relative references are relative to the working directory.
    InMemory,
    /// A file.
    File(PathBuf),
    /// An http(s) url.
    Url(Url),
}

impl DocumentLocation {
    /// Location of the document targeted by a reference found in this document.
    pub fn join(&self, reference: &str) -> StdResult<Self> {
        if let Ok(url) = Url::parse(reference) {
            match url.scheme() {
                "http" | "https" => return Ok(Self::Url(url)),
                "file" => {
                    return url
                        .to_file_path()
                        .map(Self::File)
                        .map_err(|_| anyhow!("Invalid file url in reference: '{reference}'"));
                }
                _ => {}
            }
        }

        match self {
            Self::InMemory => Ok(Self::File(PathBuf::from(reference))),
            Self::File(path) => Ok(Self::File(
                path.parent().unwrap_or(Path::new("")).join(reference),
            )),
            Self::Url(url) => url
                .join(reference)
                .map(Self::Url)
                .with_context(|| format!("Invalid reference '{reference}' from '{url}'")),
        }
    }
}

impl fmt::Display for DocumentLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InMemory => write!(f, "in-memory document"),
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{url}"),
        }
    }
}

/// Read a YAML or JSON specification document.
///
/// Numeric and boolean YAML keys, such as unquoted status codes, are read as strings.
pub fn parse_document(content: &str) -> StdResult<Value> {
    let document: serde_yaml::Value = serde_yaml::from_str(content)
        .with_context(|| "Document is neither a valid yaml nor json")?;

    serde_json::to_value(stringify_keys(document)?)
        .with_context(|| "Document can not be represented as json")
}

fn stringify_keys(value: serde_yaml::Value) -> StdResult<serde_yaml::Value> {
    use serde_yaml::Value as Yaml;

    match value {
        Yaml::Mapping(mapping) => mapping
            .into_iter()
            .map(|(key, value)| {
                let key = match key {
                    Yaml::String(key) => key,
                    Yaml::Number(key) => key.to_string(),
                    Yaml::Bool(key) => key.to_string(),
                    other => return Err(anyhow!("Unsupported mapping key: {other:?}")),
                };
                Ok((Yaml::String(key), stringify_keys(value)?))
            })
            .collect::<StdResult<serde_yaml::Mapping>>()
            .map(Yaml::Mapping),
        Yaml::Sequence(items) => items
            .into_iter()
            .map(stringify_keys)
            .collect::<StdResult<Vec<_>>>()
            .map(Yaml::Sequence),
        Yaml::Tagged(tagged) => stringify_keys(tagged.value),
        other => Ok(other),
    }
}

/// Load specification documents.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Load and parse the document at the given location.
    async fn load(&self, location: &DocumentLocation) -> StdResult<Value>;
}

/// [DocumentLoader] reading files from the disk and urls over http.
pub struct FileAndHttpLoader {
    http_client: reqwest::Client,
}

impl FileAndHttpLoader {
    /// `FileAndHttpLoader` factory
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    async fn download(&self, url: &Url) -> StdResult<String> {
        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Could not reach '{url}'"))?;
        let response = response
            .error_for_status()
            .with_context(|| format!("Could not download '{url}'"))?;

        response
            .text()
            .await
            .with_context(|| format!("Could not read the content of '{url}'"))
    }
}

impl Default for FileAndHttpLoader {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[async_trait]
impl DocumentLoader for FileAndHttpLoader {
    async fn load(&self, location: &DocumentLocation) -> StdResult<Value> {
        let content = match location {
            DocumentLocation::InMemory => {
                return Err(anyhow!("An in-memory document can not be loaded"));
            }
            DocumentLocation::File(path) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Could not read '{}'", path.display()))?,
            DocumentLocation::Url(url) => self.download(url).await?,
        };

        parse_document(&content).with_context(|| format!("Invalid document at {location}"))
    }
}

/// Load a specification with every document it references and inline all its `$ref`.
pub struct SchemaResolver {
    loader: Arc<dyn DocumentLoader>,
    logger: Logger,
}

impl SchemaResolver {
    /// `SchemaResolver` factory
    pub fn new(loader: Arc<dyn DocumentLoader>, logger: Logger) -> Self {
        Self {
            loader,
            logger: logger.new(o!("src" => "SchemaResolver")),
        }
    }

    /// Resolve a schema source to a fully dereferenced document.
    ///
    /// A reference cycle is cut by replacing the reference that closes it with `{}`.
    pub async fn resolve(&self, source: &SchemaSource) -> StdResult<ApiDocument> {
        let (location, root) = match source {
            SchemaSource::Document(document) => (DocumentLocation::InMemory, document.clone()),
            SchemaSource::File(path) => {
                let location = DocumentLocation::File(path.clone());
                let root = self.loader.load(&location).await?;
                (location, root)
            }
            SchemaSource::Url(url) => {
                let location = DocumentLocation::Url(url.clone());
                let root = self.loader.load(&location).await?;
                (location, root)
            }
        };

        let documents = self.load_referenced_documents(location.clone(), root).await?;
        debug!(
            self.logger, "Dereferencing api specification";
            "location" => %location, "documents" => documents.len()
        );
        let dereferenced = Dereferencer::new(&documents).dereference(&location)?;

        ApiDocument::new(dereferenced)
    }

    async fn load_referenced_documents(
        &self,
        root_location: DocumentLocation,
        root: Value,
    ) -> StdResult<HashMap<DocumentLocation, Value>> {
        let mut pending = external_references(&root_location, &root)?;
        let mut documents = HashMap::from([(root_location, root)]);

        while let Some(location) = pending.pop() {
            if documents.contains_key(&location) {
                continue;
            }

            debug!(self.logger, "Loading referenced document"; "location" => %location);
            let document = self
                .loader
                .load(&location)
                .await
                .with_context(|| format!("Could not load referenced document {location}"))?;
            pending.extend(external_references(&location, &document)?);
            documents.insert(location, document);
        }

        Ok(documents)
    }
}

fn split_reference(reference: &str) -> (&str, &str) {
    reference.split_once('#').unwrap_or((reference, ""))
}

fn external_references(
    location: &DocumentLocation,
    document: &Value,
) -> StdResult<Vec<DocumentLocation>> {
    fn collect<'a>(value: &'a Value, references: &mut Vec<&'a str>) {
        match value {
            Value::Object(object) => {
                if let Some(Value::String(reference)) = object.get("$ref") {
                    references.push(reference);
                }
                object.values().for_each(|value| collect(value, references));
            }
            Value::Array(items) => items.iter().for_each(|value| collect(value, references)),
            _ => {}
        }
    }

    let mut references = vec![];
    collect(document, &mut references);

    references
        .into_iter()
        .map(|reference| split_reference(reference).0)
        .filter(|target| !target.is_empty())
        .map(|target| location.join(target))
        .collect()
}

struct Dereferencer<'a> {
    documents: &'a HashMap<DocumentLocation, Value>,
}

impl<'a> Dereferencer<'a> {
    fn new(documents: &'a HashMap<DocumentLocation, Value>) -> Self {
        Self { documents }
    }

    fn dereference(&self, location: &DocumentLocation) -> StdResult<Value> {
        let root = self.document(location)?;
        self.inline(root, location, &mut vec![])
    }

    fn document(&self, location: &DocumentLocation) -> StdResult<&'a Value> {
        self.documents
            .get(location)
            .ok_or_else(|| anyhow!("Document {location} was not loaded"))
    }

    fn inline(
        &self,
        value: &Value,
        location: &DocumentLocation,
        visiting: &mut Vec<(DocumentLocation, String)>,
    ) -> StdResult<Value> {
        match value {
            Value::Object(object) => match object.get("$ref") {
                Some(Value::String(reference)) => {
                    self.inline_reference(reference, object, location, visiting)
                }
                _ => object
                    .iter()
                    .map(|(key, value)| Ok((key.clone(), self.inline(value, location, visiting)?)))
                    .collect::<StdResult<Map<_, _>>>()
                    .map(Value::Object),
            },
            Value::Array(items) => items
                .iter()
                .map(|item| self.inline(item, location, visiting))
                .collect::<StdResult<Vec<_>>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        }
    }

    fn inline_reference(
        &self,
        reference: &str,
        object: &Map<String, Value>,
        location: &DocumentLocation,
        visiting: &mut Vec<(DocumentLocation, String)>,
    ) -> StdResult<Value> {
        let (target, pointer) = split_reference(reference);
        let target_location = if target.is_empty() {
            location.clone()
        } else {
            location.join(target)?
        };
        // Fragments are uri encoded json pointers, ie: `#/paths/~1items~1%7Bid%7D`.
        let pointer = percent_decode_str(pointer)
            .decode_utf8()
            .with_context(|| format!("Invalid reference '{reference}' in {location}"))?
            .into_owned();
        let target_key = (target_location.clone(), pointer);
        if visiting.contains(&target_key) {
            return Ok(json!({}));
        }

        let target_value = self
            .document(&target_location)?
            .pointer(&target_key.1)
            .ok_or_else(|| anyhow!("Could not resolve reference '{reference}' in {location}"))?;

        visiting.push(target_key);
        let resolved = self.inline(target_value, &target_location, visiting);
        visiting.pop();
        let mut resolved = resolved?;

        // Keywords next to a `$ref` extend the referenced value.
        if let Value::Object(resolved_object) = &mut resolved {
            for (key, value) in object.iter().filter(|(key, _)| key.as_str() != "$ref") {
                resolved_object.insert(key.clone(), self.inline(value, location, visiting)?);
            }
        }

        Ok(resolved)
    }
}
