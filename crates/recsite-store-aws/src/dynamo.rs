//! Meeting table adapter.

use std::collections::HashMap;

use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use recsite_paths::parse_timestamp;
use recsite_store::{Catalog, MeetingOccurrence, RecordingFile, ScanCursor, ScanPage, StoreError};

use crate::error::sdk_error;
use crate::{AwsContext, missing_field};

const BACKEND: &str = "DynamoDB";

/// Partition key of the meeting table.
const KEY_ATTRIBUTE: &str = "recording_id";

/// Attributes read by scans.
const PROJECTED: [&str; 7] = [
    "recording_id",
    "organization",
    "meeting_topic",
    "start_time",
    "end_time",
    "recording_path",
    "files",
];

type Item = HashMap<String, AttributeValue>;

/// Names of the secondary indexes used for parent page queries.
#[derive(Debug, Clone)]
pub struct IndexNames {
    /// Index partitioned by `meeting_topic`.
    pub topic: String,
    /// Index partitioned by `organization`.
    pub organization: String,
}

impl Default for IndexNames {
    fn default() -> Self {
        Self {
            topic: "meeting-index".to_owned(),
            organization: "organization-index".to_owned(),
        }
    }
}

/// [`Catalog`] backed by a `DynamoDB` table.
///
/// Both indexes must project every model attribute. Records that cannot be
/// decoded are skipped with a warning in queries and scans; a point lookup
/// returns the decode error.
pub struct DynamoCatalog {
    ctx: AwsContext,
    client: Client,
    table: String,
    indexes: IndexNames,
}

impl DynamoCatalog {
    pub fn new(ctx: &AwsContext, table: impl Into<String>, indexes: IndexNames) -> Self {
        Self {
            client: Client::new(ctx.sdk_config()),
            ctx: ctx.clone(),
            table: table.into(),
            indexes,
        }
    }

    /// Query one index for every item whose `attribute` equals `value`,
    /// following pagination to the end.
    fn query_index(
        &self,
        index: &str,
        attribute: &str,
        value: &str,
    ) -> Result<Vec<MeetingOccurrence>, StoreError> {
        self.ctx.block_on(async {
            let mut occurrences = Vec::new();
            let mut start_key: Option<Item> = None;
            loop {
                let output = self
                    .client
                    .query()
                    .table_name(&self.table)
                    .index_name(index)
                    .key_condition_expression("#k = :v")
                    .expression_attribute_names("#k", attribute)
                    .expression_attribute_values(":v", AttributeValue::S(value.to_owned()))
                    .set_exclusive_start_key(start_key.take())
                    .send()
                    .await
                    .map_err(|e| sdk_error(BACKEND, &e).with_key(index))?;

                occurrences.extend(decode_all(output.items.unwrap_or_default()));
                match output.last_evaluated_key {
                    Some(key) if !key.is_empty() => start_key = Some(key),
                    _ => break,
                }
            }
            tracing::debug!(
                index = %index,
                value = %value,
                count = occurrences.len(),
                "Queried index"
            );
            Ok::<_, StoreError>(occurrences)
        })
    }
}

impl Catalog for DynamoCatalog {
    fn get(&self, recording_id: &str) -> Result<Option<MeetingOccurrence>, StoreError> {
        let output = self
            .ctx
            .block_on(
                self.client
                    .get_item()
                    .table_name(&self.table)
                    .key(KEY_ATTRIBUTE, AttributeValue::S(recording_id.to_owned()))
                    .send(),
            )
            .map_err(|e| sdk_error(BACKEND, &e).with_key(recording_id))?;

        output.item.map(|item| decode(&item)).transpose()
    }

    fn query_by_topic(&self, topic: &str) -> Result<Vec<MeetingOccurrence>, StoreError> {
        self.query_index(&self.indexes.topic, "meeting_topic", topic)
    }

    fn query_by_organization(
        &self,
        organization: &str,
    ) -> Result<Vec<MeetingOccurrence>, StoreError> {
        self.query_index(&self.indexes.organization, "organization", organization)
    }

    fn scan_page(
        &self,
        cursor: Option<&ScanCursor>,
        limit: usize,
    ) -> Result<ScanPage, StoreError> {
        let mut request = self
            .client
            .scan()
            .table_name(&self.table)
            .limit(i32::try_from(limit.max(1)).unwrap_or(i32::MAX))
            .projection_expression(projection_expression())
            .set_exclusive_start_key(cursor.map(start_key));
        for (i, name) in PROJECTED.iter().enumerate() {
            request = request.expression_attribute_names(format!("#p{i}"), *name);
        }

        let output = self
            .ctx
            .block_on(request.send())
            .map_err(|e| sdk_error(BACKEND, &e).with_key(&self.table))?;

        let items = decode_all(output.items.unwrap_or_default());
        let next = match output.last_evaluated_key {
            Some(key) if !key.is_empty() => Some(cursor_from_key(&key)?),
            _ => None,
        };
        Ok(ScanPage { items, next })
    }
}

fn projection_expression() -> String {
    (0..PROJECTED.len())
        .map(|i| format!("#p{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn start_key(cursor: &ScanCursor) -> Item {
    HashMap::from([(KEY_ATTRIBUTE.to_owned(), AttributeValue::S(cursor.0.clone()))])
}

fn cursor_from_key(key: &Item) -> Result<ScanCursor, StoreError> {
    match key.get(KEY_ATTRIBUTE) {
        Some(AttributeValue::S(id)) => Ok(ScanCursor(id.clone())),
        _ => Err(missing_field(BACKEND, "LastEvaluatedKey.recording_id")),
    }
}

fn decode_all(items: Vec<Item>) -> Vec<MeetingOccurrence> {
    items
        .iter()
        .filter_map(|item| match decode(item) {
            Ok(occurrence) => Some(occurrence),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed record");
                None
            }
        })
        .collect()
}

/// Decode a table item into the model.
fn decode(item: &Item) -> Result<MeetingOccurrence, StoreError> {
    let recording_id = string_attr(item, "recording_id", "<unknown>")?;
    let id = recording_id.as_str();
    Ok(MeetingOccurrence {
        organization: string_attr(item, "organization", id)?,
        meeting_topic: string_attr(item, "meeting_topic", id)?,
        start_time: timestamp_attr(item, "start_time", id)?,
        end_time: timestamp_attr(item, "end_time", id)?,
        recording_path: optional_string_attr(item, "recording_path", id)?,
        files: files_attr(item, id)?,
        recording_id,
    })
}

fn decode_error(id: &str, message: String) -> StoreError {
    StoreError::decode(id, message).with_backend(BACKEND)
}

fn string_attr(item: &Item, name: &str, id: &str) -> Result<String, StoreError> {
    optional_string_attr(item, name, id)?.ok_or_else(|| decode_error(id, format!("missing {name}")))
}

fn optional_string_attr(item: &Item, name: &str, id: &str) -> Result<Option<String>, StoreError> {
    match item.get(name) {
        None | Some(AttributeValue::Null(_)) => Ok(None),
        Some(AttributeValue::S(value)) => Ok(Some(value.clone())),
        Some(_) => Err(decode_error(id, format!("{name} is not a string"))),
    }
}

fn timestamp_attr(
    item: &Item,
    name: &str,
    id: &str,
) -> Result<DateTime<Utc>, StoreError> {
    let value = string_attr(item, name, id)?;
    parse_timestamp(&value).map_err(|e| decode_error(id, format!("{name}: {e}")))
}

fn files_attr(item: &Item, id: &str) -> Result<Vec<RecordingFile>, StoreError> {
    let list = match item.get("files") {
        None | Some(AttributeValue::Null(_)) => return Ok(Vec::new()),
        Some(AttributeValue::L(list)) => list,
        Some(_) => return Err(decode_error(id, "files is not a list".to_owned())),
    };
    list.iter()
        .map(|entry| match entry {
            AttributeValue::M(file) => Ok(RecordingFile {
                file_type: optional_string_attr(file, "file_type", id)?.unwrap_or_default(),
                path: string_attr(file, "path", id)?,
            }),
            _ => Err(decode_error(id, "files entry is not a map".to_owned())),
        })
        .collect()
}
