//! Request payloads and response shapes of the three stages
//!
//! Response fields are lenient: a missing or `null` list decodes as an empty one, and
//! the pipeline carries on with the empty set.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{ChannelMetrics, ChannelRef, QuerySet};

/// Decoded body of a successful stage response
pub(crate) trait StageOutput: DeserializeOwned {
    /// Number of items the stage produced
    fn item_count(&self) -> usize;
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerateQueriesRequest<'a> {
    pub message: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueriesResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub queries: QuerySet,
}

impl StageOutput for QueriesResponse {
    fn item_count(&self) -> usize {
        self.queries.len()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChannelsRequest<'a> {
    pub queries: &'a [String],
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChannelsResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub channels: Vec<ChannelRef>,
}

impl StageOutput for ChannelsResponse {
    fn item_count(&self) -> usize {
        self.channels.len()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct VideoDataRequest<'a> {
    pub channels: &'a [ChannelRef],
}

/// Stage 3 reuses the `channels` field for the metrics-enriched channels
#[derive(Debug, Deserialize)]
pub(crate) struct VideoDataResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub channels: Vec<ChannelMetrics>,
}

impl StageOutput for VideoDataResponse {
    fn item_count(&self) -> usize {
        self.channels.len()
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
