// Telemetry data domain models
use serde::Serialize;
use serde_json::Value;

use crate::error::ChannelError;

/// One `(label, value)` sample on the live chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub label: String,
    pub value: f64,
}

impl Record {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }

    /// Build a record from a `[label, value]` pair.
    ///
    /// The upstream decoder formats values as strings (`"1.234"`), so a
    /// numeric string is accepted as well as a JSON number.
    fn from_json(index: usize, item: &Value) -> Result<Self, ChannelError> {
        let malformed = |reason: &str| ChannelError::MalformedRecord {
            index,
            reason: reason.to_string(),
        };

        let pair = item
            .as_array()
            .filter(|pair| pair.len() == 2)
            .ok_or_else(|| malformed("expected a [label, value] pair"))?;

        let label = match &pair[0] {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return Err(malformed("label must be a string or a number")),
        };

        let value = match &pair[1] {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|value| value.is_finite())
        .ok_or_else(|| malformed("value must be a finite number"))?;

        Ok(Self { label, value })
    }
}

/// Ordered records making up the whole visible chart window
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Batch {
    records: Vec<Record>,
}

impl Batch {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Parse one wire frame.
    ///
    /// Returns `Ok(None)` for the empty heartbeat frame. Records keep the
    /// order they had in the array, duplicates included.
    pub fn parse(payload: &str) -> Result<Option<Self>, ChannelError> {
        if payload.is_empty() {
            return Ok(None);
        }

        let value: Value = serde_json::from_str(payload)?;
        let items = value.as_array().ok_or(ChannelError::NotAnArray)?;

        let records = items
            .iter()
            .enumerate()
            .map(|(index, item)| Record::from_json(index, item))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Self { records }))
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn labels(&self) -> Vec<String> {
        self.records.iter().map(|r| r.label.clone()).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.value).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumptionMode {
    Active,
    Paused,
}
