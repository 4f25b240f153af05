use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::client::ApiTransport;

/// Page size used for every list request after the count probe.
pub const PAGE_SIZE: usize = 500;

/// One decoded list response. A body without the `{data, total}` envelope is
/// treated as a single bare record.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub records: Vec<Value>,
    pub total: usize,
}

pub fn parse_envelope(body: Value) -> Envelope {
    let total = body
        .get("total")
        .and_then(Value::as_u64)
        .map(|value| value as usize);
    match (body.get("data").and_then(Value::as_array).cloned(), total) {
        (Some(records), total) => {
            let total = total.unwrap_or(records.len());
            Envelope { records, total }
        }
        _ => Envelope {
            records: vec![body],
            total: 1,
        },
    }
}

fn list_request(
    transport: &impl ApiTransport,
    endpoint: &str,
    count: usize,
    offset: usize,
) -> Result<Envelope> {
    let mut query = vec![("count", count.to_string())];
    if offset > 0 {
        query.push(("offset", offset.to_string()));
    }
    Ok(parse_envelope(transport.get_json(endpoint, &query)?))
}

/// Fetch every record of a list endpoint, in server order.
///
/// Issues one probe request (`count=1`) to learn the declared total, then
/// full pages of [`PAGE_SIZE`] at increasing offsets until the total is
/// exhausted: ceil(N / PAGE_SIZE) + 1 requests for N declared records.
pub fn fetch_all(transport: &impl ApiTransport, endpoint: &str) -> Result<Vec<Value>> {
    let probe = list_request(transport, endpoint, 1, 0)?;
    let total = probe.total;
    if total == 0 {
        return Ok(Vec::new());
    }

    let mut records = Vec::with_capacity(total);
    let mut offset = 0usize;
    let mut remaining = total as i64;
    while remaining > 0 {
        let page = list_request(transport, endpoint, PAGE_SIZE, offset)?;
        records.extend(page.records);
        remaining -= PAGE_SIZE as i64;
        offset += PAGE_SIZE;
    }
    Ok(records)
}

/// [`fetch_all`] plus deserialization into the wire model for the endpoint.
pub fn fetch_all_typed<T: DeserializeOwned>(
    transport: &impl ApiTransport,
    endpoint: &str,
) -> Result<Vec<T>> {
    fetch_all(transport, endpoint)?
        .into_iter()
        .map(|record| {
            serde_json::from_value(record)
                .with_context(|| format!("unexpected record shape from {endpoint}"))
        })
        .collect()
}

/// Fetch a single detail resource, e.g. `shelves/12` or `pages/40`.
pub fn fetch_detail<T: DeserializeOwned>(
    transport: &impl ApiTransport,
    endpoint: &str,
) -> Result<T> {
    let body = transport.get_json(endpoint, &[])?;
    serde_json::from_value(body).with_context(|| format!("unexpected record shape from {endpoint}"))
}
