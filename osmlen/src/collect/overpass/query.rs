use serde::Deserialize;

use crate::collect::overpass::filters::InfrastructureFilter;
use crate::error::{Error, Result};

/// Build one Overpass QL query measuring every filter inside a polygon fragment.
///
/// ```text
/// [timeout:1200][out:json][date:'2019-01-01T00:00:00Z'];
/// way[highway](poly:"51.5 -0.1 ...");
/// make stat length=sum(length());
/// out;
/// ```
pub fn build_query(
    fragment: &str,
    filters: &[InfrastructureFilter],
    timeout_secs: u32,
    date: Option<&str>,
) -> String {
    let mut query = format!("[timeout:{timeout_secs}][out:json]");
    if let Some(date) = date {
        query.push_str(&format!("[date:'{date}']"));
    }
    query.push_str(";\n");

    for filter in filters {
        query.push_str(&format!(
            "{}(poly:\"{}\");\nmake stat length=sum(length());\nout;\n\n",
            filter.expression, fragment
        ));
    }
    query
}

/// Interpreter response: one `stat` element per `make stat` statement.
#[derive(Debug, Deserialize)]
struct StatResponse {
    elements: Vec<StatElement>,
}

#[derive(Debug, Deserialize)]
struct StatElement {
    tags: StatTags,
}

#[derive(Debug, Deserialize)]
struct StatTags {
    length: StatValue,
}

/// Overpass prints derived tags as strings; accept plain numbers too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StatValue {
    Number(f64),
    Text(String),
}

impl StatValue {
    fn to_f64(&self) -> Result<f64> {
        match self {
            StatValue::Number(value) => Ok(*value),
            StatValue::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| Error::Transport {
                    attempts: 1,
                    message: format!("length {text:?} is not a number"),
                }),
        }
    }
}

/// Extract the summed lengths, in statement order.
pub fn parse_lengths(body: &str) -> Result<Vec<f64>> {
    let response: StatResponse = serde_json::from_str(body).map_err(|e| Error::Transport {
        attempts: 1,
        message: format!("malformed response: {e}"),
    })?;
    response.elements.iter().map(|e| e.tags.length.to_f64()).collect()
}
