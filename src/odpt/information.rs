use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

/// Operational status of one railway line.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainInformation {
    pub railway: String,
    pub text: Option<String>,
    pub time_of_origin: Option<DateTime<FixedOffset>>,
}

impl TrainInformation {
    #[cfg(test)]
    pub fn new(railway: &str, text: Option<&str>) -> Self {
        Self {
            railway: railway.to_owned(),
            text: text.map(str::to_owned),
            time_of_origin: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct RawTrainInformation {
    #[serde(rename = "odpt:railway")]
    railway: Option<String>,
    #[serde(rename = "odpt:trainInformationText")]
    text: Option<HashMap<String, String>>,
    #[serde(rename = "odpt:timeOfOrigin")]
    time_of_origin: Option<String>,
}

impl RawTrainInformation {
    pub(super) fn into_information(self) -> TrainInformation {
        let time_of_origin = self
            .time_of_origin
            .and_then(|t| DateTime::parse_from_rfc3339(&t).ok());

        TrainInformation {
            railway: self.railway.unwrap_or_default(),
            text: self.text.and_then(|mut t| t.remove("ja")),
            time_of_origin,
        }
    }
}
