// ABOUTME: Dice engine that forwards commands to an external dice HTTP API (v1 or v2 protocol).
// ABOUTME: Transport, status, and decode failures are logged and come back as empty outcomes.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use regex::Regex;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::{adapt_help, DiceEngine, RollOutcome, NO_HELP};
use crate::catalog::GameSystemInfo;
use crate::error::{Error, Result};
use crate::system::{EvalResult, DEFAULT_SYSTEM};

/// Printable ASCII plus the yen sign; anything else is never sent.
static ACCEPTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[!-~¥]+$").expect("valid regex"));

/// Dice API protocol generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApiVersion {
    V1,
    #[default]
    V2,
}

impl FromStr for ApiVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "v1" => Ok(Self::V1),
            "2" | "v2" => Ok(Self::V2),
            _ => Err(Error::InvalidApiVersion(s.to_string())),
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => write!(f, "v1"),
            Self::V2 => write!(f, "v2"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct V1Roll {
    result: String,
    secret: bool,
    dices: Vec<V1Die>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct V1Die {
    value: i64,
    faces: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct V2Roll {
    text: String,
    secret: bool,
    rands: Vec<V2Rand>,
    success: bool,
    failure: bool,
    critical: bool,
    fumble: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct V2Rand {
    sides: u32,
    value: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct V1SystemInfo {
    systeminfo: V1Info,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct V1Info {
    info: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct V2SystemInfo {
    help_message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct V1Names {
    names: Vec<V1Name>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct V1Name {
    system: String,
    name: String,
    sort_key: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct V2GameSystems {
    game_system: Vec<GameSystemInfo>,
}

impl From<V1Roll> for EvalResult {
    fn from(roll: V1Roll) -> Self {
        Self {
            text: roll.result,
            secret: roll.secret,
            rands: roll.dices.into_iter().map(|d| (d.value, d.faces)).collect(),
            ..Self::default()
        }
    }
}

impl From<V2Roll> for EvalResult {
    fn from(roll: V2Roll) -> Self {
        Self {
            text: roll.text,
            secret: roll.secret,
            rands: roll.rands.into_iter().map(|r| (r.value, r.sides)).collect(),
            success: roll.success,
            failure: roll.failure,
            critical: roll.critical,
            fumble: roll.fumble,
        }
    }
}

/// Client for an external dice API server.
pub struct RemoteEngine {
    client: Client,
    base_url: Url,
    version: ApiVersion,
}

impl RemoteEngine {
    pub fn new(api_url: &str, version: ApiVersion, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(api_url)?;
        if base_url.cannot_be_a_base() {
            return Err(Error::CannotBeABase(api_url.to_string()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Ok(Self {
            client,
            base_url,
            version,
        })
    }

    pub fn version(&self) -> ApiVersion {
        self.version
    }

    /// The base URL with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::CannotBeABase(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn roll_url(&self, command: &str, system_id: &str) -> Result<Url> {
        let mut url = match self.version {
            ApiVersion::V1 => {
                let mut url = self.endpoint(&["v1", "diceroll"])?;
                url.query_pairs_mut().append_pair("system", system_id);
                url
            }
            ApiVersion::V2 => self.endpoint(&["v2", "game_system", system_id, "roll"])?,
        };
        url.query_pairs_mut().append_pair("command", command);
        Ok(url)
    }

    fn system_info_url(&self, system_id: &str) -> Result<Url> {
        match self.version {
            ApiVersion::V1 => {
                let mut url = self.endpoint(&["v1", "systeminfo"])?;
                url.query_pairs_mut().append_pair("system", system_id);
                Ok(url)
            }
            ApiVersion::V2 => self.endpoint(&["v2", "game_system", system_id]),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(%url, "dice API request");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus(status.as_u16()));
        }
        Ok(response.json::<T>().await?)
    }

    async fn roll(&self, command: &str, system_id: &str) -> Result<EvalResult> {
        let url = self.roll_url(command, system_id)?;
        Ok(match self.version {
            ApiVersion::V1 => self.get_json::<V1Roll>(url).await?.into(),
            ApiVersion::V2 => self.get_json::<V2Roll>(url).await?.into(),
        })
    }

    async fn help_message(&self, system_id: &str) -> Result<String> {
        let url = self.system_info_url(system_id)?;
        Ok(match self.version {
            ApiVersion::V1 => self.get_json::<V1SystemInfo>(url).await?.systeminfo.info,
            ApiVersion::V2 => self.get_json::<V2SystemInfo>(url).await?.help_message,
        })
    }

    async fn names(&self) -> Result<Vec<GameSystemInfo>> {
        Ok(match self.version {
            ApiVersion::V1 => {
                let url = self.endpoint(&["v1", "names"])?;
                self.get_json::<V1Names>(url)
                    .await?
                    .names
                    .into_iter()
                    .map(|n| GameSystemInfo {
                        id: n.system,
                        name: n.name,
                        sort_key: n.sort_key,
                    })
                    .collect()
            }
            ApiVersion::V2 => {
                let url = self.endpoint(&["v2", "game_system"])?;
                self.get_json::<V2GameSystems>(url).await?.game_system
            }
        })
    }
}

#[async_trait]
impl DiceEngine for RemoteEngine {
    async fn evaluate(&self, command: &str, system_id: &str) -> RollOutcome {
        match self.roll(command, system_id).await {
            Ok(result) => RollOutcome::from_eval(system_id, result),
            Err(e) => {
                warn!(system = system_id, command, error = %e, "dice API roll failed");
                RollOutcome::empty(system_id)
            }
        }
    }

    /// Choice commands are checked by the caller, which lets them through
    /// regardless.
    async fn accepts(&self, command: &str, _system_id: &str) -> bool {
        ACCEPTED.is_match(command)
    }

    async fn help_messages(&self, system_id: &str) -> Vec<String> {
        let mut ids = vec![DEFAULT_SYSTEM];
        if !system_id.is_empty() && system_id != DEFAULT_SYSTEM {
            ids.push(system_id);
        }

        join_all(ids.into_iter().map(|id| self.help_message(id)))
            .await
            .into_iter()
            .map(|help| match help {
                Ok(text) if !text.is_empty() => adapt_help(&text),
                Ok(_) => NO_HELP.to_string(),
                Err(e) => {
                    warn!(error = %e, "dice API help request failed");
                    NO_HELP.to_string()
                }
            })
            .collect()
    }

    async fn game_systems(&self) -> Vec<GameSystemInfo> {
        self.names().await.unwrap_or_else(|e| {
            warn!(error = %e, "dice API system list request failed");
            Vec::new()
        })
    }

    fn is_concurrent(&self) -> bool {
        true
    }

    fn label(&self) -> String {
        format!("Dice-API({})", self.base_url.as_str().trim_end_matches('/'))
    }
}
