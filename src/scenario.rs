//! Scenario files: the mutation, its base config, a list of calls, and the
//! executor outcome each committed call should receive.

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use mutation_runner::{
    executor::{ScriptedOutcome, ScriptedResult},
    FieldError, JsonOperation, MutationConfig, OverlapPolicy, Uploadable,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub mutation: DocumentSpec,
    #[serde(default)]
    pub base: ConfigSpec,
    #[serde(default)]
    pub calls: Vec<CallSpec>,
    /// Tear the consumer down this long after the scenario starts.
    #[serde(default, with = "humantime_serde")]
    pub teardown_after: Option<Duration>,
    #[serde(default)]
    pub overlap: OverlapSpec,
    /// Directory relative upload paths resolve against. Set by [`Scenario::load`].
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentSpec {
    pub name: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapSpec {
    #[default]
    LastSettled,
    LatestInvocation,
}

impl From<OverlapSpec> for OverlapPolicy {
    fn from(overlap: OverlapSpec) -> Self {
        match overlap {
            OverlapSpec::LastSettled => OverlapPolicy::LastSettledWins,
            OverlapSpec::LatestInvocation => OverlapPolicy::LatestInvocationWins,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigSpec {
    #[serde(default)]
    pub variables: Option<Value>,
    #[serde(default)]
    pub optimistic_response: Option<Value>,
    #[serde(default)]
    pub configs: Option<Vec<Value>>,
    #[serde(default)]
    pub uploadables: BTreeMap<String, UploadSpec>,
    /// Attach an `on_error` handler so failures resolve instead of rejecting.
    #[serde(default)]
    pub handle_errors: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadSpec {
    pub path: PathBuf,
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallSpec {
    /// Offset from scenario start at which the call is dispatched.
    #[serde(default, with = "humantime_serde")]
    pub at: Option<Duration>,
    #[serde(flatten)]
    pub config: ConfigSpec,
    /// Omitted for calls expected to be rejected before reaching the executor.
    #[serde(default)]
    pub outcome: Option<OutcomeSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutcomeSpec {
    #[serde(default, with = "humantime_serde")]
    pub after: Option<Duration>,
    #[serde(default)]
    pub respond: Option<Value>,
    #[serde(default)]
    pub field_errors: Vec<FieldError>,
    #[serde(default)]
    pub fail: Option<String>,
    #[serde(default)]
    pub abandon: bool,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read scenario {}", path.display()))?;
        let mut scenario: Scenario = serde_json::from_str(&raw)
            .with_context(|| format!("parse scenario {}", path.display()))?;
        scenario.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        scenario.validate()?;
        Ok(scenario)
    }

    /// Every call that will reach the executor needs an outcome, and none
    /// that won't may carry one; otherwise the script drifts out of step.
    pub fn validate(&self) -> Result<()> {
        for (i, call) in self.calls.iter().enumerate() {
            let commits = call.config.variables.is_some() || self.base.variables.is_some();
            match (&call.outcome, commits) {
                (Some(outcome), true) => outcome
                    .to_result()
                    .with_context(|| format!("call {i}: invalid outcome"))
                    .map(|_| ())?,
                (None, false) => {}
                (Some(_), false) => {
                    bail!("call {i} has no variables and will be rejected; remove its outcome")
                }
                (None, true) => bail!("call {i} reaches the executor but has no outcome"),
            }
        }
        Ok(())
    }

    /// Executor script, in commit order.
    pub fn script(&self) -> Result<Vec<ScriptedOutcome>> {
        self.calls
            .iter()
            .filter_map(|c| c.outcome.as_ref())
            .map(|o| {
                Ok(ScriptedOutcome {
                    after: o.after.unwrap_or_default(),
                    result: o.to_result()?,
                })
            })
            .collect()
    }
}

impl ConfigSpec {
    /// Build the data part of a config. Callbacks are attached by the caller.
    pub fn to_config(&self, base_dir: &Path) -> Result<MutationConfig<JsonOperation>> {
        let mut config = MutationConfig::new();
        config.variables = self.variables.clone();
        config.optimistic_response = self.optimistic_response.clone();
        config.configs = self.configs.clone();
        for (key, upload) in &self.uploadables {
            config = config.uploadable(key.clone(), upload.load(base_dir)?);
        }
        Ok(config)
    }
}

impl UploadSpec {
    fn load(&self, base_dir: &Path) -> Result<Uploadable> {
        let path = if self.path.is_absolute() {
            self.path.clone()
        } else {
            base_dir.join(&self.path)
        };
        let content =
            std::fs::read(&path).with_context(|| format!("read upload {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        Ok(Uploadable {
            file_name,
            content_type: self.content_type.clone(),
            content: Bytes::from(content),
        })
    }
}

impl OutcomeSpec {
    fn to_result(&self) -> Result<ScriptedResult> {
        match (&self.respond, &self.fail, self.abandon) {
            (Some(response), None, false) => Ok(ScriptedResult::Respond {
                response: response.clone(),
                field_errors: self.field_errors.clone(),
            }),
            (None, Some(message), false) => Ok(ScriptedResult::Fail(message.clone())),
            (None, None, true) => Ok(ScriptedResult::Abandon),
            (None, None, false) => bail!("outcome needs one of respond, fail or abandon"),
            _ => bail!("outcome may set only one of respond, fail or abandon"),
        }
    }
}
