use std::collections::HashMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::errors::{ExecError, Result};

pub const DEFAULT_CHANNEL_BUFFER: usize = 64;

const MIN_CHANNEL_BUFFER: usize = 1;
const MAX_CHANNEL_BUFFER: usize = 65536;

/// Configuration for executing a single job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    /// Capacity of every handoff between two tasks.
    pub channel_buffer: usize,
    /// Resume panics from tasks instead of converting them into errors.
    pub disable_recover: bool,
}

impl Default for ExecConfig {
    fn default() -> Self {
        ExecConfig {
            channel_buffer: DEFAULT_CHANNEL_BUFFER,
            disable_recover: false,
        }
    }
}

impl ExecConfig {
    pub fn set_from_str(&mut self, name: &str, value: &str) -> Result<()> {
        let func = GET_SET_FUNCTIONS
            .get(name)
            .ok_or_else(|| ExecError::Plan(format!("Missing setting for '{name}'")))?;

        (func.set)(value, self)
    }

    pub fn get_as_string(&self, name: &str) -> Result<String> {
        let func = GET_SET_FUNCTIONS
            .get(name)
            .ok_or_else(|| ExecError::Plan(format!("Missing setting for '{name}'")))?;

        Ok((func.get)(self))
    }

    /// Names of all settings, sorted.
    pub fn setting_names() -> Vec<&'static str> {
        let mut names: Vec<_> = GET_SET_FUNCTIONS.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

struct SettingFunctions {
    set: fn(value: &str, conf: &mut ExecConfig) -> Result<()>,
    get: fn(conf: &ExecConfig) -> String,
}

impl SettingFunctions {
    const fn new<S: ExecSetting>() -> Self {
        SettingFunctions {
            set: S::set_from_str as _,
            get: S::get_as_string as _,
        }
    }
}

fn insert_setting<S: ExecSetting>(map: &mut HashMap<&'static str, SettingFunctions>) {
    if map.insert(S::NAME, SettingFunctions::new::<S>()).is_some() {
        panic!("Duplicate settings names: {}", S::NAME);
    }
}

static GET_SET_FUNCTIONS: LazyLock<HashMap<&'static str, SettingFunctions>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    insert_setting::<ChannelBuffer>(&mut map);
    insert_setting::<DisableRecover>(&mut map);

    map
});

pub trait ExecSetting: Sync + Send + 'static {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    fn set_from_str(value: &str, conf: &mut ExecConfig) -> Result<()>;
    fn get_as_string(conf: &ExecConfig) -> String;
}

pub struct ChannelBuffer;

impl ExecSetting for ChannelBuffer {
    const NAME: &'static str = "channel_buffer";
    const DESCRIPTION: &'static str = "Capacity of the handoff between two tasks";

    fn set_from_str(value: &str, conf: &mut ExecConfig) -> Result<()> {
        let val: usize = value
            .trim()
            .parse()
            .map_err(|_| ExecError::Plan(format!("Invalid value for {}: {value}", Self::NAME)))?;

        if !(MIN_CHANNEL_BUFFER..=MAX_CHANNEL_BUFFER).contains(&val) {
            return Err(ExecError::Plan(format!(
                "{} must be between {MIN_CHANNEL_BUFFER} and {MAX_CHANNEL_BUFFER}",
                Self::NAME
            )));
        }

        conf.channel_buffer = val;
        Ok(())
    }

    fn get_as_string(conf: &ExecConfig) -> String {
        conf.channel_buffer.to_string()
    }
}

pub struct DisableRecover;

impl ExecSetting for DisableRecover {
    const NAME: &'static str = "disable_recover";
    const DESCRIPTION: &'static str = "Let task panics unwind instead of returning an error";

    fn set_from_str(value: &str, conf: &mut ExecConfig) -> Result<()> {
        let val = match value.trim().to_lowercase().as_str() {
            "true" | "on" | "1" => true,
            "false" | "off" | "0" => false,
            _ => {
                return Err(ExecError::Plan(format!(
                    "Invalid value for {}: {value}",
                    Self::NAME
                )))
            }
        };
        conf.disable_recover = val;
        Ok(())
    }

    fn get_as_string(conf: &ExecConfig) -> String {
        conf.disable_recover.to_string()
    }
}
