//! Bridge configuration.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Request code the purchase dialog reports its activity result with.
pub const STORE_REQUEST_CODE: i32 = 0xC07C;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Host object receiving the completion messages.
    #[serde(default = "default_game_object")]
    pub game_object: String,
    #[serde(default = "default_request_code")]
    pub request_code: i32,
    #[serde(default)]
    pub methods: CallbackMethods,
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Method names the completion messages are posted under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackMethods {
    #[serde(default = "default_list_products")]
    pub list_products: String,
    #[serde(default = "default_launch_purchase")]
    pub launch_purchase: String,
    #[serde(default = "default_terminate_purchase")]
    pub terminate_purchase: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            game_object: default_game_object(),
            request_code: default_request_code(),
            methods: CallbackMethods::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for CallbackMethods {
    fn default() -> Self {
        Self {
            list_products: default_list_products(),
            launch_purchase: default_launch_purchase(),
            terminate_purchase: default_terminate_purchase(),
        }
    }
}

impl BridgeConfig {
    /// Loads the configuration from a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

fn default_game_object() -> String {
    "CotcInappPurchaseGameObject".to_string()
}

fn default_request_code() -> i32 {
    STORE_REQUEST_CODE
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_list_products() -> String {
    "Android_GetInformationAboutProducts_Done".to_string()
}

fn default_launch_purchase() -> String {
    "Android_LaunchPurchase_Done".to_string()
}

fn default_terminate_purchase() -> String {
    "Android_TerminatePurchase_Done".to_string()
}
