use crate::strategy::Strategy;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StrategiesConfig {
    #[serde(default)]
    pub strategies: Vec<Strategy>,
}
