use serde::Deserialize;

/// Names of the point values the model parameters are initialized from.
///
/// Each field selects which entry of the per-point named value store feeds
/// the corresponding model-parameter column. All fields are optional in a
/// config file; unset fields keep their documented default.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    pub origins_name: String,
    pub destinations_name: String,
    pub selectivity_name: String,
    pub convolution_start_name: String,
    pub convolution_size_name: String,
    pub convolution_intensity_name: String,
    /// Description field holding a per-origin ring layout.
    pub fixed_rings_name: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            origins_name: "origins".to_string(),
            destinations_name: "destinations".to_string(),
            selectivity_name: "selectivity".to_string(),
            convolution_start_name: "conv_a".to_string(),
            convolution_size_name: "conv_b".to_string(),
            convolution_intensity_name: "conv_alpha".to_string(),
            fixed_rings_name: "fixed_rings".to_string(),
        }
    }
}
