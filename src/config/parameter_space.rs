//! Parameter spaces for the optimizer, read from TOML.
//!
//! ```toml
//! period = [10, 20, 50]
//! oversold = [25.0, 30.0]
//! ```

use crate::domain::optimization::parameters::ParameterSpace;
use anyhow::{Context, Result};
use std::path::Path;

pub fn parse_parameter_space(contents: &str) -> Result<ParameterSpace> {
    let space: ParameterSpace =
        toml::from_str(contents).context("Parameter space must map names to arrays of values")?;

    if let Some((name, _)) = space.iter().find(|(_, values)| values.is_empty()) {
        anyhow::bail!("Parameter '{}' has no candidate values", name);
    }

    Ok(space)
}

pub fn load_parameter_space(path: &Path) -> Result<ParameterSpace> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read parameter space {}", path.display()))?;
    parse_parameter_space(&contents)
}
