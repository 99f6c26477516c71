//! Named engine entry points for out-of-process collaborators
//!
//! Every handler takes the raw request bytes and returns the encoded
//! response. Configurations travel as YAML, everything else as JSON.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::{Boundary, Configuration, DEFAULT_NOISE_STD};
use crate::curve::synthesize;
use crate::error::{GenError, GenResult};
use crate::generate::{generate_with, GenerateOptions, ResolveOrder};
use crate::preview::bezier_curve;

/// Handler function type: input bytes → Result<output bytes, error>
pub type Handler = Box<dyn Fn(&[u8]) -> GenResult<Vec<u8>> + Send + Sync>;

/// Registry of engine method handlers
pub struct Registry {
    handlers: HashMap<String, Handler>,
}

/// Request body of `generate` and `export_csv`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// YAML configuration document
    pub config: String,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub order: Option<String>,
}

/// Request body of `synthesize`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesizeRequest {
    pub control_points: Vec<f64>,
    pub range: [f64; 2],
    pub n_samples: usize,
    #[serde(default = "default_noise")]
    pub noise_std: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Request body of `preview`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewRequest {
    pub control_points: Vec<f64>,
    pub num: usize,
}

/// Response body of `validate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub violations: Vec<String>,
}

fn default_noise() -> f64 {
    DEFAULT_NOISE_STD
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry pre-populated with `generate`, `export_csv`, `validate`,
    /// `synthesize` and `preview`.
    pub fn with_engine() -> Self {
        let mut registry = Self::new();
        registry.register("generate", handle_generate);
        registry.register("export_csv", handle_export_csv);
        registry.register("validate", handle_validate);
        registry.register("synthesize", handle_synthesize);
        registry.register("preview", handle_preview);
        registry
    }

    /// Register a handler function for a method name
    ///
    /// # Example
    /// ```
    /// use netseries_core::Registry;
    ///
    /// let mut registry = Registry::new();
    /// registry.register("echo", |input| Ok(input.to_vec()));
    /// ```
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&[u8]) -> GenResult<Vec<u8>> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Box::new(handler));
    }

    /// Call a registered method
    pub fn call(&self, method: &str, input: &[u8]) -> GenResult<Vec<u8>> {
        let handler = self
            .handlers
            .get(method)
            .ok_or_else(|| GenError::UnknownMethod(method.to_string()))?;

        handler(input)
    }

    /// Check if a method is registered
    pub fn has_method(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Get list of all registered methods
    pub fn methods(&self) -> Vec<&str> {
        self.handlers.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

fn utf8(input: &[u8]) -> GenResult<&str> {
    std::str::from_utf8(input).map_err(|e| GenError::Parse(e.to_string()))
}

fn run(input: &[u8]) -> GenResult<crate::series::GeneratedSeries> {
    let request: GenerateRequest = serde_json::from_slice(input)?;
    let config = Configuration::from_yaml_str(&request.config)?;
    let order = match request.order.as_deref() {
        Some(s) => s.parse()?,
        None => ResolveOrder::default(),
    };
    let options = GenerateOptions {
        order,
        seed: request.seed,
    };
    generate_with(&config, &options)
}

fn handle_generate(input: &[u8]) -> GenResult<Vec<u8>> {
    Ok(serde_json::to_vec(&run(input)?)?)
}

fn handle_export_csv(input: &[u8]) -> GenResult<Vec<u8>> {
    let series = run(input)?;
    let mut out = Vec::new();
    series
        .write_combined_csv(&mut out)
        .map_err(|e| GenError::Internal(e.to_string()))?;
    Ok(out)
}

fn handle_validate(input: &[u8]) -> GenResult<Vec<u8>> {
    let report = match Configuration::from_yaml_str(utf8(input)?) {
        Ok(_) => ValidationReport {
            valid: true,
            violations: vec![],
        },
        Err(GenError::InvalidConfiguration(violations)) => ValidationReport {
            valid: false,
            violations,
        },
        Err(e) => return Err(e),
    };
    Ok(serde_json::to_vec(&report)?)
}

fn handle_synthesize(input: &[u8]) -> GenResult<Vec<u8>> {
    let request: SynthesizeRequest = serde_json::from_slice(input)?;
    let options = GenerateOptions {
        seed: request.seed,
        ..GenerateOptions::default()
    };
    let series = synthesize(
        &request.control_points,
        Boundary::new(request.range[0], request.range[1]),
        request.n_samples,
        request.noise_std,
        &mut options.rng(),
    )?;
    Ok(serde_json::to_vec(&series)?)
}

fn handle_preview(input: &[u8]) -> GenResult<Vec<u8>> {
    let request: PreviewRequest = serde_json::from_slice(input)?;
    Ok(serde_json::to_vec(&bezier_curve(&request.control_points, request.num)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = "n_cycles: 5\nsupernodes:\n  0:\n    node_type: independent\n    n_subnodes: 1\n    boundaries: [[0, 1]]\n    control_points: [0.2, 0.8]\n";

    #[test]
    fn test_register_and_call() {
        let mut registry = Registry::new();

        registry.register("echo", |input| Ok(input.to_vec()));

        let result = registry.call("echo", b"test").unwrap();
        assert_eq!(result, b"test");
    }

    #[test]
    fn test_unknown_method() {
        let registry = Registry::new();

        let result = registry.call("missing", b"test");
        assert!(matches!(result, Err(GenError::UnknownMethod(_))));
    }

    #[test]
    fn test_engine_methods() {
        let registry = Registry::with_engine();
        let mut methods = registry.methods();
        methods.sort();
        assert_eq!(methods, vec!["export_csv", "generate", "preview", "synthesize", "validate"]);
        assert!(!registry.has_method("missing"));
    }

    #[test]
    fn test_generate_returns_json_series() {
        let registry = Registry::with_engine();
        let request = serde_json::to_vec(&GenerateRequest {
            config: CONFIG.to_string(),
            seed: Some(1),
            order: None,
        })
        .unwrap();
        let out = registry.call("generate", &request).unwrap();
        let decoded: std::collections::BTreeMap<String, Vec<Vec<f64>>> =
            serde_json::from_slice(&out).unwrap();
        assert_eq!(decoded["0"][0].len(), 5);

        let csv = registry.call("export_csv", &request).unwrap();
        let text = String::from_utf8(csv).unwrap();
        assert!(text.starts_with("cycle,0_0\n"));
        assert_eq!(text.lines().count(), 6);
    }

    #[test]
    fn test_validate_reports_violations() {
        let registry = Registry::with_engine();
        let out = registry.call("validate", CONFIG.as_bytes()).unwrap();
        let report: ValidationReport = serde_json::from_slice(&out).unwrap();
        assert!(report.valid);

        let broken = CONFIG.replace("n_cycles: 5", "n_cycles: 0");
        let out = registry.call("validate", broken.as_bytes()).unwrap();
        let report: ValidationReport = serde_json::from_slice(&out).unwrap();
        assert!(!report.valid);
        assert_eq!(report.violations.len(), 1);
    }

    #[test]
    fn test_synthesize_and_preview() {
        let registry = Registry::with_engine();
        let out = registry
            .call(
                "synthesize",
                br#"{"control_points": [0.1, 0.9], "range": [2.0, 4.0], "n_samples": 8, "noise_std": 0.0}"#,
            )
            .unwrap();
        let series: Vec<f64> = serde_json::from_slice(&out).unwrap();
        assert_eq!(series.len(), 8);
        assert_eq!(series[0], 2.0);
        assert_eq!(series[7], 4.0);

        let out = registry
            .call("preview", br#"{"control_points": [0.1, 0.9], "num": 3}"#)
            .unwrap();
        let points: Vec<(f64, f64)> = serde_json::from_slice(&out).unwrap();
        assert_eq!(points.len(), 3);
    }

    #[test]
    fn test_bad_request_is_parse_error() {
        let registry = Registry::with_engine();
        let err = registry.call("synthesize", b"{not json").unwrap_err();
        assert!(matches!(err, GenError::Parse(_)));
    }
}
