//! Doctor command for system diagnostics
//!
//! Health checks for the local setup: data directory, corpus batches,
//! sample fallback, and Ollama connectivity.

use std::path::PathBuf;

use crate::corpus::CorpusLoader;
use crate::generation::OllamaProvider;

/// Health check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Pass,
    Warn(String),
    Fail(String),
}

/// Individual health check
#[derive(Debug)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
}

/// Doctor diagnostics system
pub struct Doctor {
    ollama_url: String,
    model: String,
    data_dir: PathBuf,
}

impl Doctor {
    /// Create a new doctor instance
    pub fn new(ollama_url: String, model: String, data_dir: PathBuf) -> Self {
        Self {
            ollama_url,
            model,
            data_dir,
        }
    }

    /// Run all health checks
    pub async fn run_diagnostics(&self) -> Vec<HealthCheck> {
        let mut checks = Vec::new();

        checks.push(self.check_data_dir());
        checks.push(self.check_corpus());
        checks.push(self.check_sample());
        checks.push(self.check_ollama_api().await);
        checks.push(self.check_model_available().await);

        checks
    }

    /// Check 1: data directory exists
    fn check_data_dir(&self) -> HealthCheck {
        let status = if self.data_dir.is_dir() {
            HealthStatus::Pass
        } else {
            HealthStatus::Fail(format!(
                "data directory not found: {}",
                self.data_dir.display()
            ))
        };
        HealthCheck {
            name: "Data directory".to_string(),
            status,
        }
    }

    /// Check 2: corpus batches load
    fn check_corpus(&self) -> HealthCheck {
        let loader = CorpusLoader::new(&self.data_dir);
        let corpus_dir = loader.corpus_dir();
        let status = if !corpus_dir.is_dir() {
            HealthStatus::Warn(format!(
                "no corpus directory at {}; retrieval will use the sample fallback",
                corpus_dir.display()
            ))
        } else {
            let count = loader.load().len();
            if count == 0 {
                HealthStatus::Warn("corpus directory yields no documents".to_string())
            } else {
                HealthStatus::Pass
            }
        };
        HealthCheck {
            name: "Corpus batches".to_string(),
            status,
        }
    }

    /// Check 3: sample fallback present
    fn check_sample(&self) -> HealthCheck {
        let loader = CorpusLoader::new(&self.data_dir);
        let status = if loader.sample_path().is_file() {
            HealthStatus::Pass
        } else {
            HealthStatus::Warn(format!(
                "no sample file at {}; an empty corpus means empty retrieval",
                loader.sample_path().display()
            ))
        };
        HealthCheck {
            name: "Sample fallback".to_string(),
            status,
        }
    }

    /// Check 4: Ollama API reachable
    async fn check_ollama_api(&self) -> HealthCheck {
        let status = match OllamaProvider::with_config(&self.ollama_url, &self.model) {
            Ok(provider) => match provider.health_check().await {
                Ok(true) => HealthStatus::Pass,
                _ => HealthStatus::Warn(format!(
                    "Ollama not reachable at {}; answers will use the fallback text",
                    self.ollama_url
                )),
            },
            Err(e) => HealthStatus::Fail(format!("could not build HTTP client: {}", e)),
        };
        HealthCheck {
            name: "Ollama API".to_string(),
            status,
        }
    }

    /// Check 5: configured model is available
    async fn check_model_available(&self) -> HealthCheck {
        let status = match OllamaProvider::with_config(&self.ollama_url, &self.model) {
            Ok(provider) => match provider.list_models().await {
                Ok(models) if models.iter().any(|m| m.starts_with(&self.model)) => {
                    HealthStatus::Pass
                }
                Ok(_) => HealthStatus::Warn(format!(
                    "model {} not found; pull it with: ollama pull {}",
                    self.model, self.model
                )),
                Err(_) => HealthStatus::Warn("could not list models".to_string()),
            },
            Err(e) => HealthStatus::Fail(format!("could not build HTTP client: {}", e)),
        };
        HealthCheck {
            name: "Model available".to_string(),
            status,
        }
    }
}
