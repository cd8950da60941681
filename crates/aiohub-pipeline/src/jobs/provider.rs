use async_trait::async_trait;

/// Outcome of executing one job against the external provider.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutput {
    Translated(String),
    Embedded(Vec<f32>),
}

#[derive(Debug)]
pub struct ProviderError {
    pub code: &'static str,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ProviderError {}

/// Boundary to the external translation/embedding service. Implementors
/// receive the frozen `source_text` captured at enqueue time; they never
/// see the source row.
#[async_trait]
pub trait JobProvider: Send + Sync {
    async fn translate(
        &self,
        source_text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, ProviderError>;

    async fn embed(&self, source_text: &str) -> Result<Vec<f32>, ProviderError>;
}
