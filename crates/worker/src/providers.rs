use aiohub_pipeline::jobs::{JobProvider, ProviderError};
use async_trait::async_trait;
use std::time::Duration;

/// Deterministic local provider for development and operational smoke
/// tests. Replace with a real translation/embedding client; the
/// pipeline only sees the `JobProvider` trait.
pub struct DemoProvider {
    pub simulated_latency: Duration,
}

impl DemoProvider {
    pub fn new() -> Self {
        Self {
            simulated_latency: Duration::from_millis(50),
        }
    }
}

#[async_trait]
impl JobProvider for DemoProvider {
    async fn translate(
        &self,
        source_text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, ProviderError> {
        if target_lang.trim().is_empty() {
            return Err(ProviderError::new(
                "UNSUPPORTED_LANGUAGE",
                "empty target language",
            ));
        }

        tokio::time::sleep(self.simulated_latency).await;
        Ok(format!("[{source_lang}->{target_lang}] {source_text}"))
    }

    async fn embed(&self, source_text: &str) -> Result<Vec<f32>, ProviderError> {
        if source_text.is_empty() {
            return Err(ProviderError::new("INVALID_INPUT", "empty source text"));
        }

        tokio::time::sleep(self.simulated_latency).await;

        // Cheap deterministic vector so repeated runs are comparable.
        let mut vector = vec![0.0f32; 16];
        for (i, byte) in source_text.bytes().enumerate() {
            vector[i % 16] += (byte as f32) / 255.0;
        }
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }
}
