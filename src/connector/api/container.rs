use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::debug;

use crate::application::{StreamSource, StreamingQueryController};
use crate::connector::{GroqConfig, GroqStreamSource, MockStreamSource};
use crate::domain::BrandingFilter;

const MOCK_RESPONSE: &str = "Hello from DeepSeek. This is an offline answer; \
set GROQ_API_KEY and drop --mock to query the real model.";
const MOCK_FRAGMENT_DELAY: Duration = Duration::from_millis(40);

pub struct ContainerConfig {
    pub mock: bool,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
    /// How many times a failed query is re-issued before giving up.
    pub retries: u32,
}

pub struct Container {
    stream_source: Arc<dyn StreamSource>,
    branding: BrandingFilter,
    config: ContainerConfig,
}

impl Container {
    pub fn new(config: ContainerConfig) -> Result<Self> {
        let stream_source: Arc<dyn StreamSource> = if config.mock {
            debug!("Using mock stream source");
            Arc::new(MockStreamSource::from_text(MOCK_RESPONSE).with_delay(MOCK_FRAGMENT_DELAY))
        } else {
            let mut groq = GroqConfig::from_env();
            if let Some(model) = config.model.as_deref() {
                groq = groq.with_model(model);
            }
            if let Some(base_url) = config.base_url.as_deref() {
                groq = groq.with_base_url(base_url);
            }
            if let Some(temperature) = config.temperature {
                groq = groq.with_temperature(temperature);
            }
            debug!(
                "Using Groq stream source at {} with model {}",
                groq.base_url(),
                groq.model()
            );
            Arc::new(GroqStreamSource::new(groq))
        };

        Ok(Self {
            stream_source,
            branding: BrandingFilter::default(),
            config,
        })
    }

    /// Wire an externally built source, bypassing source selection.
    pub fn with_stream_source(stream_source: Arc<dyn StreamSource>, config: ContainerConfig) -> Self {
        Self {
            stream_source,
            branding: BrandingFilter::default(),
            config,
        }
    }

    pub fn query_controller(&self) -> StreamingQueryController {
        StreamingQueryController::new(Arc::clone(&self.stream_source))
            .with_branding(self.branding.clone())
    }

    pub fn retries(&self) -> u32 {
        self.config.retries
    }
}
