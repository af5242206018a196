// Pipeline sizing shared by the queues and the synthesis worker

use serde::{Deserialize, Serialize};

/// Capacities of the two pipeline stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Unacknowledged text items the producer may get ahead of the worker (0 = unbounded)
    pub input_capacity: usize,

    /// Pending deliveries the worker may synthesize ahead of the listener (0 = unbounded)
    pub output_capacity: usize,

    /// Per-utterance chunk bound; 0 keeps audio buffers unbounded
    pub audio_buffer_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_capacity: 50,
            output_capacity: 5,
            audio_buffer_capacity: 0,
        }
    }
}

impl PipelineConfig {
    /// Validate pipeline sizing
    pub fn validate(&self) -> Result<(), String> {
        const MAX_CAPACITY: usize = 10_000;

        if self.input_capacity > MAX_CAPACITY {
            return Err(format!("input_capacity too large (max {})", MAX_CAPACITY));
        }

        if self.output_capacity > MAX_CAPACITY {
            return Err(format!("output_capacity too large (max {})", MAX_CAPACITY));
        }

        if self.audio_buffer_capacity > 1_000_000 {
            return Err("audio_buffer_capacity too large (max 1000000 chunks)".to_string());
        }

        Ok(())
    }

    /// Chunk bound for new audio buffers, if any
    pub fn audio_buffer_bound(&self) -> Option<usize> {
        (self.audio_buffer_capacity > 0).then_some(self.audio_buffer_capacity)
    }
}
