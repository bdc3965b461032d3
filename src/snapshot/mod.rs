// Snapshot ingestion and step history

pub mod heap;
pub mod ingest;

pub use heap::{Datum, Heap, HeapCopier, HeapId, HeapObject, Primitive};
pub use ingest::{
    ingest_state, EnvBinding, EnvNode, EnvTree, IngestOptions, IngestedState, NormControl,
    NormStash,
};

use crate::machine::MachineState;

/// Bounded history of machine steps, used to step backward and forward
#[derive(Debug)]
pub struct StepHistory {
    steps: Vec<MachineState>,
    max_memory: usize,
    current_memory: usize,
}

impl StepHistory {
    pub fn new(max_memory: usize) -> Self {
        StepHistory {
            steps: Vec::new(),
            max_memory,
            current_memory: 0,
        }
    }

    /// Add a step to history
    pub fn push(&mut self, step: MachineState) -> Result<(), String> {
        let step_size = step.estimated_size();

        if self.current_memory + step_size > self.max_memory {
            return Err(format!(
                "Step history limit exceeded: {} + {} > {}",
                self.current_memory, step_size, self.max_memory
            ));
        }

        self.current_memory += step_size;
        self.steps.push(step);
        Ok(())
    }

    /// Get a step by index
    pub fn get(&self, index: usize) -> Option<&MachineState> {
        self.steps.get(index)
    }

    /// Get the number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Get current memory usage
    pub fn memory_usage(&self) -> usize {
        self.current_memory
    }
}
