use std::collections::VecDeque;

use mnist_protocol::MNIST_PIXELS;
use mnist_session::{Classifier, ClassifierError, TensorRole, NUM_CLASSES};

/// Scriptable stand-in for the classifier engine.
///
/// Every successful `invoke` copies `logits` into the output buffer.
/// Outcomes queued with [`MockClassifier::fail_next_invoke`] are consumed
/// first.
#[derive(Debug, Clone)]
pub struct MockClassifier {
    pub input: Vec<i8>,
    pub output: Vec<i8>,
    pub logits: Vec<i8>,
    pub input_params: (f32, i32),
    pub output_params: (f32, i32),
    pub init_result: Result<(), ClassifierError>,
    pub invoke_failures: VecDeque<ClassifierError>,
    pub invocations: usize,
    pub initialized: bool,
}

impl MockClassifier {
    /// Healthy classifier with MNIST-shaped tensors that always predicts
    /// class 0.
    pub fn new() -> Self {
        let mut logits = vec![0i8; NUM_CLASSES];
        logits[0] = 127;
        logits[1] = -128;
        Self {
            input: vec![0; MNIST_PIXELS],
            output: vec![0; NUM_CLASSES],
            logits,
            input_params: (1.0 / 255.0, -128),
            output_params: (1.0, 0),
            init_result: Ok(()),
            invoke_failures: VecDeque::new(),
            invocations: 0,
            initialized: false,
        }
    }

    pub fn with_logits(mut self, logits: &[i8]) -> Self {
        self.logits = logits.to_vec();
        self
    }

    pub fn failing_init(mut self, code: i32) -> Self {
        self.init_result = Err(ClassifierError::Status(code));
        self
    }

    pub fn fail_next_invoke(mut self, code: i32) -> Self {
        self.invoke_failures.push_back(ClassifierError::Status(code));
        self
    }
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for MockClassifier {
    fn initialize(&mut self) -> Result<(), ClassifierError> {
        self.init_result.clone()?;
        self.initialized = true;
        Ok(())
    }

    fn input_buffer(&mut self) -> &mut [i8] {
        &mut self.input
    }

    fn output_buffer(&self) -> &[i8] {
        &self.output
    }

    fn quantization_params(&self, role: TensorRole) -> (f32, i32) {
        match role {
            TensorRole::Input => self.input_params,
            TensorRole::Output => self.output_params,
        }
    }

    fn invoke(&mut self) -> Result<(), ClassifierError> {
        self.invocations += 1;
        if let Some(err) = self.invoke_failures.pop_front() {
            return Err(err);
        }
        let n = self.output.len().min(self.logits.len());
        self.output[..n].copy_from_slice(&self.logits[..n]);
        Ok(())
    }

    fn arena_used_bytes(&self) -> Option<usize> {
        Some(self.input.len() + self.output.len())
    }
}
