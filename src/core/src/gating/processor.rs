/// Handles a frame that passed the gate and produces the text sent back to the client.
pub trait FrameProcessor: Send + Sync {
    fn process(&self, annotated: &str) -> String;
}

#[derive(Debug, Default, Clone)]
pub struct EchoProcessor;

impl FrameProcessor for EchoProcessor {
    fn process(&self, annotated: &str) -> String {
        format!("Processed: {}", annotated)
    }
}
