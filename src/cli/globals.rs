use crate::otp::{FlowConfig, FlowMode};

/// Settings shared by every action.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub mode: FlowMode,
    pub email: String,
    pub config: FlowConfig,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(mode: FlowMode) -> Self {
        Self {
            mode,
            email: String::new(),
            config: FlowConfig::default(),
        }
    }

    pub fn set_email(&mut self, email: &str) {
        self.email = email.trim().to_string();
    }
}
