//! Per-call options for the orchestrators.

use conflux_models::llm::{CallSettings, GenerationRequest, Message, ToolChoice};
use conflux_tools::ToolSet;
use tokio_util::sync::CancellationToken;

/// Options shared by the text and object orchestrators.
///
/// ```
/// use conflux_generate::GenerateOptions;
/// use conflux_models::llm::CallSettings;
///
/// let options = GenerateOptions::new()
///     .with_system("Answer briefly.")
///     .with_settings(CallSettings::new().with_temperature(0.3))
///     .with_max_steps(4);
/// assert!(options.forward_tool_errors);
/// ```
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// System prompt.
    pub system: Option<String>,
    /// Sampling and length settings.
    pub settings: CallSettings,
    /// Tools the model may call.
    pub tools: ToolSet,
    /// How the model should choose tools.
    pub tool_choice: Option<ToolChoice>,
    /// Maximum number of model invocations, counting tool continuations.
    /// Values below one are read as one.
    pub max_steps: usize,
    /// Whether executor failures are reported to the model as error tool
    /// results. When `false` they fail the whole call.
    pub forward_tool_errors: bool,
    /// Cancellation signal for the whole call.
    pub cancellation: CancellationToken,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            system: None,
            settings: CallSettings::default(),
            tools: ToolSet::default(),
            tool_choice: None,
            max_steps: 1,
            forward_tool_errors: true,
            cancellation: CancellationToken::new(),
        }
    }
}

impl GenerateOptions {
    /// Creates options with a single step and error forwarding enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the system prompt.
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Sets call settings.
    #[must_use]
    pub fn with_settings(mut self, settings: CallSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the tools.
    #[must_use]
    pub fn with_tools(mut self, tools: ToolSet) -> Self {
        self.tools = tools;
        self
    }

    /// Sets the tool choice.
    #[must_use]
    pub fn with_tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = Some(choice);
        self
    }

    /// Sets the step limit.
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Enables or disables forwarding executor failures to the model.
    #[must_use]
    pub fn forward_tool_errors(mut self, forward: bool) -> Self {
        self.forward_tool_errors = forward;
        self
    }

    /// Sets the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub(crate) fn step_limit(&self) -> usize {
        self.max_steps.max(1)
    }

    /// Builds the model request for one step.
    pub(crate) fn request(&self, messages: Vec<Message>) -> GenerationRequest {
        let mut request = GenerationRequest::from_messages(messages)
            .settings(self.settings.clone())
            .cancellation(self.cancellation.clone());
        request.system.clone_from(&self.system);
        if !self.tools.is_empty() {
            request = request.tools(self.tools.definitions());
            request.tool_choice = self.tool_choice.clone();
        }
        request
    }
}

/// Options for the embedding orchestrators.
#[derive(Debug, Clone, Default)]
pub struct EmbedOptions {
    /// Cancellation signal for the call.
    pub cancellation: CancellationToken,
}

impl EmbedOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}
