//! Conversation engine
//!
//! Runs one turn at a time: pick the speaking agent, render its prompt over the
//! running text, ask the backend, normalize and record the reply, then hand the
//! turn to the peer. Deciding when to stop belongs to the caller (see
//! [`crate::agent::session`]).

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::agent::observer::{NoopObserver, TurnObserver};
use crate::agent::registry::AgentRegistry;
use crate::agent::template::{PromptBindings, PromptTemplate};
use crate::agent::transcript::Transcript;
use crate::core::config::RetryPolicy;
use crate::core::{AgentConfig, Config, DuetError, Result};
use crate::llm::{GenerateOptions, LLMProvider, LLMResponse};

/// Control tokens that always end a generation
pub const CONTROL_STOPS: [&str; 4] = ["<|im_start|>", "<|im_end|>", "###", "\r\n"];

/// Lifecycle of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Seed transcript in place, no turn taken yet
    Initialized,
    /// Waiting on the backend
    TurnInProgress,
    /// Last turn recorded
    TurnComplete,
    /// No further turns will be taken
    Terminated,
}

/// Per-session generation parameters
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Model used by agents without an override
    pub default_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub context_size: u32,
    /// Appended after the control tokens and turn-boundary marker
    pub extra_stops: Vec<String>,
    pub retry: RetryPolicy,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_model: config.generation.model.clone(),
            temperature: config.generation.temperature,
            max_tokens: config.generation.max_tokens,
            context_size: config.generation.context_size,
            extra_stops: config.generation.extra_stops.clone(),
            retry: config.conversation.retry,
        }
    }
}

/// Prefix a reply with its speaker label unless the model already did
pub fn normalize(agent: &str, text: &str) -> String {
    let text = text.trim();
    let label = format!("{}: ", agent);
    if text.starts_with(&label) {
        text.to_string()
    } else {
        format!("{}{}", label, text)
    }
}

/// Drives the turn-taking between two agents
pub struct ConversationEngine {
    llm: Arc<dyn LLMProvider>,
    registry: AgentRegistry,
    template: PromptTemplate,
    settings: EngineSettings,
    transcript: Transcript,
    observer: Arc<dyn TurnObserver>,
    state: EngineState,
}

impl ConversationEngine {
    /// Create an engine
    ///
    /// Agents without a task of their own take the session task. Fails if the
    /// pair is not exactly two distinct agents, the template does not parse,
    /// or the retry policy allows no attempts.
    pub fn new(
        llm: Arc<dyn LLMProvider>,
        agents: Vec<AgentConfig>,
        task: impl Into<String>,
        template: &str,
        settings: EngineSettings,
    ) -> Result<Self> {
        let task = task.into();
        let agents = agents
            .into_iter()
            .map(|agent| {
                if agent.task.is_empty() {
                    agent.with_task(task.clone())
                } else {
                    agent
                }
            })
            .collect();

        let registry = AgentRegistry::new(agents)?;
        let template = PromptTemplate::parse(template)?;

        if settings.retry.max_attempts == 0 {
            return Err(DuetError::config("retry.max_attempts must be at least 1"));
        }

        let transcript = Transcript::new(registry.first().instructions.clone(), task);

        info!(
            first = %registry.first().name,
            second = %registry.peer_of(registry.first()).name,
            model = %settings.default_model,
            provider = llm.name(),
            "conversation initialized"
        );

        Ok(Self {
            llm,
            registry,
            template,
            settings,
            transcript,
            observer: Arc::new(NoopObserver),
            state: EngineState::Initialized,
        })
    }

    /// Create an engine from the loaded configuration
    pub fn from_config(llm: Arc<dyn LLMProvider>, config: &Config) -> Result<Self> {
        Self::new(
            llm,
            config.agents.clone(),
            config.conversation.task.clone(),
            &config.conversation.prompt_template,
            EngineSettings::from_config(config),
        )
    }

    /// Attach an observer
    pub fn with_observer(mut self, observer: Arc<dyn TurnObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn observer(&self) -> &dyn TurnObserver {
        self.observer.as_ref()
    }

    /// Number of turns recorded so far
    pub fn turns(&self) -> usize {
        self.transcript.turn_count()
    }

    /// Stop accepting turns
    pub fn terminate(&mut self) {
        self.state = EngineState::Terminated;
    }

    /// The full prompt for whoever speaks next
    pub fn render_prompt(&self) -> String {
        let agent = self.registry.current();
        let peer = self.registry.peer_of(agent);

        let instructions = self.template.render(&PromptBindings {
            actor_name: &agent.name,
            reactor_name: &peer.name,
            instructions: &agent.instructions,
            task: &agent.task,
            schema: &agent.schema,
        });

        format!("{}\n\n{}", instructions, self.transcript.running_text())
            .trim()
            .to_string()
    }

    /// Generation options for whoever speaks next
    pub fn generate_options(&self) -> GenerateOptions {
        let peer = self.registry.peer_of(self.registry.current());

        let mut stop: Vec<String> = CONTROL_STOPS.iter().map(|s| s.to_string()).collect();
        stop.push(peer.speaker_label());
        stop.extend(self.settings.extra_stops.iter().cloned());

        GenerateOptions {
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            context_size: self.settings.context_size,
            stop,
        }
    }

    /// Every distinct model the agents resolve to, in speaking order
    pub fn models_in_use(&self) -> Vec<&str> {
        let mut models: Vec<&str> = Vec::new();
        for agent in self.registry.agents() {
            let model = agent.resolve_model(&self.settings.default_model);
            if !models.contains(&model) {
                models.push(model);
            }
        }
        models
    }

    /// Check every model the agents resolve to is available in the backend
    pub async fn check_models(&self) -> Result<()> {
        for model in self.models_in_use() {
            if !self.llm.is_model_available(model).await? {
                return Err(DuetError::ModelNotFound(model.to_string()));
            }
            debug!(model, provider = self.llm.name(), "model available");
        }
        Ok(())
    }

    /// Take one turn and return the recorded text
    ///
    /// Empty replies are retried for the same agent with the same prompt, up
    /// to the retry policy's attempt limit. Backend errors propagate and leave
    /// the engine in the state it had before the turn.
    pub async fn next_turn(&mut self) -> Result<String> {
        if self.state == EngineState::Terminated {
            return Err(DuetError::SessionTerminated);
        }
        let previous = self.state;
        self.state = EngineState::TurnInProgress;

        let agent = self.registry.current().clone();
        let seat = self.registry.current_seat();

        debug!(
            agent = %agent.name,
            turn = self.turns() + 1,
            "turn started"
        );
        self.observer.on_thinking(&agent.name, seat);

        let response = match self.request_reply(&agent).await {
            Ok(response) => response,
            Err(err) => {
                self.state = previous;
                return Err(err);
            }
        };

        let text = normalize(&agent.name, &response.content);
        self.transcript.record(&agent.name, &text);
        self.registry.advance();
        self.state = EngineState::TurnComplete;

        debug!(
            agent = %agent.name,
            chars = text.len(),
            completion_tokens = response.usage.as_ref().map(|u| u.completion_tokens),
            "turn recorded"
        );
        self.observer.on_message(&agent.name, seat, &text);

        Ok(text)
    }

    /// Ask the backend until it returns something other than whitespace
    async fn request_reply(&self, agent: &AgentConfig) -> Result<LLMResponse> {
        let model = agent.resolve_model(&self.settings.default_model);
        let prompt = self.render_prompt();
        let options = self.generate_options();
        let retry = self.settings.retry;

        debug!(model, prompt_chars = prompt.len(), "requesting reply");

        let mut attempt = 0;
        loop {
            attempt += 1;
            let response = self.llm.generate(model, &prompt, &options).await?;
            if !response.content.trim().is_empty() {
                return Ok(response);
            }

            let err = DuetError::EmptyGeneration {
                agent: agent.name.clone(),
            };
            warn!(error = %err, attempt, max_attempts = retry.max_attempts, "retrying turn");
            self.observer.on_empty_response(&agent.name, attempt);

            if attempt >= retry.max_attempts {
                return Err(DuetError::GenerationExhausted {
                    agent: agent.name.clone(),
                    attempts: attempt,
                });
            }

            let delay = retry.delay_for(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// A call the scripted backend received
    #[derive(Debug, Clone)]
    pub struct Call {
        pub model: String,
        pub prompt: String,
        pub options: GenerateOptions,
    }

    /// Backend that replays canned replies in order
    pub struct ScriptedProvider {
        replies: Mutex<VecDeque<Result<String>>>,
        pub calls: Mutex<Vec<Call>>,
        pub models: Vec<String>,
    }

    impl ScriptedProvider {
        pub fn new<I, S>(replies: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
                calls: Mutex::new(Vec::new()),
                models: vec!["llama3".to_string()],
            }
        }

        pub fn push_error(&self, err: DuetError) {
            self.replies.lock().unwrap().push_back(Err(err));
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        async fn generate(
            &self,
            model: &str,
            prompt: &str,
            options: &GenerateOptions,
        ) -> Result<LLMResponse> {
            self.calls.lock().unwrap().push(Call {
                model: model.to_string(),
                prompt: prompt.to_string(),
                options: options.clone(),
            });
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(DuetError::ollama("script exhausted")))?;
            Ok(LLMResponse::text(model, reply))
        }

        async fn list_models(&self) -> Result<Vec<String>> {
            Ok(self.models.clone())
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    pub fn settings() -> EngineSettings {
        EngineSettings {
            default_model: "llama3".to_string(),
            temperature: 0.7,
            max_tokens: 128,
            context_size: 2048,
            extra_stops: vec!["</end>".to_string()],
            retry: RetryPolicy::immediate(3),
        }
    }

    pub fn agents() -> Vec<AgentConfig> {
        vec![
            AgentConfig::new("actor", "Plan step by step").with_schema("thought/action/status"),
            AgentConfig::new("critic", "Review the plan")
                .with_schema("evaluation/feedback/status")
                .with_model("qwen3:8b"),
        ]
    }

    const TEMPLATE: &str = "I am {actor_name}, peer {reactor_name}. {instructions}. Task: {task}. Schema: {schema}";

    pub fn engine(provider: Arc<ScriptedProvider>) -> ConversationEngine {
        ConversationEngine::new(provider, agents(), "Reach Mars", TEMPLATE, settings()).unwrap()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("actor", "  hello  "), "actor: hello");
        assert_eq!(normalize("actor", "actor: hello"), "actor: hello");
        assert_eq!(normalize("actor", "actor:hello"), "actor: actor:hello");
        assert_eq!(normalize("actor", "critic: hi"), "actor: critic: hi");
    }

    #[test]
    fn test_initial_state() {
        let engine = engine(Arc::new(ScriptedProvider::new(Vec::<String>::new())));
        assert_eq!(engine.state(), EngineState::Initialized);
        assert_eq!(engine.transcript().len(), 2);
        assert_eq!(engine.transcript().messages()[0].content, "Plan step by step");
        assert_eq!(engine.transcript().messages()[1].content, "Reach Mars");
        assert_eq!(engine.registry().current().task, "Reach Mars");
    }

    #[test]
    fn test_single_agent_is_config_error() {
        let provider = Arc::new(ScriptedProvider::new(["never"]));
        let result = ConversationEngine::new(
            provider.clone(),
            vec![AgentConfig::new("solo", "talk")],
            "task",
            TEMPLATE,
            settings(),
        );
        assert!(matches!(result, Err(DuetError::Config(_))));
        assert!(provider.calls().is_empty());
    }

    #[test]
    fn test_bad_template_is_template_error() {
        let provider = Arc::new(ScriptedProvider::new(["never"]));
        let result =
            ConversationEngine::new(provider, agents(), "task", "Hi {nobody}", settings());
        assert!(matches!(result, Err(DuetError::Template(_))));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let provider = Arc::new(ScriptedProvider::new(["never"]));
        let mut s = settings();
        s.retry = RetryPolicy::immediate(0);
        assert!(ConversationEngine::new(provider, agents(), "task", TEMPLATE, s).is_err());
    }

    #[test]
    fn test_render_prompt_is_pure() {
        let engine = engine(Arc::new(ScriptedProvider::new(Vec::<String>::new())));
        let first = engine.render_prompt();
        assert_eq!(first, engine.render_prompt());
        assert_eq!(
            first,
            "I am actor, peer critic. Plan step by step. Task: Reach Mars. Schema: thought/action/status"
        );
    }

    #[test]
    fn test_stop_sequences() {
        let engine = engine(Arc::new(ScriptedProvider::new(Vec::<String>::new())));
        let options = engine.generate_options();
        assert_eq!(
            options.stop,
            vec!["<|im_start|>", "<|im_end|>", "###", "\r\n", "critic: ", "</end>"]
        );
        assert_eq!(options.max_tokens, 128);
        assert_eq!(options.context_size, 2048);
    }

    #[tokio::test]
    async fn test_turns_alternate_and_accumulate() {
        let provider = Arc::new(ScriptedProvider::new([
            "I will plan",
            "critic: needs detail",
            "actor: detailed plan",
        ]));
        let mut engine = engine(provider.clone());

        assert_eq!(engine.next_turn().await.unwrap(), "actor: I will plan");
        assert_eq!(engine.state(), EngineState::TurnComplete);
        assert_eq!(engine.next_turn().await.unwrap(), "critic: needs detail");
        assert_eq!(engine.next_turn().await.unwrap(), "actor: detailed plan");

        let transcript = engine.transcript();
        assert_eq!(transcript.len(), 5);
        for message in &transcript.messages()[2..] {
            assert!(message.content.starts_with(&format!("{}: ", message.sender)));
        }
        let senders: Vec<_> = transcript.messages()[2..]
            .iter()
            .map(|m| m.sender.as_str())
            .collect();
        assert_eq!(senders, ["actor", "critic", "actor"]);

        let calls = provider.calls();
        assert_eq!(calls[0].model, "llama3");
        assert_eq!(calls[1].model, "qwen3:8b");
        assert!(calls[1].prompt.starts_with("I am critic, peer actor. Review the plan."));
        assert!(calls[1].prompt.ends_with("actor: I will plan"));
        assert!(calls[2]
            .prompt
            .ends_with("actor: I will plan\ncritic: needs detail"));
        assert!(calls[2].options.stop.contains(&"critic: ".to_string()));
        assert!(calls[1].options.stop.contains(&"actor: ".to_string()));
    }

    #[tokio::test]
    async fn test_empty_reply_retries_same_turn() {
        let provider = Arc::new(ScriptedProvider::new([
            "actor: opening",
            "   \n ",
            "critic: second try",
        ]));
        let mut engine = engine(provider.clone());

        engine.next_turn().await.unwrap();
        let text = engine.next_turn().await.unwrap();
        assert_eq!(text, "critic: second try");

        let calls = provider.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1].prompt, calls[2].prompt);
        assert_eq!(calls[1].model, calls[2].model);
        assert_eq!(
            engine.transcript().running_text(),
            "actor: opening\ncritic: second try\n"
        );
        assert_eq!(engine.transcript().len(), 4);
        assert_eq!(engine.registry().current().name, "actor");
    }

    #[tokio::test]
    async fn test_retry_exhaustion() {
        let provider = Arc::new(ScriptedProvider::new(["", " ", "\n"]));
        let mut engine = engine(provider.clone());

        let err = engine.next_turn().await.unwrap_err();
        assert!(matches!(
            err,
            DuetError::GenerationExhausted { ref agent, attempts: 3 } if agent == "actor"
        ));
        assert_eq!(provider.calls().len(), 3);
        assert_eq!(engine.transcript().len(), 2);
        assert_eq!(engine.registry().current().name, "actor");
        assert_eq!(engine.state(), EngineState::Initialized);
    }

    #[tokio::test]
    async fn test_backend_error_propagates() {
        let provider = Arc::new(ScriptedProvider::new(Vec::<String>::new()));
        provider.push_error(DuetError::ModelNotFound("llama3".into()));
        let mut engine = engine(provider);

        let err = engine.next_turn().await.unwrap_err();
        assert!(matches!(err, DuetError::ModelNotFound(_)));
        assert_eq!(engine.transcript().len(), 2);
        assert_eq!(engine.state(), EngineState::Initialized);
    }

    #[tokio::test]
    async fn test_failed_turn_keeps_previous_state() {
        let provider = Arc::new(ScriptedProvider::new(["actor: first"]));
        provider.push_error(DuetError::ollama("connection reset"));
        let mut engine = engine(provider);

        engine.next_turn().await.unwrap();
        assert!(engine.next_turn().await.is_err());
        assert_eq!(engine.state(), EngineState::TurnComplete);
        assert_eq!(engine.registry().current().name, "critic");
    }

    #[tokio::test]
    async fn test_terminated_engine_refuses_turns() {
        let provider = Arc::new(ScriptedProvider::new(["actor: hi"]));
        let mut engine = engine(provider.clone());
        engine.terminate();

        assert!(matches!(
            engine.next_turn().await,
            Err(DuetError::SessionTerminated)
        ));
        assert!(provider.calls().is_empty());
    }

    #[test]
    fn test_models_in_use_deduplicates() {
        let provider = Arc::new(ScriptedProvider::new(Vec::<String>::new()));
        assert_eq!(engine(provider.clone()).models_in_use(), ["llama3", "qwen3:8b"]);

        let shared = ConversationEngine::new(
            provider,
            vec![AgentConfig::new("a", "x"), AgentConfig::new("b", "y")],
            "task",
            TEMPLATE,
            settings(),
        )
        .unwrap();
        assert_eq!(shared.models_in_use(), ["llama3"]);
    }

    #[tokio::test]
    async fn test_check_models() {
        let provider = Arc::new(ScriptedProvider::new(Vec::<String>::new()));
        let engine = engine(provider);
        let err = engine.check_models().await.unwrap_err();
        assert!(matches!(err, DuetError::ModelNotFound(ref m) if m == "qwen3:8b"));
    }

    #[test]
    fn test_observer_sees_turns() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let observer = crate::agent::observer::CallbackObserver::new(move |agent: &str, text: &str| {
            sink.lock().unwrap().push((agent.to_string(), text.to_string()));
        });

        let provider = Arc::new(ScriptedProvider::new(["hello", "critic: hi"]));
        let mut engine = engine(provider).with_observer(Arc::new(observer));

        tokio_test::block_on(async {
            engine.next_turn().await.unwrap();
            engine.next_turn().await.unwrap();
        });

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0], ("actor".to_string(), "actor: hello".to_string()));
        assert_eq!(seen[1], ("critic".to_string(), "critic: hi".to_string()));
    }
}
