//! Builder patterns for ergonomic construction of A2A types.

use crate::types::*;
use std::collections::HashMap;

/// Builder for constructing [`AgentCard`] with sensible defaults.
///
/// # Example
///
/// ```
/// use a2a_rs::builders::AgentCardBuilder;
///
/// let card = AgentCardBuilder::new("My Agent", "An example agent", "1.0.0")
///     .with_jsonrpc_interface("http://localhost:8080/a2a")
///     .with_skill("chat", "Chat", "Conversational AI", vec!["conversation".to_string()])
///     .with_streaming(true)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct AgentCardBuilder {
    name: String,
    description: String,
    version: String,
    supported_interfaces: Vec<AgentInterface>,
    provider: Option<AgentProvider>,
    documentation_url: Option<String>,
    capabilities: AgentCapabilities,
    security_schemes: Option<HashMap<String, SecurityScheme>>,
    security_requirements: Vec<SecurityRequirement>,
    default_input_modes: Vec<String>,
    default_output_modes: Vec<String>,
    skills: Vec<AgentSkill>,
    signatures: Option<Vec<AgentCardSignature>>,
    icon_url: Option<String>,
    additional_interfaces: Option<Vec<AgentInterface>>,
    preferred_transport: Option<String>,
    protocol_version: Option<String>,
    url: String,
    supports_authenticated_extended_card: Option<bool>,
    security: Option<Vec<HashMap<String, Vec<String>>>>,
}

impl AgentCardBuilder {
    /// Create a new builder with required fields.
    ///
    /// # Arguments
    ///
    /// * `name` - Human-readable agent name
    /// * `description` - Description of agent capabilities
    /// * `version` - Version string (e.g., "1.0.0")
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            version: version.into(),
            supported_interfaces: Vec::new(),
            provider: None,
            documentation_url: None,
            capabilities: AgentCapabilities {
                streaming: None,
                push_notifications: None,
                extensions: None,
                state_transition_history: None,
            },
            security_schemes: None,
            security_requirements: Vec::new(),
            default_input_modes: vec!["text/plain".to_string()],
            default_output_modes: vec!["text/plain".to_string()],
            skills: Vec::new(),
            signatures: None,
            icon_url: None,
            additional_interfaces: None,
            preferred_transport: None,
            protocol_version: Some("0.3".to_string()),
            url: String::new(),
            supports_authenticated_extended_card: None,
            security: None,
        }
    }

    /// Add a JSON-RPC interface at the given URL.
    pub fn with_jsonrpc_interface(mut self, url: impl Into<String>) -> Self {
        let url_str = url.into();
        self.supported_interfaces.push(AgentInterface {
            url: url_str.clone(),
            transport: "JSONRPC".to_string(),
            tenant: None,
            protocol_version: Some("0.3".to_string()),
        });
        if self.url.is_empty() {
            self.url = url_str;
        }
        self
    }

    /// Add a custom interface.
    pub fn with_interface(mut self, interface: AgentInterface) -> Self {
        self.supported_interfaces.push(interface);
        self
    }

    /// Set the provider information.
    pub fn with_provider(
        mut self,
        organization: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        self.provider = Some(AgentProvider {
            organization: organization.into(),
            url: url.into(),
        });
        self
    }

    /// Set the documentation URL.
    pub fn with_documentation_url(mut self, url: impl Into<String>) -> Self {
        self.documentation_url = Some(url.into());
        self
    }

    /// Enable or disable streaming support.
    pub fn with_streaming(mut self, enabled: bool) -> Self {
        self.capabilities.streaming = Some(enabled);
        self
    }

    /// Enable or disable push notifications support.
    pub fn with_push_notifications(mut self, enabled: bool) -> Self {
        self.capabilities.push_notifications = Some(enabled);
        self
    }

    /// Add a protocol extension.
    pub fn with_extension(
        mut self,
        uri: impl Into<String>,
        description: Option<String>,
        required: bool,
    ) -> Self {
        self.capabilities
            .extensions
            .get_or_insert_with(Vec::new)
            .push(AgentExtension {
                uri: uri.into(),
                description,
                required: Some(required),
                params: None,
            });
        self
    }

    /// Add a skill to the agent card.
    pub fn with_skill(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        tags: Vec<String>,
    ) -> Self {
        self.skills.push(AgentSkill {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            tags,
            examples: None,
            input_modes: None,
            output_modes: None,
            security_requirements: None,
            security: None,
        });
        self
    }

    /// Add a skill with examples.
    pub fn with_skill_examples(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        tags: Vec<String>,
        examples: Vec<String>,
    ) -> Self {
        self.skills.push(AgentSkill {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            tags,
            examples: Some(examples),
            input_modes: None,
            output_modes: None,
            security_requirements: None,
            security: None,
        });
        self
    }

    /// Set the default input MIME types.
    pub fn with_input_modes(mut self, modes: Vec<String>) -> Self {
        self.default_input_modes = modes;
        self
    }

    /// Set the default output MIME types.
    pub fn with_output_modes(mut self, modes: Vec<String>) -> Self {
        self.default_output_modes = modes;
        self
    }

    /// Set the icon URL.
    pub fn with_icon_url(mut self, url: impl Into<String>) -> Self {
        self.icon_url = Some(url.into());
        self
    }

    /// Set the preferred transport protocol.
    pub fn with_preferred_transport(mut self, transport: impl Into<String>) -> Self {
        self.preferred_transport = Some(transport.into());
        self
    }

    /// Build the [`AgentCard`].
    pub fn build(self) -> AgentCard {
        AgentCard {
            name: self.name,
            description: self.description,
            version: self.version,
            supported_interfaces: self.supported_interfaces,
            provider: self.provider,
            documentation_url: self.documentation_url,
            capabilities: self.capabilities,
            security_schemes: self.security_schemes,
            security_requirements: self.security_requirements,
            default_input_modes: self.default_input_modes,
            default_output_modes: self.default_output_modes,
            skills: self.skills,
            signatures: self.signatures,
            icon_url: self.icon_url,
            additional_interfaces: self.additional_interfaces,
            preferred_transport: self.preferred_transport,
            protocol_version: self.protocol_version,
            url: self.url,
            supports_authenticated_extended_card: self.supports_authenticated_extended_card,
            security: self.security,
        }
    }
}

/// Builder for constructing an A2A axum server with fluent configuration.
///
/// # Example
///
/// ```rust,ignore
/// use a2a_rs::builders::ServerBuilder;
/// use a2a_rs::server::{AgentHooks, InMemoryTaskStore};
/// use std::sync::Arc;
///
/// # async fn example(hooks: Arc<dyn AgentHooks>) {
/// let app = ServerBuilder::new(hooks)
///     .with_agent_card(|builder| {
///         builder
///             .with_jsonrpc_interface("http://localhost:8080/a2a")
///             .with_skill("chat", "Chat", "Conversational AI", vec!["conversation"])
///             .with_streaming(true)
///     })
///     .with_task_store(Arc::new(InMemoryTaskStore::new()))
///     .with_cors(true)
///     .build();
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await.unwrap();
/// axum::serve(listener, app).await.unwrap();
/// # }
/// ```
pub struct ServerBuilder {
    hooks: std::sync::Arc<dyn crate::server::AgentHooks>,
    task_store: Option<std::sync::Arc<dyn crate::server::TaskStore>>,
    agent_card: Option<AgentCard>,
    cors_enabled: bool,
}

impl ServerBuilder {
    /// Create a new server builder with the given agent hooks.
    pub fn new(hooks: std::sync::Arc<dyn crate::server::AgentHooks>) -> Self {
        Self {
            hooks,
            task_store: None,
            agent_card: None,
            cors_enabled: false,
        }
    }

    /// Set the task store implementation.
    pub fn with_task_store(mut self, store: std::sync::Arc<dyn crate::server::TaskStore>) -> Self {
        self.task_store = Some(store);
        self
    }

    /// Configure the agent card using a builder callback.
    pub fn with_agent_card<F>(mut self, f: F) -> Self
    where
        F: FnOnce(AgentCardBuilder) -> AgentCardBuilder,
    {
        let builder = AgentCardBuilder::new("A2A Agent", "An A2A-compatible agent", "1.0.0");
        let builder = f(builder);
        self.agent_card = Some(builder.build());
        self
    }

    /// Set the agent card directly.
    pub fn with_agent_card_direct(mut self, card: AgentCard) -> Self {
        self.agent_card = Some(card);
        self
    }

    /// Enable or disable CORS middleware.
    pub fn with_cors(mut self, enabled: bool) -> Self {
        self.cors_enabled = enabled;
        self
    }

    /// Build the axum router.
    pub fn build(self) -> axum::Router {
        use crate::server::{a2a_router, InMemoryTaskStore, TaskManager};
        use std::sync::Arc;

        let store = self
            .task_store
            .unwrap_or_else(|| Arc::new(InMemoryTaskStore::new()));
        let manager = Arc::new(TaskManager::new(store, self.hooks));
        let card = self.agent_card.unwrap_or_else(|| {
            AgentCardBuilder::new("A2A Agent", "An A2A-compatible agent", "1.0.0").build()
        });

        let mut router = a2a_router(manager, card);

        if self.cors_enabled {
            use tower_http::cors::CorsLayer;
            router = router.layer(CorsLayer::permissive());
        }

        router
    }
}
