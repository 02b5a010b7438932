use std::{path::Path, sync::Arc};

use crate::{
    Config, Engine, Result,
    services::{KnowledgeService, LlmService, Services},
    workflow::nodes::{NodeExecutor, NodeRegistry},
};

#[derive(Default)]
pub struct EngineBuilder {
    config: Config,
    services: Services,
    executors: Vec<Arc<dyn NodeExecutor>>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(
        mut self,
        config: Config,
    ) -> Self {
        self.config = config;
        self
    }

    /// Load the configuration from a TOML file.
    pub fn config_file<T: AsRef<Path>>(
        mut self,
        path: T,
    ) -> Result<Self> {
        self.config = Config::create(path)?;
        Ok(self)
    }

    pub fn llm_service(
        mut self,
        llm: Arc<dyn LlmService>,
    ) -> Self {
        self.services.llm = Some(llm);
        self
    }

    pub fn knowledge_service(
        mut self,
        knowledge: Arc<dyn KnowledgeService>,
    ) -> Self {
        self.services.knowledge = Some(knowledge);
        self
    }

    /// Replace the built-in executor for the executor's node type.
    pub fn executor(
        mut self,
        executor: Arc<dyn NodeExecutor>,
    ) -> Self {
        self.executors.push(executor);
        self
    }

    pub fn build(self) -> Result<Engine> {
        let mut registry = NodeRegistry::new(&self.services, &self.config.http);
        for executor in self.executors {
            registry.register(executor);
        }
        let engine = Engine::new(self.config, registry);

        Ok(engine)
    }
}
