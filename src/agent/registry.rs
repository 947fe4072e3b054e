//! The two conversation participants and whose turn it is

use crate::core::{AgentConfig, DuetError, Result};

/// Holds exactly two agents and alternates between them
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    agents: [AgentConfig; 2],
    current: usize,
}

impl AgentRegistry {
    /// Build a registry; the first agent speaks first
    pub fn new(agents: Vec<AgentConfig>) -> Result<Self> {
        let count = agents.len();
        let [first, second]: [AgentConfig; 2] = agents.try_into().map_err(|_| {
            DuetError::config(format!(
                "a conversation needs exactly two agents, got {}",
                count
            ))
        })?;

        if first.name.trim().is_empty() || second.name.trim().is_empty() {
            return Err(DuetError::config("agent names must not be empty"));
        }
        if first.name == second.name {
            return Err(DuetError::config(format!(
                "agent names must be distinct, both are '{}'",
                first.name
            )));
        }

        Ok(Self {
            agents: [first, second],
            current: 0,
        })
    }

    /// The agent whose turn it is
    pub fn current(&self) -> &AgentConfig {
        &self.agents[self.current]
    }

    /// Seat (0 or 1) of the current agent
    pub fn current_seat(&self) -> usize {
        self.current
    }

    /// The other member of the pair
    pub fn peer_of(&self, agent: &AgentConfig) -> &AgentConfig {
        if agent.name == self.agents[0].name {
            &self.agents[1]
        } else {
            &self.agents[0]
        }
    }

    /// Hand the turn to the other agent
    pub fn advance(&mut self) {
        self.current = 1 - self.current;
    }

    /// The agent that opens the conversation
    pub fn first(&self) -> &AgentConfig {
        &self.agents[0]
    }

    /// Both agents in speaking order
    pub fn agents(&self) -> &[AgentConfig] {
        &self.agents
    }
}
