//! Inbound operator events

use crate::domain::{Metric, OperatorId};
use crate::error::DomainError;
use crate::services::{ComposeAction, DockerQuery};
use crate::session::{ConversationState, Intent};
use std::str::FromStr;

/// Something an operator sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Free-form text typed into the conversation
    Text {
        actor: OperatorId,
        chat: OperatorId,
        text: String,
    },
    /// A menu button press carrying structured data
    Callback {
        actor: OperatorId,
        chat: OperatorId,
        data: String,
    },
}

impl InboundEvent {
    /// Operator who sent the event
    pub fn actor(&self) -> OperatorId {
        match self {
            Self::Text { actor, .. } | Self::Callback { actor, .. } => *actor,
        }
    }

    /// Conversation the event came from
    pub fn chat(&self) -> OperatorId {
        match self {
            Self::Text { chat, .. } | Self::Callback { chat, .. } => *chat,
        }
    }
}

/// Decoded callback data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// Ask for input and wait in the given state
    Ask(ConversationState),
    /// Drop any pending input and background task
    Cancel,
    /// Start live system metrics for this operator
    WatchMetrics,
    /// Stop live system metrics
    StopMetrics,
    /// Run right away, no input needed
    Perform(Intent),
}

impl FromStr for CallbackAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ask = |state: ConversationState| -> Result<Self, DomainError> { Ok(Self::Ask(state)) };
        let perform = |intent: Intent| -> Result<Self, DomainError> { Ok(Self::Perform(intent)) };
        match s.trim() {
            "alerts:cpu" => ask(ConversationState::AwaitingThreshold(Metric::Cpu)),
            "alerts:ram" => ask(ConversationState::AwaitingThreshold(Metric::Ram)),
            "alerts:disk" => ask(ConversationState::AwaitingThreshold(Metric::Disk)),
            "alerts:interval" => ask(ConversationState::AwaitingPollInterval),
            "alerts:cooldown" => ask(ConversationState::AwaitingCooldown),
            "alerts:services" => ask(ConversationState::AwaitingServices),
            "fw:open" => ask(ConversationState::AwaitingOpenPort),
            "fw:close" => ask(ConversationState::AwaitingClosePort),
            "fw:ban" => ask(ConversationState::AwaitingBanIp),
            "fw:safe-ports" => ask(ConversationState::AwaitingSafePorts),
            "fwp:panic" => ask(ConversationState::AwaitingPanicIp),
            "admins:add" => ask(ConversationState::AwaitingAddAdmin),
            "admins:remove" => ask(ConversationState::AwaitingRemoveAdmin),
            "sys:kill" => ask(ConversationState::AwaitingKillPid),
            "logs:unit" => ask(ConversationState::AwaitingLogUnit),
            "logs:search" => ask(ConversationState::AwaitingLogSearch),
            "dock:set_compose" => ask(ConversationState::AwaitingComposePath),
            "dock:logs" => ask(ConversationState::AwaitingContainerLogs),
            "bpro:create" => ask(ConversationState::AwaitingBackupSource),
            "bpro:restore" => ask(ConversationState::AwaitingBackupRestore),
            "bpro:delete" => ask(ConversationState::AwaitingBackupDelete),
            "term" => ask(ConversationState::Terminal),
            "dock:info" => perform(Intent::Docker(DockerQuery::Info)),
            "dock:containers" => perform(Intent::Docker(DockerQuery::Containers)),
            "dock:images" => perform(Intent::Docker(DockerQuery::Images)),
            "dock:compose_ps" => perform(Intent::Compose(ComposeAction::Ps)),
            "dock:compose_up" => perform(Intent::Compose(ComposeAction::Up)),
            "dock:compose_down" => perform(Intent::Compose(ComposeAction::Down)),
            "dock:compose_pull" => perform(Intent::Compose(ComposeAction::Pull)),
            "bpro:list" => perform(Intent::ListBackups),
            "cancel" | "term:exit" => Ok(Self::Cancel),
            "sys:metrics" => Ok(Self::WatchMetrics),
            "sys:metrics:stop" => Ok(Self::StopMetrics),
            other => Err(DomainError::UnknownAction(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_accessors() {
        let event = InboundEvent::Callback {
            actor: 5,
            chat: -100,
            data: "fw:open".to_string(),
        };
        assert_eq!(event.actor(), 5);
        assert_eq!(event.chat(), -100);
    }

    #[test]
    fn test_callback_parsing() {
        assert_eq!(
            "alerts:ram".parse::<CallbackAction>().unwrap(),
            CallbackAction::Ask(ConversationState::AwaitingThreshold(Metric::Ram))
        );
        assert_eq!("term:exit".parse::<CallbackAction>().unwrap(), CallbackAction::Cancel);
        assert_eq!(
            "sys:metrics".parse::<CallbackAction>().unwrap(),
            CallbackAction::WatchMetrics
        );
        assert_eq!(
            "dock:compose_pull".parse::<CallbackAction>().unwrap(),
            CallbackAction::Perform(Intent::Compose(ComposeAction::Pull))
        );
        assert_eq!(
            "bpro:restore".parse::<CallbackAction>().unwrap(),
            CallbackAction::Ask(ConversationState::AwaitingBackupRestore)
        );
        assert!("fw:nuke".parse::<CallbackAction>().is_err());
    }
}
