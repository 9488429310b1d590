use chainkit::BusEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvmEvent {
    Initialized,
    Connecting { chain: String },
    Connected { account: String, chain: String },
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvmEventKind {
    Initialized,
    Connecting,
    Connected,
    Disconnected,
}

impl BusEvent for EvmEvent {
    type Kind = EvmEventKind;

    fn kind(&self) -> EvmEventKind {
        match self {
            EvmEvent::Initialized => EvmEventKind::Initialized,
            EvmEvent::Connecting { .. } => EvmEventKind::Connecting,
            EvmEvent::Connected { .. } => EvmEventKind::Connected,
            EvmEvent::Disconnected => EvmEventKind::Disconnected,
        }
    }
}
