use chainkit::BusEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    Initialized { server_url: String },
    AddressLinked { address: String, signature: String },
    AddressUnlinked { address: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerEventKind {
    Initialized,
    AddressLinked,
    AddressUnlinked,
}

impl BusEvent for ServerEvent {
    type Kind = ServerEventKind;

    fn kind(&self) -> ServerEventKind {
        match self {
            ServerEvent::Initialized { .. } => ServerEventKind::Initialized,
            ServerEvent::AddressLinked { .. } => ServerEventKind::AddressLinked,
            ServerEvent::AddressUnlinked { .. } => ServerEventKind::AddressUnlinked,
        }
    }
}
