mod config;
pub use config::{
    ChannelIdKey, ChannelIdProvider, ClientConfig, NextProtocolSelector, PskLookup, PskProvider,
    ResolvesClientCert, SessionSecretCallback,
};

mod connection;
pub use connection::{ClientHandshake, Progress};

mod context;

pub(super) mod handy;
pub use handy::{
    AlwaysChannelId, AlwaysResolvesClientCert, EcdsaChannelIdKey, ProtocolPreference, StaticPsk,
};

mod hs;

mod state;
pub use state::{
    transition, Action, Event, HandshakeState, Negotiated, ServerKxExpectation, Transition,
};

mod tls12;

#[cfg(test)]
mod test;
