//! Remote operation surface: the calls a session makes against the server

mod client;
mod types;

pub use client::{bounded, retry_read, CallPolicy, RemoteClient};
pub use types::{
    AddActionRequest, AddActionResponse, CodePayload, CreateConnectionRequest,
    CreateConnectionResponse, CreateNodeRequest, CreateNodeResponse, DiagramPayload, DiffPayload,
    RemoteError, RemoteResult, SchemaVariant,
};
