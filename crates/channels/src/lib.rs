//! Canonical model shared by every herald stage.
//!
//! Transports turn their wire updates into the raw shapes in [`inbound`];
//! the pipeline normalizes those into a [`Request`], handlers answer with
//! [`Response`] values, and delivery turns responses into [`WireMethod`]
//! calls on a [`Transport`]. Persistence and localization are reached only
//! through the traits in [`store`] and [`l10n`].

pub mod access;
pub mod error;
pub mod inbound;
pub mod l10n;
pub mod request;
pub mod response;
pub mod store;
pub mod transport;

pub use {
    access::AccessLevel,
    error::{Error, Result},
    inbound::{InboundEvent, RawUpdate},
    l10n::{BundleLocalizer, Localizer},
    request::{
        Attachment, Chat, ChatKind, ContentType, Message, MessageKind, Reactions, Request,
        RequestSource, User,
    },
    response::{
        DeleteResponse, EditResponse, FileKind, FileResponse, FileSettings, FileSource,
        FormattingStyle, LocationResponse, OutgoingFile, Response, ResponseKind, ResponseSettings,
        TextResponse,
    },
    store::{AccessStore, CommandWaitingStore, InMemoryAccessStore, InMemoryWaitingStore},
    transport::{MediaItem, SendOptions, Transport, TransportError, WireMethod},
};
