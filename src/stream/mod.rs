//! Stream/server resolution for unit pages

pub mod decode;
pub mod resolver;

pub use decode::{decode_option_value, extract_src};
pub use resolver::{
    is_blocked_frame, parse_deferred_response, DeferredEndpoint, RenderedServers, ServerSet,
    StreamResolver,
};
