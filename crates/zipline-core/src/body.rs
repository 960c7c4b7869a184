//! Body type shared by requests and responses

use bytes::Bytes;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full};

/// Boxed error carried by body frames
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Body type alias
///
/// Streaming, `Send` but not `Sync`, so decoders and channel receivers fit behind it.
pub type Body = UnsyncBoxBody<Bytes, BoxError>;

/// Body holding a single chunk
pub fn full(data: impl Into<Bytes>) -> Body {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Body with no data
pub fn empty() -> Body {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Box an arbitrary body into [`Body`]
pub fn boxed<B>(body: B) -> Body
where
    B: http_body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    body.map_err(Into::into).boxed_unsync()
}
