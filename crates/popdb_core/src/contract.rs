//! Contract entry point.
//!
//! A ledger invokes the contract with a function name and positional byte
//! arguments and expects a [`Response`] back. Failures never escape as
//! Rust errors: they are rendered into the response message.

use crate::error::{CoreError, CoreResult};
use crate::store::RecordStore;
use std::fmt;
use tracing::debug;

/// Outcome of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The invocation succeeded.
    Ok,
    /// The invocation failed; see the message.
    Error,
}

impl Status {
    /// Returns the numeric status used by ledger peers.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Error => 500,
        }
    }
}

/// The result of an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Success or failure.
    pub status: Status,
    /// Failure message, empty on success.
    pub message: String,
    /// Result bytes, empty on failure.
    pub payload: Vec<u8>,
}

impl Response {
    /// Creates a successful response.
    pub fn success(payload: Vec<u8>) -> Self {
        Self {
            status: Status::Ok,
            message: String::new(),
            payload,
        }
    }

    /// Creates a failed response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: message.into(),
            payload: Vec::new(),
        }
    }

    /// Returns `true` if the invocation succeeded.
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

impl From<CoreResult<Vec<u8>>> for Response {
    fn from(result: CoreResult<Vec<u8>>) -> Self {
        match result {
            Ok(payload) => Self::success(payload),
            Err(e) => Self::error(e.to_string()),
        }
    }
}

/// A contract function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    /// Store a segment.
    PutSegment,
    /// Read a segment by link hash.
    GetSegment,
    /// Segments of a process.
    ListSegmentsForProcess,
    /// Segments of a map.
    ListSegmentsForMap,
    /// Every segment.
    ListAllSegments,
    /// Every map id.
    ListMapsAll,
    /// Map ids of a process.
    ListMapsForProcess,
    /// Segments matching a filter query string.
    FindSegments,
    /// Map ids matching a filter query string.
    FindMapIds,
}

impl Function {
    /// Every function, in dispatch order.
    pub const ALL: [Function; 9] = [
        Function::PutSegment,
        Function::GetSegment,
        Function::ListSegmentsForProcess,
        Function::ListSegmentsForMap,
        Function::ListAllSegments,
        Function::ListMapsAll,
        Function::ListMapsForProcess,
        Function::FindSegments,
        Function::FindMapIds,
    ];

    /// Returns the invocation name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PutSegment => "putSegment",
            Self::GetSegment => "getSegment",
            Self::ListSegmentsForProcess => "listSegmentsForProcess",
            Self::ListSegmentsForMap => "listSegmentsForMap",
            Self::ListAllSegments => "listAllSegments",
            Self::ListMapsAll => "listMapsAll",
            Self::ListMapsForProcess => "listMapsForProcess",
            Self::FindSegments => "findSegments",
            Self::FindMapIds => "findMapIds",
        }
    }

    /// Resolves an invocation name, including the legacy capitalized
    /// aliases.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "SaveSegment" => Some(Self::PutSegment),
            "GetSegment" => Some(Self::GetSegment),
            "FindSegments" => Some(Self::FindSegments),
            "GetMapIDs" => Some(Self::FindMapIds),
            _ => Self::ALL.into_iter().find(|f| f.name() == name),
        }
    }

    /// Returns the number of arguments the function takes.
    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            Self::ListAllSegments | Self::ListMapsAll => 0,
            _ => 1,
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Dispatches invocations to a [`RecordStore`].
pub struct Contract {
    store: RecordStore,
}

impl Contract {
    /// Wraps a store.
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    /// Returns the store.
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Returns the store mutably.
    pub fn store_mut(&mut self) -> &mut RecordStore {
        &mut self.store
    }

    /// Unwraps the store.
    pub fn into_store(self) -> RecordStore {
        self.store
    }

    /// Runs `function` with `args`.
    pub fn invoke(&mut self, function: &str, args: &[&[u8]]) -> Response {
        let Some(function) = Function::from_name(function) else {
            return Response::error("Invalid Smart Contract function name.");
        };
        debug!(%function, args = args.len(), "invoking");
        self.dispatch(function, args).into()
    }

    fn dispatch(&mut self, function: Function, args: &[&[u8]]) -> CoreResult<Vec<u8>> {
        if args.len() != function.arity() {
            return Err(CoreError::invalid_argument(format!(
                "Incorrect number of arguments. Expecting {}",
                function.arity()
            )));
        }

        let store = &mut self.store;
        match function {
            Function::PutSegment => store.put_segment(args[0]).map(|_| Vec::new()),
            Function::GetSegment => store.get_segment(text_arg(args)?),
            Function::ListSegmentsForProcess => store.list_segments_for_process(text_arg(args)?),
            Function::ListSegmentsForMap => store.list_segments_for_map(text_arg(args)?),
            Function::ListAllSegments => store.list_all_segments(),
            Function::ListMapsAll => store.list_maps_all(),
            Function::ListMapsForProcess => store.list_maps_for_process(text_arg(args)?),
            Function::FindSegments => store.find_segments(text_arg(args)?),
            Function::FindMapIds => store.find_map_ids(text_arg(args)?),
        }
    }
}

fn text_arg<'a>(args: &[&'a [u8]]) -> CoreResult<&'a str> {
    let arg = args.first().copied().unwrap_or_default();
    std::str::from_utf8(arg)
        .map_err(|_| CoreError::invalid_argument("Incorrect arguments. Expecting a UTF-8 string"))
}
