//! Engine Module
//!
//! The request engine that coordinates spaces, indexes and the update
//! interpreter.
//!
//! ## Responsibilities
//! - Own every space behind one global lock
//! - Dispatch decoded requests and shape their responses
//! - Turn failures into wire error responses
//! - Declare spaces and indexes at startup

use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::protocol::{
    decode_frame, dml_body, encode_response, select_body, Flags, RawRequest, Request,
    RequestBody, RequestType, Response, Transport,
};
use crate::space::Space;
use crate::tuple::Tuple;
use crate::update::{self, OpStream};

/// The in-memory tuple store
///
/// ## Concurrency Model: one request at a time
///
/// Every request and every schema change takes `store`. A request that
/// touches several indexes is therefore never observed half-applied, and all
/// operations are linearizable. Concurrent callers simply queue on the lock.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// All spaces, guarded together
    store: Mutex<Store>,
}

#[derive(Default)]
struct Store {
    spaces: HashMap<u32, Space>,
}

impl Engine {
    /// Create an engine with the spaces declared in `config`
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let mut store = Store::default();
        for declared in &config.spaces {
            let mut space = Space::new(declared.id, &declared.primary);
            for index in &declared.secondary {
                space.add_index(index.id, &index.fields, index.unique)?;
            }
            tracing::info!(
                space = declared.id,
                primary = ?declared.primary,
                secondary = declared.secondary.len(),
                "space declared"
            );
            store.spaces.insert(declared.id, space);
        }

        Ok(Self {
            config,
            store: Mutex::new(store),
        })
    }

    /// Engine with no spaces and default limits
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            store: Mutex::new(Store::default()),
        }
    }

    // =========================================================================
    // Schema
    // =========================================================================

    /// Create (or recreate, dropping its rows) a space keyed on `primary_fields`
    ///
    /// An empty field list keys the primary index on field 0.
    pub fn init_space(&self, id: u32, primary_fields: &[u32]) {
        tracing::info!(space = id, primary = ?primary_fields, "space initialized");
        self.store.lock().spaces.insert(id, Space::new(id, primary_fields));
    }

    /// Register a secondary index, backfilling it from existing rows
    pub fn init_secondary_key(
        &self,
        space: u32,
        index: u32,
        unique: bool,
        fields: &[u32],
    ) -> Result<()> {
        let mut store = self.store.lock();
        store.space_mut(space)?.add_index(index, fields, unique)
    }

    /// Number of rows in a space
    pub fn space_len(&self, space: u32) -> Result<usize> {
        Ok(self.store.lock().space(space)?.len())
    }

    /// Run `f` against a space while holding the engine lock
    pub fn with_space<R>(&self, space: u32, f: impl FnOnce(&Space) -> R) -> Result<R> {
        let store = self.store.lock();
        Ok(f(store.space(space)?))
    }

    // =========================================================================
    // Request Entry Points
    // =========================================================================

    /// Execute a request, surfacing failures as typed errors
    pub fn try_execute(&self, request: &Request) -> Result<Response> {
        tracing::trace!(id = request.id, request = ?request.body, "executing request");
        let mut store = self.store.lock();
        store.dispatch(request)
    }

    /// Execute a request, folding failures into error responses
    pub fn execute(&self, request: &Request) -> Response {
        match self.try_execute(request) {
            Ok(response) => response,
            Err(e) => self.error_response(request.request_type() as u32, request.id, &e),
        }
    }

    /// Decode and execute an undecoded request frame
    ///
    /// Unknown request types come back as `UnknownOperation` responses.
    pub fn execute_raw(&self, raw: &RawRequest) -> Response {
        match Request::try_from(raw) {
            Ok(request) => self.execute(&request),
            Err(e) => self.error_response(raw.request_type, raw.request_id, &e),
        }
    }

    /// One complete request/response exchange at the byte level
    ///
    /// Fails only when the frame header itself cannot be read; every other
    /// problem is answered with an error frame.
    pub fn handle_frame(&self, frame: &[u8]) -> Result<Bytes> {
        let raw = decode_frame(frame, self.config.max_body_size)?;
        Ok(encode_response(&self.execute_raw(&raw)))
    }

    fn error_response(&self, request_type: u32, request_id: u32, error: &StoreError) -> Response {
        if error.is_protocol_error() {
            tracing::debug!(
                id = request_id,
                request_type,
                code = error.wire_code(),
                "request failed: {}",
                error
            );
        } else {
            tracing::warn!(
                id = request_id,
                request_type,
                "request failed with internal error: {}",
                error
            );
        }
        Response::error(request_type, request_id, error)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for Engine {
    fn execute(&self, request: &Request) -> Response {
        Engine::execute(self, request)
    }
}

impl Store {
    fn space(&self, id: u32) -> Result<&Space> {
        self.spaces.get(&id).ok_or(StoreError::NoSuchSpace(id))
    }

    fn space_mut(&mut self, id: u32) -> Result<&mut Space> {
        self.spaces.get_mut(&id).ok_or(StoreError::NoSuchSpace(id))
    }

    /// Route a request to its handler
    fn dispatch(&mut self, request: &Request) -> Result<Response> {
        let id = request.id;
        match &request.body {
            RequestBody::Ping => Ok(Response::ping(id)),
            RequestBody::Select {
                space,
                index,
                offset,
                limit,
                keys,
            } => self.select(id, *space, *index, keys, *offset, *limit),
            RequestBody::Insert { space, flags, tuple } => self.insert(id, *space, *flags, tuple),
            RequestBody::Delete { space, flags, key } => self.delete(id, *space, *flags, key),
            RequestBody::Update {
                space,
                flags,
                key,
                ops,
            } => self.update(id, *space, *flags, key, ops),
        }
    }

    fn select(
        &self,
        id: u32,
        space: u32,
        index: u32,
        keys: &[Tuple],
        offset: u32,
        limit: u32,
    ) -> Result<Response> {
        let space = self.space(space)?;

        let mut matches = Vec::new();
        for key in keys {
            matches.extend(space.select(index, key)?);
        }

        let page: Vec<&Tuple> = matches
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();

        tracing::debug!(id, space = space.id(), index, returned = page.len(), "select");
        Ok(Response::ok(RequestType::Select, id, select_body(page)))
    }

    fn insert(&mut self, id: u32, space: u32, flags: Flags, tuple: &Tuple) -> Result<Response> {
        let space = self.space_mut(space)?;

        let pk = space.primary_key_of(tuple)?;
        match space.find(&pk) {
            Some(_) if flags.contains(Flags::ADD_TUPLE) => return Err(StoreError::DuplicateKey),
            Some(existing) => {
                space.replace(existing, tuple.clone())?;
            }
            None if flags.contains(Flags::REPLACE_TUPLE) => return Err(StoreError::TupleNotFound),
            None => {
                space.insert_everywhere(tuple.clone())?;
            }
        }

        tracing::debug!(id, space = space.id(), rows = space.len(), "insert");
        Ok(dml_response(RequestType::Insert, id, flags, Some(tuple)))
    }

    /// A key that matches no row, whatever its arity, affects nothing
    fn delete(&mut self, id: u32, space: u32, flags: Flags, key: &Tuple) -> Result<Response> {
        let space = self.space_mut(space)?;

        let Some(row) = space.find(key) else {
            return Ok(dml_response(RequestType::Delete, id, flags, None));
        };
        let removed = space.remove_everywhere(row).ok_or_else(|| {
            StoreError::Internal(format!(
                "space {}: primary index points at freed row {:?}",
                space.id(),
                row
            ))
        })?;

        tracing::debug!(id, space = space.id(), rows = space.len(), "delete");
        Ok(dml_response(RequestType::Delete, id, flags, Some(&removed)))
    }

    /// The op stream is decoded only once the row is known to exist
    fn update(
        &mut self,
        id: u32,
        space: u32,
        flags: Flags,
        key: &Tuple,
        stream: &OpStream,
    ) -> Result<Response> {
        let space = self.space_mut(space)?;

        let Some(row) = space.find(key) else {
            return Ok(dml_response(RequestType::Update, id, flags, None));
        };

        let ops = stream.decode()?;
        let updated = update::apply_ops(space, row, &ops)?;
        let new_key = space.primary_key_of(&updated)?;
        // An unchanged row keeps its place in every bucket
        if space.get(row) != Some(&updated) {
            space.replace(row, updated)?;
        }

        // The primary key may have changed, so fetch by the new one
        let stored = space.get_by_primary_key(&new_key).ok_or_else(|| {
            StoreError::Internal(format!(
                "space {}: updated row not found by its new key",
                space.id()
            ))
        })?;

        tracing::debug!(id, space = space.id(), ops = ops.len(), "update");
        Ok(dml_response(RequestType::Update, id, flags, Some(stored)))
    }
}

/// Affected count of 0 when `affected` is `None`, else 1 and the optional echo
fn dml_response(
    request_type: RequestType,
    id: u32,
    flags: Flags,
    affected: Option<&Tuple>,
) -> Response {
    let body = match affected {
        None => dml_body(0, None),
        Some(tuple) if flags.contains(Flags::RETURN_TUPLE) => dml_body(1, Some(tuple)),
        Some(_) => dml_body(1, None),
    };
    Response::ok(request_type, id, body)
}
